use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use todus_fs::{Part, split_file};
use todus_transfer::{Manifest, share_link};
use tracing::info;

use super::AppContext;
use super::app::UploadArg;
use crate::ui::ProgressTracker;

pub async fn run(ctx: &AppContext, arg: UploadArg) -> Result<()> {
    let mut config = ctx.settings.transfer_config();
    if let Some(workers) = arg.max_workers {
        config.upload_workers = workers;
    }
    let tracker = Arc::new(ProgressTracker::new());
    let client = ctx.client(config, tracker.clone())?;

    for file in &arg.files {
        if !file.is_file() {
            bail!("Not a file: {}", file.display());
        }
        let name = file_name(file)?;

        match arg.split {
            Some(part_size) => {
                // Parts live next to the manifest so a rerun finds the same disk.
                let scratch = tempfile::Builder::new()
                    .prefix(".todus-")
                    .tempdir_in(ctx.env.pwd())
                    .context("Failed to create a scratch directory")?;
                let parts = split(file, part_size, scratch.path()).await?;
                let manifest = Manifest::open(ctx.env.pwd().join(format!("{name}.txt"))).await?;

                let summary = client.upload_parts(&manifest, &parts).await?;
                info!(file = %name, uploaded = summary.transferred, skipped = summary.skipped, "split upload done");
                tracker.println(format!("TXT: {}", manifest.path().display()));
            }
            None => {
                let url = client.upload_file(file).await?;
                tracker.println(format!("URL: {}", share_link(&url, &name)));
            }
        }
    }
    Ok(())
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("No file name in {}", path.display()))
}

async fn split(source: &Path, part_size: u64, dest: &Path) -> Result<Vec<Part>> {
    let (source, dest): (PathBuf, PathBuf) = (source.to_path_buf(), dest.to_path_buf());
    let parts = tokio::task::spawn_blocking(move || split_file(&source, part_size, &dest)).await??;
    Ok(parts)
}
