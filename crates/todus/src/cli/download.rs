use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use todus_transfer::{DownloadJob, parse_entries};
use tracing::info;

use super::AppContext;
use super::app::DownloadArg;
use crate::ui::ProgressTracker;

pub async fn run(ctx: &AppContext, arg: DownloadArg) -> Result<()> {
    let jobs = jobs_from_inputs(&arg.inputs, ctx.env.pwd())?;

    let mut config = ctx.settings.transfer_config();
    if let Some(workers) = arg.max_workers {
        config.download_workers = workers;
    }
    let tracker = Arc::new(ProgressTracker::new());
    let client = ctx.client(config, tracker.clone())?;

    let summary = client.download_all(&jobs).await?;
    info!(downloaded = summary.transferred, skipped = summary.skipped, "downloads done");
    tracker.println(format!("Downloaded {} file(s), skipped {}", summary.transferred, summary.skipped));
    Ok(())
}

/// Jobs for every share link and every line of every manifest file, saved in `dest`.
pub fn jobs_from_inputs(inputs: &[String], dest: &Path) -> Result<Vec<DownloadJob>> {
    let mut jobs = Vec::new();
    for input in inputs {
        let path = Path::new(input);
        if path.is_file() {
            let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {input}"))?;
            for entry in parse_entries(&text) {
                jobs.push(DownloadJob::new(entry.url, target(dest, &entry.name)?));
            }
        } else {
            let job = DownloadJob::from_share_link(input)
                .with_context(|| format!("Neither a manifest file nor a share link: {input}"))?;
            let target = target(dest, &job.target.to_string_lossy())?;
            jobs.push(DownloadJob { target, ..job });
        }
    }
    Ok(jobs)
}

/// Only the last component of a remote name is used.
fn target(dest: &Path, name: &str) -> Result<PathBuf> {
    let file_name = Path::new(name).file_name().with_context(|| format!("Invalid file name: {name}"))?;
    Ok(dest.join(file_name))
}
