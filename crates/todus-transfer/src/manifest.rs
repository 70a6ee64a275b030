//! Line-oriented record of uploaded parts: `<download_url>\t<part_name>\n`.

use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub url:  String,
    pub name: String,
}

/// Entries of a manifest text, one per part name.
///
/// Each non-blank line splits at its first whitespace run. A later line for a
/// name replaces an earlier one in place. Lines without a name are ignored.
pub fn parse_entries(text: &str) -> Vec<ManifestEntry> {
    let mut entries: Vec<ManifestEntry> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let Some((url, name)) = line.split_once(char::is_whitespace) else {
            continue;
        };
        let name = name.trim_start();
        match index.get(name) {
            Some(&at) => entries[at].url = url.to_string(),
            None => {
                index.insert(name.to_string(), entries.len());
                entries.push(ManifestEntry { url: url.to_string(), name: name.to_string() });
            }
        }
    }
    entries
}

struct State {
    done: HashSet<String>,
    file: Option<File>,
}

/// Manifest of one split upload, shared by all of its workers.
///
/// The append handle and the completed set sit behind one lock, so a name is
/// in the set exactly when its line has been written.
pub struct Manifest {
    path:  PathBuf,
    state: Mutex<State>,
}

impl Manifest {
    /// Load the manifest at `path`; a missing file is an empty manifest.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let done: HashSet<String> = match fs::read_to_string(&path).await {
            Ok(text) => parse_entries(&text).into_iter().map(|entry| entry.name).collect(),
            Err(err) if err.kind() == ErrorKind::NotFound => HashSet::new(),
            Err(err) => return Err(err.into()),
        };
        debug!(path = %path.display(), parts = done.len(), "manifest loaded");
        Ok(Self { path, state: Mutex::new(State { done, file: None }) })
    }

    pub fn path(&self) -> &Path { &self.path }

    pub async fn contains(&self, name: &str) -> bool { self.state.lock().await.done.contains(name) }

    pub async fn len(&self) -> usize { self.state.lock().await.done.len() }

    pub async fn is_empty(&self) -> bool { self.len().await == 0 }

    /// Append the line for `name` and mark it done.
    pub async fn record(&self, url: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let file = match &mut state.file {
            Some(file) => file,
            slot => slot.insert(OpenOptions::new().create(true).append(true).open(&self.path).await?),
        };
        let line = format!("{url}\t{name}\n");
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        state.done.insert(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entries_later_line_wins() {
        let text = "https://a/1\tf.001\n\nhttps://a/2  f.002\nhttps://b/1\tf.001\nbroken\n";
        let entries = parse_entries(text);
        assert_eq!(
            entries,
            vec![
                ManifestEntry { url: "https://b/1".into(), name: "f.001".into() },
                ManifestEntry { url: "https://a/2".into(), name: "f.002".into() },
            ]
        );
    }

    #[tokio::test]
    async fn test_record_appends_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movie.mkv.txt");

        let manifest = Manifest::open(&path).await.unwrap();
        assert!(manifest.is_empty().await);
        manifest.record("https://s/1", "movie.mkv.001").await.unwrap();
        manifest.record("https://s/2", "movie.mkv.002").await.unwrap();
        assert!(manifest.contains("movie.mkv.002").await);
        drop(manifest);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "https://s/1\tmovie.mkv.001\nhttps://s/2\tmovie.mkv.002\n");

        let reopened = Manifest::open(&path).await.unwrap();
        assert_eq!(reopened.len().await, 2);
        assert!(reopened.contains("movie.mkv.001").await);
        assert!(!reopened.contains("movie.mkv.003").await);
    }
}
