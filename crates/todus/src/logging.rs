use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::env::TodusEnv;

const DEFAULT_FILTER: &str = "warn,todus=debug";

const MAX_LOG_BYTES: u64 = 1024 * 1024;
const LOG_BACKUPS: usize = 3;

/// Log file capped at `max_bytes`; full files shift to `<name>.1` .. `<name>.<backups>`.
pub struct RotatingFile {
    path:      PathBuf,
    max_bytes: u64,
    backups:   usize,
    file:      File,
    len:       u64,
}

impl RotatingFile {
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64, backups: usize) -> io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let len = file.metadata()?.len();
        Ok(Self { path, max_bytes, backups, file, len })
    }

    fn backup(&self, n: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(format!(".{n}"));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.backups == 0 {
            fs::remove_file(&self.path)?;
        } else {
            for n in (1..self.backups).rev() {
                let from = self.backup(n);
                if from.exists() {
                    fs::rename(&from, self.backup(n + 1))?;
                }
            }
            fs::rename(&self.path, self.backup(1))?;
        }
        self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.len = 0;
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.len > 0 && self.len + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.len += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> { self.file.flush() }
}

/// Send every event to `log.txt` under the todus home; `RUST_LOG` overrides the filter.
pub fn init(env: &TodusEnv) -> Result<()> {
    fs::create_dir_all(env.root()).with_context(|| format!("Failed to create {}", env.root().display()))?;
    let log = open_log(env.log())?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(log)))
        .init();
    Ok(())
}

fn open_log(path: &Path) -> Result<RotatingFile> {
    RotatingFile::open(path, MAX_LOG_BYTES, LOG_BACKUPS).with_context(|| format!("Failed to open {}", path.display()))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_rotates_when_full() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let mut log = RotatingFile::open(&path, 10, 3).unwrap();

        for line in [b"aaaaaaaa\n", b"bbbbbbbb\n", b"cccccccc\n"] {
            log.write_all(line).unwrap();
        }
        log.flush().unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"cccccccc\n");
        assert_eq!(fs::read(dir.path().join("log.txt.1")).unwrap(), b"bbbbbbbb\n");
        assert_eq!(fs::read(dir.path().join("log.txt.2")).unwrap(), b"aaaaaaaa\n");
    }

    #[test]
    fn test_keeps_only_the_newest_backups() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let mut log = RotatingFile::open(&path, 4, 2).unwrap();

        for n in 0..5u8 {
            log.write_all(&[b'0' + n; 4]).unwrap();
        }

        assert_eq!(fs::read(&path).unwrap(), b"4444");
        assert_eq!(fs::read(dir.path().join("log.txt.1")).unwrap(), b"3333");
        assert_eq!(fs::read(dir.path().join("log.txt.2")).unwrap(), b"2222");
        assert!(!dir.path().join("log.txt.3").exists());
    }

    #[test]
    fn test_existing_log_counts_toward_limit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.txt");
        fs::write(&path, vec![b'x'; 1024 * 1024]).unwrap();

        let mut log = open_log(&path).unwrap();
        log.write_all(b"next run\n").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"next run\n");
        assert_eq!(fs::metadata(dir.path().join("log.txt.1")).unwrap().len(), 1024 * 1024);
    }
}
