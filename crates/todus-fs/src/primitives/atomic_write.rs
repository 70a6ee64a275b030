use std::fs;
use std::path::Path;

use crate::{Error, Result};

#[derive(Clone, Copy, Debug, Default)]
pub struct AtomicWriteOptions {
    pub permissions: Option<u32>,
    pub sync:        bool,
}

impl AtomicWriteOptions {
    pub fn new() -> Self { Self::default() }

    /// Unix mode applied to the file before it becomes visible.
    pub fn permissions(mut self, mode: u32) -> Self {
        self.permissions = Some(mode);
        self
    }

    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }
}

/// Replace `path` with `content` in one rename.
///
/// Readers see either the old file or the new one, never a partial write.
/// The temporary sibling `.<name>.<uuid>.tmp` is unique per call, so
/// concurrent writers never share one; it is removed if the rename fails.
pub fn atomic_write(path: impl AsRef<Path>, content: &[u8], options: AtomicWriteOptions) -> Result<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path.file_name().unwrap_or_default().to_string_lossy();
    let tmp_path = parent.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

    fs::create_dir_all(parent).map_err(Error::write(parent))?;
    fs::write(&tmp_path, content).map_err(Error::write(&tmp_path))?;

    #[cfg(unix)]
    if let Some(mode) = options.permissions {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp_path, fs::Permissions::from_mode(mode)).map_err(Error::write(&tmp_path))?;
    }

    if options.sync {
        fs::File::open(&tmp_path)
            .and_then(|file| file.sync_all())
            .map_err(Error::write(&tmp_path))?;
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        Error::Write { path: path.to_path_buf(), source: e }
    })?;

    Ok(())
}

pub fn atomic_read(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).map_err(Error::read(path))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_atomic_write_replaces_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("accounts.toml");
        atomic_write(&path, b"old", AtomicWriteOptions::new()).unwrap();
        atomic_write(&path, b"new", AtomicWriteOptions::new().sync(true)).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_concurrent_writers_do_not_collide() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("accounts.toml");

        let writers: Vec<_> = (0..8u8)
            .map(|n| {
                let path = path.clone();
                std::thread::spawn(move || {
                    for _ in 0..20 {
                        atomic_write(&path, &[n; 64], AtomicWriteOptions::new())?;
                    }
                    Ok::<_, Error>(())
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap().unwrap();
        }

        let content = fs::read(&path).unwrap();
        assert_eq!(content.len(), 64);
        assert!(content.iter().all(|b| *b == content[0]));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_atomic_write_creates_parent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        atomic_write(&path, b"x", AtomicWriteOptions::new()).unwrap();
        assert_eq!(atomic_read(&path).unwrap(), b"x");
    }

    #[cfg(unix)]
    #[test]
    fn test_atomic_write_with_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("secret");
        atomic_write(&path, b"data", AtomicWriteOptions::new().permissions(0o600)).unwrap();
        let metadata = fs::metadata(&path).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn test_atomic_read_missing_is_not_found() {
        let dir = tempdir().unwrap();
        assert!(matches!(atomic_read(dir.path().join("nope")), Err(Error::NotFound(_))));
    }
}
