//! Fixed-size volumes of a source file.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{Error, Result};

const MIN_INDEX_WIDTH: usize = 3;

/// One volume written by [`split_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// `<file_name>.<index>`, 1-based, zero padded to fit `total`.
pub fn part_name(file_name: &str, index: usize, total: usize) -> String {
    let width = total.to_string().len().max(MIN_INDEX_WIDTH);
    format!("{file_name}.{index:0width$}")
}

/// Cut `source` into volumes of at most `part_size` bytes inside `dest_dir`.
///
/// An empty source still yields one empty part so it can be uploaded.
pub fn split_file(source: impl AsRef<Path>, part_size: u64, dest_dir: impl AsRef<Path>) -> Result<Vec<Part>> {
    if part_size == 0 {
        return Err(Error::InvalidPartSize);
    }
    let source = source.as_ref();
    let dest_dir = dest_dir.as_ref();
    let file_name = source
        .file_name()
        .ok_or_else(|| Error::NotFound(source.to_path_buf()))?
        .to_string_lossy()
        .into_owned();

    let file = File::open(source).map_err(Error::read(source))?;
    let len = file.metadata().map_err(Error::read(source))?.len();
    let total = (len.div_ceil(part_size)).max(1) as usize;
    let mut reader = BufReader::new(file);

    let mut parts = Vec::with_capacity(total);
    for index in 1..=total {
        let name = part_name(&file_name, index, total);
        let path = dest_dir.join(&name);
        let out = File::create(&path).map_err(Error::write(&path))?;
        let mut writer = BufWriter::new(out);
        let size = io::copy(&mut (&mut reader).take(part_size), &mut writer).map_err(Error::read(source))?;
        writer.flush().map_err(Error::write(&path))?;
        parts.push(Part { name, path, size });
    }

    debug!(source = %source.display(), parts = parts.len(), part_size, "split file");
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_name_padding() {
        assert_eq!(part_name("movie.mkv", 3, 12), "movie.mkv.003");
        assert_eq!(part_name("a", 1, 1), "a.001");
        assert_eq!(part_name("a", 42, 1500), "a.0042");
    }
}
