//! Raw response archival
//!
//! Stores the received lines verbatim before parsing, so a parse failure
//! still leaves the data on disk.

use chrono::{DateTime, Local};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors writing or reading an archive file
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Creating, writing or reading the file failed
    #[error("Archive I/O error on '{path}': {source}")]
    Io {
        /// File or directory path
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

fn io_error(path: &Path, source: std::io::Error) -> ArchiveError {
    ArchiveError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// File name for an archive taken at `time`, e.g. `ca_20261018-142501.txt`
pub fn archive_file_name(prefix: &str, time: DateTime<Local>) -> String {
    format!("{}_{}.txt", prefix, time.format("%Y%m%d-%H%M%S"))
}

/// Write `lines` into `dir`, one per line, and return the file path
///
/// The directory is created if needed.
pub fn write_raw_lines<S: AsRef<str>>(
    dir: impl AsRef<Path>,
    prefix: &str,
    lines: &[S],
) -> Result<PathBuf, ArchiveError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
    let path = dir.join(archive_file_name(prefix, Local::now()));
    write_raw_lines_to(&path, lines)?;
    Ok(path)
}

/// Write `lines` to exactly `path`, replacing any existing file
pub fn write_raw_lines_to<S: AsRef<str>>(path: &Path, lines: &[S]) -> Result<(), ArchiveError> {
    let file = fs::File::create(path).map_err(|e| io_error(path, e))?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writer
            .write_all(line.as_ref().as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .map_err(|e| io_error(path, e))?;
    }
    writer.flush().map_err(|e| io_error(path, e))
}

/// Read an archive back into lines, ready for parsing
pub fn read_raw_lines(path: impl AsRef<Path>) -> Result<Vec<String>, ArchiveError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    Ok(text.lines().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_archive_file_name() {
        let time = Local.with_ymd_and_hms(2026, 10, 18, 14, 25, 1).unwrap();
        assert_eq!(archive_file_name("ca", time), "ca_20261018-142501.txt");
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/output");
        let lines = vec!["e", "M0000", "Pda8000000 ", "*", ""];

        let path = write_raw_lines(&out, "ca", &lines).unwrap();
        assert!(path.starts_with(&out));

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "e\nM0000\nPda8000000 \n*\n\n");
        assert_eq!(read_raw_lines(&path).unwrap(), lines);
    }
}
