//! Read/write the persisted snapshot JSON.
//!
//! Writes go to a sibling `.tmp` file first and are renamed into place, so a
//! reader sees either the previous snapshot or the new one, never a torn file.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{AppError, ScrapeError};
use crate::snapshot::Snapshot;

/// Default location, relative to the working directory.
pub const DEFAULT_SNAPSHOT_PATH: &str = "data/btp-data.json";

/// Sibling temp path used while writing `path`.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "snapshot.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Atomically replace the snapshot at `path`.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), ScrapeError> {
    let fail = |reason: String| ScrapeError::Serialization {
        path: path.to_path_buf(),
        reason,
    };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .map_err(|e| fail(format!("failed to create directory '{}': {e}", dir.display())))?;
    }

    let tmp = temp_path(path);
    let written = write_temp(&tmp, snapshot).and_then(|()| {
        fs::rename(&tmp, path).map_err(|e| format!("atomic rename failed: {e}"))
    });

    if let Err(reason) = written {
        let _ = fs::remove_file(&tmp);
        return Err(fail(reason));
    }

    debug!(path = %path.display(), "snapshot written");
    Ok(())
}

fn write_temp(tmp: &Path, snapshot: &Snapshot) -> Result<(), String> {
    let file = File::create(tmp).map_err(|e| format!("failed to create '{}': {e}", tmp.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, snapshot).map_err(|e| format!("failed to encode JSON: {e}"))?;
    writer.write_all(b"\n").map_err(|e| format!("failed to write: {e}"))?;
    let file = writer
        .into_inner()
        .map_err(|e| format!("failed to flush: {}", e.error()))?;
    file.sync_all().map_err(|e| format!("failed to sync: {e}"))
}

/// Read a persisted snapshot.
pub fn read_snapshot(path: &Path) -> Result<Snapshot, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open snapshot '{}': {e}", path.display())))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid snapshot JSON '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn empty_snapshot() -> Snapshot {
        Snapshot::assemble(Utc.with_ymd_and_hms(2025, 5, 2, 7, 0, 0).unwrap(), Vec::new(), Vec::new())
    }

    #[test]
    fn creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data").join("btp-data.json");

        write_snapshot(&path, &empty_snapshot()).unwrap();
        // Second write into the now-existing directory.
        write_snapshot(&path, &empty_snapshot()).unwrap();

        assert_eq!(read_snapshot(&path).unwrap(), empty_snapshot());
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn temp_path_is_a_sibling() {
        let p = Path::new("data/btp-data.json");
        assert_eq!(temp_path(p), Path::new("data/btp-data.json.tmp"));
    }

    #[test]
    fn failed_write_leaves_previous_snapshot_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("btp-data.json");
        write_snapshot(&path, &empty_snapshot()).unwrap();
        let before = fs::read(&path).unwrap();

        // A directory squatting on the temp path makes the write fail.
        fs::create_dir(temp_path(&path)).unwrap();
        let newer = Snapshot::assemble(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(), Vec::new(), Vec::new());
        let err = write_snapshot(&path, &newer).unwrap_err();

        assert!(matches!(err, ScrapeError::Serialization { .. }));
        assert_eq!(fs::read(&path).unwrap(), before);
    }
}
