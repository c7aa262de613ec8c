/// Backup and replace bookkeeping around a conversion
///
/// Before conversion the original is copied to `<name>.<ext>.backup`.
/// Success deletes the original and keeps the backup; failure moves the
/// backup back over the original.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BackupError;

/// `Sofa/a.jpg` + `.backup` -> `Sofa/a.jpg.backup`
pub fn backup_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Copy the original aside, keeping its permissions and modification time
pub fn create_backup(path: &Path, suffix: &str) -> Result<PathBuf, BackupError> {
    let backup = backup_path(path, suffix);
    let copy_err = |source: std::io::Error| BackupError::Copy {
        path: path.to_path_buf(),
        source,
    };

    fs::copy(path, &backup).map_err(copy_err)?;

    // Carry the timestamp over; a failure here still leaves a usable copy
    let modified = fs::metadata(path).and_then(|m| m.modified());
    match modified {
        Ok(mtime) => {
            if let Err(e) = fs::File::options()
                .write(true)
                .open(&backup)
                .and_then(|f| f.set_modified(mtime))
            {
                tracing::warn!(backup = %backup.display(), error = %e, "could not preserve modification time");
            }
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not read modification time");
        }
    }

    Ok(backup)
}

/// Delete the original after a successful conversion
pub fn remove_original(path: &Path) -> Result<(), BackupError> {
    fs::remove_file(path).map_err(|source| BackupError::Remove {
        path: path.to_path_buf(),
        source,
    })
}

/// Move the backup back over the original after a failed conversion.
/// Returns `Ok(false)` when there was no backup to restore.
pub fn restore_backup(path: &Path, suffix: &str) -> Result<bool, BackupError> {
    let backup = backup_path(path, suffix);
    if !backup.exists() {
        return Ok(false);
    }

    fs::rename(&backup, path).map_err(|source| BackupError::Restore {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(true)
}
