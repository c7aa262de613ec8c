use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::config::JobConfig;
use crate::error::CatalogError;

/// Field holding the image path in each catalog record
const IMAGE_FIELD: &str = "image";

/// The Catalog wraps the `db.json` document.
/// It is read fully into memory, edited in place and written back whole.
pub struct Catalog {
    document: Value,
    path: PathBuf,
}

impl Catalog {
    /// Load and parse the catalog file
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        if !path.is_file() {
            return Err(CatalogError::NotFound(path.to_path_buf()));
        }

        let text = fs::read_to_string(path)?;
        let document: Value = serde_json::from_str(&text)?;
        if !document.is_array() {
            return Err(CatalogError::NotAnArray);
        }

        Ok(Catalog {
            document,
            path: path.to_path_buf(),
        })
    }

    /// Get the path to the catalog file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records in the catalog
    pub fn len(&self) -> usize {
        self.document.as_array().map_or(0, Vec::len)
    }

    /// Point every record with a convertible `image` path at the target extension.
    /// Returns the number of records changed.
    pub fn rewrite_image_paths(&mut self, extensions: &[String], target: &str) -> usize {
        let Some(records) = self.document.as_array_mut() else {
            return 0;
        };

        let mut updated = 0;
        for record in records.iter_mut() {
            let Some(image) = record.get_mut(IMAGE_FIELD) else {
                continue;
            };
            let Some(current) = image.as_str() else {
                continue;
            };
            if let Some(new_path) = rewrite_image_path(current, extensions, target) {
                tracing::debug!(from = current, to = %new_path, "rewriting catalog path");
                *image = Value::String(new_path);
                updated += 1;
            }
        }

        updated
    }

    /// Copy the on-disk catalog to `<dir>/db-YYYY-mm-dd-HH-MM-SS.json`.
    /// Returns the snapshot path.
    pub fn snapshot(&self, dir: &Path) -> Result<PathBuf, CatalogError> {
        let name = chrono::Local::now().format("db-%Y-%m-%d-%H-%M-%S.json").to_string();
        let snapshot_path = dir.join(name);

        fs::create_dir_all(dir)
            .and_then(|_| fs::copy(&self.path, &snapshot_path))
            .map_err(|source| CatalogError::Snapshot {
                path: snapshot_path.clone(),
                source,
            })?;

        Ok(snapshot_path)
    }

    /// Write the document back: 4-space indentation, UTF-8, non-ASCII kept literal.
    /// The file is replaced atomically so a crash never leaves it truncated,
    /// and keeps the permission bits of the file it replaces.
    pub fn save(&self) -> Result<(), CatalogError> {
        let bytes = to_pretty_json(&self.document)?;
        let permissions = fs::metadata(&self.path).map(|m| m.permissions()).ok();

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        if let Some(permissions) = permissions {
            tmp.as_file().set_permissions(permissions)?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| CatalogError::Io(e.error))?;

        Ok(())
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("path", &self.path)
            .field("records", &self.len())
            .finish()
    }
}

/// Compute the rewritten path for one `image` value.
///
/// The first extension (in list order) that the value ends with, compared
/// case-insensitively, wins; everything after the final `.` is replaced by
/// `target`. Returns `None` when no extension matches.
pub fn rewrite_image_path(value: &str, extensions: &[String], target: &str) -> Option<String> {
    let lower = value.to_lowercase();

    for ext in extensions {
        if !lower.ends_with(&format!(".{}", ext.to_lowercase())) {
            continue;
        }
        let (base, _) = value.rsplit_once('.')?;
        return Some(format!("{}.{}", base, target));
    }

    None
}

fn to_pretty_json(value: &Value) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

/// Best-effort catalog update at the end of a run.
///
/// Snapshots the current file (when configured), rewrites the paths and
/// saves. Any failure is reported and counted as zero updates; converted
/// images are never rolled back.
pub fn update_catalog(config: &JobConfig) -> usize {
    let path = config.catalog_path();
    if !path.exists() {
        println!("⚠️  {} not found, skipping database update", config.catalog_file);
        tracing::warn!(path = %path.display(), "catalog missing");
        return 0;
    }

    match try_update_catalog(config, &path) {
        Ok(updated) => updated,
        Err(e) => {
            println!("❌ Failed to update {}: {}", config.catalog_file, e);
            tracing::error!(error = %e, path = %path.display(), "catalog update failed");
            0
        }
    }
}

fn try_update_catalog(config: &JobConfig, path: &Path) -> Result<usize, CatalogError> {
    let mut catalog = Catalog::load(path)?;
    let records = catalog.len();

    if let Some(dir) = config.snapshot_path() {
        let snapshot = catalog.snapshot(&dir)?;
        println!("💾 Catalog snapshot saved to {}", snapshot.display());
    }

    let updated = catalog.rewrite_image_paths(&config.extensions, &config.target_extension);
    catalog.save()?;

    tracing::info!(records, updated, path = %catalog.path().display(), "catalog rewritten");
    Ok(updated)
}
