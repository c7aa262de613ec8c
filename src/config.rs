/// Job configuration
///
/// All knobs of a migration run live here. `JobConfig::new` fills in the
/// fixed category list and format allow-list; tests build smaller configs
/// against temporary directories.

use std::path::{Path, PathBuf};

/// Category directories scanned under the root
pub const CATEGORIES: &[&str] = &[
    "Buffet", "Cabinet", "Divan", "Drawer", "Industrial", "Kursi",
    "Meja", "Nakas", "Rotan", "Set", "Sofa", "Stool", "uploaded",
];

/// Extensions eligible for conversion (lowercase, no dot).
/// WebP and SVG are deliberately absent.
pub const CONVERTIBLE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "bmp", "gif", "tiff", "ico",
];

/// Extension of converted files
pub const TARGET_EXTENSION: &str = "webp";

/// Bounding box for resized images
pub const MAX_WIDTH: u32 = 400;
pub const MAX_HEIGHT: u32 = 400;

/// WebP quality on a 0-100 scale
pub const WEBP_QUALITY: f32 = 85.0;

/// Appended to the original file name to form its safety copy
pub const BACKUP_SUFFIX: &str = ".backup";

/// Catalog file name at the root
pub const CATALOG_FILE: &str = "db.json";

/// Directory (relative to root) holding timestamped catalog snapshots
pub const CATALOG_SNAPSHOT_DIR: &str = "database-backup";

/// Encoder settings for a single conversion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeSettings {
    pub max_width: u32,
    pub max_height: u32,
    pub quality: f32,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            max_width: MAX_WIDTH,
            max_height: MAX_HEIGHT,
            quality: WEBP_QUALITY,
        }
    }
}

/// Everything a run needs to know
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Directory containing the category folders and the catalog
    pub root: PathBuf,
    pub categories: Vec<String>,
    pub extensions: Vec<String>,
    pub target_extension: String,
    pub backup_suffix: String,
    pub catalog_file: String,
    /// `None` disables the catalog snapshot before rewriting
    pub snapshot_dir: Option<String>,
    pub encode: EncodeSettings,
}

impl JobConfig {
    /// Configuration with the built-in category list and formats
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            categories: CATEGORIES.iter().map(|s| s.to_string()).collect(),
            extensions: CONVERTIBLE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            target_extension: TARGET_EXTENSION.to_string(),
            backup_suffix: BACKUP_SUFFIX.to_string(),
            catalog_file: CATALOG_FILE.to_string(),
            snapshot_dir: Some(CATALOG_SNAPSHOT_DIR.to_string()),
            encode: EncodeSettings::default(),
        }
    }

    /// Replace the category list
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.root.join(&self.catalog_file)
    }

    pub fn snapshot_path(&self) -> Option<PathBuf> {
        self.snapshot_dir.as_ref().map(|dir| self.root.join(dir))
    }

    /// Destination for a source file: same stem, target extension
    pub fn output_path(&self, input: &Path) -> PathBuf {
        input.with_extension(&self.target_extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_exclude_target_format() {
        let config = JobConfig::new("/srv/shop");
        assert_eq!(config.categories.len(), 13);
        assert!(config.extensions.iter().all(|e| e != "webp" && e != "svg"));
        assert_eq!(config.catalog_path(), PathBuf::from("/srv/shop/db.json"));
        assert_eq!(
            config.snapshot_path(),
            Some(PathBuf::from("/srv/shop/database-backup"))
        );
    }

    #[test]
    fn test_output_path_swaps_only_last_extension() {
        let config = JobConfig::new("/srv/shop");
        assert_eq!(
            config.output_path(Path::new("/srv/shop/Sofa/a.b.JPG")),
            PathBuf::from("/srv/shop/Sofa/a.b.webp")
        );
    }

    #[test]
    fn test_with_categories_overrides_list() {
        let config = JobConfig::new(".").with_categories(["Sofa"]);
        assert_eq!(config.categories, vec!["Sofa".to_string()]);
    }
}
