/// Image discovery
///
/// Walks each category directory under the root and collects files whose
/// extension is in the convertible set.

use std::path::Path;
use walkdir::WalkDir;

use crate::state::data::ImageFile;

/// Scan the category folders under `root` for convertible images.
///
/// Categories are visited in list order; missing ones are skipped silently.
/// Within a category the order is whatever the directory walk yields.
pub fn discover_images(root: &Path, categories: &[String], extensions: &[String]) -> Vec<ImageFile> {
    let mut images = Vec::new();

    println!("🔍 Scanning for convertible images...");

    for category in categories {
        let category_path = root.join(category);
        if !category_path.is_dir() {
            tracing::debug!(category = %category, "category directory missing, skipping");
            continue;
        }

        println!("📁 Scanning {}...", category);
        let before = images.len();

        // Walk the directory tree recursively
        for entry in WalkDir::new(&category_path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();

            // Only process files (not directories)
            if !path.is_file() {
                continue;
            }

            if let Some(ext) = convertible_extension(path, extensions) {
                images.push(ImageFile::new(path.to_path_buf(), ext));
            }
        }

        tracing::debug!(category = %category, found = images.len() - before, "category scanned");
    }

    images
}

/// Lowercase extension of `path` if it is in the convertible set
pub fn convertible_extension(path: &Path, extensions: &[String]) -> Option<String> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    extensions
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(&ext))
        .then_some(ext)
}
