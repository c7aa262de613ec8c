/// Job driver
///
/// Runs the whole migration: discover, confirm, convert file by file,
/// rewrite the catalog, summarise. Per-file failures are counted, never
/// propagated.

use std::io::{self, BufRead, Write};

use crate::config::JobConfig;
use crate::convert::{backup, encoder};
use crate::discover::discover_images;
use crate::error::JobError;
use crate::state::catalog::update_catalog;
use crate::state::data::{FileOutcome, ImageFile, JobSummary, RunReport};

/// Decides whether the destructive part of the run may start
pub trait Confirm {
    /// `count` is the number of images about to be converted
    fn confirm(&mut self, count: usize) -> io::Result<bool>;
}

impl<F> Confirm for F
where
    F: FnMut(usize) -> bool,
{
    fn confirm(&mut self, count: usize) -> io::Result<bool> {
        Ok(self(count))
    }
}

/// Always proceeds (`--yes`)
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _count: usize) -> io::Result<bool> {
        Ok(true)
    }
}

/// Asks on stdout and reads one answer line from stdin
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, count: usize) -> io::Result<bool> {
        print!("\n🔄 Convert {} images to WebP format? (y/N): ", count);
        io::stdout().flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(is_yes(&answer))
    }
}

/// Only "y" and "yes" (any case, surrounding whitespace ignored) count as consent
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Run the migration described by `config`
pub fn run(config: &JobConfig, confirm: &mut dyn Confirm) -> Result<RunReport, JobError> {
    if !encoder::encoder_available() {
        return Err(JobError::EncoderUnavailable);
    }
    if !config.root.is_dir() {
        return Err(JobError::MissingRoot(config.root.clone()));
    }

    let images = discover_images(&config.root, &config.categories, &config.extensions);
    if images.is_empty() {
        println!("ℹ️  No convertible images found.");
        return Ok(RunReport::NothingToDo);
    }

    println!("\n📊 Found {} images to convert:", images.len());
    for image in &images {
        println!("  • {}", image.relative_to(&config.root).display());
    }

    if !confirm.confirm(images.len())? {
        println!("❌ Conversion cancelled.");
        tracing::info!("operator declined, nothing changed");
        return Ok(RunReport::Cancelled);
    }

    println!("\n🚀 Starting conversion process...");
    let mut summary = JobSummary::default();
    let total = images.len();

    for (i, image) in images.iter().enumerate() {
        let outcome = process_file(config, image, i + 1, total);
        summary.record(outcome);
    }

    // The catalog is rewritten from path patterns alone, so records of files
    // that failed above still get the new extension.
    println!("\n📝 Updating {}...", config.catalog_file);
    summary.catalog_updated = update_catalog(config);
    println!("📊 Updated {} image paths in {}", summary.catalog_updated, config.catalog_file);
    if summary.errors > 0 {
        tracing::warn!(
            errors = summary.errors,
            "catalog may reference .{} files that were not produced",
            config.target_extension
        );
    }

    print_summary(config, &summary);
    Ok(RunReport::Completed(summary))
}

/// Backup, convert and replace a single file
fn process_file(config: &JobConfig, image: &ImageFile, index: usize, total: usize) -> FileOutcome {
    let name = image.name();
    let output = config.output_path(&image.path);

    if output.exists() {
        println!("[{}/{}] ⏭️  Skipping {} (WebP already exists)", index, total, name);
        return FileOutcome::Skipped;
    }

    println!("[{}/{}] 🔄 Converting {}...", index, total, name);
    tracing::debug!(path = %image.path.display(), format = %image.extension, "processing");

    if let Err(e) = backup::create_backup(&image.path, &config.backup_suffix) {
        println!("      ⚠️  {}", e);
        println!("      ⚠️  Skipping {} due to backup failure", name);
        tracing::error!(path = %image.path.display(), error = %e, "backup failed");
        return FileOutcome::Failed;
    }

    match encoder::convert_image(&image.path, &output, &config.encode) {
        Ok(converted) => {
            let (ow, oh) = converted.original;
            let (w, h) = converted.resized;
            println!("         ✅ Converted {} ({}×{} → {}×{})", name, ow, oh, w, h);

            match backup::remove_original(&image.path) {
                Ok(()) => println!("         🗑️  Removed original {}", name),
                Err(e) => {
                    println!("         ⚠️  Could not remove original: {}", e);
                    tracing::warn!(path = %image.path.display(), error = %e, "original left on disk");
                }
            }
            FileOutcome::Converted
        }
        Err(e) => {
            println!("         ❌ Failed to convert {}: {}", name, e);
            tracing::error!(path = %image.path.display(), error = %e, "conversion failed");

            match backup::restore_backup(&image.path, &config.backup_suffix) {
                Ok(true) => tracing::debug!(path = %image.path.display(), "original restored"),
                Ok(false) => {}
                Err(e) => println!("         ⚠️  {}", e),
            }
            FileOutcome::Failed
        }
    }
}

fn print_summary(config: &JobConfig, summary: &JobSummary) {
    println!("\n🎉 Conversion complete!");
    println!("✅ Successfully converted: {} images", summary.converted);
    println!("⏭️  Skipped (already exist): {} images", summary.skipped);
    println!("❌ Errors: {} images", summary.errors);

    if summary.converted > 0 {
        println!(
            "\n📏 All converted images resized to max {}×{}px while maintaining aspect ratio",
            config.encode.max_width, config.encode.max_height
        );
        println!("💾 Original files backed up with '{}' extension", config.backup_suffix);
        println!(
            "🗂️  Database paths updated to point to .{} files",
            config.target_extension
        );
    }

    tracing::info!(
        converted = summary.converted,
        skipped = summary.skipped,
        errors = summary.errors,
        catalog_updated = summary.catalog_updated,
        "migration finished"
    );
}
