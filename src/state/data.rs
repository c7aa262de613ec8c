/// Shared data structures for a migration run
///
/// These structs represent the data model that flows between
/// discovery, conversion and the final summary.

use std::path::{Path, PathBuf};

/// Represents a single convertible image found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    /// Full path to the source file
    pub path: PathBuf,
    /// Lowercase extension without the dot (e.g. "jpg")
    pub extension: String,
}

impl ImageFile {
    pub fn new(path: PathBuf, extension: impl Into<String>) -> Self {
        Self {
            path,
            extension: extension.into(),
        }
    }

    /// Filename only (e.g. "a.jpg")
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    /// Path relative to `root`, falling back to the full path
    pub fn relative_to(&self, root: &Path) -> PathBuf {
        self.path
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| self.path.clone())
    }
}

/// What happened to one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Converted; original removed (or removal warned about)
    Converted,
    /// Destination already existed, nothing touched
    Skipped,
    /// Backup or conversion failed; original left in place
    Failed,
}

/// Counters accumulated over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub converted: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Catalog records whose `image` path was rewritten
    pub catalog_updated: usize,
}

impl JobSummary {
    pub fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Converted => self.converted += 1,
            FileOutcome::Skipped => self.skipped += 1,
            FileOutcome::Failed => self.errors += 1,
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunReport {
    /// Discovery found nothing to convert
    NothingToDo,
    /// Operator declined the confirmation prompt
    Cancelled,
    Completed(JobSummary),
}
