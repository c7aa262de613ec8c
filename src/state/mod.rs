/// State management module
///
/// This module handles the data that outlives a single file conversion:
/// - The JSON catalog and its path rewriting (catalog.rs)
/// - Shared data structures and run counters (data.rs)

pub mod catalog;
pub mod data;
