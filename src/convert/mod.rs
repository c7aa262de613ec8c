/// Image conversion module
///
/// This module handles:
/// - Decoding, orienting, flattening and resizing source images
/// - Encoding lossy WebP
/// - Backing up originals and restoring them when a conversion fails

pub mod backup;
pub mod encoder;
