//! Result reporting and delivery
//!
//! Turns a finished run into what the caller sees: a console summary for the
//! CLI, a JSON body for the HTTP service, and the archive file on disk.

use crate::batch::{BatchOutcome, BatchResult, FileSizeRecord};
use crate::error::{Result, ZipperError};
use crate::info;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;
use std::fs;
use std::path::Path;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

/// Format file size in human-readable format
///
/// # Example
/// ```
/// use img_zipper::format_file_size;
///
/// assert_eq!(format_file_size(500), "500 bytes");
/// assert_eq!(format_file_size(2048), "2.00 KB");
/// assert_eq!(format_file_size(5_242_880), "5.00 MB");
/// ```
pub fn format_file_size(bytes: u64) -> String {
    if bytes < KIB {
        format!("{} bytes", bytes)
    } else if bytes < MIB {
        format!("{:.2} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{:.2} MB", bytes as f64 / MIB as f64)
    }
}

/// Calculate compression ratio as a percentage
///
/// Positive means the output is smaller, negative means it grew.
pub fn calculate_compression_ratio(original_size: u64, compressed_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    ((original_size as f64 - compressed_size as f64) / original_size as f64) * 100.0
}

/// JSON body returned by the HTTP service.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    /// Base64-encoded ZIP archive
    pub zip_content: String,
    pub total_original_size: u64,
    pub total_processed_size: u64,
    pub zip_size: u64,
    pub file_sizes: Vec<FileSizeRecord>,
}

impl BatchResponse {
    pub fn from_outcome(outcome: &BatchOutcome) -> Self {
        let result = &outcome.result;
        Self {
            zip_content: STANDARD.encode(&outcome.archive.bytes),
            total_original_size: result.total_original_size,
            total_processed_size: result.total_processed_size,
            zip_size: result.archive_size,
            file_sizes: result.files.clone(),
        }
    }
}

/// Writes the archive to `path`, creating parent directories and replacing any
/// previous file.
pub fn persist_archive(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|_| ZipperError::DirectoryCreationFailed(parent.to_path_buf()))?;
    }
    fs::write(path, bytes)?;
    Ok(())
}

fn describe_archive_ratio(ratio: f64) -> String {
    if ratio > 0.0 {
        format!("🎯 Archive is {:.1}% smaller than the originals", ratio)
    } else if ratio < 0.0 {
        format!("⚠️  Archive is {:.1}% larger than the originals", ratio.abs())
    } else {
        "➖ Archive is the same size as the originals".to_string()
    }
}

/// Print the per-file table and totals of a finished run.
pub fn print_batch_summary(result: &BatchResult, archive_path: &Path) {
    let name_width = result
        .files
        .iter()
        .map(|f| f.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("File".len());

    info!("\n📊 Batch Summary:");
    info!(
        "  {:<width$}  {:>12}  {:>12}  {:>8}",
        "File",
        "Original",
        "Processed",
        "Saved",
        width = name_width
    );
    for file in &result.files {
        info!(
            "  {:<width$}  {:>12}  {:>12}  {:>7.1}%",
            file.name,
            format_file_size(file.original_size),
            format_file_size(file.processed_size),
            calculate_compression_ratio(file.original_size, file.processed_size),
            width = name_width
        );
    }

    info!();
    info!("  📁 Files processed: {}", result.files.len());
    info!(
        "  📊 Total original size: {}",
        format_file_size(result.total_original_size)
    );
    info!(
        "  📈 Total processed size: {}",
        format_file_size(result.total_processed_size)
    );
    info!("  📦 ZIP file size: {}", format_file_size(result.archive_size));

    let ratio = calculate_compression_ratio(result.total_original_size, result.archive_size);
    info!("  {}", describe_archive_ratio(ratio));
    info!("✅ Saved archive to {}", archive_path.display());
}
