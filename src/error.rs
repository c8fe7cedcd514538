use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZipperError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode {name} as {format}: {reason}")]
    Encode {
        name: String,
        format: String,
        reason: String,
    },

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Invalid quality value: {0}. Must be between 1 and 100")]
    InvalidQuality(i64),

    #[error("Invalid maximum dimension: {0}. Must be a positive number of pixels")]
    InvalidMaxLength(u32),

    #[error("Invalid image dimensions: {0}x{1}. Maximum allowed: {2}x{2}")]
    InvalidDimensions(u32, u32, u32),

    #[error("File too large: {0} bytes. Maximum allowed: {1} bytes")]
    FileTooLarge(u64, u64),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to create output directory: {0}")]
    DirectoryCreationFailed(PathBuf),

    #[error("No image files found in input path: {0}")]
    NoImageFilesFound(String),

    #[error("Walkdir error: {0}")]
    WalkdirError(#[from] walkdir::Error),

    #[error("Batch memory limit exceeded: estimated {0}MB, maximum allowed {1}MB")]
    BatchMemoryLimitExceeded(u64, u64),

    #[error("Batch file count limit exceeded: {0} files, maximum allowed {1}")]
    BatchFileLimitExceeded(usize, usize),

    #[error(
        "Insufficient available memory: estimated batch requires {0}MB, but only {1}MB available"
    )]
    InsufficientMemory(u64, u64),
}

impl ZipperError {
    /// Short machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ZipperError::Io(_) | ZipperError::DirectoryCreationFailed(_) => "IO_ERROR",
            ZipperError::Encode { .. } => "ENCODE_FAILED",
            ZipperError::Decode { .. } => "DECODE_FAILED",
            ZipperError::Archive(_) => "ARCHIVE_FAILED",
            ZipperError::InvalidQuality(_) => "INVALID_QUALITY",
            ZipperError::InvalidMaxLength(_) => "INVALID_MAX_LENGTH",
            ZipperError::InvalidDimensions(..) => "INVALID_DIMENSIONS",
            ZipperError::FileTooLarge(..) => "FILE_TOO_LARGE",
            ZipperError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            ZipperError::FileNotFound(_) => "FILE_NOT_FOUND",
            ZipperError::NoImageFilesFound(_) => "NO_IMAGES",
            ZipperError::WalkdirError(_) => "IO_ERROR",
            ZipperError::BatchMemoryLimitExceeded(..)
            | ZipperError::BatchFileLimitExceeded(..)
            | ZipperError::InsufficientMemory(..) => "BATCH_LIMIT",
        }
    }

    /// Whether the failure was caused by the caller's input rather than the host.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ZipperError::Decode { .. }
                | ZipperError::InvalidQuality(_)
                | ZipperError::InvalidMaxLength(_)
                | ZipperError::InvalidDimensions(..)
                | ZipperError::FileTooLarge(..)
                | ZipperError::UnsupportedFormat(_)
                | ZipperError::NoImageFilesFound(_)
                | ZipperError::BatchFileLimitExceeded(..)
                | ZipperError::BatchMemoryLimitExceeded(..)
        )
    }
}

pub type Result<T> = std::result::Result<T, ZipperError>;
