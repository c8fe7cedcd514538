pub const MIN_QUALITY: u8 = 1;
pub const MAX_QUALITY: u8 = 100;

// Per-format quality defaults
pub const DEFAULT_WEBP_QUALITY: u8 = 75;
pub const DEFAULT_JPEG_QUALITY: u8 = 85;
pub const DEFAULT_PNG_QUALITY: u8 = 90;
pub const FALLBACK_QUALITY: u8 = 75;

/// Long-edge cap applied by the `zip` command unless `--no-resize` is given.
pub const DEFAULT_MAX_LENGTH: u32 = 2000;

/// Lossless oxipng preset applied to every PNG output (0 = fastest, 6 = smallest).
pub const PNG_OPTIMIZATION_PRESET: u8 = 2;

/// Maximum input file size in bytes (100MB)
pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
/// Maximum width or height accepted after decoding
pub const MAX_IMAGE_DIMENSION: u32 = 20_000;

pub const MAX_BATCH_FILES: usize = 1000;
pub const MAX_BATCH_MEMORY_MIB: u64 = 4096;
pub const MIN_AVAILABLE_MEMORY_MIB: u64 = 256;

pub const DEFAULT_ARCHIVE_NAME: &str = "images.zip";
pub const DEFAULT_SERVER_OUTPUT: &str = "public/output/images.zip";
pub const DEFAULT_SERVER_BIND: &str = "0.0.0.0";
pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_BODY_LIMIT_MIB: usize = 256;
pub const DEFAULT_CONFIG_PATH: &str = "img-zipper.toml";

pub const SUPPORTED_INPUT_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "webp", "gif", "bmp", "tiff", "tif"];

pub const PROGRESS_BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} images {msg}";
