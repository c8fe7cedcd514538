pub mod archive;
pub mod batch;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod formats;
pub mod logger;
pub mod processing;
pub mod progress;
pub mod report;
pub mod server;

pub use archive::{Archive, ArchiveAssembler};
pub use batch::{
    collect_image_files, is_image_file, run_batch, zip_images, BatchOutcome, BatchResult,
    FileSizeRecord, ImageCollector,
};
pub use config::ServerConfig;
pub use error::{Result, ZipperError};
pub use formats::OutputFormat;
pub use processing::{
    compute_target_dimensions, output_file_name, transform_image, validate_file_exists,
    ImageInput, ProcessedImage, TransformConfig,
};
pub use progress::{NoProgress, ProgressBarListener, ProgressListener, ProgressState};
pub use report::{calculate_compression_ratio, format_file_size, BatchResponse};
