use crate::archive::{Archive, ArchiveAssembler};
use crate::constants::{
    MAX_BATCH_FILES, MAX_BATCH_MEMORY_MIB, MIN_AVAILABLE_MEMORY_MIB, SUPPORTED_INPUT_EXTENSIONS,
};
use crate::error::{Result, ZipperError};
use crate::formats::format_from_extension;
use crate::processing::{transform_image, ImageInput, TransformConfig};
use crate::logger::is_quiet;
use crate::progress::{ProgressBarListener, ProgressListener, ProgressState};
use crate::report::{persist_archive, print_batch_summary};
use crate::{info, verbose};
use glob::glob;
use image::ImageFormat;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use sysinfo::{MemoryRefreshKind, RefreshKind, System};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Size statistics for one archived file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSizeRecord {
    pub name: String,
    pub original_size: u64,
    pub processed_size: u64,
}

/// Aggregate statistics of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub total_original_size: u64,
    pub total_processed_size: u64,
    pub archive_size: u64,
    pub files: Vec<FileSizeRecord>,
}

/// Everything a successful run produces.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub archive: Archive,
    pub result: BatchResult,
}

/// Ordered list of inputs for one run.
#[derive(Debug, Default)]
pub struct ImageCollector {
    inputs: Vec<ImageInput>,
    seen_paths: HashSet<PathBuf>,
}

impl ImageCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an input, rejecting names without a supported image extension.
    ///
    /// Returns `false` when the same source file was already collected.
    pub fn push(&mut self, input: ImageInput) -> Result<bool> {
        if !is_image_file(Path::new(input.name())) {
            return Err(ZipperError::UnsupportedFormat(format!(
                "{} is not a supported image file",
                input.name()
            )));
        }

        if let Some(source) = input.source() {
            let key = source
                .canonicalize()
                .unwrap_or_else(|_| source.to_path_buf());
            if !self.seen_paths.insert(key) {
                debug!("Skipping duplicate input {:?}", source);
                return Ok(false);
            }
        }

        self.inputs.push(input);
        Ok(true)
    }

    /// Reads `path` from disk and appends it.
    pub fn add_path(&mut self, path: &Path) -> Result<bool> {
        self.push(ImageInput::from_path(path)?)
    }

    /// Collects every image matched by a file, directory or glob argument.
    ///
    /// # Returns
    /// * `Ok(count)` - Number of new inputs added
    pub fn add_from(&mut self, input: &str, recursive: bool) -> Result<usize> {
        let mut added = 0;
        for path in collect_image_files(input, recursive)? {
            if self.add_path(&path)? {
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn inputs(&self) -> &[ImageInput] {
        &self.inputs
    }

    pub fn into_inputs(self) -> Vec<ImageInput> {
        self.inputs
    }
}

/// Runs the whole pipeline over `inputs` in order.
///
/// Images are transformed one at a time and added to the archive as they
/// complete. Progress is emitted as `0/N` before the first image and after each
/// one. The first failure aborts the run: the listener is reset and no archive
/// or statistics are returned.
///
/// # Arguments
/// * `inputs` - Files to process, consumed by the run
/// * `config` - Settings applied to every image
/// * `progress` - Receives progress events
///
/// # Returns
/// * `Ok(BatchOutcome)` - The finished archive and its statistics
/// * `Err(ZipperError)` - The first transformation or archive error
pub fn run_batch<P>(
    inputs: Vec<ImageInput>,
    config: &TransformConfig,
    progress: &mut P,
) -> Result<BatchOutcome>
where
    P: ProgressListener + ?Sized,
{
    match run_batch_inner(inputs, config, progress) {
        Ok(outcome) => {
            progress.finish();
            Ok(outcome)
        }
        Err(e) => {
            warn!("Batch aborted: {}", e);
            progress.reset();
            Err(e)
        }
    }
}

fn run_batch_inner<P>(
    inputs: Vec<ImageInput>,
    config: &TransformConfig,
    progress: &mut P,
) -> Result<BatchOutcome>
where
    P: ProgressListener + ?Sized,
{
    validate_batch_limits(&inputs)?;

    let mut state = ProgressState::start(inputs.len());
    progress.on_progress(state);

    let mut assembler = ArchiveAssembler::new();
    let mut result = BatchResult {
        files: Vec::with_capacity(inputs.len()),
        ..BatchResult::default()
    };

    for input in inputs {
        let processed = transform_image(&input, config)?;
        let stored_name = assembler.add_entry(&processed.name, &processed.data)?;

        result.total_original_size += processed.original_size;
        result.total_processed_size += processed.size();
        result.files.push(FileSizeRecord {
            name: stored_name,
            original_size: processed.original_size,
            processed_size: processed.size(),
        });

        state.advance();
        debug!(
            "Progress {}/{} ({:.0}%)",
            state.current,
            state.total,
            state.percent()
        );
        progress.on_progress(state);
    }
    debug_assert!(state.is_complete());

    let archive = assembler.finish()?;
    result.archive_size = archive.size();

    Ok(BatchOutcome { archive, result })
}

/// Zips every image matched by `inputs` into the archive at `output`.
///
/// This is the interactive driver: it shows a progress bar, writes the archive
/// to disk and prints a per-file summary.
pub fn zip_images(
    inputs: &[String],
    output: &Path,
    config: &TransformConfig,
    recursive: bool,
) -> Result<BatchResult> {
    let start_time = Instant::now();

    info!("🚀 Starting batch run...");
    info!("📦 Archive: {}", output.display());
    info!(
        "⚙️  Format: {}, quality: {}, bounds: {}",
        config.format,
        config.quality,
        describe_bounds(config)
    );

    let mut collector = ImageCollector::new();
    for input in inputs {
        let added = collector.add_from(input, recursive)?;
        verbose!("{}: {} image(s)", input, added);
    }

    if collector.is_empty() {
        return Err(ZipperError::NoImageFilesFound(inputs.join(", ")));
    }

    info!("📊 Found {} image files to process", collector.len());

    let mut progress = if is_quiet() {
        ProgressBarListener::hidden()
    } else {
        ProgressBarListener::new()
    };
    let outcome = run_batch(collector.into_inputs(), config, &mut progress)?;
    persist_archive(output, &outcome.archive.bytes)?;

    print_batch_summary(&outcome.result, output);
    info!("  ⏱️  Total time: {:?}", start_time.elapsed());

    Ok(outcome.result)
}

fn describe_bounds(config: &TransformConfig) -> String {
    let mut parts = Vec::new();
    if let Some(v) = config.max_length {
        parts.push(format!("long edge {}px", v));
    }
    if let Some(v) = config.max_width {
        parts.push(format!("width {}px", v));
    }
    if let Some(v) = config.max_height {
        parts.push(format!("height {}px", v));
    }
    if parts.is_empty() {
        "none".to_string()
    } else {
        parts.join(", ")
    }
}

/// Estimates decoded memory for an input from its encoded size.
fn estimate_image_memory_usage(input: &ImageInput) -> f64 {
    let size_mib = input.size() as f64 / (1024.0 * 1024.0);

    // Decoded pixels are typically several times the compressed payload
    let multiplier = match Path::new(input.name())
        .extension()
        .and_then(|s| s.to_str())
        .and_then(format_from_extension)
    {
        Some(ImageFormat::Jpeg) => 4.0,
        Some(ImageFormat::Png) => 3.0,
        Some(ImageFormat::WebP) => 3.5,
        Some(ImageFormat::Bmp) | Some(ImageFormat::Tiff) => 1.2,
        Some(ImageFormat::Gif) => 2.0,
        _ => 3.0,
    };

    size_mib * multiplier
}

/// Rejects batches that are too large to hold in memory.
///
/// # Returns
/// * `Ok(estimated_mib)` - Estimated peak memory of the largest single image
/// * `Err(ZipperError)` - If the file count or memory limits would be exceeded
fn validate_batch_limits(inputs: &[ImageInput]) -> Result<f64> {
    if inputs.len() > MAX_BATCH_FILES {
        return Err(ZipperError::BatchFileLimitExceeded(
            inputs.len(),
            MAX_BATCH_FILES,
        ));
    }

    // Inputs stay resident for the whole run; only one image is decoded at a time
    let resident_mib = inputs.iter().map(|i| i.size()).sum::<u64>() as f64 / (1024.0 * 1024.0);
    let peak_decode_mib = inputs
        .iter()
        .map(estimate_image_memory_usage)
        .fold(0.0, f64::max);
    let required_mib = (resident_mib + peak_decode_mib).ceil() as u64;

    if required_mib > MAX_BATCH_MEMORY_MIB {
        return Err(ZipperError::BatchMemoryLimitExceeded(
            required_mib,
            MAX_BATCH_MEMORY_MIB,
        ));
    }

    let mut sys =
        System::new_with_specifics(RefreshKind::new().with_memory(MemoryRefreshKind::new()));
    sys.refresh_memory();
    let available_mem_mib = sys.available_memory() / (1024 * 1024);
    // Some sandboxes report zero available memory; skip the check there
    if available_mem_mib > 0 && required_mib + MIN_AVAILABLE_MEMORY_MIB > available_mem_mib {
        return Err(ZipperError::InsufficientMemory(
            required_mib,
            available_mem_mib,
        ));
    }

    Ok(peak_decode_mib)
}

pub fn collect_image_files(input: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut image_files = Vec::new();
    let input_path = Path::new(input);

    if input_path.is_file() {
        image_files.push(input_path.to_path_buf());
    } else if input_path.is_dir() {
        let walker = if recursive {
            WalkDir::new(input_path)
        } else {
            WalkDir::new(input_path).max_depth(1)
        };

        for entry in walker
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() && is_image_file(path) {
                image_files.push(path.to_path_buf());
            }
        }
    } else if let Ok(glob_pattern) = glob(input) {
        for entry in glob_pattern.flatten() {
            if entry.is_file() && is_image_file(&entry) {
                image_files.push(entry);
            }
        }
    } else {
        return Err(ZipperError::NoImageFilesFound(input.to_string()));
    }

    Ok(image_files)
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| SUPPORTED_INPUT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
