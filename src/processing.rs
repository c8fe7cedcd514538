use crate::constants::{
    DEFAULT_JPEG_QUALITY, DEFAULT_WEBP_QUALITY, MAX_FILE_SIZE, MAX_IMAGE_DIMENSION, MAX_QUALITY,
    MIN_QUALITY, PNG_OPTIMIZATION_PRESET,
};
use crate::error::{Result, ZipperError};
use crate::formats::{is_lossy, is_supported_input, OutputFormat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::error::{ImageFormatHint, UnsupportedError, UnsupportedErrorKind};
use image::{ColorType, DynamicImage, GenericImageView, ImageError, ImageFormat};
use std::borrow::Cow;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings shared by every image of one batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformConfig {
    pub format: OutputFormat,
    pub quality: u8,
    /// Cap on the long edge, `None` means unbounded
    pub max_length: Option<u32>,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
}

impl TransformConfig {
    pub fn new(format: OutputFormat, quality: Option<u8>, max_length: Option<u32>) -> Result<Self> {
        let quality = quality.unwrap_or_else(|| format.default_quality());
        if !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
            return Err(ZipperError::InvalidQuality(i64::from(quality)));
        }
        validate_bound(max_length)?;

        Ok(Self {
            format,
            quality,
            max_length,
            max_width: None,
            max_height: None,
        })
    }

    /// Adds independent width/height bounds on top of the long-edge cap.
    pub fn with_bounds(mut self, max_width: Option<u32>, max_height: Option<u32>) -> Result<Self> {
        validate_bound(max_width)?;
        validate_bound(max_height)?;
        self.max_width = max_width;
        self.max_height = max_height;
        Ok(self)
    }

    /// Quality as the 0.0-1.0 fraction handed to lossy encoders.
    pub fn quality_fraction(&self) -> f32 {
        f32::from(self.quality) / 100.0
    }

    fn bounding_box(&self) -> (Option<u32>, Option<u32>) {
        (
            min_bound(self.max_length, self.max_width),
            min_bound(self.max_length, self.max_height),
        )
    }
}

fn validate_bound(bound: Option<u32>) -> Result<()> {
    match bound {
        Some(0) => Err(ZipperError::InvalidMaxLength(0)),
        _ => Ok(()),
    }
}

fn min_bound(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// One user-supplied file, captured as raw bytes.
#[derive(Debug, Clone)]
pub struct ImageInput {
    name: String,
    data: Vec<u8>,
    source: Option<PathBuf>,
}

impl ImageInput {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
            source: None,
        }
    }

    /// Reads an image file from disk.
    ///
    /// # Arguments
    /// * `path` - Path to the image file
    ///
    /// # Returns
    /// * `Ok(ImageInput)` - The file's name and contents
    /// * `Err(ZipperError)` - If the file is missing, unreadable or over `MAX_FILE_SIZE`
    pub fn from_path(path: &Path) -> Result<Self> {
        validate_file_exists(path)?;

        let file_size = fs::metadata(path)?.len();
        if file_size > MAX_FILE_SIZE {
            return Err(ZipperError::FileTooLarge(file_size, MAX_FILE_SIZE));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ZipperError::UnsupportedFormat("Invalid file name".to_string()))?;
        let data = fs::read(path)?;

        Ok(Self {
            name,
            data,
            source: Some(path.to_path_buf()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

/// Encoded output of one transformed image.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub name: String,
    pub data: Vec<u8>,
    pub original_size: u64,
    pub width: u32,
    pub height: u32,
}

impl ProcessedImage {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Validates that a file exists at the given path.
///
/// # Example
/// ```
/// use std::path::Path;
/// use img_zipper::validate_file_exists;
///
/// let result = validate_file_exists(Path::new("nonexistent.jpg"));
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(ZipperError::FileNotFound(path.to_path_buf()));
    }
    Ok(())
}

/// Decode, resize and re-encode a single image.
///
/// # Arguments
/// * `input` - The raw input file
/// * `config` - Format, quality and size bounds for the run
///
/// # Returns
/// * `Ok(ProcessedImage)` - Encoded bytes plus the derived output file name
/// * `Err(ZipperError::Decode)` - If the payload is not a recognizable image
/// * `Err(ZipperError::Encode)` - If the target format cannot be produced
pub fn transform_image(input: &ImageInput, config: &TransformConfig) -> Result<ProcessedImage> {
    let (mut img, source_format) = decode_image(input)?;
    let (source_width, source_height) = img.dimensions();

    resize_image(&mut img, config);

    let target_format = config.format.to_image_format().unwrap_or(source_format);
    let quality = is_lossy(target_format).then(|| config.quality_fraction());
    let data = encode_image(&img, target_format, quality, input.name())?;
    let name = output_file_name(input.name(), config.format);

    debug!(
        "{}: {}x{} -> {}x{} {:?}, {} -> {} bytes",
        input.name(),
        source_width,
        source_height,
        img.width(),
        img.height(),
        target_format,
        input.size(),
        data.len()
    );

    Ok(ProcessedImage {
        name,
        data,
        original_size: input.size(),
        width: img.width(),
        height: img.height(),
    })
}

/// Decodes an input payload, sniffing its format from the content.
pub fn decode_image(input: &ImageInput) -> Result<(DynamicImage, ImageFormat)> {
    let decode_error = |source| ZipperError::Decode {
        name: input.name().to_string(),
        source,
    };

    let format = image::guess_format(input.data()).map_err(decode_error)?;
    if !is_supported_input(format) {
        let hint = ImageFormatHint::Exact(format);
        return Err(decode_error(ImageError::Unsupported(
            UnsupportedError::from_format_and_kind(hint.clone(), UnsupportedErrorKind::Format(hint)),
        )));
    }
    let img = image::load_from_memory_with_format(input.data(), format).map_err(decode_error)?;

    let (width, height) = img.dimensions();
    if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        return Err(ZipperError::InvalidDimensions(
            width,
            height,
            MAX_IMAGE_DIMENSION,
        ));
    }

    Ok((img, format))
}

/// Dimensions an image of `width`x`height` should be resampled to.
///
/// The image is scaled down uniformly until it fits the configured bounding box.
/// The limiting axis lands exactly on its bound and the other axis is rounded to
/// the nearest pixel. Images that already fit are never enlarged.
pub fn compute_target_dimensions(width: u32, height: u32, config: &TransformConfig) -> (u32, u32) {
    let (bound_w, bound_h) = config.bounding_box();
    let bound_w = bound_w.unwrap_or(u32::MAX);
    let bound_h = bound_h.unwrap_or(u32::MAX);

    if width == 0 || height == 0 || (width <= bound_w && height <= bound_h) {
        return (width, height);
    }

    let scale_w = f64::from(bound_w) / f64::from(width);
    let scale_h = f64::from(bound_h) / f64::from(height);

    if scale_w <= scale_h {
        (bound_w, scale_dimension(height, scale_w))
    } else {
        (scale_dimension(width, scale_h), bound_h)
    }
}

fn scale_dimension(value: u32, scale: f64) -> u32 {
    ((f64::from(value) * scale).round() as u32).max(1)
}

pub fn resize_image(img: &mut DynamicImage, config: &TransformConfig) {
    let (width, height) = img.dimensions();
    let (target_w, target_h) = compute_target_dimensions(width, height, config);

    if (target_w, target_h) != (width, height) {
        *img = img.resize_exact(target_w, target_h, image::imageops::FilterType::Lanczos3);
    }
}

/// Derive the archive entry name for an input file.
///
/// The original extension is replaced by the target format's canonical one,
/// or kept as written when the format is [`OutputFormat::Original`].
pub fn output_file_name(original_name: &str, format: OutputFormat) -> String {
    let path = Path::new(original_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| original_name.to_string());

    let extension = match format.extension() {
        Some(ext) => Some(ext.to_string()),
        None => path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned()),
    };

    match extension {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    }
}

/// Encode `img` into `format`.
///
/// `quality` is a 0.0-1.0 fraction and only consulted by lossy encoders.
pub fn encode_image(
    img: &DynamicImage,
    format: ImageFormat,
    quality: Option<f32>,
    name: &str,
) -> Result<Vec<u8>> {
    let encode_error = |reason: String| ZipperError::Encode {
        name: name.to_string(),
        format: format!("{:?}", format),
        reason,
    };
    let native_quality = quality.map(|q| (q * 100.0).round().clamp(1.0, 100.0));

    let mut buf = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            let q = native_quality.unwrap_or(f32::from(DEFAULT_JPEG_QUALITY));
            let encoder = JpegEncoder::new_with_quality(&mut buf, q as u8);
            // JPEG has no alpha channel
            DynamicImage::ImageRgb8(img.to_rgb8())
                .write_with_encoder(encoder)
                .map_err(|e| encode_error(e.to_string()))?;
        }
        ImageFormat::WebP => {
            let q = native_quality.unwrap_or(f32::from(DEFAULT_WEBP_QUALITY));
            let rgba = img.to_rgba8();
            let encoded = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height())
                .encode_simple(false, q)
                .map_err(|e| encode_error(format!("{:?}", e)))?;
            buf.extend_from_slice(&encoded);
        }
        ImageFormat::Png => {
            let encoder = PngEncoder::new(&mut buf);
            encodable_color(img, format)
                .write_with_encoder(encoder)
                .map_err(|e| encode_error(e.to_string()))?;

            let options = oxipng::Options::from_preset(PNG_OPTIMIZATION_PRESET);
            buf = oxipng::optimize_from_memory(&buf, &options)
                .map_err(|e| encode_error(e.to_string()))?;
        }
        ImageFormat::Gif | ImageFormat::Bmp | ImageFormat::Tiff => {
            encodable_color(img, format)
                .write_to(&mut Cursor::new(&mut buf), format)
                .map_err(|e| encode_error(e.to_string()))?;
        }
        other => {
            return Err(encode_error(format!("no encoder available for {:?}", other)));
        }
    }

    Ok(buf)
}

/// Converts pixel layouts an encoder cannot take into 8-bit RGB(A).
fn encodable_color(img: &DynamicImage, format: ImageFormat) -> Cow<'_, DynamicImage> {
    let needs_conversion = match format {
        ImageFormat::Gif => img.color() != ColorType::Rgba8,
        ImageFormat::Bmp => !matches!(
            img.color(),
            ColorType::Rgb8 | ColorType::Rgba8 | ColorType::L8 | ColorType::La8
        ),
        _ => matches!(img.color(), ColorType::Rgb32F | ColorType::Rgba32F),
    };

    if !needs_conversion {
        return Cow::Borrowed(img);
    }

    if format == ImageFormat::Gif || img.color().has_alpha() {
        Cow::Owned(DynamicImage::ImageRgba8(img.to_rgba8()))
    } else {
        Cow::Owned(DynamicImage::ImageRgb8(img.to_rgb8()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn png_input(name: &str, width: u32, height: u32) -> ImageInput {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        ImageInput::new(name, buf)
    }

    fn jpeg_input(name: &str, width: u32, height: u32) -> ImageInput {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 40]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
            .unwrap();
        ImageInput::new(name, buf)
    }

    fn config(format: OutputFormat, max_length: Option<u32>) -> TransformConfig {
        TransformConfig::new(format, None, max_length).unwrap()
    }

    #[test]
    fn test_transform_config_defaults_quality_by_format() {
        assert_eq!(config(OutputFormat::Png, None).quality, 90);
        assert_eq!(config(OutputFormat::Jpeg, None).quality, 85);
        assert_eq!(config(OutputFormat::WebP, None).quality, 75);
        assert_eq!(config(OutputFormat::Original, None).quality, 75);
    }

    #[test]
    fn test_transform_config_invalid_quality() {
        let result = TransformConfig::new(OutputFormat::Jpeg, Some(0), None);
        assert!(matches!(result, Err(ZipperError::InvalidQuality(0))));

        let result = TransformConfig::new(OutputFormat::Jpeg, Some(101), None);
        assert!(matches!(result, Err(ZipperError::InvalidQuality(101))));
    }

    #[test]
    fn test_transform_config_rejects_zero_bounds() {
        let result = TransformConfig::new(OutputFormat::Png, None, Some(0));
        assert!(matches!(result, Err(ZipperError::InvalidMaxLength(0))));

        let result = config(OutputFormat::Png, None).with_bounds(Some(100), Some(0));
        assert!(matches!(result, Err(ZipperError::InvalidMaxLength(0))));
    }

    #[test]
    fn test_quality_fraction() {
        let config = TransformConfig::new(OutputFormat::Jpeg, Some(85), None).unwrap();
        assert!((config.quality_fraction() - 0.85).abs() < f32::EPSILON);
    }

    #[test]
    fn test_compute_target_dimensions_landscape() {
        let config = config(OutputFormat::Jpeg, Some(2000));
        assert_eq!(compute_target_dimensions(4000, 2000, &config), (2000, 1000));
    }

    #[test]
    fn test_compute_target_dimensions_portrait() {
        let config = config(OutputFormat::Jpeg, Some(1000));
        assert_eq!(compute_target_dimensions(1500, 3000, &config), (500, 1000));
    }

    #[test]
    fn test_compute_target_dimensions_square() {
        let config = config(OutputFormat::Jpeg, Some(2000));
        assert_eq!(compute_target_dimensions(3000, 3000, &config), (2000, 2000));
    }

    #[test]
    fn test_compute_target_dimensions_rounds_to_nearest() {
        let config = config(OutputFormat::Jpeg, Some(100));
        // 333 * (100 / 1000) = 33.3
        assert_eq!(compute_target_dimensions(1000, 333, &config), (100, 33));
        // 335 * 0.1 = 33.5 rounds up
        assert_eq!(compute_target_dimensions(1000, 335, &config), (100, 34));
    }

    #[test]
    fn test_compute_target_dimensions_never_enlarges() {
        let config = config(OutputFormat::Jpeg, Some(2000));
        assert_eq!(compute_target_dimensions(800, 600, &config), (800, 600));
        assert_eq!(compute_target_dimensions(2000, 1000, &config), (2000, 1000));
    }

    #[test]
    fn test_compute_target_dimensions_unbounded() {
        let config = config(OutputFormat::Jpeg, None);
        assert_eq!(compute_target_dimensions(12000, 9000, &config), (12000, 9000));
    }

    #[test]
    fn test_compute_target_dimensions_thin_image_keeps_one_pixel() {
        let config = config(OutputFormat::Png, Some(10));
        assert_eq!(compute_target_dimensions(10_000, 1, &config), (10, 1));
    }

    #[test]
    fn test_compute_target_dimensions_width_and_height_bounds() {
        let bounded = config(OutputFormat::Png, None)
            .with_bounds(Some(800), Some(800))
            .unwrap();
        assert_eq!(compute_target_dimensions(1600, 1200, &bounded), (800, 600));

        let height_only = config(OutputFormat::Png, None)
            .with_bounds(None, Some(300))
            .unwrap();
        assert_eq!(compute_target_dimensions(1600, 1200, &height_only), (400, 300));
    }

    #[test]
    fn test_compute_target_dimensions_tightest_bound_wins() {
        let config = config(OutputFormat::Png, Some(1000))
            .with_bounds(Some(500), None)
            .unwrap();
        assert_eq!(compute_target_dimensions(2000, 1000, &config), (500, 250));
    }

    #[test]
    fn test_resize_image_dimensions() {
        let mut img = DynamicImage::new_rgb8(400, 200);
        resize_image(&mut img, &config(OutputFormat::Png, Some(100)));
        assert_eq!(img.dimensions(), (100, 50));
    }

    #[test]
    fn test_resize_image_no_constraint() {
        let mut img = DynamicImage::new_rgb8(400, 200);
        resize_image(&mut img, &config(OutputFormat::Png, None));
        assert_eq!(img.dimensions(), (400, 200));
    }

    #[test]
    fn test_output_file_name_replaces_extension() {
        assert_eq!(output_file_name("photo.HEIC", OutputFormat::Jpeg), "photo.jpeg");
        assert_eq!(output_file_name("photo.png", OutputFormat::WebP), "photo.webp");
        assert_eq!(output_file_name("photo.jpg", OutputFormat::Png), "photo.png");
    }

    #[test]
    fn test_output_file_name_original_keeps_extension() {
        assert_eq!(output_file_name("photo.JPG", OutputFormat::Original), "photo.JPG");
        assert_eq!(output_file_name("scan.tiff", OutputFormat::Original), "scan.tiff");
    }

    #[test]
    fn test_output_file_name_only_last_extension_replaced() {
        assert_eq!(output_file_name("holiday.2024.png", OutputFormat::Jpeg), "holiday.2024.jpeg");
    }

    #[test]
    fn test_output_file_name_without_extension() {
        assert_eq!(output_file_name("README", OutputFormat::Original), "README");
        assert_eq!(output_file_name("README", OutputFormat::Png), "README.png");
    }

    #[test]
    fn test_transform_png_to_jpeg_resizes() {
        let input = png_input("wide.png", 400, 200);
        let processed = transform_image(&input, &config(OutputFormat::Jpeg, Some(100))).unwrap();

        assert_eq!(processed.name, "wide.jpeg");
        assert_eq!((processed.width, processed.height), (100, 50));
        assert_eq!(processed.original_size, input.size());
        assert_eq!(processed.size(), processed.data.len() as u64);
        assert_eq!(image::guess_format(&processed.data).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_transform_to_webp() {
        let input = jpeg_input("shot.jpg", 64, 48);
        let processed = transform_image(&input, &config(OutputFormat::WebP, None)).unwrap();

        assert_eq!(processed.name, "shot.webp");
        assert_eq!(image::guess_format(&processed.data).unwrap(), ImageFormat::WebP);
        let decoded = image::load_from_memory(&processed.data).unwrap();
        assert_eq!(decoded.dimensions(), (64, 48));
    }

    #[test]
    fn test_transform_original_keeps_format() {
        let input = png_input("icon.PNG", 32, 32);
        let processed = transform_image(&input, &config(OutputFormat::Original, None)).unwrap();

        assert_eq!(processed.name, "icon.PNG");
        assert_eq!(image::guess_format(&processed.data).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_transform_alpha_to_jpeg() {
        let img = RgbaImage::from_pixel(16, 16, Rgba([10, 20, 30, 128]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        let input = ImageInput::new("alpha.png", buf);

        let processed = transform_image(&input, &config(OutputFormat::Jpeg, None)).unwrap();
        assert_eq!(image::guess_format(&processed.data).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_lower_jpeg_quality_is_smaller() {
        let input = png_input("gradient.png", 256, 256);
        let high = TransformConfig::new(OutputFormat::Jpeg, Some(95), None).unwrap();
        let low = TransformConfig::new(OutputFormat::Jpeg, Some(10), None).unwrap();

        let high = transform_image(&input, &high).unwrap();
        let low = transform_image(&input, &low).unwrap();
        assert!(low.size() < high.size());
    }

    #[test]
    fn test_transform_rejects_non_image() {
        let input = ImageInput::new("notes.jpg", b"definitely not an image".to_vec());
        let result = transform_image(&input, &config(OutputFormat::Jpeg, None));
        assert!(matches!(result, Err(ZipperError::Decode { ref name, .. }) if name == "notes.jpg"));
    }

    #[test]
    fn test_transform_rejects_decodable_but_unsupported_input() {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(4, 4))
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Pnm)
            .unwrap();
        let input = ImageInput::new("disguised.png", buf);

        let result = transform_image(&input, &config(OutputFormat::Original, None));
        assert!(matches!(result, Err(ZipperError::Decode { ref name, .. }) if name == "disguised.png"));
    }

    #[test]
    fn test_image_input_from_path_not_found() {
        let result = ImageInput::from_path(Path::new("nonexistent.jpg"));
        assert!(matches!(result, Err(ZipperError::FileNotFound(_))));
    }

    #[test]
    fn test_image_input_from_path_reads_bytes() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("raw.png");
        fs::write(&path, b"12345").unwrap();

        let input = ImageInput::from_path(&path).unwrap();
        assert_eq!(input.name(), "raw.png");
        assert_eq!(input.size(), 5);
        assert_eq!(input.source(), Some(path.as_path()));
    }
}
