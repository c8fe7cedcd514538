//! Output format selection
//!
//! The batch pipeline converts every input to one of a fixed set of targets,
//! or keeps each image in the format it was uploaded in.

use crate::constants::{
    DEFAULT_JPEG_QUALITY, DEFAULT_PNG_QUALITY, DEFAULT_WEBP_QUALITY, FALLBACK_QUALITY,
};
use crate::error::{Result, ZipperError};
use image::ImageFormat;
use std::fmt;
use std::str::FromStr;

/// Target format for a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Re-encode in whatever format the input was decoded from
    #[default]
    Original,
    /// WebP, lossy
    WebP,
    /// PNG, lossless
    Png,
    /// JPEG, lossy
    Jpeg,
}

impl OutputFormat {
    /// Canonical file extension, `None` for [`OutputFormat::Original`]
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            OutputFormat::Original => None,
            OutputFormat::WebP => Some("webp"),
            OutputFormat::Png => Some("png"),
            OutputFormat::Jpeg => Some("jpeg"),
        }
    }

    /// The image crate format to encode with, `None` when it depends on the input
    pub fn to_image_format(&self) -> Option<ImageFormat> {
        match self {
            OutputFormat::Original => None,
            OutputFormat::WebP => Some(ImageFormat::WebP),
            OutputFormat::Png => Some(ImageFormat::Png),
            OutputFormat::Jpeg => Some(ImageFormat::Jpeg),
        }
    }

    /// Quality preselected when this format is chosen
    pub fn default_quality(&self) -> u8 {
        match self {
            OutputFormat::WebP => DEFAULT_WEBP_QUALITY,
            OutputFormat::Jpeg => DEFAULT_JPEG_QUALITY,
            OutputFormat::Png => DEFAULT_PNG_QUALITY,
            OutputFormat::Original => FALLBACK_QUALITY,
        }
    }
}

/// Whether the encoder for `format` takes a quality setting
pub fn is_lossy(format: ImageFormat) -> bool {
    matches!(format, ImageFormat::Jpeg | ImageFormat::WebP)
}

/// Whether `format` is one of the accepted input formats.
///
/// The image crate can decode more (ICO, TGA, PNM, QOI, ...) but those are
/// rejected so every accepted input can also be re-encoded as itself.
pub fn is_supported_input(format: ImageFormat) -> bool {
    matches!(
        format,
        ImageFormat::Jpeg
            | ImageFormat::Png
            | ImageFormat::WebP
            | ImageFormat::Gif
            | ImageFormat::Bmp
            | ImageFormat::Tiff
    )
}

/// Map a file extension to the decoder format it names, if supported
pub fn format_from_extension(extension: &str) -> Option<ImageFormat> {
    match extension.to_lowercase().as_str() {
        "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
        "png" => Some(ImageFormat::Png),
        "webp" => Some(ImageFormat::WebP),
        "gif" => Some(ImageFormat::Gif),
        "bmp" => Some(ImageFormat::Bmp),
        "tif" | "tiff" => Some(ImageFormat::Tiff),
        _ => None,
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Original => "original",
            OutputFormat::WebP => "webp",
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for OutputFormat {
    type Err = ZipperError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "original" => Ok(OutputFormat::Original),
            "webp" => Ok(OutputFormat::WebP),
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            _ => Err(ZipperError::UnsupportedFormat(s.to_string())),
        }
    }
}
