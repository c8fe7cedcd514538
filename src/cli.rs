use crate::constants::{DEFAULT_ARCHIVE_NAME, DEFAULT_MAX_LENGTH};
use crate::formats::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "img-zipper",
    about = "Convert, resize and zip batches of images",
    long_about = "img-zipper converts a batch of images to a common format, shrinks them to fit \
                  a bounding box without upscaling, and packs the results into one ZIP archive. \
                  It runs as a one-shot command or as an HTTP service.",
    version,
    after_help = "EXAMPLES:\n  \
    img-zipper zip ./photos -f webp -m 2000\n  \
    img-zipper zip \"./shots/*.png\" cover.jpg -f jpeg -q 80 -o album.zip\n  \
    img-zipper zip ./raw -r --max-width 1280 --max-height 720\n  \
    img-zipper serve --port 8080"
)]
pub struct Args {
    #[arg(short = 'Q', long, global = true, help = "Only print errors")]
    pub quiet: bool,

    #[arg(short = 'v', long, global = true, help = "Print extra diagnostics")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(
        about = "Convert, resize and zip images into one archive",
        long_about = "Process every matched image in order and write a single ZIP archive. \
                      The first image that fails aborts the run and no archive is written."
    )]
    Zip {
        #[arg(
            required = true,
            help = "Input files, directories, or globs",
            long_help = "Each input can be a file path, a directory, or a glob expression. \
                         Examples: './images', '*.jpg', '/path/to/images/*.{jpg,png}'"
        )]
        inputs: Vec<String>,

        #[arg(
            short = 'o',
            long,
            default_value = DEFAULT_ARCHIVE_NAME,
            help = "Archive file to write"
        )]
        output: PathBuf,

        #[arg(
            short = 'f',
            long,
            default_value = "webp",
            help = "Output format (original, webp, png, jpeg)",
            long_help = "Target format for every image. 'original' keeps each image's own \
                         format. 'jpg' is accepted as an alias for 'jpeg'."
        )]
        format: OutputFormat,

        #[arg(
            short = 'q',
            long,
            help = "Quality (1-100)",
            long_help = "Encoder quality from 1 (lowest) to 100 (highest). \
                         Defaults to 75 for WebP, 85 for JPEG and 90 for PNG."
        )]
        quality: Option<u8>,

        #[arg(
            short = 'm',
            long,
            default_value_t = DEFAULT_MAX_LENGTH,
            conflicts_with = "no_resize",
            help = "Maximum length of the longer edge in pixels"
        )]
        max_length: u32,

        #[arg(long, help = "Maximum width in pixels")]
        max_width: Option<u32>,

        #[arg(long, help = "Maximum height in pixels")]
        max_height: Option<u32>,

        #[arg(long, help = "Do not limit the longer edge")]
        no_resize: bool,

        #[arg(
            short = 'r',
            long,
            help = "Process subdirectories recursively",
            long_help = "Recursively process all subdirectories when an input is a directory."
        )]
        recursive: bool,

        #[arg(
            short = 'j',
            long,
            help = "Number of worker threads (default: auto)",
            long_help = "Size of the thread pool used by the image codecs. \
                         If not specified, uses number of CPU cores."
        )]
        threads: Option<usize>,
    },

    #[command(
        about = "Run the HTTP service",
        long_about = "Serve POST /api/images. Each request is processed as one batch, written to \
                      the configured archive path and returned base64-encoded with statistics."
    )]
    Serve {
        #[arg(
            short = 'c',
            long,
            help = "Configuration file (default: ./img-zipper.toml when present)"
        )]
        config: Option<PathBuf>,

        #[arg(short = 'b', long, help = "Address to bind")]
        bind: Option<String>,

        #[arg(short = 'p', long, help = "Port to listen on")]
        port: Option<u16>,

        #[arg(short = 'o', long, help = "Archive file written by every request")]
        output: Option<PathBuf>,
    },
}

impl Commands {
    pub fn threads(&self) -> Option<usize> {
        match self {
            Commands::Zip { threads, .. } => *threads,
            Commands::Serve { .. } => None,
        }
    }
}
