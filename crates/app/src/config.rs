//! Configuration for the convert application.
//!
//! Handles parsing command-line arguments and resolving them into an
//! immutable [`Config`], including a seed for sample generation that is
//! reproducible when given explicitly.
//!
//! # Philosophy
//!
//! The tool should work with ZERO arguments, using sensible defaults.
//! All defaults are printed with `--print-config` so runs are reproducible.

use anyhow::{bail, Result};
use bitconvert_core::driver::DEFAULT_CHUNK_BYTES;
use bitconvert_core::Format;
use clap::Parser;
use std::path::PathBuf;
use tracing::Level;

/// Command-line arguments for the convert tool.
#[derive(Parser, Debug)]
#[command(name = "convert")]
#[command(version)]
#[command(about = "Streaming transcoder between raw, RLE and Huffman encodings")]
#[command(long_about = "Converts a file from one encoding to another by pushing \
    fixed-size chunks through a chain of filter stages.\n\n\
    FORMATS: raw, rle, huffman, rle+huffman\n\n\
    EXAMPLES:\n    \
    convert -i image.raw -O rle -o image.rle\n    \
    convert -i image.rle -I rle -O rle+huffman -o image.rlh --verify\n    \
    convert --seed 42 -O huffman --dot tree.dot")]
pub struct Args {
    /// Input file path (default: generate a sample)
    #[arg(short = 'i', long)]
    pub input_file: Option<PathBuf>,

    /// Input format
    #[arg(short = 'I', long, default_value = "raw")]
    pub input_format: Format,

    /// Output file path
    #[arg(short = 'o', long, default_value = "./out.bin")]
    pub output_file: PathBuf,

    /// Output format
    #[arg(short = 'O', long, default_value = "raw")]
    pub output_format: Format,

    /// Bytes read per chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_BYTES)]
    pub chunk_bytes: usize,

    /// Write the Huffman tree as Graphviz dot to this path
    #[arg(long)]
    pub dot: Option<PathBuf>,

    /// Random seed for sample generation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Size of the generated byte sample
    #[arg(long, default_value_t = 65536)]
    pub sample_bytes: usize,

    /// Width of the generated sample image
    #[arg(long, default_value_t = 64)]
    pub sample_width: u16,

    /// Height of the generated sample image
    #[arg(long, default_value_t = 48)]
    pub sample_height: u16,

    /// Decode the output again and compare it with the input
    #[arg(long)]
    pub verify: bool,

    /// Print resolved configuration
    #[arg(long)]
    pub print_config: bool,

    /// Don't print metrics summary
    #[arg(long)]
    pub no_metrics: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// No logging
    #[arg(short, long)]
    pub quiet: bool,
}

/// Where the input bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Read an existing file
    File(PathBuf),
    /// Generate mixed-compressibility bytes
    SampleBytes { size: usize },
    /// Generate a raw RGB image with a width/height header
    SampleImage { width: u16, height: u16 },
}

/// Complete configuration for a conversion run.
#[derive(Debug, Clone)]
pub struct Config {
    // === Files ===
    /// Input file or generated sample
    pub input: InputSource,

    /// Output file path
    pub output_file: PathBuf,

    // === Formats ===
    /// Encoding of the input
    pub input_format: Format,

    /// Encoding of the output
    pub output_format: Format,

    // === Chunking ===
    /// Chunk size in bytes
    pub chunk_bytes: usize,

    // === Diagnostics ===
    /// Huffman tree export path
    pub dot_path: Option<PathBuf>,

    /// Seed for sample generation
    pub seed: u64,

    /// Log level (None = no subscriber)
    pub log_level: Option<Level>,

    // === Behavior ===
    /// Whether to round-trip the output after writing it
    pub verify: bool,

    /// Whether to print detailed config
    pub print_config: bool,

    /// Whether to print detailed metrics summary
    pub print_metrics: bool,
}

impl Config {
    /// Resolve parsed arguments into a configuration.
    ///
    /// If `--seed` is absent, a time-based seed is used and reported by
    /// `--print-config`.
    pub fn from_args(args: Args) -> Result<Self> {
        if args.chunk_bytes == 0 {
            bail!("--chunk-bytes must be at least 1");
        }

        for format in [args.input_format, args.output_format] {
            if format == Format::Ppm {
                bail!("format '{}' is not supported by this tool", format);
            }
        }

        let input = match args.input_file {
            Some(path) => InputSource::File(path),
            None if args.input_format != Format::Raw => {
                bail!(
                    "a generated sample is raw; pass --input-file to read '{}' input",
                    args.input_format
                );
            }
            None if args.output_format.is_image() => InputSource::SampleImage {
                width: args.sample_width,
                height: args.sample_height,
            },
            None => InputSource::SampleBytes {
                size: args.sample_bytes,
            },
        };

        let seed = args.seed.unwrap_or_else(|| {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|t| t.as_millis() as u64)
                .unwrap_or_default()
        });

        let log_level = if args.quiet {
            None
        } else {
            Some(match args.verbose {
                0 => Level::INFO,
                1 => Level::DEBUG,
                _ => Level::TRACE,
            })
        };

        Ok(Config {
            input,
            output_file: args.output_file,
            input_format: args.input_format,
            output_format: args.output_format,
            chunk_bytes: args.chunk_bytes,
            dot_path: args.dot,
            seed,
            log_level,
            verify: args.verify,
            print_config: args.print_config,
            print_metrics: !args.no_metrics,
        })
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        println!("=== Configuration ===");
        match &self.input {
            InputSource::File(path) => println!("Input file:  {}", path.display()),
            InputSource::SampleBytes { size } => {
                println!("Input file:  (generated sample, {} bytes)", size)
            }
            InputSource::SampleImage { width, height } => {
                println!("Input file:  (generated image, {}x{})", width, height)
            }
        }
        println!("Output file: {}", self.output_file.display());
        println!();
        println!("Conversion: {} -> {}", self.input_format, self.output_format);
        println!("Chunk size: {} bytes", self.chunk_bytes);
        println!("Seed: {}", self.seed);
        if let Some(path) = &self.dot_path {
            println!("Tree export: {}", path.display());
        }
        println!("Verify: {}", if self.verify { "yes" } else { "no" });
        println!();
    }
}
