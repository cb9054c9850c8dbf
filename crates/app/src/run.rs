//! One conversion run: open the source, transcode into the output file,
//! optionally verify by decoding the output again.

use crate::config::{Config, InputSource};
use crate::input_gen::{generate_sample_data, generate_sample_image};
use anyhow::{Context, Result};
use bitconvert_core::driver::{digest_through, transcode, Digest};
use bitconvert_core::metrics::Metrics;
use bitconvert_core::FilterChain;
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read};
use tracing::{info, warn};

/// Open the configured input, generating a sample if no file was given.
fn open_input(config: &Config) -> Result<Box<dyn Read>> {
    let source: Box<dyn Read> = match &config.input {
        InputSource::File(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open input file {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        InputSource::SampleBytes { size } => {
            info!(seed = config.seed, bytes = size, "generating sample input");
            Box::new(Cursor::new(generate_sample_data(config.seed, *size)))
        }
        InputSource::SampleImage { width, height } => {
            info!(seed = config.seed, width, height, "generating sample image");
            Box::new(Cursor::new(generate_sample_image(config.seed, *width, *height)))
        }
    };
    Ok(source)
}

/// Run the conversion described by `config`.
///
/// The output file is truncated before the first chunk is read; if the
/// transcode fails it is left holding whatever was produced so far.
pub fn run(config: &Config) -> Result<Metrics> {
    let source = open_input(config)?;

    let mut chain = FilterChain::for_conversion(config.input_format, config.output_format)?;
    if let Some(path) = &config.dot_path {
        chain = chain.with_dot_path(path);
    }

    let output = File::create(&config.output_file).with_context(|| {
        format!("failed to create output file {}", config.output_file.display())
    })?;

    let mut metrics = Metrics::new();
    transcode(
        source,
        BufWriter::new(output),
        &mut chain,
        config.chunk_bytes,
        &mut metrics,
    )
    .with_context(|| format!("{} -> {} conversion failed", config.input_format, config.output_format))?;

    if config.verify {
        let verified = verify(config, &metrics)?;
        if !verified {
            warn!(path = %config.output_file.display(), "output does not decode back to the input");
        }
        metrics.verified = Some(verified);
    }

    Ok(metrics)
}

/// Decode the written output with the inverse chain and compare digests.
fn verify(config: &Config, metrics: &Metrics) -> Result<bool> {
    let written = File::open(&config.output_file).with_context(|| {
        format!("failed to reopen output file {}", config.output_file.display())
    })?;
    let mut inverse = FilterChain::for_conversion(config.output_format, config.input_format)?;
    let digest = digest_through(BufReader::new(written), &mut inverse, config.chunk_bytes)
        .context("verification decode failed")?;

    let expected = Digest {
        len: metrics.input_bytes,
        crc32: metrics.input_crc32,
    };
    info!(
        expected_len = expected.len,
        actual_len = digest.len,
        "verification digest computed"
    );
    Ok(digest == expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitconvert_core::{huffman, rle, Format};
    use std::path::Path;
    use tempfile::tempdir;

    fn config(input: InputSource, output: &Path, input_format: Format, output_format: Format) -> Config {
        Config {
            input,
            output_file: output.to_path_buf(),
            input_format,
            output_format,
            chunk_bytes: 100,
            dot_path: None,
            seed: 42,
            log_level: None,
            verify: true,
            print_config: false,
            print_metrics: false,
        }
    }

    #[test]
    fn test_sample_to_huffman_verified() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out.huf");
        let config = config(
            InputSource::SampleBytes { size: 5000 },
            &out,
            Format::Raw,
            Format::Huffman,
        );

        let metrics = run(&config).unwrap();

        assert_eq!(metrics.input_bytes, 5000);
        assert_eq!(metrics.verified, Some(true));
        let written = std::fs::read(&out).unwrap();
        assert_eq!(written.len() as u64, metrics.output_bytes);
        assert_eq!(huffman::decode(&written).unwrap(), generate_sample_data(42, 5000));
    }

    #[test]
    fn test_file_rle_to_rle_huffman() {
        let dir = tempdir().unwrap();
        let image = generate_sample_image(3, 120, 30);
        let input = dir.path().join("in.rle");
        std::fs::write(&input, rle::encode(&image).unwrap()).unwrap();
        let out = dir.path().join("out.bin");

        let config = config(InputSource::File(input), &out, Format::Rle, Format::RleHuffman);
        let metrics = run(&config).unwrap();

        assert_eq!(metrics.verified, Some(true));
        let written = std::fs::read(&out).unwrap();
        let decoded = rle::decode(&huffman::decode(&written).unwrap()).unwrap();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_dot_export() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out.huf");
        let dot = dir.path().join("tree.dot");
        let mut config = config(
            InputSource::SampleBytes { size: 300 },
            &out,
            Format::Raw,
            Format::Huffman,
        );
        config.dot_path = Some(dot.clone());

        run(&config).unwrap();

        let text = std::fs::read_to_string(&dot).unwrap();
        assert!(text.starts_with("digraph huffman {"));
    }

    #[test]
    fn test_missing_input_file() {
        let dir = tempdir().unwrap();
        let config = config(
            InputSource::File(dir.path().join("missing.bin")),
            &dir.path().join("out.bin"),
            Format::Raw,
            Format::Rle,
        );

        let err = run(&config).unwrap_err();
        assert!(err.to_string().contains("failed to open input file"));
    }

    #[test]
    fn test_corrupt_input_fails() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("bad.huf");
        std::fs::write(&input, [9u8, 0, 0, 0]).unwrap();

        let config = config(
            InputSource::File(input),
            &dir.path().join("out.bin"),
            Format::Huffman,
            Format::Raw,
        );
        assert!(run(&config).is_err());
    }
}
