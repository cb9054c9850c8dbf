//! Integration tests for the full bitconvert pipeline.
//!
//! These tests verify end-to-end behavior: raw input -> encode chain ->
//! decode chain -> output, with verification that output matches input
//! regardless of how the stream was split into chunks.

use bitconvert_core::{
    driver::{digest_through, transcode, Digest},
    huffman,
    metrics::Metrics,
    rle::{self, raw_image},
    ErrorKind, FilterChain, Format,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::io::Cursor;

/// Push `data` through `chain` split at random points.
fn apply_random_splits(chain: &mut FilterChain, data: &[u8], rng: &mut ChaCha8Rng) -> Vec<u8> {
    let mut output = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        let take = rng.gen_range(1..=rest.len().min(97));
        let (chunk, tail) = rest.split_at(take);
        chain.apply(chunk, &mut output, false).expect("chunk failed");
        rest = tail;
    }
    chain.apply(&[], &mut output, true).expect("flush failed");
    output
}

/// Push `data` as one non-final chunk plus the empty final chunk.
fn apply_whole(chain: &mut FilterChain, data: &[u8]) -> Vec<u8> {
    let mut output = Vec::new();
    chain.apply(data, &mut output, false).expect("chunk failed");
    chain.apply(&[], &mut output, true).expect("flush failed");
    output
}

/// Synthetic image with horizontal bands and a few speckles.
fn banded_image(width: u16, height: u16, seed: u64) -> Vec<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height {
        let band = [(y / 4) as u8 * 20, 90, 255 - (y / 4) as u8 * 20];
        for _ in 0..width {
            if rng.gen_ratio(1, 20) {
                pixels.extend_from_slice(&[rng.gen(), rng.gen(), rng.gen()]);
            } else {
                pixels.extend_from_slice(&band);
            }
        }
    }
    raw_image(width, height, &pixels)
}

fn chain(input: Format, output: Format) -> FilterChain {
    FilterChain::for_conversion(input, output).expect("chain build failed")
}

/// Round-trip every format through encode and decode chains.
#[test]
fn test_round_trip_all_formats() {
    let image = banded_image(300, 20, 7);

    for format in [Format::Raw, Format::Rle, Format::Huffman, Format::RleHuffman] {
        let encoded = apply_whole(&mut chain(Format::Raw, format), &image);
        let decoded = apply_whole(&mut chain(format, Format::Raw), &encoded);
        assert_eq!(decoded, image, "round trip failed for {}", format);
    }
}

/// Random chunk boundaries never change the output.
#[test]
fn test_chunk_invariance_random_splits() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let image = banded_image(64, 40, 3);

    for format in [Format::Rle, Format::Huffman, Format::RleHuffman] {
        let expected = apply_whole(&mut chain(Format::Raw, format), &image);
        for _ in 0..5 {
            let split = apply_random_splits(&mut chain(Format::Raw, format), &image, &mut rng);
            assert_eq!(split, expected, "encode output depends on chunking for {}", format);
        }

        for _ in 0..5 {
            let decoded = apply_random_splits(&mut chain(format, Format::Raw), &expected, &mut rng);
            assert_eq!(decoded, image, "decode output depends on chunking for {}", format);
        }
    }
}

/// Both RLE formats shrink banded images.
#[test]
fn test_compression_is_effective() {
    let image = banded_image(200, 32, 11);
    let rle = apply_whole(&mut chain(Format::Raw, Format::Rle), &image);
    let both = apply_whole(&mut chain(Format::Raw, Format::RleHuffman), &image);

    assert!(rle.len() < image.len() / 2);
    assert!(both.len() < image.len() / 4);
}

/// Test with all symbols present (full 256-byte alphabet).
#[test]
fn test_all_symbols() {
    let input_data: Vec<u8> = (0..=255).cycle().take(256 * 9).collect();

    let encoded = apply_whole(&mut chain(Format::Raw, Format::Huffman), &input_data);
    let table = huffman::HuffmanTree::from_data(&input_data).code_table();
    assert_eq!(table.symbols().count(), 256);
    assert!(table.is_prefix_free());

    let decoded = apply_whole(&mut chain(Format::Huffman, Format::Raw), &encoded);
    assert_eq!(decoded, input_data);
}

/// Test with large data through the chunked driver.
#[test]
fn test_large_data_through_driver() {
    let mut rng = ChaCha8Rng::seed_from_u64(999);
    let alphabet = b"etaoin shrdlu";
    let input_data: Vec<u8> = (0..256 * 1024)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
        .collect();

    let mut encoded: Vec<u8> = Vec::new();
    let mut metrics = Metrics::new();
    transcode(
        Cursor::new(&input_data),
        &mut encoded,
        &mut chain(Format::Raw, Format::Huffman),
        4096,
        &mut metrics,
    )
    .expect("transcode failed");

    assert_eq!(metrics.input_bytes, input_data.len() as u64);
    assert_eq!(metrics.chunks_read, 64);
    assert!(metrics.compression_ratio() < 0.5);

    let digest = digest_through(
        Cursor::new(encoded),
        &mut chain(Format::Huffman, Format::Raw),
        1000,
    )
    .expect("decode failed");
    assert_eq!(digest, Digest::of(&input_data));
}

/// Truncated encodings are format errors, not panics or short output.
#[test]
fn test_truncation_detection() {
    let image = banded_image(50, 10, 5);

    for format in [Format::Rle, Format::Huffman, Format::RleHuffman] {
        let encoded = apply_whole(&mut chain(Format::Raw, format), &image);
        let truncated = &encoded[..encoded.len() - 2];

        let mut decode = chain(format, Format::Raw);
        let mut output = Vec::new();
        let result = decode
            .apply(truncated, &mut output, false)
            .and_then(|()| decode.apply(&[], &mut output, true));
        let err = result.expect_err("truncated input decoded");
        assert_eq!(err.kind(), ErrorKind::Format, "{}: {}", format, err);
    }
}

/// Converting directly between two encodings matches going through raw.
#[test]
fn test_direct_conversion() {
    let image = banded_image(40, 12, 8);
    let rle = rle::encode(&image).expect("rle encode failed");

    let via_chain = apply_whole(&mut chain(Format::Rle, Format::Huffman), &rle);
    assert_eq!(via_chain, huffman::encode(&image).expect("huffman encode failed"));
}

/// Sample string from the reference scenario.
#[test]
fn test_reference_scenario() {
    let input = b"aaaabcadaaabbaaaacaabaadc";
    assert_eq!(input.len(), 25);

    let encoded = huffman::encode(input).expect("encode failed");
    assert_eq!(huffman::decode(&encoded).expect("decode failed"), input);

    let freqs = huffman::frequencies(input);
    let table = huffman::HuffmanTree::from_frequencies(&freqs).code_table();
    assert!(freqs[b'a' as usize] > freqs[b'c' as usize]);
    assert!(table.code(b'a').len() <= table.code(b'c').len());
}
