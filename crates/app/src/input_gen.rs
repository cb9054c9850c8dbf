//! Sample input generation.
//!
//! When no input file is specified, we generate a sample with interesting
//! compression characteristics.
//!
//! # Design
//!
//! Generated byte samples have:
//! - Some highly compressible sections (runs of same byte)
//! - Some moderately compressible sections (text-like data)
//! - Some incompressible sections (random bytes)
//!
//! Generated images are raw RGB with a width/height header, made of
//! horizontal bands of varying length so that RLE has runs to find.
//! Both make the compression behavior visible in metrics.

use bitconvert_core::rle::raw_image;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Generate a sample input file with mixed compressibility.
///
/// # Arguments
/// - `seed`: random seed for determinism
/// - `size_bytes`: approximate size of generated data
///
/// # Returns
/// Vector of bytes ready to be written to file or processed.
pub fn generate_sample_data(seed: u64, size_bytes: usize) -> Vec<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(size_bytes);

    // Generate data in chunks with different compressibility
    let mut remaining = size_bytes;

    while remaining > 0 {
        let chunk_size = remaining.min(8192);

        // Choose chunk type randomly
        let chunk_type: u8 = rng.gen_range(0..10);

        match chunk_type {
            // 30% highly compressible (runs of same byte)
            0..=2 => {
                let byte_value: u8 = rng.gen();
                data.extend(std::iter::repeat(byte_value).take(chunk_size));
            }

            // 30% moderately compressible (limited alphabet, text-like)
            3..=5 => {
                let alphabet = b"abcdefghijklmnopqrstuvwxyz .!,\n";
                for _ in 0..chunk_size {
                    let idx = rng.gen_range(0..alphabet.len());
                    data.push(alphabet[idx]);
                }
            }

            // 20% structured (repeating patterns)
            6..=7 => {
                let pattern = generate_pattern(&mut rng);
                let mut pos = 0;
                for _ in 0..chunk_size {
                    data.push(pattern[pos % pattern.len()]);
                    pos += 1;
                }
            }

            // 20% incompressible (random bytes)
            _ => {
                for _ in 0..chunk_size {
                    data.push(rng.gen());
                }
            }
        }

        remaining = remaining.saturating_sub(chunk_size);
    }

    // Truncate to exact size
    data.truncate(size_bytes);
    data
}

/// Generate a small repeating pattern.
fn generate_pattern(rng: &mut ChaCha8Rng) -> Vec<u8> {
    let pattern_len = rng.gen_range(4..=32);
    (0..pattern_len).map(|_| rng.gen()).collect()
}

/// Generate a raw RGB image with a 4-byte little-endian header.
///
/// Each row is a sequence of colored segments; consecutive rows repeat the
/// previous row's segments most of the time, with occasional noise pixels.
pub fn generate_sample_image(seed: u64, width: u16, height: u16) -> Vec<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
    let mut row: Vec<[u8; 3]> = Vec::new();

    for _ in 0..height {
        if row.is_empty() || rng.gen_ratio(1, 6) {
            row = generate_row(&mut rng, width);
        }
        for &color in &row {
            if rng.gen_ratio(1, 50) {
                pixels.extend_from_slice(&[rng.gen(), rng.gen(), rng.gen()]);
            } else {
                pixels.extend_from_slice(&color);
            }
        }
    }

    raw_image(width, height, &pixels)
}

/// Generate one row of colored segments.
fn generate_row(rng: &mut ChaCha8Rng, width: u16) -> Vec<[u8; 3]> {
    let mut row = Vec::with_capacity(width as usize);
    while row.len() < width as usize {
        let color: [u8; 3] = [rng.gen(), rng.gen(), rng.gen()];
        let segment = rng.gen_range(1..=400).min(width as usize - row.len());
        row.extend(std::iter::repeat(color).take(segment));
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_sample_data() {
        let data = generate_sample_data(42, 1000);
        assert_eq!(data.len(), 1000);
    }

    #[test]
    fn test_determinism() {
        let data1 = generate_sample_data(12345, 5000);
        let data2 = generate_sample_data(12345, 5000);

        assert_eq!(data1, data2);
    }

    #[test]
    fn test_different_seeds() {
        let data1 = generate_sample_data(1, 1000);
        let data2 = generate_sample_data(2, 1000);

        assert_ne!(data1, data2);
    }

    #[test]
    fn test_various_sizes() {
        for size in [0, 1, 100, 1000, 10000, 100000] {
            let data = generate_sample_data(999, size);
            assert_eq!(data.len(), size);
        }
    }

    #[test]
    fn test_sample_image_layout() {
        let image = generate_sample_image(42, 70, 9);

        assert_eq!(&image[..4], &[70, 0, 9, 0]);
        assert_eq!(image.len(), 4 + 70 * 9 * 3);
        assert_eq!(image, generate_sample_image(42, 70, 9));
    }

    #[test]
    fn test_sample_image_compresses() {
        let image = generate_sample_image(5, 300, 40);
        let encoded = bitconvert_core::rle::encode(&image).unwrap();

        assert!(encoded.len() < image.len() / 2);
        assert_eq!(bitconvert_core::rle::decode(&encoded).unwrap(), image);
    }

    #[test]
    fn test_empty_image() {
        assert_eq!(generate_sample_image(1, 0, 5), vec![0, 0, 5, 0]);
        assert_eq!(generate_sample_image(1, 5, 0), vec![5, 0, 0, 0]);
    }
}
