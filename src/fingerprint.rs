//! Content fingerprinting: exact + perceptual identity for raw image bytes.
//!
//! The exact hash is SHA-256 over the bytes exactly as received, no
//! re-encoding. The perceptual hash is a 64-bit DCT mean hash (classic
//! pHash) over the decoded image, hex-encoded so it can live in a text
//! column next to the content hash. A decode failure costs the candidate its
//! perceptual hash, nothing more.

use image::ImageReader;
use image_hasher::{HashAlg, Hasher, HasherConfig};
use sha2::{Digest, Sha256};
use std::io::Cursor;

const PHASH_SIZE: u32 = 8;

pub struct Fingerprinter {
    hasher: Hasher,
}

impl Fingerprinter {
    pub fn new() -> Self {
        let hasher = HasherConfig::new()
            .hash_alg(HashAlg::Mean)
            .hash_size(PHASH_SIZE, PHASH_SIZE)
            .preproc_dct()
            .to_hasher();
        Self { hasher }
    }

    /// SHA-256 over the raw byte sequence, lowercase hex.
    pub fn content_hash(&self, data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        format!("{:x}", hasher.finalize())
    }

    /// Perceptual hash of the decoded image, or None if decoding fails.
    pub fn perceptual_hash(&self, data: &[u8]) -> Option<String> {
        let img = match ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(image::ImageError::IoError)
            .and_then(|r| r.decode())
        {
            Ok(img) => img,
            Err(e) => {
                tracing::warn!(error = %e, "failed to decode image for perceptual hash");
                return None;
            }
        };
        Some(hex::encode(self.hasher.hash_image(&img).as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};

    fn png_bytes(img: &RgbImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_content_hash_deterministic() {
        let fp = Fingerprinter::new();
        let hash1 = fp.content_hash(b"same bytes");
        let hash2 = fp.content_hash(b"same bytes");
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
        assert!(hash1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_content_hash_differs_on_different_bytes() {
        let fp = Fingerprinter::new();
        assert_ne!(fp.content_hash(b"bytes a"), fp.content_hash(b"bytes b"));
    }

    #[test]
    fn test_perceptual_hash_of_valid_image() {
        let fp = Fingerprinter::new();
        let img = RgbImage::from_fn(32, 32, |x, _| image::Rgb([(x * 8) as u8, 0, 0]));
        let phash = fp.perceptual_hash(&png_bytes(&img)).unwrap();
        // 64-bit hash => 8 bytes => 16 hex chars
        assert_eq!(phash.len(), 16);
        assert!(phash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_perceptual_hash_stable_for_identical_images() {
        let fp = Fingerprinter::new();
        let img = RgbImage::from_fn(32, 32, |x, y| image::Rgb([x as u8, y as u8, 0]));
        let bytes = png_bytes(&img);
        assert_eq!(fp.perceptual_hash(&bytes), fp.perceptual_hash(&bytes));
    }

    #[test]
    fn test_undecodable_bytes_yield_no_phash() {
        let fp = Fingerprinter::new();
        assert_eq!(fp.perceptual_hash(b"definitely not an image"), None);
        assert_eq!(fp.perceptual_hash(&[]), None);
        // Truncated PNG magic with garbage body
        assert_eq!(fp.perceptual_hash(&[0x89, 0x50, 0x4e, 0x47, 0x00]), None);
    }
}
