//! Perceptual hashing of images.

use std::fmt;
use std::path::Path;

use image::{DynamicImage, ImageError, ImageReader};
use image_hasher::{HashAlg, Hasher, HasherConfig};
use lookalike_core::HashError;

/// Computes a fixed-width perceptual fingerprint of an image file.
///
/// Files that are not decodable images must fail with
/// [`HashError::Decode`]; the pool feeds arbitrary files speculatively and
/// drops that class silently.
pub trait PerceptualHasher: Send + Sync {
    fn hash_image(&self, path: &Path) -> Result<u64, HashError>;
}

/// Difference hash over a downscaled grayscale image, packed into a `u64`.
pub struct GradientHasher {
    hasher: Hasher,
    width: u32,
    height: u32,
}

impl GradientHasher {
    /// Build a hasher producing `width * height` bits (at most 64).
    pub fn new(width: u32, height: u32) -> Self {
        let hasher = HasherConfig::new()
            .hash_alg(HashAlg::Gradient)
            .hash_size(width, height)
            .to_hasher();
        Self {
            hasher,
            width,
            height,
        }
    }

    /// Fingerprint an already decoded image.
    pub fn hash_decoded(&self, image: &DynamicImage) -> u64 {
        pack_bits(self.hasher.hash_image(image).as_bytes())
    }
}

impl Default for GradientHasher {
    fn default() -> Self {
        Self::new(8, 8)
    }
}

impl fmt::Debug for GradientHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GradientHasher")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl PerceptualHasher for GradientHasher {
    fn hash_image(&self, path: &Path) -> Result<u64, HashError> {
        let image = ImageReader::open(path)
            .map_err(|e| HashError::io(path, e))?
            .with_guessed_format()
            .map_err(|e| HashError::io(path, e))?
            .decode()
            .map_err(|e| classify(path, e))?;
        Ok(self.hash_decoded(&image))
    }
}

fn classify(path: &Path, error: ImageError) -> HashError {
    match error {
        ImageError::Decoding(_) | ImageError::Unsupported(_) => HashError::Decode {
            path: path.to_path_buf(),
            message: error.to_string(),
        },
        ImageError::IoError(source) => HashError::io(path, source),
        other => HashError::Image {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    }
}

/// Big-endian fold of the hash bytes.
fn pack_bits(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .take(8)
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte))
}
