//! Content hashing.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use blake3::Hasher;
use lookalike_core::{ContentHash, HashError};

/// Read buffer used when streaming a file through the digest.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Digest of one file, with the number of bytes that went into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    pub hash: ContentHash,
    /// Bytes actually read, which may differ from the size seen by the walk.
    pub bytes_read: u64,
}

/// Computes a collision-resistant digest of a file's full contents.
///
/// Implementations are shared by every worker of the hashing pool.
pub trait ContentHasher: Send + Sync {
    fn hash_file(&self, path: &Path) -> Result<FileDigest, HashError>;
}

/// BLAKE3 over the whole file, streamed through a fixed buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

impl Blake3Hasher {
    pub fn new() -> Self {
        Self
    }
}

impl ContentHasher for Blake3Hasher {
    fn hash_file(&self, path: &Path) -> Result<FileDigest, HashError> {
        let mut file = File::open(path).map_err(|e| HashError::io(path, e))?;
        let mut hasher = Hasher::new();
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];
        let mut total = 0u64;

        loop {
            let bytes_read = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::io(path, e)),
            };
            hasher.update(&buffer[..bytes_read]);
            total += bytes_read as u64;
        }

        Ok(FileDigest {
            hash: ContentHash::from_bytes(hasher.finalize().as_bytes()),
            bytes_read: total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_identical_content_same_hash() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a"), "duplicate content").unwrap();
        fs::write(temp.path().join("b"), "duplicate content").unwrap();
        fs::write(temp.path().join("c"), "different content").unwrap();

        let hasher = Blake3Hasher::new();
        let a = hasher.hash_file(&temp.path().join("a")).unwrap();
        let b = hasher.hash_file(&temp.path().join("b")).unwrap();
        let c = hasher.hash_file(&temp.path().join("c")).unwrap();

        assert_eq!(a, b);
        assert_ne!(a.hash, c.hash);
        assert_eq!(a.hash.as_str().len(), 64);
        assert_eq!(a.bytes_read, 17);
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("large.bin");
        let data: Vec<u8> = (0..READ_BUFFER_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &data).unwrap();

        let streamed = Blake3Hasher::new().hash_file(&path).unwrap();
        let expected = ContentHash::from_bytes(blake3::hash(&data).as_bytes());
        assert_eq!(streamed.hash, expected);
        assert_eq!(streamed.bytes_read, data.len() as u64);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp = TempDir::new().unwrap();
        let result = Blake3Hasher::new().hash_file(&temp.path().join("gone"));
        match result {
            Err(err @ HashError::Io { .. }) => assert!(!err.is_expected()),
            other => panic!("expected I/O error, got {other:?}"),
        }
    }
}
