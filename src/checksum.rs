//! # Artifact Checksums
//!
//! Streaming SHA-256 over backup artifacts. Files are read in fixed
//! 64 KiB chunks so memory stays flat regardless of artifact size.

use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Read chunk size for streaming hashes
const CHUNK_SIZE: usize = 64 * 1024;

/// Compute the lowercase hex SHA-256 digest of a file.
pub async fn file_sha256(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compute the digest and compare it against a recorded value.
///
/// Returns `Ok(true)` only on an exact match. The comparison is
/// case-insensitive so digests recorded by other tooling still verify.
pub async fn verify_file(path: &Path, expected: &str) -> std::io::Result<bool> {
    let actual = file_sha256(path).await?;
    Ok(actual.eq_ignore_ascii_case(expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_known_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hello.dump");
        tokio::fs::write(&path, b"hello world").await.unwrap();

        let digest = file_sha256(&path).await.unwrap();
        assert_eq!(
            digest,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[tokio::test]
    async fn test_empty_file_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.dump");
        tokio::fs::write(&path, b"").await.unwrap();

        let digest = file_sha256(&path).await.unwrap();
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn test_large_file_spans_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.dump");
        // Three chunks plus a tail, all the same byte.
        let data = vec![0xabu8; CHUNK_SIZE * 3 + 17];
        tokio::fs::write(&path, &data).await.unwrap();

        let streamed = file_sha256(&path).await.unwrap();
        let whole = hex::encode(Sha256::digest(&data));
        assert_eq!(streamed, whole);
    }

    #[tokio::test]
    async fn test_verify_match_and_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.dump");
        tokio::fs::write(&path, b"payload").await.unwrap();

        let digest = file_sha256(&path).await.unwrap();
        assert!(verify_file(&path, &digest).await.unwrap());
        assert!(verify_file(&path, &digest.to_uppercase()).await.unwrap());
        assert!(!verify_file(&path, "deadbeef").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.dump");
        assert!(file_sha256(&path).await.is_err());
    }
}
