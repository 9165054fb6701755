//! Change detection between successive snapshots.
//!
//! Content is compared by SHA-256 fingerprint over the raw bytes. Two
//! snapshots that are semantically equal but serialized differently count
//! as changed.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::error::Result;

const READ_CHUNK: usize = 64 * 1024;

/// Hex SHA-256 digest of `bytes`.
pub fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Hex SHA-256 digest of a file, read in chunks.
pub async fn fingerprint_file(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Whether two buffers differ.
pub fn content_changed(previous: &[u8], current: &[u8]) -> bool {
    fingerprint(previous) != fingerprint(current)
}

/// Whether `current` differs from the `previous` snapshot.
///
/// A missing previous snapshot (never recorded or deleted since) counts
/// as changed.
pub async fn file_changed(previous: Option<&Path>, current: &Path) -> Result<bool> {
    let Some(previous) = previous else {
        return Ok(true);
    };
    if !tokio::fs::try_exists(previous).await.unwrap_or(false) {
        return Ok(true);
    }

    let (before, after) = tokio::try_join!(fingerprint_file(previous), fingerprint_file(current))?;
    Ok(before != after)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fingerprint_known_value() {
        assert_eq!(
            fingerprint(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_content_changed() {
        assert!(!content_changed(b"same", b"same"));
        assert!(content_changed(b"same", b"samf"));
        assert!(content_changed(br#"{"a":1}"#, b"{\n  \"a\": 1\n}"));
    }

    #[tokio::test]
    async fn test_fingerprint_file_matches_buffer() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("big.bin");
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        assert_eq!(fingerprint_file(&path).await.unwrap(), fingerprint(&data));
    }

    #[tokio::test]
    async fn test_file_changed() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.json");
        let b = tmp.path().join("b.json");
        let c = tmp.path().join("c.json");
        std::fs::write(&a, b"[1,2,3]").unwrap();
        std::fs::write(&b, b"[1,2,3]").unwrap();
        std::fs::write(&c, b"[1,2,4]").unwrap();

        assert!(!file_changed(Some(a.as_path()), &b).await.unwrap());
        assert!(file_changed(Some(a.as_path()), &c).await.unwrap());
        assert!(file_changed(None, &b).await.unwrap());
        assert!(
            file_changed(Some(tmp.path().join("gone.json").as_path()), &b)
                .await
                .unwrap()
        );
    }
}
