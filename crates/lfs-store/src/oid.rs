// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 MediaGit Contributors

//! Content OID for the large-file object store
//!
//! A content OID is the SHA-256 of an object's bytes. It names the object
//! both in pointer records (`oid sha256:<hex>`) and on disk, where the first
//! two byte pairs of its hex form pick the bucket directories.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Read buffer for streaming hashes
const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// SHA-256 content OID
///
/// # Examples
///
/// ```
/// use lfs_store::ContentOid;
///
/// let oid = ContentOid::hash(b"hello\n");
/// assert_eq!(
///     oid.to_string(),
///     "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
/// );
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentOid([u8; 32]);

impl ContentOid {
    /// Hash an in-memory buffer
    pub fn hash(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Hash everything `reader` yields, 64KB at a time
    ///
    /// Returns the OID and the number of bytes read.
    pub async fn from_reader<R>(reader: &mut R) -> std::io::Result<(Self, u64)>
    where
        R: AsyncRead + Unpin,
    {
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; HASH_BUFFER_SIZE];
        let mut total = 0u64;

        loop {
            let read = reader.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
            total += read as u64;
        }

        Ok((Self(hasher.finalize().into()), total))
    }

    /// Hash a file on disk without loading it into memory
    pub async fn from_file(path: &Path) -> StoreResult<(Self, u64)> {
        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|e| StoreError::io("open", path, e))?;
        Self::from_reader(&mut file)
            .await
            .map_err(|e| StoreError::io("read", path, e))
    }

    /// Parse 64 lowercase hex characters
    pub fn from_hex(s: &str) -> StoreResult<Self> {
        if s.len() != 64 || !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(StoreError::InvalidOid(s.to_string()));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| StoreError::InvalidOid(s.to_string()))?;
        Ok(Self(bytes))
    }

    /// Lowercase hex form
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Relative store path: `ab/cd/abcd...`
    pub fn bucket_path(&self) -> PathBuf {
        let hex = self.to_hex();
        PathBuf::from(&hex[0..2]).join(&hex[2..4]).join(hex)
    }
}

impl fmt::Display for ContentOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentOid({})", self.to_hex())
    }
}

impl FromStr for ContentOid {
    type Err = StoreError;

    fn from_str(s: &str) -> StoreResult<Self> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for ContentOid {
    type Error = StoreError;

    fn try_from(s: String) -> StoreResult<Self> {
        Self::from_hex(&s)
    }
}

impl From<ContentOid> for String {
    fn from(oid: ContentOid) -> Self {
        oid.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_OID: &str = "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03";

    #[test]
    fn test_hash_known_value() {
        assert_eq!(ContentOid::hash(b"hello\n").to_hex(), HELLO_OID);
    }

    #[test]
    fn test_from_hex_rejects_bad_input() {
        assert!(ContentOid::from_hex("too_short").is_err());
        assert!(ContentOid::from_hex(&"z".repeat(64)).is_err());
        assert!(ContentOid::from_hex(&HELLO_OID.to_uppercase()).is_err());
        assert_eq!(ContentOid::from_hex(HELLO_OID).unwrap().to_hex(), HELLO_OID);
    }

    #[test]
    fn test_bucket_path() {
        let oid = ContentOid::from_hex(HELLO_OID).unwrap();
        assert_eq!(
            oid.bucket_path(),
            PathBuf::from("58").join("91").join(HELLO_OID)
        );
    }

    #[test]
    fn test_serde_as_hex_string() {
        let oid = ContentOid::from_hex(HELLO_OID).unwrap();
        let json = serde_json::to_string(&oid).unwrap();
        assert_eq!(json, format!("\"{}\"", HELLO_OID));
        let back: ContentOid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, oid);
        assert!(serde_json::from_str::<ContentOid>("\"abc\"").is_err());
    }

    #[tokio::test]
    async fn test_from_reader_spans_buffers() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let (oid, len) = ContentOid::from_reader(&mut data.as_slice()).await.unwrap();
        assert_eq!(oid, ContentOid::hash(&data));
        assert_eq!(len, data.len() as u64);
    }

    #[tokio::test]
    async fn test_from_file_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty");
        tokio::fs::write(&path, b"").await.unwrap();
        let (oid, len) = ContentOid::from_file(&path).await.unwrap();
        assert_eq!(oid, ContentOid::hash(b""));
        assert_eq!(len, 0);
    }

    #[tokio::test]
    async fn test_from_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = ContentOid::from_file(&dir.path().join("nope")).await.unwrap_err();
        assert!(matches!(err, StoreError::Io { action: "open", .. }));
    }
}
