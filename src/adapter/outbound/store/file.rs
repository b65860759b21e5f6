//! JSON-file record store.
//!
//! One pretty-printed JSON document per key in a flat directory. Keys are
//! escaped into file names reversibly, so listing never has to open files.
//! Saves go through a temporary file and a rename, so a record on disk is
//! always either the old one or the new one.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::application::cache::CacheRecord;
use crate::error::Result;
use crate::port::RecordStore;

const EXTENSION: &str = "json";

/// Distinguishes temporary files of concurrent saves.
static SAVE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Record store writing one file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    dir: PathBuf,
}

impl FileRecordStore {
    /// Use `dir`, creating it on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{EXTENSION}", encode_key(key)))
    }
}

/// Escape every byte outside `[A-Za-z0-9_-]` as `%XX`.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

fn decode_key(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn load(&self, key: &str) -> Result<Option<CacheRecord>> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let record: CacheRecord = serde_json::from_slice(&bytes)?;
        Ok(Some(record))
    }

    async fn save(&self, record: &CacheRecord) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(&record.key);
        let seq = SAVE_SEQ.fetch_add(1, Ordering::Relaxed);
        let temp_path = path.with_extension(format!("{}.{seq}.tmp", std::process::id()));
        let json = serde_json::to_vec_pretty(record)?;

        let written = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&json).await?;
            file.sync_all().await?;
            fs::rename(&temp_path, &path).await
        }
        .await;

        if let Err(err) = written {
            let _ = fs::remove_file(&temp_path).await;
            return Err(err.into());
        }

        debug!(key = %record.key, path = %path.display(), "Saved cache record");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(key) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(decode_key)
            {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_encoding_round_trips_and_is_filename_safe() {
        for key in ["alliance_nations:9445", "resolved:the bloc", "a/b\\c", "ünï"] {
            let encoded = encode_key(key);
            assert!(encoded
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'%'));
            assert_eq!(decode_key(&encoded).as_deref(), Some(key));
        }
    }

    #[test]
    fn colon_is_escaped() {
        assert_eq!(encode_key("alliance_wars:1"), "alliance_wars%3A1");
    }

    #[test]
    fn truncated_escape_is_rejected() {
        assert_eq!(decode_key("abc%4"), None);
    }
}
