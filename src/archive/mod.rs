//! Archive access: the [`Archive`] trait and the read-only [`ArchiveIndex`].
//!
//! The index is built once from the archive's entry list and is the only way
//! the loader touches entry data. It adds name normalization, text decoding,
//! `data:` URI encoding and an optional per-read timeout on top of whatever
//! the underlying archive provides.

mod source;

pub use source::ZipSource;

use std::collections::BTreeSet;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use percent_encoding::percent_decode_str;

use crate::error::{Error, Result};
use crate::util::decode_text;

/// Boxed future returned by [`Archive::read`].
pub type ReadFuture<'a> = Pin<Box<dyn Future<Output = io::Result<Vec<u8>>> + Send + 'a>>;

/// A container of named entries.
///
/// Implementations must allow any number of concurrent `read` calls.
/// `read` should fail with [`io::ErrorKind::NotFound`] for unknown names.
/// Uses a boxed future so the trait stays object safe.
pub trait Archive: Send + Sync {
    /// Names of all file entries (directories excluded).
    fn entry_names(&self) -> Vec<String>;

    /// Read the full contents of one entry.
    fn read<'a>(&'a self, name: &'a str) -> ReadFuture<'a>;
}

/// Entry-name lookup over an [`Archive`].
#[derive(Clone)]
pub struct ArchiveIndex {
    archive: Arc<dyn Archive>,
    names: Arc<BTreeSet<String>>,
    read_timeout: Option<Duration>,
}

impl ArchiveIndex {
    pub fn new(archive: Arc<dyn Archive>) -> Self {
        let names = archive.entry_names().into_iter().collect();
        Self {
            archive,
            names: Arc::new(names),
            read_timeout: None,
        }
    }

    /// Fail any single read that takes longer than `timeout`.
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// All entry names, sorted.
    pub fn list(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Map a resolved path to the entry name it refers to.
    ///
    /// Exact names win; otherwise the percent-decoded form is tried, since
    /// manifest hrefs are URLs while ZIP entry names are not escaped.
    /// Fragments are not stripped here.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        if let Some(found) = self.names.get(name) {
            return Some(found.as_str());
        }

        let decoded = percent_decode_str(name).decode_utf8().ok()?;
        self.names.get(decoded.as_ref()).map(String::as_str)
    }

    /// Read an entry's raw bytes.
    pub async fn read_bytes(&self, name: &str) -> Result<Vec<u8>> {
        let entry = self
            .lookup(name)
            .ok_or_else(|| Error::EntryNotFound(name.to_string()))?;

        let read = self.archive.read(entry);
        let result = match self.read_timeout {
            Some(after) => tokio::time::timeout(after, read)
                .await
                .map_err(|_| Error::Timeout {
                    name: entry.to_string(),
                    after,
                })?,
            None => read.await,
        };

        result.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::EntryNotFound(entry.to_string()),
            _ => Error::read(entry, e),
        })
    }

    /// Read an entry and decode it as text.
    pub async fn read_text(&self, name: &str) -> Result<String> {
        let bytes = self.read_bytes(name).await?;
        Ok(decode_text(&bytes).into_owned())
    }

    /// Read an entry as a base64 `data:` URI labelled with `mime`.
    pub async fn read_encoded(&self, name: &str, mime: &str) -> Result<String> {
        let bytes = self.read_bytes(name).await?;
        Ok(data_uri(mime, &bytes))
    }
}

/// Build a base64 `data:` URI.
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}
