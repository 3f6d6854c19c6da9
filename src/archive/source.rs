//! ZIP-backed [`Archive`] implementation.

use std::collections::HashMap;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use zip::{CompressionMethod, ZipArchive};

use super::{Archive, ReadFuture};
use crate::error::Result;
use crate::io::{ByteSource, ByteSourceCursor, FileSource, MemorySource};

/// Location of one entry's data inside the ZIP file.
#[derive(Clone, Copy, Debug)]
struct ZipEntryLoc {
    data_offset: u64,
    compressed_size: u64,
    uncompressed_size: u64,
    compression: CompressionMethod,
}

/// A ZIP archive whose central directory has been scanned once.
///
/// Entries are read with positional reads against the shared
/// [`ByteSource`] and inflated on tokio's blocking pool, so reads never
/// contend for a cursor.
pub struct ZipSource {
    source: Arc<dyn ByteSource>,
    entries: HashMap<String, ZipEntryLoc>,
}

impl ZipSource {
    /// Scan the central directory of `source`.
    pub fn new(source: Arc<dyn ByteSource>) -> Result<Self> {
        let mut archive = ZipArchive::new(ByteSourceCursor::new(Arc::clone(&source)))?;
        let mut entries = HashMap::with_capacity(archive.len());

        for i in 0..archive.len() {
            let file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }

            entries.insert(
                file.name().to_string(),
                ZipEntryLoc {
                    data_offset: file.data_start(),
                    compressed_size: file.compressed_size(),
                    uncompressed_size: file.size(),
                    compression: file.compression(),
                },
            );
        }

        Ok(Self { source, entries })
    }

    /// Index an archive held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::new(Arc::new(MemorySource::new(bytes)))
    }

    /// Index an archive on disk; entry data is read lazily.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::new(Arc::new(FileSource::new(file)?))
    }
}

impl Archive for ZipSource {
    fn entry_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn read<'a>(&'a self, name: &'a str) -> ReadFuture<'a> {
        let loc = self.entries.get(name).copied();
        let source = Arc::clone(&self.source);

        Box::pin(async move {
            let loc = loc.ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("File not found in ZIP: {name}"),
                )
            })?;

            tokio::task::spawn_blocking(move || inflate(source.as_ref(), loc))
                .await
                .map_err(io::Error::other)?
        })
    }
}

fn inflate(source: &dyn ByteSource, loc: ZipEntryLoc) -> io::Result<Vec<u8>> {
    let size = usize::try_from(loc.compressed_size)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "entry too large"))?;
    let compressed = source.read_at(loc.data_offset, size)?;

    match loc.compression {
        CompressionMethod::Stored => Ok(compressed),
        CompressionMethod::Deflated => {
            let capacity = usize::try_from(loc.uncompressed_size).unwrap_or(0);
            let mut out = Vec::with_capacity(capacity);
            flate2::read::DeflateDecoder::new(&compressed[..]).read_to_end(&mut out)?;
            Ok(out)
        }
        method => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("Unsupported compression method: {method:?}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn build_zip() -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file("mimetype", stored).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();
        zip.add_directory("OEBPS/", stored).unwrap();
        zip.start_file("OEBPS/ch1.xhtml", deflated).unwrap();
        zip.write_all("<p>chapter one</p>".repeat(50).as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_scan_skips_directories() {
        let source = ZipSource::from_bytes(build_zip()).unwrap();
        let mut names = source.entry_names();
        names.sort();
        assert_eq!(names, vec!["OEBPS/ch1.xhtml", "mimetype"]);
    }

    #[tokio::test]
    async fn test_read_stored_and_deflated() {
        let source = ZipSource::from_bytes(build_zip()).unwrap();

        assert_eq!(source.read("mimetype").await.unwrap(), b"application/epub+zip");

        let chapter = source.read("OEBPS/ch1.xhtml").await.unwrap();
        assert_eq!(chapter, "<p>chapter one</p>".repeat(50).as_bytes());
    }

    #[tokio::test]
    async fn test_read_missing_entry() {
        let source = ZipSource::from_bytes(build_zip()).unwrap();
        let err = source.read("nope.xhtml").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_not_a_zip() {
        assert!(ZipSource::from_bytes(b"definitely not a zip".to_vec()).is_err());
    }

    #[tokio::test]
    async fn test_open_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&build_zip()).unwrap();

        let source = ZipSource::open(file.path()).unwrap();
        assert_eq!(source.read("mimetype").await.unwrap(), b"application/epub+zip");
    }
}
