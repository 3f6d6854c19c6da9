//! Shared helpers: in-memory EPUB construction and a scriptable archive.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use epub_model::{Archive, ReadFuture};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// A 1x1 transparent PNG.
pub const PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0a, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// Builds EPUB archives entry by entry.
pub struct EpubBuilder {
    entries: Vec<(String, Vec<u8>)>,
}

impl EpubBuilder {
    /// An empty archive: not even a `mimetype`.
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// `mimetype` plus the standard container pointing at `OEBPS/content.opf`.
    pub fn new() -> Self {
        Self::empty()
            .file("mimetype", "application/epub+zip")
            .file("META-INF/container.xml", CONTAINER_XML)
    }

    pub fn file(mut self, name: &str, content: impl AsRef<[u8]>) -> Self {
        self.entries.push((name.to_string(), content.as_ref().to_vec()));
        self
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Write a ZIP archive; `mimetype` is stored, everything else deflated.
    pub fn build(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in &self.entries {
            let method = if name == "mimetype" {
                CompressionMethod::Stored
            } else {
                CompressionMethod::Deflated
            };
            let options = SimpleFileOptions::default().compression_method(method);
            zip.start_file(name.as_str(), options).expect("start zip entry");
            zip.write_all(content).expect("write zip entry");
        }
        zip.finish().expect("finish zip").into_inner()
    }

    /// The same entries as an in-memory [`FakeArchive`].
    pub fn fake(&self) -> FakeArchive {
        FakeArchive {
            entries: self.entries.iter().cloned().collect(),
            delays: HashMap::new(),
            failures: Vec::new(),
            completions: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Package document with the given manifest items, spine idrefs and extras.
pub fn package(metadata: &str, manifest: &str, spine: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    {metadata}
  </metadata>
  <manifest>
    {manifest}
  </manifest>
  {spine}
</package>"#
    )
}

pub fn chapter(title: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>{title}</title></head>
<body>{body}</body>
</html>"#
    )
}

/// An archive served from memory, with per-entry latency and failures.
///
/// Every completed read is appended to a shared log so tests can observe
/// completion order.
pub struct FakeArchive {
    entries: HashMap<String, Vec<u8>>,
    delays: HashMap<String, Duration>,
    failures: Vec<String>,
    completions: Arc<Mutex<Vec<String>>>,
}

impl FakeArchive {
    pub fn delay(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    pub fn fail(mut self, name: &str) -> Self {
        self.failures.push(name.to_string());
        self
    }

    pub fn completions(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.completions)
    }
}

impl Archive for FakeArchive {
    fn entry_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn read<'a>(&'a self, name: &'a str) -> ReadFuture<'a> {
        Box::pin(async move {
            if let Some(delay) = self.delays.get(name) {
                tokio::time::sleep(*delay).await;
            }
            self.completions.lock().unwrap().push(name.to_string());

            if self.failures.iter().any(|f| f == name) {
                return Err(std::io::Error::other("simulated corruption"));
            }
            self.entries
                .get(name)
                .cloned()
                .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
        })
    }
}
