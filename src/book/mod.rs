//! The finished book model and its construction entry points.

mod loader;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::archive::{Archive, ArchiveIndex, ZipSource};
use crate::epub::{ManifestItem, NavigationSource, PackageDocument};
use crate::error::Result;
use crate::inline::inline_resources;
use crate::path::{directory_of, strip_fragment};
use crate::util::is_markup;

/// A table of contents entry (hierarchical).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavNode {
    pub title: String,
    /// Resolved archive path of the target, possibly with a `#fragment`.
    pub path: String,
    pub children: Vec<NavNode>,
}

impl NavNode {
    pub fn new(title: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            path: path.into(),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: NavNode) -> Self {
        self.children.push(child);
        self
    }
}

/// Options controlling how a book is loaded.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Upper bound for any single archive read. `None` waits forever.
    pub read_timeout: Option<Duration>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }
}

/// A fully loaded EPUB.
///
/// Construction resolves the package document, the table of contents and
/// an encoded payload for every auxiliary file before returning, so the
/// model is complete and read-only from the moment it exists.
///
/// # Example
///
/// ```no_run
/// # async fn run() -> epub_model::Result<()> {
/// use epub_model::Book;
///
/// let book = Book::open_file("book.epub").await?;
/// println!("Title: {}", book.metadata("title").unwrap_or("(untitled)"));
///
/// for path in book.components() {
///     let html = book.component(path).await?;
///     println!("{path}: {} bytes", html.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Book {
    index: ArchiveIndex,
    package_path: String,
    package: PackageDocument,
    components: Vec<String>,
    navigation: NavigationSource,
    contents: Vec<NavNode>,
    payloads: HashMap<String, String>,
}

impl Book {
    /// Load a book from the bytes of an EPUB file.
    pub async fn open(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let source = ZipSource::from_bytes(bytes.into())?;
        Self::from_archive(Arc::new(source), LoadOptions::default()).await
    }

    /// Load a book from an EPUB file on disk. Entries are read lazily.
    pub async fn open_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_file_with(path, LoadOptions::default()).await
    }

    pub async fn open_file_with(path: impl AsRef<Path>, options: LoadOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let source = tokio::task::spawn_blocking(move || ZipSource::open(path))
            .await
            .map_err(std::io::Error::other)??;
        Self::from_archive(Arc::new(source), options).await
    }

    /// Load a book from any [`Archive`].
    pub async fn from_archive(archive: Arc<dyn Archive>, options: LoadOptions) -> Result<Self> {
        let index = ArchiveIndex::new(archive).with_read_timeout(options.read_timeout);
        loader::load(index).await
    }

    /// Content documents in reading order, as archive paths.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// The table of contents.
    pub fn contents(&self) -> &[NavNode] {
        &self.contents
    }

    /// Metadata value by element local name (`title`, `creator`, ...).
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.package.metadata.get(key).map(String::as_str)
    }

    pub fn metadata_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.package
            .metadata
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Text of one archive entry.
    ///
    /// Markup documents come back with `img`, `link` and SVG `image`
    /// references replaced by `data:` URIs; anything else is returned as
    /// stored. A trailing `#fragment` is ignored, so navigation targets can
    /// be passed directly.
    pub async fn component(&self, path: &str) -> Result<String> {
        let path = strip_fragment(path);
        let text = self.index.read_text(path).await?;

        if !is_markup(path) {
            return Ok(text);
        }

        match inline_resources(&text, &directory_of(path), &self.payloads) {
            Ok(inlined) => Ok(inlined),
            Err(e) => {
                warn!(path, error = %e, "markup did not parse; returning it unmodified");
                Ok(text)
            }
        }
    }

    /// Archive path of the package document.
    pub fn package_path(&self) -> &str {
        &self.package_path
    }

    /// Manifest items in declaration order.
    pub fn manifest(&self) -> &[ManifestItem] {
        &self.package.manifest
    }

    /// Resolved path of the cover image, if the package declares one.
    pub fn cover_image(&self) -> Option<&str> {
        self.package.cover_image.as_deref()
    }

    /// Which navigation format supplied [`Book::contents`].
    pub fn navigation(&self) -> &NavigationSource {
        &self.navigation
    }

    /// Encoded payload (`data:` URI) of an auxiliary file.
    pub fn payload(&self, path: &str) -> Option<&str> {
        self.payloads.get(path).map(String::as_str)
    }

    /// Number of auxiliary files with an encoded payload.
    pub fn payload_count(&self) -> usize {
        self.payloads.len()
    }

    /// All entry names in the archive, sorted.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.index.list()
    }
}

impl fmt::Debug for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Book")
            .field("package_path", &self.package_path)
            .field("components", &self.components)
            .field("navigation", &self.navigation)
            .field("contents", &self.contents.len())
            .field("payloads", &self.payloads.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nav_node_builder() {
        let node = NavNode::new("Part", "p.xhtml")
            .with_child(NavNode::new("One", "p.xhtml#1"))
            .with_child(NavNode::new("Two", "p.xhtml#2"));

        assert_eq!(node.children.len(), 2);
        assert_eq!(node.children[1].title, "Two");
        assert!(node.children[0].children.is_empty());
    }

    #[test]
    fn test_load_options() {
        assert_eq!(LoadOptions::new().read_timeout, None);
        let options = LoadOptions::new().with_read_timeout(Duration::from_secs(2));
        assert_eq!(options.read_timeout, Some(Duration::from_secs(2)));
    }
}
