//! Package document (OPF) parsing: manifest, spine and metadata.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::xml::{attribute, element_name, local_name, resolve_entity};
use crate::error::{Error, Result};
use crate::path::resolve;

/// One manifest `item`, with its href resolved to an archive path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    pub path: String,
    pub media_type: String,
    pub properties: Vec<String>,
}

impl ManifestItem {
    /// Whether this item is the EPUB 3 navigation document.
    pub fn is_nav(&self) -> bool {
        self.has_property("nav")
    }

    pub fn has_property(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p == property)
    }
}

/// Where the table of contents comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationSource {
    /// EPUB 3 navigation document (tree variant).
    Document(String),
    /// EPUB 2 NCX navigation map (flat variant).
    Map(String),
    /// The book declares no table of contents.
    None,
}

/// Everything the loader needs from the package document.
#[derive(Debug, Clone, Default)]
pub struct PackageDocument {
    /// Manifest items in declaration order.
    pub manifest: Vec<ManifestItem>,
    /// Spine in reading order. `None` marks an `itemref` whose `idref` is
    /// not in the manifest.
    pub spine: Vec<Option<String>>,
    /// Resolved path of the manifest item marked `nav`.
    pub nav_path: Option<String>,
    /// `toc` attribute of the spine (legacy NCX manifest id).
    pub toc_id: Option<String>,
    /// Local element name -> text, last declaration wins.
    pub metadata: HashMap<String, String>,
    /// Resolved path of the cover image, if declared.
    pub cover_image: Option<String>,
}

impl PackageDocument {
    /// Look up a manifest item by id.
    pub fn item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }

    /// Pick the navigation variant: a `nav` item wins over the spine's NCX.
    pub fn navigation(&self) -> NavigationSource {
        if let Some(path) = &self.nav_path {
            return NavigationSource::Document(path.clone());
        }

        match self.toc_id.as_deref().and_then(|id| self.item(id)) {
            Some(item) => NavigationSource::Map(item.path.clone()),
            None => NavigationSource::None,
        }
    }
}

/// Parse a package document. Every href is resolved against `base_dir`,
/// the directory holding the package document.
pub fn parse_package(content: &str, base_dir: &str) -> Result<PackageDocument> {
    // Untrimmed: entity references split text events, so trimming each piece
    // would eat the spaces around them. Captured values are trimmed instead.
    let mut reader = Reader::from_str(content);

    let mut parser = OpfParser::new(base_dir);

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                parser.open(&e);
                parser.stack.push(element_name(&e));
            }
            Event::Empty(e) => {
                parser.open(&e);
                parser.close_empty();
            }
            Event::Text(e) => parser.text(&String::from_utf8_lossy(e.as_ref())),
            Event::CData(e) => parser.text(&String::from_utf8_lossy(e.as_ref())),
            Event::GeneralRef(e) => {
                let entity = String::from_utf8_lossy(e.as_ref());
                if let Some(resolved) = resolve_entity(&entity) {
                    parser.text(&resolved);
                }
            }
            Event::End(_) => parser.close(),
            Event::Eof => break,
            _ => {}
        }
    }

    parser.finish()
}

/// Text capture for one direct child of `<metadata>`.
struct MetaCapture {
    key: String,
    /// Stack depth while inside the child element.
    depth: usize,
    text: Option<String>,
    /// Set once a nested element is seen; only the leading text counts.
    done: bool,
}

struct OpfParser<'a> {
    base_dir: &'a str,
    stack: Vec<String>,

    manifest: Vec<ManifestItem>,
    ids: HashMap<String, usize>,
    spine_ids: Vec<String>,
    toc_id: Option<String>,
    nav_path: Option<String>,
    metadata: HashMap<String, String>,
    epub2_cover_id: Option<String>,

    capture: Option<MetaCapture>,
    seen_manifest: bool,
    seen_spine: bool,
    seen_metadata: bool,
}

impl<'a> OpfParser<'a> {
    fn new(base_dir: &'a str) -> Self {
        Self {
            base_dir,
            stack: Vec::new(),
            manifest: Vec::new(),
            ids: HashMap::new(),
            spine_ids: Vec::new(),
            toc_id: None,
            nav_path: None,
            metadata: HashMap::new(),
            epub2_cover_id: None,
            capture: None,
            seen_manifest: false,
            seen_spine: false,
            seen_metadata: false,
        }
    }

    fn parent(&self) -> Option<&str> {
        self.stack.last().map(String::as_str)
    }

    fn inside(&self, name: &str) -> bool {
        self.stack.iter().any(|s| s == name)
    }

    /// Handle an opening (or self-closing) tag before it is pushed.
    fn open(&mut self, e: &BytesStart<'_>) {
        let name = e.name();
        let local = local_name(name.as_ref());

        if let Some(capture) = &mut self.capture {
            capture.done = true;
        }

        match local {
            b"manifest" => self.seen_manifest = true,
            b"metadata" => self.seen_metadata = true,
            b"spine" => {
                self.seen_spine = true;
                self.toc_id = attribute(e, b"toc").filter(|id| !id.is_empty());
            }
            b"item" if self.parent() == Some("manifest") => self.add_item(e),
            b"itemref" if self.parent() == Some("spine") => {
                if let Some(idref) = attribute(e, b"idref") {
                    self.spine_ids.push(idref);
                }
            }
            b"meta" if self.inside("metadata") => {
                if attribute(e, b"name").as_deref() == Some("cover")
                    && let Some(id) = attribute(e, b"content").filter(|id| !id.is_empty())
                {
                    self.epub2_cover_id = Some(id);
                }
            }
            _ => {}
        }

        if self.parent() == Some("metadata") {
            self.capture = Some(MetaCapture {
                key: String::from_utf8_lossy(local).into_owned(),
                depth: self.stack.len() + 1,
                text: None,
                done: false,
            });
        }
    }

    fn add_item(&mut self, e: &BytesStart<'_>) {
        let (Some(id), Some(href)) = (attribute(e, b"id"), attribute(e, b"href")) else {
            return;
        };

        let item = ManifestItem {
            path: resolve(self.base_dir, &href),
            media_type: attribute(e, b"media-type").unwrap_or_default(),
            properties: attribute(e, b"properties")
                .map(|p| p.split_ascii_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            id,
        };

        if item.is_nav() {
            self.nav_path = Some(item.path.clone());
        }

        match self.ids.get(&item.id) {
            Some(&slot) => self.manifest[slot] = item,
            None => {
                self.ids.insert(item.id.clone(), self.manifest.len());
                self.manifest.push(item);
            }
        }
    }

    fn text(&mut self, text: &str) {
        let depth = self.stack.len();
        if let Some(capture) = &mut self.capture
            && !capture.done
            && capture.depth == depth
        {
            capture.text.get_or_insert_with(String::new).push_str(text);
        }
    }

    fn close(&mut self) {
        self.finish_capture(self.stack.len());
        self.stack.pop();
    }

    fn close_empty(&mut self) {
        self.finish_capture(self.stack.len() + 1);
    }

    fn finish_capture(&mut self, depth: usize) {
        if self.capture.as_ref().is_some_and(|c| c.depth == depth)
            && let Some(capture) = self.capture.take()
            && let Some(text) = capture.text
            && !text.trim().is_empty()
        {
            self.metadata.insert(capture.key, text.trim().to_string());
        }
    }

    fn finish(self) -> Result<PackageDocument> {
        for (seen, element) in [
            (self.seen_manifest, "manifest"),
            (self.seen_spine, "spine"),
            (self.seen_metadata, "metadata"),
        ] {
            if !seen {
                return Err(Error::Structural(format!(
                    "package document has no <{element}> element"
                )));
            }
        }

        let lookup = |id: &str| self.ids.get(id).map(|&slot| &self.manifest[slot]);

        let spine = self
            .spine_ids
            .iter()
            .map(|id| lookup(id).map(|item| item.path.clone()))
            .collect();

        // EPUB 3 "cover-image" property takes priority over EPUB 2 meta
        let cover_image = self
            .manifest
            .iter()
            .find(|item| item.has_property("cover-image"))
            .or_else(|| self.epub2_cover_id.as_deref().and_then(lookup))
            .map(|item| item.path.clone());

        Ok(PackageDocument {
            spine,
            cover_image,
            nav_path: self.nav_path,
            toc_id: self.toc_id,
            metadata: self.metadata,
            manifest: self.manifest,
        })
    }
}
