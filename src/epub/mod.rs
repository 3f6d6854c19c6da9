//! EPUB document parsers: container descriptor, package document (OPF),
//! EPUB 3 navigation document and EPUB 2 NCX.
//!
//! All parsers are synchronous and work on already-decoded text; the loader
//! in [`crate::book`] does the reading.

mod container;
mod nav;
mod ncx;
mod opf;
mod xml;

pub use container::{CONTAINER_PATH, MIMETYPE_PATH, parse_container};
pub use nav::parse_nav;
pub use ncx::parse_ncx;
pub use opf::{ManifestItem, NavigationSource, PackageDocument, parse_package};

pub(crate) use xml::local_name;
