//! # epub-model
//!
//! Loads an EPUB into a ready-to-render, read-only model: reading order,
//! table of contents, metadata, and content documents whose images and
//! stylesheets are inlined as `data:` URIs.
//!
//! ## Quick Start
//!
//! ```no_run
//! # async fn run() -> epub_model::Result<()> {
//! use epub_model::Book;
//!
//! let book = Book::open_file("input.epub").await?;
//!
//! for entry in book.contents() {
//!     println!("{} -> {}", entry.title, entry.path);
//! }
//!
//! let first = &book.components()[0];
//! let html = book.component(first).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom archives
//!
//! Anything implementing [`Archive`] can back a book, which is how the
//! loader is driven from memory, from disk, or from a test double:
//!
//! ```no_run
//! # async fn run() -> epub_model::Result<()> {
//! use std::sync::Arc;
//! use std::time::Duration;
//! use epub_model::{Book, LoadOptions, ZipSource};
//!
//! let archive = ZipSource::open("input.epub")?;
//! let options = LoadOptions::new().with_read_timeout(Duration::from_secs(5));
//! let book = Book::from_archive(Arc::new(archive), options).await?;
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod book;
pub mod epub;
pub mod error;
pub mod inline;
pub mod io;
pub mod path;
pub(crate) mod util;

pub use archive::{Archive, ArchiveIndex, ReadFuture, ZipSource};
pub use book::{Book, LoadOptions, NavNode};
pub use epub::{ManifestItem, NavigationSource};
pub use error::{Error, Result};
