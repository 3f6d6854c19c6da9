//! The load pipeline.
//!
//! Two sequential stages (container, package document) are followed by two
//! independent branches joined before the book is returned: the table of
//! contents, and the encoded payload of every auxiliary file.

use std::collections::{HashMap, HashSet};

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tracing::{debug, info, warn};

use super::{Book, NavNode};
use crate::archive::ArchiveIndex;
use crate::epub::{
    CONTAINER_PATH, MIMETYPE_PATH, NavigationSource, parse_container, parse_nav, parse_ncx,
    parse_package,
};
use crate::error::Result;
use crate::path::directory_of;
use crate::util::mime_type_for;

type NavParser = fn(&str, &str) -> Result<Vec<NavNode>>;

pub(super) async fn load(index: ArchiveIndex) -> Result<Book> {
    let container = index.read_text(CONTAINER_PATH).await?;
    let package_path = parse_container(&container)?;
    debug!(package = %package_path, "located package document");

    let package_text = index.read_text(&package_path).await?;
    let package = parse_package(&package_text, &directory_of(&package_path))?;

    let components: Vec<String> = package
        .spine
        .iter()
        .enumerate()
        .filter_map(|(position, slot)| {
            if slot.is_none() {
                warn!(position, "spine itemref does not match any manifest item");
            }
            slot.clone()
        })
        .collect();

    info!(
        package = %package_path,
        manifest = package.manifest.len(),
        spine = components.len(),
        "parsed package document"
    );

    let spine_entries: HashSet<&str> = components
        .iter()
        .filter_map(|path| index.lookup(path))
        .collect();
    let auxiliary: Vec<&str> = index
        .list()
        .filter(|name| *name != MIMETYPE_PATH && *name != CONTAINER_PATH)
        .filter(|name| !spine_entries.contains(name))
        .collect();

    let navigation = package.navigation();
    let (contents, payloads) = futures::join!(
        load_contents(&index, &navigation),
        encode_auxiliary(&index, auxiliary)
    );

    info!(
        contents = contents.len(),
        payloads = payloads.len(),
        "book ready"
    );

    Ok(Book {
        index,
        package_path,
        package,
        components,
        navigation,
        contents,
        payloads,
    })
}

/// The table of contents. Failures leave it empty.
async fn load_contents(index: &ArchiveIndex, navigation: &NavigationSource) -> Vec<NavNode> {
    let (path, parse): (&str, NavParser) = match navigation {
        NavigationSource::Document(path) => (path.as_str(), parse_nav as NavParser),
        NavigationSource::Map(path) => (path.as_str(), parse_ncx as NavParser),
        NavigationSource::None => {
            debug!("no navigation document or NCX declared");
            return Vec::new();
        }
    };
    debug!(?navigation, "loading table of contents");

    let result: Result<Vec<NavNode>> = async {
        let text = index.read_text(path).await?;
        parse(&text, &directory_of(path))
    }
    .await;

    match result {
        Ok(contents) => contents,
        Err(e) => {
            warn!(path, error = %e, "table of contents unavailable");
            Vec::new()
        }
    }
}

/// Every auxiliary entry as a `data:` URI. Failed reads are logged and
/// left out.
async fn encode_auxiliary(index: &ArchiveIndex, names: Vec<&str>) -> HashMap<String, String> {
    let mut pending: FuturesUnordered<_> = names
        .into_iter()
        .map(|name| async move { (name, index.read_encoded(name, mime_type_for(name)).await) })
        .collect();

    let mut payloads = HashMap::with_capacity(pending.len());
    while let Some((name, result)) = pending.next().await {
        match result {
            Ok(payload) => {
                payloads.insert(name.to_string(), payload);
            }
            Err(e) => warn!(entry = name, error = %e, "skipping auxiliary resource"),
        }
        debug!(entry = name, remaining = pending.len(), "auxiliary resource settled");
    }

    payloads
}
