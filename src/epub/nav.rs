//! EPUB 3 navigation document (tree variant).
//!
//! The table of contents is the first `ol` inside `<nav epub:type="toc">`.
//! Every `li` with a link becomes a [`NavNode`]; the first `ol` nested in
//! that `li` supplies its children. A heading `li` without a link of its own
//! (`<li><span>Part One</span><ol>..</ol></li>`) is titled by its text and
//! points at its first child. Items with neither a link nor children are
//! skipped.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::xml::{attribute, collapse_whitespace, local_name, resolve_entity};
use crate::book::NavNode;
use crate::error::Result;
use crate::path::resolve;

/// Parse the `toc` nav of a navigation document, resolving link targets
/// against `base_dir`. If several toc navs exist the last one wins; a
/// document without one yields an empty forest.
pub fn parse_nav(content: &str, base_dir: &str) -> Result<Vec<NavNode>> {
    let mut reader = Reader::from_str(content);
    let mut parser = NavParser::new(base_dir);

    loop {
        match reader.read_event()? {
            Event::Start(e) => parser.start(&e, false),
            Event::Empty(e) => parser.start(&e, true),
            Event::End(e) => parser.end(local_name(e.name().as_ref())),
            Event::Text(e) => parser.text(&String::from_utf8_lossy(e.as_ref())),
            Event::CData(e) => parser.text(&String::from_utf8_lossy(e.as_ref())),
            Event::GeneralRef(e) => {
                let entity = String::from_utf8_lossy(e.as_ref());
                if let Some(resolved) = resolve_entity(&entity) {
                    parser.text(&resolved);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(parser.toc.unwrap_or_default())
}

struct ItemFrame {
    depth: usize,
    href: Option<String>,
    title: String,
    /// Text of the item outside its link, used for heading items.
    label: String,
    link_seen: bool,
    in_link: bool,
    children: Option<Vec<NavNode>>,
}

struct ListFrame {
    depth: usize,
    nodes: Vec<NavNode>,
}

struct NavParser<'a> {
    base_dir: &'a str,
    depth: usize,
    /// Depth of the open `<nav epub:type="toc">`, if any.
    toc_depth: Option<usize>,
    /// Top-level list of the open toc nav.
    current: Option<Vec<NavNode>>,
    lists: Vec<ListFrame>,
    items: Vec<ItemFrame>,
    toc: Option<Vec<NavNode>>,
}

impl<'a> NavParser<'a> {
    fn new(base_dir: &'a str) -> Self {
        Self {
            base_dir,
            depth: 0,
            toc_depth: None,
            current: None,
            lists: Vec::new(),
            items: Vec::new(),
            toc: None,
        }
    }

    /// True while the innermost open frame is an `li` (not a nested `ol`).
    fn in_item(&self) -> bool {
        !self.items.is_empty() && self.lists.len() == self.items.len()
    }

    fn start(&mut self, e: &BytesStart<'_>, empty: bool) {
        let name = e.name();
        let local = local_name(name.as_ref());

        if self.toc_depth.is_none() {
            if local == b"nav" && !empty && is_toc_nav(e) {
                self.toc_depth = Some(self.depth);
                self.current = None;
                self.lists.clear();
                self.items.clear();
            }
        } else {
            match local {
                b"ol" if !empty => self.lists.push(ListFrame {
                    depth: self.depth,
                    nodes: Vec::new(),
                }),
                b"li" if self.lists.len() > self.items.len() => {
                    self.items.push(ItemFrame {
                        depth: self.depth,
                        href: None,
                        title: String::new(),
                        label: String::new(),
                        link_seen: false,
                        in_link: false,
                        children: None,
                    });
                    if empty {
                        self.close_item();
                    }
                }
                b"a" if self.in_item() => {
                    if let Some(item) = self.items.last_mut()
                        && !item.link_seen
                    {
                        item.link_seen = true;
                        item.href = attribute(e, b"href");
                        item.in_link = !empty;
                    }
                }
                _ => {}
            }
        }

        if !empty {
            self.depth += 1;
        }
    }

    fn end(&mut self, local: &[u8]) {
        self.depth = self.depth.saturating_sub(1);

        let Some(toc_depth) = self.toc_depth else {
            return;
        };

        match local {
            b"nav" if self.depth == toc_depth => {
                self.toc = Some(self.current.take().unwrap_or_default());
                self.toc_depth = None;
            }
            b"a" => {
                if let Some(item) = self.items.last_mut() {
                    item.in_link = false;
                }
            }
            b"li" if self.items.last().is_some_and(|i| i.depth == self.depth) => {
                self.close_item()
            }
            b"ol" if self.lists.last().is_some_and(|l| l.depth == self.depth) => {
                self.close_list()
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        let in_item = self.in_item();
        let Some(item) = self.items.last_mut() else {
            return;
        };

        if item.in_link {
            item.title.push_str(text);
        } else if in_item && !item.link_seen {
            item.label.push_str(text);
        }
    }

    fn close_item(&mut self) {
        let Some(item) = self.items.pop() else {
            return;
        };

        let children = item.children.unwrap_or_default();
        let node = match item.href {
            Some(href) => NavNode::new(collapse_whitespace(&item.title), resolve(self.base_dir, &href)),
            None => {
                // Heading item: needs children to point at.
                let Some(first) = children.first() else {
                    return;
                };
                let text = if item.link_seen { &item.title } else { &item.label };
                let title = match collapse_whitespace(text) {
                    t if t.is_empty() => first.title.clone(),
                    t => t,
                };
                NavNode::new(title, first.path.clone())
            }
        };

        if let Some(list) = self.lists.last_mut() {
            list.nodes.push(NavNode { children, ..node });
        }
    }

    fn close_list(&mut self) {
        let Some(list) = self.lists.pop() else {
            return;
        };

        // A list closing inside an li belongs to that li; only the first counts.
        if self.in_item() {
            if let Some(item) = self.items.last_mut()
                && item.children.is_none()
            {
                item.children = Some(list.nodes);
            }
        } else if self.lists.is_empty() && self.items.is_empty() && self.current.is_none() {
            self.current = Some(list.nodes);
        }
    }
}

fn is_toc_nav(e: &BytesStart<'_>) -> bool {
    attribute(e, b"epub:type").is_some_and(|types| types.split_ascii_whitespace().any(|t| t == "toc"))
}
