//! EPUB 2 NCX navigation map (flat variant).

use quick_xml::Reader;
use quick_xml::events::Event;

use super::xml::{attribute, collapse_whitespace, local_name, resolve_entity};
use crate::book::NavNode;
use crate::error::Result;
use crate::path::resolve;

/// Parse the `navMap` of an NCX document.
///
/// Each `navPoint` becomes a [`NavNode`] titled by its `navLabel/text`, with
/// `content@src` resolved against `base_dir`. Nested navPoints become
/// children. A navPoint without a label or a target is dropped along with
/// its subtree. Documents without a `navMap` yield an empty forest.
pub fn parse_ncx(content: &str, base_dir: &str) -> Result<Vec<NavNode>> {
    let mut reader = Reader::from_str(content);

    struct NavPointState {
        children: Vec<NavNode>,
        text: Option<String>,
        /// The first label has closed; later ones (other languages) are ignored.
        label_done: bool,
        src: Option<String>,
    }

    impl NavPointState {
        fn new() -> Self {
            Self {
                children: Vec::new(),
                text: None,
                label_done: false,
                src: None,
            }
        }

        fn push_text(&mut self, raw: &str) {
            if self.label_done {
                return;
            }
            self.text.get_or_insert_with(String::new).push_str(raw);
        }
    }

    // Bottom frame collects the top-level navPoints of the navMap.
    let mut stack: Vec<NavPointState> = vec![NavPointState::new()];
    let mut in_nav_map = false;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match local_name(e.name().as_ref()) {
                b"navMap" => in_nav_map = true,
                b"navPoint" if in_nav_map => stack.push(NavPointState::new()),
                b"text" if in_nav_map && stack.len() > 1 => in_text = true,
                b"content" if in_nav_map && stack.len() > 1 => {
                    if let Some(state) = stack.last_mut() {
                        state.src = attribute(&e, b"src");
                    }
                }
                _ => {}
            },
            Event::Empty(e) => {
                if in_nav_map
                    && stack.len() > 1
                    && local_name(e.name().as_ref()) == b"content"
                    && let Some(state) = stack.last_mut()
                {
                    state.src = attribute(&e, b"src");
                }
            }
            Event::Text(e) => {
                if in_text && let Some(state) = stack.last_mut() {
                    state.push_text(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::CData(e) => {
                if in_text && let Some(state) = stack.last_mut() {
                    state.push_text(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(e) => {
                if in_text && let Some(state) = stack.last_mut() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        state.push_text(&resolved);
                    }
                }
            }
            Event::End(e) => match local_name(e.name().as_ref()) {
                b"text" if in_text => {
                    in_text = false;
                    if let Some(state) = stack.last_mut() {
                        state.label_done = true;
                    }
                }
                b"navMap" => in_nav_map = false,
                b"navPoint" if in_nav_map && stack.len() > 1 => {
                    if let Some(state) = stack.pop()
                        && let (Some(text), Some(src)) = (state.text, state.src)
                        && let Some(parent) = stack.last_mut()
                    {
                        let mut node = NavNode::new(collapse_whitespace(&text), resolve(base_dir, &src));
                        node.children = state.children;
                        parent.children.push(node);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(stack.swap_remove(0).children)
}
