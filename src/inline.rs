//! Rewrites resource references in markup to self-contained payloads.
//!
//! The document is streamed through quick-xml and written back event by
//! event; only the start tags of referencing elements are rebuilt, so
//! everything else (comments, entities, whitespace) survives unchanged.

use std::borrow::Cow;
use std::collections::HashMap;
use std::io;

use percent_encoding::percent_decode_str;
use quick_xml::escape::unescape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::epub::local_name;
use crate::error::Result;
use crate::path::resolve;

/// Element local name -> attribute holding a resource reference.
const URL_ATTRIBUTES: &[(&[u8], &[u8])] = &[
    (b"img", b"src"),
    (b"link", b"href"),
    // <image> inside inline SVG (common for covers)
    (b"image", b"xlink:href"),
];

/// Replace every resolvable resource reference in `markup`.
///
/// References are resolved against `base_dir` (the directory of the document
/// being rewritten) and looked up in `payloads`, keyed by archive path.
/// References that resolve to nothing known are left as they are.
pub fn inline_resources(
    markup: &str,
    base_dir: &str,
    payloads: &HashMap<String, String>,
) -> Result<String> {
    let mut reader = Reader::from_str(markup);
    let mut writer = Writer::new(Vec::with_capacity(markup.len()));

    loop {
        match reader.read_event()? {
            Event::Start(e) => writer.write_event(Event::Start(rewrite(e, base_dir, payloads)))?,
            Event::Empty(e) => writer.write_event(Event::Empty(rewrite(e, base_dir, payloads)))?,
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}

fn rewrite<'a>(
    e: BytesStart<'a>,
    base_dir: &str,
    payloads: &HashMap<String, String>,
) -> BytesStart<'a> {
    let Some(key) = url_attribute(e.name().as_ref()) else {
        return e;
    };

    let Some(payload) = reference(&e, key).and_then(|href| lookup(payloads, &resolve(base_dir, &href)))
    else {
        return e;
    };

    let mut out = BytesStart::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key {
            out.push_attribute((key, payload.as_bytes()));
        } else {
            out.push_attribute(requote(attr));
        }
    }
    out
}

fn url_attribute(name: &[u8]) -> Option<&'static [u8]> {
    let local = local_name(name);
    URL_ATTRIBUTES
        .iter()
        .find(|(tag, _)| *tag == local)
        .map(|(_, attr)| *attr)
}

fn reference(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    let attr = e.attributes().flatten().find(|a| a.key.as_ref() == key)?;
    let raw = String::from_utf8_lossy(&attr.value);
    Some(unescape(&raw).map(Cow::into_owned).unwrap_or_else(|_| raw.into_owned()))
}

/// Payload for a resolved path; percent-encoded references fall back to
/// their decoded form.
fn lookup<'p>(payloads: &'p HashMap<String, String>, path: &str) -> Option<&'p String> {
    payloads.get(path).or_else(|| {
        let decoded = percent_decode_str(path).decode_utf8().ok()?;
        payloads.get(decoded.as_ref())
    })
}

/// Rebuilt tags always use double quotes; re-escape single-quoted values
/// that contain one.
fn requote(attr: Attribute<'_>) -> Attribute<'_> {
    if !attr.value.contains(&b'"') {
        return attr;
    }
    let raw = String::from_utf8_lossy(&attr.value).replace('"', "&quot;");
    Attribute {
        key: attr.key,
        value: Cow::Owned(raw.into_bytes()),
    }
}
