//! `META-INF/container.xml`: where the package document lives.

use quick_xml::Reader;
use quick_xml::events::Event;

use super::xml::{attribute, local_name};
use crate::error::{Error, Result};

/// Fixed location of the container descriptor.
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Archive-root descriptor; never part of the book content.
pub const MIMETYPE_PATH: &str = "mimetype";

/// Return the `full-path` of the first `rootfile` element.
pub fn parse_container(content: &str) -> Result<String> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Empty(e) | Event::Start(e) if local_name(e.name().as_ref()) == b"rootfile" => {
                return match attribute(&e, b"full-path") {
                    Some(path) if !path.trim().is_empty() => Ok(path.trim().to_string()),
                    _ => Err(Error::Structural(
                        "rootfile in container.xml has no full-path".into(),
                    )),
                };
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(Error::Structural(
        "No rootfile found in container.xml".into(),
    ))
}
