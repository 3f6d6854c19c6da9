//! Text decoding and media type helpers.

use std::borrow::Cow;

use crate::path::extension;

/// Decode bytes to a string, handling various encodings.
///
/// This function:
/// 1. First tries UTF-8 (handles BOM automatically via encoding_rs)
/// 2. If malformed, tries the encoding named in the `<?xml encoding="..."?>`
///    declaration, if any
/// 3. Falls back to Windows-1252 (common in old ebooks)
///
/// Uses `Cow<str>` to avoid allocation when the input is valid UTF-8 without
/// a BOM.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = xml_declared_encoding(bytes)
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Pull the `encoding` pseudo-attribute out of an XML declaration.
fn xml_declared_encoding(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(256)];
    let head = String::from_utf8_lossy(head);
    let decl = head.strip_prefix("<?xml")?;
    let decl = &decl[..decl.find("?>")?];
    let rest = &decl[decl.find("encoding")? + "encoding".len()..];
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &rest[1..];
    Some(value[..value.find(quote)?].to_string())
}

// ============================================================================
// Media Types
// ============================================================================

/// Media type of an archive entry, derived from its file extension.
///
/// This is the fixed table used to label encoded payloads; anything outside
/// it is labelled `application/octet-stream`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Png,
    Gif,
    Jpeg,
    Svg,
    WebP,
    JavaScript,
    Css,
    Ttf,
    Otf,
    Woff,
    Woff2,
    Binary,
}

impl MediaType {
    /// Look up the media type for an archive path.
    pub fn from_path(path: &str) -> Self {
        let Some(ext) = extension(path) else {
            return MediaType::Binary;
        };

        match ext.to_ascii_lowercase().as_str() {
            "png" => MediaType::Png,
            "gif" => MediaType::Gif,
            "jpg" | "jpeg" => MediaType::Jpeg,
            "svg" => MediaType::Svg,
            "webp" => MediaType::WebP,
            "js" => MediaType::JavaScript,
            "css" => MediaType::Css,
            "ttf" => MediaType::Ttf,
            "otf" => MediaType::Otf,
            "woff" => MediaType::Woff,
            "woff2" => MediaType::Woff2,
            _ => MediaType::Binary,
        }
    }

    /// Get the MIME type string for this format.
    pub fn mime_type(self) -> &'static str {
        match self {
            MediaType::Png => "image/png",
            MediaType::Gif => "image/gif",
            MediaType::Jpeg => "image/jpeg",
            MediaType::Svg => "image/svg+xml",
            MediaType::WebP => "image/webp",
            MediaType::JavaScript => "text/javascript",
            MediaType::Css => "text/css",
            MediaType::Ttf => "font/ttf",
            MediaType::Otf => "font/otf",
            MediaType::Woff => "font/woff",
            MediaType::Woff2 => "font/woff2",
            MediaType::Binary => "application/octet-stream",
        }
    }
}

/// MIME type for an archive path (see [`MediaType`]).
pub fn mime_type_for(path: &str) -> &'static str {
    MediaType::from_path(path).mime_type()
}

/// Whether a path names a markup document whose references get inlined.
pub fn is_markup(path: &str) -> bool {
    extension(path).is_some_and(|ext| {
        ["html", "htm", "xhtml", "xml"]
            .iter()
            .any(|m| ext.eq_ignore_ascii_case(m))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8_with_bom() {
        let bytes = [0xEF, 0xBB, 0xBF, b'<', b'a', b'/', b'>'];
        assert_eq!(decode_text(&bytes), "<a/>");
    }

    #[test]
    fn test_decode_declared_encoding() {
        // 0xE9 is 'é' in ISO-8859-1 and invalid as a lone UTF-8 byte
        let mut bytes = br#"<?xml version="1.0" encoding="ISO-8859-1"?><t>"#.to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b"</t>");
        assert!(decode_text(&bytes).contains("<t>\u{e9}</t>"));
    }

    #[test]
    fn test_decode_falls_back_to_cp1252() {
        // 0x93/0x94 are curly quotes in Windows-1252
        let bytes = [0x93, b'h', b'i', 0x94];
        assert_eq!(decode_text(&bytes), "\u{201c}hi\u{201d}");
    }

    #[test]
    fn test_xml_declared_encoding() {
        assert_eq!(
            xml_declared_encoding(br#"<?xml version='1.0' encoding='windows-1252'?>"#),
            Some("windows-1252".to_string())
        );
        assert_eq!(xml_declared_encoding(br#"<?xml version="1.0"?>"#), None);
        assert_eq!(xml_declared_encoding(b"<html/>"), None);
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(mime_type_for("images/cover.jpg"), "image/jpeg");
        assert_eq!(mime_type_for("images/cover.JPEG"), "image/jpeg");
        assert_eq!(mime_type_for("a.png"), "image/png");
        assert_eq!(mime_type_for("style/main.css"), "text/css");
        assert_eq!(mime_type_for("fig.svg"), "image/svg+xml");
        assert_eq!(mime_type_for("toc.ncx"), "application/octet-stream");
        assert_eq!(mime_type_for("mimetype"), "application/octet-stream");
    }

    #[test]
    fn test_is_markup() {
        assert!(is_markup("OEBPS/ch1.xhtml"));
        assert!(is_markup("ch1.HTML"));
        assert!(is_markup("a.htm"));
        assert!(is_markup("META-INF/container.xml"));
        assert!(!is_markup("style.css"));
        assert!(!is_markup("toc.ncx"));
        assert!(!is_markup("README"));
    }
}
