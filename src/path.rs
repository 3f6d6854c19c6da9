//! Archive path helpers.
//!
//! Paths inside an EPUB are ZIP entry names: `/`-separated, relative to the
//! archive root, never starting with a separator. These helpers never touch
//! `std::path`, whose separator and prefix rules differ by platform.

/// Return the directory portion of `path`, or `""` when it has none.
///
/// ```
/// use epub_model::path::directory_of;
///
/// assert_eq!(directory_of("OEBPS/text/ch01.xhtml"), "OEBPS/text");
/// assert_eq!(directory_of("content.opf"), "");
/// ```
pub fn directory_of(path: &str) -> String {
    match path.rfind('/') {
        Some(pos) => path[..pos].to_string(),
        None => String::new(),
    }
}

/// Join `relative` onto `base` and normalize the result.
///
/// `.` and empty segments are dropped and `..` removes the preceding
/// segment. A `..` with nothing left to remove is ignored, so the result can
/// never climb above the archive root.
///
/// ```
/// use epub_model::path::resolve;
///
/// assert_eq!(resolve("OEBPS/text", "../images/cover.png"), "OEBPS/images/cover.png");
/// assert_eq!(resolve("", "x/y"), "x/y");
/// ```
pub fn resolve(base: &str, relative: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in base.split('/').chain(relative.split('/')) {
        match segment {
            ".." => {
                segments.pop();
            }
            "." | "" => {}
            s => segments.push(s),
        }
    }

    segments.join("/")
}

/// Strip a trailing `#fragment`, if any.
pub fn strip_fragment(path: &str) -> &str {
    path.split_once('#').map_or(path, |(p, _)| p)
}

/// Extension of the final path segment, without the dot.
///
/// Fragments are ignored, and a leading dot (hidden file) does not count as
/// an extension separator.
pub fn extension(path: &str) -> Option<&str> {
    let path = strip_fragment(path);
    let file = path.rsplit('/').next().unwrap_or(path);
    match file.rfind('.') {
        Some(0) | None => None,
        Some(pos) => Some(&file[pos + 1..]),
    }
}
