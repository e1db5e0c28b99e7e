//! Text escaping for packet serialization
//!
//! [`escape_text`] and [`unescape_text`] are inverses for every string
//! whose only C0 control characters are tab, line feed and carriage
//! return. XML cannot carry the others at all, not even as references.

use quick_xml::escape::unescape;
use std::borrow::Cow;

/// Escape text for use as element content or an attribute value
///
/// Besides the five XML special characters, carriage returns are written
/// as `&#xD;` so that parsers cannot normalize them away. Tabs and line
/// feeds pass through. Every other C0 control character is replaced by
/// U+FFFD.
pub fn escape_text(text: &str) -> Cow<'_, str> {
    if !text.chars().any(needs_escape) {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\r' => escaped.push_str("&#xD;"),
            c if is_illegal_control(c) => escaped.push('\u{FFFD}'),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// Resolve entity and character references
///
/// Returns `None` if the text contains an unknown or malformed reference.
pub fn unescape_text(text: &str) -> Option<Cow<'_, str>> {
    unescape(text).ok()
}

/// Resolve the body of one reference (`amp`, `#x41`, ...)
pub(crate) fn resolve_reference(name: &str) -> Option<String> {
    let reference = format!("&{};", name);
    unescape(&reference).ok().map(|s| s.into_owned())
}

fn needs_escape(c: char) -> bool {
    matches!(c, '&' | '<' | '>' | '"' | '\'' | '\r') || is_illegal_control(c)
}

/// C0 controls outside the XML 1.0 `Char` production
fn is_illegal_control(c: char) -> bool {
    c < '\u{20}' && !matches!(c, '\t' | '\n' | '\r')
}
