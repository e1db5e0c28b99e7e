//! Element tree for packet bodies
//!
//! The parser first tokenizes the packet body into this small tree and
//! then walks it according to the RDF rules of the XMP profile. Every
//! element remembers the byte range it occupies in the body so that
//! content the model does not interpret can be retained verbatim.

use crate::core::error::ParseError;
use crate::core::escape::{escape_text, resolve_reference};
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::ops::Range;

/// A child of an element
#[derive(Debug, Clone)]
pub(crate) enum XmlNode {
    /// Nested element
    Element(XmlElement),
    /// Character data with references resolved
    Text(String),
}

/// An element with its attributes and children
#[derive(Debug, Clone)]
pub(crate) struct XmlElement {
    /// Qualified name as written (`dc:title`)
    pub name: String,
    /// Attributes in document order, values unescaped
    pub attributes: Vec<(String, String)>,
    /// Child nodes in document order
    pub children: Vec<XmlNode>,
    /// Byte range of the whole element within the body
    pub span: Range<usize>,
}

impl XmlElement {
    fn open(start: &BytesStart<'_>, position: usize) -> Result<Self, ParseError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| ParseError::malformed(position, e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let raw_value = String::from_utf8_lossy(attr.value.as_ref());
            let value = unescape(&raw_value)
                .map_err(|e| ParseError::malformed(position, e.to_string()))?
                .to_string();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
            span: position..position,
        })
    }

    /// Prefix of the element name, empty if unprefixed
    pub fn prefix(&self) -> &str {
        split_name(&self.name).0
    }

    /// Local part of the element name
    pub fn local_name(&self) -> &str {
        split_name(&self.name).1
    }

    /// Check the name against a `prefix:local` pair
    pub fn is(&self, prefix: &str, local: &str) -> bool {
        self.prefix() == prefix && self.local_name() == local
    }

    /// Get an attribute value by qualified name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// `xmlns:prefix="uri"` declarations made on this element
    pub fn namespace_declarations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().filter_map(|(key, value)| {
            key.strip_prefix("xmlns:")
                .map(|prefix| (prefix, value.as_str()))
        })
    }

    /// Child elements, skipping text
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// Check whether any child is an element
    pub fn has_element_children(&self) -> bool {
        self.elements().next().is_some()
    }

    /// Concatenated character data of the direct children
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                XmlNode::Text(text) => Some(text.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    /// Check whether the direct character data is only whitespace
    pub fn has_only_whitespace_text(&self) -> bool {
        self.children.iter().all(|child| match child {
            XmlNode::Text(text) => text.trim().is_empty(),
            XmlNode::Element(_) => true,
        })
    }

    fn push_text(&mut self, text: &str) {
        if let Some(XmlNode::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(XmlNode::Text(text.to_string()));
        }
    }
}

/// Split `prefix:local`; unprefixed names get an empty prefix
pub(crate) fn split_name(name: &str) -> (&str, &str) {
    name.split_once(':').unwrap_or(("", name))
}

/// Add `xmlns:prefix="uri"` declarations to the outermost start tag of
/// a serialized element
pub(crate) fn declare_in_start_tag<'a, I>(markup: &str, bindings: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let name_end = markup
        .char_indices()
        .skip(1)
        .find(|(_, c)| c.is_ascii_whitespace() || *c == '/' || *c == '>')
        .map(|(i, _)| i)
        .unwrap_or(markup.len());

    let mut rewritten = String::with_capacity(markup.len() + 64);
    rewritten.push_str(&markup[..name_end]);
    for (prefix, uri) in bindings {
        rewritten.push_str(&format!(" xmlns:{}=\"{}\"", prefix, escape_text(uri)));
    }
    rewritten.push_str(&markup[name_end..]);
    rewritten
}

/// Tokenize `body` and return its first top-level element
///
/// Reading stops as soon as that element is closed, so trailing bytes
/// (padding, junk after a bare packet) are never tokenized. Nesting
/// deeper than `max_depth` is rejected.
pub(crate) fn parse_tree(body: &str, max_depth: usize) -> Result<XmlElement, ParseError> {
    let mut reader = Reader::from_str(body);
    let mut stack: Vec<XmlElement> = Vec::new();

    loop {
        let start = reader.buffer_position() as usize;
        let event = reader
            .read_event()
            .map_err(|e| ParseError::malformed(reader.error_position() as usize, e.to_string()))?;
        let end = reader.buffer_position() as usize;

        match event {
            Event::Start(e) => {
                if stack.len() >= max_depth {
                    return Err(ParseError::malformed(
                        start,
                        format!("elements nested deeper than {}", max_depth),
                    ));
                }
                stack.push(XmlElement::open(&e, start)?);
            }
            Event::Empty(e) => {
                let mut element = XmlElement::open(&e, start)?;
                element.span = start..end;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(XmlNode::Element(element)),
                    None => return Ok(element),
                }
            }
            Event::End(_) => {
                let Some(mut element) = stack.pop() else {
                    return Err(ParseError::malformed(start, "unexpected closing tag"));
                };
                element.span.end = end;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(XmlNode::Element(element)),
                    None => return Ok(element),
                }
            }
            Event::Text(e) => {
                // Decode XML entities (e.g., &quot; -> ")
                let raw_text = String::from_utf8_lossy(e.as_ref());
                let text = unescape(&raw_text)
                    .map_err(|err| ParseError::malformed(start, err.to_string()))?;
                if let Some(parent) = stack.last_mut() {
                    parent.push_text(&text);
                }
            }
            Event::CData(e) => {
                if let Some(parent) = stack.last_mut() {
                    parent.push_text(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(e) => {
                let name = String::from_utf8_lossy(e.as_ref());
                let resolved = resolve_reference(&name).ok_or_else(|| {
                    ParseError::malformed(start, format!("unknown reference '&{};'", name))
                })?;
                if let Some(parent) = stack.last_mut() {
                    parent.push_text(&resolved);
                }
            }
            Event::Eof => {
                return Err(match stack.last() {
                    Some(open) => ParseError::malformed(
                        start,
                        format!("element '{}' is never closed", open.name),
                    ),
                    None => ParseError::malformed(start, "no root element"),
                });
            }
            // Declarations, comments, processing instructions and doctypes
            // carry no metadata
            _ => {}
        }
    }
}
