//! XMP packet encoder
//!
//! This module serializes a [`PropertyStore`] into a complete XMP packet:
//! the `<?xpacket>` header, one `rdf:Description` holding every property
//! as an element, padding for in-place editing and the trailer.
//!
//! Output is deterministic: properties are written in key order and
//! namespace declarations in prefix order.

use crate::core::error::{XmpError, XmpResult};
use crate::core::escape::escape_text;
use crate::core::node::declare_in_start_tag;
use crate::core::schema::{ns, placeholder_uri};
use crate::core::store::PropertyStore;
use crate::types::key::PropertyKey;
use crate::types::value::{OpaqueXml, PropertyValue, ValueShape};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::{Cursor, Write};

/// Packet header with the standard packet id
const PACKET_HEADER: &str = "<?xpacket begin=\"\u{FEFF}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>";
const PADDING_LINE: usize = 100;

/// Options controlling the packet layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Bytes of whitespace written before the trailer
    pub padding: usize,
    /// Mark the packet read-only (`end="r"`)
    pub read_only: bool,
    /// Value of the `x:xmptk` attribute, omitted when `None`
    pub toolkit: Option<String>,
    /// Write only the `x:xmpmeta` element
    pub omit_packet_wrapper: bool,
    /// Spaces per nesting level, 0 writes everything on one line
    pub indent: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            padding: 2048,
            read_only: false,
            toolkit: Some(format!("xmpmodel {}", env!("CARGO_PKG_VERSION"))),
            omit_packet_wrapper: false,
            indent: 1,
        }
    }
}

impl EncodeOptions {
    /// Set the padding size
    pub fn padding(mut self, bytes: usize) -> Self {
        self.padding = bytes;
        self
    }

    /// Mark the packet read-only
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Set or clear the toolkit attribute
    pub fn toolkit(mut self, toolkit: Option<String>) -> Self {
        self.toolkit = toolkit;
        self
    }

    /// Leave out the `<?xpacket>` header, padding and trailer
    pub fn omit_packet_wrapper(mut self, omit: bool) -> Self {
        self.omit_packet_wrapper = omit;
        self
    }

    /// Set the indentation width
    pub fn indent(mut self, spaces: usize) -> Self {
        self.indent = spaces;
        self
    }
}

/// Encoder for XMP Packets
#[derive(Debug, Clone, Default)]
pub struct XmpEncoder {
    options: EncodeOptions,
}

impl XmpEncoder {
    /// Create an encoder with the default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an encoder with custom options
    pub fn with_options(options: EncodeOptions) -> Self {
        Self { options }
    }

    /// Options in use
    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// Encode a store into a new buffer
    pub fn encode(&self, store: &PropertyStore) -> XmpResult<Vec<u8>> {
        let mut out = Vec::new();
        self.encode_into(store, &mut out)?;
        Ok(out)
    }

    /// Append the encoded packet to `out`
    ///
    /// Bytes already in `out` (a caller's tag, for instance) are kept in
    /// front of the packet.
    pub fn encode_into(&self, store: &PropertyStore, out: &mut Vec<u8>) -> XmpResult<()> {
        log::debug!("Encoding {} properties", store.len());

        if !self.options.omit_packet_wrapper {
            out.extend_from_slice(PACKET_HEADER.as_bytes());
            out.push(b'\n');
        }

        out.extend_from_slice(&self.encode_meta(store)?);

        if !self.options.omit_packet_wrapper {
            out.push(b'\n');
            write_padding(out, self.options.padding);
            let end = if self.options.read_only { "r" } else { "w" };
            out.extend_from_slice(format!("<?xpacket end=\"{}\"?>", end).as_bytes());
        }
        Ok(())
    }

    /// Encode a store into a string
    pub fn encode_to_string(&self, store: &PropertyStore) -> XmpResult<String> {
        String::from_utf8(self.encode(store)?)
            .map_err(|e| XmpError::SerializationError(format!("UTF-8 encoding error: {}", e)))
    }

    /// Write the `x:xmpmeta` element
    fn encode_meta(&self, store: &PropertyStore) -> XmpResult<Vec<u8>> {
        let mut writer = if self.options.indent > 0 {
            Writer::new_with_indent(Cursor::new(Vec::new()), b' ', self.options.indent)
        } else {
            Writer::new(Cursor::new(Vec::new()))
        };

        let mut meta_start = BytesStart::new("x:xmpmeta");
        meta_start.push_attribute(("xmlns:x", ns::X));
        if let Some(toolkit) = &self.options.toolkit {
            meta_start.push_attribute(("x:xmptk", toolkit.as_str()));
        }
        writer.write_event(Event::Start(meta_start))?;

        let mut rdf_start = BytesStart::new("rdf:RDF");
        rdf_start.push_attribute(("xmlns:rdf", ns::RDF));
        writer.write_event(Event::Start(rdf_start))?;

        let declared = declared_namespaces(store);
        let mut desc_start = BytesStart::new("rdf:Description");
        let about = escape_text(store.about());
        desc_start.push_attribute(Attribute::from((&b"rdf:about"[..], about.as_bytes())));
        for (prefix, uri) in &declared {
            desc_start.push_attribute((format!("xmlns:{}", prefix).as_str(), uri.as_str()));
        }

        // If there are no properties, use Empty (self-closing) tag
        if store.is_empty() {
            writer.write_event(Event::Empty(desc_start))?;
        } else {
            writer.write_event(Event::Start(desc_start))?;
            for (key, value) in store.iter() {
                write_property(&mut writer, key, value, &declared)?;
            }
            writer.write_event(Event::End(BytesEnd::new("rdf:Description")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("rdf:RDF")))?;
        writer.write_event(Event::End(BytesEnd::new("x:xmpmeta")))?;
        Ok(writer.into_inner().into_inner())
    }
}

/// Namespaces declared on the description, by prefix
///
/// Covers every property prefix plus the bindings opaque values rely on.
/// An opaque binding that clashes with one already chosen is declared on
/// the opaque element itself instead.
fn declared_namespaces(store: &PropertyStore) -> BTreeMap<String, String> {
    let mut declared = BTreeMap::new();
    for key in store.keys() {
        if declared.contains_key(key.prefix()) {
            continue;
        }
        let uri = match store.namespace_uri(key.prefix()) {
            Some(uri) => uri.to_string(),
            None => {
                log::warn!("No namespace bound to prefix '{}'", key.prefix());
                placeholder_uri(key.prefix())
            }
        };
        declared.insert(key.prefix().to_string(), uri);
    }

    for (_, value) in store.iter() {
        let PropertyValue::Opaque(xml) = value else {
            continue;
        };
        for (prefix, uri) in xml.namespaces() {
            if prefix == ns::RDF_PREFIX {
                continue;
            }
            declared
                .entry(prefix.clone())
                .or_insert_with(|| uri.clone());
        }
    }
    declared
}

fn write_property(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    key: &PropertyKey,
    value: &PropertyValue,
    declared: &BTreeMap<String, String>,
) -> XmpResult<()> {
    let name = key.qualified_name();
    log::trace!("Writing {} as {}", name, value.shape());

    match value {
        PropertyValue::Scalar(text) => {
            write_text_element(writer, BytesStart::new(name.as_str()), text)?;
        }
        PropertyValue::OrderedList(items) | PropertyValue::UnorderedList(items) => {
            let container = if value.shape() == ValueShape::OrderedList {
                "rdf:Seq"
            } else {
                "rdf:Bag"
            };
            writer.write_event(Event::Start(BytesStart::new(name.as_str())))?;
            if items.is_empty() {
                writer.write_event(Event::Empty(BytesStart::new(container)))?;
            } else {
                writer.write_event(Event::Start(BytesStart::new(container)))?;
                for item in items {
                    write_text_element(writer, BytesStart::new("rdf:li"), item)?;
                }
                writer.write_event(Event::End(BytesEnd::new(container)))?;
            }
            writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
        }
        PropertyValue::LanguageAlternative(alt) => {
            writer.write_event(Event::Start(BytesStart::new(name.as_str())))?;
            if alt.is_empty() {
                writer.write_event(Event::Empty(BytesStart::new("rdf:Alt")))?;
            } else {
                writer.write_event(Event::Start(BytesStart::new("rdf:Alt")))?;
                for (lang, text) in alt.iter() {
                    let mut li = BytesStart::new("rdf:li");
                    li.push_attribute(("xml:lang", lang));
                    write_text_element(writer, li, text)?;
                }
                writer.write_event(Event::End(BytesEnd::new("rdf:Alt")))?;
            }
            writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
        }
        PropertyValue::Opaque(xml) => {
            writer.write_indent()?;
            let markup = with_local_declarations(xml, declared);
            writer.get_mut().write_all(markup.as_bytes())?;
        }
    }
    Ok(())
}

/// Write `<start>text</end>`, or an empty element for empty text
fn write_text_element(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    start: BytesStart<'_>,
    text: &str,
) -> XmpResult<()> {
    if text.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    let end = start.to_end().into_owned();
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Text(BytesText::from_escaped(escape_text(text))))?;
    writer.write_event(Event::End(end))?;
    Ok(())
}

/// Add the bindings the description does not provide to the markup's
/// outermost start tag
fn with_local_declarations<'a>(
    xml: &'a OpaqueXml,
    declared: &BTreeMap<String, String>,
) -> Cow<'a, str> {
    let missing: Vec<(&String, &String)> = xml
        .namespaces()
        .iter()
        .filter(|(prefix, uri)| {
            let in_scope = if prefix.as_str() == ns::RDF_PREFIX {
                Some(ns::RDF)
            } else {
                declared.get(prefix.as_str()).map(String::as_str)
            };
            in_scope != Some(uri.as_str())
        })
        .collect();
    if missing.is_empty() {
        return Cow::Borrowed(xml.markup());
    }
    Cow::Owned(declare_in_start_tag(
        xml.markup(),
        missing
            .into_iter()
            .map(|(prefix, uri)| (prefix.as_str(), uri.as_str())),
    ))
}

/// Append `bytes` of padding as lines of spaces
fn write_padding(out: &mut Vec<u8>, bytes: usize) {
    let mut remaining = bytes;
    while remaining > 0 {
        let line = remaining.min(PADDING_LINE);
        out.extend(std::iter::repeat(b' ').take(line - 1));
        out.push(b'\n');
        remaining -= line;
    }
}
