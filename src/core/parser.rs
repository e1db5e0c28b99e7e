//! XMP packet parser
//!
//! This module turns a serialized XMP packet into a [`PropertyStore`].
//! Parsing runs in three stages: the `<?xpacket>` framing is located on
//! the raw bytes, the body is tokenized into a bounded element tree, and
//! the tree is walked according to the RDF rules of the XMP profile.
//!
//! Everything schema-level (unknown namespaces, unexpected shapes,
//! duplicate entries) is reported as a [`ParseWarning`]; only framing and
//! tokenizing failures are fatal.

use crate::core::error::{ParseError, ParseWarning};
use crate::core::node::{declare_in_start_tag, parse_tree, split_name, XmlElement};
use crate::core::schema::{is_reserved_prefix, ns, placeholder_uri, SchemaRegistry};
use crate::core::store::PropertyStore;
use crate::types::key::{is_valid_prefix, PropertyKey};
use crate::types::lang::{is_valid_lang, LangAlt, X_DEFAULT};
use crate::types::value::{OpaqueXml, PropertyValue};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const PACKET_HEADER: &[u8] = b"<?xpacket begin";
const PACKET_TRAILER: &[u8] = b"<?xpacket end";
/// Start markers accepted when a packet has no wrapper
const BARE_MARKERS: [&[u8]; 3] = [b"<x:xmpmeta", b"<x:xapmeta", b"<rdf:RDF"];

/// Options controlling how tolerant the parser is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Require a complete `<?xpacket>` wrapper at the start of the input
    pub strict: bool,
    /// Maximum element nesting depth of the packet body
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            strict: false,
            max_depth: 64,
        }
    }
}

impl ParseOptions {
    /// Options for strict parsing
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    /// Options for lenient parsing (the default)
    ///
    /// Leading bytes before the packet are skipped, and a missing wrapper
    /// or trailer only produces a warning.
    pub fn lenient() -> Self {
        Self::default()
    }

    /// Set the maximum nesting depth
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Result of a successful parse
#[derive(Debug, Clone)]
pub struct Parsed {
    /// The parsed properties
    pub store: PropertyStore,
    /// Recoverable findings, in document order
    pub warnings: Vec<ParseWarning>,
}

impl Parsed {
    /// Check whether the packet parsed without any warning
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Parser for XMP Packets
#[derive(Debug, Clone)]
pub struct XmpParser {
    registry: Arc<SchemaRegistry>,
    options: ParseOptions,
}

impl XmpParser {
    /// Create a lenient parser backed by the built-in schemas
    pub fn new() -> Self {
        Self::with_registry(SchemaRegistry::builtin())
    }

    /// Create a parser backed by a custom registry
    pub fn with_registry(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            options: ParseOptions::default(),
        }
    }

    /// Replace the parse options
    pub fn options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Parse a packet from bytes
    pub fn parse(&self, data: &[u8]) -> Result<Parsed, ParseError> {
        let mut warnings = Vec::new();
        let (offset, body) = locate_body(data, self.options.strict, &mut warnings)?;
        let body = std::str::from_utf8(body).map_err(|e| {
            ParseError::malformed(offset + e.valid_up_to(), "invalid UTF-8 in packet body")
        })?;
        log::debug!("Tokenizing {} byte packet body at offset {}", body.len(), offset);

        let root = parse_tree(body, self.options.max_depth).map_err(|err| match err {
            ParseError::Malformed { position, message } => ParseError::Malformed {
                position: position + offset,
                message,
            },
            other => other,
        })?;

        let mut walker = Walker {
            body,
            registry: &self.registry,
            store: PropertyStore::with_registry(Arc::clone(&self.registry)),
            warnings,
            foreign_prefixes: BTreeMap::new(),
            undeclared: BTreeSet::new(),
        };
        walker.walk_root(&root)?;

        Ok(Parsed {
            store: walker.store,
            warnings: walker.warnings,
        })
    }

    /// Parse a packet from a string
    pub fn parse_str(&self, xml: &str) -> Result<Parsed, ParseError> {
        self.parse(xml.as_bytes())
    }

    /// Read a file and parse its content as a packet
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Parsed, ParseError> {
        let data = std::fs::read(path.as_ref())?;
        log::debug!("Read {} bytes from {}", data.len(), path.as_ref().display());
        self.parse(&data)
    }
}

impl Default for XmpParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Record a warning and log it
fn report(warnings: &mut Vec<ParseWarning>, warning: ParseWarning) {
    log::warn!("{}", warning);
    warnings.push(warning);
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}

/// Find the packet body, returning its offset in `data` and its bytes
fn locate_body<'a>(
    data: &'a [u8],
    strict: bool,
    warnings: &mut Vec<ParseWarning>,
) -> Result<(usize, &'a [u8]), ParseError> {
    let start = if data.starts_with(UTF8_BOM) {
        UTF8_BOM.len()
    } else {
        0
    };
    let input = &data[start..];

    let Some(header) = find(input, PACKET_HEADER) else {
        if strict {
            return Err(ParseError::Framing(
                "missing <?xpacket begin> header".to_string(),
            ));
        }
        let marker = BARE_MARKERS
            .iter()
            .filter_map(|marker| find(input, marker))
            .min()
            .ok_or_else(|| ParseError::Framing("no XMP packet found".to_string()))?;
        report(warnings, ParseWarning::MissingPacketWrapper);
        let leading = &input[..marker];
        if !is_blank(leading) && !leading.trim_ascii_start().starts_with(b"<?xml") {
            report(warnings, ParseWarning::SkippedLeadingBytes(marker));
        }
        return Ok((start + marker, &input[marker..]));
    };

    if !is_blank(&input[..header]) {
        if strict {
            return Err(ParseError::Framing(format!(
                "{} bytes precede the <?xpacket begin> header",
                header
            )));
        }
        report(warnings, ParseWarning::SkippedLeadingBytes(header));
    }

    let header_end = find(&input[header..], b"?>")
        .map(|end| header + end + 2)
        .ok_or_else(|| ParseError::Framing("unterminated <?xpacket begin> header".to_string()))?;

    let rest = &input[header_end..];
    let body = match find(rest, PACKET_TRAILER) {
        Some(trailer) => &rest[..trailer],
        None if strict => {
            return Err(ParseError::Framing(
                "missing <?xpacket end> trailer".to_string(),
            ));
        }
        None => {
            report(warnings, ParseWarning::MissingPacketTrailer);
            rest
        }
    };
    Ok((start + header_end, body))
}

/// Prefix to URI bindings in scope at some element
type Scope = BTreeMap<String, String>;

fn scoped(outer: &Scope, element: &XmlElement) -> Scope {
    let mut scope = outer.clone();
    for (prefix, uri) in element.namespace_declarations() {
        scope.insert(prefix.to_string(), uri.to_string());
    }
    scope
}

/// Collect prefixes used inside an element subtree without a declaration
/// on the element or one of its ancestors within the subtree
fn unbound_prefixes(
    element: &XmlElement,
    bound: &BTreeSet<String>,
    unbound: &mut BTreeSet<String>,
) {
    let mut bound = bound.clone();
    bound.extend(
        element
            .namespace_declarations()
            .map(|(prefix, _)| prefix.to_string()),
    );

    let names = std::iter::once(element.name.as_str()).chain(
        element
            .attributes
            .iter()
            .map(|(name, _)| name.as_str())
            .filter(|name| !is_namespace_attribute(name)),
    );
    for name in names {
        let (prefix, _) = split_name(name);
        if !prefix.is_empty() && prefix != ns::XML_PREFIX && !bound.contains(prefix) {
            unbound.insert(prefix.to_string());
        }
    }

    for child in element.elements() {
        unbound_prefixes(child, &bound, unbound);
    }
}

fn is_namespace_attribute(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:")
}

/// RDF walking state for one parse
struct Walker<'a> {
    body: &'a str,
    registry: &'a SchemaRegistry,
    store: PropertyStore,
    warnings: Vec<ParseWarning>,
    /// Foreign namespace URI to the prefix it is stored under
    foreign_prefixes: BTreeMap<String, String>,
    /// Undeclared prefixes already reported
    undeclared: BTreeSet<String>,
}

impl Walker<'_> {
    fn warn(&mut self, warning: ParseWarning) {
        report(&mut self.warnings, warning);
    }

    fn walk_root(&mut self, root: &XmlElement) -> Result<(), ParseError> {
        let scope = scoped(&Scope::new(), root);
        let meta_uri = scope.get(root.prefix()).map(String::as_str);
        let is_meta = match meta_uri {
            Some(uri) => uri == ns::X,
            None => root.prefix() == ns::X_PREFIX,
        };
        match root.local_name() {
            "xmpmeta" | "xapmeta" if is_meta => {
                let mut rdf = None;
                for child in root.elements() {
                    if rdf.is_none() && child.is(ns::RDF_PREFIX, "RDF") {
                        rdf = Some(child);
                    } else {
                        self.warn(ParseWarning::IgnoredElement(child.name.clone()));
                    }
                }
                match rdf {
                    Some(rdf) => self.walk_rdf(rdf, &scope),
                    None => log::debug!("{} holds no rdf:RDF element", root.name),
                }
                Ok(())
            }
            "RDF" if root.prefix() == ns::RDF_PREFIX => {
                self.walk_rdf(root, &Scope::new());
                Ok(())
            }
            _ => Err(ParseError::Framing(format!(
                "unexpected root element '{}'",
                root.name
            ))),
        }
    }

    fn walk_rdf(&mut self, rdf: &XmlElement, outer: &Scope) {
        let scope = scoped(outer, rdf);
        for child in rdf.elements() {
            if child.is(ns::RDF_PREFIX, "Description") {
                self.walk_description(child, &scope);
            } else {
                self.warn(ParseWarning::IgnoredElement(child.name.clone()));
            }
        }
        log::debug!("Parsed {} properties", self.store.len());
    }

    fn walk_description(&mut self, description: &XmlElement, outer: &Scope) {
        let scope = scoped(outer, description);

        if let Some(about) = description.attribute("rdf:about") {
            if self.store.about().is_empty() && !about.is_empty() {
                self.store.set_about(about);
            }
        }

        for (name, value) in &description.attributes {
            if is_namespace_attribute(name) {
                continue;
            }
            let (prefix, local) = split_name(name);
            if prefix.is_empty() || prefix == ns::RDF_PREFIX || prefix == ns::XML_PREFIX {
                continue;
            }
            if let Some(key) = self.resolve_key(prefix, local, name, &scope) {
                self.store_property(key, PropertyValue::Scalar(value.clone()));
            }
        }

        for element in description.elements() {
            let inner = scoped(&scope, element);
            let (prefix, local) = split_name(&element.name);
            if prefix.is_empty() {
                self.warn(ParseWarning::IgnoredElement(element.name.clone()));
                continue;
            }
            if let Some(key) = self.resolve_key(prefix, local, &element.name, &inner) {
                let value = self.classify(&key, element, &scope);
                self.store_property(key, value);
            }
        }
    }

    /// Map a prefixed name in the packet to a store key
    fn resolve_key(
        &mut self,
        prefix: &str,
        local: &str,
        qualified: &str,
        scope: &Scope,
    ) -> Option<PropertyKey> {
        let stored_prefix = match scope.get(prefix) {
            Some(uri) => match self.registry.prefix_for(uri) {
                Some(known) => known.to_string(),
                None => self.foreign_prefix(prefix, uri),
            },
            None => {
                if self.undeclared.insert(prefix.to_string()) {
                    self.warn(ParseWarning::UndeclaredPrefix(prefix.to_string()));
                }
                if self.registry.has_prefix(prefix) {
                    prefix.to_string()
                } else {
                    self.foreign_prefix(prefix, &placeholder_uri(prefix))
                }
            }
        };

        match PropertyKey::new(stored_prefix, local) {
            Ok(key) => Some(key),
            Err(_) => {
                self.warn(ParseWarning::IgnoredElement(qualified.to_string()));
                None
            }
        }
    }

    /// Prefix a foreign namespace is stored under, binding it on first use
    fn foreign_prefix(&mut self, prefix: &str, uri: &str) -> String {
        if let Some(existing) = self.foreign_prefixes.get(uri) {
            return existing.clone();
        }

        let taken = |walker: &Self, candidate: &str| {
            !is_valid_prefix(candidate)
                || walker.registry.has_prefix(candidate)
                || is_reserved_prefix(candidate)
                || walker.store.namespace_uri(candidate).is_some()
        };
        let mut stored = prefix.to_string();
        if taken(self, &stored) {
            let mut n = 1;
            while taken(self, &format!("ns{}", n)) {
                n += 1;
            }
            stored = format!("ns{}", n);
            self.warn(ParseWarning::RenamedPrefix {
                original: prefix.to_string(),
                renamed: stored.clone(),
                uri: uri.to_string(),
            });
        }

        self.store.bind_foreign(&stored, uri);
        self.foreign_prefixes
            .insert(uri.to_string(), stored.clone());
        self.warn(ParseWarning::UnknownNamespace {
            prefix: stored.clone(),
            uri: uri.to_string(),
        });
        stored
    }

    fn store_property(&mut self, key: PropertyKey, value: PropertyValue) {
        if self.registry.has_prefix(key.prefix()) {
            match self.registry.declared_shape(key.prefix(), key.name()) {
                Some(expected) if expected != value.shape() => {
                    self.warn(ParseWarning::ShapeMismatch {
                        prefix: key.prefix().to_string(),
                        name: key.name().to_string(),
                        expected: expected.to_string(),
                        found: value.shape().to_string(),
                    });
                }
                Some(_) => {}
                None if !self.registry.is_known_property(key.prefix(), key.name()) => {
                    self.warn(ParseWarning::UnknownProperty {
                        prefix: key.prefix().to_string(),
                        name: key.name().to_string(),
                    });
                }
                None => {}
            }
        }

        log::trace!("{} parsed as {}", key, value.shape());
        let duplicate = ParseWarning::DuplicateProperty {
            prefix: key.prefix().to_string(),
            name: key.name().to_string(),
        };
        if self.store.insert_parsed(key, value).is_some() {
            self.warn(duplicate);
        }
    }

    /// Decide the value shape of a property element
    fn classify(
        &mut self,
        key: &PropertyKey,
        element: &XmlElement,
        outer: &Scope,
    ) -> PropertyValue {
        let mut resource = None;
        for (name, value) in &element.attributes {
            if is_namespace_attribute(name) {
                continue;
            }
            if name == "rdf:resource" {
                resource = Some(value);
            } else {
                // Qualifiers and rdf:parseType need the full markup
                return self.opaque(key, element, outer);
            }
        }

        if let Some(resource) = resource {
            if !element.has_element_children() && element.has_only_whitespace_text() {
                return PropertyValue::Scalar(resource.clone());
            }
            return self.opaque(key, element, outer);
        }

        if !element.has_element_children() {
            return PropertyValue::Scalar(element.text());
        }

        let mut children = element.elements();
        let container = match (children.next(), children.next()) {
            (Some(container), None) if element.has_only_whitespace_text() => container,
            _ => return self.opaque(key, element, outer),
        };
        let plain_container = container.prefix() == ns::RDF_PREFIX
            && container.has_only_whitespace_text()
            && container
                .attributes
                .iter()
                .all(|(name, _)| is_namespace_attribute(name));
        if !plain_container {
            return self.opaque(key, element, outer);
        }

        let value = match container.local_name() {
            "Seq" => list_items(container).map(PropertyValue::OrderedList),
            "Bag" => list_items(container).map(PropertyValue::UnorderedList),
            "Alt" => self
                .alternative(key, container)
                .map(PropertyValue::LanguageAlternative),
            _ => None,
        };
        value.unwrap_or_else(|| self.opaque(key, element, outer))
    }

    /// Read an `rdf:Alt` as a language alternative
    ///
    /// Returns `None` for alternatives that are not keyed by language.
    fn alternative(&mut self, key: &PropertyKey, container: &XmlElement) -> Option<LangAlt> {
        let mut entries: Vec<(String, String)> = Vec::new();
        let mut untagged = 0;

        for item in container.elements() {
            if !item.is(ns::RDF_PREFIX, "li") || item.has_element_children() {
                return None;
            }
            let mut lang = None;
            for (name, value) in &item.attributes {
                match name.as_str() {
                    "xml:lang" => lang = Some(value.as_str()),
                    name if is_namespace_attribute(name) => {}
                    _ => return None,
                }
            }
            let lang = match lang {
                Some(lang) if is_valid_lang(lang) => lang,
                Some(_) => return None,
                None => {
                    untagged += 1;
                    X_DEFAULT
                }
            };
            if untagged > 1 {
                return None;
            }

            if entries.iter().any(|(l, _)| l.eq_ignore_ascii_case(lang)) {
                self.warn(ParseWarning::DuplicateLanguage {
                    prefix: key.prefix().to_string(),
                    name: key.name().to_string(),
                    lang: lang.to_string(),
                });
                continue;
            }
            entries.push((lang.to_string(), item.text()));
        }

        let has_default = entries
            .iter()
            .any(|(lang, _)| lang.eq_ignore_ascii_case(X_DEFAULT));
        if !has_default {
            if let Some((_, first)) = entries.first() {
                let first = first.clone();
                self.warn(ParseWarning::MissingDefaultLanguage {
                    prefix: key.prefix().to_string(),
                    name: key.name().to_string(),
                });
                entries.insert(0, (X_DEFAULT.to_string(), first));
            }
        }
        Some(LangAlt::from_entries_unchecked(entries))
    }

    /// Keep the element verbatim
    ///
    /// Bindings the markup inherits from the packet are declared on its
    /// start tag, so the stored markup is self-contained. Only `rdf`,
    /// recorded on the value, and the key's own prefix bound to the
    /// key's URI stay implicit.
    fn opaque(&self, key: &PropertyKey, element: &XmlElement, outer: &Scope) -> PropertyValue {
        let mut unbound = BTreeSet::new();
        unbound_prefixes(element, &BTreeSet::new(), &mut unbound);

        let mut inherited: Vec<(String, String)> = Vec::new();
        let mut uses_rdf = false;
        for prefix in unbound {
            let uri = match outer.get(&prefix) {
                Some(uri) => uri.clone(),
                None if prefix == ns::RDF_PREFIX => ns::RDF.to_string(),
                None => match self.registry.uri(&prefix) {
                    Some(uri) => uri.to_string(),
                    None => placeholder_uri(&prefix),
                },
            };
            if prefix == ns::RDF_PREFIX && uri == ns::RDF {
                uses_rdf = true;
            } else if prefix != key.prefix()
                || self.store.namespace_uri(&prefix) != Some(uri.as_str())
            {
                inherited.push((prefix, uri));
            }
        }

        let markup = &self.body[element.span.clone()];
        let mut xml = if inherited.is_empty() {
            OpaqueXml::new(markup)
        } else {
            OpaqueXml::new(declare_in_start_tag(
                markup,
                inherited
                    .iter()
                    .map(|(prefix, uri)| (prefix.as_str(), uri.as_str())),
            ))
        };
        if uses_rdf {
            xml = xml.with_namespace(ns::RDF_PREFIX, ns::RDF);
        }
        PropertyValue::Opaque(xml)
    }
}

/// Read the items of an `rdf:Seq` or `rdf:Bag`
///
/// Returns `None` when an item is anything other than a plain `rdf:li`.
fn list_items(container: &XmlElement) -> Option<Vec<String>> {
    container
        .elements()
        .map(|item| {
            let plain = item.is(ns::RDF_PREFIX, "li")
                && !item.has_element_children()
                && item
                    .attributes
                    .iter()
                    .all(|(name, _)| is_namespace_attribute(name));
            plain.then(|| item.text())
        })
        .collect()
}
