//! XMP value types
//!
//! This module defines the shapes a property value can take in the
//! store.

use crate::types::lang::LangAlt;
use std::collections::BTreeMap;
use std::fmt;

/// Declared or observed shape of a property value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ValueShape {
    /// Single text value
    Scalar,
    /// `rdf:Seq`
    OrderedList,
    /// `rdf:Bag`
    UnorderedList,
    /// `rdf:Alt` keyed by `xml:lang`
    LanguageAlternative,
    /// Anything else (structures, qualified values), kept as markup
    Opaque,
}

impl ValueShape {
    /// Get the RDF container name for list shapes
    pub fn rdf_container(&self) -> Option<&'static str> {
        match self {
            ValueShape::OrderedList => Some("Seq"),
            ValueShape::UnorderedList => Some("Bag"),
            ValueShape::LanguageAlternative => Some("Alt"),
            ValueShape::Scalar | ValueShape::Opaque => None,
        }
    }
}

impl fmt::Display for ValueShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueShape::Scalar => "scalar",
            ValueShape::OrderedList => "ordered list",
            ValueShape::UnorderedList => "unordered list",
            ValueShape::LanguageAlternative => "language alternative",
            ValueShape::Opaque => "opaque markup",
        };
        f.write_str(name)
    }
}

/// Verbatim markup of a property element the model does not interpret
///
/// `markup` is the complete property element as it appeared in the
/// packet. `namespaces` holds the prefix bindings that markup relies on
/// and which must be declared around it when it is written back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OpaqueXml {
    markup: String,
    namespaces: BTreeMap<String, String>,
}

impl OpaqueXml {
    /// Wrap a complete property element
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            namespaces: BTreeMap::new(),
        }
    }

    /// Record a namespace binding the markup needs
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix.into(), uri.into());
        self
    }

    /// The property element markup
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Prefix bindings used inside the markup
    pub fn namespaces(&self) -> &BTreeMap<String, String> {
        &self.namespaces
    }
}

/// Value of one property
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "shape", content = "value", rename_all = "snake_case")
)]
pub enum PropertyValue {
    /// Single text value
    Scalar(String),
    /// Ordered sequence (`rdf:Seq`)
    OrderedList(Vec<String>),
    /// Unordered collection (`rdf:Bag`); stored order is kept
    UnorderedList(Vec<String>),
    /// Language-keyed texts (`rdf:Alt`)
    LanguageAlternative(LangAlt),
    /// Uninterpreted markup
    Opaque(OpaqueXml),
}

impl PropertyValue {
    /// Get the shape of this value
    pub fn shape(&self) -> ValueShape {
        match self {
            PropertyValue::Scalar(_) => ValueShape::Scalar,
            PropertyValue::OrderedList(_) => ValueShape::OrderedList,
            PropertyValue::UnorderedList(_) => ValueShape::UnorderedList,
            PropertyValue::LanguageAlternative(_) => ValueShape::LanguageAlternative,
            PropertyValue::Opaque(_) => ValueShape::Opaque,
        }
    }

    /// Get the text, if this is a scalar
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            PropertyValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Get the items, if this is an ordered or unordered list
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            PropertyValue::OrderedList(items) | PropertyValue::UnorderedList(items) => Some(items),
            _ => None,
        }
    }

    /// Get the language alternative, if this is one
    pub fn as_lang_alt(&self) -> Option<&LangAlt> {
        match self {
            PropertyValue::LanguageAlternative(alt) => Some(alt),
            _ => None,
        }
    }

    /// Get the markup, if this is opaque
    pub fn as_opaque(&self) -> Option<&OpaqueXml> {
        match self {
            PropertyValue::Opaque(xml) => Some(xml),
            _ => None,
        }
    }

    /// Number of logical items
    ///
    /// Scalars and opaque values count as one item; language alternatives
    /// count their entries.
    pub fn len(&self) -> usize {
        match self {
            PropertyValue::Scalar(_) | PropertyValue::Opaque(_) => 1,
            PropertyValue::OrderedList(items) | PropertyValue::UnorderedList(items) => items.len(),
            PropertyValue::LanguageAlternative(alt) => alt.len(),
        }
    }

    /// Check if a list or alternative holds no items
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten to the raw string sequence an editor consumes
    ///
    /// Lists yield their items, language alternatives yield
    /// `lang, text, lang, text, ...`, scalars yield their text and opaque
    /// values their markup.
    pub fn flatten(&self) -> Vec<&str> {
        match self {
            PropertyValue::Scalar(s) => vec![s.as_str()],
            PropertyValue::OrderedList(items) | PropertyValue::UnorderedList(items) => {
                items.iter().map(String::as_str).collect()
            }
            PropertyValue::LanguageAlternative(alt) => {
                alt.iter().flat_map(|(lang, text)| [lang, text]).collect()
            }
            PropertyValue::Opaque(xml) => vec![xml.markup()],
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let view = crate::core::store::ViewPolicy::default().render(self);
        f.write_str(&view)
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Scalar(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Scalar(s.to_string())
    }
}

impl From<LangAlt> for PropertyValue {
    fn from(alt: LangAlt) -> Self {
        PropertyValue::LanguageAlternative(alt)
    }
}

impl From<OpaqueXml> for PropertyValue {
    fn from(xml: OpaqueXml) -> Self {
        PropertyValue::Opaque(xml)
    }
}
