//! XMP property store
//!
//! This module provides [`PropertyStore`], the in-memory model of one
//! packet: a map from `(prefix, name)` keys to typed values, plus the
//! namespace bindings of foreign prefixes and the packet's subject URI.

use crate::core::encoder::XmpEncoder;
use crate::core::error::{ParseError, ValueError, XmpResult};
use crate::core::parser::{Parsed, XmpParser};
use crate::core::schema::{is_reserved_prefix, SchemaRegistry};
use crate::core::xpath::{PathStep, XmpPath};
use crate::types::key::{is_valid_prefix, PropertyKey};
use crate::types::lang::{LangAlt, X_DEFAULT};
use crate::types::value::{PropertyValue, ValueShape};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

mod view;

pub use view::{Numbering, ViewPolicy};

/// Main structure for working with XMP properties
///
/// The store exclusively owns its values. It performs no locking: one
/// store belongs to one editing session at a time.
#[derive(Clone)]
pub struct PropertyStore {
    registry: Arc<SchemaRegistry>,
    properties: BTreeMap<PropertyKey, PropertyValue>,
    /// Bindings for prefixes the registry does not know
    namespaces: BTreeMap<String, String>,
    /// Subject of the `rdf:Description` (typically empty)
    about: String,
    view_policy: ViewPolicy,
}

impl PropertyStore {
    /// Create an empty store backed by the built-in schemas
    pub fn new() -> Self {
        Self::with_registry(SchemaRegistry::builtin())
    }

    /// Create an empty store backed by a custom registry
    pub fn with_registry(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            properties: BTreeMap::new(),
            namespaces: BTreeMap::new(),
            about: String::new(),
            view_policy: ViewPolicy::default(),
        }
    }

    /// Parse a packet with the default (lenient) options
    ///
    /// See [`XmpParser`] for strict parsing and custom registries.
    pub fn parse(data: &[u8]) -> Result<Parsed, ParseError> {
        XmpParser::new().parse(data)
    }

    /// Serialize to a packet with the default encoder options
    pub fn encode(&self) -> XmpResult<Vec<u8>> {
        XmpEncoder::new().encode(self)
    }

    /// Schema registry this store consults
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Get the scalar view of a property
    ///
    /// Returns `None` if the property is not present.
    pub fn get_scalar_view(&self, prefix: &str, name: &str) -> Option<String> {
        self.get_raw_value(prefix, name)
            .map(|value| self.view_policy.render(value))
    }

    /// Get the typed value of a property
    pub fn get_raw_value(&self, prefix: &str, name: &str) -> Option<&PropertyValue> {
        let key = PropertyKey::new(prefix, name).ok()?;
        self.properties.get(&key)
    }

    /// Get a value by key
    pub fn get(&self, key: &PropertyKey) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Set a property to a scalar
    ///
    /// Any previous value is replaced regardless of its shape: editing
    /// through the scalar interface simplifies the property to one text.
    pub fn set_scalar(
        &mut self,
        prefix: &str,
        name: &str,
        text: impl Into<String>,
    ) -> Result<(), ValueError> {
        let key = PropertyKey::new(prefix, name)?;
        log::trace!("set {} to scalar", key);
        self.properties.insert(key, PropertyValue::Scalar(text.into()));
        Ok(())
    }

    /// Set a property, keeping the value's shape
    ///
    /// # Errors
    ///
    /// Rejects language alternatives that break the `x-default` invariant
    /// or repeat a language. The store is unchanged on error.
    pub fn set_raw(&mut self, key: PropertyKey, value: PropertyValue) -> Result<(), ValueError> {
        if let PropertyValue::LanguageAlternative(alt) = &value {
            LangAlt::from_entries(alt.entries().iter().cloned())?;
        }
        log::trace!("set {} to {}", key, value.shape());
        self.properties.insert(key, value);
        Ok(())
    }

    /// Remove a property, returning its value if it was present
    pub fn remove(&mut self, key: &PropertyKey) -> Option<PropertyValue> {
        self.properties.remove(key)
    }

    /// Remove a property by prefix and name
    pub fn remove_property(&mut self, prefix: &str, name: &str) -> Option<PropertyValue> {
        let key = PropertyKey::new(prefix, name).ok()?;
        self.remove(&key)
    }

    /// Check if a property exists
    pub fn contains(&self, prefix: &str, name: &str) -> bool {
        self.get_raw_value(prefix, name).is_some()
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Check if the store holds no properties
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Iterate over properties in key order
    pub fn iter(&self) -> impl Iterator<Item = (&PropertyKey, &PropertyValue)> {
        self.properties.iter()
    }

    /// Iterate over keys in order
    pub fn keys(&self) -> impl Iterator<Item = &PropertyKey> {
        self.properties.keys()
    }

    /// Get a localized text
    ///
    /// Follows XMP language matching: an exact match for `lang`, then an
    /// entry sharing its primary subtag, then `x-default`, then the first
    /// entry. Returns `(actual_lang, text)`.
    pub fn get_localized(&self, prefix: &str, name: &str, lang: &str) -> Option<(&str, &str)> {
        let alt = self.get_raw_value(prefix, name)?.as_lang_alt()?;
        let generic = lang.split('-').next().unwrap_or(lang);
        let generic = if lang.eq_ignore_ascii_case(X_DEFAULT) {
            ""
        } else {
            generic
        };
        alt.select(generic, lang)
    }

    /// Set a localized text
    ///
    /// A property that is not a language alternative yet is converted; a
    /// former scalar text is kept as the `x-default` entry.
    pub fn set_localized(
        &mut self,
        prefix: &str,
        name: &str,
        lang: &str,
        text: impl Into<String>,
    ) -> Result<(), ValueError> {
        let key = PropertyKey::new(prefix, name)?;
        let mut alt = match self.properties.get(&key) {
            Some(PropertyValue::LanguageAlternative(alt)) => alt.clone(),
            Some(PropertyValue::Scalar(old)) if !lang.eq_ignore_ascii_case(X_DEFAULT) => {
                LangAlt::with_default(old.clone())
            }
            _ => LangAlt::new(),
        };
        alt.set(lang, text)?;
        self.properties
            .insert(key, PropertyValue::LanguageAlternative(alt));
        Ok(())
    }

    /// Append an item to a list property
    ///
    /// A missing property is created with the list shape its schema
    /// declares, or as an ordered list if the schema declares none.
    pub fn append_item(
        &mut self,
        prefix: &str,
        name: &str,
        text: impl Into<String>,
    ) -> Result<(), ValueError> {
        let key = PropertyKey::new(prefix, name)?;
        match self.properties.get_mut(&key) {
            Some(PropertyValue::OrderedList(items)) | Some(PropertyValue::UnorderedList(items)) => {
                items.push(text.into());
            }
            Some(other) => {
                return Err(ValueError::ShapeMismatch {
                    key: key.to_string(),
                    expected: "list".to_string(),
                    found: other.shape().to_string(),
                });
            }
            None => {
                let items = vec![text.into()];
                let value = match self.registry.declared_shape(prefix, name) {
                    Some(ValueShape::UnorderedList) => PropertyValue::UnorderedList(items),
                    _ => PropertyValue::OrderedList(items),
                };
                self.properties.insert(key, value);
            }
        }
        Ok(())
    }

    /// Resolve a path expression to a single text
    ///
    /// A bare property path yields a scalar's text. `[N]` and `[last()]`
    /// select list items, `[?xml:lang="..."]` selects one language entry
    /// exactly (no fallback).
    pub fn get_path(&self, path: &str) -> Result<Option<&str>, ValueError> {
        let path = XmpPath::parse(path)?;
        let Some(value) = self.properties.get(&path.key) else {
            return Ok(None);
        };
        let text = match (&path.step, value) {
            (None, PropertyValue::Scalar(text)) => Some(text.as_str()),
            (Some(PathStep::Index(index)), value) => value
                .as_list()
                .and_then(|items| items.get(index - 1))
                .map(String::as_str),
            (Some(PathStep::Last), value) => value
                .as_list()
                .and_then(|items| items.last())
                .map(String::as_str),
            (Some(PathStep::Lang(lang)), PropertyValue::LanguageAlternative(alt)) => alt.get(lang),
            _ => None,
        };
        Ok(text)
    }

    /// Shape the schema declares for a property
    pub fn declared_shape(&self, prefix: &str, name: &str) -> Option<ValueShape> {
        self.registry.declared_shape(prefix, name)
    }

    /// Check whether a key lies outside every known schema
    pub fn is_foreign(&self, key: &PropertyKey) -> bool {
        !self.registry.has_prefix(key.prefix())
    }

    /// Bind a foreign prefix to a namespace URI
    ///
    /// Binding a known prefix to its own URI is a no-op.
    ///
    /// # Errors
    ///
    /// Fails if the prefix is invalid or reserved, if it is already bound
    /// to another URI, or if the URI belongs to a known schema under a
    /// different prefix.
    pub fn register_namespace(&mut self, prefix: &str, uri: &str) -> Result<(), ValueError> {
        let conflict = || ValueError::NamespaceConflict {
            prefix: prefix.to_string(),
            uri: uri.to_string(),
        };
        if !is_valid_prefix(prefix) || uri.is_empty() || is_reserved_prefix(prefix) {
            return Err(conflict());
        }
        match self.namespace_uri(prefix) {
            Some(existing) if existing == uri => return Ok(()),
            Some(_) => return Err(conflict()),
            None => {}
        }
        if self.registry.prefix_for(uri).is_some() {
            return Err(conflict());
        }
        self.namespaces.insert(prefix.to_string(), uri.to_string());
        Ok(())
    }

    /// URI bound to a prefix, from the registry or the foreign bindings
    pub fn namespace_uri(&self, prefix: &str) -> Option<&str> {
        self.registry
            .uri(prefix)
            .or_else(|| self.namespaces.get(prefix).map(String::as_str))
    }

    /// Foreign prefix for a namespace URI, if one is bound
    pub fn foreign_prefix(&self, uri: &str) -> Option<&str> {
        self.namespaces
            .iter()
            .find(|(_, u)| u.as_str() == uri)
            .map(|(p, _)| p.as_str())
    }

    /// Foreign namespace bindings in prefix order
    pub fn namespaces(&self) -> impl Iterator<Item = (&str, &str)> {
        self.namespaces.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    /// Subject URI of the description (`rdf:about`)
    pub fn about(&self) -> &str {
        &self.about
    }

    /// Set the subject URI of the description
    pub fn set_about(&mut self, about: impl Into<String>) {
        self.about = about.into();
    }

    /// Presentation policy used by [`PropertyStore::get_scalar_view`]
    pub fn view_policy(&self) -> &ViewPolicy {
        &self.view_policy
    }

    /// Change the presentation policy for list views
    pub fn set_view_policy(&mut self, policy: ViewPolicy) {
        self.view_policy = policy;
    }

    /// Insert a parsed value, returning the one it replaced
    pub(crate) fn insert_parsed(
        &mut self,
        key: PropertyKey,
        value: PropertyValue,
    ) -> Option<PropertyValue> {
        self.properties.insert(key, value)
    }

    /// Record a foreign binding chosen by the parser
    pub(crate) fn bind_foreign(&mut self, prefix: &str, uri: &str) {
        self.namespaces.insert(prefix.to_string(), uri.to_string());
    }

    /// Export all properties as pretty-printed JSON keyed by `prefix:name`
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> XmpResult<String> {
        use crate::core::error::XmpError;

        let map: BTreeMap<String, &PropertyValue> = self
            .properties
            .iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();
        serde_json::to_string_pretty(&map)
            .map_err(|e| XmpError::SerializationError(format!("JSON encoding error: {}", e)))
    }
}

impl Default for PropertyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for PropertyStore {
    /// Stores are equal when they hold the same properties, bindings and
    /// subject; registries and view policies are not compared.
    fn eq(&self, other: &Self) -> bool {
        self.properties == other.properties
            && self.namespaces == other.namespaces
            && self.about == other.about
    }
}

impl fmt::Debug for PropertyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyStore")
            .field("about", &self.about)
            .field("namespaces", &self.namespaces)
            .field("properties", &self.properties)
            .finish()
    }
}

impl FromStr for PropertyStore {
    type Err = ParseError;

    /// Parse leniently; warnings are logged and dropped
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.as_bytes()).map(|parsed| parsed.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_store_new() {
        let store = PropertyStore::new();
        assert!(store.is_empty());
        assert_eq!(store.about(), "");
    }

    #[test]
    fn test_set_scalar_and_views() {
        let mut store = PropertyStore::new();
        store.set_scalar("xmp", "CreatorTool", "TestApp").unwrap();

        assert_eq!(
            store.get_scalar_view("xmp", "CreatorTool").as_deref(),
            Some("TestApp")
        );
        assert_eq!(
            store.get_raw_value("xmp", "CreatorTool"),
            Some(&PropertyValue::Scalar("TestApp".to_string()))
        );
    }

    #[test]
    fn test_missing_property_is_absent() {
        let store = PropertyStore::new();
        assert_eq!(store.get_scalar_view("dc", "title"), None);
        assert_eq!(store.get_raw_value("dc", "title"), None);
        assert_eq!(store.get_scalar_view("", ""), None);
    }

    #[test]
    fn test_set_scalar_replaces_shape() {
        let mut store = PropertyStore::new();
        store.set_localized("dc", "title", "ja", "こ").unwrap();
        assert_eq!(
            store.get_raw_value("dc", "title").map(|v| v.shape()),
            Some(ValueShape::LanguageAlternative)
        );

        store.set_scalar("dc", "title", "test").unwrap();
        assert_eq!(
            store.get_raw_value("dc", "title"),
            Some(&PropertyValue::Scalar("test".to_string()))
        );
    }

    #[test]
    fn test_set_scalar_invalid_key_leaves_store_unchanged() {
        let mut store = PropertyStore::new();
        store.set_scalar("dc", "format", "image/png").unwrap();
        let before = store.clone();

        let err = store.set_scalar("dc", "", "x").unwrap_err();
        assert!(matches!(err, ValueError::InvalidKey { .. }));
        assert!(store.set_scalar("", "format", "x").is_err());
        assert_eq!(store, before);
    }

    #[test]
    fn test_set_raw_validates_lang_alt() {
        let mut store = PropertyStore::new();
        let key = PropertyKey::new("dc", "title").unwrap();
        let alt = LangAlt::from_entries_unchecked(vec![("ja".to_string(), "こ".to_string())]);

        let err = store
            .set_raw(key.clone(), PropertyValue::LanguageAlternative(alt))
            .unwrap_err();
        assert_eq!(err, ValueError::MissingDefaultLanguage);
        assert!(store.get(&key).is_none());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut store = PropertyStore::new();
        let key = PropertyKey::new("dc", "rights").unwrap();
        assert_eq!(store.remove(&key), None);

        store.set_scalar("dc", "rights", "CC-BY").unwrap();
        store.set_scalar("dc", "source", "scan").unwrap();
        assert!(store.remove(&key).is_some());
        assert!(!store.contains("dc", "rights"));
        assert!(store.contains("dc", "source"));
    }

    #[test]
    fn test_localized_text() {
        let mut store = PropertyStore::new();
        store.set_localized("dc", "title", "x-default", "Default Title").unwrap();
        store.set_localized("dc", "title", "en-US", "English Title").unwrap();

        assert_eq!(
            store.get_localized("dc", "title", "en-US"),
            Some(("en-US", "English Title"))
        );
        assert_eq!(
            store.get_localized("dc", "title", "en-GB"),
            Some(("en-US", "English Title"))
        );
        assert_eq!(
            store.get_localized("dc", "title", "fr-FR"),
            Some(("x-default", "Default Title"))
        );
    }

    #[test]
    fn test_set_localized_converts_scalar() {
        let mut store = PropertyStore::new();
        store.set_scalar("dc", "description", "A cat").unwrap();
        store.set_localized("dc", "description", "de", "Eine Katze").unwrap();

        let flat = store
            .get_raw_value("dc", "description")
            .map(|v| v.flatten())
            .unwrap();
        assert_eq!(flat, ["x-default", "A cat", "de", "Eine Katze"]);
    }

    #[test]
    fn test_append_item_uses_declared_shape() {
        let mut store = PropertyStore::new();
        store.append_item("dc", "subject", "purple").unwrap();
        store.append_item("dc", "subject", "square").unwrap();
        store.append_item("dc", "creator", "Wilber").unwrap();

        assert_eq!(
            store.get_raw_value("dc", "subject"),
            Some(&PropertyValue::UnorderedList(vec![
                "purple".to_string(),
                "square".to_string()
            ]))
        );
        assert_eq!(
            store.get_raw_value("dc", "creator").map(|v| v.shape()),
            Some(ValueShape::OrderedList)
        );

        store.set_scalar("dc", "format", "image/png").unwrap();
        assert!(matches!(
            store.append_item("dc", "format", "x"),
            Err(ValueError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_get_path() {
        let mut store = PropertyStore::new();
        store.append_item("dc", "creator", "Wilber").unwrap();
        store.append_item("dc", "creator", "Wilma").unwrap();
        store.set_localized("dc", "title", "ja", "こ").unwrap();
        store.set_scalar("xmp", "Rating", "5").unwrap();

        assert_eq!(store.get_path("dc:creator[2]").unwrap(), Some("Wilma"));
        assert_eq!(store.get_path("dc:creator[last()]").unwrap(), Some("Wilma"));
        assert_eq!(store.get_path("dc:creator[3]").unwrap(), None);
        assert_eq!(store.get_path("dc:title[?xml:lang=\"ja\"]").unwrap(), Some("こ"));
        assert_eq!(store.get_path("dc:title[?xml:lang=\"fr\"]").unwrap(), None);
        assert_eq!(store.get_path("xmp:Rating").unwrap(), Some("5"));
        assert_eq!(store.get_path("dc:creator").unwrap(), None);
        assert!(store.get_path("creator[1]").is_err());
    }

    #[test]
    fn test_register_namespace() {
        let mut store = PropertyStore::new();
        store.register_namespace("ex", "http://example.com/ns/").unwrap();
        assert_eq!(store.namespace_uri("ex"), Some("http://example.com/ns/"));
        assert_eq!(store.foreign_prefix("http://example.com/ns/"), Some("ex"));

        // Same binding again is fine, a different one is not
        assert!(store.register_namespace("ex", "http://example.com/ns/").is_ok());
        assert!(store.register_namespace("ex", "http://example.com/other/").is_err());
        // Known prefixes and URIs cannot be rebound
        assert!(store.register_namespace("dc", "http://example.com/dc/").is_err());
        assert!(store
            .register_namespace("dcx", "http://purl.org/dc/elements/1.1/")
            .is_err());
        assert!(store.register_namespace("rdf", "http://example.com/").is_err());
    }

    #[test]
    fn test_is_foreign() {
        let store = PropertyStore::new();
        assert!(!store.is_foreign(&PropertyKey::new("dc", "title").unwrap()));
        assert!(store.is_foreign(&PropertyKey::new("ex", "thing").unwrap()));
    }

    #[test]
    fn test_view_policy_is_configurable() {
        let mut store = PropertyStore::new();
        store.append_item("dc", "creator", "Wilber").unwrap();
        store.append_item("dc", "creator", "Wilma").unwrap();
        assert_eq!(
            store.get_scalar_view("dc", "creator").as_deref(),
            Some("1) Wilber, 2) Wilma")
        );

        store.set_view_policy(ViewPolicy::plain(" / "));
        assert_eq!(
            store.get_scalar_view("dc", "creator").as_deref(),
            Some("Wilber / Wilma")
        );
    }
}
