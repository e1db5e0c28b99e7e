//! Property keys
//!
//! A property is addressed by its namespace prefix and local name. Both
//! halves must be XML NCNames so that the encoder can always write them
//! as a qualified element name.

use crate::core::error::ValueError;
use std::fmt;
use std::str::FromStr;

/// Key of one property within a store: `(prefix, name)`
///
/// Keys order by prefix first and then by name, which is also the order
/// in which the encoder emits properties.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyKey {
    prefix: String,
    name: String,
}

impl PropertyKey {
    /// Create a key, validating both halves
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidKey`] if either part is empty or not a
    /// valid XML name without a colon, or if the prefix is one XML keeps
    /// for itself (`xmlns`, `xml-stylesheet`, ...).
    pub fn new(prefix: impl Into<String>, name: impl Into<String>) -> Result<Self, ValueError> {
        let prefix = prefix.into();
        let name = name.into();
        if !is_valid_prefix(&prefix) || !is_ncname(&name) {
            return Err(ValueError::InvalidKey { prefix, name });
        }
        Ok(Self { prefix, name })
    }

    /// Parse a qualified name such as `dc:title`
    pub fn parse(qualified: &str) -> Result<Self, ValueError> {
        let Some((prefix, name)) = qualified.split_once(':') else {
            return Err(ValueError::InvalidKey {
                prefix: String::new(),
                name: qualified.to_string(),
            });
        };
        Self::new(prefix, name)
    }

    /// Namespace prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Local property name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qualified `prefix:name` form
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.prefix, self.name)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prefix, self.name)
    }
}

impl FromStr for PropertyKey {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Check whether `s` is an XML name without colons
pub fn is_ncname(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first == '_' || first.is_alphabetic()) {
        return false;
    }
    chars.all(|c| c == '_' || c == '-' || c == '.' || c.is_alphanumeric())
}

/// Check whether `s` can be bound as a namespace prefix
///
/// Names starting with `xml` in any case are reserved by XML; only `xml`
/// itself may appear, bound to its fixed namespace.
pub fn is_valid_prefix(s: &str) -> bool {
    if !is_ncname(s) {
        return false;
    }
    let reserved = s.len() >= 3 && s.as_bytes()[..3].eq_ignore_ascii_case(b"xml");
    !reserved || s == "xml"
}
