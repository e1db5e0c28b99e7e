//! XPath path handling for XMP
//!
//! This module parses the small subset of XMP path expressions that can
//! address a single text inside the model:
//! - `xmp:CreatorTool` - a property
//! - `dc:creator[2]` - an item of a list (1-based)
//! - `dc:creator[last()]` - the last item of a list
//! - `dc:title[?xml:lang="ja"]` - one entry of a language alternative

use crate::core::error::ValueError;
use crate::types::key::PropertyKey;
use std::fmt;
use std::str::FromStr;

/// Selector applied to a property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    /// 1-based list index
    Index(usize),
    /// Last list item
    Last,
    /// Language alternative entry with exactly this tag
    Lang(String),
}

/// A parsed path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmpPath {
    /// Property addressed by the path
    pub key: PropertyKey,
    /// Optional item selector
    pub step: Option<PathStep>,
}

impl XmpPath {
    /// Parse a path expression
    pub fn parse(path: &str) -> Result<Self, ValueError> {
        let bad = |reason: &str| ValueError::BadPath(format!("{}: {}", reason, path));

        let (property, selector) = match path.find('[') {
            Some(open) => {
                let rest = &path[open + 1..];
                let selector = rest
                    .strip_suffix(']')
                    .ok_or_else(|| bad("Unclosed bracket"))?;
                (&path[..open], Some(selector))
            }
            None => (path, None),
        };
        if property.is_empty() {
            return Err(bad("Empty path"));
        }
        let key = PropertyKey::parse(property).map_err(|_| bad("Invalid property name"))?;

        let step = match selector {
            None => None,
            Some("last()") => Some(PathStep::Last),
            Some(selector) if selector.starts_with('?') => {
                let lang = selector
                    .strip_prefix("?xml:lang=")
                    .and_then(strip_quotes)
                    .ok_or_else(|| bad("Unsupported qualifier selector"))?;
                Some(PathStep::Lang(lang.to_string()))
            }
            Some(selector) => {
                let index = selector
                    .parse::<usize>()
                    .map_err(|_| bad("Invalid array index"))?;
                if index == 0 {
                    return Err(bad("Array indices start at 1"));
                }
                Some(PathStep::Index(index))
            }
        };

        Ok(Self { key, step })
    }
}

impl fmt::Display for XmpPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)?;
        match &self.step {
            None => Ok(()),
            Some(PathStep::Index(index)) => write!(f, "[{}]", index),
            Some(PathStep::Last) => write!(f, "[last()]"),
            Some(PathStep::Lang(lang)) => write!(f, "[?xml:lang=\"{}\"]", lang),
        }
    }
}

impl FromStr for XmpPath {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn strip_quotes(s: &str) -> Option<&str> {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| s.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
}
