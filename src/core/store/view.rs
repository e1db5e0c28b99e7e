//! Scalar views for editors
//!
//! Editors display every property as one string. How multi-valued
//! properties are joined is a presentation choice, so it is configurable.

use crate::types::value::PropertyValue;

/// Numbering applied to list items in a scalar view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Numbering {
    /// Items are joined as they are
    None,
    /// Items are prefixed with `1) `, `2) `, ...
    #[default]
    Parenthesized,
}

/// Formatting policy for list values in scalar views
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewPolicy {
    /// Text placed between list items
    pub separator: String,
    /// Item numbering
    pub numbering: Numbering,
}

impl Default for ViewPolicy {
    fn default() -> Self {
        Self {
            separator: ", ".to_string(),
            numbering: Numbering::Parenthesized,
        }
    }
}

impl ViewPolicy {
    /// Join items with `separator` and no numbering
    pub fn plain(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            numbering: Numbering::None,
        }
    }

    /// Render the scalar view of a value
    ///
    /// Language alternatives show their `x-default` text (or the first
    /// entry when there is none), opaque values show their markup.
    pub fn render(&self, value: &PropertyValue) -> String {
        match value {
            PropertyValue::Scalar(text) => text.clone(),
            PropertyValue::OrderedList(items) | PropertyValue::UnorderedList(items) => {
                self.join(items)
            }
            PropertyValue::LanguageAlternative(alt) => alt
                .default_text()
                .or_else(|| alt.iter().next().map(|(_, text)| text))
                .unwrap_or_default()
                .to_string(),
            PropertyValue::Opaque(xml) => xml.markup().to_string(),
        }
    }

    fn join(&self, items: &[String]) -> String {
        let rendered: Vec<String> = match self.numbering {
            Numbering::None => items.to_vec(),
            Numbering::Parenthesized => items
                .iter()
                .enumerate()
                .map(|(i, item)| format!("{}) {}", i + 1, item))
                .collect(),
        };
        rendered.join(&self.separator)
    }
}
