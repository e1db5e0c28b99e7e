//! Language alternatives
//!
//! A language alternative (`rdf:Alt` with `xml:lang` items) holds one text
//! per language tag. Once it holds anything it holds an `x-default` entry.

use crate::core::error::ValueError;

/// Language tag of the default entry
pub const X_DEFAULT: &str = "x-default";

/// Language-keyed texts of one property, in stored order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "Vec<(String, String)>", into = "Vec<(String, String)>")
)]
pub struct LangAlt {
    entries: Vec<(String, String)>,
}

impl LangAlt {
    /// Create an empty language alternative
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a language alternative holding only an `x-default` text
    pub fn with_default(text: impl Into<String>) -> Self {
        Self {
            entries: vec![(X_DEFAULT.to_string(), text.into())],
        }
    }

    /// Build from `(lang, text)` pairs, keeping their order
    ///
    /// # Errors
    ///
    /// Fails if a tag is malformed, a tag repeats (tags compare
    /// case-insensitively) or a non-empty list lacks `x-default`.
    pub fn from_entries<I, L, T>(entries: I) -> Result<Self, ValueError>
    where
        I: IntoIterator<Item = (L, T)>,
        L: Into<String>,
        T: Into<String>,
    {
        let mut alt = Self::new();
        for (lang, text) in entries {
            let lang = lang.into();
            check_lang(&lang)?;
            if alt.position(&lang).is_some() {
                return Err(ValueError::DuplicateLanguage(lang));
            }
            alt.entries.push((lang, text.into()));
        }
        if !alt.is_empty() && alt.position(X_DEFAULT).is_none() {
            return Err(ValueError::MissingDefaultLanguage);
        }
        Ok(alt)
    }

    /// Number of language entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All `(lang, text)` entries in stored order
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Iterate over `(lang, text)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, t)| (l.as_str(), t.as_str()))
    }

    /// Text of the `x-default` entry
    pub fn default_text(&self) -> Option<&str> {
        self.get(X_DEFAULT)
    }

    /// Text stored under exactly `lang`
    pub fn get(&self, lang: &str) -> Option<&str> {
        self.position(lang).map(|i| self.entries[i].1.as_str())
    }

    /// Text for `lang`, falling back to `x-default`
    pub fn lookup(&self, lang: &str) -> Option<&str> {
        self.get(lang).or_else(|| self.default_text())
    }

    /// Select the best entry for a language request
    ///
    /// Tries, in order: an exact match for `specific`, an entry whose
    /// primary subtag equals `generic` (so `en` selects `en-US`), the
    /// `x-default` entry, and finally the first entry. Returns
    /// `(actual_lang, text)`.
    pub fn select(&self, generic: &str, specific: &str) -> Option<(&str, &str)> {
        if let Some(i) = self.position(specific) {
            return Some(self.pair(i));
        }
        if !generic.is_empty() {
            let found = self.entries.iter().position(|(lang, _)| {
                let primary = lang.split('-').next().unwrap_or(lang);
                primary.eq_ignore_ascii_case(generic)
            });
            if let Some(i) = found {
                return Some(self.pair(i));
            }
        }
        if let Some(i) = self.position(X_DEFAULT) {
            return Some(self.pair(i));
        }
        if self.entries.is_empty() {
            None
        } else {
            Some(self.pair(0))
        }
    }

    /// Set the text for `lang`, adding the entry if needed
    ///
    /// Setting a specific language on an empty alternative also creates the
    /// `x-default` entry with the same text. Setting `x-default` on an
    /// alternative without one puts it first.
    pub fn set(&mut self, lang: &str, text: impl Into<String>) -> Result<(), ValueError> {
        check_lang(lang)?;
        let text = text.into();
        if let Some(i) = self.position(lang) {
            self.entries[i].1 = text;
            return Ok(());
        }
        if lang.eq_ignore_ascii_case(X_DEFAULT) {
            self.entries.insert(0, (X_DEFAULT.to_string(), text));
            return Ok(());
        }
        if self.entries.is_empty() {
            self.entries.push((X_DEFAULT.to_string(), text.clone()));
        }
        self.entries.push((lang.to_string(), text));
        Ok(())
    }

    /// Build from parsed entries without validation
    pub(crate) fn from_entries_unchecked(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    fn position(&self, lang: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(l, _)| l.eq_ignore_ascii_case(lang))
    }

    fn pair(&self, index: usize) -> (&str, &str) {
        let (lang, text) = &self.entries[index];
        (lang.as_str(), text.as_str())
    }
}

impl TryFrom<Vec<(String, String)>> for LangAlt {
    type Error = ValueError;

    fn try_from(entries: Vec<(String, String)>) -> Result<Self, Self::Error> {
        Self::from_entries(entries)
    }
}

impl From<LangAlt> for Vec<(String, String)> {
    fn from(alt: LangAlt) -> Self {
        alt.entries
    }
}

/// Check that `lang` looks like an RFC 3066 tag (or `x-default`)
pub fn is_valid_lang(lang: &str) -> bool {
    !lang.is_empty()
        && lang
            .split('-')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric()))
}

fn check_lang(lang: &str) -> Result<(), ValueError> {
    if is_valid_lang(lang) {
        Ok(())
    } else {
        Err(ValueError::InvalidLanguage(lang.to_string()))
    }
}
