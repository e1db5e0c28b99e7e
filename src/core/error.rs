//! Error types for XMP operations
//!
//! This module defines the fatal parse errors, the recoverable parse
//! warnings, the setter errors of the property store, and the umbrella
//! [`XmpError`] used by the encoder and convenience APIs.

use thiserror::Error;

/// Fatal errors produced while parsing a packet
///
/// A parse that fails returns no store at all.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The `<?xpacket>` wrapper (or any recognizable packet start) is
    /// missing or corrupt
    #[error("Packet framing error: {0}")]
    Framing(String),

    /// The markup could not be tokenized
    #[error("Malformed markup at byte {position}: {message}")]
    Malformed {
        /// Byte offset into the packet body where tokenizing failed
        position: usize,
        /// Description of the failure
        message: String,
    },

    /// The packet file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    pub(crate) fn malformed(position: usize, message: impl Into<String>) -> Self {
        ParseError::Malformed {
            position,
            message: message.into(),
        }
    }
}

/// Recoverable findings collected while parsing
///
/// The affected content is always retained in the store; warnings only
/// tell the caller that the packet was not entirely standard.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseWarning {
    /// A namespace URI that the schema registry does not know
    #[error("Unknown namespace '{uri}' (prefix '{prefix}')")]
    UnknownNamespace {
        /// Prefix the property is stored under
        prefix: String,
        /// Namespace URI declared in the packet
        uri: String,
    },

    /// A property that is not listed in its (known) namespace's schema
    #[error("Unknown property '{prefix}:{name}'")]
    UnknownProperty {
        /// Namespace prefix
        prefix: String,
        /// Property name
        name: String,
    },

    /// A prefixed name whose prefix has no `xmlns` declaration in scope
    #[error("Undeclared namespace prefix '{0}'")]
    UndeclaredPrefix(String),

    /// A foreign namespace whose prefix clashed with an existing binding
    #[error("Prefix '{original}' of '{uri}' renamed to '{renamed}'")]
    RenamedPrefix {
        /// Prefix used in the packet
        original: String,
        /// Prefix the properties are stored under
        renamed: String,
        /// Namespace URI
        uri: String,
    },

    /// The parsed shape differs from the shape the schema declares
    #[error("Property '{prefix}:{name}' is declared as {expected} but was parsed as {found}")]
    ShapeMismatch {
        /// Namespace prefix
        prefix: String,
        /// Property name
        name: String,
        /// Declared shape
        expected: String,
        /// Parsed shape
        found: String,
    },

    /// A language alternative without an `x-default` entry; one was
    /// synthesized from the first entry
    #[error("Property '{prefix}:{name}' has no x-default entry")]
    MissingDefaultLanguage {
        /// Namespace prefix
        prefix: String,
        /// Property name
        name: String,
    },

    /// A language tag appearing twice in one alternative; the later entry
    /// was dropped
    #[error("Property '{prefix}:{name}' repeats language '{lang}'")]
    DuplicateLanguage {
        /// Namespace prefix
        prefix: String,
        /// Property name
        name: String,
        /// Repeated language tag
        lang: String,
    },

    /// A property defined more than once; the later definition wins
    #[error("Property '{prefix}:{name}' is defined more than once")]
    DuplicateProperty {
        /// Namespace prefix
        prefix: String,
        /// Property name
        name: String,
    },

    /// No `<?xpacket begin` header was found (lenient mode only)
    #[error("Packet has no <?xpacket> wrapper")]
    MissingPacketWrapper,

    /// The packet header has no matching `<?xpacket end` trailer
    /// (lenient mode only)
    #[error("Packet has no <?xpacket end> trailer")]
    MissingPacketTrailer,

    /// Bytes preceding the packet were skipped (lenient mode only)
    #[error("Skipped {0} bytes before the packet")]
    SkippedLeadingBytes(usize),

    /// An element in a place the XMP profile does not allow
    #[error("Ignored element '{0}'")]
    IgnoredElement(String),
}

/// Errors returned by property store setters
///
/// A setter that fails leaves the store unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// Empty or otherwise invalid namespace prefix or property name
    #[error("Invalid property key '{prefix}:{name}'")]
    InvalidKey {
        /// Namespace prefix as supplied
        prefix: String,
        /// Property name as supplied
        name: String,
    },

    /// A non-empty language alternative without an `x-default` entry
    #[error("Language alternative has no x-default entry")]
    MissingDefaultLanguage,

    /// A language tag used twice in one language alternative
    #[error("Language '{0}' appears more than once")]
    DuplicateLanguage(String),

    /// An empty or malformed language tag
    #[error("Invalid language tag '{0}'")]
    InvalidLanguage(String),

    /// The operation needs a different shape than the stored value has
    #[error("Property '{key}' is {found}, expected {expected}")]
    ShapeMismatch {
        /// Qualified property name
        key: String,
        /// Required shape
        expected: String,
        /// Stored shape
        found: String,
    },

    /// A prefix that cannot be bound to the given namespace URI
    #[error("Cannot bind prefix '{prefix}' to '{uri}'")]
    NamespaceConflict {
        /// Namespace prefix
        prefix: String,
        /// Namespace URI
        uri: String,
    },

    /// A malformed path expression
    #[error("Bad path: {0}")]
    BadPath(String),
}

/// Error types for XMP operations
#[derive(Debug, Error)]
pub enum XmpError {
    /// Parsing failed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A store mutation was rejected
    #[error(transparent)]
    Value(#[from] ValueError),

    /// Bad schema URI or namespace
    #[error("Bad schema: {0}")]
    BadSchema(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for XMP operations
pub type XmpResult<T> = Result<T, XmpError>;
