//! # xmpmodel
//!
//! An in-memory model of XMP metadata with a packet parser and encoder
//! that keep everything they do not understand.
//!
//! A [`PropertyStore`] maps `(prefix, name)` keys to typed values
//! ([`PropertyValue`]): scalars, ordered and unordered lists, language
//! alternatives, and opaque markup for structures the model does not
//! interpret. Editors that only deal in single strings use the scalar
//! view.
//!
//! ```
//! use xmpmodel::{PropertyStore, XmpParser};
//!
//! let mut store = PropertyStore::new();
//! store.set_scalar("dc", "format", "image/png").unwrap();
//! store.append_item("dc", "creator", "Wilber").unwrap();
//! store.append_item("dc", "creator", "Wilma").unwrap();
//!
//! let packet = store.encode().unwrap();
//! let parsed = XmpParser::new().parse(&packet).unwrap();
//! assert_eq!(
//!     parsed.store.get_scalar_view("dc", "creator").as_deref(),
//!     Some("1) Wilber, 2) Wilma")
//! );
//! ```

pub mod core;
pub mod types;

pub use crate::core::{
    EncodeOptions, Numbering, ParseError, ParseOptions, ParseWarning, Parsed, PropertyStore,
    SchemaRegistry, ValueError, ViewPolicy, XmpEncoder, XmpError, XmpParser, XmpResult,
};
pub use crate::types::{LangAlt, OpaqueXml, PropertyKey, PropertyValue, ValueShape, X_DEFAULT};
