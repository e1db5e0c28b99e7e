//! XMP Core module
//!
//! This module contains the core functionality for XMP metadata processing:
//! the schema registry, the property store, and packet parsing and encoding.

pub mod encoder;
pub mod error;
pub mod escape;
pub(crate) mod node;
pub mod parser;
pub mod schema;
pub mod store;
pub mod xpath;

pub use encoder::{EncodeOptions, XmpEncoder};
pub use error::{ParseError, ParseWarning, ValueError, XmpError, XmpResult};
pub use escape::{escape_text, unescape_text};
pub use parser::{ParseOptions, Parsed, XmpParser};
pub use schema::{ns, Schema, SchemaRegistry};
pub use store::{Numbering, PropertyStore, ViewPolicy};
pub use xpath::{PathStep, XmpPath};
