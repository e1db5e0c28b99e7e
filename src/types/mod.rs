//! XMP value types
//!
//! This module defines the property key, the value shapes and the
//! language alternative container used by the property store.

pub mod key;
pub mod lang;
pub mod value;

pub use key::PropertyKey;
pub use lang::{LangAlt, X_DEFAULT};
pub use value::{OpaqueXml, PropertyValue, ValueShape};
