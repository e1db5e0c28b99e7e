//! Schema registry for XMP
//!
//! This module maps namespace prefixes to namespace URIs and to the
//! properties each schema declares, together with their value shapes.
//! The built-in registry is static configuration data built once per
//! process; custom registries can be assembled with [`Schema`] builders.

use crate::core::error::{XmpError, XmpResult};
use crate::types::value::ValueShape;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};

static BUILTIN_REGISTRY: OnceLock<Arc<SchemaRegistry>> = OnceLock::new();

/// Built-in XMP namespaces
pub mod ns {
    /// XMP Basic namespace
    pub const XMP: &str = "http://ns.adobe.com/xap/1.0/";
    /// Dublin Core namespace
    pub const DC: &str = "http://purl.org/dc/elements/1.1/";
    /// EXIF namespace
    pub const EXIF: &str = "http://ns.adobe.com/exif/1.0/";
    /// EXIF Aux namespace
    pub const EXIF_AUX: &str = "http://ns.adobe.com/exif/1.0/aux/";
    /// IPTC Core namespace
    pub const IPTC_CORE: &str = "http://iptc.org/std/Iptc4xmpCore/1.0/xmlns/";
    /// IPTC Extension namespace
    pub const IPTC_EXT: &str = "http://iptc.org/std/Iptc4xmpExt/2008-02-29/";
    /// Photoshop namespace
    pub const PHOTOSHOP: &str = "http://ns.adobe.com/photoshop/1.0/";
    /// Camera Raw namespace
    pub const CAMERA_RAW: &str = "http://ns.adobe.com/camera-raw-settings/1.0/";
    /// XMP Rights namespace
    pub const XMP_RIGHTS: &str = "http://ns.adobe.com/xap/1.0/rights/";
    /// XMP Media Management namespace
    pub const XMP_MM: &str = "http://ns.adobe.com/xap/1.0/mm/";
    /// XMP Basic Job Ticket namespace
    pub const XMP_BJ: &str = "http://ns.adobe.com/xap/1.0/bj/";
    /// TIFF namespace
    pub const TIFF: &str = "http://ns.adobe.com/tiff/1.0/";
    /// PDF namespace
    pub const PDF: &str = "http://ns.adobe.com/pdf/1.3/";
    /// XMP Dynamic Media namespace
    pub const XMP_DM: &str = "http://ns.adobe.com/xmp/1.0/DynamicMedia/";
    /// XMP PagedText namespace
    pub const XMP_PAGED: &str = "http://ns.adobe.com/xap/1.0/t/pg/";
    /// RDF namespace
    pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    /// XML namespace (for xml:lang, etc.)
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    /// Adobe meta namespace (for x:xmpmeta)
    pub const X: &str = "adobe:ns:meta/";
    /// XMP namespace prefix
    pub const XMP_PREFIX: &str = "xmp";
    /// Dublin Core prefix
    pub const DC_PREFIX: &str = "dc";
    /// EXIF prefix
    pub const EXIF_PREFIX: &str = "exif";
    /// EXIF Aux prefix
    pub const EXIF_AUX_PREFIX: &str = "aux";
    /// IPTC Core prefix
    pub const IPTC_CORE_PREFIX: &str = "Iptc4xmpCore";
    /// IPTC Extension prefix
    pub const IPTC_EXT_PREFIX: &str = "Iptc4xmpExt";
    /// Photoshop prefix
    pub const PHOTOSHOP_PREFIX: &str = "photoshop";
    /// Camera Raw prefix
    pub const CAMERA_RAW_PREFIX: &str = "crs";
    /// XMP Rights prefix
    pub const XMP_RIGHTS_PREFIX: &str = "xmpRights";
    /// XMP Media Management prefix
    pub const XMP_MM_PREFIX: &str = "xmpMM";
    /// XMP Basic Job Ticket prefix
    pub const XMP_BJ_PREFIX: &str = "xmpBJ";
    /// TIFF prefix
    pub const TIFF_PREFIX: &str = "tiff";
    /// PDF prefix
    pub const PDF_PREFIX: &str = "pdf";
    /// XMP Dynamic Media prefix
    pub const XMP_DM_PREFIX: &str = "xmpDM";
    /// XMP PagedText prefix
    pub const XMP_PAGED_PREFIX: &str = "xmpTPg";
    /// RDF prefix
    pub const RDF_PREFIX: &str = "rdf";
    /// XML prefix
    pub const XML_PREFIX: &str = "xml";
    /// Adobe meta prefix
    pub const X_PREFIX: &str = "x";
}

/// Prefixes the packet syntax itself uses; no schema may claim them
const RESERVED_PREFIXES: [(&str, &str); 3] = [
    (ns::RDF_PREFIX, ns::RDF),
    (ns::XML_PREFIX, ns::XML),
    (ns::X_PREFIX, ns::X),
];

use ValueShape::{
    LanguageAlternative as Alt, Opaque, OrderedList as Seq, Scalar as Text, UnorderedList as Bag,
};

type PropertyTable = &'static [(&'static str, ValueShape)];

const DC_PROPERTIES: PropertyTable = &[
    ("contributor", Bag),
    ("coverage", Text),
    ("creator", Seq),
    ("date", Seq),
    ("description", Alt),
    ("format", Text),
    ("identifier", Text),
    ("language", Bag),
    ("publisher", Bag),
    ("relation", Bag),
    ("rights", Alt),
    ("source", Text),
    ("subject", Bag),
    ("title", Alt),
    ("type", Bag),
];

const XMP_PROPERTIES: PropertyTable = &[
    ("Advisory", Bag),
    ("BaseURL", Text),
    ("CreateDate", Text),
    ("CreatorTool", Text),
    ("Identifier", Bag),
    ("Label", Text),
    ("MetadataDate", Text),
    ("ModifyDate", Text),
    ("Nickname", Text),
    ("Rating", Text),
    ("Thumbnails", Opaque),
];

const XMP_RIGHTS_PROPERTIES: PropertyTable = &[
    ("Certificate", Text),
    ("Marked", Text),
    ("Owner", Bag),
    ("UsageTerms", Alt),
    ("WebStatement", Text),
];

const XMP_MM_PROPERTIES: PropertyTable = &[
    ("DerivedFrom", Opaque),
    ("DocumentID", Text),
    ("History", Opaque),
    ("InstanceID", Text),
    ("ManagedFrom", Opaque),
    ("Manager", Text),
    ("ManageTo", Text),
    ("ManageUI", Text),
    ("ManagerVariant", Text),
    ("OriginalDocumentID", Text),
    ("RenditionClass", Text),
    ("RenditionParams", Text),
    ("VersionID", Text),
    ("Versions", Opaque),
];

const XMP_BJ_PROPERTIES: PropertyTable = &[("JobRef", Opaque)];

const XMP_PAGED_PROPERTIES: PropertyTable = &[
    ("Colorants", Opaque),
    ("Fonts", Opaque),
    ("MaxPageSize", Opaque),
    ("NPages", Text),
    ("PlateNames", Seq),
];

const PDF_PROPERTIES: PropertyTable = &[
    ("Keywords", Text),
    ("PDFVersion", Text),
    ("Producer", Text),
    ("Trapped", Text),
];

const PHOTOSHOP_PROPERTIES: PropertyTable = &[
    ("AuthorsPosition", Text),
    ("CaptionWriter", Text),
    ("Category", Text),
    ("City", Text),
    ("ColorMode", Text),
    ("Country", Text),
    ("Credit", Text),
    ("DateCreated", Text),
    ("DocumentAncestors", Bag),
    ("Headline", Text),
    ("History", Text),
    ("ICCProfile", Text),
    ("Instructions", Text),
    ("Source", Text),
    ("State", Text),
    ("SupplementalCategories", Bag),
    ("TransmissionReference", Text),
    ("Urgency", Text),
];

const TIFF_PROPERTIES: PropertyTable = &[
    ("Artist", Text),
    ("BitsPerSample", Seq),
    ("Compression", Text),
    ("Copyright", Alt),
    ("DateTime", Text),
    ("ImageDescription", Alt),
    ("ImageLength", Text),
    ("ImageWidth", Text),
    ("Make", Text),
    ("Model", Text),
    ("Orientation", Text),
    ("PhotometricInterpretation", Text),
    ("PlanarConfiguration", Text),
    ("PrimaryChromaticities", Seq),
    ("ReferenceBlackWhite", Seq),
    ("ResolutionUnit", Text),
    ("SamplesPerPixel", Text),
    ("Software", Text),
    ("TransferFunction", Seq),
    ("WhitePoint", Seq),
    ("XResolution", Text),
    ("YCbCrCoefficients", Seq),
    ("YCbCrPositioning", Text),
    ("YCbCrSubSampling", Seq),
    ("YResolution", Text),
];

const EXIF_PROPERTIES: PropertyTable = &[
    ("ApertureValue", Text),
    ("BrightnessValue", Text),
    ("ColorSpace", Text),
    ("ComponentsConfiguration", Seq),
    ("CompressedBitsPerPixel", Text),
    ("Contrast", Text),
    ("CustomRendered", Text),
    ("DateTimeDigitized", Text),
    ("DateTimeOriginal", Text),
    ("DigitalZoomRatio", Text),
    ("ExifVersion", Text),
    ("ExposureBiasValue", Text),
    ("ExposureMode", Text),
    ("ExposureProgram", Text),
    ("ExposureTime", Text),
    ("FileSource", Text),
    ("Flash", Opaque),
    ("FlashpixVersion", Text),
    ("FNumber", Text),
    ("FocalLength", Text),
    ("FocalLengthIn35mmFilm", Text),
    ("FocalPlaneResolutionUnit", Text),
    ("FocalPlaneXResolution", Text),
    ("FocalPlaneYResolution", Text),
    ("GainControl", Text),
    ("GPSAltitude", Text),
    ("GPSAltitudeRef", Text),
    ("GPSLatitude", Text),
    ("GPSLongitude", Text),
    ("GPSTimeStamp", Text),
    ("GPSVersionID", Text),
    ("ISOSpeedRatings", Seq),
    ("LightSource", Text),
    ("MaxApertureValue", Text),
    ("MeteringMode", Text),
    ("NativeDigest", Text),
    ("OECF", Opaque),
    ("PixelXDimension", Text),
    ("PixelYDimension", Text),
    ("RelatedSoundFile", Text),
    ("Saturation", Text),
    ("SceneCaptureType", Text),
    ("SceneType", Text),
    ("SensingMethod", Text),
    ("Sharpness", Text),
    ("ShutterSpeedValue", Text),
    ("SubjectArea", Seq),
    ("SubjectDistance", Text),
    ("SubjectDistanceRange", Text),
    ("UserComment", Alt),
    ("WhiteBalance", Text),
];

const IPTC_CORE_PROPERTIES: PropertyTable = &[
    ("CountryCode", Text),
    ("CreatorContactInfo", Opaque),
    ("IntellectualGenre", Text),
    ("Location", Text),
    ("Scene", Bag),
    ("SubjectCode", Bag),
];

/// Namespaces whose properties are not enumerated
const OPEN: PropertyTable = &[];

const BUILTIN_SCHEMAS: &[(&str, &str, PropertyTable)] = &[
    (ns::DC_PREFIX, ns::DC, DC_PROPERTIES),
    (ns::XMP_PREFIX, ns::XMP, XMP_PROPERTIES),
    (ns::XMP_RIGHTS_PREFIX, ns::XMP_RIGHTS, XMP_RIGHTS_PROPERTIES),
    (ns::XMP_MM_PREFIX, ns::XMP_MM, XMP_MM_PROPERTIES),
    (ns::XMP_BJ_PREFIX, ns::XMP_BJ, XMP_BJ_PROPERTIES),
    (ns::XMP_PAGED_PREFIX, ns::XMP_PAGED, XMP_PAGED_PROPERTIES),
    (ns::XMP_DM_PREFIX, ns::XMP_DM, OPEN),
    (ns::PDF_PREFIX, ns::PDF, PDF_PROPERTIES),
    (ns::PHOTOSHOP_PREFIX, ns::PHOTOSHOP, PHOTOSHOP_PROPERTIES),
    (ns::CAMERA_RAW_PREFIX, ns::CAMERA_RAW, OPEN),
    (ns::TIFF_PREFIX, ns::TIFF, TIFF_PROPERTIES),
    (ns::EXIF_PREFIX, ns::EXIF, EXIF_PROPERTIES),
    (ns::EXIF_AUX_PREFIX, ns::EXIF_AUX, OPEN),
    (ns::IPTC_CORE_PREFIX, ns::IPTC_CORE, IPTC_CORE_PROPERTIES),
    (ns::IPTC_EXT_PREFIX, ns::IPTC_EXT, OPEN),
];

/// One namespace and the properties it declares
///
/// A schema without declared properties is *open*: any property name in
/// it is accepted without a warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    prefix: String,
    uri: String,
    properties: BTreeMap<String, ValueShape>,
}

impl Schema {
    /// Create a schema with no declared properties
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            uri: uri.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Declare a property and its shape
    pub fn property(mut self, name: impl Into<String>, shape: ValueShape) -> Self {
        self.properties.insert(name.into(), shape);
        self
    }

    /// Namespace prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Namespace URI
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Check whether property names are unrestricted
    pub fn is_open(&self) -> bool {
        self.properties.is_empty()
    }

    /// Declared shape of a property
    pub fn shape_of(&self, name: &str) -> Option<ValueShape> {
        self.properties.get(name).copied()
    }

    /// Declared properties in name order
    pub fn properties(&self) -> impl Iterator<Item = (&str, ValueShape)> {
        self.properties.iter().map(|(name, shape)| (name.as_str(), *shape))
    }
}

/// Lookup table of known schemas
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Schema>,
    uri_to_prefix: HashMap<String, String>,
}

impl SchemaRegistry {
    /// Create a registry that knows no schemas
    pub fn empty() -> Self {
        Self::default()
    }

    /// Shared registry holding the built-in schemas
    pub fn builtin() -> Arc<SchemaRegistry> {
        BUILTIN_REGISTRY
            .get_or_init(|| Arc::new(Self::with_builtin_schemas()))
            .clone()
    }

    /// Create an owned copy of the built-in schemas, e.g. to extend it
    pub fn with_builtin_schemas() -> Self {
        let mut registry = Self::empty();
        for (prefix, uri, properties) in BUILTIN_SCHEMAS {
            let schema = properties
                .iter()
                .fold(Schema::new(*prefix, *uri), |schema, (name, shape)| {
                    schema.property(*name, *shape)
                });
            registry.insert(schema);
        }
        registry
    }

    /// Register a schema
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix is reserved, or if the prefix or URI
    /// is already registered with a different counterpart. Registering the
    /// same prefix and URI again replaces the declared properties.
    pub fn register(&mut self, schema: Schema) -> XmpResult<()> {
        if schema.prefix.is_empty() || schema.uri.is_empty() {
            return Err(XmpError::BadSchema(
                "Schema prefix and URI cannot be empty".to_string(),
            ));
        }
        if is_reserved_prefix(&schema.prefix) {
            return Err(XmpError::BadSchema(format!(
                "Prefix '{}' is reserved",
                schema.prefix
            )));
        }
        if let Some(existing) = self.schemas.get(&schema.prefix) {
            if existing.uri != schema.uri {
                return Err(XmpError::BadSchema(format!(
                    "Prefix '{}' is already registered to '{}'",
                    schema.prefix, existing.uri
                )));
            }
        }
        if let Some(existing) = self.uri_to_prefix.get(&schema.uri) {
            if existing != &schema.prefix {
                return Err(XmpError::BadSchema(format!(
                    "Namespace '{}' is already registered as '{}'",
                    schema.uri, existing
                )));
            }
        }
        self.insert(schema);
        Ok(())
    }

    /// Get a schema by prefix
    pub fn schema(&self, prefix: &str) -> Option<&Schema> {
        self.schemas.get(prefix)
    }

    /// Get the URI for a prefix, including the reserved prefixes
    pub fn uri(&self, prefix: &str) -> Option<&str> {
        self.schemas
            .get(prefix)
            .map(|s| s.uri.as_str())
            .or_else(|| reserved_uri(prefix))
    }

    /// Get the canonical prefix for a namespace URI
    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.uri_to_prefix.get(uri).map(|s| s.as_str()).or_else(|| {
            RESERVED_PREFIXES
                .iter()
                .find(|(_, u)| *u == uri)
                .map(|(p, _)| *p)
        })
    }

    /// Check if a schema prefix is registered
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.schemas.contains_key(prefix)
    }

    /// Check if a schema namespace URI is registered
    pub fn has_uri(&self, uri: &str) -> bool {
        self.uri_to_prefix.contains_key(uri)
    }

    /// Declared shape of `prefix:name`
    pub fn declared_shape(&self, prefix: &str, name: &str) -> Option<ValueShape> {
        self.schemas.get(prefix).and_then(|s| s.shape_of(name))
    }

    /// Check whether `prefix:name` is acceptable under its schema
    ///
    /// Names in open schemas are always accepted; names in unknown
    /// namespaces never are.
    pub fn is_known_property(&self, prefix: &str, name: &str) -> bool {
        self.schemas
            .get(prefix)
            .is_some_and(|s| s.is_open() || s.properties.contains_key(name))
    }

    /// All registered schemas in prefix order
    pub fn schemas(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }

    fn insert(&mut self, schema: Schema) {
        self.uri_to_prefix
            .insert(schema.uri.clone(), schema.prefix.clone());
        self.schemas.insert(schema.prefix.clone(), schema);
    }
}

/// Check whether a prefix belongs to the packet syntax (`rdf`, `xml`, `x`)
pub fn is_reserved_prefix(prefix: &str) -> bool {
    reserved_uri(prefix).is_some()
}

/// Namespace URI recorded for a prefix that was used without a binding
pub(crate) fn placeholder_uri(prefix: &str) -> String {
    format!("http://ns.undeclared.invalid/{}/", prefix)
}

fn reserved_uri(prefix: &str) -> Option<&'static str> {
    RESERVED_PREFIXES
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, u)| *u)
}
