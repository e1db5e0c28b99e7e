//! Parse and encode round trips
//!
//! These tests drive the parser and encoder together the way an image
//! editor does: read a packet, edit it through the scalar interface and
//! write it back.

#[path = "fixtures/mod.rs"]
mod fixtures;

use fixtures::{fixture_bytes, init_logging};
use xmpmodel::{
    EncodeOptions, ParseError, ParseOptions, ParseWarning, PropertyKey, PropertyStore,
    PropertyValue, ValueShape, XmpEncoder, XmpParser,
};

const EDITOR_TAG: &[u8] = b"GIMP_TEST";

fn reparse(store: &PropertyStore) -> PropertyStore {
    let packet = store.encode().unwrap();
    XmpParser::new().parse(&packet).unwrap().store
}

mod edited_scalars {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn survive_tagged_round_trip() {
        init_logging();

        let mut store = PropertyStore::new();
        store.set_scalar("dc", "title", "Hello, World,").unwrap();
        store.set_scalar("dc", "creator", "Wilber").unwrap();
        store.set_scalar("dc", "description", "A test image").unwrap();
        store.set_scalar("dc", "subject", "mascot").unwrap();

        let mut buffer = EDITOR_TAG.to_vec();
        XmpEncoder::new().encode_into(&store, &mut buffer).unwrap();
        assert!(buffer.starts_with(EDITOR_TAG));

        let parsed = XmpParser::new()
            .options(ParseOptions::lenient())
            .parse(&buffer)
            .unwrap();
        assert!(parsed
            .warnings
            .contains(&ParseWarning::SkippedLeadingBytes(EDITOR_TAG.len())));

        for (name, text) in [
            ("title", "Hello, World,"),
            ("creator", "Wilber"),
            ("description", "A test image"),
            ("subject", "mascot"),
        ] {
            assert_eq!(
                parsed.store.get_scalar_view("dc", name).as_deref(),
                Some(text),
                "dc:{}",
                name
            );
        }
    }

    #[test]
    fn strict_mode_rejects_tagged_buffer() {
        let mut store = PropertyStore::new();
        store.set_scalar("dc", "format", "image/png").unwrap();

        let mut buffer = EDITOR_TAG.to_vec();
        XmpEncoder::new().encode_into(&store, &mut buffer).unwrap();

        let strict = XmpParser::new().options(ParseOptions::strict());
        assert!(matches!(strict.parse(&buffer), Err(ParseError::Framing(_))));

        let untagged = store.encode().unwrap();
        let parsed = strict.parse(&untagged).unwrap();
        assert!(parsed.is_clean(), "{:?}", parsed.warnings);
    }

    #[test]
    fn scalar_edit_replaces_list() {
        let mut store = XmpParser::new()
            .parse(&fixture_bytes("values.xmp"))
            .unwrap()
            .store;
        store.set_scalar("dc", "creator", "Wilma").unwrap();

        let store = reparse(&store);
        assert_eq!(
            store.get_raw_value("dc", "creator"),
            Some(&PropertyValue::Scalar("Wilma".to_string()))
        );
    }
}

mod value_types {
    use super::*;
    use pretty_assertions::assert_eq;

    fn values() -> PropertyStore {
        init_logging();
        let parsed = XmpParser::new().parse(&fixture_bytes("values.xmp")).unwrap();
        assert!(parsed.is_clean(), "{:?}", parsed.warnings);
        parsed.store
    }

    #[test]
    fn language_alternative() {
        let store = values();
        assert_eq!(
            store.get_scalar_view("dc", "title").as_deref(),
            Some("Hello, World,")
        );
        assert_eq!(
            store.get_raw_value("dc", "title").unwrap().flatten(),
            ["x-default", "Hello, World,", "ja", "こ"]
        );
        assert_eq!(store.get_localized("dc", "title", "ja"), Some(("ja", "こ")));
        assert_eq!(
            store.get_localized("dc", "title", "de"),
            Some(("x-default", "Hello, World,"))
        );
    }

    #[test]
    fn ordered_list() {
        let store = values();
        let creator = store.get_raw_value("dc", "creator").unwrap();
        assert_eq!(creator.shape(), ValueShape::OrderedList);
        assert_eq!(creator.len(), 2);
        assert_eq!(
            store.get_scalar_view("dc", "creator").as_deref(),
            Some("1) Wilber, 2) Wilma")
        );
    }

    #[test]
    fn unordered_list_keeps_order() {
        let store = reparse(&values());
        assert_eq!(
            store.get_raw_value("dc", "subject"),
            Some(&PropertyValue::UnorderedList(vec![
                "mascot".to_string(),
                "gimp".to_string()
            ]))
        );
    }

    #[test]
    fn absent_keys() {
        let store = values();
        assert_eq!(store.get_scalar_view("dc", "nonexistent"), None);
        assert_eq!(store.get_raw_value("xmp", "Rating"), None);
        assert_eq!(store.get_scalar_view("", ""), None);
    }

    #[test]
    fn shapes_survive_without_edits() {
        let store = values();
        let again = reparse(&store);
        for (key, value) in store.iter() {
            assert_eq!(again.get(key), Some(value), "{}", key);
        }
        assert_eq!(again, store);
    }
}

mod foreign_data {
    use super::*;
    use pretty_assertions::assert_eq;

    fn foreign() -> (PropertyStore, Vec<ParseWarning>) {
        init_logging();
        let parsed = XmpParser::new().parse(&fixture_bytes("foreign.xmp")).unwrap();
        (parsed.store, parsed.warnings)
    }

    #[test]
    fn unknown_namespaces_are_reported_once() {
        let (_, warnings) = foreign();
        assert_eq!(
            warnings,
            vec![
                ParseWarning::UnknownNamespace {
                    prefix: "gimp".to_string(),
                    uri: "http://www.gimp.org/xmp/".to_string()
                },
                ParseWarning::UnknownNamespace {
                    prefix: "ex".to_string(),
                    uri: "http://example.com/ns/1.0/".to_string()
                },
            ]
        );
    }

    #[test]
    fn foreign_entries_are_kept() {
        let (store, _) = foreign();
        let tags = PropertyKey::new("ex", "Tags").unwrap();
        assert!(store.is_foreign(&tags));
        assert_eq!(
            store.get(&tags).map(|v| v.flatten()),
            Some(vec!["one", "two & three"])
        );
        assert_eq!(store.get_scalar_view("gimp", "API").as_deref(), Some("2.0"));
        assert_eq!(
            store.get_raw_value("xmpMM", "History").map(|v| v.shape()),
            Some(ValueShape::Opaque)
        );
        assert_eq!(store.about(), "uuid:faf5bdd5-ba3d-11da-ad31-d33d75182f1b");
    }

    #[test]
    fn foreign_entries_survive_round_trip() {
        let (store, _) = foreign();
        let again = reparse(&store);
        assert_eq!(again, store);
        assert_eq!(again.namespace_uri("ex"), Some("http://example.com/ns/1.0/"));

        let history = again.get_raw_value("xmpMM", "History").unwrap();
        let xml = history.as_opaque().unwrap();
        assert!(xml.markup().contains("<stEvt:action>saved</stEvt:action>"));
    }

    #[test]
    fn encoding_is_stable() {
        let (store, _) = foreign();
        let first = store.encode().unwrap();
        let second = reparse(&store).encode().unwrap();
        assert_eq!(
            String::from_utf8(first).unwrap(),
            String::from_utf8(second).unwrap()
        );
    }

    const SPLIT_DESCRIPTIONS: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/">
 <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about="" xmlns:dc="http://purl.org/dc/elements/1.1/">
   <dc:format>image/png</dc:format>
  </rdf:Description>
  <rdf:Description rdf:about="" xmlns:dc="http://example.com/not-dc/">
   <dc:thing rdf:parseType="Resource">
    <dc:part>inner</dc:part>
   </dc:thing>
  </rdf:Description>
 </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#;

    #[test]
    fn prefix_rebound_across_descriptions_survives() {
        init_logging();
        let store = XmpParser::new().parse_str(SPLIT_DESCRIPTIONS).unwrap().store;
        assert_eq!(store.namespace_uri("ns1"), Some("http://example.com/not-dc/"));

        let again = reparse(&store);
        assert_eq!(
            again.get_raw_value("ns1", "thing"),
            store.get_raw_value("ns1", "thing")
        );
        assert_eq!(again, store);
        assert_eq!(
            again.get_scalar_view("dc", "format").as_deref(),
            Some("image/png")
        );

        let first = store.encode().unwrap();
        let second = again.encode().unwrap();
        assert_eq!(
            String::from_utf8(first).unwrap(),
            String::from_utf8(second).unwrap()
        );
    }

    #[test]
    fn editing_one_key_leaves_others() {
        let (mut store, _) = foreign();
        let before = store.clone();
        store.set_scalar("dc", "format", "image/jpeg").unwrap();

        for (key, value) in before.iter() {
            if key.to_string() != "dc:format" {
                assert_eq!(store.get(key), Some(value), "{}", key);
            }
        }
    }
}

mod text_content {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn special_characters_round_trip() {
        let samples = [
            "a < b & c > d",
            "\"quoted\" and 'single'",
            "  leading and trailing  ",
            "line one\r\nline two\n",
            "tab\there",
            "こんにちは 🌍",
            "&amp; stays literal",
            "",
        ];
        let mut store = PropertyStore::new();
        for (i, sample) in samples.iter().enumerate() {
            store.append_item("dc", "subject", *sample).unwrap();
            store
                .set_scalar("xmp", &format!("Label{}", i), *sample)
                .unwrap();
        }

        let again = reparse(&store);
        assert_eq!(again, store);
    }

    #[test]
    fn nul_is_replaced() {
        let mut store = PropertyStore::new();
        store.set_scalar("dc", "format", "a\0b").unwrap();
        let again = reparse(&store);
        assert_eq!(
            again.get_scalar_view("dc", "format").as_deref(),
            Some("a\u{FFFD}b")
        );
    }

    #[test]
    fn other_controls_are_replaced() {
        let mut store = PropertyStore::new();
        store.set_scalar("dc", "format", "a\u{1}b\u{1F}").unwrap();
        store.append_item("dc", "subject", "\u{B}tab\t").unwrap();
        store.set_about("uuid:\u{7}1");

        let packet = String::from_utf8(store.encode().unwrap()).unwrap();
        assert!(!packet.contains("&#x1;"), "{}", packet);
        assert!(!packet.contains("&#x1F;"), "{}", packet);
        assert!(!packet.contains('\u{1}'));

        let again = reparse(&store);
        assert_eq!(
            again.get_scalar_view("dc", "format").as_deref(),
            Some("a\u{FFFD}b\u{FFFD}")
        );
        assert_eq!(
            again.get_raw_value("dc", "subject").map(|v| v.flatten()),
            Some(vec!["\u{FFFD}tab\t"])
        );
        assert_eq!(again.about(), "uuid:\u{FFFD}1");
    }

    #[test]
    fn empty_containers_round_trip() {
        let mut store = PropertyStore::new();
        store
            .set_raw(
                PropertyKey::new("dc", "creator").unwrap(),
                PropertyValue::OrderedList(Vec::new()),
            )
            .unwrap();
        let again = reparse(&store);
        assert_eq!(
            again.get_raw_value("dc", "creator"),
            Some(&PropertyValue::OrderedList(Vec::new()))
        );
    }
}

mod failures {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn malformed_markup_is_fatal() {
        let packet = concat!(
            "<?xpacket begin=\"\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>",
            "<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"><rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">",
            "<rdf:Description><dc:title></rdf:Description>",
            "</rdf:RDF></x:xmpmeta><?xpacket end=\"w\"?>"
        );
        assert!(matches!(
            XmpParser::new().parse_str(packet),
            Err(ParseError::Malformed { .. })
        ));
    }

    #[test]
    fn deep_nesting_terminates() {
        let depth = 500;
        let packet = format!(
            concat!(
                "<?xpacket begin=\"\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>",
                "<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"><rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">",
                "<rdf:Description xmlns:ex=\"http://example.com/\"><ex:deep>{}{}</ex:deep></rdf:Description>",
                "</rdf:RDF></x:xmpmeta><?xpacket end=\"w\"?>"
            ),
            "<ex:n>".repeat(depth),
            "</ex:n>".repeat(depth)
        );

        assert!(matches!(
            XmpParser::new().parse_str(&packet),
            Err(ParseError::Malformed { .. })
        ));

        let roomy = XmpParser::new().options(ParseOptions::default().max_depth(1024));
        let parsed = roomy.parse_str(&packet).unwrap();
        assert_eq!(
            parsed.store.get_raw_value("ex", "deep").map(|v| v.shape()),
            Some(ValueShape::Opaque)
        );
    }

    #[test]
    fn garbage_is_framing_error() {
        assert!(matches!(
            XmpParser::new().parse(b"\x00\x01\x02 not xmp"),
            Err(ParseError::Framing(_))
        ));
        assert!(matches!(
            XmpParser::new().parse(b""),
            Err(ParseError::Framing(_))
        ));
    }
}

mod files {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn parse_file_reads_packet() {
        let mut store = PropertyStore::new();
        store.set_localized("dc", "title", "x-default", "On disk").unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&store.encode().unwrap()).unwrap();
        file.flush().unwrap();

        let parsed = XmpParser::new().parse_file(file.path()).unwrap();
        assert_eq!(
            parsed.store.get_scalar_view("dc", "title").as_deref(),
            Some("On disk")
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = XmpParser::new().parse_file(dir.path().join("missing.xmp"));
        assert!(matches!(result, Err(ParseError::Io(_))));
    }

    #[test]
    fn read_only_packet_parses() {
        let store = PropertyStore::new();
        let packet = XmpEncoder::with_options(EncodeOptions::default().read_only(true).padding(0))
            .encode(&store)
            .unwrap();
        let parsed = XmpParser::new()
            .options(ParseOptions::strict())
            .parse(&packet)
            .unwrap();
        assert!(parsed.store.is_empty());
    }
}

#[cfg(feature = "serde")]
mod json {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn store_exports_json() {
        let store = XmpParser::new()
            .parse(&fixture_bytes("values.xmp"))
            .unwrap()
            .store;
        let json: serde_json::Value = serde_json::from_str(&store.to_json().unwrap()).unwrap();

        assert_eq!(json["dc:creator"]["shape"], "ordered_list");
        assert_eq!(json["dc:creator"]["value"][1], "Wilma");
        assert_eq!(json["dc:title"]["value"][0][0], "x-default");
        assert_eq!(json["xmp:CreatorTool"]["value"], "GIMP 2.10");
    }
}
