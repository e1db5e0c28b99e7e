#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use xmpmodel::{PropertyStore, SchemaRegistry, XmpParser};

    const PACKET: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:xmp="http://ns.adobe.com/xap/1.0/">
  <rdf:Description rdf:about=""
                   xmp:CreatorTool="TestApp"/>
</rdf:RDF>
<?xpacket end="w"?>"#;

    #[test]
    fn test_concurrent_reads() {
        let store = Arc::new(PACKET.parse::<PropertyStore>().unwrap());

        let mut handles = vec![];

        // Spawn 10 threads that all read concurrently
        for _ in 0..10 {
            let store = Arc::clone(&store);
            let handle = thread::spawn(move || {
                assert_eq!(
                    store.get_scalar_view("xmp", "CreatorTool").as_deref(),
                    Some("TestApp")
                );
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_parallel_parsers_share_registry() {
        let registry = SchemaRegistry::builtin();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let parser = XmpParser::with_registry(registry);
                    let mut store = parser.parse_str(PACKET).unwrap().store;
                    store.set_scalar("xmp", "Rating", i.to_string()).unwrap();
                    store.get_scalar_view("xmp", "Rating")
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), Some(i.to_string()));
        }
        assert!(Arc::ptr_eq(&registry, &SchemaRegistry::builtin()));
    }
}
