use super::*;

#[test]
fn writes_and_reads_back_a_desktop_tag() {
    let mut packet = XmpPacket::new();
    packet
        .register_namespace(APPLE_DESKTOP_NS, APPLE_DESKTOP_PREFIX)
        .unwrap();
    packet
        .set_tag(APPLE_DESKTOP_NS, "solar", "YnBsaXN0MDA=")
        .unwrap();

    let bytes = packet.to_bytes().unwrap();
    let text = String::from_utf8(bytes.clone()).unwrap();
    assert!(text.contains("<apple_desktop:solar>YnBsaXN0MDA=</apple_desktop:solar>"));
    assert!(text.contains("xmlns:apple_desktop=\"http://ns.apple.com/namespace/1.0/\""));

    let parsed = XmpPacket::parse(&bytes).unwrap();
    assert_eq!(parsed.tag(APPLE_DESKTOP_NS, "solar"), Some("YnBsaXN0MDA="));
    assert_eq!(parsed, packet);
}

#[test]
fn set_tag_replaces_previous_value() {
    let mut packet = XmpPacket::new();
    packet.register_namespace("urn:test", "t").unwrap();
    packet.set_tag("urn:test", "k", "one").unwrap();
    packet.set_tag("urn:test", "k", "two").unwrap();
    assert_eq!(packet.tags_in("urn:test").collect::<Vec<_>>(), vec![("k", "two")]);
}

#[test]
fn namespace_registration_rules() {
    let mut packet = XmpPacket::new();
    packet.register_namespace("urn:a", "a").unwrap();
    packet.register_namespace("urn:a", "a").unwrap();

    assert!(matches!(
        packet.register_namespace("urn:b", "a"),
        Err(MetadataError::NamespaceNotRegistered(_))
    ));
    assert!(matches!(
        packet.register_namespace("urn:a", "other"),
        Err(MetadataError::NamespaceNotRegistered(_))
    ));
    assert!(matches!(
        packet.register_namespace("urn:c", "rdf"),
        Err(MetadataError::NamespaceNotRegistered(_))
    ));
    assert!(matches!(
        packet.register_namespace("urn:c", "1bad"),
        Err(MetadataError::NamespaceNotRegistered(_))
    ));
    assert!(matches!(
        packet.register_namespace("", "c"),
        Err(MetadataError::NamespaceNotRegistered(_))
    ));
}

#[test]
fn tag_errors_are_distinguished() {
    let mut packet = XmpPacket::new();
    packet.register_namespace("urn:a", "a").unwrap();
    assert!(matches!(
        packet.set_tag("urn:a", "has space", "v"),
        Err(MetadataError::TagNotCreated(_))
    ));
    assert!(matches!(
        packet.set_tag("urn:unregistered", "k", "v"),
        Err(MetadataError::TagNotSet(_))
    ));
}

#[test]
fn reads_attribute_shorthand_and_foreign_prefixes() {
    let xml = br#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description rdf:about="" xmlns:desk="http://ns.apple.com/namespace/1.0/"
        desk:apr="YXBy"/>
  </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#;
    let parsed = XmpPacket::parse(xml).unwrap();
    assert_eq!(parsed.tag(APPLE_DESKTOP_NS, "apr"), Some("YXBy"));
}

#[test]
fn escaped_text_round_trips() {
    let mut packet = XmpPacket::new();
    packet.register_namespace("urn:a", "a").unwrap();
    packet.set_tag("urn:a", "note", "a < b & c").unwrap();
    let parsed = XmpPacket::parse(&packet.to_bytes().unwrap()).unwrap();
    assert_eq!(parsed.tag("urn:a", "note"), Some("a < b & c"));
}

#[test]
fn broken_xml_is_malformed() {
    assert!(matches!(
        XmpPacket::parse(b"<x:xmpmeta><rdf:RDF></x:xmpmeta>"),
        Err(MetadataError::Malformed(_))
    ));
}
