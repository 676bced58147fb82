//! Minimal XMP packet writer/reader.
//!
//! Only simple (string valued) properties on a single `rdf:Description` are modelled, which is
//! all the wallpaper tags need. Properties written as attributes of `rdf:Description` are read
//! as well, since some producers emit that shorthand form.

use std::collections::HashMap;

use quick_xml::{
    Reader, Writer,
    events::{BytesEnd, BytesStart, BytesText, Event},
};

use crate::foundation::error::MetadataError;

const X_NS: &str = "adobe:ns:meta/";
const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const RESERVED_PREFIXES: [&str; 4] = ["x", "rdf", "xml", "xmlns"];

/// Namespace URI of the desktop wallpaper properties.
pub const APPLE_DESKTOP_NS: &str = "http://ns.apple.com/namespace/1.0/";
/// Preferred prefix for [`APPLE_DESKTOP_NS`].
pub const APPLE_DESKTOP_PREFIX: &str = "apple_desktop";

#[derive(Clone, Debug, PartialEq, Eq)]
struct Property {
    namespace: String,
    name: String,
    value: String,
}

/// An XMP packet holding simple string properties.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XmpPacket {
    /// `(prefix, uri)` in registration order.
    namespaces: Vec<(String, String)>,
    properties: Vec<Property>,
}

impl XmpPacket {
    /// Empty packet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `prefix` to `uri`. Re-registering the same pair is a no-op.
    pub fn register_namespace(&mut self, uri: &str, prefix: &str) -> Result<(), MetadataError> {
        if uri.is_empty() {
            return Err(MetadataError::NamespaceNotRegistered(
                "namespace uri is empty".to_string(),
            ));
        }
        if !is_ncname(prefix) || RESERVED_PREFIXES.contains(&prefix) {
            return Err(MetadataError::NamespaceNotRegistered(format!(
                "'{prefix}' is not a usable prefix"
            )));
        }
        for (p, u) in &self.namespaces {
            match (p == prefix, u == uri) {
                (true, true) => return Ok(()),
                (true, false) => {
                    return Err(MetadataError::NamespaceNotRegistered(format!(
                        "prefix '{prefix}' is already bound to '{u}'"
                    )));
                }
                (false, true) => {
                    return Err(MetadataError::NamespaceNotRegistered(format!(
                        "'{uri}' is already registered as '{p}'"
                    )));
                }
                (false, false) => {}
            }
        }
        self.namespaces.push((prefix.to_string(), uri.to_string()));
        Ok(())
    }

    /// Set the string property `name` in namespace `uri`, replacing any previous value.
    pub fn set_tag(&mut self, uri: &str, name: &str, value: &str) -> Result<(), MetadataError> {
        if !is_ncname(name) {
            return Err(MetadataError::TagNotCreated(format!(
                "'{name}' is not a valid property name"
            )));
        }
        if self.prefix_for(uri).is_none() {
            return Err(MetadataError::TagNotSet(format!(
                "namespace '{uri}' is not registered"
            )));
        }

        match self
            .properties
            .iter_mut()
            .find(|p| p.namespace == uri && p.name == name)
        {
            Some(p) => p.value = value.to_string(),
            None => self.properties.push(Property {
                namespace: uri.to_string(),
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
        Ok(())
    }

    /// Value of property `name` in namespace `uri`.
    pub fn tag(&self, uri: &str, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.namespace == uri && p.name == name)
            .map(|p| p.value.as_str())
    }

    /// All `(name, value)` pairs stored under namespace `uri`.
    pub fn tags_in<'a>(&'a self, uri: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.properties
            .iter()
            .filter(move |p| p.namespace == uri)
            .map(|p| (p.name.as_str(), p.value.as_str()))
    }

    fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.namespaces
            .iter()
            .find(|(_, u)| u == uri)
            .map(|(p, _)| p.as_str())
    }

    /// Serialize as an `x:xmpmeta` RDF/XML document.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MetadataError> {
        self.write().map_err(|e| MetadataError::TagNotSet(e.to_string()))
    }

    fn write(&self) -> anyhow::Result<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 1);

        let mut root = BytesStart::new("x:xmpmeta");
        root.push_attribute(("xmlns:x", X_NS));
        root.push_attribute(("x:xmptk", "dynawall"));
        writer.write_event(Event::Start(root))?;

        let mut rdf = BytesStart::new("rdf:RDF");
        rdf.push_attribute(("xmlns:rdf", RDF_NS));
        writer.write_event(Event::Start(rdf))?;

        let mut desc = BytesStart::new("rdf:Description");
        desc.push_attribute(("rdf:about", ""));
        for (prefix, uri) in &self.namespaces {
            let key = format!("xmlns:{prefix}");
            desc.push_attribute((key.as_str(), uri.as_str()));
        }
        writer.write_event(Event::Start(desc))?;

        for prop in &self.properties {
            let prefix = self
                .prefix_for(&prop.namespace)
                .ok_or_else(|| anyhow::anyhow!("namespace '{}' lost its prefix", prop.namespace))?;
            let qname = format!("{prefix}:{}", prop.name);
            writer.write_event(Event::Start(BytesStart::new(qname.as_str())))?;
            writer.write_event(Event::Text(BytesText::new(&prop.value)))?;
            writer.write_event(Event::End(BytesEnd::new(qname.as_str())))?;
        }

        writer.write_event(Event::End(BytesEnd::new("rdf:Description")))?;
        writer.write_event(Event::End(BytesEnd::new("rdf:RDF")))?;
        writer.write_event(Event::End(BytesEnd::new("x:xmpmeta")))?;
        Ok(writer.into_inner())
    }

    /// Parse an XMP packet. Unknown structure is skipped rather than rejected.
    pub fn parse(bytes: &[u8]) -> Result<Self, MetadataError> {
        let mut reader = Reader::from_reader(bytes);
        reader.config_mut().trim_text(true);

        let mut prefixes: HashMap<String, String> = HashMap::new();
        let mut stack: Vec<String> = Vec::new();
        let mut pending: Vec<(String, String)> = Vec::new();
        let mut buf = Vec::new();

        loop {
            let event = reader.read_event_into(&mut buf).map_err(malformed)?;
            match event {
                Event::Start(e) => {
                    let name = scan_element(&e, &mut prefixes, &mut pending)?;
                    stack.push(name);
                }
                Event::Empty(e) => {
                    scan_element(&e, &mut prefixes, &mut pending)?;
                }
                Event::Text(t) => {
                    let in_property = stack.len() >= 2
                        && stack[stack.len() - 2] == "rdf:Description"
                        && is_property_name(&stack[stack.len() - 1]);
                    if in_property {
                        let value = t.unescape().map_err(malformed)?.into_owned();
                        pending.push((stack[stack.len() - 1].clone(), value));
                    }
                }
                Event::End(_) => {
                    stack.pop();
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        let mut packet = XmpPacket::new();
        for (qname, value) in pending {
            let Some((prefix, local)) = qname.split_once(':') else {
                continue;
            };
            let Some(uri) = prefixes.get(prefix) else {
                continue;
            };
            if packet.prefix_for(uri).is_none() {
                packet.register_namespace(uri, prefix)?;
            }
            packet.set_tag(uri, local, &value)?;
        }
        Ok(packet)
    }
}

fn malformed(e: impl std::fmt::Display) -> MetadataError {
    MetadataError::malformed(format!("xmp: {e}"))
}

/// Record namespace declarations and attribute-form properties; returns the element name.
fn scan_element(
    e: &BytesStart<'_>,
    prefixes: &mut HashMap<String, String>,
    pending: &mut Vec<(String, String)>,
) -> Result<String, MetadataError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    for attr in e.attributes() {
        let attr = attr.map_err(malformed)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(malformed)?.into_owned();
        if let Some(prefix) = key.strip_prefix("xmlns:") {
            prefixes.insert(prefix.to_string(), value);
        } else if name == "rdf:Description" && is_property_name(&key) {
            pending.push((key, value));
        }
    }
    Ok(name)
}

fn is_property_name(qname: &str) -> bool {
    match qname.split_once(':') {
        Some((prefix, local)) => !RESERVED_PREFIXES.contains(&prefix) && is_ncname(local),
        None => false,
    }
}

fn is_ncname(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
#[path = "../../tests/unit/metadata/xmp.rs"]
mod tests;
