//! Owned DOM-like element tree.
//!
//! Model objects parse themselves from, and serialize themselves to, this
//! tree. Reading goes through `roxmltree`; writing is a small indenting
//! emitter. Namespaces are stored per element; `None` means "same as the
//! parent", which is how the emitter decides where `xmlns` declarations
//! are needed.

use std::fmt::Write as _;

use roxmltree::{Document, Node};

use crate::error::OmeError;

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// An attribute in a namespace, such as `xsi:schemaLocation`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QualifiedAttribute {
    pub namespace: String,
    /// Prefix from the source document, reused on output.
    pub prefix: Option<String>,
    pub name: String,
    pub value: String,
}

/// An XML element with its attributes, text and child elements.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    /// Local tag name (no prefix).
    pub name: String,
    /// Namespace URI, or `None` to inherit the parent's namespace.
    pub namespace: Option<String>,
    /// Unqualified attributes in insertion order.
    pub attributes: Vec<(String, String)>,
    /// Namespaced attributes. The writer declares their prefixes on this
    /// element.
    pub qualified_attributes: Vec<QualifiedAttribute>,
    /// Child elements in document order.
    pub children: Vec<Element>,
    /// Concatenated character data of this element, if any.
    pub text: Option<String>,
}

impl Element {
    /// Creates an empty element that inherits its parent's namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Creates an empty element in the given namespace.
    pub fn with_namespace(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
            ..Default::default()
        }
    }

    /// Creates a text-only element such as `<Description>…</Description>`.
    pub fn text_element(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Returns the value of an attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Sets an attribute, replacing any previous value.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Sets an attribute only when a value is present.
    pub fn set_optional_attribute<T: ToString>(&mut self, name: &str, value: Option<&T>) {
        if let Some(value) = value {
            self.set_attribute(name, value.to_string());
        }
    }

    pub fn append_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Direct children whose tag name equals `tag`, in document order.
    pub fn children_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == tag)
    }

    /// Character data with surrounding whitespace removed.
    pub fn text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    /// Parses XML text into an element tree rooted at the document element.
    pub fn from_xml_str(xml: &str) -> Result<Self, OmeError> {
        let document = Document::parse(xml).map_err(|source| OmeError::XmlParse {
            path: "<string>".into(),
            message: source.to_string(),
        })?;
        Ok(Self::from_node(document.root_element()))
    }

    /// Converts a `roxmltree` element node (and its subtree) into an owned element.
    pub fn from_node(node: Node<'_, '_>) -> Self {
        let mut element = Element {
            name: node.tag_name().name().to_string(),
            namespace: node.tag_name().namespace().map(ToOwned::to_owned),
            ..Default::default()
        };

        for attr in node.attributes() {
            match attr.namespace() {
                None => element
                    .attributes
                    .push((attr.name().to_string(), attr.value().to_string())),
                Some(namespace) => element.qualified_attributes.push(QualifiedAttribute {
                    namespace: namespace.to_string(),
                    prefix: node.lookup_prefix(namespace).map(ToOwned::to_owned),
                    name: attr.name().to_string(),
                    value: attr.value().to_string(),
                }),
            }
        }

        let mut text = String::new();
        for child in node.children() {
            if child.is_element() {
                element.children.push(Self::from_node(child));
            } else if child.is_text() {
                if let Some(chunk) = child.text() {
                    text.push_str(chunk);
                }
            }
        }
        if !text.trim().is_empty() {
            element.text = Some(text);
        }

        element
    }

    /// Serializes the element tree as indented XML (no declaration).
    pub fn to_xml_string(&self) -> Result<String, OmeError> {
        let mut out = String::new();
        self.write_into(&mut out, None, 0)?;
        Ok(out)
    }

    fn write_into(
        &self,
        out: &mut String,
        parent_ns: Option<&str>,
        depth: usize,
    ) -> std::fmt::Result {
        let indent = "  ".repeat(depth);
        let effective_ns = self.namespace.as_deref().or(parent_ns);

        write!(out, "{indent}<{}", self.name)?;
        if effective_ns != parent_ns {
            if let Some(ns) = effective_ns {
                write!(out, " xmlns=\"{}\"", xml_escape(ns))?;
            }
        }
        for (key, value) in &self.attributes {
            write!(out, " {}=\"{}\"", key, xml_escape(value))?;
        }
        self.write_qualified_attributes(out)?;

        let text = self.text();
        match (text, self.children.is_empty()) {
            (None, true) => writeln!(out, "/>")?,
            (Some(text), true) => writeln!(out, ">{}</{}>", xml_escape(text), self.name)?,
            (text, false) => {
                writeln!(out, ">")?;
                if let Some(text) = text {
                    writeln!(out, "{indent}  {}", xml_escape(text))?;
                }
                for child in &self.children {
                    child.write_into(out, effective_ns, depth + 1)?;
                }
                writeln!(out, "{indent}</{}>", self.name)?;
            }
        }
        Ok(())
    }

    /// Writes namespaced attributes, declaring each prefix they use.
    ///
    /// A source prefix is kept unless it is already bound to another
    /// namespace on this element; attributes without one get `ns0`, `ns1`...
    fn write_qualified_attributes(&self, out: &mut String) -> std::fmt::Result {
        let mut declared: Vec<(String, &str)> = Vec::new();
        let mut written = Vec::with_capacity(self.qualified_attributes.len());
        for attr in &self.qualified_attributes {
            if attr.namespace == XML_NS {
                written.push(("xml".to_string(), attr));
                continue;
            }
            let bound = declared
                .iter()
                .find(|(_, namespace)| *namespace == attr.namespace)
                .map(|(prefix, _)| prefix.clone());
            let prefix = match bound {
                Some(prefix) => prefix,
                None => {
                    let prefix = attr
                        .prefix
                        .clone()
                        .filter(|wanted| declared.iter().all(|(taken, _)| taken != wanted))
                        .unwrap_or_else(|| {
                            (0..)
                                .map(|n| format!("ns{n}"))
                                .find(|candidate| declared.iter().all(|(taken, _)| taken != candidate))
                                .unwrap_or_default()
                        });
                    declared.push((prefix.clone(), attr.namespace.as_str()));
                    prefix
                }
            };
            written.push((prefix, attr));
        }

        for (prefix, namespace) in &declared {
            write!(out, " xmlns:{}=\"{}\"", prefix, xml_escape(namespace))?;
        }
        for (prefix, attr) in written {
            write!(out, " {}:{}=\"{}\"", prefix, attr.name, xml_escape(&attr.value))?;
        }
        Ok(())
    }

    /// Structural equivalence: same names, effective namespaces, attribute
    /// sets (order-insensitive, prefixes ignored), trimmed text, and
    /// children in order.
    pub fn is_equivalent(&self, other: &Element) -> bool {
        self.equivalent_under(other, None, None)
    }

    fn equivalent_under(
        &self,
        other: &Element,
        self_parent_ns: Option<&str>,
        other_parent_ns: Option<&str>,
    ) -> bool {
        let self_ns = self.namespace.as_deref().or(self_parent_ns);
        let other_ns = other.namespace.as_deref().or(other_parent_ns);
        if self.name != other.name || self_ns != other_ns || self.text() != other.text() {
            return false;
        }

        let mut self_attrs: Vec<_> = self.attributes.iter().collect();
        let mut other_attrs: Vec<_> = other.attributes.iter().collect();
        self_attrs.sort();
        other_attrs.sort();
        if self_attrs != other_attrs || self.children.len() != other.children.len() {
            return false;
        }
        if qualified_set(self) != qualified_set(other) {
            return false;
        }

        self.children
            .iter()
            .zip(&other.children)
            .all(|(a, b)| a.equivalent_under(b, self_ns, other_ns))
    }
}

fn qualified_set(element: &Element) -> Vec<(&str, &str, &str)> {
    let mut set: Vec<_> = element
        .qualified_attributes
        .iter()
        .map(|attr| (attr.namespace.as_str(), attr.name.as_str(), attr.value.as_str()))
        .collect();
    set.sort_unstable();
    set
}

pub(crate) fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_namespace_attributes_and_text() {
        let xml = r#"<OME xmlns="urn:a"><Image ID="Image:0" Name="x"><Description> hi </Description></Image></OME>"#;
        let root = Element::from_xml_str(xml).expect("parse");
        assert_eq!(root.namespace.as_deref(), Some("urn:a"));
        let image = root.children_by_tag("Image").next().expect("image");
        assert_eq!(image.attribute("ID"), Some("Image:0"));
        assert_eq!(image.namespace.as_deref(), Some("urn:a"));
        let description = image.children_by_tag("Description").next().expect("desc");
        assert_eq!(description.text(), Some("hi"));
    }

    #[test]
    fn parse_rejects_malformed_xml() {
        let err = Element::from_xml_str("<OME><Image></OME>").unwrap_err();
        assert!(matches!(err, OmeError::XmlParse { .. }));
    }

    #[test]
    fn writer_only_declares_namespace_changes() {
        let mut root = Element::with_namespace("OME", "urn:a");
        let mut sa = Element::with_namespace("StructuredAnnotations", "urn:b");
        sa.append_child(Element::text_element("Value", "1 < 2"));
        root.append_child(Element::with_namespace("Image", "urn:a"));
        root.append_child(sa);

        let xml = root.to_xml_string().expect("write");
        assert_eq!(xml.matches("xmlns=").count(), 2);
        assert!(xml.contains("<Image/>"));
        assert!(xml.contains("<Value>1 &lt; 2</Value>"));

        let reparsed = Element::from_xml_str(&xml).expect("reparse");
        assert!(reparsed.is_equivalent(&root));
    }

    #[test]
    fn equivalence_ignores_attribute_order() {
        let mut a = Element::new("Channel");
        a.set_attribute("ID", "Channel:0");
        a.set_attribute("Name", "DAPI");
        let mut b = Element::new("Channel");
        b.set_attribute("Name", "DAPI");
        b.set_attribute("ID", "Channel:0");
        assert!(a.is_equivalent(&b));

        b.set_attribute("Name", "GFP");
        assert!(!a.is_equivalent(&b));
    }

    #[test]
    fn namespaced_attributes_are_written_back() {
        let root = Element::from_xml_str(
            r#"<x xmlns:q="urn:q" q:a="1" b="2" xml:lang="en"><y q:c="3"/></x>"#,
        )
        .expect("parse");
        assert_eq!(root.attributes, vec![("b".to_string(), "2".to_string())]);
        assert_eq!(root.qualified_attributes.len(), 2);
        assert_eq!(root.qualified_attributes[0].prefix.as_deref(), Some("q"));

        let xml = root.to_xml_string().expect("write");
        assert!(xml.starts_with(r#"<x b="2" xmlns:q="urn:q" q:a="1" xml:lang="en">"#), "{xml}");
        assert!(xml.contains(r#"<y xmlns:q="urn:q" q:c="3"/>"#), "{xml}");
        assert!(!xml.contains("xmlns:xml"));

        let reparsed = Element::from_xml_str(&xml).expect("reparse");
        assert!(reparsed.is_equivalent(&root));
    }

    #[test]
    fn unprefixed_namespaces_get_generated_prefixes() {
        let mut e = Element::new("x");
        for (namespace, name) in [("urn:a", "one"), ("urn:b", "two"), ("urn:a", "three")] {
            e.qualified_attributes.push(QualifiedAttribute {
                namespace: namespace.into(),
                prefix: None,
                name: name.into(),
                value: "v".into(),
            });
        }
        let xml = e.to_xml_string().expect("write");
        assert_eq!(
            xml.trim_end(),
            r#"<x xmlns:ns0="urn:a" xmlns:ns1="urn:b" ns0:one="v" ns1:two="v" ns0:three="v"/>"#
        );
    }

    #[test]
    fn equivalence_sees_namespaced_attributes() {
        let with = Element::from_xml_str(r#"<x xmlns:q="urn:q" q:a="1"/>"#).expect("parse");
        let renamed = Element::from_xml_str(r#"<x xmlns:p="urn:q" p:a="1"/>"#).expect("parse");
        let without = Element::from_xml_str("<x/>").expect("parse");
        assert!(with.is_equivalent(&renamed));
        assert!(!with.is_equivalent(&without));
    }

    #[test]
    fn set_attribute_replaces_existing_value() {
        let mut e = Element::new("Pixels");
        e.set_attribute("SizeX", "1");
        e.set_attribute("SizeX", "2");
        assert_eq!(e.attributes.len(), 1);
        assert_eq!(e.attribute("SizeX"), Some("2"));
    }
}
