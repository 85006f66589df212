//! Minimal XML element tree shared by the MVR and GDTF readers and writers
//!
//! Both file formats are small attribute-heavy documents whose element
//! nesting is recursive (child lists, geometry trees). Parsing them into an
//! [`XmlElement`] tree first lets the typed parsers walk children freely,
//! and the writer emits every node through the same structure.

use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

/// Number of leading characters checked for a DOCTYPE declaration
const DOCTYPE_CHECK_LEN: usize = 2000;

/// A parsed or to-be-written XML element
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    /// Local element name (namespace prefix stripped when parsing)
    pub name: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Child elements in document order
    pub children: Vec<XmlElement>,
    /// Concatenated text content, trimmed
    pub text: String,
}

impl XmlElement {
    /// Create an empty element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Get an attribute value by name
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Add an attribute (builder style)
    pub fn with_attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Add an attribute only when a value is present
    pub fn with_opt_attr(mut self, key: &str, value: Option<impl Into<String>>) -> Self {
        if let Some(value) = value {
            self.set_attr(key, value);
        }
        self
    }

    /// Set or replace an attribute
    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(slot) = self.attributes.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
        } else {
            self.attributes.push((key.to_string(), value));
        }
    }

    /// Set the text content (builder style)
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Append a child element
    pub fn push(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    /// Append a child element that only carries text, when the text is present
    pub fn push_text_child(&mut self, name: &str, text: Option<impl Into<String>>) {
        if let Some(text) = text {
            self.children.push(XmlElement::new(name).with_text(text));
        }
    }

    /// First child with the given name
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text of the first child with the given name, if not empty
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.text.as_str())
            .filter(|t| !t.is_empty())
    }
}

/// Extract local name from a potentially namespaced XML name
///
/// - `"mvr:Fixture"` returns `"Fixture"`
/// - `"Fixture"` returns `"Fixture"`
pub(crate) fn get_local_name(name_str: &str) -> &str {
    if let Some(pos) = name_str.rfind(':') {
        &name_str[pos + 1..]
    } else {
        name_str
    }
}

/// Parse an XML document into its root element
pub fn parse_document(xml: &str) -> Result<XmlElement> {
    // DTD declarations can lead to XXE (XML External Entity) attacks
    let check_len = xml.len().min(DOCTYPE_CHECK_LEN);
    let head = xml.get(..check_len).unwrap_or(xml);
    if head.to_lowercase().contains("<!doctype") {
        return Err(Error::InvalidXml(
            "DTD declarations are not allowed".to_string(),
        ));
    }

    // Text is trimmed per element on close so entity references keep their
    // surrounding spaces.
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => {
                stack.push(element_from_start(e)?);
            }
            Event::Empty(ref e) => {
                let element = element_from_start(e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let mut element = stack
                    .pop()
                    .ok_or_else(|| Error::InvalidXml("Unbalanced closing tag".to_string()))?;
                let trimmed = element.text.trim();
                if trimmed.len() != element.text.len() {
                    element.text = trimmed.to_string();
                }
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(ref t) => {
                if let Some(current) = stack.last_mut() {
                    let text = t.decode().map_err(|e| Error::InvalidXml(e.to_string()))?;
                    current.text.push_str(&text);
                }
            }
            Event::CData(ref t) => {
                if let Some(current) = stack.last_mut() {
                    let text = std::str::from_utf8(t.as_ref())
                        .map_err(|e| Error::InvalidXml(e.to_string()))?;
                    current.text.push_str(text);
                }
            }
            Event::GeneralRef(ref r) => {
                if let Some(current) = stack.last_mut() {
                    if let Some(ch) = r
                        .resolve_char_ref()
                        .map_err(|e| Error::InvalidXml(e.to_string()))?
                    {
                        current.text.push(ch);
                    } else {
                        let name = r.decode().map_err(|e| Error::InvalidXml(e.to_string()))?;
                        let resolved = quick_xml::escape::resolve_predefined_entity(&name)
                            .ok_or_else(|| {
                                Error::InvalidXml(format!("Unknown entity reference '&{};'", name))
                            })?;
                        current.text.push_str(resolved);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(Error::InvalidXml(format!(
            "Unclosed element '<{}>'",
            stack.last().map(|e| e.name.as_str()).unwrap_or_default()
        )));
    }

    root.ok_or_else(|| Error::InvalidXml("Document has no root element".to_string()))
}

fn element_from_start(e: &BytesStart) -> Result<XmlElement> {
    let name = e.name();
    let name_str =
        std::str::from_utf8(name.as_ref()).map_err(|e| Error::InvalidXml(e.to_string()))?;
    let mut element = XmlElement::new(get_local_name(name_str));

    for attr in e.attributes() {
        let attr = attr?;
        let key =
            std::str::from_utf8(attr.key.as_ref()).map_err(|e| Error::InvalidXml(e.to_string()))?;
        if key.starts_with("xmlns") {
            continue;
        }
        let value = attr
            .unescape_value()
            .map_err(|e| Error::XmlAttr(format!("Attribute '{}': {}", key, e)))?;
        element
            .attributes
            .push((get_local_name(key).to_string(), value.into_owned()));
    }

    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        Ok(())
    } else if root.is_none() {
        *root = Some(element);
        Ok(())
    } else {
        Err(Error::InvalidXml(
            "Document has more than one root element".to_string(),
        ))
    }
}

/// Serialize an element tree into an XML document string
///
/// Output is deterministic: attributes and children are written in the order
/// they are stored, elements without children or text are self-closing.
pub fn write_document(root: &XmlElement) -> Result<String> {
    let mut buffer = Vec::new();
    let mut writer = Writer::new_with_indent(&mut buffer, b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("no"))))
        .map_err(|e| Error::xml_write(format!("Failed to write XML declaration: {}", e)))?;

    write_element(&mut writer, root)?;

    String::from_utf8(buffer)
        .map_err(|e| Error::xml_write(format!("Failed to convert XML to UTF-8: {}", e)))
}

fn write_element<W: std::io::Write>(writer: &mut Writer<W>, element: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() && element.text.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| Error::xml_write(format!("Failed to write <{}>: {}", element.name, e)));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| Error::xml_write(format!("Failed to write <{}>: {}", element.name, e)))?;

    if !element.text.is_empty() {
        writer
            .write_event(Event::Text(BytesText::new(&element.text)))
            .map_err(|e| {
                Error::xml_write(format!("Failed to write text of <{}>: {}", element.name, e))
            })?;
    }

    for child in &element.children {
        write_element(writer, child)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(|e| Error::xml_write(format!("Failed to close <{}>: {}", element.name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_document() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<Root a="1">
  <Child name="x &amp; y">hello</Child>
  <Child name="z"/>
</Root>"#;
        let root = parse_document(xml).unwrap();
        assert_eq!(root.name, "Root");
        assert_eq!(root.attr("a"), Some("1"));
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].attr("name"), Some("x & y"));
        assert_eq!(root.children[0].text, "hello");
        assert_eq!(root.children_named("Child").count(), 2);
    }

    #[test]
    fn test_parse_strips_namespace_prefix() {
        let xml = r#"<m:Root xmlns:m="urn:x"><m:Item m:uuid="U"/></m:Root>"#;
        let root = parse_document(xml).unwrap();
        assert_eq!(root.name, "Root");
        assert_eq!(root.children[0].name, "Item");
        assert_eq!(root.children[0].attr("uuid"), Some("U"));
        assert!(root.attr("xmlns:m").is_none());
    }

    #[test]
    fn test_text_entity_references_resolve() {
        let root = parse_document("<Name>Truss &amp; Pipe &#65;</Name>").unwrap();
        assert_eq!(root.text, "Truss & Pipe A");
    }

    #[test]
    fn test_reject_doctype() {
        let xml = r#"<?xml version="1.0"?><!DOCTYPE foo [<!ENTITY x "y">]><Root/>"#;
        assert!(parse_document(xml).is_err());
    }

    #[test]
    fn test_unclosed_element_is_error() {
        assert!(parse_document("<Root><Child></Root>").is_err());
    }

    #[test]
    fn test_write_then_parse_keeps_structure() {
        let mut root = XmlElement::new("Root").with_attr("verMajor", "1");
        root.push(XmlElement::new("Empty"));
        root.push_text_child("Text", Some("a < b"));
        root.push_text_child("Skipped", None::<String>);

        let xml = write_document(&root).unwrap();
        assert!(xml.contains("<Empty/>"));
        assert!(!xml.contains("Skipped"));

        let parsed = parse_document(&xml).unwrap();
        assert_eq!(parsed.child_text("Text"), Some("a < b"));
        assert_eq!(parsed.attr("verMajor"), Some("1"));
    }

    #[test]
    fn test_optional_attribute_dropped() {
        let element = XmlElement::new("Fixture")
            .with_opt_attr("name", Some("Spot"))
            .with_opt_attr("multipatch", None::<String>);
        assert_eq!(element.attributes.len(), 1);
    }
}
