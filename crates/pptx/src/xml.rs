//! Mutable element tree for package parts.
//!
//! Text and attribute values are stored exactly as they appear in the source
//! (still escaped), so everything the restyler does not touch is written back
//! unchanged apart from empty elements collapsing to `<x/>`.

use quick_xml::escape::{escape, unescape};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use restyle_core::{Error, Result};

/// A node in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Character data, still escaped.
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    DocType(String),
}

/// An XML element with its qualified name (`a:srgbClr`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    /// Create an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder form of [`Element::set_attr`].
    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder form of [`Element::push`].
    pub fn with_child(mut self, child: Element) -> Self {
        self.push(child);
        self
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
        let mut element = Self::new(name);

        for attr in start.attributes() {
            let attr = attr.map_err(|e| {
                Error::XmlError(format!("Bad attribute in <{}>: {}", element.name, e))
            })?;
            // Values are always written double-quoted, so a raw `"` from a
            // single-quoted attribute must become an entity.
            let value = String::from_utf8_lossy(&attr.value).replace('"', "&quot;");
            element.attributes.push((
                String::from_utf8_lossy(attr.key.as_ref()).to_string(),
                value,
            ));
        }

        Ok(element)
    }

    /// Name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Whether this element has the given local name.
    pub fn is(&self, local: &str) -> bool {
        self.local_name() == local
    }

    /// Raw (escaped) attribute value.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Attributes in document order, values still escaped.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Attribute value with entities resolved.
    pub fn attr_unescaped(&self, key: &str) -> Option<String> {
        let raw = self.attr(key)?;
        Some(
            unescape(raw)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| raw.to_string()),
        )
    }

    /// Set an attribute, escaping the value.
    pub fn set_attr(&mut self, key: &str, value: &str) {
        let value = escape(value).into_owned();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    /// Append a child element.
    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Mutable child elements in document order.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Child elements with the given local name.
    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |e| e.is(local))
    }

    /// Mutable child elements with the given local name.
    pub fn children_named_mut<'a>(
        &'a mut self,
        local: &'a str,
    ) -> impl Iterator<Item = &'a mut Element> + 'a {
        self.elements_mut().filter(move |e| e.is(local))
    }

    /// First child element with the given local name.
    pub fn child(&self, local: &str) -> Option<&Element> {
        self.elements().find(|e| e.is(local))
    }

    /// First mutable child element with the given local name.
    pub fn child_mut(&mut self, local: &str) -> Option<&mut Element> {
        self.elements_mut().find(|e| e.is(local))
    }

    /// Follow a path of local names through first matching children.
    pub fn find(&self, path: &[&str]) -> Option<&Element> {
        path.iter()
            .try_fold(self, |element, local| element.child(local))
    }

    /// Mutable form of [`Element::find`].
    pub fn find_mut(&mut self, path: &[&str]) -> Option<&mut Element> {
        let mut element = self;
        for local in path {
            element = element.child_mut(local)?;
        }
        Some(element)
    }

    /// Remove child elements matching `predicate`, returning how many went.
    pub fn remove_children<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&Element) -> bool,
    {
        let before = self.children.len();
        self.children
            .retain(|node| !matches!(node, Node::Element(e) if predicate(e)));
        before - self.children.len()
    }

    /// Insert `child` at node index `index` and return it.
    pub fn insert_child(&mut self, index: usize, child: Element) -> &mut Element {
        let index = index.min(self.children.len());
        self.children.insert(index, Node::Element(child));
        match &mut self.children[index] {
            Node::Element(e) => e,
            _ => unreachable!("an element was just inserted at this index"),
        }
    }

    /// Insert `child` before the first child element whose local name is in
    /// `followers`, or at the end. Keeps schema sequence order intact.
    pub fn insert_before_any(&mut self, child: Element, followers: &[&str]) -> &mut Element {
        let index = self
            .children
            .iter()
            .position(|node| matches!(node, Node::Element(e) if followers.contains(&e.local_name())))
            .unwrap_or(self.children.len());
        self.insert_child(index, child)
    }

    /// First child with local name `local`, created as `name` in schema
    /// position when missing.
    pub fn get_or_insert_child(
        &mut self,
        local: &str,
        name: &str,
        followers: &[&str],
    ) -> &mut Element {
        let existing = self
            .children
            .iter()
            .position(|node| matches!(node, Node::Element(e) if e.is(local)));

        match existing {
            Some(index) => match &mut self.children[index] {
                Node::Element(e) => e,
                _ => unreachable!("position matched an element"),
            },
            None => self.insert_before_any(Element::new(name), followers),
        }
    }
}

/// The XML declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

impl Declaration {
    fn from_event(decl: &BytesDecl<'_>) -> Result<Self> {
        let text = |bytes: std::borrow::Cow<'_, [u8]>| String::from_utf8_lossy(&bytes).to_string();
        let xml_err = |e: quick_xml::Error| Error::XmlError(format!("Bad XML declaration: {}", e));

        Ok(Self {
            version: text(decl.version().map_err(xml_err)?),
            encoding: decl.encoding().transpose().map_err(xml_err)?.map(text),
            standalone: decl.standalone().transpose().map_err(xml_err)?.map(text),
        })
    }
}

/// A whole XML part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub declaration: Option<Declaration>,
    /// Nodes between the declaration and the root element.
    pub prolog: Vec<Node>,
    pub root: Element,
    /// Nodes after the root element.
    pub epilog: Vec<Node>,
}

impl XmlDocument {
    /// Parse a complete XML document.
    pub fn parse(content: &str) -> Result<Self> {
        let mut reader = Reader::from_str(content);
        reader.trim_text(false);

        let mut declaration = None;
        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut root: Option<Element> = None;
        let mut stack: Vec<Element> = Vec::new();

        loop {
            let event = reader.read_event().map_err(|e| {
                Error::XmlError(format!("at position {}: {}", reader.buffer_position(), e))
            })?;

            let node = match event {
                Event::Decl(ref decl) => {
                    declaration = Some(Declaration::from_event(decl)?);
                    continue;
                }
                Event::Start(ref e) => {
                    stack.push(Element::from_start(e)?);
                    continue;
                }
                Event::End(_) => match stack.pop() {
                    Some(element) => Node::Element(element),
                    None => return Err(Error::XmlError("Unbalanced end tag".to_string())),
                },
                Event::Empty(ref e) => Node::Element(Element::from_start(e)?),
                Event::Text(e) => Node::Text(String::from_utf8_lossy(&e.into_inner()).to_string()),
                Event::CData(e) => {
                    Node::CData(String::from_utf8_lossy(&e.into_inner()).to_string())
                }
                Event::Comment(e) => {
                    Node::Comment(String::from_utf8_lossy(&e.into_inner()).to_string())
                }
                Event::PI(e) => Node::ProcessingInstruction(
                    String::from_utf8_lossy(&e.into_inner()).to_string(),
                ),
                Event::DocType(e) => {
                    Node::DocType(String::from_utf8_lossy(&e.into_inner()).to_string())
                }
                Event::Eof => break,
            };

            if let Some(parent) = stack.last_mut() {
                parent.children.push(node);
                continue;
            }

            match node {
                Node::Element(element) if root.is_none() => root = Some(element),
                Node::Element(element) => {
                    return Err(Error::XmlError(format!(
                        "Second root element <{}>",
                        element.name
                    )));
                }
                other if root.is_none() => prolog.push(other),
                other => epilog.push(other),
            }
        }

        if let Some(open) = stack.last() {
            return Err(Error::XmlError(format!("Unclosed element <{}>", open.name)));
        }

        let root = root.ok_or_else(|| Error::XmlError("Document has no root element".to_string()))?;

        Ok(Self {
            declaration,
            prolog,
            root,
            epilog,
        })
    }

    /// Serialize the document.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());

        if let Some(decl) = &self.declaration {
            write_event(
                &mut writer,
                Event::Decl(BytesDecl::new(
                    &decl.version,
                    decl.encoding.as_deref(),
                    decl.standalone.as_deref(),
                )),
            )?;
        }

        for node in &self.prolog {
            write_node(&mut writer, node)?;
        }
        write_element(&mut writer, &self.root)?;
        for node in &self.epilog {
            write_node(&mut writer, node)?;
        }

        Ok(writer.into_inner())
    }
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::XmlWriteError(e.to_string()))
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node) -> Result<()> {
    match node {
        Node::Element(element) => write_element(writer, element),
        Node::Text(text) => write_event(writer, Event::Text(BytesText::from_escaped(text.as_str()))),
        Node::CData(data) => write_event(writer, Event::CData(BytesCData::new(data.as_str()))),
        Node::Comment(text) => {
            write_event(writer, Event::Comment(BytesText::from_escaped(text.as_str())))
        }
        Node::ProcessingInstruction(text) => {
            write_event(writer, Event::PI(BytesText::from_escaped(text.as_str())))
        }
        Node::DocType(text) => {
            write_event(writer, Event::DocType(BytesText::from_escaped(text.as_str())))
        }
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute(Attribute::from((key.as_bytes(), value.as_bytes())));
    }

    if element.children.is_empty() {
        return write_event(writer, Event::Empty(start));
    }

    write_event(writer, Event::Start(start))?;
    for child in &element.children {
        write_node(writer, child)?;
    }
    write_event(writer, Event::End(BytesEnd::new(element.name.as_str())))
}

/// Extract the local name from a potentially namespaced XML name.
pub fn local_name(name: &str) -> &str {
    match name.split_once(':') {
        Some((_, local)) => local,
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:sp><p:nvSpPr><p:cNvPr id="2" name="Title &amp; Body"/></p:nvSpPr><p:txBody><a:p><a:r><a:t>R&amp;D  </a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#;

    #[test]
    fn test_local_name() {
        assert_eq!(local_name("p:sp"), "sp");
        assert_eq!(local_name("a:t"), "t");
        assert_eq!(local_name("sp"), "sp");
    }

    #[test]
    fn test_parse_and_navigate() {
        let doc = XmlDocument::parse(SAMPLE).unwrap();
        assert_eq!(doc.root.name, "p:sld");

        let declaration = doc.declaration.as_ref().unwrap();
        assert_eq!(declaration.version, "1.0");
        assert_eq!(declaration.encoding.as_deref(), Some("UTF-8"));
        assert_eq!(declaration.standalone.as_deref(), Some("yes"));

        let c_nv_pr = doc
            .root
            .find(&["cSld", "spTree", "sp", "nvSpPr", "cNvPr"])
            .unwrap();
        assert_eq!(c_nv_pr.attr("name"), Some("Title &amp; Body"));
        assert_eq!(c_nv_pr.attr_unescaped("name").as_deref(), Some("Title & Body"));
    }

    #[test]
    fn test_round_trip_preserves_content() {
        let doc = XmlDocument::parse(SAMPLE).unwrap();
        let bytes = doc.to_bytes().unwrap();
        let written = String::from_utf8(bytes).unwrap();

        assert!(written.contains("<a:t>R&amp;D  </a:t>"));
        assert!(written.contains(r#"name="Title &amp; Body""#));
        assert_eq!(XmlDocument::parse(&written).unwrap(), doc);
    }

    #[test]
    fn test_set_attr_escapes() {
        let mut element = Element::new("a:latin");
        element.set_attr("typeface", "A&B");
        assert_eq!(element.attr("typeface"), Some("A&amp;B"));
        assert_eq!(element.attr_unescaped("typeface").as_deref(), Some("A&B"));

        element.set_attr("typeface", "C");
        assert_eq!(element.attr("typeface"), Some("C"));
    }

    #[test]
    fn test_insert_before_any_keeps_order() {
        let mut sp_pr = Element::new("p:spPr")
            .with_child(Element::new("a:xfrm"))
            .with_child(Element::new("a:solidFill"))
            .with_child(Element::new("a:effectLst"));

        sp_pr.get_or_insert_child("ln", "a:ln", &["effectLst", "scene3d", "sp3d", "extLst"]);

        let names: Vec<&str> = sp_pr.elements().map(|e| e.local_name()).collect();
        assert_eq!(names, vec!["xfrm", "solidFill", "ln", "effectLst"]);

        // A second call finds the existing element instead of adding another.
        sp_pr.get_or_insert_child("ln", "a:ln", &["effectLst"]);
        assert_eq!(sp_pr.children_named("ln").count(), 1);
    }

    #[test]
    fn test_remove_children() {
        let mut ln = Element::new("a:ln")
            .with_child(Element::new("a:solidFill"))
            .with_child(Element::new("a:prstDash"));
        assert_eq!(ln.remove_children(|e| e.is("solidFill")), 1);
        assert_eq!(ln.elements().count(), 1);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(XmlDocument::parse("<a><b></a>").is_err());
        assert!(XmlDocument::parse("<a>").is_err());
        assert!(XmlDocument::parse("").is_err());
    }

    #[test]
    fn test_single_quoted_attribute_with_double_quote() {
        let doc = XmlDocument::parse(r#"<a:t xmlns:a="urn:x" title='say "hi"' alt="it's"/>"#).unwrap();
        assert_eq!(doc.root.attr_unescaped("title").as_deref(), Some(r#"say "hi""#));

        let written = String::from_utf8(doc.to_bytes().unwrap()).unwrap();
        assert!(written.contains(r#"title="say &quot;hi&quot;""#));
        assert!(written.contains(r#"alt="it's""#));

        let reparsed = XmlDocument::parse(&written).unwrap();
        assert_eq!(reparsed, doc);
        assert_eq!(reparsed.root.attr_unescaped("title").as_deref(), Some(r#"say "hi""#));
    }

    #[test]
    fn test_attributes() {
        let doc = XmlDocument::parse(SAMPLE).unwrap();
        let declared: Vec<&str> = doc.root.attributes().map(|(key, _)| key).collect();
        assert_eq!(declared, vec!["xmlns:a", "xmlns:p"]);
    }
}
