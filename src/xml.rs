//! Owned XML element tree.
//!
//! SBML and SED-ML documents are read into a small DOM built from `quick-xml`
//! events. Element and attribute prefixes are resolved against the `xmlns`
//! declarations in scope, so lookups can match on namespace URIs instead of
//! on the prefixes a particular document happens to use. The tree can be
//! mutated and written back out, which is what the MINERVA adapter and the
//! SED-ML writer need.

use std::collections::HashMap;
use std::io::Cursor;

use quick_xml::escape::unescape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

/// Namespace bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Errors raised while reading or writing XML.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The underlying tokenizer rejected the document
    #[error("Malformed XML: {0}")]
    Syntax(#[from] quick_xml::Error),

    /// An attribute could not be tokenized
    #[error("Malformed XML attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    /// An entity or character reference could not be resolved
    #[error("Invalid escape sequence: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    /// A name, attribute, or text node was not valid UTF-8
    #[error("XML is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// The document ended before all elements were closed, or had no root
    #[error("Malformed XML: {0}")]
    Structure(String),

    /// Serialization failed
    #[error("Failed to write XML: {0}")]
    Write(#[from] std::io::Error),
}

/// An attribute of an element.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlAttribute {
    pub prefix: Option<String>,
    pub name: String,
    /// Namespace URI bound to `prefix`. Unprefixed attributes have no namespace.
    pub namespace: Option<String>,
    pub value: String,
}

impl XmlAttribute {
    /// Qualified name as written in the document
    pub fn qualified_name(&self) -> String {
        qualify(self.prefix.as_deref(), &self.name)
    }

    /// Whether this attribute is a namespace declaration
    pub fn is_namespace_declaration(&self) -> bool {
        self.prefix.as_deref() == Some("xmlns") || (self.prefix.is_none() && self.name == "xmlns")
    }
}

/// A child of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An element with its attributes and children.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub prefix: Option<String>,
    pub name: String,
    /// Namespace URI resolved from `prefix` (or the default namespace).
    pub namespace: Option<String>,
    pub attributes: Vec<XmlAttribute>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Creates an element from a possibly prefixed name, e.g. `rdf:Description`.
    pub fn new(qualified_name: &str) -> Self {
        let (prefix, name) = split_name(qualified_name);
        XmlElement {
            prefix: prefix.map(str::to_string),
            name: name.to_string(),
            namespace: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Parses a document and returns its root element.
    pub fn parse(xml: &str) -> Result<XmlElement, XmlError> {
        let mut reader = Reader::from_str(xml);
        let mut scopes: Vec<HashMap<String, String>> = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut text = String::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    flush_text(&mut stack, &mut text);
                    let element = open_element(&start, &mut scopes)?;
                    stack.push(element);
                }
                Event::Empty(start) => {
                    flush_text(&mut stack, &mut text);
                    let element = open_element(&start, &mut scopes)?;
                    scopes.pop();
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    flush_text(&mut stack, &mut text);
                    scopes.pop();
                    let element = stack
                        .pop()
                        .ok_or_else(|| XmlError::Structure("unexpected closing tag".to_string()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(content) => {
                    let raw = std::str::from_utf8(&content)?;
                    text.push_str(&unescape(raw)?);
                }
                Event::GeneralRef(reference) => {
                    let name = std::str::from_utf8(&reference)?;
                    text.push_str(&unescape(&format!("&{name};"))?);
                }
                Event::CData(content) => {
                    text.push_str(std::str::from_utf8(&content)?);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(XmlError::Structure(format!(
                "unclosed element <{}>",
                stack.last().map(XmlElement::qualified_name).unwrap_or_default()
            )));
        }

        root.ok_or_else(|| XmlError::Structure("document has no root element".to_string()))
    }

    /// Qualified name as written in the document
    pub fn qualified_name(&self) -> String {
        qualify(self.prefix.as_deref(), &self.name)
    }

    /// Value of the attribute with the given qualified name, e.g. `id` or `rdf:resource`
    pub fn attr(&self, qualified_name: &str) -> Option<&str> {
        let (prefix, name) = split_name(qualified_name);
        self.attributes
            .iter()
            .find(|attr| attr.prefix.as_deref() == prefix && attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Value of the attribute with the given namespace and local name
    pub fn attr_ns(&self, namespace: &str, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.namespace.as_deref() == Some(namespace) && attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// First attribute with the given local name, whatever its namespace
    pub fn attr_local(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .filter(|attr| !attr.is_namespace_declaration())
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Sets (or replaces) an attribute by qualified name
    pub fn set_attr(&mut self, qualified_name: &str, value: impl Into<String>) {
        let (prefix, name) = split_name(qualified_name);
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|attr| attr.prefix.as_deref() == prefix && attr.name == name)
        {
            Some(attr) => attr.value = value,
            None => self.attributes.push(XmlAttribute {
                prefix: prefix.map(str::to_string),
                name: name.to_string(),
                namespace: None,
                value,
            }),
        }
    }

    /// Builder-style variant of [`XmlElement::set_attr`]
    pub fn with_attr(mut self, qualified_name: &str, value: impl Into<String>) -> Self {
        self.set_attr(qualified_name, value);
        self
    }

    /// Namespace declarations made on this element, as `(prefix, uri)` pairs.
    /// The default namespace has an empty prefix.
    pub fn namespace_declarations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().filter_map(|attr| {
            if attr.prefix.as_deref() == Some("xmlns") {
                Some((attr.name.as_str(), attr.value.as_str()))
            } else if attr.prefix.is_none() && attr.name == "xmlns" {
                Some(("", attr.value.as_str()))
            } else {
                None
            }
        })
    }

    /// Element children
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// Mutable element children
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|child| match child {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// Element children with the given local name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |element| element.name == name)
    }

    /// First element child with the given local name
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|element| element.name == name)
    }

    /// First mutable element child with the given local name
    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|element| element.name == name)
    }

    /// First element child with the given namespace and local name
    pub fn child_ns(&self, namespace: &str, name: &str) -> Option<&XmlElement> {
        self.elements()
            .find(|element| element.name == name && element.namespace.as_deref() == Some(namespace))
    }

    /// Element children with the given namespace and local name
    pub fn children_ns<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |element| {
            element.name == name && element.namespace.as_deref() == Some(namespace)
        })
    }

    /// Follows a path of local names, taking the first match at each step
    pub fn descend(&self, path: &[&str]) -> Option<&XmlElement> {
        path.iter()
            .try_fold(self, |element, name| element.child(name))
    }

    /// Concatenated text content of the direct children, trimmed
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                XmlNode::Text(text) => Some(text.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect::<String>()
            .trim()
            .to_string()
    }

    /// Appends an element child
    pub fn push_element(&mut self, element: XmlElement) {
        self.children.push(XmlNode::Element(element));
    }

    /// Builder-style variant of [`XmlElement::push_element`]
    pub fn with_child(mut self, element: XmlElement) -> Self {
        self.push_element(element);
        self
    }

    /// Appends a text child
    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(XmlNode::Text(text.into()));
    }

    /// Builder-style variant of [`XmlElement::push_text`]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.push_text(text);
        self
    }

    /// Keeps only the element children for which `keep` returns true
    pub fn retain_elements(&mut self, mut keep: impl FnMut(&XmlElement) -> bool) {
        self.children.retain(|child| match child {
            XmlNode::Element(element) => keep(element),
            XmlNode::Text(_) => true,
        });
    }

    /// Serializes the element as a standalone document with an XML declaration.
    pub fn to_xml_string(&self) -> Result<String, XmlError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write_element(&mut writer, self)?;
        let bytes = writer.into_inner().into_inner();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn split_name(qualified_name: &str) -> (Option<&str>, &str) {
    match qualified_name.split_once(':') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, qualified_name),
    }
}

fn qualify(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}:{name}"),
        None => name.to_string(),
    }
}

fn resolve(scopes: &[HashMap<String, String>], prefix: &str) -> Option<String> {
    if prefix == "xml" {
        return Some(XML_NAMESPACE.to_string());
    }
    scopes
        .iter()
        .rev()
        .find_map(|scope| scope.get(prefix))
        .filter(|uri| !uri.is_empty())
        .cloned()
}

/// Builds an element from a start tag and pushes its namespace scope.
fn open_element(
    start: &BytesStart,
    scopes: &mut Vec<HashMap<String, String>>,
) -> Result<XmlElement, XmlError> {
    let qname = start.name();
    let (prefix, name) = split_name(std::str::from_utf8(qname.as_ref())?);

    let mut attributes = Vec::new();
    let mut scope = HashMap::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?;
        let value = unescape(std::str::from_utf8(&attr.value)?)?.into_owned();
        let (attr_prefix, attr_name) = split_name(key);

        match (attr_prefix, attr_name) {
            (Some("xmlns"), declared) => {
                scope.insert(declared.to_string(), value.clone());
            }
            (None, "xmlns") => {
                scope.insert(String::new(), value.clone());
            }
            _ => {}
        }

        attributes.push(XmlAttribute {
            prefix: attr_prefix.map(str::to_string),
            name: attr_name.to_string(),
            namespace: None,
            value,
        });
    }
    scopes.push(scope);

    for attr in attributes.iter_mut() {
        if let Some(attr_prefix) = attr.prefix.as_deref() {
            if attr_prefix != "xmlns" {
                attr.namespace = resolve(scopes, attr_prefix);
            }
        }
    }

    Ok(XmlElement {
        prefix: prefix.map(str::to_string),
        name: name.to_string(),
        namespace: resolve(scopes, prefix.unwrap_or("")),
        attributes,
        children: Vec::new(),
    })
}

fn flush_text(stack: &mut [XmlElement], text: &mut String) {
    if text.is_empty() {
        return;
    }
    let content = std::mem::take(text);
    if content.trim().is_empty() {
        return;
    }
    if let Some(parent) = stack.last_mut() {
        parent.push_text(content);
    }
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => parent.push_element(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(XmlError::Structure(
                "document has more than one root element".to_string(),
            ))
        }
    }
    Ok(())
}

fn write_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    element: &XmlElement,
) -> Result<(), XmlError> {
    let name = element.qualified_name();
    let mut start = BytesStart::new(name.as_str());
    for attr in &element.attributes {
        let key = attr.qualified_name();
        start.push_attribute((key.as_str(), attr.value.as_str()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        match child {
            XmlNode::Element(child) => write_element(writer, child)?,
            XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
    Ok(())
}
