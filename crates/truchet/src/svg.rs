//! SVG document tree - read, edit and write SVG files.
//!
//! The passes in this crate rewrite documents: they replace elements,
//! rewrite `d` attributes and restyle paths, and leave everything else
//! alone. `usvg` resolves a document into a render tree and cannot write
//! it back, so we keep a small element tree of our own built with
//! quick-xml.
//!
//! ## Rust Lesson #20: Owned trees
//!
//! Each [`Element`] owns its children in a `Vec`. There are no parent
//! pointers, so code that needs ancestors (CTMs, inherited styles) passes
//! them down while recursing instead of walking up.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

pub use crate::error::SvgError;

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// A node in the element tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An XML element with its attributes in document order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Qualified name as written, e.g. `path` or `svg:path`.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), attributes: Vec::new(), children: Vec::new() }
    }

    /// Builder-style [`Element::set_attr`].
    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Name without namespace prefix.
    pub fn local_name(&self) -> &str {
        local(&self.name)
    }

    /// Attribute by qualified name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let idx = self.attributes.iter().position(|(k, _)| k == name)?;
        Some(self.attributes.remove(idx).1)
    }

    /// `href`, falling back to the SVG 1.1 `xlink:href`.
    pub fn href(&self) -> Option<&str> {
        self.attr("href").or_else(|| self.attr("xlink:href"))
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Short label for logs and reports, e.g. `path#leaf-2`.
    pub fn describe(&self) -> String {
        match self.id() {
            Some(id) => format!("{}#{}", self.local_name(), id),
            None => self.local_name().to_string(),
        }
    }

    /// A property from the inline `style` attribute.
    pub fn style_property(&self, name: &str) -> Option<&str> {
        let style = self.attr("style")?;
        style_declarations(style)
            .filter(|(k, _)| *k == name)
            .map(|(_, v)| v)
            .last()
    }

    /// Set a property in the inline `style` attribute.
    pub fn set_style_property(&mut self, name: &str, value: &str) {
        let mut declarations: Vec<(String, String)> = self
            .attr("style")
            .map(|s| style_declarations(s).map(|(k, v)| (k.to_string(), v.to_string())).collect())
            .unwrap_or_default();
        match declarations.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => declarations.push((name.to_string(), value.to_string())),
        }
        self.set_attr("style", join_declarations(&declarations));
    }

    /// Remove a property from the inline `style` attribute; drops the
    /// attribute once it is empty.
    pub fn remove_style_property(&mut self, name: &str) {
        let Some(style) = self.attr("style") else {
            return;
        };
        let declarations: Vec<(String, String)> = style_declarations(style)
            .filter(|(k, _)| *k != name)
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        if declarations.is_empty() {
            self.remove_attr("style");
        } else {
            self.set_attr("style", join_declarations(&declarations));
        }
    }

    /// A presentation value as it applies to this element: the `style`
    /// property wins over the attribute of the same name.
    pub fn presentation(&self, name: &str) -> Option<&str> {
        self.style_property(name).or_else(|| self.attr(name))
    }

    /// Child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// All descendant elements in document order.
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        collect_descendants(self, &mut out);
        out
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Text content of direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }
}

fn collect_descendants<'a>(element: &'a Element, out: &mut Vec<&'a Element>) {
    for child in element.elements() {
        out.push(child);
        collect_descendants(child, out);
    }
}

/// Strip a namespace prefix.
pub fn local(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, l)| l)
}

fn style_declarations(style: &str) -> impl Iterator<Item = (&str, &str)> {
    style.split(';').filter_map(|decl| {
        let (k, v) = decl.split_once(':')?;
        let (k, v) = (k.trim(), v.trim());
        if k.is_empty() { None } else { Some((k, v)) }
    })
}

fn join_declarations(declarations: &[(String, String)]) -> String {
    declarations
        .iter()
        .map(|(k, v)| format!("{}:{}", k, v))
        .collect::<Vec<_>>()
        .join(";")
}

/// A parsed SVG (or any XML) document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    /// Parse a document. Comments, processing instructions and the XML
    /// declaration are dropped, as are whitespace-only text nodes. Other
    /// text is kept verbatim.
    pub fn parse(content: &str) -> Result<Self, SvgError> {
        let mut reader = Reader::from_str(content);

        let mut buf = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        let xml_error = |reader: &Reader<&[u8]>, message: String| SvgError::Xml {
            position: reader.error_position(),
            message,
        };

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    stack.push(start_element(e).map_err(|m| xml_error(&reader, m))?);
                }
                Ok(Event::Empty(ref e)) => {
                    let element = start_element(e).map_err(|m| xml_error(&reader, m))?;
                    attach(element, &mut stack, &mut root);
                }
                Ok(Event::End(_)) => {
                    let Some(element) = stack.pop() else {
                        return Err(xml_error(&reader, "unexpected closing tag".to_string()));
                    };
                    attach(element, &mut stack, &mut root);
                }
                Ok(Event::Text(ref t)) => {
                    let text = t.unescape().map_err(|e| xml_error(&reader, e.to_string()))?;
                    if let Some(parent) = stack.last_mut().filter(|_| !text.trim().is_empty()) {
                        parent.children.push(Node::Text(text.into_owned()));
                    }
                }
                Ok(Event::CData(ref t)) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(Node::Text(String::from_utf8_lossy(t).into_owned()));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml_error(&reader, e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        if let Some(open) = stack.last() {
            return Err(SvgError::Xml {
                position: reader.buffer_position(),
                message: format!("unclosed element <{}>", open.name),
            });
        }
        root.map(Document::new).ok_or(SvgError::NoRoot)
    }

    /// Serialize with an XML declaration and two-space indentation.
    pub fn to_svg_string(&self) -> Result<String, SvgError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| SvgError::Write(e.to_string()))?;
        write_element(&mut writer, &self.root)?;
        let mut bytes = writer.into_inner();
        bytes.push(b'\n');
        String::from_utf8(bytes).map_err(|e| SvgError::Write(e.to_string()))
    }
}

fn start_element(e: &BytesStart) -> Result<Element, String> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|err| err.to_string())?
        .to_string();
    let mut element = Element::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| err.to_string())?
            .to_string();
        let value = attr.unescape_value().map_err(|err| err.to_string())?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}

fn attach(element: Element, stack: &mut [Element], root: &mut Option<Element>) {
    match stack.last_mut() {
        Some(parent) => parent.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<(), SvgError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (k, v) in &element.attributes {
        start.push_attribute((k.as_str(), v.as_str()));
    }

    if element.children.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| SvgError::Write(e.to_string()));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| SvgError::Write(e.to_string()))?;
    for child in &element.children {
        match child {
            Node::Element(e) => write_element(writer, e)?,
            Node::Text(t) => writer
                .write_event(Event::Text(BytesText::new(t)))
                .map_err(|e| SvgError::Write(e.to_string()))?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(|e| SvgError::Write(e.to_string()))
}

// ============================================================================
// TESTS
// ============================================================================
