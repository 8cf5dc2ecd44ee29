//! Generic, order-preserving XML tree built on quick-xml
//!
//! Knows nothing about TCX. Every element keeps its resolved namespace URI and
//! local name, so lookups are namespace-aware while document prefixes never
//! leave this module.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use crate::error::DecodeError;

/// Logical tag name used for lookups: a namespace URI plus a local name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag<'a> {
    pub namespace: &'a str,
    pub local: &'a str,
}

impl<'a> Tag<'a> {
    pub fn new(namespace: &'a str, local: &'a str) -> Self {
        Self { namespace, local }
    }
}

/// Deepest element nesting `XmlDocument::load` accepts. Dropping, cloning and
/// comparing a tree recurse once per level, so deeper documents are rejected
/// as malformed rather than risking a stack overflow.
pub const MAX_DEPTH: usize = 1024;

/// One element of the loaded document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    namespace: Option<String>,
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

/// Result of looking a child up by tag.
///
/// A tag that occurs once is `Single`, one that repeats is `Repeated`. Callers
/// reading repeated children must go through [`Entry::into_sequence`] so a lone
/// occurrence is not mistaken for something other than a one-element list.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry<'a> {
    Absent,
    Single(&'a Element),
    Repeated(Vec<&'a Element>),
}

impl<'a> Entry<'a> {
    /// Normalize to an ordered sequence regardless of cardinality
    pub fn into_sequence(self) -> Vec<&'a Element> {
        match self {
            Entry::Absent => Vec::new(),
            Entry::Single(element) => vec![element],
            Entry::Repeated(elements) => elements,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Entry::Absent)
    }
}

impl Element {
    /// Local name without any prefix
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved namespace URI, `None` for unqualified elements
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Trimmed text content, `None` when the element has none
    pub fn text(&self) -> Option<&str> {
        let text = self.text.trim();
        (!text.is_empty()).then_some(text)
    }

    /// Attribute value by local name
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == local)
            .map(|(_, value)| value.as_str())
    }

    /// All child elements in document order
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// An unqualified element matches on local name alone; a qualified one
    /// must also be in the tag's namespace.
    pub fn matches(&self, tag: Tag<'_>) -> bool {
        self.name == tag.local
            && self
                .namespace
                .as_deref()
                .map_or(true, |namespace| namespace == tag.namespace)
    }

    /// Children matching `tag`, with their cardinality preserved
    pub fn entry(&self, tag: Tag<'_>) -> Entry<'_> {
        let mut matching: Vec<&Element> =
            self.children.iter().filter(|c| c.matches(tag)).collect();

        match matching.len() {
            0 => Entry::Absent,
            1 => Entry::Single(matching.remove(0)),
            _ => Entry::Repeated(matching),
        }
    }

    /// First child matching `tag`
    pub fn child(&self, tag: Tag<'_>) -> Option<&Element> {
        self.children.iter().find(|c| c.matches(tag))
    }

    /// Follow a chain of singular children, e.g. `Position` then `LatitudeDegrees`
    pub fn descend(&self, path: &[Tag<'_>]) -> Option<&Element> {
        path.iter()
            .try_fold(self, |element, tag| element.child(*tag))
    }
}

/// A fully loaded document.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    root: Element,
}

impl XmlDocument {
    /// Parse raw XML text into a tree. Any well-formedness problem, including
    /// undeclared namespace prefixes, is reported as `MalformedXml`.
    pub fn load(text: &str) -> Result<Self, DecodeError> {
        let mut reader = NsReader::from_str(text.trim_start_matches('\u{feff}'));
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut open: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let (resolved, event) = reader
                .read_resolved_event_into(&mut buf)
                .map_err(DecodeError::malformed)?;

            match event {
                Event::Start(ref start) => {
                    check_depth(&open)?;
                    let element = new_element(resolved, start)?;
                    if root.is_some() && open.is_empty() {
                        return Err(DecodeError::malformed("multiple root elements"));
                    }
                    open.push(element);
                }
                Event::Empty(ref start) => {
                    check_depth(&open)?;
                    let element = new_element(resolved, start)?;
                    close_element(element, &mut open, &mut root)?;
                }
                Event::End(_) => {
                    let element = open
                        .pop()
                        .ok_or_else(|| DecodeError::malformed("closing tag without opening tag"))?;
                    close_element(element, &mut open, &mut root)?;
                }
                Event::Text(ref text) => {
                    let unescaped = text.unescape().map_err(DecodeError::malformed)?;
                    append_text(&mut open, &unescaped)?;
                }
                Event::CData(ref cdata) => {
                    let content = std::str::from_utf8(cdata).map_err(DecodeError::malformed)?;
                    append_text(&mut open, content)?;
                }
                Event::Eof => break,
                // declarations, comments, processing instructions and doctypes carry no data
                _ => {}
            }
            buf.clear();
        }

        if let Some(unclosed) = open.last() {
            return Err(DecodeError::malformed(format!(
                "unexpected end of document, <{}> is not closed",
                unclosed.name
            )));
        }

        root.map(|root| XmlDocument { root })
            .ok_or_else(|| DecodeError::malformed("document has no root element"))
    }

    pub fn root(&self) -> &Element {
        &self.root
    }
}

fn new_element(resolved: ResolveResult<'_>, start: &BytesStart<'_>) -> Result<Element, DecodeError> {
    let name = std::str::from_utf8(start.local_name().as_ref())
        .map_err(DecodeError::malformed)?
        .to_string();

    let namespace = match resolved {
        ResolveResult::Bound(namespace) => {
            Some(String::from_utf8_lossy(namespace.as_ref()).into_owned())
        }
        ResolveResult::Unbound => None,
        ResolveResult::Unknown(prefix) => {
            return Err(DecodeError::malformed(format!(
                "undeclared namespace prefix '{}' on <{}>",
                String::from_utf8_lossy(&prefix),
                name
            )));
        }
    };

    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(DecodeError::malformed)?;
        let key = attribute.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }

        let local = std::str::from_utf8(attribute.key.local_name().as_ref())
            .map_err(DecodeError::malformed)?
            .to_string();
        let value = attribute.unescape_value().map_err(DecodeError::malformed)?;
        attributes.push((local, value.into_owned()));
    }

    Ok(Element {
        namespace,
        name,
        attributes,
        text: String::new(),
        children: Vec::new(),
    })
}

fn check_depth(open: &[Element]) -> Result<(), DecodeError> {
    if open.len() >= MAX_DEPTH {
        return Err(DecodeError::malformed(format!(
            "document nested too deeply (more than {} levels)",
            MAX_DEPTH
        )));
    }
    Ok(())
}

fn close_element(
    element: Element,
    open: &mut [Element],
    root: &mut Option<Element>,
) -> Result<(), DecodeError> {
    match open.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(DecodeError::malformed("multiple root elements")),
    }
    Ok(())
}

fn append_text(open: &mut [Element], text: &str) -> Result<(), DecodeError> {
    match open.last_mut() {
        Some(element) => {
            element.text.push_str(text);
            Ok(())
        }
        None => Err(DecodeError::malformed("text outside of the root element")),
    }
}
