//! Owned XML element tree with exclusive canonicalization.
//!
//! Digest and signature computation need the exact canonical bytes of a
//! *subtree* (exclusive C14N, comments stripped), which a streaming
//! writer cannot produce after the fact. Parsing resolves every
//! namespace eagerly, so a subtree carries everything needed to
//! canonicalize it standalone — namespace declarations are re-rendered
//! where visibly utilized, not copied from the source document.

use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::{BTreeMap, HashMap};

use crate::core::EetError;

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// A namespace-resolved attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    /// Resolved namespace URI; `None` for unprefixed attributes.
    pub ns: Option<String>,
    pub prefix: Option<String>,
    pub local: String,
    pub value: String,
}

/// Element or character data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// A namespace-resolved element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Resolved namespace URI; `None` for no namespace.
    pub ns: Option<String>,
    pub prefix: Option<String>,
    pub local: String,
    pub attrs: Vec<Attr>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(prefix: Option<&str>, ns: &str, local: &str) -> Self {
        Self {
            ns: Some(ns.to_string()),
            prefix: prefix.map(str::to_string),
            local: local.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Add an unprefixed (no-namespace) attribute.
    pub fn attr(mut self, local: &str, value: &str) -> Self {
        self.attrs.push(Attr {
            ns: None,
            prefix: None,
            local: local.to_string(),
            value: value.to_string(),
        });
        self
    }

    /// Add a namespaced attribute.
    pub fn attr_ns(mut self, prefix: &str, ns: &str, local: &str, value: &str) -> Self {
        self.attrs.push(Attr {
            ns: Some(ns.to_string()),
            prefix: Some(prefix.to_string()),
            local: local.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn child(mut self, element: Element) -> Self {
        self.children.push(Node::Element(element));
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.children.push(Node::Text(text.to_string()));
        self
    }

    pub fn is_named(&self, ns: &str, local: &str) -> bool {
        self.ns.as_deref() == Some(ns) && self.local == local
    }

    /// Direct child element with the given name.
    pub fn child_named(&self, ns: &str, local: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.is_named(ns, local))
    }

    /// Direct child elements with the given name.
    pub fn children_named<'a>(
        &'a self,
        ns: &'a str,
        local: &'a str,
    ) -> impl Iterator<Item = &'a Element> {
        self.child_elements().filter(move |e| e.is_named(ns, local))
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// First descendant with the given name, depth-first; excludes self.
    pub fn find(&self, ns: &str, local: &str) -> Option<&Element> {
        for child in self.child_elements() {
            if child.is_named(ns, local) {
                return Some(child);
            }
            if let Some(found) = child.find(ns, local) {
                return Some(found);
            }
        }
        None
    }

    /// Self plus all descendant elements, depth-first.
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = vec![self];
        let mut i = 0;
        while i < out.len() {
            let children: Vec<&Element> = out[i].child_elements().collect();
            out.extend(children);
            i += 1;
        }
        out
    }

    /// Value of an unprefixed attribute.
    pub fn attr_value(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.ns.is_none() && a.local == local)
            .map(|a| a.value.as_str())
    }

    /// Value of a namespaced attribute.
    pub fn attr_value_ns(&self, ns: &str, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.ns.as_deref() == Some(ns) && a.local == local)
            .map(|a| a.value.as_str())
    }

    /// Concatenated character data of this element and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => out.push_str(&e.text_content()),
            }
        }
        out
    }

    /// Exclusive, comment-free canonical form of this subtree — the
    /// exact byte input to digest and signature computation.
    pub fn canonicalize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.canon(&mut out, &HashMap::new());
        out
    }

    fn qname(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{p}:{}", self.local),
            None => self.local.clone(),
        }
    }

    fn canon(&self, out: &mut Vec<u8>, rendered: &HashMap<Option<String>, String>) {
        // Visibly utilized prefixes: the element's own plus every
        // attribute prefix. BTreeMap ordering gives the C14N declaration
        // order (default namespace first, then by prefix).
        let mut utilized: BTreeMap<Option<String>, Option<String>> = BTreeMap::new();
        utilized.insert(self.prefix.clone(), self.ns.clone());
        for attr in &self.attrs {
            if let Some(p) = &attr.prefix {
                if p != "xml" {
                    utilized.insert(Some(p.clone()), attr.ns.clone());
                }
            }
        }

        let mut scope = rendered.clone();
        let mut decls: Vec<(Option<String>, String)> = Vec::new();
        for (prefix, uri) in &utilized {
            let want = uri.clone().unwrap_or_default();
            let current = scope.get(prefix).cloned().unwrap_or_default();
            if want != current {
                decls.push((prefix.clone(), want.clone()));
                scope.insert(prefix.clone(), want);
            }
        }

        let qname = self.qname();
        out.push(b'<');
        out.extend_from_slice(qname.as_bytes());
        for (prefix, uri) in &decls {
            match prefix {
                None => out.extend_from_slice(b" xmlns=\""),
                Some(p) => {
                    out.extend_from_slice(b" xmlns:");
                    out.extend_from_slice(p.as_bytes());
                    out.extend_from_slice(b"=\"");
                }
            }
            esc_attr(uri, out);
            out.push(b'"');
        }

        let mut attrs: Vec<&Attr> = self.attrs.iter().collect();
        attrs.sort_by(|a, b| {
            let ka = (a.ns.as_deref().unwrap_or(""), a.local.as_str());
            let kb = (b.ns.as_deref().unwrap_or(""), b.local.as_str());
            ka.cmp(&kb)
        });
        for attr in attrs {
            out.push(b' ');
            if let Some(p) = &attr.prefix {
                out.extend_from_slice(p.as_bytes());
                out.push(b':');
            }
            out.extend_from_slice(attr.local.as_bytes());
            out.extend_from_slice(b"=\"");
            esc_attr(&attr.value, out);
            out.push(b'"');
        }
        out.push(b'>');

        for node in &self.children {
            match node {
                Node::Element(e) => e.canon(out, &scope),
                Node::Text(t) => esc_text(t, out),
            }
        }

        out.extend_from_slice(b"</");
        out.extend_from_slice(qname.as_bytes());
        out.push(b'>');
    }
}

fn esc_text(text: &str, out: &mut Vec<u8>) {
    for b in text.bytes() {
        match b {
            b'&' => out.extend_from_slice(b"&amp;"),
            b'<' => out.extend_from_slice(b"&lt;"),
            b'>' => out.extend_from_slice(b"&gt;"),
            b'\r' => out.extend_from_slice(b"&#xD;"),
            _ => out.push(b),
        }
    }
}

fn esc_attr(value: &str, out: &mut Vec<u8>) {
    for b in value.bytes() {
        match b {
            b'&' => out.extend_from_slice(b"&amp;"),
            b'<' => out.extend_from_slice(b"&lt;"),
            b'"' => out.extend_from_slice(b"&quot;"),
            b'\t' => out.extend_from_slice(b"&#x9;"),
            b'\n' => out.extend_from_slice(b"&#xA;"),
            b'\r' => out.extend_from_slice(b"&#xD;"),
            _ => out.push(b),
        }
    }
}

fn xml_err(e: impl std::fmt::Display) -> EetError {
    EetError::Xml(format!("XML parse error: {e}"))
}

/// Parse a document into an element tree. Comments, processing
/// instructions, and the XML declaration are dropped; character data is
/// preserved verbatim (whitespace included), since it participates in
/// canonicalization.
pub fn parse(input: &str) -> Result<Element, EetError> {
    let mut reader = Reader::from_str(input);
    let mut stack: Vec<Element> = Vec::new();
    let mut scopes: Vec<Vec<(Option<String>, String)>> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let element = open_element(e, &mut scopes)?;
                stack.push(element);
            }
            Ok(Event::Empty(ref e)) => {
                let element = open_element(e, &mut scopes)?;
                scopes.pop();
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| EetError::Xml("unexpected end tag".into()))?;
                scopes.pop();
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().map_err(xml_err)?.into_owned();
                match stack.last_mut() {
                    Some(open) => open.children.push(Node::Text(text)),
                    None if text.trim().is_empty() => {}
                    None => return Err(EetError::Xml("character data outside root".into())),
                }
            }
            Ok(Event::CData(e)) => {
                let bytes = e.into_inner();
                let text = std::str::from_utf8(&bytes).map_err(xml_err)?.to_string();
                if let Some(open) = stack.last_mut() {
                    open.children.push(Node::Text(text));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {} // declaration, comments, PIs, doctype
            Err(e) => return Err(xml_err(e)),
        }
    }

    if !stack.is_empty() {
        return Err(EetError::Xml("unclosed element".into()));
    }
    root.ok_or_else(|| EetError::Xml("no root element".into()))
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), EetError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(element));
    } else if root.is_some() {
        return Err(EetError::Xml("multiple root elements".into()));
    } else {
        *root = Some(element);
    }
    Ok(())
}

fn split_qname(name: &str) -> (Option<String>, String) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix.to_string()), local.to_string()),
        None => (None, name.to_string()),
    }
}

fn open_element(
    e: &quick_xml::events::BytesStart<'_>,
    scopes: &mut Vec<Vec<(Option<String>, String)>>,
) -> Result<Element, EetError> {
    let mut decls: Vec<(Option<String>, String)> = Vec::new();
    let mut raw_attrs: Vec<(String, String)> = Vec::new();

    for attr in e.attributes() {
        let attr = attr.map_err(xml_err)?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(xml_err)?
            .to_string();
        let value = attr.unescape_value().map_err(xml_err)?.into_owned();
        if key == "xmlns" {
            decls.push((None, value));
        } else if let Some(p) = key.strip_prefix("xmlns:") {
            decls.push((Some(p.to_string()), value));
        } else {
            raw_attrs.push((key, value));
        }
    }
    scopes.push(decls);

    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(xml_err)?
        .to_string();
    let (prefix, local) = split_qname(&name);
    let ns = resolve(prefix.as_deref(), scopes)?;

    let mut attrs = Vec::new();
    for (key, value) in raw_attrs {
        let (aprefix, alocal) = split_qname(&key);
        let ans = match aprefix.as_deref() {
            None => None,
            Some("xml") => Some(XML_NS.to_string()),
            Some(p) => Some(resolve(Some(p), scopes)?.ok_or_else(|| {
                EetError::Xml(format!("unbound namespace prefix {p:?}"))
            })?),
        };
        attrs.push(Attr {
            ns: ans,
            prefix: aprefix,
            local: alocal,
            value,
        });
    }

    Ok(Element {
        ns,
        prefix,
        local,
        attrs,
        children: Vec::new(),
    })
}

/// Look a prefix up in the open-element declaration frames, innermost
/// first. An unbound prefixed name is an error; an unbound default
/// prefix means "no namespace".
fn resolve(
    prefix: Option<&str>,
    scopes: &[Vec<(Option<String>, String)>],
) -> Result<Option<String>, EetError> {
    for frame in scopes.iter().rev() {
        for (p, uri) in frame.iter().rev() {
            if p.as_deref() == prefix {
                if uri.is_empty() {
                    return if prefix.is_none() {
                        Ok(None)
                    } else {
                        Err(EetError::Xml(format!(
                            "prefix {} bound to empty namespace",
                            prefix.unwrap_or_default()
                        )))
                    };
                }
                return Ok(Some(uri.clone()));
            }
        }
    }
    match prefix {
        None => Ok(None),
        Some(p) => Err(EetError::Xml(format!("unbound namespace prefix {p:?}"))),
    }
}
