use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::CatalogError;
use crate::helpers::null_if_empty;

/// One element of a parsed XML document. Names are kept qualified as written,
/// e.g. `dc:title` or `meta`.
#[derive(Debug, Clone)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    /// Direct text content, not including descendants.
    pub text: String,
    pub children: Vec<usize>,
    pub parent: Option<usize>,
}

impl XmlElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// The `id` attribute, or "" if there is none.
    pub fn id(&self) -> &str {
        self.attr("id").unwrap_or("")
    }
}

/// An element arena in document order. Index 0 is the root element.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    elements: Vec<XmlElement>,
}

fn parse_error(reader: &Reader<&[u8]>, msg: impl std::fmt::Display) -> CatalogError {
    CatalogError::Parsing(format!("Malformed XML at byte {}: {}", reader.buffer_position(), msg))
}

fn new_element(reader: &Reader<&[u8]>, e: &BytesStart, parent: Option<usize>) -> Result<XmlElement, CatalogError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();

    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| parse_error(reader, err))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value().map_err(|err| parse_error(reader, err))?;
        attributes.push((key, value.to_string()));
    }

    Ok(XmlElement {
        name,
        attributes,
        text: String::new(),
        children: Vec::new(),
        parent,
    })
}

impl XmlDocument {
    pub fn parse(xml: &str) -> Result<Self, CatalogError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);
        reader.check_end_names(true);

        let mut elements: Vec<XmlElement> = Vec::new();
        let mut stack: Vec<usize> = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    let idx = push_element(&reader, &mut elements, &stack, e)?;
                    stack.push(idx);
                }
                Ok(Event::Empty(ref e)) => {
                    push_element(&reader, &mut elements, &stack, e)?;
                }
                Ok(Event::End(_)) => {
                    stack.pop();
                }
                Ok(Event::Text(e)) => {
                    let text = e.unescape().map_err(|err| parse_error(&reader, err))?;
                    match stack.last() {
                        Some(&top) => elements[top].text.push_str(&text),
                        None => {
                            if !text.trim().is_empty() {
                                return Err(parse_error(&reader, "text outside the root element"));
                            }
                        }
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(&top) = stack.last() {
                        elements[top].text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                    }
                }
                Ok(Event::Eof) => break,
                // Declarations, comments, processing instructions, doctype.
                Ok(_) => {}
                Err(e) => return Err(parse_error(&reader, e)),
            }
            buf.clear();
        }

        if let Some(&open) = stack.last() {
            return Err(CatalogError::Parsing(format!("Malformed XML: unclosed element <{}>", elements[open].name)));
        }

        if elements.is_empty() {
            return Err(CatalogError::Parsing("Malformed XML: no root element".to_string()));
        }

        Ok(XmlDocument { elements })
    }

    pub fn root(&self) -> usize {
        0
    }

    pub fn element(&self, idx: usize) -> &XmlElement {
        &self.elements[idx]
    }

    pub fn children(&self, idx: usize) -> impl Iterator<Item = &XmlElement> {
        self.elements[idx].children.iter().map(|&c| &self.elements[c])
    }

    pub fn find_child(&self, idx: usize, name: &str) -> Option<usize> {
        self.elements[idx].children.iter()
            .copied()
            .find(|&c| self.elements[c].name == name)
    }

    /// Follow child names from the root, e.g. `["package", "metadata"]`.
    pub fn find_path(&self, path: &[&str]) -> Option<usize> {
        let (first, rest) = path.split_first()?;
        if self.elements[0].name != *first {
            return None;
        }
        let mut idx = 0;
        for name in rest {
            idx = self.find_child(idx, name)?;
        }
        Some(idx)
    }

    /// All elements below `idx`, in document order.
    pub fn descendants(&self, idx: usize) -> Vec<usize> {
        let mut res = Vec::new();
        let mut stack: Vec<usize> = self.elements[idx].children.iter().rev().copied().collect();
        while let Some(i) = stack.pop() {
            res.push(i);
            stack.extend(self.elements[i].children.iter().rev());
        }
        res
    }

    pub fn ancestors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.elements[idx].parent, move |&i| self.elements[i].parent)
    }
}

fn push_element(reader: &Reader<&[u8]>,
                elements: &mut Vec<XmlElement>,
                stack: &[usize],
                e: &BytesStart)
                -> Result<usize, CatalogError> {
    let parent = stack.last().copied();
    if parent.is_none() && !elements.is_empty() {
        return Err(parse_error(reader, "more than one root element"));
    }

    let element = new_element(reader, e, parent)?;
    let idx = elements.len();
    elements.push(element);
    if let Some(p) = parent {
        elements[p].children.push(idx);
    }
    Ok(idx)
}

/// The `/package/metadata` block of a `content.opf` manifest, with an index
/// from element id to the `meta` elements refining it.
#[derive(Debug, Clone)]
pub struct PackageMetadata {
    doc: XmlDocument,
    metadata: usize,
    refinements: HashMap<String, Vec<usize>>,
}

impl PackageMetadata {
    pub fn parse(xml: &str) -> Result<Self, CatalogError> {
        let doc = XmlDocument::parse(xml)?;
        let metadata = doc.find_path(&["package", "metadata"])
            .ok_or_else(|| CatalogError::Parsing("Missing <package>/<metadata> element.".to_string()))?;

        let mut refinements: HashMap<String, Vec<usize>> = HashMap::new();
        for &idx in &doc.element(metadata).children {
            let el = doc.element(idx);
            if el.name != "meta" {
                continue;
            }
            if let Some(target) = el.attr("refines") {
                let id = target.strip_prefix('#').unwrap_or(target);
                if !id.is_empty() {
                    refinements.entry(id.to_string()).or_default().push(idx);
                }
            }
        }

        Ok(PackageMetadata { doc, metadata, refinements })
    }

    fn metadata_children(&self) -> impl Iterator<Item = &XmlElement> {
        self.doc.children(self.metadata)
    }

    /// Elements such as `dc:creator` directly under `metadata`, in document order.
    pub fn elements(&self, name: &str) -> Vec<&XmlElement> {
        self.metadata_children().filter(|el| el.name == name).collect()
    }

    /// Trimmed text of the first `name` element, or None if missing or blank.
    pub fn value(&self, name: &str) -> Option<String> {
        self.metadata_children()
            .find(|el| el.name == name)
            .and_then(|el| null_if_empty(Some(&el.text)))
    }

    /// Non-blank trimmed texts of every `name` element.
    pub fn values(&self, name: &str) -> Vec<String> {
        self.metadata_children()
            .filter(|el| el.name == name)
            .filter_map(|el| null_if_empty(Some(&el.text)))
            .collect()
    }

    pub fn value_with_id(&self, name: &str, id: &str) -> Option<String> {
        self.metadata_children()
            .find(|el| el.name == name && el.id() == id)
            .and_then(|el| null_if_empty(Some(&el.text)))
    }

    pub fn meta_elements(&self, property: &str) -> Vec<&XmlElement> {
        self.metadata_children()
            .filter(|el| el.name == "meta" && el.attr("property") == Some(property))
            .collect()
    }

    pub fn has_meta(&self, property: &str) -> bool {
        self.metadata_children()
            .any(|el| el.name == "meta" && el.attr("property") == Some(property))
    }

    /// First `meta[@property]`, refining something or not.
    pub fn meta_value(&self, property: &str) -> Option<String> {
        self.meta_elements(property)
            .first()
            .and_then(|el| null_if_empty(Some(&el.text)))
    }

    /// First `meta[@property][not(@refines)]`.
    pub fn unrefined_meta_value(&self, property: &str) -> Option<String> {
        self.meta_elements(property)
            .into_iter()
            .find(|el| !el.has_attr("refines"))
            .and_then(|el| null_if_empty(Some(&el.text)))
    }

    pub fn meta_values(&self, property: &str) -> Vec<String> {
        self.meta_elements(property)
            .into_iter()
            .filter_map(|el| null_if_empty(Some(&el.text)))
            .collect()
    }

    fn refining_elements<'a>(&'a self, id: &str, properties: &'a [&'a str]) -> impl Iterator<Item = &'a XmlElement> + 'a {
        let indexes: &[usize] = if id.is_empty() {
            &[]
        } else {
            self.refinements.get(id).map(|v| v.as_slice()).unwrap_or(&[])
        };

        indexes.iter()
            .map(|&i| self.doc.element(i))
            .filter(move |el| el.attr("property").is_some_and(|p| properties.contains(&p)))
    }

    /// First refinement of element `id` with this property. An empty id never matches.
    pub fn refinement(&self, id: &str, property: &str) -> Option<String> {
        self.refining_elements(id, &[property])
            .next()
            .and_then(|el| null_if_empty(Some(&el.text)))
    }

    /// Last refinement of element `id` with this property, for properties where
    /// a later declaration overrides an earlier one.
    pub fn last_refinement(&self, id: &str, property: &str) -> Option<String> {
        self.refining_elements(id, &[property])
            .last()
            .and_then(|el| null_if_empty(Some(&el.text)))
    }

    /// Non-blank refinement values for any of `properties`, in document order.
    pub fn refinement_values(&self, id: &str, properties: &[&str]) -> Vec<String> {
        self.refining_elements(id, properties)
            .filter_map(|el| null_if_empty(Some(&el.text)))
            .collect()
    }
}
