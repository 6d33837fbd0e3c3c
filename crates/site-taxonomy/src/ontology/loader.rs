//! Read typed entities out of an RDF/XML ontology document.
//!
//! Every `rdf:Description` with an `rdf:about` identifier and an `rdf:type`
//! reference becomes an entity. The id is the identifier's fragment, the
//! label comes from `rdfs:label` (falling back to the id), and the type
//! reference decides the partition. Descriptions of any other type are
//! skipped.

use crate::error::ParseError;
use crate::ontology::types::{Category, OntologyEntity};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use regex::Regex;
use std::collections::HashMap;

const RDF_NS: &[u8] = b"http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const RDFS_NS: &[u8] = b"http://www.w3.org/2000/01/rdf-schema#";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ns {
    Rdf,
    Rdfs,
    Other,
}

impl Ns {
    fn of(resolved: &ResolveResult<'_>) -> Self {
        match resolved {
            ResolveResult::Bound(Namespace(ns)) if *ns == RDF_NS => Ns::Rdf,
            ResolveResult::Bound(Namespace(ns)) if *ns == RDFS_NS => Ns::Rdfs,
            _ => Ns::Other,
        }
    }
}

/// A description being read, with the element depth it opened at.
struct OpenDescription {
    depth: usize,
    about: String,
    label: Option<String>,
    type_ref: Option<String>,
}

impl OpenDescription {
    fn into_entity(self) -> Option<OntologyEntity> {
        if self.about.is_empty() {
            return None;
        }
        let category = Category::from_type_reference(self.type_ref.as_deref()?)?;
        let id = local_name(&self.about).to_string();
        let label = self
            .label
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| id.clone());
        Some(OntologyEntity {
            id,
            label,
            category,
        })
    }
}

/// Text after the last `#`, or the whole identifier.
pub fn local_name(identifier: &str) -> &str {
    match identifier.rsplit_once('#') {
        Some((_, fragment)) => fragment,
        None => identifier,
    }
}

/// Parse every recognised entity, in document order.
pub fn parse_entities(xml: &str) -> Result<Vec<OntologyEntity>, ParseError> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entities = Vec::new();
    let mut open: Vec<OpenDescription> = Vec::new();
    let mut dtd_entities: HashMap<String, String> = HashMap::new();
    let mut depth = 0usize;
    let mut seen_root = false;
    // Depth of the rdfs:label being captured, plus the text so far.
    let mut label_capture: Option<(usize, String)> = None;

    loop {
        let (ns, event) = match reader.read_resolved_event() {
            Ok((resolved, event)) => (Ns::of(&resolved), event),
            Err(e) => {
                return Err(ParseError::Xml {
                    position: reader.error_position(),
                    message: e.to_string(),
                })
            }
        };

        match event {
            Event::DocType(ref doctype) => {
                dtd_entities = declared_entities(&String::from_utf8_lossy(doctype));
            }
            Event::Start(ref e) => {
                seen_root = true;
                depth += 1;
                let local = e.local_name();
                let is_direct_child = open.last().is_some_and(|d| d.depth + 1 == depth);

                match (ns, local.as_ref()) {
                    (Ns::Rdf, b"Description") => {
                        let about = rdf_attribute(&reader, e, b"about", &dtd_entities)?;
                        open.push(OpenDescription {
                            depth,
                            about: about.unwrap_or_default(),
                            label: None,
                            type_ref: None,
                        });
                    }
                    (Ns::Rdfs, b"label") if is_direct_child => {
                        label_capture = Some((depth, String::new()));
                    }
                    (Ns::Rdf, b"type") if is_direct_child => {
                        let resource = rdf_attribute(&reader, e, b"resource", &dtd_entities)?;
                        set_type(&mut open, resource);
                    }
                    _ => {}
                }
            }
            Event::Empty(ref e) => {
                seen_root = true;
                let local = e.local_name();
                let is_direct_child = open.last().is_some_and(|d| d.depth == depth);

                match (ns, local.as_ref()) {
                    (Ns::Rdf, b"type") if is_direct_child => {
                        let resource = rdf_attribute(&reader, e, b"resource", &dtd_entities)?;
                        set_type(&mut open, resource);
                    }
                    (Ns::Rdfs, b"label") if is_direct_child => {
                        // An empty label counts as present but blank.
                        if let Some(desc) = open.last_mut() {
                            desc.label.get_or_insert_with(String::new);
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(ref text) => {
                if let Some((_, buf)) = label_capture.as_mut() {
                    let unescaped = text
                        .unescape_with(|name| resolve_entity(&dtd_entities, name))
                        .map_err(|e| ParseError::Xml {
                            position: reader.buffer_position(),
                            message: e.to_string(),
                        })?;
                    buf.push_str(&unescaped);
                }
            }
            Event::CData(ref cdata) => {
                if let Some((_, buf)) = label_capture.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(cdata));
                }
            }
            Event::End(_) => {
                if label_capture.as_ref().is_some_and(|(d, _)| *d == depth) {
                    if let Some((_, text)) = label_capture.take() {
                        if let Some(desc) = open.last_mut() {
                            // First label wins.
                            desc.label.get_or_insert(text);
                        }
                    }
                }
                if open.last().is_some_and(|d| d.depth == depth) {
                    if let Some(entity) = open.pop().and_then(OpenDescription::into_entity) {
                        entities.push(entity);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof if !seen_root => {
                return Err(ParseError::Xml {
                    position: reader.buffer_position(),
                    message: "no root element".to_string(),
                })
            }
            Event::Eof if depth != 0 => {
                return Err(ParseError::Xml {
                    position: reader.buffer_position(),
                    message: format!("document ends with {depth} unclosed element(s)"),
                })
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entities)
}

fn set_type(open: &mut [OpenDescription], resource: Option<String>) {
    if let (Some(desc), Some(resource)) = (open.last_mut(), resource) {
        desc.type_ref.get_or_insert(resource);
    }
}

/// Value of the `rdf:<name>` attribute on an element.
fn rdf_attribute(
    reader: &NsReader<&[u8]>,
    element: &BytesStart<'_>,
    name: &[u8],
    dtd_entities: &HashMap<String, String>,
) -> Result<Option<String>, ParseError> {
    for attr in element.attributes() {
        let attr: Attribute<'_> = attr.map_err(|e| ParseError::Xml {
            position: reader.buffer_position(),
            message: e.to_string(),
        })?;
        let (resolved, local) = reader.resolve_attribute(attr.key);
        if Ns::of(&resolved) == Ns::Rdf && local.as_ref() == name {
            let value = attr
                .unescape_value_with(|name| resolve_entity(dtd_entities, name))
                .map_err(|e| ParseError::Xml {
                    position: reader.buffer_position(),
                    message: e.to_string(),
                })?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Document-declared entities first, then the five XML builtins.
fn resolve_entity<'a>(dtd_entities: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    if let Some(value) = dtd_entities.get(name) {
        return Some(value.as_str());
    }
    match name {
        "lt" => Some("<"),
        "gt" => Some(">"),
        "amp" => Some("&"),
        "apos" => Some("'"),
        "quot" => Some("\""),
        _ => None,
    }
}

/// `<!ENTITY name "value">` declarations from an internal DTD subset.
fn declared_entities(doctype: &str) -> HashMap<String, String> {
    let Ok(re) = Regex::new(r#"<!ENTITY\s+([A-Za-z_][\w.-]*)\s+(?:"([^"]*)"|'([^']*)')\s*>"#) else {
        return HashMap::new();
    };
    re.captures_iter(doctype)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_string();
            let value = caps.get(2).or_else(|| caps.get(3))?.as_str().to_string();
            Some((name, value))
        })
        .collect()
}
