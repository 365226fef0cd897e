//! Reading and writing the annotation document and schema formats.
//!
//! A document is a `<data>` root holding an `<annotations>` container of
//! `<entity>` and `<relation>` elements; entity offsets are encoded as
//! `"start,end"` pairs joined by `";"`, and property elements carry either
//! a literal value or the id of another annotation in the same document.
//! Whether a property is a reference is decided against the document's id
//! index once the whole file is parsed, never by guessing at value shape.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::annotation::{Annotation, AnnotationKind, PropertyValue, Span};
use crate::error::{Error, Result};
use crate::schema::{Schema, SchemaProperty};
use crate::store::AnnotationStore;

/// Read an annotation document from a file.
pub fn read_store(path: &Path) -> Result<AnnotationStore> {
    let text = fs::read_to_string(path)?;
    parse_store(&text)
}

/// Write an annotation document to a file, with indentation.
pub fn write_store(store: &AnnotationStore, path: &Path) -> Result<()> {
    let text = store_to_string(store)?;
    fs::write(path, text)?;
    Ok(())
}

#[derive(Default)]
struct RawAnnotation {
    is_entity: bool,
    id: String,
    type_name: String,
    parents_type: Option<String>,
    span_text: Option<String>,
    // Name/value pairs in document order; value None for empty elements.
    properties: Vec<(String, Option<String>)>,
}

/// Parse an annotation document from text.
pub fn parse_store(xml: &str) -> Result<AnnotationStore> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut current: Option<RawAnnotation> = None;
    let mut raw: Vec<RawAnnotation> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                path.push(name.clone());
                handle_open(&path, &name, &mut current)?;
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                path.push(name.clone());
                handle_open(&path, &name, &mut current)?;
                finalize_element(&mut path, &mut current, &mut raw);
            }
            Event::Text(t) => {
                let text = t.unescape()?.into_owned();
                if let Some(annotation) = current.as_mut() {
                    assign_text(&path, annotation, text);
                }
            }
            Event::End(_) => {
                finalize_element(&mut path, &mut current, &mut raw);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    build_store(raw)
}

fn handle_open(path: &[String], name: &str, current: &mut Option<RawAnnotation>) -> Result<()> {
    if path.len() == 3 && path[1] == "annotations" {
        match name {
            "entity" => {
                *current = Some(RawAnnotation {
                    is_entity: true,
                    ..RawAnnotation::default()
                });
            }
            "relation" => {
                *current = Some(RawAnnotation::default());
            }
            other => return Err(Error::format(format!("invalid tag: {other}"))),
        }
    } else if path.len() == 5 && path[3] == "properties" {
        if let Some(annotation) = current.as_mut() {
            annotation.properties.push((name.to_string(), None));
        }
    }
    Ok(())
}

fn assign_text(path: &[String], annotation: &mut RawAnnotation, text: String) {
    if path.len() == 4 {
        match path[3].as_str() {
            "id" => annotation.id = text,
            "type" => annotation.type_name = text,
            "parentsType" => annotation.parents_type = Some(text),
            "span" => annotation.span_text = Some(text),
            _ => {}
        }
    } else if path.len() == 5 && path[3] == "properties" {
        if let Some(last) = annotation.properties.last_mut() {
            last.1 = Some(text);
        }
    }
}

fn finalize_element(
    path: &mut Vec<String>,
    current: &mut Option<RawAnnotation>,
    raw: &mut Vec<RawAnnotation>,
) {
    if let Some(name) = path.pop() {
        if path.len() == 2 && path[1] == "annotations" && (name == "entity" || name == "relation") {
            if let Some(annotation) = current.take() {
                raw.push(annotation);
            }
        }
    }
}

fn build_store(raw: Vec<RawAnnotation>) -> Result<AnnotationStore> {
    let ids: HashSet<String> = raw.iter().map(|annotation| annotation.id.clone()).collect();
    let mut store = AnnotationStore::new();
    for annotation in raw {
        let kind = if annotation.is_entity {
            AnnotationKind::Entity {
                spans: parse_spans(annotation.span_text.as_deref())?,
            }
        } else {
            AnnotationKind::Relation
        };
        let mut properties = BTreeMap::new();
        for (name, value) in annotation.properties {
            let value = match value {
                Some(text) if ids.contains(&text) => PropertyValue::Reference(text),
                Some(text) => PropertyValue::Scalar(text),
                None => PropertyValue::Scalar(String::new()),
            };
            properties.insert(name, value);
        }
        store.append(Annotation {
            id: annotation.id,
            type_name: annotation.type_name,
            parents_type: annotation.parents_type,
            kind,
            properties,
        })?;
    }
    Ok(store)
}

/// Parse `"start,end;start,end"` offset text.
fn parse_spans(text: Option<&str>) -> Result<Vec<Span>> {
    let Some(text) = text else {
        return Ok(Vec::new());
    };
    let mut spans = Vec::new();
    for group in text.split(';') {
        let (start, end) = group
            .split_once(',')
            .ok_or_else(|| Error::format(format!("invalid span: '{group}'")))?;
        let start = start
            .trim()
            .parse::<usize>()
            .map_err(|_| Error::format(format!("invalid span offset: '{start}'")))?;
        let end = end
            .trim()
            .parse::<usize>()
            .map_err(|_| Error::format(format!("invalid span offset: '{end}'")))?;
        spans.push((start, end));
    }
    Ok(spans)
}

fn encode_spans(spans: &[Span]) -> String {
    spans
        .iter()
        .map(|(start, end)| format!("{start},{end}"))
        .collect::<Vec<_>>()
        .join(";")
}

/// Serialize an annotation document to text, with indentation.
pub fn store_to_string(store: &AnnotationStore) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b'\t', 1);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("data")))?;
    writer.write_event(Event::Start(BytesStart::new("annotations")))?;
    for annotation in store.iter() {
        let tag = if annotation.is_entity() { "entity" } else { "relation" };
        writer.write_event(Event::Start(BytesStart::new(tag)))?;
        write_leaf(&mut writer, "id", &annotation.id)?;
        write_leaf(&mut writer, "type", &annotation.type_name)?;
        if let Some(parents_type) = &annotation.parents_type {
            write_leaf(&mut writer, "parentsType", parents_type)?;
        }
        if let Some(spans) = annotation.entity_spans() {
            if !spans.is_empty() {
                write_leaf(&mut writer, "span", &encode_spans(spans))?;
            }
        }
        if !annotation.properties.is_empty() {
            writer.write_event(Event::Start(BytesStart::new("properties")))?;
            for (name, value) in &annotation.properties {
                let text = match value {
                    PropertyValue::Scalar(text) => text.as_str(),
                    PropertyValue::Reference(id) => id.as_str(),
                };
                write_leaf(&mut writer, name, text)?;
            }
            writer.write_event(Event::End(BytesEnd::new("properties")))?;
        }
        writer.write_event(Event::End(BytesEnd::new(tag)))?;
    }
    writer.write_event(Event::End(BytesEnd::new("annotations")))?;
    writer.write_event(Event::End(BytesEnd::new("data")))?;
    let bytes = writer.into_inner();
    String::from_utf8(bytes).map_err(|e| Error::format(format!("non-UTF-8 output: {e}")))
}

fn write_leaf(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    if !text.is_empty() {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Schema documents
// ---------------------------------------------------------------------------

/// Read a schema document from a file.
pub fn read_schema(path: &Path) -> Result<Schema> {
    let text = fs::read_to_string(path)?;
    parse_schema(&text)
}

#[derive(Default)]
struct RawProperty {
    name: Option<String>,
    required: Option<String>,
    instance_of: Option<String>,
    input: Option<String>,
    text: Option<String>,
}

/// Parse a schema document from text.
pub fn parse_schema(xml: &str) -> Result<Schema> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut default_attributes: HashMap<String, String> = HashMap::new();
    let mut default_attribute_tag: Option<String> = None;
    let mut current_type: Option<String> = None;
    let mut current_properties: BTreeMap<String, SchemaProperty> = BTreeMap::new();
    let mut current_property: Option<RawProperty> = None;
    let mut type_to_properties: HashMap<String, BTreeMap<String, SchemaProperty>> = HashMap::new();

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                path.push(name.clone());
                let depth = path.len();
                if depth == 3 && path[1] == "defaultattribute" {
                    default_attribute_tag = Some(name);
                } else if depth == 4
                    && path[1] == "definition"
                    && (path[2] == "entities" || path[2] == "relations")
                {
                    current_type = attribute(e, "type")?;
                    current_properties = BTreeMap::new();
                } else if depth == 6 && name == "property" {
                    current_property = Some(RawProperty {
                        name: attribute(e, "type")?,
                        required: attribute(e, "required")?,
                        instance_of: attribute(e, "instanceOf")?,
                        input: attribute(e, "input")?,
                        text: None,
                    });
                }
                if matches!(event, Event::Empty(_)) {
                    close_schema_element(
                        &mut path,
                        &default_attributes,
                        &mut default_attribute_tag,
                        &mut current_type,
                        &mut current_properties,
                        &mut current_property,
                        &mut type_to_properties,
                    );
                }
            }
            Event::Text(t) => {
                let text = t.unescape()?.into_owned();
                if let Some(property) = current_property.as_mut() {
                    property.text = Some(text);
                } else if path.len() == 3 && path[1] == "defaultattribute" {
                    if let Some(tag) = &default_attribute_tag {
                        default_attributes.insert(tag.clone(), text);
                    }
                }
            }
            Event::End(_) => {
                close_schema_element(
                    &mut path,
                    &default_attributes,
                    &mut default_attribute_tag,
                    &mut current_type,
                    &mut current_properties,
                    &mut current_property,
                    &mut type_to_properties,
                );
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if type_to_properties.is_empty() {
        return Err(Error::format("no entities or relations in schema"));
    }
    Ok(Schema::from_parts(default_attributes, type_to_properties))
}

#[allow(clippy::too_many_arguments)]
fn close_schema_element(
    path: &mut Vec<String>,
    defaults: &HashMap<String, String>,
    default_attribute_tag: &mut Option<String>,
    current_type: &mut Option<String>,
    current_properties: &mut BTreeMap<String, SchemaProperty>,
    current_property: &mut Option<RawProperty>,
    type_to_properties: &mut HashMap<String, BTreeMap<String, SchemaProperty>>,
) {
    let Some(_name) = path.pop() else {
        return;
    };
    let depth = path.len();
    if depth == 2 && path[1] == "defaultattribute" {
        *default_attribute_tag = None;
    } else if depth == 5 {
        if let Some(raw) = current_property.take() {
            if let Some(property) = resolve_property(raw, defaults) {
                current_properties.insert(property.name.clone(), property);
            }
        }
    } else if depth == 3 && path[1] == "definition" {
        if let Some(type_name) = current_type.take() {
            type_to_properties.insert(type_name, std::mem::take(current_properties));
        }
    }
}

/// Apply the schema's default attributes to a property declaration that
/// omits an attribute, then build the property.
fn resolve_property(raw: RawProperty, defaults: &HashMap<String, String>) -> Option<SchemaProperty> {
    let get = |own: Option<String>, attr: &str| -> Option<String> {
        own.or_else(|| defaults.get(attr).cloned())
    };
    let name = get(raw.name, "type")?;
    let required = get(raw.required, "required").as_deref() == Some("True");
    let instance_of = get(raw.instance_of, "instanceOf")
        .map(|list| list.split(',').map(str::to_string).collect());
    let choices = if get(raw.input, "input").as_deref() == Some("choice") {
        Some(
            raw.text
                .map(|text| text.split(',').map(str::to_string).collect())
                .unwrap_or_default(),
        )
    } else {
        None
    };
    Some(SchemaProperty {
        name,
        required,
        instance_of,
        choices,
    })
}

fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    Ok(element
        .try_get_attribute(name)?
        .map(|attr| attr.unescape_value())
        .transpose()?
        .map(|value| value.into_owned()))
}
