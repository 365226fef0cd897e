//! Declarative structural validation of annotations.
//!
//! A [`Schema`] declares, per annotation type, which properties exist,
//! which are required, which must reference annotations of given types,
//! and which are constrained to an enumerated choice list. Validation is
//! collected as data during batch runs; it never panics and never aborts
//! a batch at the first offender.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::annotation::{Annotation, PropertyValue};
use crate::error::{Error, Result};
use crate::store::AnnotationStore;

/// One property declaration of a schema type.
#[derive(Debug, Clone)]
pub struct SchemaProperty {
    /// Property name.
    pub name: String,
    /// Whether every annotation of the type must carry this property.
    pub required: bool,
    /// Allowed types of the referenced annotation, for reference-valued
    /// properties. `None` means the property is scalar-valued.
    pub instance_of: Option<Vec<String>>,
    /// Enumerated allowed values, for choice properties.
    pub choices: Option<Vec<String>>,
}

/// An immutable annotation schema: type name to property declarations.
#[derive(Debug, Clone)]
pub struct Schema {
    default_attributes: HashMap<String, String>,
    type_to_properties: HashMap<String, BTreeMap<String, SchemaProperty>>,
}

impl Schema {
    /// Build a schema from parsed parts. Used by the XML reader; most
    /// callers want [`Schema::from_file`].
    #[must_use]
    pub fn from_parts(
        default_attributes: HashMap<String, String>,
        type_to_properties: HashMap<String, BTreeMap<String, SchemaProperty>>,
    ) -> Self {
        Self {
            default_attributes,
            type_to_properties,
        }
    }

    /// Load a schema from a schema document file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        crate::xml::read_schema(path.as_ref())
    }

    /// Parse a schema from schema document text.
    pub fn from_xml(xml: &str) -> Result<Self> {
        crate::xml::parse_schema(xml)
    }

    /// The global default attribute values applied when a property
    /// declaration omits an attribute.
    #[must_use]
    pub fn default_attributes(&self) -> &HashMap<String, String> {
        &self.default_attributes
    }

    /// The declared types, in arbitrary order.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.type_to_properties.keys().map(String::as_str)
    }

    /// The property declarations of one type, name-ordered.
    #[must_use]
    pub fn properties_of(&self, type_name: &str) -> Option<&BTreeMap<String, SchemaProperty>> {
        self.type_to_properties.get(type_name)
    }

    /// Validate a single annotation against the schema.
    ///
    /// Checks, in order: the annotation is not self-referential; its type
    /// is declared; every required property is present; no undeclared
    /// property is present; reference-valued (`instanceOf`) properties
    /// hold a reference to an allowed type; choice properties hold one of
    /// the enumerated values.
    pub fn validate(&self, store: &AnnotationStore, annotation: &Annotation) -> Result<()> {
        if store.is_self_referential(annotation) {
            return Err(Error::validation(format!(
                "'{}' is self-referential",
                annotation.id
            )));
        }
        let schema_properties = self
            .type_to_properties
            .get(&annotation.type_name)
            .ok_or_else(|| {
                Error::validation(format!(
                    "invalid annotation type '{}'",
                    annotation.type_name
                ))
            })?;
        for schema_property in schema_properties.values() {
            if schema_property.required
                && !annotation.properties.contains_key(&schema_property.name)
            {
                return Err(Error::validation(format!(
                    "missing required property '{}' of annotation type '{}'",
                    schema_property.name, annotation.type_name
                )));
            }
        }
        for (name, value) in &annotation.properties {
            let schema_property = schema_properties.get(name).ok_or_else(|| {
                Error::validation(format!(
                    "no property '{}' defined for annotation type '{}'",
                    name, annotation.type_name
                ))
            })?;
            if let Some(instance_of) = &schema_property.instance_of {
                self.check_instance_of(store, annotation, schema_property, instance_of, value)?;
            }
            if let Some(choices) = &schema_property.choices {
                check_choices(annotation, schema_property, choices, value)?;
            }
        }
        Ok(())
    }

    fn check_instance_of(
        &self,
        store: &AnnotationStore,
        annotation: &Annotation,
        schema_property: &SchemaProperty,
        instance_of: &[String],
        value: &PropertyValue,
    ) -> Result<()> {
        match value {
            PropertyValue::Scalar(text) if text.is_empty() => {
                if schema_property.required {
                    Err(Error::validation(format!(
                        "missing value for property '{}' of annotation type '{}'",
                        schema_property.name, annotation.type_name
                    )))
                } else {
                    Ok(())
                }
            }
            PropertyValue::Scalar(text) => Err(Error::validation(format!(
                "invalid value '{}' for property '{}' of annotation type '{}'",
                text, schema_property.name, annotation.type_name
            ))),
            PropertyValue::Reference(target) => match store.get(target) {
                Some(referenced) if instance_of.contains(&referenced.type_name) => Ok(()),
                Some(referenced) => Err(Error::validation(format!(
                    "invalid type '{}' for property '{}' of annotation type '{}'",
                    referenced.type_name, schema_property.name, annotation.type_name
                ))),
                None => Err(Error::validation(format!(
                    "invalid value '{}' for property '{}' of annotation type '{}'",
                    target, schema_property.name, annotation.type_name
                ))),
            },
        }
    }

    /// Validate every annotation, collecting failures instead of stopping.
    ///
    /// Returns `(annotation, message)` pairs in insertion order; an empty
    /// vector means the store conforms.
    #[must_use]
    pub fn errors<'a>(&self, store: &'a AnnotationStore) -> Vec<(&'a Annotation, String)> {
        let mut collected = Vec::new();
        for annotation in store.iter() {
            if let Err(error) = self.validate(store, annotation) {
                let message = match error {
                    Error::Validation(message) => message,
                    other => other.to_string(),
                };
                collected.push((annotation, message));
            }
        }
        collected
    }
}

fn check_choices(
    annotation: &Annotation,
    schema_property: &SchemaProperty,
    choices: &[String],
    value: &PropertyValue,
) -> Result<()> {
    match value {
        PropertyValue::Reference(target) => Err(Error::validation(format!(
            "invalid value '{}' for property '{}' of annotation type '{}'",
            target, schema_property.name, annotation.type_name
        ))),
        PropertyValue::Scalar(text) if choices.iter().any(|choice| choice == text) => Ok(()),
        PropertyValue::Scalar(text) => Err(Error::validation(format!(
            "invalid value '{}' for property '{}' of annotation type '{}'",
            text, schema_property.name, annotation.type_name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Annotation;

    fn tlink_schema() -> Schema {
        let mut properties = BTreeMap::new();
        properties.insert(
            "Source".to_string(),
            SchemaProperty {
                name: "Source".to_string(),
                required: true,
                instance_of: Some(vec!["EVENT".to_string(), "TIMEX3".to_string()]),
                choices: None,
            },
        );
        properties.insert(
            "Type".to_string(),
            SchemaProperty {
                name: "Type".to_string(),
                required: true,
                instance_of: None,
                choices: Some(vec!["BEFORE".to_string(), "CONTAINS".to_string()]),
            },
        );
        let mut event_properties = BTreeMap::new();
        event_properties.insert(
            "Class".to_string(),
            SchemaProperty {
                name: "Class".to_string(),
                required: false,
                instance_of: None,
                choices: None,
            },
        );
        let mut types = HashMap::new();
        types.insert("TLINK".to_string(), properties);
        types.insert("EVENT".to_string(), event_properties);
        Schema::from_parts(HashMap::new(), types)
    }

    #[test]
    fn missing_required_property_names_it() {
        let schema = tlink_schema();
        let mut store = AnnotationStore::new();
        store
            .append(Annotation::entity("e", "EVENT").with_span(0, 4))
            .unwrap();
        store
            .append(Annotation::relation("r", "TLINK").with_reference("Source", "e"))
            .unwrap();

        let errors = schema.errors(&store);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0.id, "r");
        assert!(errors[0].1.contains("'Type'"));
    }

    #[test]
    fn undeclared_property_is_an_error() {
        let schema = tlink_schema();
        let mut store = AnnotationStore::new();
        store
            .append(
                Annotation::entity("e", "EVENT")
                    .with_span(0, 4)
                    .with_scalar("Polarity", "POS"),
            )
            .unwrap();
        let errors = schema.errors(&store);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].1.contains("'Polarity'"));
    }

    #[test]
    fn choice_property_rejects_reference_and_unknown_value() {
        let schema = tlink_schema();
        let mut store = AnnotationStore::new();
        store
            .append(Annotation::entity("e", "EVENT").with_span(0, 4))
            .unwrap();
        store
            .append(
                Annotation::relation("r", "TLINK")
                    .with_reference("Source", "e")
                    .with_scalar("Type", "AFTERWARDS"),
            )
            .unwrap();
        let errors = schema.errors(&store);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].1.contains("AFTERWARDS"));
    }

    #[test]
    fn instance_of_rejects_wrong_referenced_type() {
        let schema = tlink_schema();
        let mut store = AnnotationStore::new();
        store
            .append(Annotation::relation("other", "TLINK").with_scalar("Type", "BEFORE"))
            .unwrap();
        store
            .append(
                Annotation::relation("r", "TLINK")
                    .with_reference("Source", "other")
                    .with_scalar("Type", "BEFORE"),
            )
            .unwrap();
        let errors = schema.errors(&store);
        // "other" is missing its required Source; "r" references a TLINK
        // where an EVENT or TIMEX3 is expected.
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|(a, m)| a.id == "r" && m.contains("invalid type 'TLINK'")));
    }

    #[test]
    fn self_referential_annotation_fails_validation_first() {
        let schema = tlink_schema();
        let mut store = AnnotationStore::new();
        store
            .append(
                Annotation::relation("r", "TLINK")
                    .with_reference("Source", "r")
                    .with_scalar("Type", "BEFORE"),
            )
            .unwrap();
        let errors = schema.errors(&store);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].1.contains("self-referential"));
    }
}
