//! Annotation data model: spans, property values, and structural keys.
//!
//! An [`Annotation`] is either an entity (carrying its own character spans,
//! possibly discontinuous) or a relation (whose spans are derived from the
//! annotations its properties reference). Properties hold ids, not pointers;
//! the owning [`crate::AnnotationStore`] resolves references on read, which
//! keeps cycle detection an explicit graph walk over indices.

use std::collections::BTreeMap;
use std::fmt;

/// A half-open character-offset interval.
pub type Span = (usize, usize);

/// The spans of an annotation.
///
/// Entities carry their offsets directly. A relation's spans are derived:
/// the spans of each annotation-valued property, in property-name order.
/// Relations may reference other relations, so the shape is recursive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Spans {
    /// Offsets of an entity; more than one pair means a discontinuous entity.
    Entity(Vec<Span>),
    /// Derived spans of a relation, one element per annotation-valued property.
    Relation(Vec<Spans>),
}

impl Spans {
    /// The two intervals of a binary relation, if this is one.
    #[must_use]
    pub fn as_interval_pair(&self) -> Option<(&Spans, &Spans)> {
        match self {
            Spans::Relation(intervals) if intervals.len() == 2 => {
                Some((&intervals[0], &intervals[1]))
            }
            _ => None,
        }
    }

    /// All character ranges covered, in order, regardless of nesting.
    #[must_use]
    pub fn flatten(&self) -> Vec<Span> {
        let mut out = Vec::new();
        self.collect_flat(&mut out);
        out
    }

    fn collect_flat(&self, out: &mut Vec<Span>) {
        match self {
            Spans::Entity(spans) => out.extend_from_slice(spans),
            Spans::Relation(children) => {
                for child in children {
                    child.collect_flat(out);
                }
            }
        }
    }
}

impl fmt::Display for Spans {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Spans::Entity(spans) => {
                let encoded: Vec<String> = spans
                    .iter()
                    .map(|(start, end)| format!("{start},{end}"))
                    .collect();
                write!(f, "{}", encoded.join(";"))
            }
            Spans::Relation(children) => {
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ")(")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// A property value: either a literal scalar or the id of another
/// annotation in the same store.
///
/// References are resolved through the store on read. An empty scalar
/// stands for an unset value (the document format cannot distinguish the
/// two); views surface it as `"<none>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// A literal string value.
    Scalar(String),
    /// The id of another annotation in the same store.
    Reference(String),
}

impl PropertyValue {
    /// The scalar content, if this is a scalar.
    #[must_use]
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            PropertyValue::Scalar(s) => Some(s),
            PropertyValue::Reference(_) => None,
        }
    }

    /// The referenced id, if this is a reference.
    #[must_use]
    pub fn as_reference(&self) -> Option<&str> {
        match self {
            PropertyValue::Scalar(_) => None,
            PropertyValue::Reference(id) => Some(id),
        }
    }

    /// Whether this value is unset (an empty scalar).
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, PropertyValue::Scalar(s) if s.is_empty())
    }
}

/// Distinguishes span-bearing entities from property-bearing relations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationKind {
    /// An entity with its own character offsets.
    Entity {
        /// Offsets in the source text; more than one pair for
        /// discontinuous entities.
        spans: Vec<Span>,
    },
    /// A relation; spans are derived from referenced annotations.
    Relation,
}

/// One annotation of a document.
///
/// Ids are assigned by the caller before insertion and are unique within a
/// store. Properties are kept in name order so that derived relation spans
/// and serialized output are deterministic. Annotations carry no equality
/// of their own: comparison is structural, through
/// [`crate::AnnotationStore::key_of`], so that ids and owning stores never
/// leak into matching.
#[derive(Debug, Clone)]
pub struct Annotation {
    /// Unique id within the owning store.
    pub id: String,
    /// Domain-specific label, e.g. `"TIMEX3"` or `"TLINK"`.
    pub type_name: String,
    /// Grouping hint for annotation UIs; ignored by scoring.
    pub parents_type: Option<String>,
    /// Entity or relation.
    pub kind: AnnotationKind,
    /// Property name to value, name-ordered.
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Annotation {
    /// Create an entity annotation with no spans or properties.
    #[must_use]
    pub fn entity(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            parents_type: None,
            kind: AnnotationKind::Entity { spans: Vec::new() },
            properties: BTreeMap::new(),
        }
    }

    /// Create a relation annotation with no properties.
    #[must_use]
    pub fn relation(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            parents_type: None,
            kind: AnnotationKind::Relation,
            properties: BTreeMap::new(),
        }
    }

    /// Set the grouping hint.
    #[must_use]
    pub fn with_parents_type(mut self, parents_type: impl Into<String>) -> Self {
        self.parents_type = Some(parents_type.into());
        self
    }

    /// Append a character span. No effect on relations.
    #[must_use]
    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        if let AnnotationKind::Entity { ref mut spans } = self.kind {
            spans.push((start, end));
        }
        self
    }

    /// Set a scalar-valued property.
    #[must_use]
    pub fn with_scalar(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties
            .insert(name.into(), PropertyValue::Scalar(value.into()));
        self
    }

    /// Set a reference-valued property pointing at another annotation's id.
    #[must_use]
    pub fn with_reference(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.properties
            .insert(name.into(), PropertyValue::Reference(id.into()));
        self
    }

    /// Whether this annotation is an entity.
    #[must_use]
    pub fn is_entity(&self) -> bool {
        matches!(self.kind, AnnotationKind::Entity { .. })
    }

    /// The entity spans, if this is an entity.
    #[must_use]
    pub fn entity_spans(&self) -> Option<&[Span]> {
        match &self.kind {
            AnnotationKind::Entity { spans } => Some(spans),
            AnnotationKind::Relation => None,
        }
    }
}

/// The store-resolved structural identity of an annotation.
///
/// Two annotations are equal iff their keys are equal: same spans, same
/// type, and recursively equal properties, regardless of which store holds
/// them or what ids they carry. Keys implement `Ord` and `Hash`, so sets of
/// keys support the intersection and difference operations scoring is built
/// on. Construction lives on the store ([`crate::AnnotationStore::key_of`])
/// because references must be resolved, and fails for self-referential
/// annotations rather than recursing forever.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnnotationKey {
    /// Entity spans or derived relation spans.
    pub spans: Spans,
    /// The annotation's type label.
    pub type_name: String,
    /// Properties with references replaced by the referenced key.
    pub properties: BTreeMap<String, KeyValue>,
}

/// A resolved property value inside an [`AnnotationKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyValue {
    /// A literal string value.
    Scalar(String),
    /// A resolved reference, carried by structural identity.
    Annotation(Box<AnnotationKey>),
}

impl fmt::Display for AnnotationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.type_name, self.spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_builder_collects_spans() {
        let ann = Annotation::entity("1@e@doc@gold", "TIMEX3")
            .with_span(0, 4)
            .with_span(10, 12);
        assert_eq!(ann.entity_spans(), Some(&[(0, 4), (10, 12)][..]));
    }

    #[test]
    fn relation_has_no_entity_spans() {
        let ann = Annotation::relation("2@r@doc@gold", "TLINK");
        assert!(ann.entity_spans().is_none());
        assert!(!ann.is_entity());
    }

    #[test]
    fn properties_iterate_in_name_order() {
        let ann = Annotation::relation("3@r@doc@gold", "TLINK")
            .with_reference("Target", "b")
            .with_scalar("Type", "BEFORE")
            .with_reference("Source", "a");
        let names: Vec<&str> = ann.properties.keys().map(String::as_str).collect();
        assert_eq!(names, ["Source", "Target", "Type"]);
    }

    #[test]
    fn spans_flatten_recurses() {
        let spans = Spans::Relation(vec![
            Spans::Entity(vec![(0, 4)]),
            Spans::Entity(vec![(10, 12), (15, 18)]),
        ]);
        assert_eq!(spans.flatten(), vec![(0, 4), (10, 12), (15, 18)]);
    }

    #[test]
    fn empty_scalar_is_none() {
        assert!(PropertyValue::Scalar(String::new()).is_none());
        assert!(!PropertyValue::Scalar("x".into()).is_none());
        assert!(!PropertyValue::Reference(String::new()).is_none());
    }
}
