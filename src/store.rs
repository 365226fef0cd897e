//! The annotation store: an id-indexed, insertion-ordered arena owning all
//! annotations of one document.
//!
//! Properties hold ids rather than pointers, so every reference is resolved
//! through the store. That makes cycle detection a graph walk with an
//! explicit per-path visited set instead of a bet on recursion limits, and
//! it lets one annotation be removed without invalidating others.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use crate::annotation::{Annotation, AnnotationKey, KeyValue, PropertyValue, Span, Spans};
use crate::error::{Error, Result};

/// All annotations of one document, in insertion order.
///
/// The store is the exclusive owner of its annotations: they are moved in
/// with [`append`](Self::append) and only handed back out by reference (or
/// by value on [`remove`](Self::remove)).
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    order: Vec<String>,
    by_id: HashMap<String, Annotation>,
}

impl AnnotationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from an annotation document file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        crate::xml::read_store(path.as_ref())
    }

    /// Parse a store from annotation document text.
    pub fn from_xml(xml: &str) -> Result<Self> {
        crate::xml::parse_store(xml)
    }

    /// Serialize the store to an annotation document file.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        crate::xml::write_store(self, path.as_ref())
    }

    /// Serialize the store to annotation document text.
    pub fn to_xml(&self) -> Result<String> {
        crate::xml::store_to_string(self)
    }

    /// Number of annotations in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the store holds no annotations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Insert an annotation.
    ///
    /// Fails with [`Error::MissingId`] if the id is empty and with
    /// [`Error::DuplicateId`] if the id is already registered.
    pub fn append(&mut self, annotation: Annotation) -> Result<()> {
        if annotation.id.is_empty() {
            return Err(Error::MissingId);
        }
        if self.by_id.contains_key(&annotation.id) {
            return Err(Error::DuplicateId(annotation.id));
        }
        self.order.push(annotation.id.clone());
        self.by_id.insert(annotation.id.clone(), annotation);
        Ok(())
    }

    /// Remove an annotation by id, returning it.
    ///
    /// References other annotations hold to the removed id are left in
    /// place; run [`dangling_references`](Self::dangling_references) before
    /// serializing if that matters to the consumer.
    pub fn remove(&mut self, id: &str) -> Result<Annotation> {
        let annotation = self
            .by_id
            .remove(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        self.order.retain(|existing| existing != id);
        Ok(annotation)
    }

    /// Look up an annotation by id.
    pub fn select_id(&self, id: &str) -> Result<&Annotation> {
        self.by_id
            .get(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Resolve an id to an annotation, if present.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Annotation> {
        self.by_id.get(id)
    }

    /// Iterate all annotations in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.order.iter().filter_map(move |id| self.by_id.get(id))
    }

    /// Iterate the annotations of one type, in insertion order.
    pub fn select_type<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a Annotation> {
        self.iter()
            .filter(move |annotation| annotation.type_name == type_name)
    }

    /// Mutable access to an annotation by id.
    pub fn select_id_mut(&mut self, id: &str) -> Result<&mut Annotation> {
        self.by_id
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Find the first annotation whose reference graph revisits a node on
    /// the walk from that annotation, in insertion order.
    ///
    /// The visited set is tracked per path: a diamond where two properties
    /// reference the same annotation is sharing, not a cycle, and is not
    /// reported.
    #[must_use]
    pub fn find_self_referential(&self) -> Option<&Annotation> {
        self.iter()
            .find(|annotation| self.is_self_referential(annotation))
    }

    /// Whether one annotation's reference graph revisits a node on the walk
    /// from that annotation.
    #[must_use]
    pub fn is_self_referential(&self, annotation: &Annotation) -> bool {
        let mut path = Vec::new();
        self.revisits_path(annotation, &mut path)
    }

    fn revisits_path(&self, annotation: &Annotation, path: &mut Vec<String>) -> bool {
        if path.iter().any(|id| *id == annotation.id) {
            return true;
        }
        path.push(annotation.id.clone());
        for value in annotation.properties.values() {
            if let PropertyValue::Reference(target) = value {
                if let Some(referenced) = self.by_id.get(target) {
                    if self.revisits_path(referenced, path) {
                        path.pop();
                        return true;
                    }
                }
            }
        }
        path.pop();
        false
    }

    /// The spans of an annotation: its own offsets for an entity, or the
    /// spans of each annotation-valued property (in property-name order)
    /// for a relation.
    ///
    /// Fails with [`Error::SelfReferential`] instead of recursing forever
    /// when relations reference each other in a cycle.
    pub fn spans_of(&self, annotation: &Annotation) -> Result<Spans> {
        let mut path = Vec::new();
        self.spans_on_path(annotation, &mut path)
    }

    fn spans_on_path(&self, annotation: &Annotation, path: &mut Vec<String>) -> Result<Spans> {
        if path.iter().any(|id| *id == annotation.id) {
            return Err(Error::SelfReferential(annotation.id.clone()));
        }
        match &annotation.kind {
            crate::annotation::AnnotationKind::Entity { spans } => {
                Ok(Spans::Entity(spans.clone()))
            }
            crate::annotation::AnnotationKind::Relation => {
                path.push(annotation.id.clone());
                let mut children = Vec::new();
                for value in annotation.properties.values() {
                    if let PropertyValue::Reference(target) = value {
                        if let Some(referenced) = self.by_id.get(target) {
                            children.push(self.spans_on_path(referenced, path)?);
                        }
                    }
                }
                path.pop();
                Ok(Spans::Relation(children))
            }
        }
    }

    /// Build the structural key of an annotation, resolving references
    /// recursively.
    ///
    /// Fails with [`Error::SelfReferential`] on cyclic references. A
    /// reference to an id that is not in the store resolves to its raw id
    /// string, matching read semantics for dangling references.
    pub fn key_of(&self, annotation: &Annotation) -> Result<AnnotationKey> {
        let mut path = Vec::new();
        self.key_on_path(annotation, &mut path)
    }

    fn key_on_path(&self, annotation: &Annotation, path: &mut Vec<String>) -> Result<AnnotationKey> {
        if path.iter().any(|id| *id == annotation.id) {
            return Err(Error::SelfReferential(annotation.id.clone()));
        }
        let spans = self.spans_of(annotation)?;
        path.push(annotation.id.clone());
        let mut properties = BTreeMap::new();
        for (name, value) in &annotation.properties {
            let resolved = match value {
                PropertyValue::Scalar(text) => KeyValue::Scalar(text.clone()),
                PropertyValue::Reference(target) => match self.by_id.get(target) {
                    Some(referenced) => {
                        KeyValue::Annotation(Box::new(self.key_on_path(referenced, path)?))
                    }
                    None => KeyValue::Scalar(target.clone()),
                },
            };
            properties.insert(name.clone(), resolved);
        }
        path.pop();
        Ok(AnnotationKey {
            spans,
            type_name: annotation.type_name.clone(),
            properties,
        })
    }

    /// The structural keys of every annotation, as a set.
    ///
    /// Useful for order-independent document comparison; fails if any
    /// annotation is self-referential.
    pub fn keys(&self) -> Result<BTreeSet<AnnotationKey>> {
        self.iter().map(|annotation| self.key_of(annotation)).collect()
    }

    /// References whose target id is not (or no longer) in the store.
    ///
    /// Returns `(annotation id, property name, missing target id)` triples.
    /// Recommended before serialization, since [`remove`](Self::remove)
    /// leaves references held elsewhere untouched.
    #[must_use]
    pub fn dangling_references(&self) -> Vec<(String, String, String)> {
        let mut dangling = Vec::new();
        for annotation in self.iter() {
            for (name, value) in &annotation.properties {
                if let PropertyValue::Reference(target) = value {
                    if !self.by_id.contains_key(target) {
                        dangling.push((annotation.id.clone(), name.clone(), target.clone()));
                    }
                }
            }
        }
        dangling
    }

    /// Groups of two or more distinct entities spanning identical offsets.
    ///
    /// A common annotation mistake worth reporting before adjudication;
    /// relations are ignored.
    #[must_use]
    pub fn entities_with_identical_spans(&self) -> Vec<(Vec<Span>, Vec<&Annotation>)> {
        let mut by_spans: BTreeMap<Vec<Span>, Vec<&Annotation>> = BTreeMap::new();
        for annotation in self.iter() {
            if let Some(spans) = annotation.entity_spans() {
                by_spans.entry(spans.to_vec()).or_default().push(annotation);
            }
        }
        by_spans
            .into_iter()
            .filter(|(_, group)| group.len() > 1)
            .collect()
    }
}

impl Extend<Annotation> for AnnotationStore {
    /// Append annotations, silently skipping ones that fail to insert.
    ///
    /// Prefer [`append`](Self::append) when duplicate ids must be surfaced.
    fn extend<T: IntoIterator<Item = Annotation>>(&mut self, iter: T) {
        for annotation in iter {
            let _ = self.append(annotation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(annotations: Vec<Annotation>) -> AnnotationStore {
        let mut store = AnnotationStore::new();
        for annotation in annotations {
            store.append(annotation).unwrap();
        }
        store
    }

    #[test]
    fn append_rejects_missing_and_duplicate_ids() {
        let mut store = AnnotationStore::new();
        let unnamed = Annotation::entity("", "TIMEX3");
        assert!(matches!(store.append(unnamed), Err(Error::MissingId)));

        store.append(Annotation::entity("a", "TIMEX3")).unwrap();
        let duplicate = store.append(Annotation::entity("a", "EVENT"));
        assert!(matches!(duplicate, Err(Error::DuplicateId(id)) if id == "a"));
    }

    #[test]
    fn select_type_preserves_insertion_order() {
        let store = store_with(vec![
            Annotation::entity("a", "EVENT"),
            Annotation::entity("b", "TIMEX3"),
            Annotation::entity("c", "EVENT"),
        ]);
        let ids: Vec<&str> = store.select_type("EVENT").map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
    }

    #[test]
    fn remove_leaves_dangling_references_detectable() {
        let mut store = store_with(vec![
            Annotation::entity("e1", "EVENT").with_span(0, 4),
            Annotation::relation("r1", "TLINK").with_reference("Source", "e1"),
        ]);
        store.remove("e1").unwrap();
        let dangling = store.dangling_references();
        assert_eq!(
            dangling,
            vec![("r1".to_string(), "Source".to_string(), "e1".to_string())]
        );
    }

    #[test]
    fn diamond_sharing_is_not_a_cycle() {
        let store = store_with(vec![
            Annotation::entity("c", "EVENT").with_span(0, 4),
            Annotation::relation("a", "ALINK")
                .with_reference("Source", "c")
                .with_reference("Target", "c"),
            Annotation::relation("b", "TLINK")
                .with_reference("Source", "a")
                .with_reference("Target", "c"),
        ]);
        assert!(store.find_self_referential().is_none());
    }

    #[test]
    fn mutual_references_are_a_cycle() {
        let mut store = AnnotationStore::new();
        store
            .append(Annotation::relation("a", "TLINK").with_reference("Target", "b"))
            .unwrap();
        store
            .append(Annotation::relation("b", "TLINK").with_reference("Target", "a"))
            .unwrap();
        let offender = store.find_self_referential().unwrap();
        assert_eq!(offender.id, "a");
    }

    #[test]
    fn relation_spans_follow_property_name_order() {
        let store = store_with(vec![
            Annotation::entity("later", "EVENT").with_span(20, 24),
            Annotation::entity("earlier", "EVENT").with_span(0, 4),
            Annotation::relation("r", "TLINK")
                .with_reference("Target", "later")
                .with_reference("Source", "earlier")
                .with_scalar("Type", "BEFORE"),
        ]);
        let relation = store.select_id("r").unwrap();
        let spans = store.spans_of(relation).unwrap();
        // Source sorts before Target, so the earlier entity comes first.
        assert_eq!(
            spans,
            Spans::Relation(vec![
                Spans::Entity(vec![(0, 4)]),
                Spans::Entity(vec![(20, 24)]),
            ])
        );
    }

    #[test]
    fn key_of_fails_on_cycle() {
        let mut store = AnnotationStore::new();
        store
            .append(Annotation::relation("a", "TLINK").with_reference("Target", "b"))
            .unwrap();
        store
            .append(Annotation::relation("b", "TLINK").with_reference("Target", "a"))
            .unwrap();
        let a = store.select_id("a").unwrap();
        assert!(matches!(store.key_of(a), Err(Error::SelfReferential(_))));
    }
}
