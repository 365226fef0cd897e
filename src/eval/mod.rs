//! Scoring: view extraction, set-based comparison, and closure-aware
//! relation scoring.
//!
//! A scoring pass turns each annotation into comparison units ("views"),
//! groups reference and predicted units by name, and feeds each group to a
//! [`ScoreAccumulator`]. The accumulator decides what correctness means:
//! plain intersection ([`Scores`]), intersection with error bookkeeping
//! ([`DebuggingScores`]), or entailment under temporal closure
//! ([`TemporalClosureScores`]).
//!
//! ```no_run
//! use tempeval::{score_files, Scores, Selector};
//!
//! let selector = Selector::from_exprs(&["TLINK:Type".to_string()], &[]);
//! let scores: tempeval::NamedScores<Scores> = score_files(
//!     "gold/doc1.xml".as_ref(),
//!     Some("system/doc1.xml".as_ref()),
//!     &selector,
//! )?;
//! for (name, s) in &scores {
//!     println!("{name}: {:.3}", tempeval::ScoreAccumulator::f1(s));
//! }
//! # Ok::<(), tempeval::Error>(())
//! ```

pub mod closure;
pub mod overlap;
pub mod report;
pub mod scores;
pub mod views;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub use closure::{temporal_closure, TemporalClosureScores};
pub use overlap::score_overlapping_spans;
pub use scores::{DebuggingScores, ErrorKind, ScoreAccumulator, Scores};
pub use views::{AnnotationView, ScoreName, ScoredItem, ViewName, ViewValue};

use crate::annotation::PropertyValue;
use crate::error::Result;
use crate::select::Selector;
use crate::store::AnnotationStore;

/// Scores keyed by the name they are reported under.
pub type NamedScores<S> = BTreeMap<ScoreName, S>;

/// Placeholder surfaced for unset property values.
pub const NONE_VALUE: &str = "<none>";

/// Copy a store for scoring, dropping properties the selector excludes.
///
/// Whole-annotation equality compares properties recursively, so an
/// excluded property must not break a match; dropping it from a scoring
/// copy keeps the caller's store untouched. Only annotations of selected
/// types are touched, mirroring how exclusion scopes to what is scored.
fn filtered_for_scoring(store: &AnnotationStore, selector: &Selector) -> AnnotationStore {
    let mut filtered = store.clone();
    let drops: Vec<(String, Vec<String>)> = store
        .iter()
        .filter(|annotation| selector.selects_type(&annotation.type_name))
        .map(|annotation| {
            let dropped = annotation
                .properties
                .keys()
                .filter(|name| !selector.selects_property(&annotation.type_name, name))
                .cloned()
                .collect();
            (annotation.id.clone(), dropped)
        })
        .collect();
    for (id, names) in drops {
        if let Ok(annotation) = filtered.select_id_mut(&id) {
            for name in names {
                annotation.properties.remove(&name);
            }
        }
    }
    filtered
}

/// The views of one annotation the selector admits: a span view and, per
/// property, a name view and (for scalar values) a value view.
fn views_of(
    store: &AnnotationStore,
    annotation: &crate::annotation::Annotation,
    selector: &Selector,
) -> Result<Vec<AnnotationView>> {
    let mut views = Vec::new();
    let spans = store.spans_of(annotation)?;
    let type_name = &annotation.type_name;

    if selector.selects(type_name, Some("<span>"), None) {
        views.push(AnnotationView::new(
            spans.clone(),
            ViewName::Span(type_name.clone()),
            None,
        ));
    }

    for (name, value) in &annotation.properties {
        // Reference values are compared by the referenced annotation's
        // structural identity and are never bucketed per value.
        let (view_value, scalar) = match value {
            PropertyValue::Scalar(text) if text.is_empty() => {
                (ViewValue::Scalar(NONE_VALUE.to_string()), Some(NONE_VALUE.to_string()))
            }
            PropertyValue::Scalar(text) => {
                (ViewValue::Scalar(text.clone()), Some(text.clone()))
            }
            PropertyValue::Reference(id) => match store.get(id) {
                Some(referenced) => (ViewValue::Key(store.key_of(referenced)?), None),
                // A dangling reference reads as its raw id string.
                None => (ViewValue::Scalar(id.clone()), Some(id.clone())),
            },
        };
        if selector.selects(type_name, Some(name), None) {
            views.push(AnnotationView::new(
                spans.clone(),
                ViewName::Property(type_name.clone(), name.clone()),
                Some(view_value),
            ));
        }
        if let Some(scalar) = scalar {
            if selector.selects(type_name, Some(name), Some(&scalar)) {
                views.push(AnnotationView::new(
                    spans.clone(),
                    ViewName::PropertyValue(type_name.clone(), name.clone(), scalar.clone()),
                    Some(ViewValue::Scalar(scalar)),
                ));
            }
        }
    }
    Ok(views)
}

/// Score one reference store against one predicted store.
///
/// `None` for `predicted` scores against an empty document (every
/// reference annotation counts as missed). Whole-annotation scores are
/// grouped per type and merged into the `"*"` bucket; span-granularity
/// scores are additionally merged into `"*:<span>"`.
///
/// Fails with [`crate::Error::SelfReferential`] if either store contains
/// a self-referential annotation; gate with
/// [`AnnotationStore::find_self_referential`] to degrade instead.
pub fn score_stores<S: ScoreAccumulator>(
    reference: &AnnotationStore,
    predicted: Option<&AnnotationStore>,
    selector: &Selector,
) -> Result<NamedScores<S>> {
    let empty = AnnotationStore::new();
    let predicted = predicted.unwrap_or(&empty);
    let reference = filtered_for_scoring(reference, selector);
    let predicted = filtered_for_scoring(predicted, selector);

    type ItemPair = (BTreeSet<ScoredItem>, BTreeSet<ScoredItem>);
    let mut by_type: BTreeMap<String, ItemPair> = BTreeMap::new();
    for annotation in reference.iter() {
        let key = reference.key_of(annotation)?;
        by_type
            .entry(annotation.type_name.clone())
            .or_default()
            .0
            .insert(ScoredItem::Annotation(key));
    }
    for annotation in predicted.iter() {
        let key = predicted.key_of(annotation)?;
        by_type
            .entry(annotation.type_name.clone())
            .or_default()
            .1
            .insert(ScoredItem::Annotation(key));
    }

    let mut result: NamedScores<S> = BTreeMap::new();
    for (type_name, (reference_items, predicted_items)) in &by_type {
        if selector.selects_type(type_name) {
            result
                .entry(ScoreName::All)
                .or_default()
                .add(reference_items, predicted_items);
            result
                .entry(ScoreName::Type(type_name.clone()))
                .or_default()
                .add(reference_items, predicted_items);
        }

        let mut by_name: BTreeMap<ViewName, ItemPair> = BTreeMap::new();
        for annotation in reference.select_type(type_name) {
            for view in views_of(&reference, annotation, selector)? {
                by_name
                    .entry(view.name.clone())
                    .or_default()
                    .0
                    .insert(ScoredItem::View(view));
            }
        }
        for annotation in predicted.select_type(type_name) {
            for view in views_of(&predicted, annotation, selector)? {
                by_name
                    .entry(view.name.clone())
                    .or_default()
                    .1
                    .insert(ScoredItem::View(view));
            }
        }
        for (view_name, (reference_views, predicted_views)) in &by_name {
            result
                .entry(ScoreName::View(view_name.clone()))
                .or_default()
                .add(reference_views, predicted_views);
            if matches!(view_name, ViewName::Span(_)) {
                result
                    .entry(ScoreName::AllSpans)
                    .or_default()
                    .add(reference_views, predicted_views);
            }
        }
    }
    Ok(result)
}

/// Load a document for scoring, degrading to an empty store on parse
/// failure or self-reference so one bad file cannot abort a corpus run.
#[must_use]
pub fn load_lenient(path: &Path) -> AnnotationStore {
    let store = match AnnotationStore::from_file(path) {
        Ok(store) => store,
        Err(error) => {
            log::warn!("{}: ignoring invalid document: {error}", path.display());
            return AnnotationStore::new();
        }
    };
    let self_referential = store
        .find_self_referential()
        .map(|annotation| annotation.id.clone());
    match self_referential {
        Some(id) => {
            log::warn!(
                "{}: skipping document with self-referential annotation {id}",
                path.display()
            );
            AnnotationStore::new()
        }
        None => store,
    }
}

/// Score one reference document file against one predicted document file.
///
/// Files that fail to parse, or that contain a self-referential
/// annotation, are logged and treated as empty. `None` for the predicted
/// path scores against an empty document.
pub fn score_files<S: ScoreAccumulator>(
    reference_path: &Path,
    predicted_path: Option<&Path>,
    selector: &Selector,
) -> Result<NamedScores<S>> {
    let reference = load_lenient(reference_path);
    let predicted = predicted_path.map(load_lenient);
    score_stores(&reference, predicted.as_ref(), selector)
}

/// Merge per-document scores into running totals, in any order.
pub fn merge_named_scores<S: ScoreAccumulator>(into: &mut NamedScores<S>, other: &NamedScores<S>) {
    for (name, scores) in other {
        into.entry(name.clone()).or_default().update(scores);
    }
}
