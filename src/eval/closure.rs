//! Temporal closure: scoring interval relations against what a relation
//! set logically entails.
//!
//! Plain set intersection under-counts correct relation predictions when a
//! predicted relation is labeled differently from, but entailed by, the
//! reference — or follows from a chain of reference relations. This module
//! expands interval relations into point relations (`start(I)`/`end(I)`
//! ordered by `<` and `=`), closes the point set under transitivity, and
//! re-derives every interval relation the closed set supports, restricted
//! to interval pairs that actually co-occur in the input.
//!
//! Precision and recall are each computed against a different closure:
//! predictions are correct if the *reference* closure entails them, and
//! reference relations are found if the *predicted* closure entails them.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use once_cell::sync::Lazy;
use serde::Serialize;

use super::scores::ScoreAccumulator;
use super::views::{AnnotationView, ScoredItem, ViewName, ViewValue};
use crate::annotation::Spans;

/// Start or end point of an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Side {
    Start,
    End,
}

/// One interval endpoint; intervals are interned per scoring call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct Point {
    interval: u32,
    side: Side,
}

fn point(interval: u32, side: Side) -> Point {
    Point { interval, side }
}

/// Point ordering operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum PointOp {
    Less,
    Equal,
}

/// `(left point, operator, right point)`.
type PointRelation = (Point, PointOp, Point);

/// One entry of the label table: interval index (0 or 1), side, operator,
/// interval index, side.
type PointRule = (usize, Side, PointOp, usize, Side);

/// The fixed vocabulary of interval relations, as point requirements.
///
/// `BEFORE` means the first interval's end precedes the second's start;
/// `CONTAINS` nests the second interval strictly inside the first. Several
/// labels (`SIMULTANEOUS`, `IDENTITY`, `DURING`, `DURING_INV`) share one
/// point semantics and are collapsed by deduplication.
static INTERVAL_TO_POINT: Lazy<BTreeMap<&'static str, Vec<PointRule>>> = Lazy::new(|| {
    use PointOp::{Equal, Less};
    use Side::{End, Start};
    let mut table: BTreeMap<&'static str, Vec<PointRule>> = BTreeMap::new();
    table.insert("BEFORE", vec![(0, End, Less, 1, Start)]);
    table.insert("AFTER", vec![(1, End, Less, 0, Start)]);
    table.insert("IBEFORE", vec![(0, End, Equal, 1, Start)]);
    table.insert("IAFTER", vec![(0, Start, Equal, 1, End)]);
    table.insert("CONTAINS", vec![(0, Start, Less, 1, Start), (1, End, Less, 0, End)]);
    table.insert("INCLUDES", vec![(0, Start, Less, 1, Start), (1, End, Less, 0, End)]);
    table.insert("IS_INCLUDED", vec![(1, Start, Less, 0, Start), (0, End, Less, 1, End)]);
    table.insert("BEGINS-ON", vec![(0, Start, Equal, 1, Start)]);
    table.insert("ENDS-ON", vec![(0, End, Equal, 1, End)]);
    table.insert("BEGINS", vec![(0, Start, Equal, 1, Start), (0, End, Less, 1, End)]);
    table.insert("BEGUN_BY", vec![(0, Start, Equal, 1, Start), (1, End, Less, 0, End)]);
    table.insert("ENDS", vec![(1, Start, Less, 0, Start), (0, End, Equal, 1, End)]);
    table.insert("ENDED_BY", vec![(0, Start, Less, 1, Start), (0, End, Equal, 1, End)]);
    table.insert("SIMULTANEOUS", vec![(0, Start, Equal, 1, Start), (0, End, Equal, 1, End)]);
    table.insert("IDENTITY", vec![(0, Start, Equal, 1, Start), (0, End, Equal, 1, End)]);
    table.insert("DURING", vec![(0, Start, Equal, 1, Start), (0, End, Equal, 1, End)]);
    table.insert("DURING_INV", vec![(0, Start, Equal, 1, Start), (0, End, Equal, 1, End)]);
    table.insert("OVERLAP", vec![(0, Start, Less, 1, End), (1, Start, Less, 0, End)]);
    table
});

/// Transitivity for point operators: a chain is `=` only when every link
/// is `=`.
fn combine(first: PointOp, second: PointOp) -> PointOp {
    match (first, second) {
        (PointOp::Equal, PointOp::Equal) => PointOp::Equal,
        _ => PointOp::Less,
    }
}

/// Interval interning: closure arithmetic runs over small indices, and the
/// spans are resolved back only when views are emitted.
#[derive(Debug, Default)]
struct Intervals {
    list: Vec<Spans>,
    index: HashMap<Spans, u32>,
}

impl Intervals {
    fn intern(&mut self, spans: &Spans) -> u32 {
        if let Some(&id) = self.index.get(spans) {
            return id;
        }
        let id = self.list.len() as u32;
        self.list.push(spans.clone());
        self.index.insert(spans.clone(), id);
        id
    }

    fn resolve(&self, id: u32) -> &Spans {
        &self.list[id as usize]
    }
}

/// A view that passed the validity filter, with its intervals interned.
#[derive(Debug, Clone)]
struct ValidRelation {
    view: AnnotationView,
    interval1: u32,
    interval2: u32,
    label: String,
}

impl ValidRelation {
    /// Expand to point relations: base facts `start < end` for both
    /// intervals, the label's requirements, and the mirror of every `=`
    /// fact.
    fn point_relations(&self) -> BTreeSet<PointRelation> {
        use Side::{End, Start};
        let mut relations = BTreeSet::new();
        relations.insert((point(self.interval1, Start), PointOp::Less, point(self.interval1, End)));
        relations.insert((point(self.interval2, Start), PointOp::Less, point(self.interval2, End)));
        let intervals = [self.interval1, self.interval2];
        for &(index1, side1, op, index2, side2) in &INTERVAL_TO_POINT[self.label.as_str()] {
            let left = point(intervals[index1], side1);
            let right = point(intervals[index2], side2);
            relations.insert((left, op, right));
            if op == PointOp::Equal {
                relations.insert((right, op, left));
            }
        }
        relations
    }
}

/// Filter items down to scoreable relation views: exactly two intervals
/// and a label from the fixed vocabulary. Anything else is heterogeneity
/// expected in annotated corpora and is dropped with a logged note.
fn valid_relations<'a>(
    items: impl IntoIterator<Item = &'a ScoredItem>,
    intervals: &mut Intervals,
) -> Vec<ValidRelation> {
    let mut valid = Vec::new();
    for item in items {
        let Some(view) = item.as_view() else {
            log::warn!("temporal closure requires single-property views: {item}");
            continue;
        };
        let Some((first, second)) = view.spans.as_interval_pair() else {
            log::warn!("invalid spans for temporal closure: {view}");
            continue;
        };
        let label = match &view.value {
            Some(ViewValue::Scalar(label)) if INTERVAL_TO_POINT.contains_key(label.as_str()) => {
                label.clone()
            }
            _ => {
                log::warn!("invalid relation for temporal closure: {view}");
                continue;
            }
        };
        let interval1 = intervals.intern(first);
        let interval2 = intervals.intern(second);
        valid.push(ValidRelation {
            view: view.clone(),
            interval1,
            interval2,
            label,
        });
    }
    valid
}

/// Drop relations whose point expansion duplicates an earlier one.
///
/// Relations are processed in view order (spans, then name, then value),
/// so the kept representative of each point-semantics class is the
/// ordering-smallest — a deterministic tie-break among labels like
/// `SIMULTANEOUS`/`IDENTITY`/`DURING` that expand identically.
fn remove_duplicate_relations(relations: Vec<ValidRelation>) -> Vec<ValidRelation> {
    let mut seen: HashSet<BTreeSet<PointRelation>> = HashSet::new();
    let mut kept = Vec::new();
    for relation in relations {
        if seen.insert(relation.point_relations()) {
            kept.push(relation);
        }
    }
    kept
}

/// Close the point-relation set under transitivity, then re-derive every
/// interval relation it supports between interval pairs sharing a view
/// name.
fn close(relations: &[ValidRelation], intervals: &Intervals) -> BTreeSet<AnnotationView> {
    // Transitive closure to a fixed point. Termination: the point count is
    // finite, so the relation set is bounded and strictly grows until no
    // new triple appears.
    let mut point_relations: HashSet<PointRelation> = HashSet::new();
    let mut index: HashMap<Point, Vec<PointRelation>> = HashMap::new();
    let mut new_relations: HashSet<PointRelation> = relations
        .iter()
        .flat_map(ValidRelation::point_relations)
        .collect();
    while !new_relations.is_empty() {
        for relation in new_relations.drain() {
            if point_relations.insert(relation) {
                index.entry(relation.0).or_default().push(relation);
            }
        }
        let mut found = HashSet::new();
        for &(point1, op12, point2) in &point_relations {
            if let Some(continuations) = index.get(&point2) {
                for &(_, op23, point3) in continuations {
                    let candidate = (point1, combine(op12, op23), point3);
                    if !point_relations.contains(&candidate) {
                        found.insert(candidate);
                    }
                }
            }
        }
        new_relations = found;
    }

    // Names attach to intervals through the input relations; the closure
    // only re-labels interval pairs that co-occur under some shared name,
    // never invented pairs.
    let mut interval_names: HashMap<u32, BTreeSet<ViewName>> = HashMap::new();
    for relation in relations {
        for interval in [relation.interval1, relation.interval2] {
            interval_names
                .entry(interval)
                .or_default()
                .insert(relation.view.name.clone());
        }
    }

    let mut pair_names: HashMap<(u32, u32), BTreeSet<ViewName>> = HashMap::new();
    for &(left, _, right) in &point_relations {
        let pair = (left.interval, right.interval);
        if pair_names.contains_key(&pair) {
            continue;
        }
        let shared: BTreeSet<ViewName> = match (
            interval_names.get(&pair.0),
            interval_names.get(&pair.1),
        ) {
            (Some(first), Some(second)) => first.intersection(second).cloned().collect(),
            _ => BTreeSet::new(),
        };
        if !shared.is_empty() {
            pair_names.insert(pair, shared.clone());
            pair_names.insert((pair.1, pair.0), shared);
        }
    }

    let mut derived = BTreeSet::new();
    for (&(first, second), names) in &pair_names {
        for (label, rules) in INTERVAL_TO_POINT.iter() {
            let satisfied = rules.iter().all(|&(index1, side1, op, index2, side2)| {
                let pair = [first, second];
                point_relations.contains(&(
                    point(pair[index1], side1),
                    op,
                    point(pair[index2], side2),
                ))
            });
            if satisfied {
                let spans = Spans::Relation(vec![
                    intervals.resolve(first).clone(),
                    intervals.resolve(second).clone(),
                ]);
                for name in names {
                    derived.insert(AnnotationView::new(
                        spans.clone(),
                        name.clone(),
                        Some(ViewValue::Scalar((*label).to_string())),
                    ));
                }
            }
        }
    }
    derived
}

/// The set of relation views entailed by the given views.
///
/// Invalid views (wrong arity, unknown label) are dropped with a logged
/// note. The result is a superset of the valid input.
#[must_use]
pub fn temporal_closure(views: &BTreeSet<AnnotationView>) -> BTreeSet<AnnotationView> {
    let mut intervals = Intervals::default();
    let items: Vec<ScoredItem> = views
        .iter()
        .map(|view| ScoredItem::View(view.clone()))
        .collect();
    let valid = valid_relations(items.iter(), &mut intervals);
    close(&valid, &intervals)
}

/// Closure-aware precision/recall scores for temporal relations.
///
/// Unlike [`super::scores::Scores`], precision and recall are computed
/// against different closures: `precision_correct` counts predictions the
/// reference closure entails, `recall_correct` counts reference relations
/// the predicted closure entails.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TemporalClosureScores {
    /// Valid, deduplicated reference relations seen.
    pub reference: usize,
    /// Valid, deduplicated predicted relations seen.
    pub predicted: usize,
    /// Predictions entailed by the reference closure.
    pub precision_correct: usize,
    /// Reference relations entailed by the predicted closure.
    pub recall_correct: usize,
}

impl TemporalClosureScores {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScoreAccumulator for TemporalClosureScores {
    fn add(&mut self, reference: &BTreeSet<ScoredItem>, predicted: &BTreeSet<ScoredItem>) {
        let mut intervals = Intervals::default();
        let reference = remove_duplicate_relations(valid_relations(reference, &mut intervals));
        let predicted = remove_duplicate_relations(valid_relations(predicted, &mut intervals));
        self.reference += reference.len();
        self.predicted += predicted.len();

        let reference_views: BTreeSet<AnnotationView> =
            reference.iter().map(|relation| relation.view.clone()).collect();
        let predicted_views: BTreeSet<AnnotationView> =
            predicted.iter().map(|relation| relation.view.clone()).collect();

        let reference_closure = close(&reference, &intervals);
        let predicted_closure = close(&predicted, &intervals);
        self.precision_correct += reference_closure.intersection(&predicted_views).count();
        self.recall_correct += predicted_closure.intersection(&reference_views).count();
    }

    fn update(&mut self, other: &Self) {
        self.reference += other.reference;
        self.predicted += other.predicted;
        self.precision_correct += other.precision_correct;
        self.recall_correct += other.recall_correct;
    }

    fn reference(&self) -> usize {
        self.reference
    }

    fn predicted(&self) -> usize {
        self.predicted
    }

    fn correct_display(&self) -> String {
        format!("{}/{}", self.precision_correct, self.recall_correct)
    }

    fn precision(&self) -> f64 {
        if self.predicted == 0 {
            1.0
        } else {
            self.precision_correct as f64 / self.predicted as f64
        }
    }

    fn recall(&self) -> f64 {
        if self.reference == 0 {
            1.0
        } else {
            self.recall_correct as f64 / self.reference as f64
        }
    }
}
