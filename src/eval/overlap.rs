//! Overlap-tolerant span comparison.
//!
//! Counts a predicted annotation as matching a reference annotation of the
//! same type when any of their character ranges overlap by at least one
//! character. Overlap equality is not transitive, so this cannot ride on
//! the set-intersection machinery; matching is done pairwise, iterating
//! the smaller side against the larger. Useful for debugging boundary
//! errors, not as a real evaluation method.

use std::collections::BTreeMap;

use crate::annotation::Span;
use crate::error::Result;
use crate::eval::scores::Scores;
use crate::eval::views::{ScoreName, ViewName};
use crate::select::Selector;
use crate::store::AnnotationStore;

/// Whether any two constituent ranges overlap by one or more characters.
#[must_use]
pub fn spans_overlap(first: &[Span], second: &[Span]) -> bool {
    first.iter().any(|&(first_start, first_end)| {
        second
            .iter()
            .any(|&(second_start, second_end)| first_start < second_end && second_start < first_end)
    })
}

/// Score annotation spans per type with overlap-tolerant matching.
///
/// Rows are keyed like span views (`type:<span>`), with the usual
/// `*:<span>` merge across types.
pub fn score_overlapping_spans(
    reference: &AnnotationStore,
    predicted: &AnnotationStore,
    selector: &Selector,
) -> Result<BTreeMap<ScoreName, Scores>> {
    let mut types: Vec<&str> = reference
        .iter()
        .chain(predicted.iter())
        .map(|annotation| annotation.type_name.as_str())
        .collect();
    types.sort_unstable();
    types.dedup();

    let mut result: BTreeMap<ScoreName, Scores> = BTreeMap::new();
    for type_name in types {
        if !selector.selects(type_name, Some("<span>"), None) {
            continue;
        }
        let reference_spans = flat_spans(reference, type_name)?;
        let predicted_spans = flat_spans(predicted, type_name)?;
        let scores = Scores {
            reference: reference_spans.len(),
            predicted: predicted_spans.len(),
            correct: count_matches(&reference_spans, &predicted_spans),
        };
        merge(&mut result, ScoreName::AllSpans, &scores);
        merge(
            &mut result,
            ScoreName::View(ViewName::Span(type_name.to_string())),
            &scores,
        );
    }
    Ok(result)
}

fn flat_spans(store: &AnnotationStore, type_name: &str) -> Result<Vec<Vec<Span>>> {
    store
        .select_type(type_name)
        .map(|annotation| Ok(store.spans_of(annotation)?.flatten()))
        .collect()
}

/// Members of the smaller side with an overlapping counterpart in the
/// larger side.
fn count_matches(reference: &[Vec<Span>], predicted: &[Vec<Span>]) -> usize {
    let (smaller, larger) = if reference.len() <= predicted.len() {
        (reference, predicted)
    } else {
        (predicted, reference)
    };
    smaller
        .iter()
        .filter(|spans| larger.iter().any(|other| spans_overlap(spans, other)))
        .count()
}

fn merge(result: &mut BTreeMap<ScoreName, Scores>, name: ScoreName, scores: &Scores) {
    use crate::eval::scores::ScoreAccumulator;
    result.entry(name).or_default().update(scores);
}
