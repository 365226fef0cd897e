//! Set-based precision/recall/F1 accumulators.

use std::collections::BTreeSet;

use serde::Serialize;

use super::views::ScoredItem;

/// A precision/recall/F1 accumulator over reference and predicted item
/// sets.
///
/// Implementations differ in what "correct" means: plain set intersection
/// ([`Scores`]), intersection plus error bookkeeping
/// ([`DebuggingScores`]), or intersection against temporal closures
/// ([`super::closure::TemporalClosureScores`]). All of them merge with
/// [`update`](Self::update), which is associative and commutative, so
/// per-document scores can be reduced into corpus totals in any order.
pub trait ScoreAccumulator: Default {
    /// Accumulate one reference/predicted set pair.
    fn add(&mut self, reference: &BTreeSet<ScoredItem>, predicted: &BTreeSet<ScoredItem>);

    /// Merge another accumulator of the same kind into this one.
    fn update(&mut self, other: &Self);

    /// Number of reference items seen.
    fn reference(&self) -> usize;

    /// Number of predicted items seen.
    fn predicted(&self) -> usize;

    /// The correct count as rendered in reports.
    fn correct_display(&self) -> String;

    /// Fraction of predicted items that were correct; 1.0 with no
    /// predictions.
    fn precision(&self) -> f64;

    /// Fraction of reference items that were found; 1.0 with no
    /// references.
    fn recall(&self) -> f64;

    /// Harmonic mean of precision and recall; 0.0 when both are 0.
    fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

/// Plain set-intersection scores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Scores {
    /// Number of reference items.
    pub reference: usize,
    /// Number of predicted items.
    pub predicted: usize,
    /// Number of items in both sets.
    pub correct: usize,
}

impl Scores {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScoreAccumulator for Scores {
    fn add(&mut self, reference: &BTreeSet<ScoredItem>, predicted: &BTreeSet<ScoredItem>) {
        self.reference += reference.len();
        self.predicted += predicted.len();
        self.correct += reference.intersection(predicted).count();
    }

    fn update(&mut self, other: &Self) {
        self.reference += other.reference;
        self.predicted += other.predicted;
        self.correct += other.correct;
    }

    fn reference(&self) -> usize {
        self.reference
    }

    fn predicted(&self) -> usize {
        self.predicted
    }

    fn correct_display(&self) -> String {
        self.correct.to_string()
    }

    fn precision(&self) -> f64 {
        if self.predicted == 0 {
            1.0
        } else {
            self.correct as f64 / self.predicted as f64
        }
    }

    fn recall(&self) -> f64 {
        if self.reference == 0 {
            1.0
        } else {
            self.correct as f64 / self.reference as f64
        }
    }
}

/// Why an item was counted as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// A reference item missing from the predictions.
    NotInPredicted,
    /// A predicted item missing from the reference.
    NotInReference,
}

impl ErrorKind {
    /// Human-readable form used in error listings.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotInPredicted => "not in predicted",
            ErrorKind::NotInReference => "not in reference",
        }
    }
}

/// Scores that also record every mismatched item.
///
/// Each [`add`](ScoreAccumulator::add) appends the items of the two set
/// differences, sorted by item ordering; [`update`](ScoreAccumulator::update)
/// concatenates recorded errors.
#[derive(Debug, Clone, Default)]
pub struct DebuggingScores {
    /// The underlying counts.
    pub scores: Scores,
    /// Mismatched items with the side they were missing from.
    pub errors: Vec<(ScoredItem, ErrorKind)>,
}

impl ScoreAccumulator for DebuggingScores {
    fn add(&mut self, reference: &BTreeSet<ScoredItem>, predicted: &BTreeSet<ScoredItem>) {
        self.scores.add(reference, predicted);
        let mut errors: Vec<(ScoredItem, ErrorKind)> = Vec::new();
        for item in reference.difference(predicted) {
            errors.push((item.clone(), ErrorKind::NotInPredicted));
        }
        for item in predicted.difference(reference) {
            errors.push((item.clone(), ErrorKind::NotInReference));
        }
        errors.sort_by(|(a, _), (b, _)| a.cmp(b));
        self.errors.extend(errors);
    }

    fn update(&mut self, other: &Self) {
        self.scores.update(&other.scores);
        self.errors.extend(other.errors.iter().cloned());
    }

    fn reference(&self) -> usize {
        self.scores.reference
    }

    fn predicted(&self) -> usize {
        self.scores.predicted
    }

    fn correct_display(&self) -> String {
        self.scores.correct_display()
    }

    fn precision(&self) -> f64 {
        self.scores.precision()
    }

    fn recall(&self) -> f64 {
        self.scores.recall()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Spans;
    use crate::eval::views::{AnnotationView, ViewName, ViewValue};

    fn view(start: usize, end: usize, value: &str) -> ScoredItem {
        ScoredItem::View(AnnotationView::new(
            Spans::Entity(vec![(start, end)]),
            ViewName::Property("EVENT".into(), "Class".into()),
            Some(ViewValue::Scalar(value.into())),
        ))
    }

    #[test]
    fn empty_sets_score_perfectly() {
        let mut scores = Scores::new();
        scores.add(&BTreeSet::new(), &BTreeSet::new());
        assert_eq!(scores.precision(), 1.0);
        assert_eq!(scores.recall(), 1.0);
        assert_eq!(scores.f1(), 0.0);
    }

    #[test]
    fn intersection_counts_as_correct() {
        let reference: BTreeSet<_> = [view(0, 4, "A"), view(5, 9, "B")].into();
        let predicted: BTreeSet<_> = [view(0, 4, "A"), view(5, 9, "C")].into();
        let mut scores = Scores::new();
        scores.add(&reference, &predicted);
        assert_eq!(scores.reference, 2);
        assert_eq!(scores.predicted, 2);
        assert_eq!(scores.correct, 1);
        assert_eq!(scores.precision(), 0.5);
        assert_eq!(scores.recall(), 0.5);
        assert!((scores.f1() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn update_merges_componentwise() {
        let reference: BTreeSet<_> = [view(0, 4, "A")].into();
        let predicted: BTreeSet<_> = [view(0, 4, "A")].into();
        let mut left = Scores::new();
        left.add(&reference, &predicted);
        let mut right = Scores::new();
        right.add(&reference, &BTreeSet::new());
        left.update(&right);
        assert_eq!(left.reference, 2);
        assert_eq!(left.predicted, 1);
        assert_eq!(left.correct, 1);
    }

    #[test]
    fn debugging_scores_record_both_directions() {
        let reference: BTreeSet<_> = [view(0, 4, "A"), view(5, 9, "B")].into();
        let predicted: BTreeSet<_> = [view(5, 9, "C")].into();
        let mut scores = DebuggingScores::default();
        scores.add(&reference, &predicted);
        assert_eq!(scores.errors.len(), 3);
        assert!(scores
            .errors
            .iter()
            .any(|(item, kind)| *kind == ErrorKind::NotInPredicted && item == &view(0, 4, "A")));
        assert!(scores
            .errors
            .iter()
            .any(|(item, kind)| *kind == ErrorKind::NotInReference && item == &view(5, 9, "C")));
        // Sorted by item ordering within one add.
        let mut sorted = scores.errors.clone();
        sorted.sort_by(|(a, _), (b, _)| a.cmp(b));
        assert_eq!(scores.errors, sorted);
    }
}
