//! Score tables: one row per score name, per document or merged.

use std::fmt::Write as _;

use serde::Serialize;

use super::scores::ScoreAccumulator;
use super::NamedScores;

/// One row of a scoring report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    /// The score name, e.g. `"TLINK:Type"` or `"*"`.
    pub name: String,
    /// Reference item count.
    pub reference: usize,
    /// Predicted item count.
    pub predicted: usize,
    /// Correct count as displayed (closure scores render a pair).
    pub correct: String,
    /// Precision.
    pub precision: f64,
    /// Recall.
    pub recall: f64,
    /// F1.
    pub f1: f64,
}

/// Flatten named scores into report rows, in name order.
#[must_use]
pub fn rows<S: ScoreAccumulator>(named: &NamedScores<S>) -> Vec<ReportRow> {
    named
        .iter()
        .map(|(name, scores)| ReportRow {
            name: name.to_string(),
            reference: scores.reference(),
            predicted: scores.predicted(),
            correct: scores.correct_display(),
            precision: scores.precision(),
            recall: scores.recall(),
            f1: scores.f1(),
        })
        .collect()
}

/// Render merged scores as a fixed-width table.
#[must_use]
pub fn render_table<S: ScoreAccumulator>(named: &NamedScores<S>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<40}\t{:^5}\t{:^5}\t{:^5}\t{:^5}\t{:^5}\t{:^5}",
        "", "ref", "pred", "corr", "P", "R", "F1"
    );
    for row in rows(named) {
        let _ = writeln!(
            out,
            "{:<40}\t{:<5}\t{:<5}\t{:<5}\t{:5.3}\t{:5.3}\t{:5.3}",
            row.name, row.reference, row.predicted, row.correct, row.precision, row.recall, row.f1
        );
    }
    out
}

/// Render per-document scores as a fixed-width table with a leading file
/// column.
#[must_use]
pub fn render_document_table<'a, S, I>(file_named_scores: I) -> String
where
    S: ScoreAccumulator + 'a,
    I: IntoIterator<Item = (&'a str, &'a NamedScores<S>)>,
{
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<40}\t{:<40}\t{:^5}\t{:^5}\t{:^5}\t{:^5}\t{:^5}\t{:^5}",
        "", "", "ref", "pred", "corr", "P", "R", "F1"
    );
    for (file_name, named) in file_named_scores {
        for row in rows(named) {
            let _ = writeln!(
                out,
                "{:<40}\t{:<40}\t{:<5}\t{:<5}\t{:<5}\t{:5.3}\t{:5.3}\t{:5.3}",
                file_name,
                row.name,
                row.reference,
                row.predicted,
                row.correct,
                row.precision,
                row.recall,
                row.f1
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::views::ScoreName;
    use crate::eval::Scores;
    use std::collections::BTreeMap;

    fn sample() -> NamedScores<Scores> {
        let mut named = BTreeMap::new();
        named.insert(
            ScoreName::Type("EVENT".to_string()),
            Scores {
                reference: 4,
                predicted: 2,
                correct: 2,
            },
        );
        named
    }

    #[test]
    fn rows_carry_computed_metrics() {
        let named = sample();
        let rows = rows(&named);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "EVENT");
        assert_eq!(rows[0].precision, 1.0);
        assert_eq!(rows[0].recall, 0.5);
        assert!((rows[0].f1 - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn table_includes_header_and_row() {
        let table = render_table(&sample());
        let mut lines = table.lines();
        assert!(lines.next().unwrap().contains("F1"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("EVENT"));
        assert!(row.contains("0.667"));
    }

    #[test]
    fn rows_serialize_to_json() {
        let rows = rows(&sample());
        let json = serde_json::to_string(&rows).unwrap();
        assert!(json.contains("\"name\":\"EVENT\""));
        assert!(json.contains("\"reference\":4"));
    }
}
