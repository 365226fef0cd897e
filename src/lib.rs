//! # tempeval
//!
//! Temporal-annotation comparison toolkit: compare two sets of span-based
//! annotations (reference vs. predicted) over a document, with
//! precision/recall/F1 scoring, schema validation, and a temporal closure
//! engine that credits predictions logically entailed by the reference.
//!
//! - **Store**: id-indexed, insertion-ordered arena of entity/relation
//!   annotations with structural equality and cycle detection
//! - **Selector**: include/exclude scoping over `type:property:value`
//!   patterns with `*` wildcards
//! - **Scoring**: set-based P/R/F1 over annotation views, with a
//!   debugging variant that records every mismatch
//! - **Temporal closure**: point-algebra transitivity over interval
//!   relations, scored against the closure instead of the raw sets
//! - **Schema**: declarative per-type property contracts, validated in
//!   batch without stopping at the first offender
//!
//! ## Quick start
//!
//! ```rust
//! use tempeval::{Annotation, AnnotationStore, ScoreAccumulator, Scores, Selector};
//!
//! let mut reference = AnnotationStore::new();
//! reference.append(
//!     Annotation::entity("1@e@doc@gold", "EVENT").with_span(12, 17),
//! )?;
//!
//! let mut predicted = AnnotationStore::new();
//! predicted.append(
//!     Annotation::entity("1@e@doc@sys", "EVENT").with_span(12, 17),
//! )?;
//!
//! let scores: tempeval::NamedScores<Scores> =
//!     tempeval::score_stores(&reference, Some(&predicted), &Selector::all())?;
//! let event = &scores[&tempeval::ScoreName::Type("EVENT".to_string())];
//! assert_eq!(event.f1(), 1.0);
//! # Ok::<(), tempeval::Error>(())
//! ```
//!
//! ## Temporal closure
//!
//! Relation predictions are often right for the wrong label: a system that
//! says `CONTAINS` where the gold says `INCLUDES`, or infers a relation
//! the gold only implies through a chain, deserves credit. Route the
//! relation property through [`TemporalClosureScores`] instead of
//! [`Scores`] and each side is compared against the *other side's*
//! entailment closure.
//!
//! Documents are flat files; model training, taggers and corpus drivers
//! are external collaborators that produce and consume the document
//! format and call into the scoring API here.

#![warn(missing_docs)]

pub mod annotation;
mod error;
pub mod eval;
pub mod schema;
pub mod select;
pub mod store;
pub mod xml;

pub use annotation::{
    Annotation, AnnotationKey, AnnotationKind, KeyValue, PropertyValue, Span, Spans,
};
pub use error::{Error, Result};
pub use eval::{
    load_lenient, merge_named_scores, score_files, score_overlapping_spans, score_stores,
    temporal_closure, AnnotationView, DebuggingScores, ErrorKind, NamedScores, ScoreAccumulator,
    ScoreName, ScoredItem, Scores, TemporalClosureScores, ViewName, ViewValue,
};
pub use schema::{Schema, SchemaProperty};
pub use select::Selector;
pub use store::AnnotationStore;
