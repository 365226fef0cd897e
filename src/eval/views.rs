//! Comparison units: annotation views and the names scores are keyed by.

use std::fmt;

use crate::annotation::{AnnotationKey, Spans};

/// What a view is about: a whole annotation's spans, one property, or one
/// property restricted to a particular value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViewName {
    /// `(type, "<span>")` — the annotation located by its spans alone.
    Span(String),
    /// `(type, property)` — one property of the annotation.
    Property(String, String),
    /// `(type, property, value)` — one property bucketed by scalar value.
    PropertyValue(String, String, String),
}

impl fmt::Display for ViewName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewName::Span(type_name) => write!(f, "{type_name}:<span>"),
            ViewName::Property(type_name, property) => write!(f, "{type_name}:{property}"),
            ViewName::PropertyValue(type_name, property, value) => {
                write!(f, "{type_name}:{property}:{value}")
            }
        }
    }
}

/// The payload of a view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViewValue {
    /// A scalar property value; unset values surface as `"<none>"`.
    Scalar(String),
    /// A reference-valued property, compared by the referenced
    /// annotation's structural identity.
    Key(AnnotationKey),
}

impl fmt::Display for ViewValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewValue::Scalar(value) => write!(f, "{value}"),
            ViewValue::Key(key) => write!(f, "{key}"),
        }
    }
}

/// A derived, read-only comparison unit: spans, name, and an optional
/// value.
///
/// Views exist only during a scoring pass. Ordering is by spans first, so
/// sorted error listings group by document position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnnotationView {
    /// Spans of the viewed annotation.
    pub spans: Spans,
    /// What the view is about.
    pub name: ViewName,
    /// Span views carry no value; property views carry one.
    pub value: Option<ViewValue>,
}

impl AnnotationView {
    /// Create a view.
    #[must_use]
    pub fn new(spans: Spans, name: ViewName, value: Option<ViewValue>) -> Self {
        Self { spans, name, value }
    }
}

impl fmt::Display for AnnotationView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} [{}] = {}", self.name, self.spans, value),
            None => write!(f, "{} [{}]", self.name, self.spans),
        }
    }
}

/// One item fed to a score accumulator: a whole annotation (by structural
/// key) or a single view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScoredItem {
    /// A whole annotation, compared structurally.
    Annotation(AnnotationKey),
    /// One view of an annotation.
    View(AnnotationView),
}

impl ScoredItem {
    /// The spans of the item, shared by both shapes.
    #[must_use]
    pub fn spans(&self) -> &Spans {
        match self {
            ScoredItem::Annotation(key) => &key.spans,
            ScoredItem::View(view) => &view.spans,
        }
    }

    /// The view, if this item is one.
    #[must_use]
    pub fn as_view(&self) -> Option<&AnnotationView> {
        match self {
            ScoredItem::Annotation(_) => None,
            ScoredItem::View(view) => Some(view),
        }
    }
}

impl fmt::Display for ScoredItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoredItem::Annotation(key) => write!(f, "{key}"),
            ScoredItem::View(view) => write!(f, "{view}"),
        }
    }
}

/// The name a group of scores is reported under.
///
/// Ordering is stable for reports: catch-all buckets first, then per-type
/// rows, then view rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScoreName {
    /// `"*"` — every whole-annotation comparison merged across types.
    All,
    /// `("*", "<span>")` — every span comparison merged across types.
    AllSpans,
    /// Whole-annotation comparison for one type.
    Type(String),
    /// One view granularity.
    View(ViewName),
}

impl fmt::Display for ScoreName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreName::All => write!(f, "*"),
            ScoreName::AllSpans => write!(f, "*:<span>"),
            ScoreName::Type(type_name) => write!(f, "{type_name}"),
            ScoreName::View(view_name) => write!(f, "{view_name}"),
        }
    }
}
