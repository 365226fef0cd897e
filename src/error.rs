//! Error types for tempeval.

use thiserror::Error;

/// Result type for tempeval operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for tempeval operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// An annotation was appended without an id.
    #[error("no id defined for annotation")]
    MissingId,

    /// An annotation id was inserted twice into the same store.
    #[error("duplicate id: {0}")]
    DuplicateId(String),

    /// An annotation id was looked up but is not in the store.
    #[error("no annotation with id: {0}")]
    NotFound(String),

    /// An annotation's property-reference graph revisits itself.
    ///
    /// Equality, hashing and span derivation are undefined for such an
    /// annotation, so the offending document must be excluded from scoring.
    #[error("self-referential annotation: {0}")]
    SelfReferential(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed XML in a document or schema file.
    #[error("invalid XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Malformed XML attribute.
    #[error("invalid XML attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    /// Structurally well-formed XML that does not follow the document format.
    #[error("invalid document: {0}")]
    Format(String),

    /// An annotation does not conform to its schema.
    #[error("schema validation failed: {0}")]
    Validation(String),
}

impl Error {
    /// Create a document format error.
    pub fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }

    /// Create a schema validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}
