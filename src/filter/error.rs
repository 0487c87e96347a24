//! Filter-specific error types.

use thiserror::Error;

/// Errors raised while compiling or managing filters.
///
/// None of these abort filtering: the store logs them and drops the
/// offending entry, the caller gets them back for inspection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("No such filter type found: {0}")]
    UnknownOperator(String),

    #[error("Column has no field set: {0}")]
    MissingField(String),

    #[error("No header filter set on column: {0}")]
    NoHeaderFilter(String),

    #[error("Matching filter not found: {0}")]
    NotFound(String),

    #[error("Script error: {0}")]
    Script(String),
}

pub type FilterResult<T> = std::result::Result<T, FilterError>;
