//! Errors raised while assembling or rendering a statement.

use thiserror::Error;

use super::aggregate::AggregateFunc;

/// Errors produced by the builders.
///
/// Builders accept arbitrary identifiers and operator text while they are
/// assembled; everything is validated when the statement renders, so a
/// rejected statement never produces SQL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A table, column, or alias is not a plain (optionally qualified) identifier.
    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),

    /// An operator outside the accepted set.
    #[error("unsupported operator `{0}`")]
    UnsupportedOperator(String),

    /// A parameter name that cannot be bound.
    #[error("invalid parameter name `{0}`")]
    InvalidParam(String),

    /// A row-locking mode outside `update`, `no_key_update`, `share`, `key_share`.
    #[error("invalid row-locking mode `{0}`")]
    InvalidLockMode(String),

    /// A conflict action other than `nothing` or `update`.
    #[error("invalid conflict action `{0}`")]
    InvalidConflictAction(String),

    /// Conflict columns were given without saying what to do on conflict.
    #[error("conflict columns require a conflict action")]
    MissingConflictAction,

    /// `DO UPDATE` needs a conflict target.
    #[error("ON CONFLICT DO UPDATE requires conflict columns")]
    MissingConflictTarget,

    /// SUM, AVG, MIN and MAX need a column to aggregate.
    #[error("{0} requires a target field")]
    MissingAggregateField(AggregateFunc),

    /// An UPDATE without assignments.
    #[error("UPDATE requires at least one SET assignment")]
    EmptySet,

    /// An INSERT without columns.
    #[error("INSERT requires at least one column")]
    EmptyInsert,
}

/// Result type alias for builder operations.
pub type Result<T> = std::result::Result<T, BuildError>;
