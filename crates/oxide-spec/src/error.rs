//! Error types for the spec engine.

use oxide_spec_core::BuildError;
use thiserror::Error;

use crate::capability::CapabilityKind;

/// Errors raised while deriving, building, registering or executing specs.
///
/// Messages carry names, indices and limits but never SQL text or values,
/// so they are safe to surface to external callers.
#[derive(Debug, Error)]
pub enum SpecError {
    /// A condition tree nests deeper than the configured limit.
    #[error("condition depth {depth} exceeds maximum {max}")]
    DepthExceeded {
        /// Depth at which the limit was crossed.
        depth: usize,
        /// Configured maximum.
        max: usize,
    },

    /// A compound was requested without operands.
    #[error("compound query requires at least one operand")]
    EmptyCompound,

    /// A set-operation tag that is not union/intersect/except (with ALL).
    #[error("operand {index}: unknown set operation `{operation}`")]
    UnknownSetOperation {
        /// Position in the operand list.
        index: usize,
        /// The rejected tag.
        operation: String,
    },

    /// Building a compound operand failed.
    #[error("operand {index}: {source}")]
    Operand {
        /// Position in the operand list.
        index: usize,
        /// Underlying failure.
        #[source]
        source: Box<SpecError>,
    },

    /// Building a compound base query failed.
    #[error("compound base: {0}")]
    Base(#[source] Box<SpecError>),

    /// The model has no primary key constraint.
    #[error("table `{table}` has no primary key field")]
    MissingPrimaryKey {
        /// Table name.
        table: String,
    },

    /// No capability with that name is registered for the kind.
    #[error("{kind} capability `{name}` not found")]
    NotFound {
        /// Capability kind.
        kind: CapabilityKind,
        /// Requested name.
        name: String,
    },

    /// A required parameter has no value and no default.
    #[error("missing value for parameter `{0}`")]
    MissingParam(String),

    /// A parameter value that cannot be bound (JSON array or object).
    #[error("unsupported value for parameter `{0}`")]
    UnsupportedParamValue(String),

    /// The builder rejected the statement.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON (de)serialisation error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for spec engine operations.
pub type Result<T> = std::result::Result<T, SpecError>;
