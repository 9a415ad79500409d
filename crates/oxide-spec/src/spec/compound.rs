//! Set-operation compounds.

use serde::{Deserialize, Serialize};

use super::query::{OrderBySpec, QuerySpec};

/// One `<operation> <query>` step.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SetOperandSpec {
    /// `union`, `union_all`, `intersect`, `intersect_all`, `except` or
    /// `except_all`, in any case.
    pub operation: String,
    /// The combined query.
    pub query: QuerySpec,
}

/// A base query combined with one or more operands.
///
/// ORDER BY, LIMIT and OFFSET here apply to the combined result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompoundQuerySpec {
    /// First query.
    pub base: QuerySpec,
    /// Operations applied in order.
    pub operands: Vec<SetOperandSpec>,
    /// Ordering of the combined result.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderBySpec>,
    /// Literal LIMIT on the combined result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Parameterized LIMIT; wins over `limit`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_param: Option<String>,
    /// Literal OFFSET on the combined result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    /// Parameterized OFFSET; wins over `offset`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_param: Option<String>,
}

impl SetOperandSpec {
    /// Creates an operand.
    #[must_use]
    pub fn new(operation: &str, query: QuerySpec) -> Self {
        Self {
            operation: String::from(operation),
            query,
        }
    }
}
