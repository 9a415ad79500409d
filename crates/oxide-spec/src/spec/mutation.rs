//! Write-side specs: updates, deletes and inserts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::condition::ConditionSpec;

/// `UPDATE ... SET column = :param ... WHERE ...`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateSpec {
    /// Column to parameter assignments, rendered in column order.
    pub set: BTreeMap<String, String>,
    /// WHERE tree.
    #[serde(rename = "where", skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<ConditionSpec>,
}

/// `DELETE FROM ... WHERE ...`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteSpec {
    /// WHERE tree.
    #[serde(rename = "where", skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<ConditionSpec>,
}

/// `INSERT INTO ... VALUES (...) [ON CONFLICT ...]`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InsertSpec {
    /// Column to parameter map, inserted in column order.
    pub values: BTreeMap<String, String>,
    /// Conflict target columns.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conflict_columns: Vec<String>,
    /// `nothing` or `update`; required when `conflict_columns` is set.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub conflict_action: String,
    /// Columns refreshed by `update`; defaults to every non-conflict column.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub update_columns: Vec<String>,
}
