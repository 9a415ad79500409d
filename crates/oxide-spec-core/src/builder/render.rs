//! Rendered statements and the writer shared by every builder.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::{BuildError, Result};

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("Invalid identifier regex")
});

static PARAM_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid parameter regex"));

/// Operators accepted between a column and a parameter or another column.
const COMPARISON_OPERATORS: &[&str] = &[
    "=", "!=", "<>", "<", "<=", ">", ">=", "LIKE", "NOT LIKE", "ILIKE", "NOT ILIKE", "GLOB", "@>",
    "<@", "&&",
];

/// Distance operators, valid in ORDER BY and select expressions.
const DISTANCE_OPERATORS: &[&str] = &["<->", "<#>", "<=>", "<+>"];

/// A statement rendered to SQL text together with its parameter names.
///
/// Every `?` placeholder in `sql` corresponds, in order, to one entry in
/// `params`. A parameter referenced twice appears twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendered {
    /// SQL text with `?` placeholders.
    pub sql: String,
    /// Parameter names in placeholder order.
    pub params: Vec<String>,
}

/// Accumulates SQL text and parameter names.
#[derive(Debug, Default)]
pub(crate) struct SqlWriter {
    sql: String,
    params: Vec<String>,
}

impl SqlWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, fragment: &str) {
        self.sql.push_str(fragment);
    }

    /// Writes a validated identifier.
    pub(crate) fn ident(&mut self, name: &str) -> Result<()> {
        self.sql.push_str(check_ident(name)?);
        Ok(())
    }

    /// Writes a comma-separated identifier list.
    pub(crate) fn idents(&mut self, names: &[String]) -> Result<()> {
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.ident(name)?;
        }
        Ok(())
    }

    /// Writes a `?` placeholder bound to `name`.
    pub(crate) fn param(&mut self, name: &str) -> Result<()> {
        if !PARAM_NAME.is_match(name) {
            return Err(BuildError::InvalidParam(String::from(name)));
        }
        self.sql.push('?');
        self.params.push(String::from(name));
        Ok(())
    }

    pub(crate) fn finish(self) -> Rendered {
        Rendered {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// Returns the identifier if it is a plain or `table.column` name.
pub(crate) fn check_ident(name: &str) -> Result<&str> {
    if IDENTIFIER.is_match(name) {
        Ok(name)
    } else {
        Err(BuildError::InvalidIdentifier(String::from(name)))
    }
}

/// Normalizes a comparison operator (case, inner whitespace) and checks it.
pub(crate) fn comparison_operator(op: &str) -> Result<String> {
    let normalized = normalize(op);
    if COMPARISON_OPERATORS.contains(&normalized.as_str()) {
        Ok(normalized)
    } else {
        Err(BuildError::UnsupportedOperator(String::from(op)))
    }
}

/// Like [`comparison_operator`] but also accepts distance operators.
pub(crate) fn expression_operator(op: &str) -> Result<String> {
    let normalized = normalize(op);
    if DISTANCE_OPERATORS.contains(&normalized.as_str())
        || COMPARISON_OPERATORS.contains(&normalized.as_str())
    {
        Ok(normalized)
    } else {
        Err(BuildError::UnsupportedOperator(String::from(op)))
    }
}

fn normalize(op: &str) -> String {
    op.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}
