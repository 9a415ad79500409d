//! UPDATE statement builder.

use super::condition::{write_clause, Condition, Filter};
use super::error::{BuildError, Result};
use super::render::{Rendered, SqlWriter};

/// An UPDATE statement with parameter-bound assignments.
///
/// Assignments render in insertion order, before the WHERE clause, so their
/// parameters come first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    table: String,
    assignments: Vec<(String, String)>,
    conditions: Vec<Condition>,
}

impl Update {
    /// Starts an UPDATE on `table`.
    #[must_use]
    pub fn table(table: &str) -> Self {
        Self {
            table: String::from(table),
            assignments: vec![],
            conditions: vec![],
        }
    }

    /// Adds `column = ?` bound to `param`.
    #[must_use]
    pub fn set(mut self, column: &str, param: &str) -> Self {
        self.assignments
            .push((String::from(column), String::from(param)));
        self
    }

    /// Renders the statement.
    pub fn render(&self) -> Result<Rendered> {
        if self.assignments.is_empty() {
            return Err(BuildError::EmptySet);
        }
        let mut w = SqlWriter::new();
        w.push("UPDATE ");
        w.ident(&self.table)?;
        w.push(" SET ");
        for (i, (column, param)) in self.assignments.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.ident(column)?;
            w.push(" = ");
            w.param(param)?;
        }
        write_clause(&mut w, " WHERE ", &self.conditions)?;
        Ok(w.finish())
    }
}

impl Filter for Update {
    fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }
}
