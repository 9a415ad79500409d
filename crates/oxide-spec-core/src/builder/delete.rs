//! DELETE statement builder.

use super::condition::{write_clause, Condition, Filter};
use super::error::Result;
use super::render::{Rendered, SqlWriter};

/// A DELETE statement.
///
/// **Warning**: without a WHERE clause every row is deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delete {
    table: String,
    conditions: Vec<Condition>,
}

impl Delete {
    /// Starts a DELETE from `table`.
    #[must_use]
    pub fn from(table: &str) -> Self {
        Self {
            table: String::from(table),
            conditions: vec![],
        }
    }

    /// Renders the statement.
    pub fn render(&self) -> Result<Rendered> {
        let mut w = SqlWriter::new();
        w.push("DELETE FROM ");
        w.ident(&self.table)?;
        write_clause(&mut w, " WHERE ", &self.conditions)?;
        Ok(w.finish())
    }
}

impl Filter for Delete {
    fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::condition::col;

    #[test]
    fn test_delete_all() {
        let delete = Delete::from("sessions");
        assert_eq!(delete.render().unwrap().sql, "DELETE FROM sessions");
    }

    #[test]
    fn test_delete_with_or() {
        let rendered = Delete::from("sessions")
            .where_or(vec![col("expired").eq("expired"), col("user_id").is_null()])
            .render()
            .unwrap();
        assert_eq!(
            rendered.sql,
            "DELETE FROM sessions WHERE (expired = ? OR user_id IS NULL)"
        );
        assert_eq!(rendered.params, vec!["expired"]);
    }
}
