//! INSERT statement builder with optional upsert clause.

use super::error::{BuildError, Result};
use super::render::{Rendered, SqlWriter};

/// What to do when an inserted row hits a uniqueness conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictAction {
    /// `DO NOTHING`
    Nothing,
    /// `DO UPDATE SET c = excluded.c`
    Update,
}

impl ConflictAction {
    /// Parses `nothing` or `update`, case-insensitively.
    pub fn parse(action: &str) -> Result<Self> {
        match action.trim().to_ascii_lowercase().as_str() {
            "nothing" => Ok(Self::Nothing),
            "update" => Ok(Self::Update),
            _ => Err(BuildError::InvalidConflictAction(String::from(action))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OnConflict {
    columns: Vec<String>,
    action: ConflictAction,
    update_columns: Vec<String>,
}

/// A single-row INSERT with parameter-bound values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insert {
    table: String,
    values: Vec<(String, String)>,
    on_conflict: Option<OnConflict>,
}

impl Insert {
    /// Starts an INSERT into `table`.
    #[must_use]
    pub fn into_table(table: &str) -> Self {
        Self {
            table: String::from(table),
            values: vec![],
            on_conflict: None,
        }
    }

    /// Inserts `column` bound to `param`.
    #[must_use]
    pub fn value(mut self, column: &str, param: &str) -> Self {
        self.values.push((String::from(column), String::from(param)));
        self
    }

    /// Adds `ON CONFLICT (columns) DO ...`.
    #[must_use]
    pub fn on_conflict<I, S>(mut self, columns: I, action: ConflictAction) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.on_conflict = Some(OnConflict {
            columns: columns.into_iter().map(Into::into).collect(),
            action,
            update_columns: vec![],
        });
        self
    }

    /// Limits `DO UPDATE` to these columns. Without this, every inserted
    /// column outside the conflict target is updated.
    #[must_use]
    pub fn update_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(conflict) = self.on_conflict.as_mut() {
            conflict.update_columns = columns.into_iter().map(Into::into).collect();
        }
        self
    }

    /// Renders the statement.
    pub fn render(&self) -> Result<Rendered> {
        if self.values.is_empty() {
            return Err(BuildError::EmptyInsert);
        }
        let mut w = SqlWriter::new();
        w.push("INSERT INTO ");
        w.ident(&self.table)?;
        w.push(" (");
        for (i, (column, _)) in self.values.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.ident(column)?;
        }
        w.push(") VALUES (");
        for (i, (_, param)) in self.values.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.param(param)?;
        }
        w.push(")");
        if let Some(conflict) = &self.on_conflict {
            self.write_conflict(&mut w, conflict)?;
        }
        Ok(w.finish())
    }

    fn write_conflict(&self, w: &mut SqlWriter, conflict: &OnConflict) -> Result<()> {
        if conflict.action == ConflictAction::Update && conflict.columns.is_empty() {
            return Err(BuildError::MissingConflictTarget);
        }
        w.push(" ON CONFLICT");
        if !conflict.columns.is_empty() {
            w.push(" (");
            w.idents(&conflict.columns)?;
            w.push(")");
        }
        let targets: Vec<&String> = if conflict.update_columns.is_empty() {
            self.values
                .iter()
                .map(|(column, _)| column)
                .filter(|column| !conflict.columns.contains(column))
                .collect()
        } else {
            conflict.update_columns.iter().collect()
        };
        if conflict.action == ConflictAction::Nothing || targets.is_empty() {
            w.push(" DO NOTHING");
            return Ok(());
        }
        w.push(" DO UPDATE SET ");
        for (i, column) in targets.into_iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.ident(column)?;
            w.push(" = excluded.");
            w.ident(column)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_insert() {
        let rendered = Insert::into_table("users")
            .value("name", "name")
            .value("email", "email")
            .render()
            .unwrap();
        assert_eq!(rendered.sql, "INSERT INTO users (name, email) VALUES (?, ?)");
        assert_eq!(rendered.params, vec!["name", "email"]);
    }

    #[test]
    fn test_upsert_updates_non_key_columns() {
        let rendered = Insert::into_table("users")
            .value("id", "id")
            .value("name", "name")
            .on_conflict(["id"], ConflictAction::Update)
            .render()
            .unwrap();
        assert_eq!(
            rendered.sql,
            "INSERT INTO users (id, name) VALUES (?, ?) \
             ON CONFLICT (id) DO UPDATE SET name = excluded.name"
        );
    }

    #[test]
    fn test_do_nothing() {
        let rendered = Insert::into_table("tags")
            .value("label", "label")
            .on_conflict(["label"], ConflictAction::Nothing)
            .render()
            .unwrap();
        assert!(rendered.sql.ends_with("ON CONFLICT (label) DO NOTHING"));
    }

    #[test]
    fn test_do_update_requires_target() {
        let err = Insert::into_table("tags")
            .value("label", "label")
            .on_conflict(Vec::<String>::new(), ConflictAction::Update)
            .render()
            .unwrap_err();
        assert_eq!(err, BuildError::MissingConflictTarget);
    }

    #[test]
    fn test_conflict_action_parse() {
        assert_eq!(ConflictAction::parse("UPDATE").unwrap(), ConflictAction::Update);
        assert!(matches!(
            ConflictAction::parse("replace"),
            Err(BuildError::InvalidConflictAction(_))
        ));
    }

    #[test]
    fn test_empty_insert() {
        assert_eq!(
            Insert::into_table("t").render().unwrap_err(),
            BuildError::EmptyInsert
        );
    }
}
