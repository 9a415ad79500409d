//! Aggregate functions and the single-value aggregate builder.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::condition::{write_clause, Condition, Filter};
use super::error::{BuildError, Result};
use super::render::{Rendered, SqlWriter};

/// Aggregate functions.
///
/// Parsing never fails: unrecognized names degrade to
/// [`DEFAULT_AGGREGATE_FUNC`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AggregateFunc {
    /// `COUNT`
    #[default]
    Count,
    /// `SUM`
    Sum,
    /// `AVG`
    Avg,
    /// `MIN`
    Min,
    /// `MAX`
    Max,
}

/// Function used when an aggregate name is not recognized.
pub const DEFAULT_AGGREGATE_FUNC: AggregateFunc = AggregateFunc::Count;

impl AggregateFunc {
    /// Maps a case-insensitive name to a function, falling back to COUNT.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "sum" => Self::Sum,
            "avg" => Self::Avg,
            "min" => Self::Min,
            "max" => Self::Max,
            _ => DEFAULT_AGGREGATE_FUNC,
        }
    }

    /// SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }

    /// Lower-case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// Whether the function needs a column to aggregate.
    #[must_use]
    pub const fn needs_field(self) -> bool {
        !matches!(self, Self::Count)
    }
}

impl fmt::Display for AggregateFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl Serialize for AggregateFunc {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AggregateFunc {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::parse(&name))
    }
}

/// Writes `FUNC(field)`, `COUNT(field)` or `COUNT(*)`.
pub(crate) fn write_call(w: &mut SqlWriter, func: AggregateFunc, field: Option<&str>) -> Result<()> {
    w.push(func.as_sql());
    w.push("(");
    match field {
        Some("*") | None if !func.needs_field() => w.push("*"),
        Some(field) if field != "*" => w.ident(field)?,
        _ => return Err(BuildError::MissingAggregateField(func)),
    }
    w.push(")");
    Ok(())
}

/// Builds `SELECT FUNC(field) FROM table [WHERE ...]`.
///
/// COUNT always counts rows (`COUNT(*)`); any field set on a COUNT is
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    func: AggregateFunc,
    table: String,
    field: Option<String>,
    conditions: Vec<Condition>,
}

impl Aggregate {
    /// Creates an aggregate over `table`.
    #[must_use]
    pub fn new(func: AggregateFunc, table: &str) -> Self {
        Self {
            func,
            table: String::from(table),
            field: None,
            conditions: vec![],
        }
    }

    /// `COUNT(*)` over `table`.
    #[must_use]
    pub fn count(table: &str) -> Self {
        Self::new(AggregateFunc::Count, table)
    }

    /// Sets the aggregated column.
    #[must_use]
    pub fn field(mut self, field: &str) -> Self {
        self.field = Some(String::from(field));
        self
    }

    /// Renders the statement.
    pub fn render(&self) -> Result<Rendered> {
        let mut w = SqlWriter::new();
        w.push("SELECT ");
        let field = if self.func.needs_field() {
            self.field.as_deref()
        } else {
            None
        };
        write_call(&mut w, self.func, field)?;
        w.push(" FROM ");
        w.ident(&self.table)?;
        write_clause(&mut w, " WHERE ", &self.conditions)?;
        Ok(w.finish())
    }
}

impl Filter for Aggregate {
    fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }
}
