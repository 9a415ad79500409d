//! SELECT statement builder.

use serde::{Deserialize, Serialize};

use super::aggregate::{write_call, AggregateFunc};
use super::condition::{write_clause, Condition, Filter};
use super::error::{BuildError, Result};
use super::render::{self, Rendered, SqlWriter};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending order.
    #[default]
    #[serde(alias = "ASC")]
    Asc,
    /// Descending order.
    #[serde(alias = "DESC")]
    Desc,
}

impl SortOrder {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Placement of NULLs in an ORDER BY term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullsOrder {
    /// `NULLS FIRST`
    #[serde(alias = "FIRST")]
    First,
    /// `NULLS LAST`
    #[serde(alias = "LAST")]
    Last,
}

impl NullsOrder {
    /// Returns the SQL keyword pair.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::First => "NULLS FIRST",
            Self::Last => "NULLS LAST",
        }
    }
}

/// One ORDER BY term: a column, or `column <op> ?` for distance ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    field: String,
    order: SortOrder,
    nulls: Option<NullsOrder>,
    expr: Option<(String, String)>,
}

impl OrderTerm {
    /// Orders by `field` ascending.
    #[must_use]
    pub fn new(field: &str) -> Self {
        Self {
            field: String::from(field),
            order: SortOrder::Asc,
            nulls: None,
            expr: None,
        }
    }

    /// Sets the direction.
    #[must_use]
    pub const fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// Orders descending.
    #[must_use]
    pub const fn desc(self) -> Self {
        self.order(SortOrder::Desc)
    }

    /// Sets NULL placement.
    #[must_use]
    pub const fn nulls(mut self, nulls: NullsOrder) -> Self {
        self.nulls = Some(nulls);
        self
    }

    /// Orders by `field <op> ?` instead of the bare column.
    #[must_use]
    pub fn expr(mut self, op: &str, param: &str) -> Self {
        self.expr = Some((String::from(op), String::from(param)));
        self
    }

    fn write(&self, w: &mut SqlWriter) -> Result<()> {
        w.ident(&self.field)?;
        if let Some((op, param)) = &self.expr {
            w.push(" ");
            w.push(&render::expression_operator(op)?);
            w.push(" ");
            w.param(param)?;
        }
        w.push(" ");
        w.push(self.order.as_sql());
        if let Some(nulls) = self.nulls {
            w.push(" ");
            w.push(nulls.as_sql());
        }
        Ok(())
    }
}

/// Writes ` ORDER BY t1, t2`, or nothing.
pub(crate) fn write_order_by(w: &mut SqlWriter, terms: &[OrderTerm]) -> Result<()> {
    if terms.is_empty() {
        return Ok(());
    }
    w.push(" ORDER BY ");
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            w.push(", ");
        }
        term.write(w)?;
    }
    Ok(())
}

/// LIMIT or OFFSET value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bound {
    /// Inlined integer.
    Literal(u64),
    /// Bound parameter.
    Param(String),
}

impl Bound {
    fn write(&self, w: &mut SqlWriter) -> Result<()> {
        match self {
            Self::Literal(n) => w.push(&n.to_string()),
            Self::Param(name) => w.param(name)?,
        }
        Ok(())
    }
}

/// Writes LIMIT/OFFSET. An OFFSET alone gets `LIMIT -1` so SQLite accepts it.
pub(crate) fn write_bounds(w: &mut SqlWriter, limit: Option<&Bound>, offset: Option<&Bound>) -> Result<()> {
    match (limit, offset) {
        (Some(limit), _) => {
            w.push(" LIMIT ");
            limit.write(w)?;
        }
        (None, Some(_)) => w.push(" LIMIT -1"),
        (None, None) => {}
    }
    if let Some(offset) = offset {
        w.push(" OFFSET ");
        offset.write(w)?;
    }
    Ok(())
}

/// Row-locking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// `FOR UPDATE`
    Update,
    /// `FOR NO KEY UPDATE`
    NoKeyUpdate,
    /// `FOR SHARE`
    Share,
    /// `FOR KEY SHARE`
    KeyShare,
}

impl LockMode {
    /// Parses a mode name; the empty string means no locking.
    pub fn parse(mode: &str) -> Result<Option<Self>> {
        match mode {
            "" => Ok(None),
            "update" => Ok(Some(Self::Update)),
            "no_key_update" => Ok(Some(Self::NoKeyUpdate)),
            "share" => Ok(Some(Self::Share)),
            "key_share" => Ok(Some(Self::KeyShare)),
            other => Err(BuildError::InvalidLockMode(String::from(other))),
        }
    }

    /// Returns the SQL clause.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Update => "FOR UPDATE",
            Self::NoKeyUpdate => "FOR NO KEY UPDATE",
            Self::Share => "FOR SHARE",
            Self::KeyShare => "FOR KEY SHARE",
        }
    }
}

/// A computed projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectExpr {
    /// `FUNC(field) AS alias`
    Aggregate {
        /// Aggregate function.
        func: AggregateFunc,
        /// Aggregated column; `None` or `*` for COUNT(*).
        field: Option<String>,
        /// Output name.
        alias: Option<String>,
    },
    /// `field <op> ? AS alias`
    Operator {
        /// Left-hand column.
        field: String,
        /// Comparison or distance operator.
        op: String,
        /// Right-hand parameter.
        param: String,
        /// Output name.
        alias: Option<String>,
    },
}

impl SelectExpr {
    fn write(&self, w: &mut SqlWriter) -> Result<()> {
        let alias = match self {
            Self::Aggregate { func, field, alias } => {
                write_call(w, *func, field.as_deref())?;
                alias
            }
            Self::Operator {
                field,
                op,
                param,
                alias,
            } => {
                w.ident(field)?;
                w.push(" ");
                w.push(&render::expression_operator(op)?);
                w.push(" ");
                w.param(param)?;
                alias
            }
        };
        if let Some(alias) = alias {
            w.push(" AS ");
            w.ident(alias)?;
        }
        Ok(())
    }
}

/// `FUNC(field) <op> ?` in a HAVING clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HavingAggregate {
    /// Aggregate function.
    pub func: AggregateFunc,
    /// Aggregated column; `None` for COUNT(*).
    pub field: Option<String>,
    /// Comparison operator.
    pub op: String,
    /// Right-hand parameter.
    pub param: String,
}

impl HavingAggregate {
    fn write(&self, w: &mut SqlWriter) -> Result<()> {
        write_call(w, self.func, self.field.as_deref())?;
        w.push(" ");
        w.push(&render::comparison_operator(&self.op)?);
        w.push(" ");
        w.param(&self.param)
    }
}

/// A SELECT statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    table: String,
    columns: Vec<String>,
    exprs: Vec<SelectExpr>,
    distinct: bool,
    distinct_on: Vec<String>,
    conditions: Vec<Condition>,
    group_by: Vec<String>,
    having: Vec<Condition>,
    having_aggs: Vec<HavingAggregate>,
    order_by: Vec<OrderTerm>,
    limit: Option<Bound>,
    offset: Option<Bound>,
    lock: Option<LockMode>,
}

impl Select {
    /// Starts `SELECT * FROM table`.
    #[must_use]
    pub fn from(table: &str) -> Self {
        Self {
            table: String::from(table),
            columns: vec![],
            exprs: vec![],
            distinct: false,
            distinct_on: vec![],
            conditions: vec![],
            group_by: vec![],
            having: vec![],
            having_aggs: vec![],
            order_by: vec![],
            limit: None,
            offset: None,
            lock: None,
        }
    }

    /// Adds projected columns. `*` is accepted.
    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Adds a computed projection.
    #[must_use]
    pub fn expr(mut self, expr: SelectExpr) -> Self {
        self.exprs.push(expr);
        self
    }

    /// `SELECT DISTINCT`
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// `SELECT DISTINCT ON (columns)`
    #[must_use]
    pub fn distinct_on<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.distinct_on.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Adds GROUP BY columns.
    #[must_use]
    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Adds a HAVING condition.
    #[must_use]
    pub fn having(mut self, condition: Condition) -> Self {
        self.having.push(condition);
        self
    }

    /// Adds `FUNC(field) <op> ?` to HAVING.
    #[must_use]
    pub fn having_agg(mut self, func: AggregateFunc, field: Option<&str>, op: &str, param: &str) -> Self {
        self.having_aggs.push(HavingAggregate {
            func,
            field: field.map(String::from),
            op: String::from(op),
            param: String::from(param),
        });
        self
    }

    /// Adds an ORDER BY term.
    #[must_use]
    pub fn order_by(mut self, term: OrderTerm) -> Self {
        self.order_by.push(term);
        self
    }

    /// Sets a literal LIMIT.
    #[must_use]
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(Bound::Literal(n));
        self
    }

    /// Binds LIMIT to a parameter.
    #[must_use]
    pub fn limit_param(mut self, param: &str) -> Self {
        self.limit = Some(Bound::Param(String::from(param)));
        self
    }

    /// Sets a literal OFFSET.
    #[must_use]
    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(Bound::Literal(n));
        self
    }

    /// Binds OFFSET to a parameter.
    #[must_use]
    pub fn offset_param(mut self, param: &str) -> Self {
        self.offset = Some(Bound::Param(String::from(param)));
        self
    }

    /// Sets the row-locking mode.
    #[must_use]
    pub const fn lock(mut self, mode: LockMode) -> Self {
        self.lock = Some(mode);
        self
    }

    /// The source table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Whether ORDER BY, LIMIT, OFFSET or locking is present.
    #[must_use]
    pub fn has_trailing_clauses(&self) -> bool {
        !self.order_by.is_empty()
            || self.limit.is_some()
            || self.offset.is_some()
            || self.lock.is_some()
    }

    /// Renders the statement.
    pub fn render(&self) -> Result<Rendered> {
        let mut w = SqlWriter::new();
        self.write(&mut w)?;
        Ok(w.finish())
    }

    pub(crate) fn write(&self, w: &mut SqlWriter) -> Result<()> {
        w.push("SELECT ");
        if !self.distinct_on.is_empty() {
            w.push("DISTINCT ON (");
            w.idents(&self.distinct_on)?;
            w.push(") ");
        } else if self.distinct {
            w.push("DISTINCT ");
        }
        self.write_projection(w)?;
        w.push(" FROM ");
        w.ident(&self.table)?;
        write_clause(w, " WHERE ", &self.conditions)?;
        if !self.group_by.is_empty() {
            w.push(" GROUP BY ");
            w.idents(&self.group_by)?;
        }
        self.write_having(w)?;
        write_order_by(w, &self.order_by)?;
        write_bounds(w, self.limit.as_ref(), self.offset.as_ref())?;
        if let Some(lock) = self.lock {
            w.push(" ");
            w.push(lock.as_sql());
        }
        Ok(())
    }

    fn write_projection(&self, w: &mut SqlWriter) -> Result<()> {
        if self.columns.is_empty() && self.exprs.is_empty() {
            w.push("*");
            return Ok(());
        }
        let mut first = true;
        for column in &self.columns {
            if !first {
                w.push(", ");
            }
            first = false;
            if column == "*" {
                w.push("*");
            } else {
                w.ident(column)?;
            }
        }
        for expr in &self.exprs {
            if !first {
                w.push(", ");
            }
            first = false;
            expr.write(w)?;
        }
        Ok(())
    }

    fn write_having(&self, w: &mut SqlWriter) -> Result<()> {
        if self.having.is_empty() && self.having_aggs.is_empty() {
            return Ok(());
        }
        w.push(" HAVING ");
        let mut first = true;
        for condition in &self.having {
            if !first {
                w.push(" AND ");
            }
            first = false;
            condition.write(w)?;
        }
        for agg in &self.having_aggs {
            if !first {
                w.push(" AND ");
            }
            first = false;
            agg.write(w)?;
        }
        Ok(())
    }
}

impl Filter for Select {
    fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }
}
