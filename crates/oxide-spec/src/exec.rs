//! Executing capabilities and ad hoc specs over sqlx.
//!
//! Any `sqlx::Executor` for SQLite works: a pool, a connection, or a
//! transaction (`&mut *tx`).

use oxide_spec_core::builder::{Rendered, SqlValue};
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Executor, FromRow, Row, Sqlite, ValueRef};

use crate::builders::{compound_from_spec, insert_from_spec};
use crate::capability::CapabilityKind;
use crate::error::Result;
use crate::events;
use crate::factory::Factory;
use crate::params::{ParamSpec, Params};
use crate::spec::{CompoundQuerySpec, InsertSpec};

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;
type SqliteQueryAs<'q, O> = sqlx::query::QueryAs<'q, Sqlite, O, SqliteArguments<'q>>;

/// A rendered statement plus the parameters it declares.
///
/// Obtained from [`Factory::prepare`] or [`CapabilityExecutor::prepare`];
/// it can be run any number of times with different values.
#[derive(Debug, Clone, PartialEq)]
pub struct Prepared {
    kind: Option<CapabilityKind>,
    name: String,
    rendered: Rendered,
    params: Vec<ParamSpec>,
}

impl Prepared {
    pub(crate) fn new(
        kind: Option<CapabilityKind>,
        name: &str,
        rendered: Rendered,
        params: Vec<ParamSpec>,
    ) -> Self {
        Self {
            kind,
            name: String::from(name),
            rendered,
            params,
        }
    }

    /// Capability kind; `None` for ad hoc compound and insert statements.
    #[must_use]
    pub const fn kind(&self) -> Option<CapabilityKind> {
        self.kind
    }

    /// Capability name, or `compound` / `insert` for ad hoc statements.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.rendered.sql
    }

    /// Parameter names in placeholder order.
    #[must_use]
    pub fn bind_order(&self) -> &[String] {
        &self.rendered.params
    }

    /// Declared parameters.
    #[must_use]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Consumes the handle, keeping the rendered statement.
    #[must_use]
    pub fn into_rendered(self) -> Rendered {
        self.rendered
    }

    /// Values in placeholder order.
    pub fn bind(&self, params: &Params) -> Result<Vec<SqlValue>> {
        params.resolve(&self.rendered.params, &self.params)
    }

    fn query(&self, params: &Params) -> Result<SqliteQuery<'_>> {
        let values = self.bind(params)?;
        events::statement_executed(&self.name, &self.rendered.sql, values.len());
        Ok(values
            .into_iter()
            .fold(sqlx::query(&self.rendered.sql), bind_value_raw))
    }

    fn query_as<M>(&self, params: &Params) -> Result<SqliteQueryAs<'_, M>>
    where
        M: for<'r> FromRow<'r, SqliteRow>,
    {
        let values = self.bind(params)?;
        events::statement_executed(&self.name, &self.rendered.sql, values.len());
        Ok(values
            .into_iter()
            .fold(sqlx::query_as::<_, M>(&self.rendered.sql), bind_value))
    }

    /// Fetches every row.
    pub async fn fetch_all<'c, E, M>(&self, executor: E, params: &Params) -> Result<Vec<M>>
    where
        E: Executor<'c, Database = Sqlite>,
        M: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        Ok(self.query_as::<M>(params)?.fetch_all(executor).await?)
    }

    /// Fetches at most one row.
    pub async fn fetch_optional<'c, E, M>(&self, executor: E, params: &Params) -> Result<Option<M>>
    where
        E: Executor<'c, Database = Sqlite>,
        M: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        Ok(self.query_as::<M>(params)?.fetch_optional(executor).await?)
    }

    /// Executes the statement and returns the affected row count.
    pub async fn execute<'c, E>(&self, executor: E, params: &Params) -> Result<u64>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        let result = self.query(params)?.execute(executor).await?;
        Ok(result.rows_affected())
    }

    /// Fetches the first column of the first row as a number.
    pub async fn fetch_scalar<'c, E>(&self, executor: E, params: &Params) -> Result<Option<f64>>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        let row = self.query(params)?.fetch_one(executor).await?;
        scalar(&row)
    }

    /// Fetches every row as a JSON object keyed by column name.
    pub async fn fetch_json<'c, E>(
        &self,
        executor: E,
        params: &Params,
    ) -> Result<Vec<Map<String, Value>>>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        let rows = self.query(params)?.fetch_all(executor).await?;
        rows.iter().map(row_to_json).collect()
    }
}

/// Dispatches named capabilities and ad hoc specs of one factory.
#[derive(Debug, Clone, Copy)]
pub struct CapabilityExecutor<'f> {
    factory: &'f Factory,
}

impl<'f> CapabilityExecutor<'f> {
    pub(crate) const fn new(factory: &'f Factory) -> Self {
        Self { factory }
    }

    /// The factory this executor reads from.
    #[must_use]
    pub const fn factory(&self) -> &'f Factory {
        self.factory
    }

    /// Resolves a named capability.
    pub fn prepare(&self, kind: CapabilityKind, name: &str) -> Result<Prepared> {
        self.factory.prepare(kind, name)
    }

    /// Renders an ad hoc compound; parameters are derived, depth-checked.
    pub fn prepare_compound(&self, spec: &CompoundQuerySpec) -> Result<Prepared> {
        let params = self.factory.deriver().derive_compound(spec)?;
        let rendered = compound_from_spec(self.factory.table_name(), spec)?.render()?;
        Ok(Prepared::new(None, "compound", rendered, params))
    }

    /// Renders an ad hoc insert.
    pub fn prepare_insert(&self, spec: &InsertSpec) -> Result<Prepared> {
        let params = self.factory.deriver().derive_insert(spec);
        let rendered = insert_from_spec(self.factory.table_name(), spec)?.render()?;
        Ok(Prepared::new(None, "insert", rendered, params))
    }

    /// Runs a query capability.
    pub async fn query<'c, E, M>(&self, executor: E, name: &str, params: &Params) -> Result<Vec<M>>
    where
        E: Executor<'c, Database = Sqlite>,
        M: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        self.prepare(CapabilityKind::Query, name)?
            .fetch_all(executor, params)
            .await
    }

    /// Runs a query capability returning JSON rows.
    pub async fn query_json<'c, E>(
        &self,
        executor: E,
        name: &str,
        params: &Params,
    ) -> Result<Vec<Map<String, Value>>>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        self.prepare(CapabilityKind::Query, name)?
            .fetch_json(executor, params)
            .await
    }

    /// Runs a select capability.
    pub async fn select<'c, E, M>(&self, executor: E, name: &str, params: &Params) -> Result<Option<M>>
    where
        E: Executor<'c, Database = Sqlite>,
        M: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        self.prepare(CapabilityKind::Select, name)?
            .fetch_optional(executor, params)
            .await
    }

    /// Runs an update capability; returns rows affected.
    pub async fn update<'c, E>(&self, executor: E, name: &str, params: &Params) -> Result<u64>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        self.prepare(CapabilityKind::Update, name)?
            .execute(executor, params)
            .await
    }

    /// Runs a delete capability; returns rows affected.
    pub async fn delete<'c, E>(&self, executor: E, name: &str, params: &Params) -> Result<u64>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        self.prepare(CapabilityKind::Delete, name)?
            .execute(executor, params)
            .await
    }

    /// Runs an aggregate capability. `None` when the aggregate is NULL.
    pub async fn aggregate<'c, E>(&self, executor: E, name: &str, params: &Params) -> Result<Option<f64>>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        self.prepare(CapabilityKind::Aggregate, name)?
            .fetch_scalar(executor, params)
            .await
    }

    /// Runs an ad hoc compound.
    pub async fn compound<'c, E, M>(
        &self,
        executor: E,
        spec: &CompoundQuerySpec,
        params: &Params,
    ) -> Result<Vec<M>>
    where
        E: Executor<'c, Database = Sqlite>,
        M: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        self.prepare_compound(spec)?
            .fetch_all(executor, params)
            .await
    }

    /// Runs an ad hoc insert; returns rows affected.
    pub async fn insert<'c, E>(&self, executor: E, spec: &InsertSpec, params: &Params) -> Result<u64>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        self.prepare_insert(spec)?.execute(executor, params).await
    }

    /// Runs any capability and returns its result as JSON: rows for
    /// queries, a row or `null` for selects, `{"rows_affected": n}` for
    /// updates and deletes, a number or `null` for aggregates.
    pub async fn run_json<'c, E>(
        &self,
        executor: E,
        kind: CapabilityKind,
        name: &str,
        params: &Params,
    ) -> Result<Value>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        let prepared = self.prepare(kind, name)?;
        Ok(match kind {
            CapabilityKind::Query => Value::Array(
                prepared
                    .fetch_json(executor, params)
                    .await?
                    .into_iter()
                    .map(Value::Object)
                    .collect(),
            ),
            CapabilityKind::Select => prepared
                .fetch_json(executor, params)
                .await?
                .into_iter()
                .next()
                .map_or(Value::Null, Value::Object),
            CapabilityKind::Update | CapabilityKind::Delete => {
                let affected = prepared.execute(executor, params).await?;
                serde_json::json!({ "rows_affected": affected })
            }
            CapabilityKind::Aggregate => prepared
                .fetch_scalar(executor, params)
                .await?
                .map_or(Value::Null, Value::from),
        })
    }
}

fn bind_value<'q, O>(query: SqliteQueryAs<'q, O>, value: SqlValue) -> SqliteQueryAs<'q, O>
where
    O: for<'r> FromRow<'r, SqliteRow>,
{
    match value {
        SqlValue::Null => query.bind(Option::<i64>::None),
        SqlValue::Bool(b) => query.bind(b),
        SqlValue::Int(i) => query.bind(i),
        SqlValue::Float(f) => query.bind(f),
        SqlValue::Text(s) => query.bind(s),
        SqlValue::Blob(b) => query.bind(b),
    }
}

fn bind_value_raw(query: SqliteQuery<'_>, value: SqlValue) -> SqliteQuery<'_> {
    match value {
        SqlValue::Null => query.bind(Option::<i64>::None),
        SqlValue::Bool(b) => query.bind(b),
        SqlValue::Int(i) => query.bind(i),
        SqlValue::Float(f) => query.bind(f),
        SqlValue::Text(s) => query.bind(s),
        SqlValue::Blob(b) => query.bind(b),
    }
}

#[allow(clippy::cast_precision_loss)]
fn scalar(row: &SqliteRow) -> Result<Option<f64>> {
    if row.try_get_raw(0)?.is_null() {
        return Ok(None);
    }
    if let Ok(n) = row.try_get::<i64, _>(0) {
        return Ok(Some(n as f64));
    }
    Ok(Some(row.try_get::<f64, _>(0)?))
}

fn row_to_json(row: &SqliteRow) -> Result<Map<String, Value>> {
    let mut object = Map::new();
    for column in row.columns() {
        let i = column.ordinal();
        let value = if row.try_get_raw(i)?.is_null() {
            Value::Null
        } else if let Ok(n) = row.try_get::<i64, _>(i) {
            Value::from(n)
        } else if let Ok(f) = row.try_get::<f64, _>(i) {
            Value::from(f)
        } else if let Ok(s) = row.try_get::<String, _>(i) {
            Value::String(s)
        } else {
            Value::from(row.try_get::<Vec<u8>, _>(i)?)
        };
        object.insert(String::from(column.name()), value);
    }
    Ok(object)
}
