//! Parameter derivation and parameter values.
//!
//! [`ParamDeriver`] walks every parameter-bearing location of a spec and
//! returns the de-duplicated list of parameters it needs, typed from the
//! table metadata. It is also where condition depth is enforced: each
//! WHERE or HAVING tree starts at depth 1 and every group adds one level.

use std::collections::{BTreeMap, HashSet};

use oxide_spec_core::builder::{SqlValue, ToSqlValue};
use oxide_spec_core::schema::{TableMeta, ANY_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, SpecError};
use crate::spec::{
    AggregateSpec, CompoundQuerySpec, ConditionSpec, DeleteSpec, InsertSpec, OrderBySpec,
    QuerySpec, UpdateSpec,
};

/// Type reported for LIMIT/OFFSET parameters.
const BOUND_TYPE: &str = "integer";

/// A named input an operation requires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name.
    pub name: String,
    /// Semantic type, or `any` when unresolved.
    #[serde(rename = "type", default = "any_type")]
    pub param_type: String,
    /// Whether a value must be supplied.
    #[serde(default = "required_default")]
    pub required: bool,
    /// Value bound when none is supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Human description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn any_type() -> String {
    String::from(ANY_TYPE)
}

const fn required_default() -> bool {
    true
}

impl ParamSpec {
    /// A required parameter.
    #[must_use]
    pub fn new(name: &str, param_type: &str) -> Self {
        Self {
            name: String::from(name),
            param_type: String::from(param_type),
            required: true,
            default: None,
            description: None,
        }
    }

    /// Makes the parameter optional.
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Sets the fallback value.
    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(String::from(description));
        self
    }
}

/// Derives parameter lists from specs for one table.
#[derive(Debug, Clone, Copy)]
pub struct ParamDeriver<'a> {
    table: &'a TableMeta,
    max_depth: usize,
}

impl<'a> ParamDeriver<'a> {
    /// `max_depth` of `0` disables the depth check.
    #[must_use]
    pub const fn new(table: &'a TableMeta, max_depth: usize) -> Self {
        Self { table, max_depth }
    }

    /// Parameters of a query or select.
    pub fn derive_query(&self, spec: &QuerySpec) -> Result<Vec<ParamSpec>> {
        let mut out = Collector::new(self);
        out.query(spec)?;
        Ok(out.finish())
    }

    /// Parameters of an update: SET values first, then WHERE.
    pub fn derive_update(&self, spec: &UpdateSpec) -> Result<Vec<ParamSpec>> {
        let mut out = Collector::new(self);
        for (field, param) in &spec.set {
            out.typed(param, field);
        }
        out.tree(&spec.filter)?;
        Ok(out.finish())
    }

    /// Parameters of a delete.
    pub fn derive_delete(&self, spec: &DeleteSpec) -> Result<Vec<ParamSpec>> {
        let mut out = Collector::new(self);
        out.tree(&spec.filter)?;
        Ok(out.finish())
    }

    /// Parameters of an aggregate.
    pub fn derive_aggregate(&self, spec: &AggregateSpec) -> Result<Vec<ParamSpec>> {
        let mut out = Collector::new(self);
        out.tree(&spec.filter)?;
        Ok(out.finish())
    }

    /// Parameters of an insert, one per inserted column.
    #[must_use]
    pub fn derive_insert(&self, spec: &InsertSpec) -> Vec<ParamSpec> {
        let mut out = Collector::new(self);
        for (column, param) in &spec.values {
            out.typed(param, column);
        }
        out.finish()
    }

    /// Parameters of a compound: base, operands in order, then the
    /// compound-level ORDER BY and bounds.
    pub fn derive_compound(&self, spec: &CompoundQuerySpec) -> Result<Vec<ParamSpec>> {
        let mut out = Collector::new(self);
        out.query(&spec.base)?;
        for operand in &spec.operands {
            out.query(&operand.query)?;
        }
        out.order_by(&spec.order_by);
        out.bounds(spec.limit_param.as_deref(), spec.offset_param.as_deref());
        Ok(out.finish())
    }

    fn resolve_type(&self, field: &str) -> String {
        if let Some(ty) = self.table.field_type(field) {
            String::from(ty)
        } else {
            debug!(table = %self.table.name, field, "field type unresolved, using `any`");
            String::from(ANY_TYPE)
        }
    }
}

struct Collector<'d, 'a> {
    deriver: &'d ParamDeriver<'a>,
    seen: HashSet<String>,
    params: Vec<ParamSpec>,
}

impl<'d, 'a> Collector<'d, 'a> {
    fn new(deriver: &'d ParamDeriver<'a>) -> Self {
        Self {
            deriver,
            seen: HashSet::new(),
            params: vec![],
        }
    }

    fn push(&mut self, name: &str, param_type: String) {
        if self.seen.insert(String::from(name)) {
            self.params.push(ParamSpec {
                name: String::from(name),
                param_type,
                required: true,
                default: None,
                description: None,
            });
        }
    }

    /// Adds `name` typed from `field`, unless already seen.
    fn typed(&mut self, name: &str, field: &str) {
        if !self.seen.contains(name) {
            let param_type = self.deriver.resolve_type(field);
            self.push(name, param_type);
        }
    }

    fn query(&mut self, spec: &QuerySpec) -> Result<()> {
        self.tree(&spec.filter)?;
        self.tree(&spec.having)?;
        for agg in &spec.having_agg {
            self.push(&agg.param, String::from(ANY_TYPE));
        }
        self.order_by(&spec.order_by);
        for (field, _, param) in spec.select_exprs.iter().filter_map(|e| e.operator_expr()) {
            self.typed(param, field);
        }
        self.bounds(spec.limit_param.as_deref(), spec.offset_param.as_deref());
        Ok(())
    }

    fn order_by(&mut self, terms: &[OrderBySpec]) {
        for term in terms.iter().filter(|t| t.is_expression()) {
            if let Some(param) = &term.param {
                self.typed(param, &term.field);
            }
        }
    }

    fn bounds(&mut self, limit: Option<&str>, offset: Option<&str>) {
        for name in [limit, offset].into_iter().flatten() {
            self.push(name, String::from(BOUND_TYPE));
        }
    }

    fn tree(&mut self, conditions: &[ConditionSpec]) -> Result<()> {
        self.walk(conditions, 1)
    }

    fn walk(&mut self, conditions: &[ConditionSpec], depth: usize) -> Result<()> {
        let max = self.deriver.max_depth;
        for condition in conditions {
            if max > 0 && depth > max {
                return Err(SpecError::DepthExceeded { depth, max });
            }
            match condition {
                ConditionSpec::Group { conditions, .. } => self.walk(conditions, depth + 1)?,
                ConditionSpec::Simple { field, param, .. } => self.typed(param, field),
                ConditionSpec::Between {
                    field,
                    low_param,
                    high_param,
                    ..
                } => {
                    self.typed(low_param, field);
                    self.typed(high_param, field);
                }
                ConditionSpec::Null { .. } | ConditionSpec::FieldComparison { .. } => {}
            }
        }
        Ok(())
    }

    fn finish(self) -> Vec<ParamSpec> {
        self.params
    }
}

/// Parameter values keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: BTreeMap<String, SqlValue>,
}

impl Params {
    /// An empty set of values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a value, replacing any previous one.
    #[must_use]
    pub fn set<V: ToSqlValue>(mut self, name: &str, value: V) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets a value in place.
    pub fn insert<V: ToSqlValue>(&mut self, name: &str, value: V) {
        self.values
            .insert(String::from(name), value.to_sql_value());
    }

    /// The value bound to `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.values.get(name)
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no value is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Builds values from a JSON object. `null` maps to NULL; arrays and
    /// nested objects are rejected.
    pub fn from_json(value: &Value) -> Result<Self> {
        let mut params = Self::new();
        match value {
            Value::Null => {}
            Value::Object(map) => {
                for (name, value) in map {
                    let value = json_to_sql(name, value)?;
                    params.values.insert(name.clone(), value);
                }
            }
            _ => return Err(SpecError::UnsupportedParamValue(String::from("<root>"))),
        }
        Ok(params)
    }

    /// Values for `names` in order.
    ///
    /// A missing value falls back to the declared default, then to NULL for
    /// optional parameters; a required parameter without either fails.
    pub fn resolve(&self, names: &[String], declared: &[ParamSpec]) -> Result<Vec<SqlValue>> {
        names
            .iter()
            .map(|name| {
                if let Some(value) = self.values.get(name) {
                    return Ok(value.clone());
                }
                match declared.iter().find(|p| &p.name == name) {
                    Some(ParamSpec {
                        default: Some(default),
                        ..
                    }) => json_to_sql(name, default),
                    Some(ParamSpec {
                        required: false, ..
                    }) => Ok(SqlValue::Null),
                    _ => Err(SpecError::MissingParam(name.clone())),
                }
            })
            .collect()
    }
}

impl FromIterator<(String, SqlValue)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, SqlValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Converts a scalar JSON value for parameter `name`.
pub fn json_to_sql(name: &str, value: &Value) -> Result<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(b) => Ok(SqlValue::Bool(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(SqlValue::Int)
            .or_else(|| n.as_f64().map(SqlValue::Float))
            .ok_or_else(|| SpecError::UnsupportedParamValue(String::from(name))),
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Array(_) | Value::Object(_) => {
            Err(SpecError::UnsupportedParamValue(String::from(name)))
        }
    }
}
