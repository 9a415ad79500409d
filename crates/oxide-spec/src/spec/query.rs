//! Read-side specs: queries, selects and aggregates.

use oxide_spec_core::builder::{AggregateFunc, NullsOrder, SortOrder};
use serde::{Deserialize, Serialize};

use super::condition::ConditionSpec;

/// One ORDER BY entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderBySpec {
    /// Column to order by.
    pub field: String,
    /// `asc` or `desc`.
    #[serde(default)]
    pub direction: SortOrder,
    /// NULL placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nulls: Option<NullsOrder>,
    /// Operator for expression ordering, e.g. `<->`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    /// Right-hand parameter for expression ordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
}

impl OrderBySpec {
    /// Ascending on `field`.
    #[must_use]
    pub fn asc(field: &str) -> Self {
        Self {
            field: String::from(field),
            ..Self::default()
        }
    }

    /// Descending on `field`.
    #[must_use]
    pub fn desc(field: &str) -> Self {
        Self {
            field: String::from(field),
            direction: SortOrder::Desc,
            ..Self::default()
        }
    }

    /// Orders by `field operator :param`.
    #[must_use]
    pub fn expr(field: &str, operator: &str, param: &str) -> Self {
        Self {
            field: String::from(field),
            operator: Some(String::from(operator)),
            param: Some(String::from(param)),
            ..Self::default()
        }
    }

    /// True only when both operator and parameter are set.
    #[must_use]
    pub const fn is_expression(&self) -> bool {
        self.operator.is_some() && self.param.is_some()
    }
}

/// A computed projection: `func(field)` or `field operator :param`.
///
/// When `field`, `operator` and `param` are all set the entry is an operator
/// expression; otherwise it is an aggregate over `field` (COUNT(*) when
/// `field` is absent).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SelectExprSpec {
    /// Aggregate function.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub func: Option<AggregateFunc>,
    /// Target column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Operator for operator expressions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    /// Parameter for operator expressions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    /// Output column name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl SelectExprSpec {
    /// `(field, operator, param)` when this is an operator expression.
    #[must_use]
    pub fn operator_expr(&self) -> Option<(&str, &str, &str)> {
        match (&self.field, &self.operator, &self.param) {
            (Some(field), Some(operator), Some(param)) => Some((field, operator, param)),
            _ => None,
        }
    }
}

/// `func(field) operator :param` in HAVING.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HavingAggSpec {
    /// Aggregate function; unknown names fall back to COUNT.
    #[serde(default)]
    pub func: AggregateFunc,
    /// Aggregated column, absent for COUNT(*).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Comparison operator.
    pub operator: String,
    /// Parameter compared against the aggregate.
    pub param: String,
}

/// A multi-row query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySpec {
    /// Projected columns; empty selects `*`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    /// Computed projections.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub select_exprs: Vec<SelectExprSpec>,
    /// WHERE tree; top-level entries are ANDed.
    #[serde(rename = "where", skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<ConditionSpec>,
    /// ORDER BY entries.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderBySpec>,
    /// GROUP BY columns.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
    /// HAVING tree.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub having: Vec<ConditionSpec>,
    /// HAVING aggregate comparisons.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub having_agg: Vec<HavingAggSpec>,
    /// Literal LIMIT.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Parameterized LIMIT; wins over `limit`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_param: Option<String>,
    /// Literal OFFSET.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    /// Parameterized OFFSET; wins over `offset`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_param: Option<String>,
    /// `SELECT DISTINCT`
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub distinct: bool,
    /// `SELECT DISTINCT ON (...)`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub distinct_on: Vec<String>,
    /// Row-locking mode: `update`, `no_key_update`, `share`, `key_share`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub lock: String,
}

/// A single-row select; same shape as [`QuerySpec`].
pub type SelectSpec = QuerySpec;

/// A single-value aggregate. The function is supplied by the capability.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateSpec {
    /// Aggregated column, required for SUM/AVG/MIN/MAX.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// WHERE tree.
    #[serde(rename = "where", skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<ConditionSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_by_expression_needs_both_parts() {
        assert!(OrderBySpec::expr("embedding", "<->", "vec").is_expression());
        let half = OrderBySpec {
            operator: Some(String::from("<->")),
            ..OrderBySpec::asc("embedding")
        };
        assert!(!half.is_expression());
    }

    #[test]
    fn test_select_expr_operator_needs_all_parts() {
        let expr = SelectExprSpec {
            field: Some(String::from("embedding")),
            operator: Some(String::from("<->")),
            param: Some(String::from("vec")),
            alias: Some(String::from("distance")),
            ..SelectExprSpec::default()
        };
        assert_eq!(expr.operator_expr(), Some(("embedding", "<->", "vec")));

        let no_field = SelectExprSpec {
            field: None,
            ..expr
        };
        assert_eq!(no_field.operator_expr(), None);
    }

    #[test]
    fn test_query_spec_json() {
        let spec: QuerySpec = serde_json::from_str(
            r#"{
                "fields": ["id", "name"],
                "where": [{"field": "age", "operator": ">=", "param": "min_age"}],
                "order_by": [{"field": "name", "direction": "DESC", "nulls": "last"}],
                "limit_param": "n",
                "lock": "share"
            }"#,
        )
        .unwrap();
        assert_eq!(spec.fields, vec!["id", "name"]);
        assert_eq!(spec.filter, vec![ConditionSpec::simple("age", ">=", "min_age")]);
        assert_eq!(spec.order_by[0].direction, SortOrder::Desc);
        assert_eq!(spec.order_by[0].nulls, Some(NullsOrder::Last));
        assert_eq!(spec.limit_param.as_deref(), Some("n"));
        assert_eq!(spec.lock, "share");
    }

    #[test]
    fn test_empty_spec_serializes_to_empty_object() {
        assert_eq!(serde_json::to_string(&QuerySpec::default()).unwrap(), "{}");
    }

    #[test]
    fn test_having_agg_unknown_func_is_count() {
        let agg: HavingAggSpec =
            serde_json::from_str(r#"{"func": "median", "operator": ">", "param": "n"}"#).unwrap();
        assert_eq!(agg.func, AggregateFunc::Count);
    }
}
