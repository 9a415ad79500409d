//! Recursive condition specifications.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a group combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Logic {
    /// Every child must hold.
    #[default]
    And,
    /// At least one child must hold.
    Or,
}

impl Logic {
    /// `OR` (any case) is OR; anything else, including empty, is AND.
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        if tag.trim().eq_ignore_ascii_case("or") {
            Self::Or
        } else {
            Self::And
        }
    }

    /// Upper-case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node of a WHERE or HAVING tree.
///
/// On the wire a node is a flat JSON object; the variant is picked from the
/// keys present (see [`ConditionSpec`]'s `Deserialize` impl):
/// `conditions` makes a group, `low_param` + `high_param` a range,
/// `right_field` a column comparison, `is_null` or an `IS [NOT] NULL`
/// operator a null test, and anything else a simple predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCondition", into = "RawCondition")]
pub enum ConditionSpec {
    /// `field operator :param`
    Simple {
        /// Column name.
        field: String,
        /// Comparison operator.
        operator: String,
        /// Parameter name.
        param: String,
    },
    /// `field IS [NOT] NULL`
    Null {
        /// Column name.
        field: String,
        /// `IS NOT NULL` when set.
        negated: bool,
    },
    /// `field [NOT] BETWEEN :low AND :high`
    Between {
        /// Column name.
        field: String,
        /// Lower-bound parameter.
        low_param: String,
        /// Upper-bound parameter.
        high_param: String,
        /// `NOT BETWEEN` when set.
        negated: bool,
    },
    /// `field operator right_field`
    FieldComparison {
        /// Left column.
        field: String,
        /// Comparison operator.
        operator: String,
        /// Right column.
        right_field: String,
    },
    /// A nested AND/OR list.
    Group {
        /// Combination logic.
        logic: Logic,
        /// Children, translated level by level.
        conditions: Vec<ConditionSpec>,
    },
}

impl ConditionSpec {
    /// `field operator :param`
    #[must_use]
    pub fn simple(field: &str, operator: &str, param: &str) -> Self {
        Self::Simple {
            field: String::from(field),
            operator: String::from(operator),
            param: String::from(param),
        }
    }

    /// `field IS NULL`
    #[must_use]
    pub fn is_null(field: &str) -> Self {
        Self::Null {
            field: String::from(field),
            negated: false,
        }
    }

    /// `field IS NOT NULL`
    #[must_use]
    pub fn is_not_null(field: &str) -> Self {
        Self::Null {
            field: String::from(field),
            negated: true,
        }
    }

    /// `field BETWEEN :low AND :high`
    #[must_use]
    pub fn between(field: &str, low_param: &str, high_param: &str) -> Self {
        Self::Between {
            field: String::from(field),
            low_param: String::from(low_param),
            high_param: String::from(high_param),
            negated: false,
        }
    }

    /// `field NOT BETWEEN :low AND :high`
    #[must_use]
    pub fn not_between(field: &str, low_param: &str, high_param: &str) -> Self {
        Self::Between {
            field: String::from(field),
            low_param: String::from(low_param),
            high_param: String::from(high_param),
            negated: true,
        }
    }

    /// `left operator right`, both columns.
    #[must_use]
    pub fn fields(left: &str, operator: &str, right: &str) -> Self {
        Self::FieldComparison {
            field: String::from(left),
            operator: String::from(operator),
            right_field: String::from(right),
        }
    }

    /// AND group.
    #[must_use]
    pub const fn and(conditions: Vec<Self>) -> Self {
        Self::Group {
            logic: Logic::And,
            conditions,
        }
    }

    /// OR group.
    #[must_use]
    pub const fn or(conditions: Vec<Self>) -> Self {
        Self::Group {
            logic: Logic::Or,
            conditions,
        }
    }
}

/// Flat wire shape shared by every condition variant.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    param: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_null: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    low_param: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    high_param: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    negated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    right_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    logic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    conditions: Option<Vec<ConditionSpec>>,
}

fn normalized_operator(op: Option<&str>) -> String {
    op.unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

fn required(value: Option<String>, key: &str, variant: &str) -> Result<String, String> {
    value.ok_or_else(|| format!("{variant} condition is missing `{key}`"))
}

impl RawCondition {
    fn present_keys(&self) -> impl Iterator<Item = &'static str> {
        [
            ("field", self.field.is_some()),
            ("operator", self.operator.is_some()),
            ("param", self.param.is_some()),
            ("is_null", self.is_null.is_some()),
            ("low_param", self.low_param.is_some()),
            ("high_param", self.high_param.is_some()),
            ("negated", self.negated.is_some()),
            ("right_field", self.right_field.is_some()),
            ("logic", self.logic.is_some()),
            ("conditions", self.conditions.is_some()),
        ]
        .into_iter()
        .filter_map(|(key, present)| present.then_some(key))
    }

    /// Rejects keys that belong to another variant.
    fn only(&self, allowed: &[&str], variant: &str) -> Result<(), String> {
        match self.present_keys().find(|key| !allowed.contains(key)) {
            Some(key) => Err(format!("`{key}` is not valid on a {variant} condition")),
            None => Ok(()),
        }
    }
}

fn operator_in(op: &str, allowed: &[&str], variant: &str) -> Result<(), String> {
    if op.is_empty() || allowed.contains(&op) {
        Ok(())
    } else {
        Err(format!("operator `{op}` is not valid on a {variant} condition"))
    }
}

impl TryFrom<RawCondition> for ConditionSpec {
    type Error = String;

    fn try_from(raw: RawCondition) -> Result<Self, Self::Error> {
        if raw.conditions.is_some() {
            raw.only(&["logic", "conditions"], "group")?;
            return Ok(Self::Group {
                logic: raw.logic.as_deref().map(Logic::parse).unwrap_or_default(),
                conditions: raw.conditions.unwrap_or_default(),
            });
        }

        let op = normalized_operator(raw.operator.as_deref());

        if raw.low_param.is_some() || raw.high_param.is_some() {
            raw.only(
                &["field", "operator", "low_param", "high_param", "negated"],
                "between",
            )?;
            operator_in(&op, &["BETWEEN", "NOT BETWEEN"], "between")?;
            return Ok(Self::Between {
                field: required(raw.field, "field", "between")?,
                low_param: required(raw.low_param, "low_param", "between")?,
                high_param: required(raw.high_param, "high_param", "between")?,
                negated: raw.negated.unwrap_or(false) || op == "NOT BETWEEN",
            });
        }

        if raw.right_field.is_some() {
            raw.only(&["field", "operator", "right_field"], "field comparison")?;
            return Ok(Self::FieldComparison {
                field: required(raw.field, "field", "field comparison")?,
                operator: required(raw.operator, "operator", "field comparison")?,
                right_field: required(raw.right_field, "right_field", "field comparison")?,
            });
        }

        if raw.is_null.is_some() || op == "IS NULL" || op == "IS NOT NULL" {
            raw.only(&["field", "operator", "is_null"], "null")?;
            operator_in(&op, &["IS NULL", "IS NOT NULL"], "null")?;
            let negated = match op.as_str() {
                "IS NOT NULL" => true,
                "IS NULL" => false,
                _ => !raw.is_null.unwrap_or(true),
            };
            return Ok(Self::Null {
                field: required(raw.field, "field", "null")?,
                negated,
            });
        }

        raw.only(&["field", "operator", "param"], "simple")?;
        Ok(Self::Simple {
            field: required(raw.field, "field", "simple")?,
            operator: required(raw.operator, "operator", "simple")?,
            param: required(raw.param, "param", "simple")?,
        })
    }
}

impl From<ConditionSpec> for RawCondition {
    fn from(spec: ConditionSpec) -> Self {
        match spec {
            ConditionSpec::Simple {
                field,
                operator,
                param,
            } => Self {
                field: Some(field),
                operator: Some(operator),
                param: Some(param),
                ..Self::default()
            },
            ConditionSpec::Null { field, negated } => Self {
                field: Some(field),
                is_null: Some(!negated),
                operator: Some(String::from(if negated { "IS NOT NULL" } else { "IS NULL" })),
                ..Self::default()
            },
            ConditionSpec::Between {
                field,
                low_param,
                high_param,
                negated,
            } => Self {
                field: Some(field),
                low_param: Some(low_param),
                high_param: Some(high_param),
                negated: negated.then_some(true),
                ..Self::default()
            },
            ConditionSpec::FieldComparison {
                field,
                operator,
                right_field,
            } => Self {
                field: Some(field),
                operator: Some(operator),
                right_field: Some(right_field),
                ..Self::default()
            },
            ConditionSpec::Group { logic, conditions } => Self {
                logic: Some(String::from(logic.as_str())),
                conditions: Some(conditions),
                ..Self::default()
            },
        }
    }
}
