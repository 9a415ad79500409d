//! Condition trees and the `Filter` trait shared by filtering builders.

use super::error::Result;
use super::render::{self, Rendered, SqlWriter};

/// Creates a column reference.
#[must_use]
pub fn col(name: &str) -> Column {
    Column {
        name: String::from(name),
    }
}

/// A column reference used to start a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name, optionally `table.`-qualified.
    pub name: String,
}

impl Column {
    /// `column <op> ?`, bound to `param`.
    #[must_use]
    pub fn cmp(self, op: &str, param: &str) -> Condition {
        Condition::Compare {
            field: self.name,
            op: String::from(op),
            rhs: Operand::Param(String::from(param)),
        }
    }

    /// Creates an equality condition.
    #[must_use]
    pub fn eq(self, param: &str) -> Condition {
        self.cmp("=", param)
    }

    /// Creates an inequality condition.
    #[must_use]
    pub fn not_eq(self, param: &str) -> Condition {
        self.cmp("!=", param)
    }

    /// Creates a less-than condition.
    #[must_use]
    pub fn lt(self, param: &str) -> Condition {
        self.cmp("<", param)
    }

    /// Creates a less-than-or-equal condition.
    #[must_use]
    pub fn lt_eq(self, param: &str) -> Condition {
        self.cmp("<=", param)
    }

    /// Creates a greater-than condition.
    #[must_use]
    pub fn gt(self, param: &str) -> Condition {
        self.cmp(">", param)
    }

    /// Creates a greater-than-or-equal condition.
    #[must_use]
    pub fn gt_eq(self, param: &str) -> Condition {
        self.cmp(">=", param)
    }

    /// Creates a LIKE condition.
    #[must_use]
    pub fn like(self, param: &str) -> Condition {
        self.cmp("LIKE", param)
    }

    /// `column <op> other_column`, no parameter.
    #[must_use]
    pub fn cmp_column(self, op: &str, other: &str) -> Condition {
        Condition::Compare {
            field: self.name,
            op: String::from(op),
            rhs: Operand::Column(String::from(other)),
        }
    }

    /// Creates a BETWEEN condition over two parameters.
    #[must_use]
    pub fn between(self, low: &str, high: &str) -> Condition {
        Condition::Between {
            field: self.name,
            low: String::from(low),
            high: String::from(high),
            negated: false,
        }
    }

    /// Creates a NOT BETWEEN condition over two parameters.
    #[must_use]
    pub fn not_between(self, low: &str, high: &str) -> Condition {
        Condition::Between {
            field: self.name,
            low: String::from(low),
            high: String::from(high),
            negated: true,
        }
    }

    /// Creates an IS NULL condition.
    #[must_use]
    pub fn is_null(self) -> Condition {
        Condition::Null {
            field: self.name,
            negated: false,
        }
    }

    /// Creates an IS NOT NULL condition.
    #[must_use]
    pub fn is_not_null(self) -> Condition {
        Condition::Null {
            field: self.name,
            negated: true,
        }
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// A named parameter, rendered as `?`.
    Param(String),
    /// Another column.
    Column(String),
}

/// A predicate tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `field op rhs`
    Compare {
        /// Left-hand column.
        field: String,
        /// Operator text, checked at render time.
        op: String,
        /// Parameter or column on the right.
        rhs: Operand,
    },
    /// `field [NOT] BETWEEN ? AND ?`
    Between {
        /// Column under test.
        field: String,
        /// Lower-bound parameter.
        low: String,
        /// Upper-bound parameter.
        high: String,
        /// Renders NOT BETWEEN when set.
        negated: bool,
    },
    /// `field IS [NOT] NULL`
    Null {
        /// Column under test.
        field: String,
        /// Renders IS NOT NULL when set.
        negated: bool,
    },
    /// All members must hold.
    And(Vec<Condition>),
    /// At least one member must hold.
    Or(Vec<Condition>),
}

impl Condition {
    /// Combines conditions with AND.
    #[must_use]
    pub const fn all(conditions: Vec<Self>) -> Self {
        Self::And(conditions)
    }

    /// Combines conditions with OR.
    #[must_use]
    pub const fn any(conditions: Vec<Self>) -> Self {
        Self::Or(conditions)
    }

    /// Combines this condition with another using AND.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::And(mut members) => {
                members.push(other);
                Self::And(members)
            }
            first => Self::And(vec![first, other]),
        }
    }

    /// Combines this condition with another using OR.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match self {
            Self::Or(mut members) => {
                members.push(other);
                Self::Or(members)
            }
            first => Self::Or(vec![first, other]),
        }
    }

    /// Renders the condition on its own.
    pub fn render(&self) -> Result<Rendered> {
        let mut w = SqlWriter::new();
        self.write(&mut w)?;
        Ok(w.finish())
    }

    pub(crate) fn write(&self, w: &mut SqlWriter) -> Result<()> {
        match self {
            Self::Compare { field, op, rhs } => {
                w.ident(field)?;
                w.push(" ");
                w.push(&render::comparison_operator(op)?);
                w.push(" ");
                match rhs {
                    Operand::Param(name) => w.param(name)?,
                    Operand::Column(other) => w.ident(other)?,
                }
            }
            Self::Between {
                field,
                low,
                high,
                negated,
            } => {
                w.ident(field)?;
                w.push(if *negated { " NOT BETWEEN " } else { " BETWEEN " });
                w.param(low)?;
                w.push(" AND ");
                w.param(high)?;
            }
            Self::Null { field, negated } => {
                w.ident(field)?;
                w.push(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Self::And(members) => write_group(w, members, " AND ", "1 = 1")?,
            Self::Or(members) => write_group(w, members, " OR ", "1 = 0")?,
        }
        Ok(())
    }
}

fn write_group(w: &mut SqlWriter, members: &[Condition], joiner: &str, empty: &str) -> Result<()> {
    match members {
        [] => w.push(empty),
        [only] => only.write(w)?,
        many => {
            w.push("(");
            for (i, member) in many.iter().enumerate() {
                if i > 0 {
                    w.push(joiner);
                }
                member.write(w)?;
            }
            w.push(")");
        }
    }
    Ok(())
}

/// Writes ` <keyword> c1 AND c2 ...`, or nothing when there are no conditions.
pub(crate) fn write_clause(w: &mut SqlWriter, keyword: &str, conditions: &[Condition]) -> Result<()> {
    if conditions.is_empty() {
        return Ok(());
    }
    w.push(keyword);
    for (i, condition) in conditions.iter().enumerate() {
        if i > 0 {
            w.push(" AND ");
        }
        condition.write(w)?;
    }
    Ok(())
}

/// Builders that accept WHERE conditions.
///
/// Each call adds one top-level condition; top-level conditions are joined
/// with AND when the statement renders.
pub trait Filter: Sized {
    /// Adds a condition to the WHERE clause.
    #[must_use]
    fn filter(self, condition: Condition) -> Self;

    /// `field op ?`
    #[must_use]
    fn where_cond(self, field: &str, op: &str, param: &str) -> Self {
        self.filter(col(field).cmp(op, param))
    }

    /// A parenthesised AND of `conditions`.
    #[must_use]
    fn where_and(self, conditions: Vec<Condition>) -> Self {
        self.filter(Condition::all(conditions))
    }

    /// A parenthesised OR of `conditions`.
    #[must_use]
    fn where_or(self, conditions: Vec<Condition>) -> Self {
        self.filter(Condition::any(conditions))
    }

    /// `field BETWEEN ? AND ?`
    #[must_use]
    fn where_between(self, field: &str, low: &str, high: &str) -> Self {
        self.filter(col(field).between(low, high))
    }

    /// `field NOT BETWEEN ? AND ?`
    #[must_use]
    fn where_not_between(self, field: &str, low: &str, high: &str) -> Self {
        self.filter(col(field).not_between(low, high))
    }

    /// `left op right`, both columns.
    #[must_use]
    fn where_fields(self, left: &str, op: &str, right: &str) -> Self {
        self.filter(col(left).cmp_column(op, right))
    }

    /// `field IS NULL`
    #[must_use]
    fn where_null(self, field: &str) -> Self {
        self.filter(col(field).is_null())
    }

    /// `field IS NOT NULL`
    #[must_use]
    fn where_not_null(self, field: &str) -> Self {
        self.filter(col(field).is_not_null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::error::BuildError;

    #[test]
    fn test_column_cmp() {
        let rendered = col("age").gt_eq("min_age").render().unwrap();
        assert_eq!(rendered.sql, "age >= ?");
        assert_eq!(rendered.params, vec!["min_age"]);
    }

    #[test]
    fn test_field_comparison_has_no_params() {
        let rendered = col("updated_at")
            .cmp_column(">", "created_at")
            .render()
            .unwrap();
        assert_eq!(rendered.sql, "updated_at > created_at");
        assert!(rendered.params.is_empty());
    }

    #[test]
    fn test_between() {
        let rendered = col("price").not_between("lo", "hi").render().unwrap();
        assert_eq!(rendered.sql, "price NOT BETWEEN ? AND ?");
        assert_eq!(rendered.params, vec!["lo", "hi"]);
    }

    #[test]
    fn test_and_or_nesting() {
        let cond = col("active")
            .eq("active")
            .and(col("age").gt("age").or(col("verified").eq("verified")));
        let rendered = cond.render().unwrap();
        assert_eq!(rendered.sql, "(active = ? AND (age > ? OR verified = ?))");
        assert_eq!(rendered.params, vec!["active", "age", "verified"]);
    }

    #[test]
    fn test_empty_groups() {
        assert_eq!(Condition::all(vec![]).render().unwrap().sql, "1 = 1");
        assert_eq!(Condition::any(vec![]).render().unwrap().sql, "1 = 0");
    }

    #[test]
    fn test_single_member_group_is_unwrapped() {
        let rendered = Condition::any(vec![col("a").is_null()]).render().unwrap();
        assert_eq!(rendered.sql, "a IS NULL");
    }

    #[test]
    fn test_injection_in_field_is_rejected() {
        let err = col("name = '' OR 1").eq("x").render().unwrap_err();
        assert!(matches!(err, BuildError::InvalidIdentifier(_)));
    }

    #[test]
    fn test_injection_in_operator_is_rejected() {
        let err = col("name").cmp("= 1 OR name =", "x").render().unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedOperator(_)));
    }
}
