//! Condition tree translation onto the builder's `Filter` API.
//!
//! Translation is level by level: a group's children are translated into a
//! list of builder conditions, and nested groups become nested AND/OR lists,
//! so nesting is preserved exactly. Depth limits are enforced earlier, when
//! parameters are derived at registration.

use oxide_spec_core::builder::{col, Condition, Filter};

use crate::spec::{ConditionSpec, Logic};

/// Converts one spec node into a builder condition.
#[must_use]
pub fn translate(spec: &ConditionSpec) -> Condition {
    match spec {
        ConditionSpec::Group { logic, conditions } => {
            let members = conditions.iter().map(translate).collect();
            match logic {
                Logic::Or => Condition::any(members),
                Logic::And => Condition::all(members),
            }
        }
        ConditionSpec::Between {
            field,
            low_param,
            high_param,
            negated,
        } => {
            if *negated {
                col(field).not_between(low_param, high_param)
            } else {
                col(field).between(low_param, high_param)
            }
        }
        ConditionSpec::FieldComparison {
            field,
            operator,
            right_field,
        } => col(field).cmp_column(operator, right_field),
        ConditionSpec::Null { field, negated } => {
            if *negated {
                col(field).is_not_null()
            } else {
                col(field).is_null()
            }
        }
        ConditionSpec::Simple {
            field,
            operator,
            param,
        } => col(field).cmp(operator, param),
    }
}

/// Adds every top-level spec to `builder` as its own WHERE entry.
#[must_use]
pub fn apply_where<B: Filter>(builder: B, specs: &[ConditionSpec]) -> B {
    specs.iter().fold(builder, apply_one)
}

fn apply_one<B: Filter>(builder: B, spec: &ConditionSpec) -> B {
    match spec {
        ConditionSpec::Group { logic, conditions } => {
            let members = conditions.iter().map(translate).collect();
            match logic {
                Logic::Or => builder.where_or(members),
                Logic::And => builder.where_and(members),
            }
        }
        ConditionSpec::Between {
            field,
            low_param,
            high_param,
            negated: true,
        } => builder.where_not_between(field, low_param, high_param),
        ConditionSpec::Between {
            field,
            low_param,
            high_param,
            negated: false,
        } => builder.where_between(field, low_param, high_param),
        ConditionSpec::FieldComparison {
            field,
            operator,
            right_field,
        } => builder.where_fields(field, operator, right_field),
        ConditionSpec::Null {
            field,
            negated: true,
        } => builder.where_not_null(field),
        ConditionSpec::Null {
            field,
            negated: false,
        } => builder.where_null(field),
        ConditionSpec::Simple {
            field,
            operator,
            param,
        } => builder.where_cond(field, operator, param),
    }
}

#[cfg(test)]
mod tests {
    use oxide_spec_core::builder::{Delete, Update};

    use super::*;

    #[test]
    fn test_or_group() {
        let spec = ConditionSpec::or(vec![
            ConditionSpec::simple("a", "=", "a"),
            ConditionSpec::simple("b", "=", "b"),
        ]);
        assert_eq!(translate(&spec).render().unwrap().sql, "(a = ? OR b = ?)");
    }

    #[test]
    fn test_nested_groups_keep_nesting() {
        let spec = ConditionSpec::and(vec![
            ConditionSpec::simple("a", "=", "a"),
            ConditionSpec::or(vec![
                ConditionSpec::is_null("b"),
                ConditionSpec::and(vec![
                    ConditionSpec::simple("c", ">", "c"),
                    ConditionSpec::between("d", "lo", "hi"),
                ]),
            ]),
        ]);
        let rendered = translate(&spec).render().unwrap();
        assert_eq!(
            rendered.sql,
            "(a = ? AND (b IS NULL OR (c > ? AND d BETWEEN ? AND ?)))"
        );
        assert_eq!(rendered.params, vec!["a", "c", "lo", "hi"]);
    }

    #[test]
    fn test_apply_where_joins_top_level_with_and() {
        let rendered = apply_where(
            Delete::from("t"),
            &[
                ConditionSpec::not_between("x", "lo", "hi"),
                ConditionSpec::is_not_null("y"),
            ],
        )
        .render()
        .unwrap();
        assert_eq!(
            rendered.sql,
            "DELETE FROM t WHERE x NOT BETWEEN ? AND ? AND y IS NOT NULL"
        );
    }

    #[test]
    fn test_field_comparison_applies_to_update() {
        let rendered = apply_where(
            Update::table("t").set("a", "a"),
            &[ConditionSpec::fields("a", "<", "b")],
        )
        .render()
        .unwrap();
        assert_eq!(rendered.sql, "UPDATE t SET a = ? WHERE a < b");
    }
}
