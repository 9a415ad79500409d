//! Registry behavior: defaults, add/remove, rendering, the render cache and
//! parameter derivation through the factory.

use std::sync::Arc;
use std::thread;

use oxide_spec::core::{FieldMeta, TableMeta};
use oxide_spec::spec::{
    AggregateSpec, CompoundQuerySpec, ConditionSpec, DeleteSpec, HavingAggSpec, QuerySpec,
    SetOperandSpec, UpdateSpec,
};
use oxide_spec::{
    AggregateCapability, AnyCapability, CapabilityKind, DeleteCapability, Factory, FactoryConfig,
    ParamSpec, QueryCapability, SpecError, UpdateCapability,
};
use oxide_spec_core::builder::AggregateFunc;
use oxide_spec_core::Model;
use oxide_spec_derive::Model;

#[allow(dead_code)]
#[derive(Debug, Clone, Model)]
#[model(table = "users")]
pub struct User {
    #[field(primary_key)]
    pub id: i64,
    pub email: String,
    pub age: i64,
    pub status: String,
    pub nickname: Option<String>,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Model)]
pub struct AuditEntry {
    pub message: String,
}

fn users() -> Factory {
    Factory::for_model::<User>().unwrap()
}

fn where_spec(filter: Vec<ConditionSpec>) -> QuerySpec {
    QuerySpec {
        filter,
        ..QuerySpec::default()
    }
}

// =============================================================================
// Construction and defaults
// =============================================================================

#[test]
fn test_defaults_use_primary_key() {
    let factory = users();
    assert_eq!(factory.primary_key(), ["id"]);

    for kind in [CapabilityKind::Select, CapabilityKind::Delete] {
        let params = factory.params(kind, kind.as_str()).unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "id");
        assert!(params[0].required);
        assert_eq!(params[0].param_type, "integer");
    }

    assert_eq!(
        factory.render_select("select").unwrap().sql,
        "SELECT * FROM users WHERE id = ?"
    );
    assert_eq!(
        factory.render_delete("delete").unwrap().sql,
        "DELETE FROM users WHERE id = ?"
    );
    assert_eq!(
        factory.render_query("query").unwrap().sql,
        "SELECT * FROM users ORDER BY id ASC"
    );
    assert_eq!(
        factory.render_aggregate("count").unwrap().sql,
        "SELECT COUNT(*) FROM users"
    );
}

#[test]
fn test_missing_primary_key_fails() {
    let err = Factory::for_model::<AuditEntry>().unwrap_err();
    assert!(matches!(err, SpecError::MissingPrimaryKey { ref table } if table == "audit_entry"));
}

#[test]
fn test_composite_primary_key() {
    let table = TableMeta::new("memberships")
        .field(FieldMeta::new("org_id", "integer").primary_key())
        .field(FieldMeta::new("user_id", "integer").constraint("PK"))
        .field(FieldMeta::new("role", "string"));
    let factory = Factory::new(table).unwrap();

    let rendered = factory.render_select("select").unwrap();
    assert_eq!(
        rendered.sql,
        "SELECT * FROM memberships WHERE org_id = ? AND user_id = ?"
    );
    assert_eq!(rendered.params, vec!["org_id", "user_id"]);
    assert_eq!(
        factory.render_query("query").unwrap().sql,
        "SELECT * FROM memberships ORDER BY org_id ASC, user_id ASC"
    );
}

// =============================================================================
// Registration
// =============================================================================

#[test]
fn test_adults_query() {
    let factory = users();
    factory
        .add_query(QueryCapability::new(
            "adults",
            where_spec(vec![ConditionSpec::simple("age", ">=", "min_age")]),
        ))
        .unwrap();

    let rendered = factory.render_query("adults").unwrap();
    assert_eq!(rendered.sql, "SELECT * FROM users WHERE age >= ?");
    assert_eq!(rendered.params, vec!["min_age"]);

    let params = factory.params(CapabilityKind::Query, "adults").unwrap();
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].name, "min_age");
    assert_eq!(params[0].param_type, "integer");
}

#[test]
fn test_having_agg_param_is_untyped() {
    let factory = users();
    let spec = QuerySpec {
        fields: vec![String::from("status")],
        group_by: vec![String::from("status")],
        having_agg: vec![HavingAggSpec {
            func: AggregateFunc::Count,
            field: None,
            operator: String::from(">"),
            param: String::from("min_count"),
        }],
        ..QuerySpec::default()
    };
    factory
        .add_query(QueryCapability::new("busy_statuses", spec))
        .unwrap();

    let params = factory
        .params(CapabilityKind::Query, "busy_statuses")
        .unwrap();
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].name, "min_count");
    assert_eq!(params[0].param_type, "any");
    assert_eq!(
        factory.render_query("busy_statuses").unwrap().sql,
        "SELECT status FROM users GROUP BY status HAVING COUNT(*) > ?"
    );
}

#[test]
fn test_declared_params_are_kept() {
    let factory = users();
    let declared = vec![ParamSpec::new("min_age", "integer")
        .with_default(serde_json::json!(18))
        .with_description("Lower age bound")];
    factory
        .add_query(
            QueryCapability::new(
                "adults",
                where_spec(vec![ConditionSpec::simple("age", ">=", "min_age")]),
            )
            .params(declared.clone()),
        )
        .unwrap();
    assert_eq!(
        factory.params(CapabilityKind::Query, "adults").unwrap(),
        declared
    );
}

#[test]
fn test_add_replaces_same_name() {
    let factory = users();
    factory
        .add_query(QueryCapability::new(
            "by_status",
            where_spec(vec![ConditionSpec::simple("status", "=", "status")]),
        ))
        .unwrap();
    factory
        .add_query(QueryCapability::new(
            "by_status",
            where_spec(vec![ConditionSpec::simple("status", "!=", "status")]),
        ))
        .unwrap();
    assert_eq!(
        factory.render_query("by_status").unwrap().sql,
        "SELECT * FROM users WHERE status != ?"
    );
    assert_eq!(
        factory
            .list_queries()
            .iter()
            .filter(|q| q.name == "by_status")
            .count(),
        1
    );
}

#[test]
fn test_remove_and_has() {
    let factory = users();
    assert!(factory.has_select("select"));
    assert!(factory.remove_select("select"));
    assert!(!factory.has_select("select"));
    assert!(!factory.remove_select("select"));
    assert!(!factory.has(CapabilityKind::Select, "select"));

    let err = factory.render_select("select").unwrap_err();
    assert!(matches!(
        err,
        SpecError::NotFound { kind: CapabilityKind::Select, ref name } if name == "select"
    ));
}

#[test]
fn test_names_are_scoped_per_kind() {
    let factory = users();
    factory
        .add_update(UpdateCapability::new(
            "select",
            UpdateSpec {
                set: [(String::from("status"), String::from("status"))].into(),
                filter: vec![ConditionSpec::simple("id", "=", "id")],
            },
        ))
        .unwrap();
    assert!(factory.has_select("select"));
    assert!(factory.has_update("select"));
    assert!(factory.remove(CapabilityKind::Update, "select"));
    assert!(factory.has_select("select"));
}

#[test]
fn test_add_any_dispatches_on_kind() {
    let factory = users();
    let cap: AnyCapability = serde_json::from_value(serde_json::json!({
        "kind": "aggregate",
        "name": "avg_age",
        "func": "avg",
        "spec": {"field": "age", "where": [{"field": "status", "operator": "=", "param": "status"}]}
    }))
    .unwrap();
    factory.add_any(cap).unwrap();

    let rendered = factory.render_aggregate("avg_age").unwrap();
    assert_eq!(rendered.sql, "SELECT AVG(age) FROM users WHERE status = ?");
    let cap = factory.get_aggregate("avg_age").unwrap();
    assert_eq!(cap.func, AggregateFunc::Avg);
    assert_eq!(cap.params[0].param_type, "string");
}

#[test]
fn test_invalid_spec_fails_at_render() {
    let factory = users();
    factory
        .add_delete(DeleteCapability::new(
            "bad",
            DeleteSpec {
                filter: vec![ConditionSpec::simple("id; DROP TABLE users", "=", "id")],
            },
        ))
        .unwrap();
    let err = factory.render_delete("bad").unwrap_err();
    assert!(matches!(err, SpecError::Build(_)));
}

// =============================================================================
// Render cache
// =============================================================================

#[test]
fn test_render_is_idempotent() {
    let factory = users();
    let first = factory.render(CapabilityKind::Query, "query").unwrap();
    let second = factory.render(CapabilityKind::Query, "query").unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_readd_invalidates_cache() {
    let factory = users();
    assert_eq!(
        factory.render_aggregate("count").unwrap().sql,
        "SELECT COUNT(*) FROM users"
    );
    factory
        .add_aggregate(AggregateCapability::new(
            "count",
            AggregateFunc::Count,
            AggregateSpec {
                field: None,
                filter: vec![ConditionSpec::is_null("nickname")],
            },
        ))
        .unwrap();
    assert_eq!(
        factory.render_aggregate("count").unwrap().sql,
        "SELECT COUNT(*) FROM users WHERE nickname IS NULL"
    );
}

#[test]
fn test_concurrent_readers_and_writers() {
    let factory = Arc::new(users());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let factory = Arc::clone(&factory);
            thread::spawn(move || {
                let name = format!("q{i}");
                factory
                    .add_query(QueryCapability::new(
                        &name,
                        where_spec(vec![ConditionSpec::simple("age", ">", "age")]),
                    ))
                    .unwrap();
                for _ in 0..50 {
                    assert_eq!(
                        factory.render_query(&name).unwrap().sql,
                        "SELECT * FROM users WHERE age > ?"
                    );
                    assert!(factory.render_select("select").is_ok());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(factory.list_queries().len(), 9);
}

// =============================================================================
// Depth limit
// =============================================================================

fn nested(levels: usize) -> ConditionSpec {
    (0..levels).fold(ConditionSpec::simple("age", ">", "age"), |inner, _| {
        ConditionSpec::and(vec![inner])
    })
}

#[test]
fn test_depth_limit_applies_at_add() {
    let factory = users();
    factory
        .add_query(QueryCapability::new("deep_ok", where_spec(vec![nested(9)])))
        .unwrap();

    let err = factory
        .add_query(QueryCapability::new("too_deep", where_spec(vec![nested(10)])))
        .unwrap_err();
    assert!(matches!(err, SpecError::DepthExceeded { depth: 11, max: 10 }));
    assert!(!factory.has_query("too_deep"));
}

#[test]
fn test_depth_limit_is_configurable() {
    let config = FactoryConfig::default().max_condition_depth(2);
    let factory = Factory::with_config(User::table_meta(), config).unwrap();
    assert!(factory
        .add_query(QueryCapability::new("two", where_spec(vec![nested(2)])))
        .is_err());

    factory.set_max_condition_depth(0);
    factory
        .add_query(QueryCapability::new("deep", where_spec(vec![nested(40)])))
        .unwrap();
}

// =============================================================================
// Compounds and catalog
// =============================================================================

#[test]
fn test_compound_union() {
    let factory = users();
    let executor = factory.executor();
    let mut spec = CompoundQuerySpec {
        base: QuerySpec {
            fields: vec![String::from("id")],
            ..where_spec(vec![ConditionSpec::simple("status", "=", "status")])
        },
        operands: vec![SetOperandSpec::new(
            "union",
            QuerySpec {
                fields: vec![String::from("id")],
                ..where_spec(vec![ConditionSpec::simple("age", ">", "age")])
            },
        )],
        ..CompoundQuerySpec::default()
    };

    let prepared = executor.prepare_compound(&spec).unwrap();
    assert_eq!(
        prepared.sql(),
        "SELECT id FROM users WHERE status = ? UNION SELECT id FROM users WHERE age > ?"
    );
    assert_eq!(prepared.bind_order(), ["status", "age"]);

    spec.operands[0].operation = String::from("union_all");
    assert!(executor
        .prepare_compound(&spec)
        .unwrap()
        .sql()
        .contains("UNION ALL"));

    spec.operands.clear();
    assert!(matches!(
        executor.prepare_compound(&spec),
        Err(SpecError::EmptyCompound)
    ));
}

#[test]
fn test_compound_unknown_operation() {
    let factory = users();
    let spec = CompoundQuerySpec {
        operands: vec![SetOperandSpec::new("merge", QuerySpec::default())],
        ..CompoundQuerySpec::default()
    };
    let err = factory.executor().prepare_compound(&spec).unwrap_err();
    assert!(matches!(
        err,
        SpecError::UnknownSetOperation { index: 0, ref operation } if operation == "merge"
    ));
}

#[test]
fn test_catalog_is_sorted() {
    let factory = users();
    factory
        .add_query(
            QueryCapability::new("adults", where_spec(vec![]))
                .description("Adults")
                .tag("reporting"),
        )
        .unwrap();
    let catalog = factory.catalog();
    assert_eq!(catalog.table, "users");
    assert_eq!(catalog.primary_key, vec!["id"]);
    let entries: Vec<(CapabilityKind, &str)> = catalog
        .capabilities
        .iter()
        .map(|c| (c.kind, c.name.as_str()))
        .collect();
    assert_eq!(
        entries,
        vec![
            (CapabilityKind::Query, "adults"),
            (CapabilityKind::Query, "query"),
            (CapabilityKind::Select, "select"),
            (CapabilityKind::Delete, "delete"),
            (CapabilityKind::Aggregate, "count"),
        ]
    );
    assert_eq!(catalog.capabilities[0].tags, vec!["reporting"]);
}
