//! JSON documents as external callers write and read them.

use oxide_spec::core::TableMeta;
use oxide_spec::spec::{ConditionSpec, InsertSpec, Logic, QuerySpec};
use oxide_spec::{AnyCapability, CapabilityKind, Catalog, Factory, Params, SpecError};
use oxide_spec_core::builder::{SortOrder, SqlValue};
use serde_json::json;

const SCHEMA: &str = r#"{
    "name": "orders",
    "fields": [
        {"name": "id", "column": "id", "type": "integer", "constraints": ["primary_key"]},
        {"name": "customer", "column": "customer", "type": "string"},
        {"name": "total", "column": "total", "type": "float"},
        {"name": "placed_at", "column": "placed_at", "type": "timestamp", "nullable": true}
    ]
}"#;

const CAPABILITIES: &str = r#"[
    {
        "kind": "query",
        "name": "recent_large",
        "description": "Large orders since a date",
        "tags": ["reporting"],
        "spec": {
            "fields": ["id", "customer", "total"],
            "where": [
                {"field": "total", "operator": ">", "param": "min_total"},
                {"logic": "or", "conditions": [
                    {"field": "placed_at", "operator": ">=", "param": "since"},
                    {"field": "placed_at", "operator": "is null"}
                ]}
            ],
            "order_by": [{"field": "total", "direction": "DESC", "nulls": "last"}],
            "limit_param": "limit"
        }
    },
    {
        "kind": "update",
        "name": "reassign",
        "spec": {
            "set": {"customer": "new_customer"},
            "where": [{"field": "customer", "operator": "=", "param": "old_customer"}]
        }
    },
    {
        "kind": "aggregate",
        "name": "revenue",
        "func": "SUM",
        "spec": {"field": "total"}
    }
]"#;

fn factory() -> Factory {
    let table: TableMeta = serde_json::from_str(SCHEMA).unwrap();
    let factory = Factory::new(table).unwrap();
    let caps: Vec<AnyCapability> = serde_json::from_str(CAPABILITIES).unwrap();
    factory.add_all(caps).unwrap();
    factory
}

#[test]
fn test_capability_file_registers_and_renders() {
    let factory = factory();
    let rendered = factory
        .render(CapabilityKind::Query, "recent_large")
        .unwrap();
    assert_eq!(
        rendered.sql,
        "SELECT id, customer, total FROM orders \
         WHERE total > ? AND (placed_at >= ? OR placed_at IS NULL) \
         ORDER BY total DESC NULLS LAST LIMIT ?"
    );
    assert_eq!(rendered.params, vec!["min_total", "since", "limit"]);

    let params = factory
        .params(CapabilityKind::Query, "recent_large")
        .unwrap();
    let typed: Vec<(&str, &str)> = params
        .iter()
        .map(|p| (p.name.as_str(), p.param_type.as_str()))
        .collect();
    assert_eq!(
        typed,
        vec![
            ("min_total", "float"),
            ("since", "timestamp"),
            ("limit", "integer")
        ]
    );

    assert_eq!(
        factory.render(CapabilityKind::Update, "reassign").unwrap().sql,
        "UPDATE orders SET customer = ? WHERE customer = ?"
    );
    assert_eq!(
        factory
            .render(CapabilityKind::Aggregate, "revenue")
            .unwrap()
            .sql,
        "SELECT SUM(total) FROM orders"
    );
}

#[test]
fn test_catalog_json_shape() {
    let catalog = factory().catalog();
    let value = serde_json::to_value(&catalog).unwrap();
    assert_eq!(value["table"], json!("orders"));
    assert_eq!(value["primary_key"], json!(["id"]));

    let first = &value["capabilities"][0];
    assert_eq!(first["kind"], json!("query"));
    assert_eq!(first["name"], json!("query"));

    let revenue = value["capabilities"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["name"] == json!("revenue"))
        .unwrap();
    assert_eq!(revenue["kind"], json!("aggregate"));
    assert_eq!(revenue["func"], json!("sum"));
    assert_eq!(revenue["params"], json!([]));

    let back: Catalog = serde_json::from_value(value).unwrap();
    assert_eq!(back, catalog);
}

#[test]
fn test_param_spec_json() {
    let params = factory()
        .params(CapabilityKind::Update, "reassign")
        .unwrap();
    assert_eq!(
        serde_json::to_value(&params).unwrap(),
        json!([
            {"name": "new_customer", "type": "string", "required": true},
            {"name": "old_customer", "type": "string", "required": true}
        ])
    );
}

#[test]
fn test_condition_variants_from_flat_objects() {
    let parsed: Vec<ConditionSpec> = serde_json::from_value(json!([
        {"field": "total", "low_param": "lo", "high_param": "hi", "operator": "not between"},
        {"field": "total", "operator": ">", "right_field": "discount"},
        {"field": "placed_at", "is_null": false},
        {"conditions": []}
    ]))
    .unwrap();
    assert_eq!(
        parsed,
        vec![
            ConditionSpec::not_between("total", "lo", "hi"),
            ConditionSpec::fields("total", ">", "discount"),
            ConditionSpec::is_not_null("placed_at"),
            ConditionSpec::Group {
                logic: Logic::And,
                conditions: vec![],
            },
        ]
    );
}

#[test]
fn test_condition_errors_name_missing_key() {
    let err = serde_json::from_value::<ConditionSpec>(json!({"field": "total", "operator": "="}))
        .unwrap_err();
    assert!(err.to_string().contains("missing `param`"));

    let err = serde_json::from_value::<ConditionSpec>(json!({"field": "a", "colour": "red"}))
        .unwrap_err();
    assert!(err.to_string().contains("colour"));
}

#[test]
fn test_query_spec_accepts_partial_documents() {
    let spec: QuerySpec = serde_json::from_value(json!({
        "order_by": [{"field": "id"}],
        "limit": 10,
        "lock": "share"
    }))
    .unwrap();
    assert_eq!(spec.order_by[0].direction, SortOrder::Asc);
    assert_eq!(spec.limit, Some(10));
    assert!(spec.filter.is_empty());
    assert_eq!(spec.lock, "share");
}

#[test]
fn test_insert_spec_json() {
    let spec: InsertSpec = serde_json::from_value(json!({
        "values": {"id": "id", "customer": "customer"},
        "conflict_columns": ["id"],
        "conflict_action": "NOTHING"
    }))
    .unwrap();
    let prepared = factory().executor().prepare_insert(&spec).unwrap();
    assert_eq!(
        prepared.sql(),
        "INSERT INTO orders (customer, id) VALUES (?, ?) ON CONFLICT (id) DO NOTHING"
    );
}

#[test]
fn test_params_from_json() {
    let params = Params::from_json(&json!({
        "id": 7,
        "total": 9.5,
        "customer": "acme",
        "paid": true,
        "placed_at": null
    }))
    .unwrap();
    assert_eq!(params.get("id"), Some(&SqlValue::Int(7)));
    assert_eq!(params.get("total"), Some(&SqlValue::Float(9.5)));
    assert_eq!(params.get("paid"), Some(&SqlValue::Bool(true)));
    assert_eq!(params.get("placed_at"), Some(&SqlValue::Null));

    let err = Params::from_json(&json!({"ids": [1, 2]})).unwrap_err();
    assert!(matches!(err, SpecError::UnsupportedParamValue(ref name) if name == "ids"));
}
