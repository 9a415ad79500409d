//! Orders - capability registry example
//!
//! Registers a few named capabilities for an `orders` table, prints the
//! catalog an external caller would see, then runs them against an
//! in-memory SQLite database.
//!
//! Run with: cargo run --example orders

use oxide_spec::spec::{AggregateSpec, ConditionSpec, OrderBySpec, QuerySpec, UpdateSpec};
use oxide_spec::{
    AggregateCapability, CapabilityKind, Factory, Params, QueryCapability, UpdateCapability,
};
use oxide_spec_core::builder::AggregateFunc;
use oxide_spec_derive::Model;
use sqlx::sqlite::SqlitePoolOptions;

// =============================================================================
// SCHEMA
// =============================================================================

#[allow(dead_code)]
#[derive(Debug, Clone, Model)]
#[model(table = "orders")]
pub struct Order {
    #[field(primary_key)]
    pub id: i64,
    pub customer: String,
    pub total: f64,
    pub status: String,
    pub shipped_at: Option<String>,
}

// =============================================================================
// CAPABILITIES
// =============================================================================

fn register(factory: &Factory) -> oxide_spec::Result<()> {
    factory.add_query(
        QueryCapability::new(
            "open_for_customer",
            QuerySpec {
                fields: vec![String::from("id"), String::from("total")],
                filter: vec![
                    ConditionSpec::simple("customer", "=", "customer"),
                    ConditionSpec::is_null("shipped_at"),
                ],
                order_by: vec![OrderBySpec::desc("total")],
                ..QuerySpec::default()
            },
        )
        .description("Unshipped orders of one customer, largest first"),
    )?;

    factory.add_update(
        UpdateCapability::new(
            "mark_shipped",
            UpdateSpec {
                set: [
                    (String::from("shipped_at"), String::from("shipped_at")),
                    (String::from("status"), String::from("status")),
                ]
                .into(),
                filter: vec![ConditionSpec::simple("id", "=", "id")],
            },
        )
        .description("Record a shipment"),
    )?;

    factory.add_aggregate(
        AggregateCapability::new(
            "revenue_between",
            AggregateFunc::Sum,
            AggregateSpec {
                field: Some(String::from("total")),
                filter: vec![ConditionSpec::between("total", "low", "high")],
            },
        )
        .description("Revenue from orders within a price band"),
    )?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let factory = Factory::for_model::<Order>()?;
    register(&factory)?;
    println!("{}", serde_json::to_string_pretty(&factory.catalog())?);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    sqlx::raw_sql(
        "CREATE TABLE orders (
            id INTEGER PRIMARY KEY,
            customer TEXT NOT NULL,
            total REAL NOT NULL,
            status TEXT NOT NULL,
            shipped_at TEXT
        );
        INSERT INTO orders (customer, total, status) VALUES
            ('acme', 120.0, 'open'),
            ('acme', 80.5, 'open'),
            ('globex', 42.0, 'open');",
    )
    .execute(&pool)
    .await?;

    let executor = factory.executor();
    let open: Vec<(i64, f64)> = executor
        .query(
            &pool,
            "open_for_customer",
            &Params::new().set("customer", "acme"),
        )
        .await?;
    println!("open acme orders: {open:?}");

    let shipped = executor
        .update(
            &pool,
            "mark_shipped",
            &Params::new()
                .set("id", open[0].0)
                .set("status", "shipped")
                .set("shipped_at", "2026-10-19"),
        )
        .await?;
    println!("shipped {shipped} order(s)");

    let revenue = executor
        .aggregate(
            &pool,
            "revenue_between",
            &Params::new().set("low", 50.0).set("high", 200.0),
        )
        .await?;
    println!("revenue in band: {revenue:?}");

    let rendered = factory.render(CapabilityKind::Query, "open_for_customer")?;
    println!("{}  -- binds {:?}", rendered.sql, rendered.params);
    Ok(())
}
