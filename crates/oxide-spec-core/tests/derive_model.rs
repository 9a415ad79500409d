//! Tests for the `#[derive(Model)]` macro output.

use oxide_spec_core::schema::{FieldMeta, Model, TableMeta};
use oxide_spec_derive::Model;

// =============================================================================
// Test: default table name and inferred types
// =============================================================================

#[allow(dead_code)]
#[derive(Debug, Clone, Model)]
pub struct UserAccount {
    #[field(primary_key)]
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub score: f64,
    pub active: bool,
    pub avatar: Vec<u8>,
}

#[test]
fn test_default_table_name_is_snake_case() {
    assert_eq!(UserAccount::table_meta().name, "user_account");
}

#[test]
fn test_inferred_field_types() {
    let meta = UserAccount::table_meta();
    assert_eq!(meta.field_type("id"), Some("integer"));
    assert_eq!(meta.field_type("name"), Some("string"));
    assert_eq!(meta.field_type("email"), Some("string"));
    assert_eq!(meta.field_type("score"), Some("float"));
    assert_eq!(meta.field_type("active"), Some("boolean"));
    assert_eq!(meta.field_type("avatar"), Some("bytes"));
}

#[test]
fn test_option_is_nullable() {
    let meta = UserAccount::table_meta();
    assert!(meta.lookup("email").unwrap().nullable);
    assert!(!meta.lookup("name").unwrap().nullable);
}

#[test]
fn test_primary_key_shorthand() {
    assert_eq!(UserAccount::table_meta().primary_key(), vec!["id"]);
}

// =============================================================================
// Test: explicit attributes
// =============================================================================

#[allow(dead_code)]
#[derive(Debug, Model)]
#[model(table = "memberships")]
pub struct Membership {
    #[field(column = "user_ref", constraints = "primary_key, foreign_key")]
    pub user_id: i32,
    #[field(column = "group_ref", constraints = "pk")]
    pub group_id: i32,
    #[field(sql_type = "timestamp")]
    pub joined_at: String,
    #[field(skip)]
    pub cached: Option<u8>,
}

#[test]
fn test_explicit_table_name() {
    assert_eq!(Membership::table_meta().name, "memberships");
}

#[test]
fn test_column_rename_and_constraints() {
    let meta = Membership::table_meta();
    let user = meta.lookup("user_id").unwrap();
    assert_eq!(
        *user,
        FieldMeta {
            name: String::from("user_id"),
            column: String::from("user_ref"),
            sql_type: String::from("integer"),
            constraints: vec![String::from("primary_key"), String::from("foreign_key")],
            nullable: false,
        }
    );
}

#[test]
fn test_composite_primary_key() {
    assert_eq!(
        Membership::table_meta().primary_key(),
        vec!["user_ref", "group_ref"]
    );
}

#[test]
fn test_explicit_sql_type_and_skip() {
    let meta = Membership::table_meta();
    assert_eq!(meta.field_type("joined_at"), Some("timestamp"));
    assert!(meta.lookup("cached").is_none());
    assert_eq!(meta.columns(), vec!["user_ref", "group_ref", "joined_at"]);
}

// =============================================================================
// Test: derived metadata matches hand-built metadata
// =============================================================================

#[allow(dead_code)]
#[derive(Model)]
#[model(table = "tags")]
struct Tag {
    #[field(primary_key)]
    id: i64,
    label: String,
}

#[test]
fn test_matches_builder() {
    let expected = TableMeta::new("tags")
        .field(FieldMeta::new("id", "integer").primary_key())
        .field(FieldMeta::new("label", "string"));
    assert_eq!(Tag::table_meta(), expected);
}
