//! Derive macro for model metadata.
//!
//! This crate provides `#[derive(Model)]`, which implements
//! `oxide_spec_core::schema::Model` by describing each named field as a
//! `FieldMeta`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Fields, GenericArgument, Ident, LitStr,
    PathArguments, Type,
};

/// Derives `Model` for a struct with named fields.
///
/// # Attributes
///
/// - `#[model(table = "table_name")]` - SQL table name (optional, defaults
///   to snake_case of the struct name)
///
/// # Field Attributes
///
/// - `#[field(column = "col")]` - SQL column name (defaults to field name)
/// - `#[field(sql_type = "integer")]` - semantic type (inferred from the
///   Rust type when absent)
/// - `#[field(constraints = "primary_key,unique")]` - comma-separated tags
/// - `#[field(primary_key)]` - shorthand for the `primary_key` constraint
/// - `#[field(skip)]` - leaves the field out of the metadata
///
/// `Option<T>` fields are reported as nullable.
#[proc_macro_derive(Model, attributes(model, field))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_model_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

struct FieldAttrs {
    column: Option<String>,
    sql_type: Option<String>,
    constraints: Vec<String>,
    skip: bool,
}

fn derive_model_impl(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let table_name = get_table_name(&input.attrs, struct_name)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Model derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Model derive only supports structs",
            ));
        }
    };

    let mut field_metas = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let attrs = parse_field_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        let name = ident.to_string();
        let column = attrs.column.unwrap_or_else(|| name.clone());
        let (inner, nullable) = unwrap_option(&field.ty);
        let sql_type = attrs.sql_type.unwrap_or_else(|| infer_sql_type(inner));
        let constraints = attrs.constraints;

        field_metas.push(quote! {
            ::oxide_spec_core::schema::FieldMeta {
                name: ::std::string::String::from(#name),
                column: ::std::string::String::from(#column),
                sql_type: ::std::string::String::from(#sql_type),
                constraints: ::std::vec![#(::std::string::String::from(#constraints)),*],
                nullable: #nullable,
            }
        });
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::oxide_spec_core::schema::Model for #struct_name #ty_generics #where_clause {
            fn table_meta() -> ::oxide_spec_core::schema::TableMeta {
                ::oxide_spec_core::schema::TableMeta {
                    name: ::std::string::String::from(#table_name),
                    fields: ::std::vec![#(#field_metas),*],
                }
            }
        }
    })
}

fn get_table_name(attrs: &[Attribute], struct_name: &Ident) -> syn::Result<String> {
    for attr in attrs {
        if attr.path().is_ident("model") {
            let mut table_name = None;
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    let value: LitStr = meta.value()?.parse()?;
                    table_name = Some(value.value());
                    Ok(())
                } else {
                    Err(meta.error("unsupported model attribute"))
                }
            })?;
            if let Some(name) = table_name {
                return Ok(name);
            }
        }
    }
    Ok(to_snake_case(&struct_name.to_string()))
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs {
        column: None,
        sql_type: None,
        constraints: Vec::new(),
        skip: false,
    };

    for attr in attrs {
        if !attr.path().is_ident("field") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("primary_key") {
                push_constraint(&mut result.constraints, "primary_key");
            } else if meta.path.is_ident("skip") {
                result.skip = true;
            } else if meta.path.is_ident("column") {
                let value: LitStr = meta.value()?.parse()?;
                result.column = Some(value.value());
            } else if meta.path.is_ident("sql_type") {
                let value: LitStr = meta.value()?.parse()?;
                result.sql_type = Some(value.value());
            } else if meta.path.is_ident("constraints") {
                let value: LitStr = meta.value()?.parse()?;
                for tag in value.value().split(',') {
                    push_constraint(&mut result.constraints, tag);
                }
            } else {
                return Err(meta.error("unsupported field attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

fn push_constraint(constraints: &mut Vec<String>, tag: &str) {
    let tag = tag.trim();
    if !tag.is_empty() && !constraints.iter().any(|c| c == tag) {
        constraints.push(String::from(tag));
    }
}

/// Returns the type inside `Option<T>` and whether it was wrapped.
fn unwrap_option(ty: &Type) -> (&Type, bool) {
    if let Type::Path(path) = ty {
        if let Some(segment) = path.path.segments.last() {
            if segment.ident == "Option" {
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(GenericArgument::Type(inner)) = args.args.first() {
                        return (inner, true);
                    }
                }
            }
        }
    }
    (ty, false)
}

fn infer_sql_type(ty: &Type) -> String {
    match ty {
        Type::Reference(reference) => infer_sql_type(&reference.elem),
        Type::Path(path) => {
            let Some(segment) = path.path.segments.last() else {
                return String::from("any");
            };
            let ident = segment.ident.to_string();
            match ident.as_str() {
                "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32"
                | "u64" | "u128" | "usize" => String::from("integer"),
                "f32" | "f64" => String::from("float"),
                "bool" => String::from("boolean"),
                "String" | "str" | "char" => String::from("string"),
                "Vec" if is_byte_vec(&segment.arguments) => String::from("bytes"),
                _ => ident.to_lowercase(),
            }
        }
        _ => String::from("any"),
    }
}

fn is_byte_vec(arguments: &PathArguments) -> bool {
    if let PathArguments::AngleBracketed(args) = arguments {
        if let Some(GenericArgument::Type(Type::Path(inner))) = args.args.first() {
            return inner.path.is_ident("u8");
        }
    }
    false
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}
