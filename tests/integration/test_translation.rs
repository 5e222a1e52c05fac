// Copyright © 2026 Pathway

use std::sync::Arc;

use assert_matches::assert_matches;

use cogroup_engine::engine::{
    compute_translation, CoGroupConfig, ComparatorRegistry, Error, FieldType, SortCriteria,
    TranslationCache,
};

use crate::helpers::schema;

fn orders() -> cogroup_engine::engine::Schema {
    schema(
        "orders",
        &[
            ("amount", FieldType::Double),
            ("country", FieldType::String),
            ("id", FieldType::Long),
            ("note", FieldType::String),
        ],
    )
}

fn common() -> cogroup_engine::engine::Schema {
    schema(
        "common",
        &[("country", FieldType::String), ("id", FieldType::Long)],
    )
}

fn particular() -> cogroup_engine::engine::Schema {
    schema(
        "orders.particular",
        &[("note", FieldType::String), ("amount", FieldType::Double)],
    )
}

#[test]
fn test_mapping_positions() -> eyre::Result<()> {
    let mapping = compute_translation(&common(), &particular(), &orders())?;
    assert_eq!(mapping.common(), [1, 2]);
    assert_eq!(mapping.particular(), [3, 0]);
    assert_eq!(mapping.len(), 4);

    assert_eq!(mapping.common_translation(0), Some(1));
    assert_eq!(mapping.common_translation(2), None);
    assert_eq!(mapping.particular_translation(1), None);
    assert_eq!(mapping.particular_translation(2), Some(3));
    assert_eq!(mapping.particular_translation(3), Some(0));
    assert_eq!(mapping.native_position(1), Some(2));
    assert_eq!(mapping.native_position(4), None);
    Ok(())
}

#[test]
fn test_field_neither_common_nor_particular() {
    let particular = schema("orders.particular", &[("amount", FieldType::Double)]);
    let result = compute_translation(&common(), &particular, &orders());
    assert_matches!(result, Err(Error::InvalidConfig(message)) if message.contains("\"note\""));
}

#[test]
fn test_field_both_common_and_particular() {
    let particular = schema(
        "orders.particular",
        &[
            ("note", FieldType::String),
            ("amount", FieldType::Double),
            ("id", FieldType::Long),
        ],
    );
    let result = compute_translation(&common(), &particular, &orders());
    assert_matches!(result, Err(Error::InvalidConfig(message)) if message.contains("\"id\""));
}

#[test]
fn test_unknown_unified_field() {
    let particular = schema(
        "orders.particular",
        &[
            ("note", FieldType::String),
            ("amount", FieldType::Double),
            ("discount", FieldType::Double),
        ],
    );
    let result = compute_translation(&common(), &particular, &orders());
    assert_matches!(
        result,
        Err(Error::UnknownField { field, schema }) if field == "discount" && schema == "orders"
    );
}

#[test]
fn test_cache_computes_once() -> eyre::Result<()> {
    let cache = TranslationCache::new();
    let (common, particular, orders) = (common(), particular(), orders());
    let first = cache.get_or_compute(&common, &particular, &orders)?;
    for _ in 0..1000 {
        let again = cache.get_or_compute(&common, &particular, &orders)?;
        assert!(Arc::ptr_eq(&first, &again));
    }
    assert_eq!(cache.computations(), 1);
    assert_eq!(cache.len(), 1);
    Ok(())
}

#[test]
fn test_cache_keys_on_schema_identity() -> eyre::Result<()> {
    let cache = TranslationCache::new();
    cache.get_or_compute(&common(), &particular(), &orders())?;
    // equal declarations are the same schema, whatever the instance
    cache.get_or_compute(&common(), &particular(), &orders())?;
    assert_eq!(cache.computations(), 1);

    let reordered = schema(
        "orders.particular",
        &[("amount", FieldType::Double), ("note", FieldType::String)],
    );
    let mapping = cache.get_or_compute(&common(), &reordered, &orders())?;
    assert_eq!(mapping.particular(), [0, 3]);
    assert_eq!(cache.computations(), 2);
    Ok(())
}

#[test]
fn test_failed_translation_is_not_cached() {
    let cache = TranslationCache::new();
    let particular = schema("orders.particular", &[("amount", FieldType::Double)]);
    assert!(cache
        .get_or_compute(&common(), &particular, &orders())
        .is_err());
    assert!(cache.is_empty());
    assert_eq!(cache.computations(), 0);
}

#[test]
fn test_layout_mappings() -> eyre::Result<()> {
    let config = CoGroupConfig::builder()
        .add_source(schema(
            "users",
            &[("id", FieldType::Long), ("country", FieldType::String)],
        ))
        .add_source(orders())
        .group_by(["country"])
        .order_by(SortCriteria::new().asc("country").desc("id"))
        .particular_order_by("orders", SortCriteria::new().asc("note"))
        .build(&ComparatorRegistry::new())?;
    let layout = config.layout();

    let users = layout.source_by_name("users")?;
    assert_eq!(users.mapping().common(), [1, 0]);
    assert!(users.mapping().particular().is_empty());

    let orders = layout.source_by_name("orders")?;
    assert_eq!(orders.mapping().common(), [1, 2]);
    // particular sort fields first, then the rest in native order
    assert_eq!(orders.mapping().particular(), [3, 0]);
    assert_eq!(orders.particular_sort_fields().len(), 1);
    assert_eq!(orders.particular_fields()[1].name(), "amount");
    Ok(())
}
