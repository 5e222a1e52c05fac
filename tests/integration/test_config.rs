// Copyright © 2026 Pathway

use std::fs;

use assert_matches::assert_matches;

use cogroup_engine::engine::{
    CoGroupConfig, CoGroupConfigBuilder, ComparatorRegistry, Error, FieldType, Order,
    SortCriteria, TranslationCache,
};

use crate::helpers::schema;

fn users() -> cogroup_engine::engine::Schema {
    schema(
        "users",
        &[
            ("id", FieldType::Long),
            ("country", FieldType::String),
            ("name", FieldType::String),
        ],
    )
}

fn orders() -> cogroup_engine::engine::Schema {
    schema(
        "orders",
        &[
            ("amount", FieldType::Double),
            ("country", FieldType::String),
            ("id", FieldType::Long),
        ],
    )
}

fn builder() -> CoGroupConfigBuilder {
    CoGroupConfig::builder()
        .add_source(users())
        .add_source(orders())
        .group_by(["country", "id"])
        .order_by(SortCriteria::new().asc("country").asc("id"))
}

#[test]
fn test_build_plain_grouping() -> eyre::Result<()> {
    let config = builder().build(&ComparatorRegistry::new())?;
    assert_eq!(config.sources().len(), 2);
    assert_eq!(config.group_by(), ["country", "id"]);
    assert_eq!(config.min_depth(), 1);
    assert_eq!(config.max_depth(), 1);
    assert_eq!(config.partition_fields(), ["country", "id"]);
    assert_eq!(config.rollup_from(), None);
    assert!(config.layout().is_multi_source());
    Ok(())
}

#[test]
fn test_build_rollup() -> eyre::Result<()> {
    let config = builder()
        .rollup_from("country")
        .build(&ComparatorRegistry::new())?;
    assert_eq!(config.min_depth(), 0);
    assert_eq!(config.max_depth(), 1);
    assert_eq!(config.partition_fields(), ["country"]);
    Ok(())
}

#[test]
fn test_rollup_from_last_field_is_plain_grouping() -> eyre::Result<()> {
    let config = builder().rollup_from("id").build(&ComparatorRegistry::new())?;
    assert_eq!(config.min_depth(), config.max_depth());
    assert_eq!(config.partition_fields(), ["country", "id"]);
    Ok(())
}

#[test]
fn test_custom_partition_fields() -> eyre::Result<()> {
    let config = builder()
        .partition_by(["id"])
        .build(&ComparatorRegistry::new())?;
    assert_eq!(config.partition_fields(), ["id"]);
    assert_eq!(config.min_depth(), 1);
    Ok(())
}

#[test]
fn test_no_schemas() {
    let result = CoGroupConfig::builder()
        .group_by(["id"])
        .order_by(SortCriteria::new().asc("id"))
        .build(&ComparatorRegistry::new());
    assert_matches!(result, Err(Error::NoSchemas));
}

#[test]
fn test_duplicate_schema() {
    let result = builder().add_source(users()).build(&ComparatorRegistry::new());
    assert_matches!(result, Err(Error::DuplicateSchema(name)) if name == "users");
}

#[test]
fn test_missing_group_by() {
    let result = CoGroupConfig::builder()
        .add_source(users())
        .order_by(SortCriteria::new().asc("id"))
        .build(&ComparatorRegistry::new());
    assert_matches!(result, Err(Error::MissingGroupByFields));
}

#[test]
fn test_group_by_must_prefix_common_criteria() {
    let result = builder()
        .group_by(["id"])
        .build(&ComparatorRegistry::new());
    assert_matches!(
        result,
        Err(Error::GroupByNotSorted { field, position: 0 }) if field == "id"
    );
}

#[test]
fn test_group_by_without_sort_element_is_an_error() {
    let result = builder()
        .order_by(SortCriteria::new().asc("country"))
        .build(&ComparatorRegistry::new());
    assert_matches!(
        result,
        Err(Error::GroupByNotSorted { field, position: 1 }) if field == "id"
    );
}

#[test]
fn test_unknown_sort_field() {
    let result = builder()
        .order_by(SortCriteria::new().asc("country").asc("id").desc("missing"))
        .build(&ComparatorRegistry::new());
    assert_matches!(
        result,
        Err(Error::UnknownField { field, schema }) if field == "missing" && schema == "users"
    );
}

#[test]
fn test_common_field_missing_in_source() {
    let result = CoGroupConfig::builder()
        .add_source(users())
        .add_source(schema("orders", &[("id", FieldType::Long)]))
        .group_by(["country", "id"])
        .order_by(SortCriteria::new().asc("country").asc("id"))
        .build(&ComparatorRegistry::new());
    assert_matches!(
        result,
        Err(Error::UnknownField { field, schema }) if field == "country" && schema == "orders"
    );
}

#[test]
fn test_common_field_type_mismatch() {
    let result = CoGroupConfig::builder()
        .add_source(users())
        .add_source(schema(
            "orders",
            &[("id", FieldType::Int), ("country", FieldType::String)],
        ))
        .group_by(["country", "id"])
        .order_by(SortCriteria::new().asc("country").asc("id"))
        .build(&ComparatorRegistry::new());
    assert_matches!(
        result,
        Err(Error::FieldTypeMismatch { field, schema, .. }) if field == "id" && schema == "orders"
    );
}

#[test]
fn test_duplicate_sort_field() {
    let result = builder()
        .order_by(SortCriteria::new().asc("country").asc("id").desc("country"))
        .build(&ComparatorRegistry::new());
    assert_matches!(result, Err(Error::DuplicateSortField { field, .. }) if field == "country");
}

#[test]
fn test_rollup_field_not_grouped() {
    let result = builder()
        .rollup_from("name")
        .build(&ComparatorRegistry::new());
    assert_matches!(result, Err(Error::RollupFieldNotGrouped(field)) if field == "name");
}

#[test]
fn test_rollup_with_custom_partition() {
    let result = builder()
        .rollup_from("country")
        .partition_by(["country"])
        .build(&ComparatorRegistry::new());
    assert_matches!(result, Err(Error::RollupWithCustomPartition));
}

#[test]
fn test_partition_field_not_grouped() {
    let result = builder()
        .partition_by(["amount"])
        .build(&ComparatorRegistry::new());
    assert_matches!(result, Err(Error::PartitionFieldNotGrouped(field)) if field == "amount");
}

#[test]
fn test_particular_criteria_for_unknown_source() {
    let result = builder()
        .particular_order_by("payments", SortCriteria::new().asc("amount"))
        .build(&ComparatorRegistry::new());
    assert_matches!(result, Err(Error::UnknownSource(source)) if source == "payments");
}

#[test]
fn test_particular_criteria_with_single_source() {
    let result = CoGroupConfig::builder()
        .add_source(users())
        .group_by(["id"])
        .order_by(SortCriteria::new().asc("id"))
        .particular_order_by("users", SortCriteria::new().asc("name"))
        .build(&ComparatorRegistry::new());
    assert_matches!(
        result,
        Err(Error::ParticularCriteriaWithSingleSource(source)) if source == "users"
    );
}

#[test]
fn test_particular_criteria_on_common_field() {
    let result = builder()
        .particular_order_by("orders", SortCriteria::new().desc("id"))
        .build(&ComparatorRegistry::new());
    assert_matches!(
        result,
        Err(Error::ParticularFieldIsCommon { field, schema }) if field == "id" && schema == "orders"
    );
}

#[test]
fn test_particular_criteria_on_unknown_field() {
    let result = builder()
        .particular_order_by("orders", SortCriteria::new().desc("name"))
        .build(&ComparatorRegistry::new());
    assert_matches!(
        result,
        Err(Error::UnknownField { field, schema }) if field == "name" && schema == "orders"
    );
}

#[test]
fn test_unknown_comparator() {
    let result = builder()
        .order_by(
            SortCriteria::new()
                .add_with_comparator("country", Order::Asc, "collation")
                .asc("id"),
        )
        .build(&ComparatorRegistry::new());
    assert_matches!(result, Err(Error::UnknownComparator(name)) if name == "collation");
}

#[test]
fn test_configuration_errors_are_classified() {
    let error = builder()
        .rollup_from("name")
        .build(&ComparatorRegistry::new())
        .unwrap_err();
    assert!(error.is_configuration_error());
    assert!(!Error::NoDivergence.is_configuration_error());
}

#[test]
fn test_json_round_trip() -> eyre::Result<()> {
    let registry = ComparatorRegistry::new();
    let config = builder()
        .particular_order_by("orders", SortCriteria::new().desc("amount"))
        .rollup_from("country")
        .handler("totals")
        .build(&registry)?;
    let restored = CoGroupConfig::from_json(&config.to_json()?, &registry)?;
    assert_eq!(restored, config);
    assert_eq!(restored.handler(), Some("totals"));
    assert_eq!(restored.min_depth(), 0);
    assert_eq!(
        restored.layout().common_schema().id(),
        config.layout().common_schema().id()
    );
    Ok(())
}

#[test]
fn test_bincode_round_trip() -> eyre::Result<()> {
    let registry = ComparatorRegistry::new();
    let config = builder().partition_by(["country"]).build(&registry)?;
    let restored = CoGroupConfig::from_bytes(&config.to_bytes()?, &registry)?;
    assert_eq!(restored, config);
    assert_eq!(restored.partition_fields(), ["country"]);
    Ok(())
}

#[test]
fn test_decoding_revalidates() -> eyre::Result<()> {
    let config = builder().rollup_from("country").build(&ComparatorRegistry::new())?;
    let mut json: serde_json::Value = serde_json::from_str(&config.to_json()?)?;
    json["sources"][1]["fields"][1]["name"] = "region".into();
    let result = CoGroupConfig::from_json(&json.to_string(), &ComparatorRegistry::new());
    assert_matches!(
        result,
        Err(Error::UnknownField { field, schema }) if field == "country" && schema == "orders"
    );
    Ok(())
}

#[test]
fn test_load_from_file() -> eyre::Result<()> {
    let registry = ComparatorRegistry::new();
    let config = builder().handler("totals").build(&registry)?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("cogroup.json");
    fs::write(&path, config.to_json()?)?;

    let loaded = CoGroupConfig::load(&path, &registry)?;
    assert_eq!(loaded, config);

    let missing = CoGroupConfig::load(&dir.path().join("missing.json"), &registry);
    assert_matches!(missing, Err(Error::Io(_)));
    Ok(())
}

#[test]
fn test_shared_translation_cache() -> eyre::Result<()> {
    let cache = TranslationCache::new();
    let registry = ComparatorRegistry::new();
    builder().build_with_cache(&registry, &cache)?;
    assert_eq!(cache.computations(), 2);
    builder().rollup_from("country").build_with_cache(&registry, &cache)?;
    assert_eq!(cache.computations(), 2);
    assert_eq!(cache.len(), 2);
    Ok(())
}
