//! Integration tests for validation, layered resolution and batch ordering

mod common;

use common::*;
use pattern_engine::batch::order_with_validator;
use pattern_engine::{
    conditional_features, order, resolve, Action, ConfigValue, EngineError, Environment, Layer,
    Metadata, ResolveError, SchemaError, Size, ValidatedRequest, Validator,
};
use proptest::prelude::*;

fn resolve_yaml(
    catalog: &pattern_engine::Catalog,
    yaml: &str,
) -> pattern_engine::ResolvedConfiguration {
    let validated = Validator::new(catalog)
        .validate(&request(yaml))
        .expect("request should validate");
    resolve(&validated, catalog).expect("request should resolve")
}

fn required_config(catalog: &pattern_engine::Catalog, pattern: &str) -> Vec<String> {
    catalog
        .get(pattern)
        .unwrap()
        .required_config_keys()
        .iter()
        .map(|key| match key.as_str() {
            "partitions" => format!("{}: 4", key),
            _ => format!("{}: res-{}", key, key),
        })
        .collect()
}

#[test]
fn test_keyvault_dev_scenario() {
    let catalog = shipped_catalog();
    let resolved = resolve_yaml(&catalog, &request_yaml("keyvault", "dev", "{ name: secrets }"));

    assert_eq!(resolved.get("size"), Some(&ConfigValue::from("small")));
    assert_eq!(resolved.get("enable_diagnostics"), Some(&ConfigValue::Bool(false)));
    assert_eq!(resolved.get("enable_access_review"), Some(&ConfigValue::Bool(false)));
    assert_eq!(resolved.get("name"), Some(&ConfigValue::from("secrets")));
    assert_eq!(resolved.source_of("name"), Some(Layer::Explicit));
}

#[test]
fn test_keyvault_prod_scenario() {
    let catalog = shipped_catalog();
    let resolved = resolve_yaml(&catalog, &request_yaml("keyvault", "prod", "{ name: secrets }"));

    for flag in [
        "enable_access_review",
        "enable_high_availability",
        "enable_geo_redundant_backup",
        "enable_diagnostics",
    ] {
        assert_eq!(resolved.get(flag), Some(&ConfigValue::Bool(true)), "{}", flag);
        assert_eq!(resolved.source_of(flag), Some(Layer::Conditional));
    }
    assert_eq!(resolved.get("size"), Some(&ConfigValue::from("medium")));
    assert_eq!(resolved.source_of("size"), Some(Layer::Sizing));
}

#[test]
fn test_metadata_is_merged_below_everything() {
    let catalog = synthetic_catalog();
    let resolved = resolve_yaml(&catalog, &request_yaml("vault", "staging", "{ name: kv1 }"));

    assert_eq!(resolved.get("project"), Some(&ConfigValue::from("payments")));
    assert_eq!(resolved.get("environment"), Some(&ConfigValue::from("staging")));
    assert_eq!(resolved.get("location"), Some(&ConfigValue::from("eastus")));
    assert_eq!(resolved.get("pattern_name"), Some(&ConfigValue::from("vault")));
    assert_eq!(resolved.source_of("project"), Some(Layer::Metadata));
    assert_eq!(resolved.get("retention_days"), Some(&ConfigValue::Integer(90)));
    assert_eq!(resolved.source_of("retention_days"), Some(Layer::OptionalDefaults));
}

#[test]
fn test_sizing_cell_values_appear_for_every_cell() {
    for catalog in [shipped_catalog(), synthetic_catalog()] {
        for definition in catalog.iter() {
            for size in Size::ALL {
                for environment in Environment::ALL {
                    let mut config = required_config(&catalog, &definition.name);
                    config.push(format!("size: {}", size));
                    let yaml = request_yaml(
                        &definition.name,
                        environment.as_str(),
                        &format!("{{ {} }}", config.join(", ")),
                    );
                    let resolved = resolve_yaml(&catalog, &yaml);

                    let cell = definition.sizing_cell(size, environment).unwrap();
                    for (key, value) in cell {
                        assert_eq!(
                            resolved.get(key),
                            Some(value),
                            "{} {}/{} key {}",
                            definition.name,
                            size,
                            environment,
                            key
                        );
                    }
                    for (flag, value) in conditional_features(environment) {
                        assert_eq!(
                            resolved.get(&flag),
                            Some(&value),
                            "{} {}/{} flag {}",
                            definition.name,
                            size,
                            environment,
                            flag
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn test_required_keys_are_always_present() {
    let catalog = synthetic_catalog();
    for environment in Environment::ALL {
        let yaml = request_yaml("queue", environment.as_str(), "{ name: orders, partitions: 8 }");
        let resolved = resolve_yaml(&catalog, &yaml);
        for key in catalog.get("queue").unwrap().required_config_keys() {
            assert!(resolved.contains_key(key), "missing {}", key);
            assert_eq!(resolved.source_of(key), Some(Layer::Explicit));
        }
    }
}

#[test]
fn test_missing_required_keys_are_all_reported() {
    let catalog = synthetic_catalog();
    let errors = Validator::new(&catalog)
        .validate(&request(&request_yaml("queue", "dev", "{}")))
        .unwrap_err();

    let missing: Vec<&SchemaError> = errors
        .iter()
        .filter(|e| matches!(e, SchemaError::MissingRequired { .. }))
        .collect();
    assert_eq!(missing.len(), 2);
}

#[test]
fn test_unknown_config_key_policy() {
    let catalog = synthetic_catalog();
    let yaml = request_yaml("vault", "dev", "{ name: kv, colour: blue }");

    let lenient = Validator::new(&catalog).validate(&request(&yaml)).unwrap();
    assert_eq!(lenient.warnings.len(), 1);
    assert!(lenient.warnings[0].contains("colour"));

    let strict = Validator::new(&catalog)
        .strict(true)
        .validate(&request(&yaml))
        .unwrap_err();
    assert_eq!(
        strict.first(),
        Some(&SchemaError::UnknownKey {
            key: "colour".to_string()
        })
    );
}

#[test]
fn test_optional_key_type_and_enum_checks() {
    let catalog = synthetic_catalog();

    let errors = Validator::new(&catalog)
        .validate(&request(&request_yaml("vault", "dev", "{ name: kv, retention_days: soon }")))
        .unwrap_err();
    assert!(matches!(errors.first(), Some(SchemaError::TypeMismatch { key, .. }) if key == "retention_days"));

    let errors = Validator::new(&catalog)
        .validate(&request(&request_yaml(
            "queue",
            "dev",
            "{ name: q, partitions: 2, tier: gold }",
        )))
        .unwrap_err();
    assert!(matches!(errors.first(), Some(SchemaError::InvalidValue { key, .. }) if key == "tier"));
}

#[test]
fn test_integral_float_is_coerced_for_integer_key() {
    let catalog = synthetic_catalog();
    let resolved = resolve_yaml(
        &catalog,
        &request_yaml("vault", "dev", "{ name: kv, retention_days: 30.0 }"),
    );
    assert_eq!(resolved.get("retention_days"), Some(&ConfigValue::Integer(30)));
}

#[test]
fn test_unknown_size_is_a_schema_error() {
    let catalog = synthetic_catalog();
    let validated = Validator::new(&catalog)
        .validate(&request(&request_yaml("vault", "prod", "{ name: kv, size: xlarge }")))
        .unwrap();

    match resolve(&validated, &catalog) {
        Err(ResolveError::Schema(errors)) => assert!(matches!(
            errors.first(),
            Some(SchemaError::UnknownSize { size, environment }) if size == "xlarge" && environment == "prod"
        )),
        other => panic!("expected unknown size, got {:?}", other),
    }
}

fn unvalidated(pattern: &str, config: pattern_engine::Settings) -> ValidatedRequest {
    ValidatedRequest {
        version: "1".to_string(),
        action: Action::Create,
        metadata: Metadata {
            project: "payments".to_string(),
            environment: Environment::Dev,
            business_unit: "finance".to_string(),
            owners: vec!["ops@example.com".to_string()],
            location: "eastus".to_string(),
        },
        pattern: pattern.to_string(),
        pattern_version: "1.0.0".to_string(),
        config,
        warnings: Vec::new(),
    }
}

#[test]
fn test_name_from_metadata_does_not_satisfy_required_name() {
    let catalog = synthetic_catalog();
    let request = unvalidated("vault", Default::default());

    match resolve(&request, &catalog) {
        Err(ResolveError::Engine(EngineError::InternalConsistency { pattern, message })) => {
            assert_eq!(pattern, "vault");
            assert!(message.contains("'name'"));
        }
        other => panic!("expected internal inconsistency, got {:?}", other),
    }
}

#[test]
fn test_missing_required_key_at_resolution_is_internal_inconsistency() {
    let catalog = synthetic_catalog();
    let request = unvalidated("queue", Default::default());

    match resolve(&request, &catalog) {
        Err(ResolveError::Engine(EngineError::InternalConsistency { pattern, .. })) => {
            assert_eq!(pattern, "queue")
        }
        other => panic!("expected internal inconsistency, got {:?}", other),
    }
}

#[test]
fn test_batch_runs_destroys_first() {
    let catalog = synthetic_catalog();
    let requests = stream(&[
        request_with_action("create", "vault", "a"),
        request_with_action("destroy", "vault", "b"),
        request_with_action("create", "vault", "c"),
        request_with_action("destroy", "vault", "d"),
    ]);

    let batch = order(&requests, &catalog).unwrap();
    let names: Vec<String> = batch
        .iter()
        .map(|entry| entry.value().unwrap().config.get("name").unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["b", "d", "a", "c"]);
    assert_eq!(batch.execution_order(), vec![1, 3, 0, 2]);
    assert_eq!(batch.entries()[0].action, Action::Destroy);
}

#[test]
fn test_batch_partial_failure() {
    let catalog = synthetic_catalog();
    let requests = stream(&[
        request_with_action("create", "vault", "a"),
        request_with_action("create", "mainframe", "b"),
        request_with_action("create", "vault", "c"),
    ]);

    let batch = order(&requests, &catalog).unwrap();
    assert_eq!(batch.len(), 3);
    assert_eq!(batch.iter().filter(|e| e.is_valid()).count(), 2);
    assert!(!batch.all_valid());

    let failed = &batch.entries()[1];
    assert_eq!(failed.pattern, "mainframe");
    let errors = failed.errors().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors.first(), Some(SchemaError::UnknownPattern { .. })));
}

#[test]
fn test_numeric_config_key_stays_within_its_document() {
    let catalog = synthetic_catalog();
    let requests = stream(&[
        request_yaml("vault", "dev", "{ name: a }"),
        request_yaml("vault", "dev", "{ name: b, 8080: http }"),
    ]);

    let lenient = order(&requests, &catalog).unwrap();
    assert!(lenient.all_valid());
    let resolution = lenient.entries()[1].value().unwrap();
    assert_eq!(resolution.config.get("8080"), Some(&ConfigValue::from("http")));
    assert!(resolution.request.warnings.iter().any(|w| w.contains("'8080'")));

    let strict = order_with_validator(&requests, &Validator::new(&catalog).strict(true)).unwrap();
    assert!(strict.entries()[0].is_valid());
    assert!(matches!(
        strict.entries()[1].errors().and_then(|e| e.first()),
        Some(SchemaError::UnknownKey { key }) if key == "8080"
    ));
}

#[test]
fn test_keyvault_restated_sku_matches_omitted_sku() {
    let catalog = shipped_catalog();
    let omitted = resolve_yaml(&catalog, &request_yaml("keyvault", "prod", "{ name: secrets }"));
    let restated = resolve_yaml(
        &catalog,
        &request_yaml("keyvault", "prod", "{ name: secrets, sku: premium }"),
    );

    assert_eq!(restated.values(), omitted.values());
    assert_eq!(omitted.source_of("sku"), Some(Layer::Sizing));
    assert_eq!(restated.source_of("sku"), Some(Layer::Explicit));
}

#[test]
fn test_invalid_action_orders_as_create_and_fails() {
    let catalog = synthetic_catalog();
    let requests = stream(&[
        request_with_action("delete", "vault", "a"),
        request_with_action("destroy", "vault", "b"),
    ]);

    let batch = order(&requests, &catalog).unwrap();
    assert_eq!(batch.entries()[1].index, 0);
    assert_eq!(batch.entries()[1].action, Action::Create);
    assert!(matches!(
        batch.entries()[1].errors().and_then(|e| e.first()),
        Some(SchemaError::InvalidField { field, .. }) if field == "action"
    ));
}

#[test]
fn test_state_key_uses_name_or_pattern() {
    let catalog = synthetic_catalog();
    let requests = stream(&[request_yaml("vault", "prod", "{ name: secrets }")]);
    let batch = order(&requests, &catalog).unwrap();
    assert_eq!(
        batch.entries()[0].value().unwrap().state_key,
        "finance/prod/payments/vault-secrets/terraform.tfstate"
    );
}

fn environment_strategy() -> impl Strategy<Value = Environment> {
    prop::sample::select(Environment::ALL.to_vec())
}

fn size_strategy() -> impl Strategy<Value = Size> {
    prop::sample::select(Size::ALL.to_vec())
}

proptest! {
    #[test]
    fn prop_explicit_values_win_over_every_layer(
        environment in environment_strategy(),
        size in size_strategy(),
        sku in "sku-[a-z]{1,8}",
        retention in 1i64..3650,
        diagnostics in any::<bool>(),
    ) {
        let catalog = synthetic_catalog();
        let config = format!(
            "{{ name: kv, size: {}, sku: {}, retention_days: {}, enable_diagnostics: {}, project: override }}",
            size, sku, retention, diagnostics
        );
        let resolved = resolve_yaml(&catalog, &request_yaml("vault", environment.as_str(), &config));

        prop_assert_eq!(resolved.get("sku"), Some(&ConfigValue::from(sku.as_str())));
        prop_assert_eq!(resolved.get("retention_days"), Some(&ConfigValue::Integer(retention)));
        prop_assert_eq!(resolved.get("enable_diagnostics"), Some(&ConfigValue::Bool(diagnostics)));
        prop_assert_eq!(resolved.get("project"), Some(&ConfigValue::from("override")));
        prop_assert_eq!(resolved.get("size"), Some(&ConfigValue::from(size.as_str())));
        for key in ["sku", "retention_days", "enable_diagnostics", "project", "size"] {
            prop_assert_eq!(resolved.source_of(key), Some(Layer::Explicit));
        }
    }

    #[test]
    fn prop_restating_sizing_values_changes_nothing(
        environment in environment_strategy(),
        size in size_strategy(),
    ) {
        let catalog = synthetic_catalog();
        let omitted = resolve_yaml(
            &catalog,
            &request_yaml("vault", environment.as_str(), &format!("{{ name: kv, size: {} }}", size)),
        );

        let cell = catalog.get("vault").unwrap().sizing_cell(size, environment).unwrap();
        let restated: Vec<String> = cell
            .iter()
            .map(|(key, value)| format!("{}: {}", key, serde_json::to_string(value).unwrap()))
            .collect();
        let explicit = resolve_yaml(
            &catalog,
            &request_yaml(
                "vault",
                environment.as_str(),
                &format!("{{ name: kv, size: {}, {} }}", size, restated.join(", ")),
            ),
        );

        prop_assert_eq!(explicit.values(), omitted.values());
        for key in cell.keys() {
            prop_assert_eq!(explicit.source_of(key), Some(Layer::Explicit));
        }
    }

    #[test]
    fn prop_default_size_follows_environment(environment in environment_strategy()) {
        let catalog = synthetic_catalog();
        let resolved = resolve_yaml(&catalog, &request_yaml("vault", environment.as_str(), "{ name: kv }"));
        prop_assert_eq!(
            resolved.get("size"),
            Some(&ConfigValue::from(environment.default_size().as_str()))
        );
    }
}
