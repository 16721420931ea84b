//! Integration tests for catalog loading and consistency checks

mod common;

use common::*;
use pattern_engine::{Catalog, Category, EngineError, Environment, Size};
use std::fs;
use tempfile::TempDir;

const MINIMAL_SIZING: &str = r#"sizing:
  small: { dev: { sku: a }, staging: { sku: a }, prod: { sku: a } }
  medium: { dev: { sku: b }, staging: { sku: b }, prod: { sku: b } }
  large: { dev: { sku: c }, staging: { sku: c }, prod: { sku: c } }
"#;

fn write_pattern(dir: &TempDir, file: &str, body: &str) {
    fs::write(dir.path().join(file), body).expect("Failed to write pattern file");
}

#[test]
fn test_shipped_catalog_is_consistent() {
    let catalog = shipped_catalog();

    assert!(catalog.contains("keyvault"));
    assert!(catalog.contains("postgresql"));
    assert!(catalog.contains("storage"));
    for definition in catalog.iter() {
        definition.check_consistency().unwrap();
        for size in Size::ALL {
            for environment in Environment::ALL {
                assert!(definition.sizing_cell(size, environment).is_some());
            }
        }
    }
}

#[test]
fn test_shipped_composite_lists_components() {
    let catalog = shipped_catalog();
    let web_app = catalog.get("web-app").unwrap();

    assert_eq!(web_app.category, Category::Composite);
    assert!(web_app.component_patterns().contains(&"keyvault".to_string()));
}

#[test]
fn test_shipped_keyvault_costs() {
    let catalog = shipped_catalog();
    let keyvault = catalog.get("keyvault").unwrap();
    assert_eq!(keyvault.estimated_cost(Size::Small, Environment::Prod), Some(25.0));
}

#[test]
fn test_load_dir_reads_yaml_and_yml_sorted() {
    let dir = TempDir::new().unwrap();
    write_pattern(&dir, "b.yaml", &format!("name: beta\n{}", MINIMAL_SIZING));
    write_pattern(&dir, "a.yml", &format!("name: alpha\n{}", MINIMAL_SIZING));
    write_pattern(&dir, "notes.txt", "not a pattern");

    let catalog = Catalog::load_dir(dir.path()).unwrap();
    assert_eq!(catalog.names(), vec!["alpha".to_string(), "beta".to_string()]);
    assert_eq!(catalog.len(), 2);
}

#[test]
fn test_load_dir_empty_is_catalog_error() {
    let dir = TempDir::new().unwrap();
    let err = Catalog::load_dir(dir.path()).unwrap_err();
    assert!(matches!(err, EngineError::CatalogLoad { .. }));
    assert!(err.is_catalog_error());
}

#[test]
fn test_load_dir_reports_unparseable_file() {
    let dir = TempDir::new().unwrap();
    write_pattern(&dir, "broken.yaml", "name: [unclosed\n");

    match Catalog::load_dir(dir.path()) {
        Err(EngineError::CatalogLoad { path, .. }) => assert!(path.ends_with("broken.yaml")),
        other => panic!("expected catalog load error, got {:?}", other),
    }
}

#[test]
fn test_load_dir_rejects_incomplete_sizing() {
    let dir = TempDir::new().unwrap();
    write_pattern(
        &dir,
        "partial.yaml",
        "name: partial\nsizing:\n  small: { dev: { sku: a } }\n",
    );

    let err = Catalog::load_dir(dir.path()).unwrap_err();
    assert!(matches!(err, EngineError::InternalConsistency { .. }));
}

#[test]
fn test_sizing_cell_may_not_set_required_key() {
    let yaml = format!(
        "name: leaky\nconfig:\n  required: [sku]\n{}",
        MINIMAL_SIZING
    );
    let err = Catalog::from_yaml_str(&yaml).unwrap_err();
    assert!(err.to_string().contains("required key 'sku'"));
}

#[test]
fn test_duplicate_names_across_files_rejected() {
    let dir = TempDir::new().unwrap();
    write_pattern(&dir, "one.yaml", &format!("name: twin\n{}", MINIMAL_SIZING));
    write_pattern(&dir, "two.yaml", &format!("name: twin\n{}", MINIMAL_SIZING));

    let err = Catalog::load_dir(dir.path()).unwrap_err();
    assert!(err.to_string().contains("more than once"));
}
