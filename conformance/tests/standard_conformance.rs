//! End-to-end conformance of the standard tables and of tampered artifacts.
//!
//! Tampering happens on the JSON text, the same way a hand-edited artifact
//! would reach the suite.

use rootseed::serializer::json::{from_json, to_json};
use rootseed::{generate, GenerationConfig};
use rootseed_conformance::{run_all, ConformanceReport, Severity};
use serde_json::{json, Value};

fn standard() -> GenerationConfig {
    GenerationConfig::standard().unwrap()
}

fn standard_json() -> Value {
    to_json(&generate(&standard()).unwrap()).unwrap()
}

fn check(value: &Value) -> ConformanceReport {
    let artifact = from_json(&value.to_string()).unwrap();
    run_all(&standard(), &artifact).unwrap()
}

fn failed_validators(report: &ConformanceReport) -> Vec<String> {
    let mut names: Vec<String> = report.failures().map(|r| r.validator.clone()).collect();
    names.dedup();
    names
}

// =============================================================================
// Standard Configuration
// =============================================================================

#[test]
fn standard_tables_conform() {
    let report = check(&standard_json());
    assert!(report.all_passed(), "{:#?}", report.failures().collect::<Vec<_>>());
    assert_eq!(report.count(Severity::Warning), 0);
}

#[test]
fn standard_report_covers_every_degree() {
    let report = check(&standard_json());
    for n in 2..=10 {
        let prefix = format!("n={n}:");
        let per_degree = report
            .results
            .iter()
            .filter(|r| r.message.starts_with(&prefix))
            .count();
        // structure, continuity, seed_bound, extremes
        assert_eq!(per_degree, 4, "degree {n}");
    }
}

// =============================================================================
// Tampered Artifacts
// =============================================================================

#[test]
fn edited_coefficient_fails_determinism_only() {
    let mut value = standard_json();
    let branch = &mut value["tables"][3]["branches"][7];
    let coefficient: u128 = branch["coefficient"].as_str().unwrap().parse().unwrap();
    branch["coefficient"] = json!((coefficient + 1).to_string());

    let report = check(&value);
    assert_eq!(failed_validators(&report), vec!["derivation/determinism"]);
}

#[test]
fn dropped_branch_fails_structure() {
    let mut value = standard_json();
    value["tables"][0]["branches"].as_array_mut().unwrap().remove(5);

    let report = check(&value);
    let failed = failed_validators(&report);
    assert!(failed.contains(&"tables/structure".to_string()), "{failed:?}");
    assert!(failed.contains(&"derivation/determinism".to_string()), "{failed:?}");
}

#[test]
fn shrunken_intercept_fails_seed_bound() {
    let mut value = standard_json();
    let branch = &mut value["tables"][0]["branches"][12];
    branch["intercept"] = json!("1");

    let report = check(&value);
    let seed_bound = report
        .failures()
        .find(|r| r.validator == "tables/seed_bound")
        .unwrap();
    assert!(seed_bound.message.starts_with("n=2:"));
    assert!(seed_bound.details.iter().any(|d| d.contains("below root")));
}

#[test]
fn missing_table_fails_inventory() {
    let mut value = standard_json();
    value["tables"].as_array_mut().unwrap().pop();

    let report = check(&value);
    let inventory = report
        .failures()
        .find(|r| r.validator == "tables/structure")
        .unwrap();
    assert_eq!(inventory.details, vec!["n=10: missing from artifact".to_string()]);
}

#[test]
fn inflated_first_branch_fails_continuity_and_seed_bound() {
    let mut value = standard_json();
    // A divisor ten times too small on the tangent at 1.
    value["tables"][0]["branches"][0]["coefficient"] = json!("200000000000000000");

    let report = check(&value);
    let failed = failed_validators(&report);
    assert!(failed.contains(&"tables/continuity".to_string()), "{failed:?}");
    assert!(failed.contains(&"tables/seed_bound".to_string()), "{failed:?}");
}

#[test]
fn zero_fixed_one_is_reported_not_fatal() {
    let mut value = standard_json();
    value["tables"][0]["fixed_one"] = json!("0");

    let report = check(&value);
    let extremes = report
        .failures()
        .find(|r| r.validator == "tables/extremes")
        .unwrap();
    assert!(extremes.message.starts_with("n=2:"), "{}", extremes.message);
    let failed = failed_validators(&report);
    assert!(failed.contains(&"tables/structure".to_string()), "{failed:?}");
}
