use iacguard_core::analysis::Analyzer;
use iacguard_core::checkov;
use iacguard_core::plan;
use iacguard_core::severity::{RiskLevel, Severity};
use iacguard_core::terraform::TerraformExtractor;
use std::path::{Path, PathBuf};

/// Get the workspace root (two levels up from CARGO_MANIFEST_DIR of iacguard-core).
fn fixtures_dir() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir)
        .parent()
        .unwrap() // crates/
        .parent()
        .unwrap() // workspace root
        .join("tests/fixtures")
}

fn terraform_fixture(name: &str) -> PathBuf {
    fixtures_dir().join("terraform").join(name)
}

fn plan_fixture(name: &str) -> PathBuf {
    fixtures_dir().join("plans").join(name)
}

fn checkov_fixture(name: &str) -> PathBuf {
    fixtures_dir().join("checkov").join(name)
}

// ─── Extraction integration tests ───

#[test]
fn test_extract_web_app() {
    let analysis = TerraformExtractor::analyze_directory(&terraform_fixture("web-app")).unwrap();

    assert!(analysis.valid);
    assert_eq!(analysis.total_resources, 4);
    assert_eq!(analysis.total_variables, 2);
    assert_eq!(analysis.total_outputs, 1);
    assert_eq!(analysis.providers, vec!["aws".to_string()]);

    // aws_instance.web carries no tags; db_username has no description.
    assert_eq!(analysis.best_practice_warnings.len(), 2);
    assert!(analysis
        .best_practice_warnings
        .iter()
        .any(|w| w.contains("aws_instance.web")));
    assert!(analysis
        .best_practice_warnings
        .iter()
        .any(|w| w.contains("db_username")));
}

#[test]
fn test_extract_clean_module_config() {
    let analysis = TerraformExtractor::analyze_directory(&terraform_fixture("clean")).unwrap();

    assert!(analysis.valid);
    assert_eq!(analysis.total_resources, 0);
    assert_eq!(analysis.total_modules, 1);
    assert_eq!(analysis.modules[0].source, "./modules/network");
    assert!(analysis.best_practice_warnings.is_empty());
}

// ─── Full pipeline integration tests ───

#[test]
fn test_web_app_full_analysis() {
    let analyzer = Analyzer::default();
    let response = analyzer
        .analyze_directory(&terraform_fixture("web-app"), None)
        .unwrap();

    // Embedded policy grants s3:* on every resource.
    assert!(response.analysis.iam.overly_permissive);
    assert!(!response.analysis.iam.admin_access_detected);
    assert_eq!(response.analysis.iam.wildcard_actions, vec!["deploy: s3:*".to_string()]);

    // Public bucket ACL.
    assert_eq!(response.analysis.iam.public_access.len(), 1);

    // Hardcoded database password.
    let secrets = response.secret_findings.as_ref().expect("secret expected");
    assert_eq!(secrets.len(), 1);
    assert_eq!(secrets[0].kind, "Generic Password");
    assert_eq!(secrets[0].description, "Password in plaintext");
    assert!(!secrets[0].masked_value.contains("SuperSecret123!"));

    // Oversized instance type produces a cost suggestion.
    let cost = response.analysis.cost.as_ref().unwrap();
    assert_eq!(cost.estimated_monthly_cost, 55.0);
    assert!(response
        .suggestions
        .iter()
        .any(|s| s.kind == "cost" && s.estimated_savings == "$30.00/month"));

    // No external scan report, so security stays clean and the set passes.
    assert_eq!(response.score.security, 100);
    assert!(response.approved);
}

#[test]
fn test_web_app_with_scan_report() {
    let bytes = std::fs::read(checkov_fixture("report.json")).unwrap();
    let security = checkov::validate_report(&bytes).unwrap();

    let analyzer = Analyzer::default();
    let response = analyzer
        .analyze_directory(&terraform_fixture("web-app"), Some(security))
        .unwrap();

    // One high (encryption), one medium (logging), one low (tag).
    assert_eq!(response.score.security, 83);
    assert!(response.suggestions.iter().any(|s| {
        s.kind == "security" && s.reference_link == "https://docs.bridgecrew.io/docs/ckv_aws_19"
    }));
    assert!(response.approved);
}

#[test]
fn test_clean_config_scores_perfect() {
    let analyzer = Analyzer::default();
    let response = analyzer
        .analyze_directory(&terraform_fixture("clean"), None)
        .unwrap();

    assert_eq!(response.score.total, 100);
    assert_eq!(response.score_level, "Excellent");
    assert!(response.approved);
    assert!(response.secret_findings.is_none());
}

// ─── Plan assessment integration tests ───

#[test]
fn test_plan_database_destroy() {
    let bytes = std::fs::read(plan_fixture("destroy-database.json")).unwrap();
    let preview = plan::analyze(&bytes).unwrap();

    assert_eq!(preview.resources_affected, 2);
    assert_eq!(preview.destroy_count, 1);
    assert_eq!(preview.update_count, 1);
    assert_eq!(preview.risk_level, RiskLevel::High);

    let destroy_warnings: Vec<_> = preview
        .risk_warnings
        .iter()
        .filter(|w| w.severity == Severity::Critical && w.message.contains("destroyed"))
        .collect();
    assert_eq!(destroy_warnings.len(), 1);

    let update = preview
        .planned_changes
        .iter()
        .find(|c| c.address == "aws_instance.web")
        .unwrap();
    assert_eq!(update.changed_fields, vec!["instance_type".to_string()]);
}

#[test]
fn test_plan_single_create_is_low_risk() {
    let bytes = std::fs::read(plan_fixture("create-bucket.json")).unwrap();
    let preview = plan::analyze(&bytes).unwrap();

    assert_eq!(preview.create_count, 1);
    assert_eq!(preview.risk_level, RiskLevel::Low);
    assert!(preview.risk_warnings.is_empty());
}

// ─── Scan report validation integration tests ───

#[test]
fn test_validate_checkov_report() {
    let bytes = std::fs::read(checkov_fixture("report.json")).unwrap();
    let analysis = checkov::validate_report(&bytes).unwrap();

    assert_eq!(analysis.checks_passed, 12);
    assert_eq!(analysis.checks_failed, 3);
    assert_eq!(analysis.total_issues, 3);
    assert_eq!(analysis.high, 1);
    assert_eq!(analysis.medium, 1);
    assert_eq!(analysis.low, 1);
}

#[test]
fn test_validation_mode_end_to_end() {
    let bytes = std::fs::read(checkov_fixture("report.json")).unwrap();
    let terraform =
        TerraformExtractor::analyze_directory(&terraform_fixture("web-app")).unwrap();

    let analyzer = Analyzer::default();
    let response = analyzer
        .validate_results(Some(&bytes), Some(terraform))
        .unwrap();

    // Validation mode never scans for secrets but still re-derives IAM risk.
    assert!(response.secret_findings.is_none());
    assert!(response.analysis.iam.overly_permissive);
    assert_eq!(response.score.security, 83);
}
