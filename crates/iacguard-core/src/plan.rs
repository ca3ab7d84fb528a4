//! Blast-radius analysis of a Terraform plan JSON export.
//!
//! Scores every planned change by action weight plus resource-class bonuses,
//! then folds the scores into an overall risk level and a warning list.

use crate::severity::{RiskLevel, Severity};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("failed to parse plan JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Wire format: the subset of `terraform show -json` output we consume.
#[derive(Debug, Deserialize)]
struct TerraformPlan {
    #[serde(default)]
    resource_changes: Vec<ResourceChange>,
}

#[derive(Debug, Deserialize)]
struct ResourceChange {
    address: String,
    #[serde(rename = "type")]
    resource_type: String,
    change: Change,
}

#[derive(Debug, Deserialize)]
struct Change {
    #[serde(default)]
    actions: Vec<String>,
    #[serde(default)]
    before: Option<serde_json::Value>,
    #[serde(default)]
    after: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Create,
    Update,
    Destroy,
    Replace,
}

/// Per-change impact classification, independent of the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
    Critical,
    Unknown,
}

/// One scored change from the plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedChange {
    pub address: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub action: Option<ChangeAction>,
    pub impact: Impact,
    pub risk_score: i32,
    #[serde(default)]
    pub changed_fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskWarning {
    pub severity: Severity,
    pub resource: String,
    pub message: String,
    pub action: String,
}

/// Full result of analyzing a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewAnalysis {
    pub planned_changes: Vec<PlannedChange>,
    pub resources_affected: usize,
    pub create_count: usize,
    pub update_count: usize,
    pub destroy_count: usize,
    pub replace_count: usize,
    pub risk_level: RiskLevel,
    pub risk_warnings: Vec<RiskWarning>,
}

const DESTROY_WEIGHT: i32 = 50;
const REPLACE_WEIGHT: i32 = 30;
const UPDATE_WEIGHT: i32 = 10;
const CREATE_WEIGHT: i32 = 5;

const CRITICAL_BONUS: i32 = 20;
const STATEFUL_BONUS: i32 = 15;
const NETWORK_BONUS: i32 = 10;

static CRITICAL_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "aws_rds_instance",
        "aws_db_instance",
        "aws_dynamodb_table",
        "google_sql_database_instance",
        "azurerm_sql_database",
    ]
    .into_iter()
    .collect()
});

static STATEFUL_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "aws_s3_bucket",
        "aws_ebs_volume",
        "aws_efs_file_system",
        "google_storage_bucket",
        "azurerm_storage_account",
    ]
    .into_iter()
    .collect()
});

static NETWORK_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "aws_vpc",
        "aws_subnet",
        "aws_security_group",
        "aws_route_table",
        "aws_nat_gateway",
        "aws_internet_gateway",
        "google_compute_network",
        "azurerm_virtual_network",
    ]
    .into_iter()
    .collect()
});

/// Fields compared in the shallow before/after diff.
const DIFF_FIELDS: &[&str] = &["name", "instance_type", "size", "count", "tags"];

/// Parse and analyze a plan JSON document. Malformed input is a hard error;
/// no partial result is produced.
pub fn analyze(plan_json: &[u8]) -> Result<PreviewAnalysis, PlanError> {
    let plan: TerraformPlan = serde_json::from_slice(plan_json)?;
    debug!(changes = plan.resource_changes.len(), "analyzing plan");

    let mut changes = Vec::with_capacity(plan.resource_changes.len());
    let mut warnings = Vec::new();
    let (mut creates, mut updates, mut destroys, mut replaces) = (0, 0, 0, 0);

    for rc in &plan.resource_changes {
        let action = normalize_actions(&rc.change.actions);
        match action {
            Some(ChangeAction::Create) => creates += 1,
            Some(ChangeAction::Update) => updates += 1,
            Some(ChangeAction::Destroy) => destroys += 1,
            Some(ChangeAction::Replace) => replaces += 1,
            None => {}
        }

        let score = change_score(rc, action);
        let impact = classify_impact(&rc.resource_type, action);
        collect_warnings(rc, action, score, &mut warnings);

        changes.push(PlannedChange {
            address: rc.address.clone(),
            resource_type: rc.resource_type.clone(),
            action,
            impact,
            risk_score: score,
            changed_fields: changed_fields(&rc.change),
        });
    }

    let risk_level = aggregate_risk(&changes, destroys);
    let resources_affected = changes.len();

    Ok(PreviewAnalysis {
        planned_changes: changes,
        resources_affected,
        create_count: creates,
        update_count: updates,
        destroy_count: destroys,
        replace_count: replaces,
        risk_level,
        risk_warnings: warnings,
    })
}

/// Terraform reports a replacement as a ["create", "delete"] (or reversed)
/// pair. Unrecognized action strings are ignored.
fn normalize_actions(actions: &[String]) -> Option<ChangeAction> {
    let mut create = false;
    let mut destroy = false;
    let mut update = false;

    for action in actions {
        match action.as_str() {
            "create" => create = true,
            "delete" | "destroy" => destroy = true,
            "update" => update = true,
            _ => {}
        }
    }

    if create && destroy {
        Some(ChangeAction::Replace)
    } else if destroy {
        Some(ChangeAction::Destroy)
    } else if update {
        Some(ChangeAction::Update)
    } else if create {
        Some(ChangeAction::Create)
    } else {
        None
    }
}

fn change_score(rc: &ResourceChange, action: Option<ChangeAction>) -> i32 {
    let base = match action {
        Some(ChangeAction::Destroy) => DESTROY_WEIGHT,
        Some(ChangeAction::Replace) => REPLACE_WEIGHT,
        Some(ChangeAction::Update) => UPDATE_WEIGHT,
        Some(ChangeAction::Create) => CREATE_WEIGHT,
        None => 0,
    };

    let mut score = base;
    if matches_class(rc, &CRITICAL_TYPES) {
        score += CRITICAL_BONUS;
    }
    if matches_class(rc, &STATEFUL_TYPES) {
        score += STATEFUL_BONUS;
    }
    if matches_class(rc, &NETWORK_TYPES) {
        score += NETWORK_BONUS;
    }
    score
}

/// Substring membership over both the address and the type, so module
/// prefixed addresses still classify.
fn matches_class(rc: &ResourceChange, class: &HashSet<&'static str>) -> bool {
    class
        .iter()
        .any(|t| rc.resource_type.contains(t) || rc.address.contains(t))
}

fn classify_impact(resource_type: &str, action: Option<ChangeAction>) -> Impact {
    let critical = CRITICAL_TYPES.iter().any(|t| resource_type.contains(t));
    let stateful = STATEFUL_TYPES.iter().any(|t| resource_type.contains(t));
    let network = NETWORK_TYPES.iter().any(|t| resource_type.contains(t));

    match action {
        Some(ChangeAction::Destroy) => {
            if critical {
                Impact::Critical
            } else {
                Impact::High
            }
        }
        Some(ChangeAction::Replace) => {
            if stateful || critical {
                Impact::High
            } else {
                Impact::Medium
            }
        }
        Some(ChangeAction::Update) => {
            if network {
                Impact::Medium
            } else {
                Impact::Low
            }
        }
        Some(ChangeAction::Create) => Impact::Low,
        None => Impact::Unknown,
    }
}

/// Shallow allow-listed diff of the before/after objects.
fn changed_fields(change: &Change) -> Vec<String> {
    let (Some(before), Some(after)) = (&change.before, &change.after) else {
        return Vec::new();
    };
    let (Some(before), Some(after)) = (before.as_object(), after.as_object()) else {
        return Vec::new();
    };

    DIFF_FIELDS
        .iter()
        .filter(|field| before.get(**field) != after.get(**field))
        .map(|field| field.to_string())
        .collect()
}

/// Warning rules co-fire: one change can produce several warnings.
fn collect_warnings(
    rc: &ResourceChange,
    action: Option<ChangeAction>,
    score: i32,
    warnings: &mut Vec<RiskWarning>,
) {
    if matches_class(rc, &CRITICAL_TYPES) && action == Some(ChangeAction::Destroy) {
        warnings.push(RiskWarning {
            severity: Severity::Critical,
            resource: rc.address.clone(),
            message: format!("Database {} will be destroyed", rc.address),
            action: "Confirm backups exist before applying".to_string(),
        });
    }

    if matches_class(rc, &STATEFUL_TYPES) && action == Some(ChangeAction::Replace) {
        warnings.push(RiskWarning {
            severity: Severity::High,
            resource: rc.address.clone(),
            message: format!("Stateful resource {} will be replaced", rc.address),
            action: "Expect downtime and possible data migration".to_string(),
        });
    }

    if matches_class(rc, &NETWORK_TYPES) && score > 20 {
        warnings.push(RiskWarning {
            severity: Severity::High,
            resource: rc.address.clone(),
            message: format!("Network change to {} may affect connectivity", rc.address),
            action: "Verify routing and security rules after applying".to_string(),
        });
    }

    if score > 50 {
        warnings.push(RiskWarning {
            severity: Severity::Critical,
            resource: rc.address.clone(),
            message: format!("Change to {} has a high blast radius", rc.address),
            action: "Apply in a maintenance window and review the plan closely".to_string(),
        });
    }
}

fn aggregate_risk(changes: &[PlannedChange], destroy_count: usize) -> RiskLevel {
    let total: i32 = changes.iter().map(|c| c.risk_score).sum();
    let high_scoring = changes.iter().filter(|c| c.risk_score > 50).count();

    if high_scoring > 3 {
        RiskLevel::Critical
    } else if destroy_count > 0 || total > 200 {
        RiskLevel::High
    } else if total > 100 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_with(changes: &str) -> Vec<u8> {
        format!(r#"{{"resource_changes": {changes}}}"#).into_bytes()
    }

    #[test]
    fn test_database_destroy_is_high_risk() {
        let json = plan_with(
            r#"[{"address": "aws_db_instance.prod", "type": "aws_db_instance",
                 "change": {"actions": ["delete"]}}]"#,
        );
        let analysis = analyze(&json).unwrap();

        assert_eq!(analysis.destroy_count, 1);
        assert_eq!(analysis.risk_level, RiskLevel::High);
        assert_eq!(analysis.planned_changes[0].impact, Impact::Critical);
        assert_eq!(analysis.planned_changes[0].risk_score, 70);

        let destroy_warnings: Vec<_> = analysis
            .risk_warnings
            .iter()
            .filter(|w| w.severity == Severity::Critical && w.message.contains("destroyed"))
            .collect();
        assert_eq!(destroy_warnings.len(), 1);
    }

    #[test]
    fn test_single_bucket_create_is_low_risk() {
        let json = plan_with(
            r#"[{"address": "aws_s3_bucket.logs", "type": "aws_s3_bucket",
                 "change": {"actions": ["create"]}}]"#,
        );
        let analysis = analyze(&json).unwrap();

        assert_eq!(analysis.create_count, 1);
        assert_eq!(analysis.risk_level, RiskLevel::Low);
        assert!(analysis.risk_warnings.is_empty());
        assert_eq!(analysis.planned_changes[0].risk_score, 20);
        assert_eq!(analysis.planned_changes[0].impact, Impact::Low);
    }

    #[test]
    fn test_many_plain_creates_is_medium_risk() {
        let mut changes = Vec::new();
        for i in 0..21 {
            changes.push(format!(
                r#"{{"address": "null_resource.n{i}", "type": "null_resource",
                     "change": {{"actions": ["create"]}}}}"#
            ));
        }
        let json = plan_with(&format!("[{}]", changes.join(",")));
        let analysis = analyze(&json).unwrap();

        // 21 creates at 5 points each.
        assert_eq!(analysis.create_count, 21);
        assert_eq!(analysis.risk_level, RiskLevel::Medium);
        assert!(analysis.risk_warnings.is_empty());
    }

    #[test]
    fn test_replace_pair_normalization() {
        let json = plan_with(
            r#"[{"address": "aws_instance.web", "type": "aws_instance",
                 "change": {"actions": ["create", "delete"]}}]"#,
        );
        let analysis = analyze(&json).unwrap();

        assert_eq!(analysis.replace_count, 1);
        assert_eq!(analysis.destroy_count, 0);
        assert_eq!(analysis.planned_changes[0].action, Some(ChangeAction::Replace));
        assert_eq!(analysis.planned_changes[0].impact, Impact::Medium);
    }

    #[test]
    fn test_stateful_replace_warns_about_downtime() {
        let json = plan_with(
            r#"[{"address": "aws_ebs_volume.data", "type": "aws_ebs_volume",
                 "change": {"actions": ["delete", "create"]}}]"#,
        );
        let analysis = analyze(&json).unwrap();

        assert_eq!(analysis.planned_changes[0].impact, Impact::High);
        assert!(analysis
            .risk_warnings
            .iter()
            .any(|w| w.severity == Severity::High && w.message.contains("replaced")));
    }

    #[test]
    fn test_network_update_warning_threshold() {
        // Update score 10 + network bonus 10 = 20, not above the threshold.
        let json = plan_with(
            r#"[{"address": "aws_security_group.app", "type": "aws_security_group",
                 "change": {"actions": ["update"]}}]"#,
        );
        let analysis = analyze(&json).unwrap();
        assert!(analysis.risk_warnings.is_empty());

        // Destroy score 50 + 10 crosses both the network and blast-radius bars.
        let json = plan_with(
            r#"[{"address": "aws_security_group.app", "type": "aws_security_group",
                 "change": {"actions": ["delete"]}}]"#,
        );
        let analysis = analyze(&json).unwrap();
        assert_eq!(analysis.risk_warnings.len(), 2);
    }

    #[test]
    fn test_changed_fields_diff() {
        let json = plan_with(
            r#"[{"address": "aws_instance.web", "type": "aws_instance",
                 "change": {"actions": ["update"],
                            "before": {"instance_type": "t2.micro", "name": "web"},
                            "after": {"instance_type": "t3.micro", "name": "web"}}}]"#,
        );
        let analysis = analyze(&json).unwrap();

        assert_eq!(
            analysis.planned_changes[0].changed_fields,
            vec!["instance_type".to_string()]
        );
    }

    #[test]
    fn test_unknown_actions_are_ignored() {
        let json = plan_with(
            r#"[{"address": "aws_instance.web", "type": "aws_instance",
                 "change": {"actions": ["no-op"]}}]"#,
        );
        let analysis = analyze(&json).unwrap();

        assert_eq!(analysis.planned_changes[0].action, None);
        assert_eq!(analysis.planned_changes[0].impact, Impact::Unknown);
        assert_eq!(analysis.planned_changes[0].risk_score, 0);
    }

    #[test]
    fn test_malformed_plan_is_rejected() {
        assert!(analyze(b"{not json").is_err());
        assert!(analyze(br#"{"resource_changes": "nope"}"#).is_err());
    }

    #[test]
    fn test_more_than_three_high_scores_is_critical() {
        let mut changes = Vec::new();
        for i in 0..4 {
            changes.push(format!(
                r#"{{"address": "aws_db_instance.db{i}", "type": "aws_db_instance",
                     "change": {{"actions": ["delete"]}}}}"#
            ));
        }
        let json = plan_with(&format!("[{}]", changes.join(",")));
        let analysis = analyze(&json).unwrap();

        assert_eq!(analysis.risk_level, RiskLevel::Critical);
    }
}
