//! Permission-risk analysis over the extracted resource model.
//!
//! Inspects IAM policy documents embedded as string attributes, role trust
//! policies, and resource attributes that open public access.

use crate::severity::Severity;
use crate::terraform::{AttrValue, ResourceRecord, TerraformAnalysis};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;

static POLICY_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "aws_iam_policy",
        "aws_iam_role_policy",
        "aws_iam_user_policy",
        "aws_iam_group_policy",
        "azurerm_role_definition",
        "google_project_iam_custom_role",
    ]
    .into_iter()
    .collect()
});

static ROLE_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "aws_iam_role",
        "azurerm_role_assignment",
        "google_project_iam_member",
    ]
    .into_iter()
    .collect()
});

static RISKY_SERVICES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["ec2.amazonaws.com", "lambda.amazonaws.com"].into_iter().collect());

/// Attribute names that can open public access, keyed by resource type.
static PUBLIC_ATTRIBUTES: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
    m.insert("aws_s3_bucket", &["acl"]);
    m.insert("aws_s3_bucket_acl", &["acl"]);
    m.insert("aws_security_group", &["ingress"]);
    m.insert("aws_db_instance", &["publicly_accessible"]);
    m.insert("aws_rds_cluster", &["publicly_accessible"]);
    m
});

const PUBLIC_ACL_VALUES: &[&str] = &["public", "public-read", "public-read-write"];
const UNRESTRICTED_CIDR: &str = "0.0.0.0/0";

/// How many wildcard actions are tolerated before recommending a cleanup.
const WILDCARD_ACTION_CUTOFF: usize = 3;

/// A risky principal found in a policy or trust document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalRisk {
    pub principal: String,
    /// "public" or "service".
    pub kind: String,
    pub risk_level: Severity,
    pub reason: String,
}

/// Aggregate result of the IAM analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IamAnalysis {
    pub total_policies: usize,
    pub total_roles: usize,
    pub overly_permissive: bool,
    pub admin_access_detected: bool,
    /// "<resource>: <action>" entries for every wildcard-bearing action.
    pub wildcard_actions: Vec<String>,
    pub public_access: Vec<String>,
    pub principal_risks: Vec<PrincipalRisk>,
    pub recommendations: Vec<String>,
}

/// Analyze every resource in the model for permission risk.
pub fn analyze(terraform: &TerraformAnalysis) -> IamAnalysis {
    let mut analysis = IamAnalysis::default();

    for resource in &terraform.resources {
        if POLICY_TYPES.contains(resource.resource_type.as_str()) {
            analyze_policy_resource(resource, &mut analysis);
        } else if ROLE_TYPES.contains(resource.resource_type.as_str()) {
            analysis.total_roles += 1;
            analyze_role_resource(resource, &mut analysis);
        } else if has_public_access(resource) {
            analysis.public_access.push(format!(
                "Resource {} may allow public access",
                resource.address()
            ));
        }
    }

    generate_recommendations(&mut analysis);
    analysis
}

fn analyze_policy_resource(resource: &ResourceRecord, analysis: &mut IamAnalysis) {
    analysis.total_policies += 1;

    let policy_doc = resource
        .attributes
        .get("policy")
        .or_else(|| resource.attributes.get("policy_document"))
        .and_then(|v| v.as_str());

    let Some(policy_doc) = policy_doc else { return };

    let policy: serde_json::Value = match serde_json::from_str(policy_doc) {
        Ok(policy) => policy,
        Err(err) => {
            warn!(resource = %resource.name, error = %err, "failed to parse IAM policy document, skipping");
            return;
        }
    };

    for statement in statements(&policy) {
        analyze_statement(statement, resource, analysis);
    }
}

/// The Statement field may be a list or a single object.
fn statements(policy: &serde_json::Value) -> Vec<&serde_json::Value> {
    match policy.get("Statement") {
        Some(serde_json::Value::Array(list)) => list.iter().collect(),
        Some(obj @ serde_json::Value::Object(_)) => vec![obj],
        _ => Vec::new(),
    }
}

fn analyze_statement(
    statement: &serde_json::Value,
    resource: &ResourceRecord,
    analysis: &mut IamAnalysis,
) {
    // Only Allow statements grant permissions.
    if statement.get("Effect").and_then(|e| e.as_str()) != Some("Allow") {
        return;
    }

    for action in string_or_list(statement.get("Action")) {
        if action.contains('*') {
            analysis
                .wildcard_actions
                .push(format!("{}: {}", resource.name, action));
            analysis.overly_permissive = true;

            if action == "*" || action == "*:*" {
                analysis.admin_access_detected = true;
            }
        }
    }

    for res in string_or_list(statement.get("Resource")) {
        if res == "*" {
            analysis.overly_permissive = true;
        }
    }

    if let Some(principal) = statement.get("Principal").and_then(|p| p.as_object()) {
        if principal.get("AWS").and_then(|a| a.as_str()) == Some("*") {
            analysis.public_access.push(format!(
                "Policy {} allows public access (Principal: *)",
                resource.name
            ));
            analysis.principal_risks.push(PrincipalRisk {
                principal: "*".to_string(),
                kind: "public".to_string(),
                risk_level: Severity::Critical,
                reason: "Policy allows unrestricted public access".to_string(),
            });
        }
    }
}

fn analyze_role_resource(resource: &ResourceRecord, analysis: &mut IamAnalysis) {
    let Some(assume_policy) = resource
        .attributes
        .get("assume_role_policy")
        .and_then(|v| v.as_str())
    else {
        return;
    };

    let policy: serde_json::Value = match serde_json::from_str(assume_policy) {
        Ok(policy) => policy,
        Err(err) => {
            warn!(resource = %resource.name, error = %err, "failed to parse assume role policy, skipping");
            return;
        }
    };

    for statement in statements(&policy) {
        let Some(service) = statement
            .get("Principal")
            .and_then(|p| p.get("Service"))
            .and_then(|s| s.as_str())
        else {
            continue;
        };

        if RISKY_SERVICES.contains(service) {
            analysis.principal_risks.push(PrincipalRisk {
                principal: service.to_string(),
                kind: "service".to_string(),
                risk_level: Severity::Medium,
                reason: format!("Service {service} can assume this role"),
            });
        }
    }
}

fn string_or_list(value: Option<&serde_json::Value>) -> Vec<&str> {
    match value {
        Some(serde_json::Value::String(s)) => vec![s.as_str()],
        Some(serde_json::Value::Array(list)) => {
            list.iter().filter_map(|v| v.as_str()).collect()
        }
        _ => Vec::new(),
    }
}

fn has_public_access(resource: &ResourceRecord) -> bool {
    let Some(attr_names) = PUBLIC_ATTRIBUTES.get(resource.resource_type.as_str()) else {
        return false;
    };

    attr_names.iter().any(|name| {
        resource
            .attributes
            .get(*name)
            .is_some_and(is_public_value)
    })
}

/// Type-aware "is public" predicate: ACL string membership, boolean
/// pass-through, and a nested scan of ingress rule lists for 0.0.0.0/0.
fn is_public_value(value: &AttrValue) -> bool {
    match value {
        AttrValue::String(s) => PUBLIC_ACL_VALUES.contains(&s.as_str()),
        AttrValue::Bool(b) => *b,
        AttrValue::Unknown(serde_json::Value::Array(rules)) => rules.iter().any(|rule| {
            rule.get("cidr_blocks")
                .and_then(|c| c.as_array())
                .is_some_and(|cidrs| cidrs.iter().any(|c| c.as_str() == Some(UNRESTRICTED_CIDR)))
        }),
        _ => false,
    }
}

/// Recommendations derive from four independent signals, emitted in a fixed
/// order so the output is deterministic.
fn generate_recommendations(analysis: &mut IamAnalysis) {
    if analysis.admin_access_detected {
        analysis.recommendations.push(
            "Avoid administrative permissions (*:*). Apply the principle of least privilege."
                .to_string(),
        );
    }

    if analysis.overly_permissive {
        analysis.recommendations.push(
            "Wildcard (*) policies are overly permissive. Specify actions and resources explicitly."
                .to_string(),
        );
    }

    if !analysis.public_access.is_empty() {
        analysis.recommendations.push(
            "Resources with public access should be reviewed carefully. Consider restricting access."
                .to_string(),
        );
    }

    if analysis.wildcard_actions.len() > WILDCARD_ACTION_CUTOFF {
        analysis.recommendations.push(
            "Many wildcard actions detected. Review permissions and apply least privilege."
                .to_string(),
        );
    }
}
