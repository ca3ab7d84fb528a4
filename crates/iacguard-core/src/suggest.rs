//! Turns analysis results into actionable suggestions, plus a rough cost
//! estimate with optimization candidates.

use crate::checkov::SecurityAnalysis;
use crate::iam::IamAnalysis;
use crate::secrets::SecretFinding;
use crate::severity::Severity;
use crate::terraform::TerraformAnalysis;
use serde::{Deserialize, Serialize};

/// One actionable suggestion attached to the analysis response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    /// "best_practice", "security", "iam" or "cost".
    pub kind: String,
    pub severity: Severity,
    pub message: String,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub line: usize,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub estimated_savings: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reference_link: String,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl Suggestion {
    fn new(kind: &str, severity: Severity, message: String, recommendation: String) -> Self {
        Self {
            kind: kind.to_string(),
            severity,
            message,
            recommendation,
            file: String::new(),
            line: 0,
            resource: String::new(),
            estimated_savings: String::new(),
            reference_link: String::new(),
        }
    }
}

/// Monthly cost estimate in USD with optimization candidates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostAnalysis {
    pub estimated_monthly_cost: f64,
    pub currency: String,
    pub optimization_potential: f64,
    pub recommendations: Vec<CostRecommendation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostRecommendation {
    pub resource: String,
    pub current_cost: f64,
    pub potential_savings: f64,
    pub recommendation: String,
    /// "easy", "medium" or "hard".
    pub implementation_difficulty: String,
}

/// Rough per-resource monthly prices, used to flag expensive resource
/// classes rather than to bill anything.
const MONTHLY_COSTS: &[(&str, f64)] = &[
    ("aws_instance", 50.0),
    ("aws_rds_instance", 100.0),
    ("aws_s3_bucket", 5.0),
    ("aws_lambda_function", 10.0),
    ("aws_nat_gateway", 45.0),
    ("aws_elb", 25.0),
    ("aws_alb", 25.0),
];

const OVERSIZED_INSTANCE_TYPES: &[&str] = &["t2.large", "t2.xlarge"];

/// Suggestions from structural best-practice warnings.
pub fn from_best_practices(terraform: &TerraformAnalysis) -> Vec<Suggestion> {
    terraform
        .best_practice_warnings
        .iter()
        .map(|warning| {
            Suggestion::new(
                "best_practice",
                Severity::Medium,
                warning.clone(),
                "Follow Terraform best practices to keep the configuration maintainable"
                    .to_string(),
            )
        })
        .collect()
}

/// Suggestions from failed security checks.
pub fn from_security(security: &SecurityAnalysis) -> Vec<Suggestion> {
    security
        .findings
        .iter()
        .map(|finding| {
            let mut suggestion = Suggestion::new(
                "security",
                finding.severity,
                format!("{}: {}", finding.check_id, finding.check_name),
                if finding.guideline.is_empty() {
                    "Review and remediate the failed check".to_string()
                } else {
                    finding.guideline.clone()
                },
            );
            suggestion.file = finding.file.clone();
            suggestion.line = finding.line;
            suggestion.resource = finding.resource.clone();
            suggestion.reference_link =
                format!("https://docs.bridgecrew.io/docs/{}", finding.check_id.to_lowercase());
            suggestion
        })
        .collect()
}

/// Suggestions from the permission analysis.
pub fn from_iam(iam: &IamAnalysis) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    if iam.admin_access_detected {
        suggestions.push(Suggestion::new(
            "iam",
            Severity::Critical,
            "Administrative access (*:*) granted by an IAM policy".to_string(),
            "Replace admin policies with least-privilege permissions".to_string(),
        ));
    }

    for access in &iam.public_access {
        suggestions.push(Suggestion::new(
            "iam",
            Severity::High,
            access.clone(),
            "Restrict access to known principals and networks".to_string(),
        ));
    }

    for risk in &iam.principal_risks {
        suggestions.push(Suggestion::new(
            "iam",
            risk.risk_level,
            format!("Risky principal {}: {}", risk.principal, risk.reason),
            "Review the trust relationship and scope it down".to_string(),
        ));
    }

    suggestions
}

/// Suggestions from secret findings.
pub fn from_secrets(findings: &[SecretFinding]) -> Vec<Suggestion> {
    findings
        .iter()
        .map(|finding| {
            let mut suggestion = Suggestion::new(
                "security",
                finding.severity,
                format!("{}: {}", finding.kind, finding.description),
                finding.suggestion.clone(),
            );
            suggestion.file = finding.file.clone();
            suggestion.line = finding.line;
            suggestion
        })
        .collect()
}

/// Estimate monthly cost and collect optimization candidates.
pub fn estimate_cost(terraform: &TerraformAnalysis) -> CostAnalysis {
    let mut analysis = CostAnalysis {
        currency: "USD".to_string(),
        ..Default::default()
    };

    for resource in &terraform.resources {
        if let Some((_, cost)) = MONTHLY_COSTS
            .iter()
            .find(|(t, _)| *t == resource.resource_type)
        {
            analysis.estimated_monthly_cost += cost;
        }

        if resource.resource_type == "aws_instance" {
            let oversized = resource
                .attributes
                .get("instance_type")
                .and_then(|v| v.as_str())
                .is_some_and(|t| OVERSIZED_INSTANCE_TYPES.contains(&t));
            if oversized {
                analysis.recommendations.push(CostRecommendation {
                    resource: resource.address(),
                    current_cost: 100.0,
                    potential_savings: 30.0,
                    recommendation: "Consider a t3 instance type for better price/performance"
                        .to_string(),
                    implementation_difficulty: "easy".to_string(),
                });
            }
        }

        if resource.resource_type == "aws_nat_gateway" {
            analysis.recommendations.push(CostRecommendation {
                resource: resource.address(),
                current_cost: 45.0,
                potential_savings: 15.0,
                recommendation: "A NAT instance can replace the NAT gateway in low-traffic environments"
                    .to_string(),
                implementation_difficulty: "medium".to_string(),
            });
        }
    }

    analysis.optimization_potential = analysis
        .recommendations
        .iter()
        .map(|r| r.potential_savings)
        .sum();
    analysis
}

/// Cost recommendations rendered as informational suggestions.
pub fn from_cost(cost: &CostAnalysis) -> Vec<Suggestion> {
    cost.recommendations
        .iter()
        .map(|rec| {
            let mut suggestion = Suggestion::new(
                "cost",
                Severity::Info,
                format!("{}: {}", rec.resource, rec.recommendation),
                rec.recommendation.clone(),
            );
            suggestion.resource = rec.resource.clone();
            suggestion.estimated_savings = format!("${:.2}/month", rec.potential_savings);
            suggestion
        })
        .collect()
}
