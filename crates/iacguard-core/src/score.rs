//! Weighted composite scoring of an analyzed change set.

use crate::checkov::SecurityAnalysis;
use crate::terraform::TerraformAnalysis;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const SECURITY_WEIGHT: f64 = 0.35;
const BEST_PRACTICES_WEIGHT: f64 = 0.25;
const PERFORMANCE_WEIGHT: f64 = 0.15;
const MAINTAINABILITY_WEIGHT: f64 = 0.15;
const DOCUMENTATION_WEIGHT: f64 = 0.10;

/// Security dimensions below this are never approved, whatever the total.
const SECURITY_FLOOR: i32 = 50;

/// Composite score across five dimensions, each 0..=100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrScore {
    pub security: i32,
    pub best_practices: i32,
    pub performance: i32,
    pub maintainability: i32,
    pub documentation: i32,
    pub total: i32,
    pub breakdown: BTreeMap<String, i32>,
}

/// Score a change set from its structural and security analyses.
pub fn score(terraform: &TerraformAnalysis, security: &SecurityAnalysis) -> PrScore {
    let security_score = score_security(security);
    let best_practices = score_best_practices(terraform);
    let performance = score_performance(terraform);
    let maintainability = score_maintainability(terraform);
    let documentation = score_documentation(terraform);

    let total = (security_score as f64 * SECURITY_WEIGHT
        + best_practices as f64 * BEST_PRACTICES_WEIGHT
        + performance as f64 * PERFORMANCE_WEIGHT
        + maintainability as f64 * MAINTAINABILITY_WEIGHT
        + documentation as f64 * DOCUMENTATION_WEIGHT)
        .round() as i32;

    let breakdown = BTreeMap::from([
        ("security".to_string(), security_score),
        ("best_practices".to_string(), best_practices),
        ("performance".to_string(), performance),
        ("maintainability".to_string(), maintainability),
        ("documentation".to_string(), documentation),
    ]);

    PrScore {
        security: security_score,
        best_practices,
        performance,
        maintainability,
        documentation,
        total,
        breakdown,
    }
}

fn score_security(security: &SecurityAnalysis) -> i32 {
    if security.total_issues == 0 {
        return 100;
    }

    let penalty = security.critical as i32 * 20
        + security.high as i32 * 10
        + security.medium as i32 * 5
        + security.low as i32 * 2;
    clamp(100 - penalty)
}

fn score_best_practices(terraform: &TerraformAnalysis) -> i32 {
    let mut score = 100;
    score -= terraform.best_practice_warnings.len() as i32 * 3;
    score -= terraform.syntax_errors.len() as i32 * 10;
    if terraform.total_outputs > 0 {
        score += 5;
    }
    if terraform.total_modules > 0 {
        score += 5;
    }
    score -= terraform.undocumented_variable_count() as i32 * 2;
    clamp(score)
}

fn score_performance(terraform: &TerraformAnalysis) -> i32 {
    let mut score = 100;
    if terraform.total_resources > 50 {
        score -= 10;
    }
    if terraform.total_resources > 20 && terraform.total_modules == 0 {
        score -= 15;
    }
    if terraform.total_modules > 0 && terraform.total_resources < 30 {
        score += 10;
    }
    clamp(score)
}

fn score_maintainability(terraform: &TerraformAnalysis) -> i32 {
    let mut score = 100;
    if terraform.total_resources > 15 && terraform.total_modules == 0 {
        score -= 20;
    }
    if terraform.total_resources > 5 && terraform.total_variables < 3 {
        score -= 15;
    }
    if terraform.total_modules > 2 {
        score += 10;
    }
    clamp(score)
}

/// Variables and outputs each contribute up to 50 points, in proportion to
/// how many carry a description. An empty category scores its full half.
fn score_documentation(terraform: &TerraformAnalysis) -> i32 {
    let variables = if terraform.variables.is_empty() {
        50
    } else {
        let documented = terraform.variables.iter().filter(|v| v.is_documented()).count();
        (documented as f64 / terraform.variables.len() as f64 * 50.0) as i32
    };

    let outputs = if terraform.outputs.is_empty() {
        50
    } else {
        let documented = terraform.outputs.iter().filter(|o| o.is_documented()).count();
        (documented as f64 / terraform.outputs.len() as f64 * 50.0) as i32
    };

    clamp(variables + outputs)
}

fn clamp(score: i32) -> i32 {
    score.clamp(0, 100)
}

/// Approval requires both the total and the security floor.
pub fn should_approve(score: &PrScore, min_total: i32) -> bool {
    score.total >= min_total && score.security >= SECURITY_FLOOR
}

pub fn score_level(total: i32) -> &'static str {
    match total {
        90..=i32::MAX => "Excellent",
        75..=89 => "Good",
        60..=74 => "Regular",
        40..=59 => "Poor",
        _ => "Critical",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terraform::{OutputRecord, VariableRecord};

    fn variable(name: &str, description: &str) -> VariableRecord {
        VariableRecord {
            name: name.to_string(),
            description: description.to_string(),
            sensitive: false,
            file: "variables.tf".to_string(),
        }
    }

    fn output(name: &str, description: &str) -> OutputRecord {
        OutputRecord {
            name: name.to_string(),
            description: description.to_string(),
            sensitive: false,
            file: "outputs.tf".to_string(),
        }
    }

    #[test]
    fn test_clean_analysis_scores_high() {
        let terraform = TerraformAnalysis::default();
        let security = SecurityAnalysis::default();
        let result = score(&terraform, &security);

        assert_eq!(result.security, 100);
        assert_eq!(result.best_practices, 100);
        assert_eq!(result.documentation, 100);
        assert_eq!(result.total, 100);
    }

    #[test]
    fn test_security_penalty_clamps_at_zero() {
        let security = SecurityAnalysis {
            critical: 10,
            total_issues: 10,
            ..Default::default()
        };
        let result = score(&TerraformAnalysis::default(), &security);
        assert_eq!(result.security, 0);
    }

    #[test]
    fn test_approval_requires_security_floor() {
        let mut result = score(&TerraformAnalysis::default(), &SecurityAnalysis::default());
        result.security = 40;
        result.total = 95;
        assert!(!should_approve(&result, 70));

        result.security = 50;
        assert!(should_approve(&result, 70));
        assert!(!should_approve(&result, 96));
    }

    #[test]
    fn test_documentation_proportional() {
        let mut terraform = TerraformAnalysis::default();
        terraform.variables = vec![
            variable("a", "documented"),
            variable("b", ""),
        ];
        terraform.outputs = vec![output("o", "documented")];
        terraform.recount();

        let result = score(&terraform, &SecurityAnalysis::default());
        // Half the variables documented (25) plus all outputs (50).
        assert_eq!(result.documentation, 75);
    }

    #[test]
    fn test_best_practices_penalties() {
        let mut terraform = TerraformAnalysis::default();
        terraform.best_practice_warnings = vec!["w".to_string(); 4];
        terraform.variables = vec![variable("a", "")];
        terraform.recount();

        let result = score(&terraform, &SecurityAnalysis::default());
        // 100 - 4*3 - 1*2 = 86
        assert_eq!(result.best_practices, 86);
    }

    #[test]
    fn test_score_levels() {
        assert_eq!(score_level(95), "Excellent");
        assert_eq!(score_level(90), "Excellent");
        assert_eq!(score_level(80), "Good");
        assert_eq!(score_level(60), "Regular");
        assert_eq!(score_level(45), "Poor");
        assert_eq!(score_level(10), "Critical");
    }

    #[test]
    fn test_weighted_total() {
        let security = SecurityAnalysis {
            high: 3,
            total_issues: 3,
            ..Default::default()
        };
        let result = score(&TerraformAnalysis::default(), &security);

        // security 70, everything else 100.
        assert_eq!(result.security, 70);
        let expected = (70.0 * 0.35 + 100.0 * 0.65_f64).round() as i32;
        assert_eq!(result.total, expected);
    }
}
