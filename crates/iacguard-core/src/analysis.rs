//! End-to-end analysis orchestration.
//!
//! Wires the extractor, permission analysis, secret scanner, suggestion
//! generators and scorer into a single response.

use crate::checkov::{self, SecurityAnalysis};
use crate::iam::{self, IamAnalysis};
use crate::score::{self, PrScore};
use crate::secrets::{SecretFinding, SecretScanner};
use crate::suggest::{self, CostAnalysis, Suggestion};
use crate::terraform::{self, TerraformAnalysis, TerraformExtractor};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Default approval threshold for the composite score.
pub const DEFAULT_MIN_PASS_SCORE: i32 = 70;

/// Full set of per-engine results backing a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisDetails {
    pub terraform: TerraformAnalysis,
    pub security: SecurityAnalysis,
    pub iam: IamAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<CostAnalysis>,
}

/// Top-level analysis result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub score: PrScore,
    pub analysis: AnalysisDetails,
    pub suggestions: Vec<Suggestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_findings: Option<Vec<SecretFinding>>,
    pub approved: bool,
    pub score_level: String,
}

/// Runs the analysis pipeline with a configurable approval threshold.
pub struct Analyzer {
    scanner: SecretScanner,
    min_pass_score: i32,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_PASS_SCORE)
    }
}

impl Analyzer {
    pub fn new(min_pass_score: i32) -> Self {
        Self {
            scanner: SecretScanner::new(),
            min_pass_score,
        }
    }

    pub fn scanner_mut(&mut self) -> &mut SecretScanner {
        &mut self.scanner
    }

    /// Analyze a single configuration string. An externally supplied security
    /// analysis (from a scan report) is folded in when given.
    pub fn analyze_content(
        &self,
        content: &str,
        filename: &str,
        security: Option<SecurityAnalysis>,
    ) -> AnalysisResponse {
        let terraform = TerraformExtractor::analyze_content(content, filename);
        let secrets = self.scanner.scan_content(content, filename);
        self.assemble(terraform, security.unwrap_or_default(), secrets)
    }

    /// Analyze a configuration directory. Secret scanning covers the same
    /// `.tf` files the extractor reads; unreadable files are skipped with a
    /// warning since the extractor already recorded them.
    pub fn analyze_directory(
        &self,
        dir: &Path,
        security: Option<SecurityAnalysis>,
    ) -> Result<AnalysisResponse> {
        let terraform = TerraformExtractor::analyze_directory(dir)?;

        let mut files = Vec::new();
        terraform::collect_tf_files(dir, &mut files)
            .with_context(|| format!("Failed to walk directory '{}'", dir.display()))?;
        files.sort();

        let mut secrets = Vec::new();
        for file in &files {
            let path_display = file.display().to_string();
            match std::fs::read_to_string(file) {
                Ok(content) => secrets.extend(self.scanner.scan_content(&content, &path_display)),
                Err(err) => {
                    warn!(file = %path_display, error = %err, "failed to read file for secret scan, skipping")
                }
            }
        }

        Ok(self.assemble(terraform, security.unwrap_or_default(), secrets))
    }

    /// Validation mode: strict ingestion of externally produced results.
    /// The scan report must be well formed; the structural model is sanity
    /// checked but accepted as supplied. No secret scan runs here.
    pub fn validate_results(
        &self,
        checkov_json: Option<&[u8]>,
        terraform: Option<TerraformAnalysis>,
    ) -> Result<AnalysisResponse> {
        let security = match checkov_json {
            Some(bytes) => checkov::validate_report(bytes)?,
            None => SecurityAnalysis::default(),
        };

        let terraform = terraform.unwrap_or_default();
        if terraform.total_resources != terraform.resources.len()
            || terraform.total_variables != terraform.variables.len()
            || terraform.total_outputs != terraform.outputs.len()
        {
            warn!("supplied terraform analysis has inconsistent counts");
        }

        let mut response = self.assemble(terraform, security, Vec::new());
        response.secret_findings = None;
        Ok(response)
    }

    fn assemble(
        &self,
        terraform: TerraformAnalysis,
        security: SecurityAnalysis,
        secrets: Vec<SecretFinding>,
    ) -> AnalysisResponse {
        let iam = iam::analyze(&terraform);
        let cost = suggest::estimate_cost(&terraform);

        let mut suggestions = suggest::from_best_practices(&terraform);
        suggestions.extend(suggest::from_security(&security));
        suggestions.extend(suggest::from_iam(&iam));
        suggestions.extend(suggest::from_secrets(&secrets));
        suggestions.extend(suggest::from_cost(&cost));

        let score = score::score(&terraform, &security);
        let approved = score::should_approve(&score, self.min_pass_score);
        let score_level = score::score_level(score.total).to_string();

        info!(
            total = score.total,
            approved,
            suggestions = suggestions.len(),
            "analysis complete"
        );

        AnalysisResponse {
            score,
            analysis: AnalysisDetails {
                terraform,
                security,
                iam,
                cost: Some(cost),
            },
            suggestions,
            secret_findings: if secrets.is_empty() { None } else { Some(secrets) },
            approved,
            score_level,
        }
    }
}
