pub mod analysis;
pub mod checkov;
pub mod iam;
pub mod plan;
pub mod score;
pub mod secrets;
pub mod severity;
pub mod suggest;
pub mod terraform;

pub use analysis::{AnalysisDetails, AnalysisResponse, Analyzer, DEFAULT_MIN_PASS_SCORE};
pub use checkov::{SecurityAnalysis, SecurityFinding};
pub use iam::IamAnalysis;
pub use plan::{PreviewAnalysis, RiskWarning};
pub use score::PrScore;
pub use secrets::{SecretFinding, SecretScanner};
pub use severity::{RiskLevel, Severity};
pub use suggest::{CostAnalysis, Suggestion};
pub use terraform::{TerraformAnalysis, TerraformExtractor};
