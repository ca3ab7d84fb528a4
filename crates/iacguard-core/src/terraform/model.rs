use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scalar attribute value captured from a resource body.
///
/// The extractor only ever emits `String`, `Bool` and `Number`; complex
/// expressions are dropped at parse time. `Unknown` holds the raw JSON of a
/// non-scalar value so that analysis models supplied by external callers
/// (validation mode) keep enough shape for checks like the ingress CIDR scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Number(f64),
    String(String),
    Unknown(serde_json::Value),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&serde_json::Value> {
        match self {
            AttrValue::Unknown(v) => Some(v),
            _ => None,
        }
    }
}

/// A single resource block extracted from a configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRecord {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    /// Derived from the type: everything before the first underscore.
    pub provider: String,
    pub file: String,
    pub line_start: usize,
    pub line_end: usize,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttrValue>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl ResourceRecord {
    /// "type.name" address used in user-facing messages.
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }
}

/// A module block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub name: String,
    #[serde(default)]
    pub source: String,
    pub file: String,
    pub line_start: usize,
}

/// A variable block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableRecord {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sensitive: bool,
    pub file: String,
}

impl VariableRecord {
    pub fn is_documented(&self) -> bool {
        !self.description.is_empty()
    }
}

/// An output block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputRecord {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sensitive: bool,
    pub file: String,
}

impl OutputRecord {
    pub fn is_documented(&self) -> bool {
        !self.description.is_empty()
    }
}

/// A parse failure recorded against a file. Never aborts a directory walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntaxError {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Aggregate result of extracting one file or a whole directory tree.
///
/// Invariant: every `total_*` counter equals the length of its collection.
/// [`TerraformAnalysis::recount`] re-establishes this after every merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerraformAnalysis {
    pub valid: bool,
    pub total_resources: usize,
    pub total_modules: usize,
    pub total_variables: usize,
    pub total_outputs: usize,
    pub total_data_sources: usize,
    pub providers: Vec<String>,
    pub resources: Vec<ResourceRecord>,
    pub modules: Vec<ModuleRecord>,
    pub variables: Vec<VariableRecord>,
    pub outputs: Vec<OutputRecord>,
    #[serde(default)]
    pub syntax_errors: Vec<SyntaxError>,
    #[serde(default)]
    pub best_practice_warnings: Vec<String>,
}

impl Default for TerraformAnalysis {
    fn default() -> Self {
        Self {
            valid: true,
            total_resources: 0,
            total_modules: 0,
            total_variables: 0,
            total_outputs: 0,
            total_data_sources: 0,
            providers: Vec::new(),
            resources: Vec::new(),
            modules: Vec::new(),
            variables: Vec::new(),
            outputs: Vec::new(),
            syntax_errors: Vec::new(),
            best_practice_warnings: Vec::new(),
        }
    }
}

impl TerraformAnalysis {
    /// Append-only merge of a per-file result, followed by provider
    /// de-duplication and a recount.
    pub fn merge(&mut self, other: TerraformAnalysis) {
        self.resources.extend(other.resources);
        self.modules.extend(other.modules);
        self.variables.extend(other.variables);
        self.outputs.extend(other.outputs);
        self.syntax_errors.extend(other.syntax_errors);
        self.providers.extend(other.providers);
        self.total_data_sources += other.total_data_sources;
        self.valid = self.valid && other.valid;

        self.dedup_providers();
        self.recount();
    }

    /// Re-assert the count-equals-length invariant.
    pub fn recount(&mut self) {
        self.total_resources = self.resources.len();
        self.total_modules = self.modules.len();
        self.total_variables = self.variables.len();
        self.total_outputs = self.outputs.len();
    }

    fn dedup_providers(&mut self) {
        let mut seen = std::collections::BTreeSet::new();
        self.providers.retain(|p| seen.insert(p.clone()));
    }

    pub fn undocumented_variable_count(&self) -> usize {
        self.variables.iter().filter(|v| !v.is_documented()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(t: &str, n: &str) -> ResourceRecord {
        ResourceRecord {
            resource_type: t.to_string(),
            name: n.to_string(),
            provider: t.split('_').next().unwrap_or("").to_string(),
            file: "main.tf".to_string(),
            line_start: 1,
            line_end: 3,
            attributes: BTreeMap::new(),
            tags: BTreeMap::new(),
        }
    }

    #[test]
    fn test_merge_recounts_and_dedups_providers() {
        let mut dest = TerraformAnalysis::default();
        dest.resources.push(resource("aws_instance", "a"));
        dest.providers.push("aws".to_string());
        dest.recount();

        let mut src = TerraformAnalysis::default();
        src.resources.push(resource("aws_s3_bucket", "b"));
        src.providers.push("aws".to_string());
        src.providers.push("google".to_string());
        src.recount();

        dest.merge(src);

        assert_eq!(dest.total_resources, dest.resources.len());
        assert_eq!(dest.total_resources, 2);
        assert_eq!(dest.providers.len(), 2);
    }

    #[test]
    fn test_merge_propagates_invalid() {
        let mut dest = TerraformAnalysis::default();
        let src = TerraformAnalysis {
            valid: false,
            ..Default::default()
        };
        dest.merge(src);
        assert!(!dest.valid);
    }

    #[test]
    fn test_attr_value_accessors() {
        assert_eq!(AttrValue::String("x".into()).as_str(), Some("x"));
        assert_eq!(AttrValue::Bool(true).as_bool(), Some(true));
        assert_eq!(AttrValue::Number(2.0).as_f64(), Some(2.0));
        assert_eq!(AttrValue::Bool(true).as_str(), None);
    }

    #[test]
    fn test_attr_value_untagged_roundtrip() {
        let v: AttrValue = serde_json::from_str("\"public-read\"").unwrap();
        assert_eq!(v.as_str(), Some("public-read"));
        let v: AttrValue = serde_json::from_str("true").unwrap();
        assert_eq!(v.as_bool(), Some(true));
        let v: AttrValue = serde_json::from_str("[{\"cidr_blocks\": [\"0.0.0.0/0\"]}]").unwrap();
        assert!(v.as_raw().is_some());
    }
}
