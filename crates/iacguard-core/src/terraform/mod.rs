pub mod model;

use anyhow::{Context as _, Result};
use hcl::eval::{Context, Evaluate, FuncArgs, FuncDef, ParamType};
use hcl::Value;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

pub use model::{
    AttrValue, ModuleRecord, OutputRecord, ResourceRecord, SyntaxError, TerraformAnalysis,
    VariableRecord,
};

/// Resource types expected to carry organizational tags.
static TAGGABLE_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "aws_instance",
        "aws_s3_bucket",
        "aws_vpc",
        "aws_subnet",
        "aws_security_group",
        "aws_rds_instance",
        "aws_lambda_function",
        "azurerm_resource_group",
        "azurerm_virtual_machine",
        "google_compute_instance",
        "google_storage_bucket",
    ]
    .into_iter()
    .collect()
});

/// Extracts a structured resource model from Terraform HCL source.
pub struct TerraformExtractor;

impl TerraformExtractor {
    /// Walk a directory tree, parse every `.tf` file and merge the results.
    ///
    /// A parse failure on one file is recorded as a syntax error and flips
    /// `valid` to false; remaining files are still processed.
    pub fn analyze_directory(dir: &Path) -> Result<TerraformAnalysis> {
        if !dir.is_dir() {
            anyhow::bail!("'{}' is not a directory", dir.display());
        }

        let mut files = Vec::new();
        collect_tf_files(dir, &mut files)
            .with_context(|| format!("Failed to walk directory '{}'", dir.display()))?;
        files.sort();
        debug!(dir = %dir.display(), files = files.len(), "extracting terraform configuration");

        let mut analysis = TerraformAnalysis::default();
        for file in &files {
            let path_display = file.display().to_string();
            match std::fs::read_to_string(file) {
                Ok(content) => {
                    let file_analysis = Self::parse_content(&content, &path_display);
                    analysis.merge(file_analysis);
                }
                Err(err) => {
                    warn!(file = %path_display, error = %err, "failed to read file, skipping");
                    analysis.valid = false;
                    analysis.syntax_errors.push(SyntaxError {
                        file: path_display,
                        line: 0,
                        column: 0,
                        message: format!("failed to read file: {err}"),
                    });
                }
            }
        }

        check_best_practices(&mut analysis);
        analysis.recount();
        Ok(analysis)
    }

    /// Parse a single content string under a logical filename.
    pub fn analyze_content(content: &str, filename: &str) -> TerraformAnalysis {
        let mut analysis = Self::parse_content(content, filename);
        check_best_practices(&mut analysis);
        analysis.recount();
        analysis
    }

    fn parse_content(content: &str, filename: &str) -> TerraformAnalysis {
        let mut analysis = TerraformAnalysis::default();

        let body = match hcl::parse(content) {
            Ok(body) => body,
            Err(err) => {
                let (line, column) = parse_error_location(&err);
                analysis.valid = false;
                analysis.syntax_errors.push(SyntaxError {
                    file: filename.to_string(),
                    line,
                    column,
                    message: err.to_string(),
                });
                analysis.recount();
                return analysis;
            }
        };

        let mut locator = HeaderLocator::new(content);
        let ctx = eval_context();

        for block in body.blocks() {
            let labels: Vec<String> = block
                .labels
                .iter()
                .map(|l| l.as_str().to_string())
                .collect();
            let (line_start, line_end) = locator.locate(block.identifier.as_str(), &labels);

            match block.identifier.as_str() {
                "resource" => {
                    if labels.len() < 2 {
                        analysis.valid = false;
                        analysis.syntax_errors.push(SyntaxError {
                            file: filename.to_string(),
                            line: line_start,
                            column: 0,
                            message: "malformed resource block: requires a type and a name"
                                .to_string(),
                        });
                        continue;
                    }
                    let mut record = ResourceRecord {
                        resource_type: labels[0].clone(),
                        name: labels[1].clone(),
                        provider: labels[0].split('_').next().unwrap_or("").to_string(),
                        file: filename.to_string(),
                        line_start,
                        line_end,
                        attributes: BTreeMap::new(),
                        tags: BTreeMap::new(),
                    };
                    capture_attributes(&block.body, &ctx, &mut record);
                    analysis.resources.push(record);
                }
                "module" => {
                    let Some(name) = labels.first() else { continue };
                    let source = scalar_string_attr(&block.body, &ctx, "source");
                    analysis.modules.push(ModuleRecord {
                        name: name.clone(),
                        source: source.unwrap_or_default(),
                        file: filename.to_string(),
                        line_start,
                    });
                }
                "variable" => {
                    let Some(name) = labels.first() else { continue };
                    analysis.variables.push(VariableRecord {
                        name: name.clone(),
                        description: scalar_string_attr(&block.body, &ctx, "description")
                            .unwrap_or_default(),
                        sensitive: scalar_bool_attr(&block.body, &ctx, "sensitive")
                            .unwrap_or(false),
                        file: filename.to_string(),
                    });
                }
                "output" => {
                    let Some(name) = labels.first() else { continue };
                    analysis.outputs.push(OutputRecord {
                        name: name.clone(),
                        description: scalar_string_attr(&block.body, &ctx, "description")
                            .unwrap_or_default(),
                        sensitive: scalar_bool_attr(&block.body, &ctx, "sensitive")
                            .unwrap_or(false),
                        file: filename.to_string(),
                    });
                }
                "provider" => {
                    if let Some(name) = labels.first() {
                        analysis.providers.push(name.clone());
                    }
                }
                "data" => {
                    analysis.total_data_sources += 1;
                }
                _ => {}
            }
        }

        dedup_in_place(&mut analysis.providers);
        analysis.recount();
        analysis
    }
}

/// Evaluation context with the helper functions configuration values may call.
fn eval_context() -> Context<'static> {
    fn json_encode(args: FuncArgs) -> Result<Value, String> {
        serde_json::to_string(&args[0])
            .map(Value::from)
            .map_err(|err| err.to_string())
    }

    let mut ctx = Context::new();
    ctx.declare_func(
        "jsonencode",
        FuncDef::builder().param(ParamType::Any).build(json_encode),
    );
    ctx
}

/// Capture scalar attribute values; complex values are intentionally dropped.
/// A `tags` object of string values populates the tags map instead.
fn capture_attributes(body: &hcl::Body, ctx: &Context, record: &mut ResourceRecord) {
    for attr in body.attributes() {
        let value = match attr.expr.evaluate(ctx) {
            Ok(value) => value,
            Err(_) => continue, // unresolvable expression (references, etc.)
        };

        match value {
            Value::String(s) => {
                record
                    .attributes
                    .insert(attr.key.as_str().to_string(), AttrValue::String(s));
            }
            Value::Bool(b) => {
                record
                    .attributes
                    .insert(attr.key.as_str().to_string(), AttrValue::Bool(b));
            }
            Value::Number(n) => {
                if let Some(f) = n.as_f64() {
                    record
                        .attributes
                        .insert(attr.key.as_str().to_string(), AttrValue::Number(f));
                }
            }
            Value::Object(map) if attr.key.as_str() == "tags" => {
                for (k, v) in map {
                    if let Value::String(s) = v {
                        record.tags.insert(k, s);
                    }
                }
            }
            _ => {}
        }
    }
}

fn scalar_string_attr(body: &hcl::Body, ctx: &Context, key: &str) -> Option<String> {
    body.attributes()
        .find(|a| a.key.as_str() == key)
        .and_then(|a| a.expr.evaluate(ctx).ok())
        .and_then(|v| match v {
            Value::String(s) => Some(s),
            _ => None,
        })
}

fn scalar_bool_attr(body: &hcl::Body, ctx: &Context, key: &str) -> Option<bool> {
    body.attributes()
        .find(|a| a.key.as_str() == key)
        .and_then(|a| a.expr.evaluate(ctx).ok())
        .and_then(|v| match v {
            Value::Bool(b) => Some(b),
            _ => None,
        })
}

fn parse_error_location(err: &hcl::Error) -> (usize, usize) {
    match err {
        hcl::Error::Parse(parse_err) => {
            let location = parse_err.location();
            (location.line(), location.column())
        }
        _ => (0, 0),
    }
}

/// Locates block header lines in the raw source, in declaration order.
/// The parsed body loses span information, so positions are recovered by
/// scanning for the header text and balancing braces for the end line.
struct HeaderLocator<'a> {
    lines: Vec<&'a str>,
    cursor: usize,
}

impl<'a> HeaderLocator<'a> {
    fn new(content: &'a str) -> Self {
        Self {
            lines: content.lines().collect(),
            cursor: 0,
        }
    }

    /// Returns 1-indexed (start, end) lines, or (0, 0) when not found.
    fn locate(&mut self, identifier: &str, labels: &[String]) -> (usize, usize) {
        for i in self.cursor..self.lines.len() {
            let trimmed = self.lines[i].trim_start();
            if !trimmed.starts_with(identifier) {
                continue;
            }
            let rest = &trimmed[identifier.len()..];
            if !rest.starts_with([' ', '\t', '"', '{']) && !rest.is_empty() {
                continue; // identifier is a prefix of a longer word
            }
            if labels.iter().all(|l| rest.contains(l.as_str())) {
                self.cursor = i + 1;
                let start = i + 1;
                return (start, self.block_end(i));
            }
        }
        (0, 0)
    }

    fn block_end(&self, start_index: usize) -> usize {
        let mut depth: i64 = 0;
        let mut opened = false;
        for (i, line) in self.lines.iter().enumerate().skip(start_index) {
            for ch in line.chars() {
                match ch {
                    '{' => {
                        depth += 1;
                        opened = true;
                    }
                    '}' => depth -= 1,
                    _ => {}
                }
            }
            if opened && depth <= 0 {
                return i + 1;
            }
        }
        start_index + 1
    }
}

pub(crate) fn collect_tf_files(dir: &Path, out: &mut Vec<std::path::PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory '{}'", dir.display()))?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        let name_str = name.to_string_lossy();

        if path.is_dir() {
            // Skip hidden dirs and build artifacts
            if name_str.starts_with('.')
                || name_str == "target"
                || name_str == "node_modules"
                || name_str == "vendor"
            {
                continue;
            }
            collect_tf_files(&path, out)?;
        } else if name_str.ends_with(".tf") {
            out.push(path);
        }
    }

    Ok(())
}

fn dedup_in_place(items: &mut Vec<String>) {
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}

fn check_best_practices(analysis: &mut TerraformAnalysis) {
    for resource in &analysis.resources {
        if resource.tags.is_empty() && TAGGABLE_TYPES.contains(resource.resource_type.as_str()) {
            analysis.best_practice_warnings.push(format!(
                "Resource {}.{} has no tags",
                resource.resource_type, resource.name
            ));
        }
    }

    if analysis.outputs.is_empty() && !analysis.resources.is_empty() {
        analysis
            .best_practice_warnings
            .push("Consider adding outputs to ease integration with other modules".to_string());
    }

    for variable in &analysis.variables {
        if !variable.is_documented() {
            analysis
                .best_practice_warnings
                .push(format!("Variable {} has no description", variable.name));
        }
    }
}
