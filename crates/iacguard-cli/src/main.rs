mod display;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use iacguard_core::analysis::{Analyzer, DEFAULT_MIN_PASS_SCORE};
use iacguard_core::checkov;
use iacguard_core::plan;
use iacguard_core::secrets::SecretScanner;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "iacguard",
    version,
    about = "IaC Guard — Terraform risk analysis and change scoring",
    long_about = "Analyze Terraform configurations for security issues, risky IAM policies, \
                  hardcoded secrets and costly resources, score the change set, and assess \
                  the blast radius of a plan before it is applied."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a Terraform configuration directory or file
    Analyze {
        /// Path to a .tf file or a directory containing .tf files
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Minimum total score required for approval
        #[arg(long, default_value_t = DEFAULT_MIN_PASS_SCORE)]
        min_score: i32,

        /// Path to a Checkov JSON report to fold into the analysis
        #[arg(long)]
        checkov: Option<PathBuf>,
    },

    /// Assess the blast radius of a Terraform plan (terraform show -json)
    Plan {
        /// Path to the plan JSON file
        path: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Validate and summarize an external Checkov scan report
    Report {
        /// Path to the Checkov JSON report
        path: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Scan files for hardcoded secrets
    Secrets {
        /// Path to a file or a directory
        path: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            path,
            format,
            min_score,
            checkov,
        } => cmd_analyze(&path, &format, min_score, checkov.as_deref()),
        Commands::Plan { path, format } => cmd_plan(&path, &format),
        Commands::Report { path, format } => cmd_report(&path, &format),
        Commands::Secrets { path, format } => cmd_secrets(&path, &format),
    }
}

fn cmd_analyze(
    path: &PathBuf,
    format: &str,
    min_score: i32,
    checkov: Option<&std::path::Path>,
) -> Result<()> {
    let security = match checkov {
        Some(report_path) => {
            let bytes = std::fs::read(report_path)
                .with_context(|| format!("Failed to read '{}'", report_path.display()))?;
            Some(checkov::validate_report(&bytes)?)
        }
        None => None,
    };

    let analyzer = Analyzer::new(min_score);
    let response = if path.is_file() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?;
        analyzer.analyze_content(&content, &path.to_string_lossy(), security)
    } else {
        analyzer.analyze_directory(path, security)?
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&response)?),
        _ => display::print_analysis(&response),
    }

    if !response.approved {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_plan(path: &PathBuf, format: &str) -> Result<()> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    let preview = plan::analyze(&bytes)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&preview)?),
        _ => display::print_preview(&preview),
    }
    Ok(())
}

fn cmd_report(path: &PathBuf, format: &str) -> Result<()> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    let analysis = checkov::validate_report(&bytes)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&analysis)?),
        _ => display::print_security(&analysis),
    }
    Ok(())
}

fn cmd_secrets(path: &PathBuf, format: &str) -> Result<()> {
    let scanner = SecretScanner::new();
    let mut findings = Vec::new();

    if path.is_file() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?;
        findings = scanner.scan_content(&content, &path.to_string_lossy());
    } else if path.is_dir() {
        for entry in walk_files(path)? {
            if let Ok(content) = std::fs::read_to_string(&entry) {
                findings.extend(scanner.scan_content(&content, &entry.to_string_lossy()));
            }
        }
    } else {
        anyhow::bail!("Path '{}' does not exist", path.display());
    }

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&findings)?),
        _ => display::print_secrets(&findings),
    }

    if !findings.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn walk_files(dir: &std::path::Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];

    while let Some(current) = stack.pop() {
        let entries = std::fs::read_dir(&current)
            .with_context(|| format!("Failed to read directory '{}'", current.display()))?;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if path.is_dir() {
                if name_str.starts_with('.')
                    || name_str == "target"
                    || name_str == "node_modules"
                    || name_str == "vendor"
                {
                    continue;
                }
                stack.push(path);
            } else {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
