use colored::*;
use iacguard_core::analysis::AnalysisResponse;
use iacguard_core::checkov::SecurityAnalysis;
use iacguard_core::plan::PreviewAnalysis;
use iacguard_core::secrets::SecretFinding;
use iacguard_core::severity::Severity;

fn severity_tag(severity: Severity) -> ColoredString {
    match severity {
        Severity::Critical => "CRITICAL".red().bold(),
        Severity::High => "HIGH".red(),
        Severity::Medium => "MEDIUM".yellow(),
        Severity::Low => "LOW".normal(),
        Severity::Info => "INFO".dimmed(),
    }
}

/// Print a full analysis report to the terminal.
pub fn print_analysis(response: &AnalysisResponse) {
    println!();
    println!(
        "{}",
        format!(" iacguard v{} — Configuration Analysis", env!("CARGO_PKG_VERSION")).bold()
    );
    println!();

    let terraform = &response.analysis.terraform;
    println!(" {}", "Configuration".bold().underline());
    println!(
        " {} {} resources, {} modules, {} variables, {} outputs",
        "|-".dimmed(),
        terraform.total_resources,
        terraform.total_modules,
        terraform.total_variables,
        terraform.total_outputs
    );
    println!(
        " {} Providers: {}",
        "|-".dimmed(),
        if terraform.providers.is_empty() {
            "none".to_string()
        } else {
            terraform.providers.join(", ")
        }
    );
    if !terraform.syntax_errors.is_empty() {
        println!(
            " {} {} syntax error(s)",
            "|-".dimmed(),
            terraform.syntax_errors.len().to_string().red().bold()
        );
        for err in &terraform.syntax_errors {
            println!(
                "    {} {}:{} {}",
                "x".red(),
                err.file,
                err.line,
                err.message
            );
        }
    }
    println!();

    println!(" {}", "=".repeat(60).dimmed());
    println!();

    if response.suggestions.is_empty() {
        println!(
            " {} No issues detected. The configuration looks good!",
            "OK".green().bold()
        );
    } else {
        for suggestion in &response.suggestions {
            println!(
                " {} [{}] {}",
                severity_tag(suggestion.severity),
                suggestion.kind,
                suggestion.message
            );
            println!("    {}", suggestion.recommendation.dimmed());
            if !suggestion.estimated_savings.is_empty() {
                println!(
                    "    Estimated savings: {}",
                    suggestion.estimated_savings.green()
                );
            }
        }
    }
    println!();

    println!(" {}", "=".repeat(60).dimmed());
    println!();

    println!(" {}", "Score".bold().underline());
    for (dimension, value) in &response.score.breakdown {
        println!(" {} {:<17} {}", "|-".dimmed(), dimension, score_colored(*value));
    }
    println!(
        " {} {:<17} {} ({})",
        "|-".dimmed(),
        "total",
        score_colored(response.score.total).bold(),
        response.score_level.cyan()
    );

    if let Some(cost) = &response.analysis.cost {
        println!(
            " {} Estimated cost: ${:.2}/month (optimization potential ${:.2})",
            "|-".dimmed(),
            cost.estimated_monthly_cost,
            cost.optimization_potential
        );
    }

    println!();
    if response.approved {
        println!(" {} Change set approved", "PASS".green().bold());
    } else {
        println!(" {} Change set needs work before approval", "FAIL".red().bold());
    }
    println!();
}

fn score_colored(value: i32) -> ColoredString {
    let text = value.to_string();
    if value >= 75 {
        text.green()
    } else if value >= 50 {
        text.yellow()
    } else {
        text.red()
    }
}

/// Print a plan blast-radius assessment.
pub fn print_preview(preview: &PreviewAnalysis) {
    println!();
    println!(" {}", "Plan Assessment".bold().underline());
    println!(
        " {} {} resources affected: {} create, {} update, {} destroy, {} replace",
        "|-".dimmed(),
        preview.resources_affected,
        preview.create_count.to_string().green(),
        preview.update_count.to_string().yellow(),
        preview.destroy_count.to_string().red(),
        preview.replace_count.to_string().red()
    );

    let risk = preview.risk_level.label().to_uppercase();
    let risk = match preview.risk_level {
        iacguard_core::severity::RiskLevel::Critical => risk.red().bold(),
        iacguard_core::severity::RiskLevel::High => risk.red(),
        iacguard_core::severity::RiskLevel::Medium => risk.yellow(),
        iacguard_core::severity::RiskLevel::Low => risk.green(),
    };
    println!(" {} Overall risk: {}", "|-".dimmed(), risk);
    println!();

    for change in &preview.planned_changes {
        let action = change
            .action
            .map(|a| format!("{a:?}").to_lowercase())
            .unwrap_or_else(|| "none".to_string());
        println!(
            " {} {} ({}, score {})",
            "|-".dimmed(),
            change.address,
            action,
            change.risk_score
        );
        if !change.changed_fields.is_empty() {
            println!("    changed: {}", change.changed_fields.join(", ").dimmed());
        }
    }

    if !preview.risk_warnings.is_empty() {
        println!();
        println!(" {}", "Warnings".bold().underline());
        for warning in &preview.risk_warnings {
            println!(" {} {}", severity_tag(warning.severity), warning.message);
            println!("    {}", warning.action.dimmed());
        }
    }
    println!();
}

/// Print a validated scan report summary.
pub fn print_security(analysis: &SecurityAnalysis) {
    println!();
    println!(" {}", "Security Scan".bold().underline());
    println!(
        " {} {} passed, {} failed",
        "|-".dimmed(),
        analysis.checks_passed.to_string().green(),
        analysis.checks_failed.to_string().red()
    );
    println!(
        " {} {} critical, {} high, {} medium, {} low",
        "|-".dimmed(),
        analysis.critical,
        analysis.high,
        analysis.medium,
        analysis.low
    );
    println!();

    for finding in &analysis.findings {
        println!(
            " {} {} {} ({}:{})",
            severity_tag(finding.severity),
            finding.check_id.cyan(),
            finding.check_name,
            finding.file,
            finding.line
        );
    }
    println!();
}

/// Print secret findings with masked values.
pub fn print_secrets(findings: &[SecretFinding]) {
    println!();
    if findings.is_empty() {
        println!(" {} No secrets detected", "OK".green().bold());
        println!();
        return;
    }

    println!(" {}", "Secrets".bold().underline());
    for finding in findings {
        println!(
            " {} {} at {}:{}",
            severity_tag(finding.severity),
            finding.description,
            finding.file,
            finding.line
        );
        println!("    {}", finding.masked_value.dimmed());
        println!("    {}", finding.suggestion);
    }
    println!();
}
