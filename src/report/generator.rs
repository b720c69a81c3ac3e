//! Markdown and JSON report generation.
//!
//! This module renders a finished review [`Report`] for humans (Markdown)
//! or for tooling (pretty-printed JSON).

use crate::models::{AgentResults, MergedIssue, Metrics, Report, ReportMetadata, Severity};
use anyhow::Result;
use std::io::Write;
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# FluxReview Report\n\n");

    // Metadata section
    output.push_str(&generate_metadata_section(&report.metadata));

    // Score and summary
    output.push_str(&generate_summary_section(report));

    // Quick wins
    output.push_str(&generate_quick_wins_section(&report.quick_wins));

    // Merged issues
    output.push_str(&generate_issues_section(&report.issues));

    // Per-worker results
    output.push_str(&generate_agent_section(&report.agent_results));

    // Auto-fix output
    output.push_str(&generate_fixed_code_section(report));

    // Footer
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Language:** {}\n", metadata.language));
    section.push_str(&format!("- **Model Used:** `{}`\n", metadata.model_used));
    section.push_str(&format!("- **Agents Used:** {}\n", metadata.agents_used));
    section.push_str(&format!("- **Total Issues:** {}\n", metadata.total_issues));
    section.push_str(&format!(
        "- **Processing Time:** {:.1}s\n",
        metadata.processing_time_ms as f64 / 1000.0
    ));
    section.push('\n');

    section
}

/// Generate the score, summary and breakdown tables.
fn generate_summary_section(report: &Report) -> String {
    let mut section = String::new();
    let metadata = &report.metadata;

    section.push_str("## Summary\n\n");
    section.push_str(&format!(
        "**Quality Score:** {}/100 (Grade: **{}**)\n\n",
        report.score, report.grade
    ));
    section.push_str(&report.summary);
    section.push_str("\n\n");

    // Severity breakdown
    section.push_str("### Issue Severity Breakdown\n\n");
    section.push_str(&format!(
        "| {} Critical | {} High | {} Medium | {} Low | **Total** |\n",
        Severity::Critical.emoji(),
        Severity::High.emoji(),
        Severity::Medium.emoji(),
        Severity::Low.emoji(),
    ));
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | **{}** |\n\n",
        metadata.critical_count,
        metadata.high_count,
        metadata.medium_count,
        metadata.low_count,
        metadata.total_issues
    ));

    section.push_str(&generate_metrics_table(&report.metrics));

    section
}

fn generate_metrics_table(metrics: &Metrics) -> String {
    let mut table = String::new();

    table.push_str("### Metrics\n\n");
    table.push_str("| Metric | Score |\n");
    table.push_str("|:---|:---:|\n");
    table.push_str(&format!("| Security | {} |\n", metrics.security));
    table.push_str(&format!("| Performance | {} |\n", metrics.performance));
    table.push_str(&format!("| Maintainability | {} |\n", metrics.maintainability));
    table.push_str(&format!("| Readability | {} |\n", metrics.readability));
    table.push('\n');

    table
}

/// Generate the quick wins section.
fn generate_quick_wins_section(quick_wins: &[String]) -> String {
    if quick_wins.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Quick Wins\n\n");
    for (i, win) in quick_wins.iter().enumerate() {
        section.push_str(&format!("{}. {}\n", i + 1, win));
    }
    section.push('\n');

    section
}

/// Generate the issues section, already ordered by severity then line.
fn generate_issues_section(issues: &[MergedIssue]) -> String {
    let mut section = String::new();

    section.push_str("## Issues\n\n");

    if issues.is_empty() {
        section.push_str("No issues were found in the reviewed code. Great job! 🎉\n\n");
        return section;
    }

    for issue in issues {
        section.push_str(&generate_issue_block(issue));
    }

    section
}

/// Generate a single issue block.
fn generate_issue_block(issue: &MergedIssue) -> String {
    let mut block = String::new();

    let severity_badge = format!(
        "{} **{}**",
        issue.severity.emoji(),
        issue.severity.to_string().to_uppercase()
    );

    block.push_str(&format!(
        "#### {} {} - `{}`\n\n",
        severity_badge, issue.category, issue.issue_type
    ));

    // Line reference
    block.push_str(&format!("**Line:** {}\n\n", issue.line));

    if !issue.description.is_empty() {
        block.push_str(&format!("**Description:** {}\n\n", issue.description));
    }

    block.push_str(&format!("**Impact:** {}\n\n", issue.impact));

    if !issue.suggestion.is_empty() {
        block.push_str(&format!("> 💡 **Suggestion:** {}\n\n", issue.suggestion));
    }

    block.push_str("---\n\n");

    block
}

/// Generate the per-agent results table.
fn generate_agent_section(agents: &AgentResults) -> String {
    let mut section = String::new();

    section.push_str("## Agent Results\n\n");
    section.push_str("| Agent | Score | Findings | Details | Time | Status |\n");
    section.push_str("|:---|:---:|:---:|:---|:---:|:---|\n");

    let rows = [
        (
            "Security",
            Some(agents.security.score),
            agents.security.vulnerability_count,
            format!("risk: {}", agents.security.risk_level),
            agents.security.duration_ms,
            &agents.security.error,
        ),
        (
            "Performance",
            Some(agents.performance.score),
            agents.performance.issue_count,
            format!("complexity: {}", agents.performance.complexity),
            agents.performance.duration_ms,
            &agents.performance.error,
        ),
        (
            "Style",
            Some(agents.style.score),
            agents.style.issue_count,
            format!("maintainability: {}", agents.style.maintainability),
            agents.style.duration_ms,
            &agents.style.error,
        ),
        (
            "Bugs",
            Some(agents.bugs.score),
            agents.bugs.bug_count,
            format!("confidence: {}", agents.bugs.confidence),
            agents.bugs.duration_ms,
            &agents.bugs.error,
        ),
        (
            "Auto-Fix",
            None,
            agents.autofix.changes_count,
            "changes applied".to_string(),
            agents.autofix.duration_ms,
            &agents.autofix.error,
        ),
    ];

    for (name, score, findings, details, duration_ms, error) in rows {
        let score = score.map_or_else(|| "-".to_string(), |s| s.to_string());
        let status = match error {
            Some(e) => format!("❌ {}", e.replace('|', "\\|")),
            None => "✅".to_string(),
        };
        section.push_str(&format!(
            "| {} | {} | {} | {} | {:.1}s | {} |\n",
            name,
            score,
            findings,
            details,
            duration_ms as f64 / 1000.0,
            status
        ));
    }
    section.push('\n');

    section
}

/// Generate the auto-fix section with the rewritten code.
fn generate_fixed_code_section(report: &Report) -> String {
    let mut section = String::new();

    section.push_str("## Fixed Code\n\n");

    if !report.agent_results.autofix.summary.is_empty() {
        section.push_str(&format!("{}\n\n", report.agent_results.autofix.summary));
    }

    if !report.changes_made.is_empty() {
        section.push_str("### Changes Made\n\n");
        for change in &report.changes_made {
            section.push_str(&format!(
                "- **Line {}** ({}): {}\n",
                change.line,
                change.change_type.as_deref().unwrap_or("change"),
                change.description.as_deref().unwrap_or("")
            ));
        }
        section.push('\n');
    }

    section.push_str("<details>\n<summary>View Fixed Code</summary>\n\n");
    section.push_str(&format!("```{}\n", report.metadata.language));
    section.push_str(&report.fixed_code);
    if !report.fixed_code.ends_with('\n') {
        section.push('\n');
    }
    section.push_str("```\n</details>\n\n");

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by FluxReview*\n");

    footer
}

/// Write the Markdown report to a file.
#[allow(dead_code)] // Convenience wrapper for embedders
pub fn write_report(report: &Report, path: &Path) -> Result<()> {
    let content = generate_markdown_report(report);

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
