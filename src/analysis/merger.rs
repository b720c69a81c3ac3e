//! Issue merging across analysis domains.
//!
//! Each worker reports findings in its own shape. This module projects
//! them into [`MergedIssue`] and orders the union by severity, then line.

use crate::models::{AnalysisResults, Category, MergedIssue, Severity};

const SECURITY_IMPACT: &str = "Could compromise application security.";
const PERFORMANCE_IMPACT: &str = "May degrade application performance.";
const STYLE_IMPACT: &str = "Reduces code readability and maintainability.";
const BUG_IMPACT: &str = "Could cause unexpected behavior or crashes.";

fn severity_or(value: &Option<String>, default: Severity) -> Severity {
    value
        .as_deref()
        .map(Severity::parse)
        .unwrap_or(default)
}

fn text_or(value: &Option<String>, default: &str) -> String {
    value.clone().unwrap_or_else(|| default.to_string())
}

/// Merge all four domains into one sorted list.
///
/// Nothing is deduplicated: two workers flagging the same line both appear.
pub fn merge_issues(results: &AnalysisResults) -> Vec<MergedIssue> {
    let mut merged = Vec::new();

    for vuln in &results.security.report.vulnerabilities {
        merged.push(MergedIssue {
            line: vuln.line,
            severity: severity_or(&vuln.severity, Severity::Medium),
            category: Category::Security,
            issue_type: text_or(&vuln.kind, "vulnerability"),
            description: text_or(&vuln.description, ""),
            suggestion: text_or(&vuln.fix, ""),
            impact: text_or(&vuln.impact, SECURITY_IMPACT),
        });
    }

    for issue in &results.performance.report.issues {
        merged.push(MergedIssue {
            line: issue.line,
            severity: severity_or(&issue.severity, Severity::Medium),
            category: Category::Performance,
            issue_type: text_or(&issue.kind, "bottleneck"),
            description: text_or(&issue.description, ""),
            suggestion: text_or(&issue.optimization, ""),
            impact: text_or(&issue.impact, PERFORMANCE_IMPACT),
        });
    }

    for issue in &results.style.report.issues {
        merged.push(MergedIssue {
            line: issue.line,
            severity: severity_or(&issue.severity, Severity::Low),
            category: Category::Style,
            issue_type: text_or(&issue.category, "style"),
            description: text_or(&issue.description, ""),
            suggestion: text_or(&issue.suggestion, ""),
            impact: text_or(&issue.impact, STYLE_IMPACT),
        });
    }

    for bug in &results.bugs.report.bugs {
        merged.push(MergedIssue {
            line: bug.line,
            severity: severity_or(&bug.severity, Severity::High),
            category: Category::Bug,
            issue_type: text_or(&bug.kind, "logic_error"),
            description: text_or(&bug.description, ""),
            suggestion: text_or(&bug.fix, ""),
            impact: text_or(&bug.impact, BUG_IMPACT),
        });
    }

    // Stable sort keeps domain insertion order for equal keys
    merged.sort_by_key(|issue| (issue.severity.rank(), issue.line));

    merged
}

/// Build the plain-text findings digest handed to the auto-fix worker.
pub fn build_autofix_digest(results: &AnalysisResults) -> String {
    let mut lines = Vec::new();

    for vuln in &results.security.report.vulnerabilities {
        lines.push(digest_line("SECURITY", vuln.line, &vuln.description, &vuln.fix));
    }
    for issue in &results.performance.report.issues {
        lines.push(digest_line(
            "PERFORMANCE",
            issue.line,
            &issue.description,
            &issue.optimization,
        ));
    }
    for issue in &results.style.report.issues {
        lines.push(digest_line(
            "STYLE",
            issue.line,
            &issue.description,
            &issue.suggestion,
        ));
    }
    for bug in &results.bugs.report.bugs {
        lines.push(digest_line("BUG", bug.line, &bug.description, &bug.fix));
    }

    if lines.is_empty() {
        "No issues found.".to_string()
    } else {
        lines.join("\n")
    }
}

fn digest_line(domain: &str, line: u32, description: &Option<String>, fix: &Option<String>) -> String {
    format!(
        "[{}] Line {}: {} → Fix: {}",
        domain,
        line,
        description.as_deref().unwrap_or(""),
        fix.as_deref().unwrap_or("")
    )
}
