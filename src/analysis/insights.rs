//! Human-readable summary and quick-win recommendations.

use crate::analysis::scoring::grade_for;
use crate::models::{AnalysisResults, Category, MergedIssue, Severity};

/// Maximum number of quick wins in a report.
pub const MAX_QUICK_WINS: usize = 5;

/// Quick wins are padded with generic tips up to this many.
const MIN_QUICK_WINS: usize = 3;

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Compose the report summary paragraph.
pub fn generate_summary(results: &AnalysisResults, issues: &[MergedIssue], score: u8) -> String {
    let mut parts = Vec::new();

    let total = issues.len();
    let critical = issues
        .iter()
        .filter(|i| i.severity == Severity::Critical)
        .count();
    let high = issues
        .iter()
        .filter(|i| i.severity == Severity::High)
        .count();

    if total == 0 {
        parts.push("✅ Excellent! No issues detected across all analysis domains.".to_string());
    } else {
        parts.push(format!(
            "Found {} issue{} across security, performance, style, and bug detection.",
            total,
            plural(total)
        ));
    }

    if critical > 0 {
        parts.push(format!(
            "🚨 {} critical issue{} {} immediate attention.",
            critical,
            plural(critical),
            if critical == 1 { "requires" } else { "require" }
        ));
    }
    if high > 0 {
        parts.push(format!(
            "⚠️ {} high-severity issue{} should be addressed soon.",
            high,
            plural(high)
        ));
    }

    if let Some(summary) = non_empty(&results.security.report.summary) {
        parts.push(format!("Security: {}", summary));
    }
    if let Some(summary) = non_empty(&results.performance.report.summary) {
        parts.push(format!("Performance: {}", summary));
    }

    parts.push(format!(
        "Overall Quality Score: {}/100 (Grade: {})",
        score,
        grade_for(score)
    ));

    parts.join(" ")
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Derive up to [`MAX_QUICK_WINS`] prioritized tips from the merged issues.
///
/// Generic tips are added even when no issues were found.
pub fn generate_quick_wins(issues: &[MergedIssue]) -> Vec<String> {
    let in_category = |c: Category| issues.iter().filter(move |i| i.category == c);

    let security_count = in_category(Category::Security).count();
    let urgent_security = in_category(Category::Security)
        .filter(|i| matches!(i.severity, Severity::Critical | Severity::High))
        .count();
    let performance_count = in_category(Category::Performance).count();
    let bug_count = in_category(Category::Bug).count();
    let style_count = in_category(Category::Style).count();

    let mut wins = Vec::new();

    if urgent_security > 0 {
        wins.push(format!(
            "Fix {} critical/high security issue{}: hardcoded credentials and injection risks are easy wins.",
            urgent_security,
            plural(urgent_security)
        ));
    } else if security_count > 0 {
        wins.push(
            "Address minor security warnings to harden your code against future vulnerabilities."
                .to_string(),
        );
    }

    if performance_count > 0 {
        wins.push(format!(
            "Optimize {} performance hotspot{}: look for O(n²) loops and unnecessary allocations.",
            performance_count,
            plural(performance_count)
        ));
    }

    if bug_count > 0 {
        wins.push(format!(
            "Fix {} bug{}: logic errors and off-by-one mistakes cause silent failures.",
            bug_count,
            plural(bug_count)
        ));
    }

    if style_count > 0 {
        wins.push(format!(
            "Clean up {} style issue{}: consistent naming and formatting improve team velocity.",
            style_count,
            plural(style_count)
        ));
    }

    let mut fillers = Vec::new();
    if security_count == 0 {
        fillers.push("Add input validation and sanitization for all user-facing inputs.");
    }
    fillers.push("Consider adding unit tests for edge cases to prevent regressions.");
    fillers.push("Use type annotations and doc comments for better IDE support and documentation.");

    for filler in fillers {
        if wins.len() >= MIN_QUICK_WINS {
            break;
        }
        wins.push(filler.to_string());
    }

    wins.truncate(MAX_QUICK_WINS);
    wins
}
