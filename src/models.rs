//! Data models for the review pipeline.
//!
//! This module contains the per-domain worker report shapes (tolerant of
//! loosely-formatted model output), the normalized merged issue, and the
//! final report handed back to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Language assumed when a request does not declare one.
pub const DEFAULT_LANGUAGE: &str = "python";

/// Severity level of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Security vulnerabilities, crashes, data loss
    Critical,
    /// Bugs and serious concerns
    High,
    /// Code quality issues, potential bugs
    Medium,
    /// Style issues, minor suggestions
    Low,
    /// Anything a worker reported that is not one of the above
    Unknown,
}

impl Severity {
    /// Parse a worker-reported severity, case-insensitively.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" => Severity::Medium,
            "low" => Severity::Low,
            _ => Severity::Unknown,
        }
    }

    /// Sort rank: critical first, unknown last.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
            Severity::Unknown => 4,
        }
    }

    /// Returns an emoji representation of the severity.
    pub fn emoji(&self) -> &'static str {
        match self {
            Severity::Critical => "🔴",
            Severity::High => "🟠",
            Severity::Medium => "🟡",
            Severity::Low => "🟢",
            Severity::Unknown => "⚪",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "Critical"),
            Severity::High => write!(f, "High"),
            Severity::Medium => write!(f, "Medium"),
            Severity::Low => write!(f, "Low"),
            Severity::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Analysis domain a merged issue came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Security,
    Performance,
    Style,
    Bug,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Security => write!(f, "Security"),
            Category::Performance => write!(f, "Performance"),
            Category::Style => write!(f, "Style"),
            Category::Bug => write!(f, "Bug"),
        }
    }
}

/// Overall risk reported by the security worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
    Unknown,
}

impl From<&str> for RiskLevel {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "none" => RiskLevel::None,
            "low" => RiskLevel::Low,
            "medium" => RiskLevel::Medium,
            "high" => RiskLevel::High,
            "critical" => RiskLevel::Critical,
            _ => RiskLevel::Unknown,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::None => "none",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
            RiskLevel::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Maintainability bucket reported by the style worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaintainabilityIndex {
    Low,
    Medium,
    High,
    Unknown,
}

impl From<&str> for MaintainabilityIndex {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "low" => MaintainabilityIndex::Low,
            "medium" => MaintainabilityIndex::Medium,
            "high" => MaintainabilityIndex::High,
            _ => MaintainabilityIndex::Unknown,
        }
    }
}

impl fmt::Display for MaintainabilityIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MaintainabilityIndex::Low => "low",
            MaintainabilityIndex::Medium => "medium",
            MaintainabilityIndex::High => "high",
            MaintainabilityIndex::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Immutable input to one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Source code to review.
    pub code: String,
    /// Free-form language identifier.
    pub language: String,
}

impl AnalysisRequest {
    /// Creates a request, falling back to [`DEFAULT_LANGUAGE`] when none is given.
    pub fn new(code: impl Into<String>, language: Option<&str>) -> Self {
        let language = language
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE);
        Self {
            code: code.into(),
            language: language.to_string(),
        }
    }
}

/// Lenient field deserializers for model-generated JSON.
///
/// Workers answer with free-form text that only loosely follows the
/// requested schema, so numbers may arrive as strings, strings as numbers,
/// and lists as `null`.
mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn line<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(number(&value)
            .map(|n| n.clamp(0.0, u32::MAX as f64) as u32)
            .unwrap_or(0))
    }

    pub fn score<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(number(&value).map(|n| n.round() as i64))
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        })
    }

    /// Accepts a missing or non-array value as empty and skips entries
    /// that are not shaped like `T`.
    pub fn list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Value::deserialize(d)?;
        Ok(match value {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        })
    }

    fn number(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }
}

/// A vulnerability reported by the security worker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityFinding {
    #[serde(deserialize_with = "lenient::line")]
    pub line: u32,
    #[serde(deserialize_with = "lenient::text")]
    pub severity: Option<String>,
    #[serde(rename = "type", deserialize_with = "lenient::text")]
    pub kind: Option<String>,
    /// Weakness identifier, e.g. a CWE id.
    #[serde(deserialize_with = "lenient::text")]
    pub cwe: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub impact: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub fix: Option<String>,
}

/// Output of the security worker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityReport {
    #[serde(deserialize_with = "lenient::list")]
    pub vulnerabilities: Vec<SecurityFinding>,
    #[serde(deserialize_with = "lenient::score")]
    pub security_score: Option<i64>,
    #[serde(deserialize_with = "lenient::text")]
    pub risk_level: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub summary: Option<String>,
}

impl SecurityReport {
    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
            .as_deref()
            .map(RiskLevel::from)
            .unwrap_or(RiskLevel::Unknown)
    }
}

/// A bottleneck reported by the performance worker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceFinding {
    #[serde(deserialize_with = "lenient::line")]
    pub line: u32,
    #[serde(deserialize_with = "lenient::text")]
    pub severity: Option<String>,
    #[serde(rename = "type", deserialize_with = "lenient::text")]
    pub kind: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub current_complexity: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub optimization: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub estimated_improvement: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub impact: Option<String>,
}

/// Output of the performance worker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceReport {
    #[serde(deserialize_with = "lenient::list")]
    pub issues: Vec<PerformanceFinding>,
    #[serde(deserialize_with = "lenient::score")]
    pub performance_score: Option<i64>,
    #[serde(deserialize_with = "lenient::text")]
    pub overall_complexity: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub summary: Option<String>,
}

/// A style or maintainability finding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleFinding {
    #[serde(deserialize_with = "lenient::line")]
    pub line: u32,
    #[serde(deserialize_with = "lenient::text")]
    pub severity: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub category: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub suggestion: Option<String>,
    /// Guideline the finding violates.
    #[serde(deserialize_with = "lenient::text")]
    pub standard: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub impact: Option<String>,
}

/// Output of the style worker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleReport {
    #[serde(deserialize_with = "lenient::list")]
    pub issues: Vec<StyleFinding>,
    #[serde(deserialize_with = "lenient::score")]
    pub style_score: Option<i64>,
    #[serde(deserialize_with = "lenient::text")]
    pub maintainability_index: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub summary: Option<String>,
}

impl StyleReport {
    pub fn maintainability_index(&self) -> MaintainabilityIndex {
        self.maintainability_index
            .as_deref()
            .map(MaintainabilityIndex::from)
            .unwrap_or(MaintainabilityIndex::Unknown)
    }
}

/// A logic error reported by the bug detector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BugFinding {
    #[serde(deserialize_with = "lenient::line")]
    pub line: u32,
    #[serde(deserialize_with = "lenient::text")]
    pub severity: Option<String>,
    #[serde(rename = "type", deserialize_with = "lenient::text")]
    pub kind: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub impact: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub fix: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub test_case: Option<String>,
}

/// Output of the bug detector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BugReport {
    #[serde(deserialize_with = "lenient::list")]
    pub bugs: Vec<BugFinding>,
    #[serde(deserialize_with = "lenient::score")]
    pub reliability_score: Option<i64>,
    #[serde(deserialize_with = "lenient::text")]
    pub confidence: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub summary: Option<String>,
}

/// One change applied by the auto-fix worker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeEntry {
    #[serde(deserialize_with = "lenient::line")]
    pub line: u32,
    #[serde(rename = "type", deserialize_with = "lenient::text")]
    pub change_type: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub description: Option<String>,
}

/// Output of the auto-fix worker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoFixReport {
    #[serde(deserialize_with = "lenient::text")]
    pub fixed_code: Option<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub changes_made: Vec<ChangeEntry>,
    #[serde(deserialize_with = "lenient::text")]
    pub improvement_summary: Option<String>,
}

/// Result of one worker invocation.
///
/// A failed invocation still carries a report: the domain's fallback
/// content, with `error` describing what went wrong.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerResult<R> {
    pub report: R,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<R> WorkerResult<R> {
    pub fn completed(report: R, duration_ms: u64) -> Self {
        Self {
            report,
            duration_ms,
            error: None,
        }
    }

    pub fn failed(report: R, duration_ms: u64, error: impl Into<String>) -> Self {
        Self {
            report,
            duration_ms,
            error: Some(error.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Results of the four parallel analysis workers.
#[derive(Debug, Clone)]
pub struct AnalysisResults {
    pub security: WorkerResult<SecurityReport>,
    pub performance: WorkerResult<PerformanceReport>,
    pub style: WorkerResult<StyleReport>,
    pub bugs: WorkerResult<BugReport>,
}

/// A finding from any domain projected into a common shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedIssue {
    pub line: u32,
    pub severity: Severity,
    pub category: Category,
    #[serde(rename = "type")]
    pub issue_type: String,
    pub description: String,
    pub suggestion: String,
    pub impact: String,
}

/// Letter grade derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C-")]
    CMinus,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "F")]
    F,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::AMinus => "A-",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::BMinus => "B-",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::CMinus => "C-",
            Grade::D => "D",
            Grade::F => "F",
        };
        f.write_str(s)
    }
}

/// Four derived sub-metrics, each 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub security: u8,
    pub performance: u8,
    pub maintainability: u8,
    pub readability: u8,
}

/// Issue counts by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    /// Creates counts from a list of merged issues.
    pub fn from_issues(issues: &[MergedIssue]) -> Self {
        let mut counts = Self {
            total: issues.len(),
            ..Self::default()
        };

        for issue in issues {
            match issue.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
                Severity::Unknown => {}
            }
        }

        counts
    }
}

/// Per-worker summary for the security worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityBlock {
    pub score: u8,
    pub risk_level: RiskLevel,
    pub vulnerability_count: usize,
    pub summary: String,
    pub duration_ms: u64,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-worker summary for the performance worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceBlock {
    pub score: u8,
    pub complexity: String,
    pub issue_count: usize,
    pub summary: String,
    pub duration_ms: u64,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-worker summary for the style worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleBlock {
    pub score: u8,
    pub maintainability: MaintainabilityIndex,
    pub issue_count: usize,
    pub summary: String,
    pub duration_ms: u64,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-worker summary for the bug detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BugsBlock {
    pub score: u8,
    pub confidence: String,
    pub bug_count: usize,
    pub summary: String,
    pub duration_ms: u64,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-worker summary for the auto-fix worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoFixBlock {
    pub changes_count: usize,
    pub summary: String,
    pub duration_ms: u64,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-worker summary blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResults {
    pub security: SecurityBlock,
    pub performance: PerformanceBlock,
    pub style: StyleBlock,
    pub bugs: BugsBlock,
    pub autofix: AutoFixBlock,
}

/// Metadata about the review run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub total_issues: usize,
    pub critical_count: usize,
    pub high_count: usize,
    pub medium_count: usize,
    pub low_count: usize,
    /// Wall-clock time of the whole pipeline.
    pub processing_time_ms: u64,
    pub agents_used: usize,
    pub language: String,
    pub model_used: String,
    pub analysis_date: DateTime<Utc>,
}

/// The complete review report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub issues: Vec<MergedIssue>,
    pub summary: String,
    pub score: u8,
    pub grade: Grade,
    pub fixed_code: String,
    pub changes_made: Vec<ChangeEntry>,
    pub metrics: Metrics,
    pub quick_wins: Vec<String>,
    pub agent_results: AgentResults,
    pub metadata: ReportMetadata,
}

/// Lifecycle status carried by a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Started,
    Running,
    Completed,
    Failed,
}

/// Transient notification about a worker or pipeline transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub agent: String,
    pub status: ProgressStatus,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(agent: impl Into<String>, status: ProgressStatus, data: serde_json::Value) -> Self {
        Self {
            agent: agent.into(),
            status,
            data,
            timestamp: Utc::now(),
        }
    }
}
