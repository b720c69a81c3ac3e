//! Uniform adapter around the five review workers.
//!
//! The adapter formats the worker's prompt, calls the backend, and pulls a
//! JSON payload out of whatever text comes back. Backend errors and
//! unparseable output both become a fallback [`WorkerResult`]; nothing
//! escapes as an error.

use crate::agent::backend::Backend;
use crate::agent::prompts;
use crate::models::{
    AutoFixReport, BugReport, PerformanceReport, SecurityReport, StyleReport, WorkerResult,
};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

/// The five workers in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    Security,
    Performance,
    Style,
    Bugs,
    AutoFix,
}

impl WorkerKind {
    pub const ALL: [WorkerKind; 5] = [
        WorkerKind::Security,
        WorkerKind::Performance,
        WorkerKind::Style,
        WorkerKind::Bugs,
        WorkerKind::AutoFix,
    ];

    /// Stable key used in progress events and report blocks.
    pub fn key(&self) -> &'static str {
        match self {
            WorkerKind::Security => "security",
            WorkerKind::Performance => "performance",
            WorkerKind::Style => "style",
            WorkerKind::Bugs => "bugs",
            WorkerKind::AutoFix => "autofix",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            WorkerKind::Security => "Security Agent",
            WorkerKind::Performance => "Performance Agent",
            WorkerKind::Style => "Style Agent",
            WorkerKind::Bugs => "Bug Detector Agent",
            WorkerKind::AutoFix => "Auto-Fix Agent",
        }
    }
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Why a worker invocation fell back.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("backend error: {0}")]
    Backend(#[source] anyhow::Error),

    #[error("unparseable response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A report type produced by one worker.
pub trait WorkerReport: DeserializeOwned + Send + 'static {
    const KIND: WorkerKind;

    /// Neutral content used when the worker fails.
    fn fallback(reason: &str) -> Self;
}

fn unable(reason: &str) -> Option<String> {
    Some(format!("Unable to analyze: {}", reason))
}

impl WorkerReport for SecurityReport {
    const KIND: WorkerKind = WorkerKind::Security;

    fn fallback(reason: &str) -> Self {
        Self {
            vulnerabilities: Vec::new(),
            security_score: None,
            risk_level: Some("none".to_string()),
            summary: unable(reason),
        }
    }
}

impl WorkerReport for PerformanceReport {
    const KIND: WorkerKind = WorkerKind::Performance;

    fn fallback(reason: &str) -> Self {
        Self {
            issues: Vec::new(),
            performance_score: None,
            overall_complexity: Some("N/A".to_string()),
            summary: unable(reason),
        }
    }
}

impl WorkerReport for StyleReport {
    const KIND: WorkerKind = WorkerKind::Style;

    fn fallback(reason: &str) -> Self {
        Self {
            issues: Vec::new(),
            style_score: None,
            maintainability_index: Some("unknown".to_string()),
            summary: unable(reason),
        }
    }
}

impl WorkerReport for BugReport {
    const KIND: WorkerKind = WorkerKind::Bugs;

    fn fallback(reason: &str) -> Self {
        Self {
            bugs: Vec::new(),
            reliability_score: None,
            confidence: Some("unknown".to_string()),
            summary: unable(reason),
        }
    }
}

impl WorkerReport for AutoFixReport {
    const KIND: WorkerKind = WorkerKind::AutoFix;

    fn fallback(reason: &str) -> Self {
        Self {
            fixed_code: None,
            changes_made: Vec::new(),
            improvement_summary: Some(format!("Unable to generate fixes: {}", reason)),
        }
    }
}

/// Strip a surrounding code fence, if any, from a model response.
///
/// Takes everything between the first opening fence and the last closing
/// fence, so fences inside JSON string values stay intact. A language tag
/// such as `json` on the opening fence is skipped. Text without a complete
/// fence is returned trimmed.
pub fn extract_payload(text: &str) -> &str {
    let Some(open) = text.find("```") else {
        return text.trim();
    };

    let body = &text[open + 3..];
    let Some(close) = body.rfind("```") else {
        return text.trim();
    };

    let inner = &body[..close];
    let tag_len = inner
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(inner.len());
    let after_tag = &inner[tag_len..];
    if tag_len > 0 && after_tag.starts_with(char::is_whitespace) {
        after_tag.trim()
    } else {
        inner.trim()
    }
}

/// Parse a worker report from raw model output.
///
/// Tries the reply as-is, then the fenced body, then the outermost
/// `{...}` span of the whole reply.
pub fn parse_report<R: DeserializeOwned>(raw: &str) -> Result<R, serde_json::Error> {
    let trimmed = raw.trim();
    let direct = serde_json::from_str(trimmed);
    if direct.is_ok() {
        return direct;
    }

    let payload = extract_payload(raw);
    if payload != trimmed {
        if let Ok(report) = serde_json::from_str(payload) {
            return Ok(report);
        }
    }

    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => {
            serde_json::from_str(&raw[start..=end]).or(direct)
        }
        _ => direct,
    }
}

/// Runs workers against an injected backend.
#[derive(Clone)]
pub struct WorkerAdapter {
    backend: Arc<dyn Backend>,
}

impl WorkerAdapter {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn model_name(&self) -> &str {
        self.backend.model_name()
    }

    /// Run one of the four analysis workers.
    pub async fn run<R: WorkerReport>(&self, code: &str, language: &str) -> WorkerResult<R> {
        let user_prompt = prompts::analysis_prompt(R::KIND, code, language);
        self.invoke(&user_prompt).await
    }

    /// Run the auto-fix worker over a digest of the merged findings.
    ///
    /// On failure the original code is returned unchanged.
    pub async fn run_autofix(
        &self,
        code: &str,
        language: &str,
        issues_digest: &str,
    ) -> WorkerResult<AutoFixReport> {
        let user_prompt = prompts::autofix_prompt(code, language, issues_digest);
        let mut result: WorkerResult<AutoFixReport> = self.invoke(&user_prompt).await;

        if result.report.fixed_code.is_none() {
            result.report.fixed_code = Some(code.to_string());
        }
        result
    }

    async fn invoke<R: WorkerReport>(&self, user_prompt: &str) -> WorkerResult<R> {
        let started = Instant::now();
        let outcome = self.call::<R>(user_prompt).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(report) => {
                debug!("{} worker finished in {}ms", R::KIND, duration_ms);
                WorkerResult::completed(report, duration_ms)
            }
            Err(e) => {
                let reason = e.to_string();
                warn!("{} worker failed after {}ms: {}", R::KIND, duration_ms, reason);
                WorkerResult::failed(R::fallback(&reason), duration_ms, reason)
            }
        }
    }

    async fn call<R: WorkerReport>(&self, user_prompt: &str) -> Result<R, WorkerError> {
        let raw = self
            .backend
            .generate(prompts::system_prompt(R::KIND), user_prompt)
            .await
            .map_err(WorkerError::Backend)?;

        Ok(parse_report(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct CannedBackend(anyhow::Result<String>);

    #[async_trait]
    impl Backend for CannedBackend {
        async fn generate(&self, _system: &str, _user: &str) -> anyhow::Result<String> {
            match &self.0 {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(anyhow::anyhow!("{}", e)),
            }
        }
    }

    fn adapter(reply: anyhow::Result<&str>) -> WorkerAdapter {
        WorkerAdapter::new(Arc::new(CannedBackend(reply.map(String::from))))
    }

    const SECURITY_JSON: &str = r#"{"vulnerabilities":[{"line":3,"severity":"critical","type":"sqli","description":"raw query","fix":"bind params"}],"security_score":10,"risk_level":"critical","summary":"bad"}"#;

    #[test]
    fn test_extract_payload_strips_json_fence() {
        let text = format!("Here you go:\n```json\n{}\n```\nThanks", SECURITY_JSON);
        assert_eq!(extract_payload(&text), SECURITY_JSON);
    }

    #[test]
    fn test_extract_payload_untagged_fence() {
        assert_eq!(extract_payload("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(extract_payload("```{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn test_extract_payload_without_fence() {
        assert_eq!(extract_payload("  {\"a\":1}\n"), "{\"a\":1}");
        assert_eq!(extract_payload("```json {\"a\":1}"), "```json {\"a\":1}");
    }

    #[test]
    fn test_fenced_and_unfenced_parse_identically() {
        let fenced = format!("```json\n{}\n```", SECURITY_JSON);
        let a: SecurityReport = parse_report(&fenced).unwrap();
        let b: SecurityReport = parse_report(SECURITY_JSON).unwrap();

        assert_eq!(
            serde_json::to_value(&a).unwrap(),
            serde_json::to_value(&b).unwrap()
        );
        assert_eq!(a.vulnerabilities[0].line, 3);
    }

    #[test]
    fn test_fences_inside_string_values_survive() {
        let unfenced = r#"{"fixed_code":"```python\nx = 1\n```","changes_made":[],"improvement_summary":"ok"}"#;
        let fenced = format!("```json\n{}\n```", unfenced);

        let a: AutoFixReport = parse_report(unfenced).unwrap();
        let b: AutoFixReport = parse_report(&fenced).unwrap();

        assert_eq!(a.fixed_code.as_deref(), Some("```python\nx = 1\n```"));
        assert_eq!(
            serde_json::to_value(&a).unwrap(),
            serde_json::to_value(&b).unwrap()
        );
        assert_eq!(extract_payload(&fenced), unfenced);
    }

    #[test]
    fn test_fenced_reply_with_leading_prose_and_inner_fence() {
        let raw = "Here is the fix:\n```json\n{\"fixed_code\":\"```js\\nlet a = 1;\\n```\"}\n```";
        let report: AutoFixReport = parse_report(raw).unwrap();
        assert_eq!(report.fixed_code.as_deref(), Some("```js\nlet a = 1;\n```"));
    }

    #[tokio::test]
    async fn test_autofix_keeps_fenced_fixed_code() {
        let reply = r#"{"fixed_code":"```python\nx = 2\n```","changes_made":[{"line":1,"type":"fix","description":"bump"}]}"#;
        let result = adapter(Ok(reply)).run_autofix("x = 1", "python", "No issues found.").await;

        assert!(!result.is_failed());
        assert_eq!(result.report.fixed_code.as_deref(), Some("```python\nx = 2\n```"));
        assert_eq!(result.report.changes_made.len(), 1);
    }

    #[test]
    fn test_parse_report_with_surrounding_prose() {
        let raw = "Sure! {\"bugs\": [], \"reliability_score\": 90} Hope that helps.";
        let report: BugReport = parse_report(raw).unwrap();
        assert_eq!(report.reliability_score, Some(90));
    }

    #[tokio::test]
    async fn test_run_parses_backend_output() {
        let adapter = adapter(Ok(SECURITY_JSON));
        let result: WorkerResult<SecurityReport> = adapter.run("code", "python").await;

        assert!(!result.is_failed());
        assert_eq!(result.report.security_score, Some(10));
        assert_eq!(result.report.vulnerabilities.len(), 1);
    }

    #[tokio::test]
    async fn test_backend_error_becomes_fallback() {
        let adapter = adapter(Err(anyhow::anyhow!("connection refused")));
        let result: WorkerResult<StyleReport> = adapter.run("code", "python").await;

        assert!(result.is_failed());
        assert!(result.error.as_deref().unwrap().contains("connection refused"));
        assert!(result.report.issues.is_empty());
        assert_eq!(result.report.style_score, None);
        assert!(result.report.summary.unwrap().starts_with("Unable to analyze"));
    }

    #[tokio::test]
    async fn test_garbage_output_becomes_fallback() {
        let adapter = adapter(Ok("I could not review this code, sorry."));
        let result: WorkerResult<PerformanceReport> = adapter.run("code", "python").await;

        assert!(result.is_failed());
        assert_eq!(result.report.overall_complexity.as_deref(), Some("N/A"));
    }

    #[tokio::test]
    async fn test_autofix_failure_returns_original_code() {
        let adapter = adapter(Err(anyhow::anyhow!("timeout")));
        let result = adapter.run_autofix("x = 1", "python", "No issues found.").await;

        assert!(result.is_failed());
        assert_eq!(result.report.fixed_code.as_deref(), Some("x = 1"));
        assert!(result.report.changes_made.is_empty());
    }

    #[test]
    fn test_worker_keys() {
        let keys: Vec<_> = WorkerKind::ALL.iter().map(|k| k.key()).collect();
        assert_eq!(keys, vec!["security", "performance", "style", "bugs", "autofix"]);
        assert_eq!(WorkerKind::Bugs.label(), "Bug Detector Agent");
    }
}
