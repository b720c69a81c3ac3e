//! Fan-out/fan-in review pipeline.
//!
//! ```text
//! idle ─► analyzing ─► merging ─► autofixing ─► assembling ─► done
//!           │ security ─┐
//!           │ performance ├─ join (all four, failures included)
//!           │ style ─────┤
//!           │ bugs ──────┘
//! ```
//!
//! The four analysis workers run as separate tasks and the coordinator
//! waits for every one of them. A failed worker is recorded as its
//! fallback result; it never aborts its siblings. The auto-fix worker runs
//! afterwards over a digest of everything the others found.

use crate::agent::worker::WorkerReport;
use crate::agent::{Backend, WorkerAdapter, WorkerKind};
use crate::analysis::{
    build_autofix_digest, compute_metrics, compute_score, generate_quick_wins, generate_summary,
    grade_for, merge_issues, ScorePolicy, SubScores,
};
use crate::models::{
    AgentResults, AnalysisRequest, AnalysisResults, AutoFixBlock, AutoFixReport, BugReport,
    BugsBlock, PerformanceBlock, PerformanceReport, ProgressEvent, ProgressStatus, Report,
    ReportMetadata, SecurityBlock, SecurityReport, SeverityCounts, StyleBlock, StyleReport,
    WorkerResult,
};
use crate::pipeline::progress::{self, ProgressReceiver, ProgressSink, StreamMessage};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Agent name used for pipeline-level progress events.
pub const ORCHESTRATOR: &str = "orchestrator";

/// Number of analysis workers run in parallel.
pub const ANALYSIS_WORKERS: usize = 4;

/// Request-level and pipeline-level failures.
///
/// Individual worker failures never show up here; they are folded into
/// the report.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Code cannot be empty")]
    EmptyCode,

    #[error("Review pipeline was cancelled")]
    Cancelled,
}

/// Coordinates one review run over a shared backend.
pub struct Coordinator {
    adapter: WorkerAdapter,
    policy: ScorePolicy,
}

impl Coordinator {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            adapter: WorkerAdapter::new(backend),
            policy: ScorePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ScorePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Reject requests that must not reach any worker.
    pub fn validate(request: &AnalysisRequest) -> Result<(), PipelineError> {
        if request.code.trim().is_empty() {
            return Err(PipelineError::EmptyCode);
        }
        Ok(())
    }

    /// Run the pipeline without progress reporting.
    #[allow(dead_code)] // Embedding entry point; the CLI goes through run_with/run_streaming
    pub async fn run(&self, request: &AnalysisRequest) -> Result<Report, PipelineError> {
        self.run_with(request, None, &CancellationToken::new()).await
    }

    /// Run the pipeline, optionally reporting progress, until done or cancelled.
    ///
    /// Cancellation stops the coordinator; workers already launched run to
    /// completion in the background and their results are discarded.
    pub async fn run_with(
        &self,
        request: &AnalysisRequest,
        sink: Option<&ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<Report, PipelineError> {
        Self::validate(request)?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Review pipeline cancelled by caller");
                Err(PipelineError::Cancelled)
            }
            report = self.execute(request, sink) => Ok(report),
        }
    }

    /// Run the pipeline in the background and stream its progress.
    ///
    /// The returned receiver yields progress events followed by exactly
    /// one `Result` or `Error` message, then closes.
    pub fn run_streaming(
        self: &Arc<Self>,
        request: AnalysisRequest,
        cancel: CancellationToken,
    ) -> Result<ProgressReceiver, PipelineError> {
        Self::validate(&request)?;

        let (sink, receiver) = progress::channel();
        let coordinator = Arc::clone(self);

        tokio::spawn(async move {
            let progress = sink.clone();
            let pipeline = tokio::spawn(async move {
                coordinator
                    .run_with(&request, Some(&progress), &cancel)
                    .await
            });

            let terminal = match pipeline.await {
                Ok(Ok(report)) => StreamMessage::Result(Box::new(report)),
                Ok(Err(e)) => StreamMessage::Error {
                    message: e.to_string(),
                },
                Err(e) => {
                    error!("Review pipeline task failed: {}", e);
                    StreamMessage::Error {
                        message: format!("Review pipeline failed: {}", e),
                    }
                }
            };
            sink.finish(terminal);
        });

        Ok(receiver)
    }

    async fn execute(&self, request: &AnalysisRequest, sink: Option<&ProgressSink>) -> Report {
        let pipeline_start = Instant::now();

        info!(
            "Starting review of {} lines of {}",
            request.code.lines().count(),
            request.language
        );
        notify(
            sink,
            ORCHESTRATOR,
            ProgressStatus::Started,
            json!({ "phase": "analysis", "total_agents": ANALYSIS_WORKERS }),
        );

        // Phase 1: analysis workers in parallel
        let code: Arc<str> = Arc::from(request.code.as_str());
        let language: Arc<str> = Arc::from(request.language.as_str());

        let (security, performance, style, bugs) = futures::future::join4(
            self.launch::<SecurityReport>(&code, &language, sink),
            self.launch::<PerformanceReport>(&code, &language, sink),
            self.launch::<StyleReport>(&code, &language, sink),
            self.launch::<BugReport>(&code, &language, sink),
        )
        .await;

        let results = AnalysisResults {
            security,
            performance,
            style,
            bugs,
        };

        let failed = [
            results.security.is_failed(),
            results.performance.is_failed(),
            results.style.is_failed(),
            results.bugs.is_failed(),
        ]
        .iter()
        .filter(|f| **f)
        .count();
        if failed > 0 {
            warn!("{} of {} analysis workers failed", failed, ANALYSIS_WORKERS);
        }

        // Phase 2: merge and score
        info!("Merging worker results");
        notify(
            sink,
            ORCHESTRATOR,
            ProgressStatus::Running,
            json!({ "phase": "merging" }),
        );

        let issues = merge_issues(&results);
        let sub_scores = SubScores::from_results(&results, &self.policy);
        let score = compute_score(&sub_scores);
        let metrics = compute_metrics(&sub_scores);
        let grade = grade_for(score);
        let quick_wins = generate_quick_wins(&issues);
        let summary = generate_summary(&results, &issues, score);

        info!(
            "Merged {} issues, score {}/100 ({})",
            issues.len(),
            score,
            grade
        );

        // Phase 3: auto-fix over the merged findings
        let digest = build_autofix_digest(&results);
        debug!("Auto-fix digest:\n{}", digest);

        let autofix = self.launch_autofix(&code, &language, digest, sink).await;

        // Phase 4: assembly
        let counts = SeverityCounts::from_issues(&issues);
        let processing_time_ms = pipeline_start.elapsed().as_millis() as u64;

        notify(
            sink,
            ORCHESTRATOR,
            ProgressStatus::Completed,
            json!({ "total_time_ms": processing_time_ms }),
        );
        info!("Review pipeline finished in {}ms", processing_time_ms);

        let agent_results = AgentResults {
            security: SecurityBlock {
                score: metrics.security,
                risk_level: results.security.report.risk_level(),
                vulnerability_count: results.security.report.vulnerabilities.len(),
                summary: results.security.report.summary.clone().unwrap_or_default(),
                duration_ms: results.security.duration_ms,
                failed: results.security.is_failed(),
                error: results.security.error.clone(),
            },
            performance: PerformanceBlock {
                score: metrics.performance,
                complexity: results
                    .performance
                    .report
                    .overall_complexity
                    .clone()
                    .unwrap_or_else(|| "N/A".to_string()),
                issue_count: results.performance.report.issues.len(),
                summary: results.performance.report.summary.clone().unwrap_or_default(),
                duration_ms: results.performance.duration_ms,
                failed: results.performance.is_failed(),
                error: results.performance.error.clone(),
            },
            style: StyleBlock {
                score: percent(sub_scores.style),
                maintainability: results.style.report.maintainability_index(),
                issue_count: results.style.report.issues.len(),
                summary: results.style.report.summary.clone().unwrap_or_default(),
                duration_ms: results.style.duration_ms,
                failed: results.style.is_failed(),
                error: results.style.error.clone(),
            },
            bugs: BugsBlock {
                score: percent(sub_scores.bugs),
                confidence: results
                    .bugs
                    .report
                    .confidence
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
                bug_count: results.bugs.report.bugs.len(),
                summary: results.bugs.report.summary.clone().unwrap_or_default(),
                duration_ms: results.bugs.duration_ms,
                failed: results.bugs.is_failed(),
                error: results.bugs.error.clone(),
            },
            autofix: AutoFixBlock {
                changes_count: autofix.report.changes_made.len(),
                summary: autofix.report.improvement_summary.clone().unwrap_or_default(),
                duration_ms: autofix.duration_ms,
                failed: autofix.is_failed(),
                error: autofix.error.clone(),
            },
        };

        Report {
            summary,
            score,
            grade,
            fixed_code: autofix
                .report
                .fixed_code
                .unwrap_or_else(|| request.code.clone()),
            changes_made: autofix.report.changes_made,
            metrics,
            quick_wins,
            agent_results,
            metadata: ReportMetadata {
                total_issues: counts.total,
                critical_count: counts.critical,
                high_count: counts.high,
                medium_count: counts.medium,
                low_count: counts.low,
                processing_time_ms,
                agents_used: WorkerKind::ALL.len(),
                language: request.language.clone(),
                model_used: self.adapter.model_name().to_string(),
                analysis_date: Utc::now(),
            },
            issues,
        }
    }

    /// Spawn one analysis worker and await it, reporting its lifecycle.
    async fn launch<R: WorkerReport>(
        &self,
        code: &Arc<str>,
        language: &Arc<str>,
        sink: Option<&ProgressSink>,
    ) -> WorkerResult<R> {
        let kind = R::KIND;
        let started = Instant::now();
        notify(
            sink,
            kind.key(),
            ProgressStatus::Running,
            json!({ "label": kind.label() }),
        );

        let adapter = self.adapter.clone();
        let code = Arc::clone(code);
        let language = Arc::clone(language);
        let handle = tokio::spawn(async move { adapter.run::<R>(&code, &language).await });

        let result = join_worker(handle, started).await;
        notify_outcome(sink, kind, &result);
        result
    }

    async fn launch_autofix(
        &self,
        code: &Arc<str>,
        language: &Arc<str>,
        digest: String,
        sink: Option<&ProgressSink>,
    ) -> WorkerResult<AutoFixReport> {
        let kind = WorkerKind::AutoFix;
        let started = Instant::now();
        notify(
            sink,
            kind.key(),
            ProgressStatus::Running,
            json!({ "label": kind.label() }),
        );

        let adapter = self.adapter.clone();
        let code = Arc::clone(code);
        let language = Arc::clone(language);
        let handle =
            tokio::spawn(async move { adapter.run_autofix(&code, &language, &digest).await });

        // A panicked task carries no fixed code; assembly substitutes the original
        let result = join_worker(handle, started).await;
        notify_outcome(sink, kind, &result);
        result
    }
}

/// Await a worker task; a task that panicked becomes a fallback result.
async fn join_worker<R: WorkerReport>(
    handle: JoinHandle<WorkerResult<R>>,
    started: Instant,
) -> WorkerResult<R> {
    match handle.await {
        Ok(result) => result,
        Err(e) => {
            let reason = format!("worker task failed: {}", e);
            error!("{} {}", R::KIND, reason);
            WorkerResult::failed(
                R::fallback(&reason),
                started.elapsed().as_millis() as u64,
                reason,
            )
        }
    }
}

fn notify(sink: Option<&ProgressSink>, agent: &str, status: ProgressStatus, data: Value) {
    if let Some(sink) = sink {
        sink.emit(ProgressEvent::new(agent, status, data));
    }
}

fn notify_outcome<R>(sink: Option<&ProgressSink>, kind: WorkerKind, result: &WorkerResult<R>) {
    match &result.error {
        None => notify(
            sink,
            kind.key(),
            ProgressStatus::Completed,
            json!({ "label": kind.label(), "duration_ms": result.duration_ms }),
        ),
        Some(error) => notify(
            sink,
            kind.key(),
            ProgressStatus::Failed,
            json!({ "label": kind.label(), "error": error, "duration_ms": result.duration_ms }),
        ),
    }
}

fn percent(score: i64) -> u8 {
    score.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::prompts::system_prompt;
    use crate::models::{Category, Grade};
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    enum Reply {
        Json(String),
        Fail(&'static str),
        Panic,
        DelayedJson(u64, String),
    }

    /// Backend that answers per worker kind and records every call.
    struct ScriptedBackend {
        replies: HashMap<WorkerKind, Reply>,
        calls: AtomicUsize,
        autofix_prompts: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new() -> Self {
            Self {
                replies: HashMap::new(),
                calls: AtomicUsize::new(0),
                autofix_prompts: Mutex::new(Vec::new()),
            }
        }

        fn reply(mut self, kind: WorkerKind, reply: Reply) -> Self {
            self.replies.insert(kind, reply);
            self
        }

        fn healthy() -> Self {
            Self::new()
                .reply(WorkerKind::Security, json_reply(SECURITY_OK))
                .reply(WorkerKind::Performance, json_reply(PERFORMANCE_OK))
                .reply(WorkerKind::Style, json_reply(STYLE_OK))
                .reply(WorkerKind::Bugs, json_reply(BUGS_OK))
                .reply(WorkerKind::AutoFix, json_reply(AUTOFIX_OK))
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn json_reply(text: &str) -> Reply {
        Reply::Json(text.to_string())
    }

    #[async_trait]
    impl Backend for ScriptedBackend {
        async fn generate(&self, system: &str, user: &str) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            let kind = WorkerKind::ALL
                .into_iter()
                .find(|k| system_prompt(*k) == system)
                .ok_or_else(|| anyhow::anyhow!("unexpected system prompt"))?;

            if kind == WorkerKind::AutoFix {
                self.autofix_prompts.lock().unwrap().push(user.to_string());
            }

            match self.replies.get(&kind) {
                Some(Reply::Json(text)) => Ok(text.clone()),
                Some(Reply::Fail(message)) => Err(anyhow::anyhow!("{}", message)),
                Some(Reply::Panic) => panic!("backend crashed"),
                Some(Reply::DelayedJson(ms, text)) => {
                    tokio::time::sleep(Duration::from_millis(*ms)).await;
                    Ok(text.clone())
                }
                None => Err(anyhow::anyhow!("no reply scripted")),
            }
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    const SECURITY_OK: &str = r#"```json
{"vulnerabilities":[{"line":4,"severity":"critical","type":"sql_injection","cwe":"CWE-89","description":"String-built SQL","impact":"Data theft","fix":"Use bound parameters"}],"security_score":10,"risk_level":"critical","summary":"One injection."}
```"#;
    const PERFORMANCE_OK: &str = r#"{"issues":[],"performance_score":100,"overall_complexity":"O(n)","summary":"Fast enough."}"#;
    const STYLE_OK: &str = r#"{"issues":[],"style_score":100,"maintainability_index":"high","summary":"Clean."}"#;
    const BUGS_OK: &str = r#"{"bugs":[],"reliability_score":100,"confidence":"high","summary":"No bugs."}"#;
    const AUTOFIX_OK: &str = r#"{"fixed_code":"query(sql, params)","changes_made":[{"line":4,"type":"fix","description":"bind params"}],"improvement_summary":"Parameterized the query."}"#;

    fn coordinator(backend: &Arc<ScriptedBackend>) -> Coordinator {
        Coordinator::new(Arc::clone(backend) as Arc<dyn Backend>)
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest::new("cursor.execute('SELECT * FROM t WHERE id=' + uid)", None)
    }

    #[tokio::test]
    async fn test_single_critical_finding_end_to_end() {
        let backend = Arc::new(ScriptedBackend::healthy());
        let report = coordinator(&backend).run(&request()).await.unwrap();

        assert_eq!(report.score, 73);
        assert_eq!(report.grade, Grade::BPlus);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].category, Category::Security);
        assert_eq!(report.metadata.critical_count, 1);
        assert_eq!(report.metadata.total_issues, 1);
        assert_eq!(report.metadata.agents_used, 5);
        assert_eq!(report.metadata.language, "python");
        assert_eq!(report.metadata.model_used, "scripted");
        assert_eq!(report.fixed_code, "query(sql, params)");
        assert_eq!(report.changes_made.len(), 1);
        assert_eq!(report.agent_results.security.vulnerability_count, 1);
        assert_eq!(report.agent_results.performance.complexity, "O(n)");
        assert_eq!(report.agent_results.autofix.changes_count, 1);
        assert!(!report.agent_results.security.failed);
        assert!(report.summary.contains("Security: One injection."));
        assert!(report.quick_wins.len() <= 5);
        assert_eq!(backend.calls(), 5);
    }

    #[tokio::test]
    async fn test_all_zero_scores() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .reply(WorkerKind::Security, json_reply(r#"{"security_score":0}"#))
                .reply(WorkerKind::Performance, json_reply(r#"{"performance_score":0}"#))
                .reply(WorkerKind::Style, json_reply(r#"{"style_score":0}"#))
                .reply(WorkerKind::Bugs, json_reply(r#"{"reliability_score":0}"#))
                .reply(WorkerKind::AutoFix, json_reply(AUTOFIX_OK)),
        );
        let report = coordinator(&backend).run(&request()).await.unwrap();

        assert_eq!(report.score, 0);
        assert_eq!(report.grade, Grade::F);
    }

    #[tokio::test]
    async fn test_empty_code_launches_no_workers() {
        let backend = Arc::new(ScriptedBackend::healthy());
        let coordinator = Arc::new(coordinator(&backend));

        let err = coordinator
            .run(&AnalysisRequest::new("   \n\t", Some("rust")))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::EmptyCode));

        let streamed = coordinator.run_streaming(AnalysisRequest::new("", None), CancellationToken::new());
        assert!(matches!(streamed, Err(PipelineError::EmptyCode)));

        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_total_outage_still_assembles_report() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .reply(WorkerKind::Security, Reply::Fail("backend unavailable"))
                .reply(WorkerKind::Performance, Reply::Fail("backend unavailable"))
                .reply(WorkerKind::Style, Reply::Fail("backend unavailable"))
                .reply(WorkerKind::Bugs, Reply::Fail("backend unavailable"))
                .reply(WorkerKind::AutoFix, Reply::Fail("backend unavailable")),
        );
        let req = request();
        let report = coordinator(&backend).run(&req).await.unwrap();

        assert_eq!(report.metadata.total_issues, 0);
        assert!(report.issues.is_empty());
        // Failed workers are charged the pessimistic default
        assert_eq!(report.score, 0);
        assert_eq!(report.grade, Grade::F);
        assert!(report.agent_results.security.failed);
        assert!(report.agent_results.performance.failed);
        assert!(report.agent_results.style.failed);
        assert!(report.agent_results.bugs.failed);
        assert!(report.agent_results.autofix.failed);
        assert_eq!(report.fixed_code, req.code);

        let prompts = backend.autofix_prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("No issues found."));
        assert_eq!(backend.calls(), 5);
    }

    #[tokio::test]
    async fn test_optimistic_policy_scores_outage_as_perfect() {
        let backend = Arc::new(
            ScriptedBackend::healthy().reply(WorkerKind::Security, Reply::Fail("down")),
        );
        let report = coordinator(&backend)
            .with_policy(ScorePolicy::optimistic())
            .run(&request())
            .await
            .unwrap();

        assert_eq!(report.score, 100);
        assert!(report.agent_results.security.failed);
    }

    #[tokio::test]
    async fn test_each_failed_domain_keeps_other_domains() {
        let kinds = [
            WorkerKind::Security,
            WorkerKind::Performance,
            WorkerKind::Style,
            WorkerKind::Bugs,
        ];
        let with_findings = [
            (WorkerKind::Security, r#"{"vulnerabilities":[{"line":1}],"security_score":50}"#),
            (WorkerKind::Performance, r#"{"issues":[{"line":2}],"performance_score":50}"#),
            (WorkerKind::Style, r#"{"issues":[{"line":3}],"style_score":50}"#),
            (WorkerKind::Bugs, r#"{"bugs":[{"line":4}],"reliability_score":50}"#),
        ];

        for failing in kinds {
            let mut backend = ScriptedBackend::new().reply(WorkerKind::AutoFix, json_reply(AUTOFIX_OK));
            for (kind, body) in with_findings {
                let reply = if kind == failing {
                    Reply::Panic
                } else {
                    json_reply(body)
                };
                backend = backend.reply(kind, reply);
            }
            let backend = Arc::new(backend);
            let report = coordinator(&backend).run(&request()).await.unwrap();

            assert_eq!(report.issues.len(), 3, "failing {:?}", failing);
            let categories: HashSet<_> = report.issues.iter().map(|i| i.category).collect();
            let missing = match failing {
                WorkerKind::Security => Category::Security,
                WorkerKind::Performance => Category::Performance,
                WorkerKind::Style => Category::Style,
                _ => Category::Bug,
            };
            assert!(!categories.contains(&missing));
            assert_eq!(categories.len(), 3);
        }
    }

    #[tokio::test]
    async fn test_autofix_panic_returns_original_code() {
        let backend = Arc::new(ScriptedBackend::healthy().reply(WorkerKind::AutoFix, Reply::Panic));
        let req = request();
        let report = coordinator(&backend).run(&req).await.unwrap();

        assert_eq!(report.fixed_code, req.code);
        assert!(report.changes_made.is_empty());
        assert!(report.agent_results.autofix.failed);
        let error = report.agent_results.autofix.error.as_deref().unwrap();
        assert!(error.contains("worker task failed"));
        // Analysis results are unaffected
        assert!(!report.agent_results.security.failed);
        assert!(!report.issues.is_empty());
    }

    #[tokio::test]
    async fn test_waits_for_slowest_worker() {
        let backend = Arc::new(ScriptedBackend::healthy().reply(
            WorkerKind::Style,
            Reply::DelayedJson(
                50,
                r#"{"issues":[{"line":9,"severity":"low"}],"style_score":80}"#.to_string(),
            ),
        ));
        let report = coordinator(&backend).run(&request()).await.unwrap();

        assert_eq!(report.issues.len(), 2);
        assert!(report.agent_results.style.duration_ms >= 50);
    }

    #[tokio::test]
    async fn test_streaming_event_order() {
        let backend = Arc::new(
            ScriptedBackend::healthy().reply(WorkerKind::Bugs, Reply::Fail("model overloaded")),
        );
        let coordinator = Arc::new(coordinator(&backend));
        let receiver = coordinator
            .run_streaming(request(), CancellationToken::new())
            .unwrap();

        let messages = receiver.collect().await;
        let last = messages.last().unwrap();
        match last {
            StreamMessage::Result(report) => assert!(report.agent_results.bugs.failed),
            other => panic!("expected result, got {:?}", other),
        }
        assert_eq!(messages.iter().filter(|m| m.is_terminal()).count(), 1);

        let events: Vec<_> = messages
            .iter()
            .filter_map(|m| match m {
                StreamMessage::Progress(e) => Some((e.agent.clone(), e.status)),
                _ => None,
            })
            .collect();

        assert_eq!(events[0], (ORCHESTRATOR.to_string(), ProgressStatus::Started));
        assert_eq!(
            events[events.len() - 1],
            (ORCHESTRATOR.to_string(), ProgressStatus::Completed)
        );

        let position = |agent: &str, status: ProgressStatus| {
            events
                .iter()
                .position(|(a, s)| a == agent && *s == status)
                .unwrap_or_else(|| panic!("missing {} {:?}", agent, status))
        };
        for agent in ["security", "performance", "style"] {
            assert!(position(agent, ProgressStatus::Running) < position(agent, ProgressStatus::Completed));
        }
        assert!(position("bugs", ProgressStatus::Running) < position("bugs", ProgressStatus::Failed));

        let merging = events
            .iter()
            .position(|(a, s)| a == ORCHESTRATOR && *s == ProgressStatus::Running)
            .unwrap();
        assert!(position("bugs", ProgressStatus::Failed) < merging);
        assert!(merging < position("autofix", ProgressStatus::Running));
        assert!(position("autofix", ProgressStatus::Running) < position("autofix", ProgressStatus::Completed));
    }

    #[tokio::test]
    async fn test_cancellation_ends_stream_with_error() {
        let backend = Arc::new(ScriptedBackend::healthy().reply(
            WorkerKind::Security,
            Reply::DelayedJson(5_000, SECURITY_OK.to_string()),
        ));
        let coordinator = Arc::new(coordinator(&backend));
        let cancel = CancellationToken::new();
        let mut receiver = coordinator.run_streaming(request(), cancel.clone()).unwrap();

        cancel.cancel();

        let mut last = None;
        while let Some(message) = receiver.recv().await {
            last = Some(message);
        }
        match last {
            Some(StreamMessage::Error { message }) => assert!(message.contains("cancelled")),
            other => panic!("expected error, got {:?}", other),
        }
    }
}
