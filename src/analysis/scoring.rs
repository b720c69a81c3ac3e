//! Composite score, sub-metrics and letter grade.

use crate::models::{AnalysisResults, Grade, Metrics, WorkerResult};
use serde::{Deserialize, Serialize};

const SECURITY_WEIGHT: f64 = 0.30;
const PERFORMANCE_WEIGHT: f64 = 0.20;
const STYLE_WEIGHT: f64 = 0.15;
const BUGS_WEIGHT: f64 = 0.35;

/// Score used when a worker succeeded but did not report its sub-score.
const MISSING_SCORE: i64 = 100;

/// How sub-scores are filled in for workers that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorePolicy {
    /// Sub-score charged for a failed worker.
    pub failed_worker_score: i64,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self {
            failed_worker_score: 0,
        }
    }
}

impl ScorePolicy {
    /// Treat failed workers as if they found nothing wrong.
    #[allow(dead_code)] // Legacy scoring, selectable via config
    pub fn optimistic() -> Self {
        Self {
            failed_worker_score: MISSING_SCORE,
        }
    }
}

/// The four worker sub-scores after failure and missing-field defaulting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubScores {
    pub security: i64,
    pub performance: i64,
    pub style: i64,
    pub bugs: i64,
}

impl SubScores {
    pub fn from_results(results: &AnalysisResults, policy: &ScorePolicy) -> Self {
        Self {
            security: effective(&results.security, |r| r.security_score, policy),
            performance: effective(&results.performance, |r| r.performance_score, policy),
            style: effective(&results.style, |r| r.style_score, policy),
            bugs: effective(&results.bugs, |r| r.reliability_score, policy),
        }
    }
}

fn effective<R>(
    result: &WorkerResult<R>,
    score: impl Fn(&R) -> Option<i64>,
    policy: &ScorePolicy,
) -> i64 {
    if result.is_failed() {
        policy.failed_worker_score
    } else {
        score(&result.report).unwrap_or(MISSING_SCORE)
    }
}

fn clamp_percent(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

/// Weighted composite score in `[0, 100]`.
pub fn compute_score(scores: &SubScores) -> u8 {
    let weighted = scores.security as f64 * SECURITY_WEIGHT
        + scores.performance as f64 * PERFORMANCE_WEIGHT
        + scores.style as f64 * STYLE_WEIGHT
        + scores.bugs as f64 * BUGS_WEIGHT;

    clamp_percent(weighted)
}

/// Derived sub-metrics.
///
/// Maintainability blends style with reliability; readability is mostly
/// style with a performance component.
pub fn compute_metrics(scores: &SubScores) -> Metrics {
    let style = scores.style as f64;

    Metrics {
        security: clamp_percent(scores.security as f64),
        performance: clamp_percent(scores.performance as f64),
        maintainability: clamp_percent(style * 0.6 + scores.bugs as f64 * 0.4),
        readability: clamp_percent(style * 0.8 + scores.performance as f64 * 0.2),
    }
}

/// Letter grade for a composite score.
pub fn grade_for(score: u8) -> Grade {
    match score {
        95..=u8::MAX => Grade::APlus,
        88..=94 => Grade::A,
        80..=87 => Grade::AMinus,
        75..=79 => Grade::BPlus,
        70..=74 => Grade::B,
        65..=69 => Grade::BMinus,
        60..=64 => Grade::CPlus,
        55..=59 => Grade::C,
        50..=54 => Grade::CMinus,
        40..=49 => Grade::D,
        _ => Grade::F,
    }
}
