//! Merge, scoring and insight stages.
//!
//! These run sequentially after the parallel analysis phase, over
//! already-normalized worker results.

pub mod insights;
pub mod merger;
pub mod scoring;

pub use insights::{generate_quick_wins, generate_summary};
pub use merger::{build_autofix_digest, merge_issues};
pub use scoring::{compute_metrics, compute_score, grade_for, ScorePolicy, SubScores};
