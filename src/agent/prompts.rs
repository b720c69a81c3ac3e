//! System prompts and user-prompt builders for each worker.

use crate::agent::worker::WorkerKind;

/// Returns the system prompt for a worker.
pub fn system_prompt(kind: WorkerKind) -> &'static str {
    match kind {
        WorkerKind::Security => SECURITY_SYSTEM_PROMPT,
        WorkerKind::Performance => PERFORMANCE_SYSTEM_PROMPT,
        WorkerKind::Style => STYLE_SYSTEM_PROMPT,
        WorkerKind::Bugs => BUG_DETECTOR_SYSTEM_PROMPT,
        WorkerKind::AutoFix => AUTOFIX_SYSTEM_PROMPT,
    }
}

/// Builds the user prompt for one of the four analysis workers.
pub fn analysis_prompt(kind: WorkerKind, code: &str, language: &str) -> String {
    let focus = match kind {
        WorkerKind::Security => "security vulnerabilities",
        WorkerKind::Performance => "performance issues",
        WorkerKind::Style => "style and maintainability",
        WorkerKind::Bugs => "bugs and logic errors",
        WorkerKind::AutoFix => "issues that need fixing",
    };

    format!(
        "Language: {language}\n\nAnalyze this code for {focus}:\n```{language}\n{code}\n```"
    )
}

/// Builds the user prompt for the auto-fix worker.
pub fn autofix_prompt(code: &str, language: &str, issues_digest: &str) -> String {
    format!(
        "Language: {language}\n\n\
         Original code:\n```{language}\n{code}\n```\n\n\
         Issues found by other agents:\n{issues_digest}\n\n\
         Generate the fixed version of this code addressing ALL issues above."
    )
}

const SECURITY_SYSTEM_PROMPT: &str = r#"You are a senior security engineer specializing in code security auditing.
Analyze the given code for security vulnerabilities including but not limited to:
SQL injection, cross-site scripting, command injection, path traversal,
hardcoded secrets, insecure cryptography, missing input validation,
authentication and authorization flaws, insecure deserialization and SSRF.

Return a JSON object with this exact structure:
{
  "vulnerabilities": [
    {
      "line": <int>,
      "severity": "critical|high|medium|low",
      "type": "<vulnerability type>",
      "cwe": "<CWE ID if applicable>",
      "description": "<clear description>",
      "impact": "<what could happen>",
      "fix": "<how to fix it>"
    }
  ],
  "security_score": <0-100, higher is more secure>,
  "risk_level": "critical|high|medium|low|none",
  "summary": "<brief security assessment>"
}

Only return valid JSON. No other text."#;

const PERFORMANCE_SYSTEM_PROMPT: &str = r#"You are a senior performance engineer specializing in code optimization.
Analyze the given code for performance issues including:
inefficient algorithms, excessive allocation, redundant iterations,
N+1 query patterns, missing caching, blocking calls in async code,
resource leaks and poorly chosen data structures.

Return a JSON object with this exact structure:
{
  "issues": [
    {
      "line": <int>,
      "severity": "critical|high|medium|low",
      "type": "<issue type>",
      "current_complexity": "<O(n^2) etc if applicable>",
      "description": "<clear description of the bottleneck>",
      "optimization": "<specific optimization suggestion>",
      "estimated_improvement": "<how much faster/better>"
    }
  ],
  "performance_score": <0-100, higher is better performing>,
  "overall_complexity": "<dominant time complexity>",
  "summary": "<brief performance assessment>"
}

Only return valid JSON. No other text."#;

const STYLE_SYSTEM_PROMPT: &str = r#"You are a senior code quality engineer who enforces best practices and coding standards.
Analyze the given code for style and maintainability issues including:
naming conventions, formatting, missing documentation, duplication,
function and class design, error handling patterns, import organization,
magic numbers, dead code and missing type annotations.

Return a JSON object with this exact structure:
{
  "issues": [
    {
      "line": <int>,
      "severity": "critical|high|medium|low",
      "category": "naming|formatting|documentation|design|error_handling|imports|types|other",
      "description": "<clear description>",
      "suggestion": "<specific improvement>",
      "standard": "<which standard/guideline this violates>"
    }
  ],
  "style_score": <0-100, higher is better>,
  "maintainability_index": "<low|medium|high>",
  "summary": "<brief style assessment>"
}

Only return valid JSON. No other text."#;

const BUG_DETECTOR_SYSTEM_PROMPT: &str = r#"You are a senior QA engineer and bug hunter specializing in finding logic errors.
Analyze the given code for bugs including:
incorrect conditionals, off-by-one errors, null references, race conditions,
unhandled edge cases, type mismatches, wrong return values, missing
break/return statements, infinite loops and integer overflow.

Return a JSON object with this exact structure:
{
  "bugs": [
    {
      "line": <int>,
      "severity": "critical|high|medium|low",
      "type": "<bug type>",
      "description": "<clear description of the bug>",
      "impact": "<what could go wrong>",
      "fix": "<how to fix it>",
      "test_case": "<a test case that would expose this bug>"
    }
  ],
  "reliability_score": <0-100, higher means fewer bugs>,
  "confidence": "<how confident you are in the findings>",
  "summary": "<brief bug assessment>"
}

Only return valid JSON. No other text."#;

const AUTOFIX_SYSTEM_PROMPT: &str = r#"You are a senior software engineer who specializes in refactoring and fixing code.
Given the original code AND a list of identified issues, generate the FIXED version of the code.

Requirements:
- Apply ALL fixes for bugs, security issues, performance problems, and style issues
- Keep the same overall structure and logic intent
- Add proper error handling where missing
- Add documentation where missing

Return a JSON object with this exact structure:
{
  "fixed_code": "<the complete fixed code>",
  "changes_made": [
    {
      "line": <int>,
      "type": "fix|refactor|optimization|documentation",
      "description": "<what was changed and why>"
    }
  ],
  "improvement_summary": "<what was improved overall>"
}

Only return valid JSON. No other text."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompts_are_distinct() {
        let prompts: Vec<_> = WorkerKind::ALL.iter().map(|k| system_prompt(*k)).collect();
        for (i, a) in prompts.iter().enumerate() {
            for b in &prompts[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_analysis_prompt_embeds_code() {
        let prompt = analysis_prompt(WorkerKind::Performance, "for x in y: pass", "python");
        assert!(prompt.starts_with("Language: python"));
        assert!(prompt.contains("performance issues"));
        assert!(prompt.contains("```python\nfor x in y: pass\n```"));
    }

    #[test]
    fn test_analysis_prompt_format() {
        let prompt = analysis_prompt(WorkerKind::Security, "eval(x)", "javascript");
        assert_eq!(
            prompt,
            "Language: javascript\n\nAnalyze this code for security vulnerabilities:\n```javascript\neval(x)\n```"
        );

        let focus = |kind| {
            let prompt = analysis_prompt(kind, "x", "go");
            let rest = &prompt["Language: go\n\nAnalyze this code for ".len()..];
            rest[..rest.find(":\n```go").unwrap()].to_string()
        };
        assert_eq!(focus(WorkerKind::Style), "style and maintainability");
        assert_eq!(focus(WorkerKind::Bugs), "bugs and logic errors");
        assert_eq!(focus(WorkerKind::AutoFix), "issues that need fixing");
    }

    #[test]
    fn test_autofix_prompt_layout() {
        let prompt = autofix_prompt("x = 1", "python", "[BUG] Line 1: bad");
        let code_at = prompt.find("Original code:").unwrap();
        let digest_at = prompt.find("Issues found by other agents:\n[BUG] Line 1: bad").unwrap();

        assert!(prompt.starts_with("Language: python\n\n"));
        assert!(code_at < digest_at);
        assert!(prompt.ends_with("addressing ALL issues above."));
    }

    #[test]
    fn test_autofix_prompt_embeds_digest() {
        let prompt = autofix_prompt("x = 1", "python", "[BUG] Line 1: bad");
        assert!(prompt.contains("Issues found by other agents:\n[BUG] Line 1: bad"));
        assert!(prompt.contains("Original code:\n```python\nx = 1\n```"));
    }
}
