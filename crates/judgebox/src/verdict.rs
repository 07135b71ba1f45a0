//! Result parsing
//!
//! Turns the raw output of a harness run into a [`Verdict`]. A verdict's
//! `success` says whether the harness ran to completion; how many cases
//! passed is reported separately.
//!
//! Harness output format, one line per case in order, then a summary:
//!
//! ```text
//! pass (5, 7) -> 12
//! fail (-5, -3) -> 0 (expected -8)
//! error (1, 2): ValueError: bad input
//! passed 1/3 tests
//! ```
//!
//! Lines that match none of these forms are ignored.

use serde::{Deserialize, Serialize};

use crate::types::ExecutionOutcome;

/// Longest error summary kept in a verdict, in bytes
const MAX_ERROR_LEN: usize = 500;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    /// The harness ran every case and printed a consistent summary
    Completed,
    /// The wall time limit expired
    TimedOut,
    /// The program exited with a non-zero code (compile error, crash, OOM)
    HarnessFailed,
    /// The sandbox could not run the program
    InfrastructureError,
    /// The program exited cleanly but its output does not add up
    MalformedOutput,
}

/// What one case produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum CaseOutcome {
    /// The function returned; the value as the harness printed it
    Value(String),
    /// The function raised; `<ExceptionType>: <message>`
    Error(String),
}

/// Result of one test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseResult {
    pub args: Vec<i64>,
    pub outcome: CaseOutcome,
    pub expected_match: bool,
}

/// Caller-visible result of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// True iff the harness ran to completion
    pub success: bool,
    pub status: VerdictStatus,
    /// Per-case results in harness order; empty unless the program exited
    /// cleanly
    pub cases: Vec<CaseResult>,
    pub passed: usize,
    pub total: usize,
    /// One-line description of what went wrong
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Captured standard output of the harness
    pub output: String,
}

impl Verdict {
    fn failed(status: VerdictStatus, error: String, output: &str) -> Self {
        Self {
            success: false,
            status,
            cases: Vec::new(),
            passed: 0,
            total: 0,
            error: Some(error),
            output: output.to_owned(),
        }
    }

    /// Whether every case passed
    pub fn all_passed(&self) -> bool {
        self.success && self.passed == self.total
    }

    /// Demote a completed verdict whose case count differs from `total`
    pub fn expect_total(mut self, total: usize) -> Self {
        if self.status == VerdictStatus::Completed && self.total != total {
            self.status = VerdictStatus::MalformedOutput;
            self.success = false;
            self.error = Some(format!(
                "harness reported {} cases, expected {total}",
                self.total
            ));
        }
        self
    }
}

/// A recognized line of harness output
#[derive(Debug, PartialEq, Eq)]
enum Line {
    Case(CaseResult),
    Summary { passed: usize, total: usize },
}

fn parse_args(args: &str) -> Option<Vec<i64>> {
    if args.trim().is_empty() {
        return Some(Vec::new());
    }
    args.split(',').map(|a| a.trim().parse().ok()).collect()
}

fn parse_line(line: &str) -> Option<Line> {
    let line = line.trim_end();

    if let Some(rest) = line.strip_prefix("pass (") {
        let (args, value) = rest.split_once(") -> ")?;
        return Some(Line::Case(CaseResult {
            args: parse_args(args)?,
            outcome: CaseOutcome::Value(value.to_owned()),
            expected_match: true,
        }));
    }

    if let Some(rest) = line.strip_prefix("fail (") {
        let (args, rest) = rest.split_once(") -> ")?;
        let (value, expected) = rest.rsplit_once(" (expected ")?;
        expected.strip_suffix(')')?;
        return Some(Line::Case(CaseResult {
            args: parse_args(args)?,
            outcome: CaseOutcome::Value(value.to_owned()),
            expected_match: false,
        }));
    }

    if let Some(rest) = line.strip_prefix("error (") {
        let (args, message) = rest.split_once("): ")?;
        return Some(Line::Case(CaseResult {
            args: parse_args(args)?,
            outcome: CaseOutcome::Error(message.to_owned()),
            expected_match: false,
        }));
    }

    let counts = line.strip_prefix("passed ")?.strip_suffix(" tests")?;
    let (passed, total) = counts.split_once('/')?;
    Some(Line::Summary {
        passed: passed.parse().ok()?,
        total: total.parse().ok()?,
    })
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_owned();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// Pick the line that best explains a non-zero exit
fn failure_summary(outcome: &ExecutionOutcome) -> String {
    let code = match outcome.exit_code {
        Some(137) => return "killed (possibly out of memory)".to_owned(),
        Some(code) => code,
        None => return "terminated without an exit code".to_owned(),
    };

    let non_empty = |text: &str| -> Vec<String> {
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_owned)
            .collect()
    };
    let stderr = non_empty(&outcome.stderr);
    let stdout = non_empty(&outcome.stdout);

    let line = stderr
        .iter()
        .chain(stdout.iter())
        .find(|l| l.to_ascii_lowercase().contains("error"))
        .or_else(|| stderr.last());

    match line {
        Some(line) => truncate(&format!("exited with code {code}: {line}"), MAX_ERROR_LEN),
        None => format!("exited with code {code}"),
    }
}

/// Interpret an execution outcome
pub fn parse(outcome: &ExecutionOutcome) -> Verdict {
    if let Some(ref message) = outcome.infrastructure_error {
        return Verdict::failed(
            VerdictStatus::InfrastructureError,
            truncate(message, MAX_ERROR_LEN),
            &outcome.stdout,
        );
    }

    if outcome.timed_out {
        return Verdict::failed(
            VerdictStatus::TimedOut,
            format!("time limit exceeded after {:.1}s", outcome.wall_time),
            &outcome.stdout,
        );
    }

    if outcome.exit_code != Some(0) {
        return Verdict::failed(
            VerdictStatus::HarnessFailed,
            failure_summary(outcome),
            &outcome.stdout,
        );
    }

    let mut cases = Vec::new();
    let mut summary = None;
    for line in outcome.stdout.lines() {
        match parse_line(line) {
            Some(Line::Case(case)) => cases.push(case),
            Some(Line::Summary { passed, total }) => summary = Some((passed, total)),
            None => {}
        }
    }

    let passed = cases.iter().filter(|c| c.expected_match).count();
    let total = cases.len();

    let error = match summary {
        None if outcome.output_truncated => {
            Some("harness output has no summary line (output was truncated)".to_owned())
        }
        None => Some("harness output has no summary line".to_owned()),
        Some((k, n)) if (k, n) != (passed, total) => Some(format!(
            "summary reports {k}/{n} but {passed}/{total} case lines were printed"
        )),
        Some(_) => None,
    };

    let status = if error.is_some() {
        VerdictStatus::MalformedOutput
    } else {
        VerdictStatus::Completed
    };

    Verdict {
        success: status == VerdictStatus::Completed,
        status,
        cases,
        passed,
        total,
        error,
        output: outcome.stdout.clone(),
    }
}
