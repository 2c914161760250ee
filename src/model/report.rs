//! Non-fatal parse diagnostics.
//!
//! Fatal problems abort parsing with an [`OmeError`](crate::OmeError).
//! Everything the parser tolerates is recorded here instead, so callers
//! decide whether a warning matters to them.

use serde::Serialize;
use std::fmt;

/// Diagnostics collected while parsing a document.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ParseReport {
    /// All issues, in the order they were found.
    pub issues: Vec<ParseIssue>,
}

impl ParseReport {
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    pub fn add(&mut self, issue: ParseIssue) {
        self.issues.push(issue);
    }

    pub fn warning_count(&self) -> usize {
        self.issues.len()
    }

    /// Returns true if there are no issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of issues with the given code.
    pub fn count(&self, code: IssueCode) -> usize {
        self.issues.iter().filter(|i| i.code == code).count()
    }
}

impl fmt::Display for ParseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return writeln!(f, "Check passed: no issues found");
        }

        writeln!(
            f,
            "Check completed with {} warning(s):",
            self.warning_count()
        )?;
        writeln!(f)?;

        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }

        Ok(())
    }
}

/// A single tolerated problem.
#[derive(Clone, Debug, Serialize)]
pub struct ParseIssue {
    /// A stable code for the issue type.
    pub code: IssueCode,

    /// A human-readable description of the issue.
    pub message: String,

    /// The element or object the issue was found on.
    pub context: String,
}

impl ParseIssue {
    pub fn new(code: IssueCode, message: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: context.into(),
        }
    }
}

impl fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[WARN ] {:?} in {}: {}", self.code, self.context, self.message)
    }
}

/// A stable code identifying the type of issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum IssueCode {
    /// An element's tag differs from the type it was parsed as.
    TagNameMismatch,
    /// A later object took over an ID under the last-write-wins policy.
    DuplicateIdReplaced,
}
