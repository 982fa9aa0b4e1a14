use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a single validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Fatal,
    Error,
    Warning,
    Information,
}

impl Severity {
    /// Ordering weight, highest first. Used by the report builder.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Fatal => 3,
            Severity::Error => 2,
            Severity::Warning => 1,
            Severity::Information => 0,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Severity::Fatal | Severity::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Fatal => "fatal",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Information => "information",
        };
        write!(f, "{s}")
    }
}

/// Category of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCode {
    Structure,
    Cardinality,
    Value,
    CodeInvalid,
    Invariant,
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueCode::Structure => "structure",
            IssueCode::Cardinality => "cardinality",
            IssueCode::Value => "value",
            IssueCode::CodeInvalid => "code-invalid",
            IssueCode::Invariant => "invariant",
        };
        write!(f, "{s}")
    }
}

/// A single path-addressed validation finding. Value-typed and immutable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Issue {
    pub path: String,
    pub severity: Severity,
    pub code: IssueCode,
    pub message: String,
}

impl Issue {
    pub fn new(
        severity: Severity,
        code: IssueCode,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            severity,
            code,
            message: message.into(),
        }
    }

    pub fn fatal(code: IssueCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Fatal, code, path, message)
    }

    pub fn error(code: IssueCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, path, message)
    }

    pub fn warning(code: IssueCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, path, message)
    }

    pub fn information(
        code: IssueCode,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Information, code, path, message)
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} at {}: {}",
            self.severity, self.code, self.path, self.message
        )
    }
}

/// Outcome of a single `validate` call: ordered, deduplicated issues plus
/// an overall verdict. Produced once and never mutated thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Reference to the validated resource (`Type/id` when the instance
    /// carries an id, otherwise just the type).
    pub resource: Option<String>,

    /// Canonical reference of the profile validated against.
    pub profile: String,

    pub issues: Vec<Issue>,

    /// `true` iff no issue has fatal or error severity.
    pub valid: bool,

    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
}

impl ValidationReport {
    pub fn has_warnings(&self) -> bool {
        self.warning_count > 0
    }

    /// Issues filtered to one severity.
    pub fn issues_with_severity(&self, severity: Severity) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }
}
