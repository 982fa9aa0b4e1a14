//! Validation report assembly: deduplication, deterministic ordering, and
//! the overall outcome.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::types::{Issue, IssueCode, Severity, ValidationReport};

#[derive(Debug, Default)]
pub struct ReportBuilder {
    issues: Vec<Issue>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = Issue>) {
        self.issues.extend(issues);
    }

    /// Orders issues by path (dotted segments lexicographic, array indices
    /// numeric) then severity descending, drops duplicates with identical
    /// (path, code, message), and computes the outcome.
    pub fn build(self, resource: Option<String>, profile: impl Into<String>) -> ValidationReport {
        let mut issues = self.issues;
        issues.sort_by(compare_issues);

        let mut seen: HashSet<(String, IssueCode, String)> = HashSet::new();
        issues.retain(|issue| seen.insert((issue.path.clone(), issue.code, issue.message.clone())));

        let error_count = issues
            .iter()
            .filter(|i| matches!(i.severity, Severity::Fatal | Severity::Error))
            .count();
        let warning_count = issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count();
        let info_count = issues
            .iter()
            .filter(|i| i.severity == Severity::Information)
            .count();

        ValidationReport {
            resource,
            profile: profile.into(),
            valid: error_count == 0,
            issues,
            error_count,
            warning_count,
            info_count,
        }
    }
}

fn compare_issues(a: &Issue, b: &Issue) -> Ordering {
    compare_paths(&a.path, &b.path)
        .then_with(|| b.severity.rank().cmp(&a.severity.rank()))
        .then_with(|| a.message.cmp(&b.message))
}

/// Lexicographic on dotted segments; a segment's trailing `[n]` index
/// compares numerically after the segment name. An unindexed segment sorts
/// before its indexed siblings.
pub(crate) fn compare_paths(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.').map(parse_segment);
    let mut right = b.split('.').map(parse_segment);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = x.0.cmp(y.0).then_with(|| x.1.cmp(&y.1));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

fn parse_segment(segment: &str) -> (&str, Option<u64>) {
    if let Some(open) = segment.rfind('[')
        && segment.ends_with(']')
        && let Ok(index) = segment[open + 1..segment.len() - 1].parse::<u64>()
    {
        return (&segment[..open], Some(index));
    }
    (segment, None)
}
