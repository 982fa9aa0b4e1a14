//! Validation engine orchestration.
//!
//! `validate` is a pure function of its inputs: resolve the profile
//! snapshot, walk the instance against the element tree in path order,
//! evaluate every constraint, and build the ordered report. It fails only
//! when profile resolution itself fails; instance defects always land in
//! the report.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use crate::evaluator::ConstraintEvaluator;
use crate::matcher::slicing::PartitionOutcome;
use crate::matcher::{self, MatchOutcome, Occurrence, ParentMatch};
use crate::provider::{ExpressionEvaluator, ProfileProbe, TerminologyResolver};
use crate::report::ReportBuilder;
use crate::repository::ProfileRepository;
use crate::types::{Issue, IssueCode, ProfileReference, ValidationReport};
use crate::Result;

/// Bound on nested profile validation (target-profile type checks and
/// profile-kind slice discriminators). Exceeding it fails closed.
pub const MAX_PROFILE_DEPTH: usize = 16;

pub struct ValidationEngine {
    repository: Arc<ProfileRepository>,
    evaluator: ConstraintEvaluator,
}

impl ValidationEngine {
    pub fn new(repository: Arc<ProfileRepository>) -> Self {
        Self {
            repository,
            evaluator: ConstraintEvaluator::new(),
        }
    }

    pub fn with_terminology(mut self, terminology: Arc<dyn TerminologyResolver>) -> Self {
        self.evaluator = self.evaluator.with_terminology(terminology);
        self
    }

    pub fn with_expressions(mut self, expressions: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = self.evaluator.with_expressions(expressions);
        self
    }

    pub fn repository(&self) -> &Arc<ProfileRepository> {
        &self.repository
    }

    /// Validates a resource instance against the referenced profile.
    pub async fn validate(
        &self,
        resource: &Value,
        url: &Url,
        version: Option<&str>,
    ) -> Result<ValidationReport> {
        self.validate_at_depth(resource, url, version, 0).await
    }

    pub async fn validate_reference(
        &self,
        resource: &Value,
        reference: &ProfileReference,
    ) -> Result<ValidationReport> {
        self.validate(resource, &reference.url, reference.version.as_deref())
            .await
    }

    fn validate_at_depth<'a>(
        &'a self,
        resource: &'a Value,
        url: &'a Url,
        version: Option<&'a str>,
        depth: usize,
    ) -> BoxFuture<'a, Result<ValidationReport>> {
        Box::pin(async move {
            let snapshot = self.repository.resolve(url, version).await?;
            let profile_display = snapshot.profile().to_string();
            debug!(profile = %profile_display, depth, "validating resource");

            let mut builder = ReportBuilder::new();
            let root_path = snapshot.resource_type().to_string();

            if let Some(declared) = resource.get("resourceType").and_then(Value::as_str)
                && declared != snapshot.resource_type()
            {
                builder.push(Issue::fatal(
                    IssueCode::Structure,
                    &root_path,
                    format!(
                        "resource type '{declared}' does not match profile type '{}'",
                        snapshot.resource_type()
                    ),
                ));
                return Ok(builder.build(resource_reference(resource, declared), profile_display));
            }

            let probe = EngineProbe {
                engine: self,
                depth,
            };
            let mut table: HashMap<String, Vec<Occurrence<'a>>> = HashMap::new();

            for element in snapshot.elements() {
                let mut outcome = if element.is_root() {
                    MatchOutcome {
                        groups: vec![ParentMatch {
                            base_path: element.path.clone(),
                            occurrences: vec![Occurrence::new(&element.path, resource)],
                        }],
                        issues: Vec::new(),
                    }
                } else {
                    let parent = element.parent_path().unwrap_or(&root_path);
                    let parents = table.get(parent).cloned().unwrap_or_default();
                    matcher::match_element(element, &parents)
                };
                builder.extend(std::mem::take(&mut outcome.issues));

                let mut partitions: Vec<PartitionOutcome<'a>> = Vec::new();
                if let Some(slicing) = &element.slicing {
                    for group in &outcome.groups {
                        let mut partition =
                            matcher::slicing::partition(slicing, group, &probe).await;
                        builder.extend(std::mem::take(&mut partition.issues));
                        partitions.push(partition);
                    }
                }

                builder.extend(
                    self.evaluator
                        .evaluate(element, &outcome, &partitions, &probe)
                        .await,
                );

                table.insert(element.path.clone(), outcome.into_occurrences());
            }

            Ok(builder.build(
                resource_reference(resource, snapshot.resource_type()),
                profile_display,
            ))
        })
    }
}

impl std::fmt::Debug for ValidationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationEngine").finish_non_exhaustive()
    }
}

fn resource_reference(resource: &Value, resource_type: &str) -> Option<String> {
    let declared = resource
        .get("resourceType")
        .and_then(Value::as_str)
        .unwrap_or(resource_type);
    match resource.get("id").and_then(Value::as_str) {
        Some(id) => Some(format!("{declared}/{id}")),
        None => Some(declared.to_string()),
    }
}

/// Answers profile-conformance questions for the matcher and evaluator by
/// recursing into the engine with a shortened depth budget.
struct EngineProbe<'e> {
    engine: &'e ValidationEngine,
    depth: usize,
}

#[async_trait]
impl ProfileProbe for EngineProbe<'_> {
    async fn conforms(&self, value: &Value, target: &ProfileReference) -> bool {
        if self.depth + 1 >= MAX_PROFILE_DEPTH {
            warn!(profile = %target, "profile recursion depth exhausted, failing closed");
            return false;
        }
        match self
            .engine
            .validate_at_depth(value, &target.url, target.version.as_deref(), self.depth + 1)
            .await
        {
            Ok(report) => report.valid,
            Err(error) => {
                debug!(profile = %target, %error, "nested profile validation failed, failing closed");
                false
            }
        }
    }
}
