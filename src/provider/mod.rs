//! Collaborator capabilities consumed by the core.
//!
//! These are interfaces, not implementations: profile retrieval, terminology
//! membership, and invariant expression evaluation all live behind traits so
//! the engine itself performs no I/O.

pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::types::{ProfileDefinition, ProfileReference};
use crate::Result;

pub use memory::StaticProfileSource;

/// Supplies parsed profile documents by canonical URL and version.
///
/// `Ok(None)` means the profile is unknown and surfaces to callers as
/// `ProfileNotFound`.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn load(&self, url: &Url, version: Option<&str>) -> Result<Option<ProfileDefinition>>;
}

/// Answers value-set membership queries. Treated as authoritative and
/// side-effect-free from the core's perspective.
#[async_trait]
pub trait TerminologyResolver: Send + Sync {
    async fn is_member_of(
        &self,
        value_set: &str,
        code: &str,
        system: Option<&str>,
    ) -> Result<bool>;
}

/// Evaluates a declarative invariant expression against a resource subtree.
/// Must be deterministic for a given (expression, context) pair.
#[async_trait]
pub trait ExpressionEvaluator: Send + Sync {
    async fn evaluate(&self, expression: &str, context: &Value) -> Result<bool>;
}

/// Internal capability used by the matcher and evaluator to ask whether a
/// subtree conforms to a profile. Implemented by the validation engine with
/// a bounded recursion depth; failure or exhausted depth answers `false`
/// (fail closed).
#[async_trait]
pub trait ProfileProbe: Send + Sync {
    async fn conforms(&self, value: &Value, target: &ProfileReference) -> bool;
}
