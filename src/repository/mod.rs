//! Profile repository: lookup, derivation-chain resolution, and snapshot
//! caching.

pub mod builtin;
pub mod merge;

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::debug;
use url::Url;

use crate::provider::ProfileSource;
use crate::types::{ElementDefinition, ProfileReference, ResolvedSnapshot};
use crate::{FhirGuardError, Result};

type CacheKey = (String, Option<String>);
type SnapshotCell = Arc<OnceCell<Arc<ResolvedSnapshot>>>;

/// Stores parsed profile definitions behind a [`ProfileSource`] and resolves
/// full snapshots by walking each profile's derivation chain.
///
/// Resolved snapshots are cached for the repository's lifetime, keyed by
/// (url, version), with per-key single-flight: concurrent first resolutions
/// of the same key do the work once and all callers observe the same
/// snapshot. Failed resolutions are not cached.
pub struct ProfileRepository {
    source: Arc<dyn ProfileSource>,
    core_types: RwLock<HashMap<String, Vec<ElementDefinition>>>,
    cache: RwLock<HashMap<CacheKey, SnapshotCell>>,
}

impl ProfileRepository {
    pub fn new(source: Arc<dyn ProfileSource>) -> Self {
        Self {
            source,
            core_types: RwLock::new(builtin::core_type_table()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Registers (or replaces) the intrinsic element table for a core type.
    pub async fn register_core_type(
        &self,
        name: impl Into<String>,
        elements: Vec<ElementDefinition>,
    ) {
        self.core_types.write().await.insert(name.into(), elements);
    }

    /// Resolves the full snapshot for a canonical URL and optional version.
    pub async fn resolve(
        &self,
        url: &Url,
        version: Option<&str>,
    ) -> Result<Arc<ResolvedSnapshot>> {
        let key: CacheKey = (url.to_string(), version.map(str::to_string));

        let cell = {
            let cache = self.cache.read().await;
            cache.get(&key).cloned()
        };
        let cell = match cell {
            Some(cell) => cell,
            None => {
                let mut cache = self.cache.write().await;
                cache
                    .entry(key)
                    .or_insert_with(|| Arc::new(OnceCell::new()))
                    .clone()
            }
        };

        let snapshot = cell
            .get_or_try_init(|| async {
                debug!(url = %url, version = ?version, "resolving profile snapshot");
                self.resolve_chain(url.clone(), version.map(str::to_string), Vec::new())
                    .await
                    .map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(snapshot))
    }

    /// Convenience lookup by [`ProfileReference`].
    pub async fn resolve_reference(
        &self,
        reference: &ProfileReference,
    ) -> Result<Arc<ResolvedSnapshot>> {
        self.resolve(&reference.url, reference.version.as_deref())
            .await
    }

    /// Recursive chain resolution with a visited set for cycle detection.
    /// Bypasses the snapshot cache deliberately: a chain re-entering a key
    /// already being initialized would deadlock on its cell.
    fn resolve_chain(
        &self,
        url: Url,
        version: Option<String>,
        mut visited: Vec<(String, String)>,
    ) -> BoxFuture<'_, Result<ResolvedSnapshot>> {
        Box::pin(async move {
            let profile = self
                .source
                .load(&url, version.as_deref())
                .await?
                .ok_or_else(|| {
                    FhirGuardError::profile_not_found(url.as_str(), version.as_deref())
                })?;

            let key = (profile.url.to_string(), profile.version.clone());
            if visited.contains(&key) {
                let chain = visited
                    .iter()
                    .map(|(u, v)| format!("{u}|{v}"))
                    .chain(std::iter::once(format!("{}|{}", key.0, key.1)))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(FhirGuardError::CyclicDerivation { chain });
            }
            visited.push(key);

            let (resource_type, base_elements) = match &profile.base {
                None => {
                    let core_types = self.core_types.read().await;
                    let elements = core_types
                        .get(&profile.resource_type)
                        .cloned()
                        .ok_or_else(|| FhirGuardError::UnknownCoreType {
                            name: profile.resource_type.clone(),
                        })?;
                    (profile.resource_type.clone(), elements)
                }
                Some(base) => {
                    let base_snapshot = self
                        .resolve_chain(base.url.clone(), base.version.clone(), visited)
                        .await?;
                    if base_snapshot.resource_type() != profile.resource_type {
                        return Err(FhirGuardError::invalid_constraint(
                            &profile.resource_type,
                            format!(
                                "profile type '{}' does not match base type '{}'",
                                profile.resource_type,
                                base_snapshot.resource_type()
                            ),
                        ));
                    }
                    (
                        base_snapshot.resource_type().to_string(),
                        base_snapshot.elements().to_vec(),
                    )
                }
            };

            let merged = merge::apply_differential(base_elements, &profile.differential)?;
            ResolvedSnapshot::new(profile.reference(), resource_type, merged)
        })
    }
}

impl std::fmt::Debug for ProfileRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileRepository").finish_non_exhaustive()
    }
}
