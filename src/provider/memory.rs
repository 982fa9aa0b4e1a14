use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use url::Url;

use crate::provider::ProfileSource;
use crate::types::ProfileDefinition;
use crate::Result;

/// In-memory profile source for embedding and tests. Clones share the
/// underlying map.
#[derive(Debug, Default)]
pub struct StaticProfileSource {
    profiles: Arc<RwLock<HashMap<(String, String), ProfileDefinition>>>,
}

impl StaticProfileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, profile: ProfileDefinition) {
        let key = (profile.url.to_string(), profile.version.clone());
        self.profiles.write().await.insert(key, profile);
    }

    pub async fn len(&self) -> usize {
        self.profiles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.profiles.read().await.is_empty()
    }
}

#[async_trait]
impl ProfileSource for StaticProfileSource {
    async fn load(&self, url: &Url, version: Option<&str>) -> Result<Option<ProfileDefinition>> {
        let profiles = self.profiles.read().await;
        match version {
            Some(version) => {
                Ok(profiles.get(&(url.to_string(), version.to_string())).cloned())
            }
            // Unversioned reference: highest registered version for the URL.
            None => {
                let url = url.to_string();
                Ok(profiles
                    .iter()
                    .filter(|((u, _), _)| *u == url)
                    .max_by(|((_, a), _), ((_, b), _)| compare_versions(a, b))
                    .map(|(_, profile)| profile.clone()))
            }
        }
    }
}

/// Orders versions by dot-separated segments, numeric where both segments
/// parse as integers, lexicographic otherwise. `10.0.0` > `9.0.0`.
fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => x.cmp(y),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

impl Clone for StaticProfileSource {
    fn clone(&self) -> Self {
        Self {
            profiles: Arc::clone(&self.profiles),
        }
    }
}
