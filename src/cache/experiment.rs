use std::{collections::BTreeMap, sync::Arc, time::Duration};

use super::{build_cache, canonical_custom_ids, ExpiringLruCache};
use crate::interpreter::models::ExperimentResponse;

/// Caches experiment payloads per subject so repeated fetches skip the network.
pub struct ExperimentCacheManager {
    cache: Option<ExpiringLruCache<String, Arc<ExperimentResponse>>>,
}

impl ExperimentCacheManager {
    /// A `size` of 0 disables the cache.
    pub fn new(ttl: Duration, size: usize) -> Self {
        Self {
            cache: build_cache(size, ttl),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Returns the cached payload for the subject, but only if one of its
    /// experiments defines `param_name`. A payload fetched for other
    /// variables can't tell whether `param_name` is in an experiment.
    pub fn get_cached(
        &self,
        distinct_id: &str,
        is_login_id: bool,
        custom_ids: &BTreeMap<String, String>,
        param_name: &str,
    ) -> Option<Arc<ExperimentResponse>> {
        let cache = self.cache.as_ref()?;
        let payload = cache.get(&generate_key(distinct_id, is_login_id, custom_ids))?;
        payload.has_variable(param_name).then_some(payload)
    }

    pub fn set_cached(
        &self,
        distinct_id: &str,
        is_login_id: bool,
        custom_ids: &BTreeMap<String, String>,
        payload: Arc<ExperimentResponse>,
    ) {
        if let Some(cache) = &self.cache {
            cache.set(generate_key(distinct_id, is_login_id, custom_ids), payload);
        }
    }
}

fn generate_key(
    distinct_id: &str,
    is_login_id: bool,
    custom_ids: &BTreeMap<String, String>,
) -> String {
    format!(
        "{}_{}_{}",
        distinct_id,
        is_login_id,
        canonical_custom_ids(custom_ids)
    )
}
