use std::{collections::BTreeMap, time::Duration};

use super::{build_cache, canonical_custom_ids, ExpiringLruCache};

/// Remembers which exposures were already reported.
///
/// With a disabled cache nothing is remembered and every exposure is
/// reported again.
pub struct EventCacheManager {
    cache: Option<ExpiringLruCache<String, ()>>,
}

impl EventCacheManager {
    /// A `size` of 0 disables the cache.
    pub fn new(ttl: Duration, size: usize) -> Self {
        Self {
            cache: build_cache(size, ttl),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.cache.is_some()
    }

    pub fn is_event_recorded(
        &self,
        distinct_id: &str,
        is_login_id: bool,
        experiment_id: &str,
        custom_ids: &BTreeMap<String, String>,
    ) -> bool {
        match &self.cache {
            Some(cache) => cache.contains(&generate_key(
                distinct_id,
                is_login_id,
                experiment_id,
                custom_ids,
            )),
            None => false,
        }
    }

    /// Records the exposure unless it's already recorded. Returns `false`
    /// when it was, so only one of several concurrent callers gets `true`.
    ///
    /// A disabled cache always returns `true`.
    pub fn try_record_event(
        &self,
        distinct_id: &str,
        is_login_id: bool,
        experiment_id: &str,
        custom_ids: &BTreeMap<String, String>,
    ) -> bool {
        match &self.cache {
            Some(cache) => cache.insert_if_absent(
                generate_key(distinct_id, is_login_id, experiment_id, custom_ids),
                (),
            ),
            None => true,
        }
    }

    /// Drops a recorded exposure so the next trigger reports it again.
    pub fn forget_event(
        &self,
        distinct_id: &str,
        is_login_id: bool,
        experiment_id: &str,
        custom_ids: &BTreeMap<String, String>,
    ) {
        if let Some(cache) = &self.cache {
            cache.remove(&generate_key(
                distinct_id,
                is_login_id,
                experiment_id,
                custom_ids,
            ));
        }
    }
}

fn generate_key(
    distinct_id: &str,
    is_login_id: bool,
    experiment_id: &str,
    custom_ids: &BTreeMap<String, String>,
) -> String {
    format!(
        "{}_{}_{}_{}",
        distinct_id,
        is_login_id,
        experiment_id,
        canonical_custom_ids(custom_ids)
    )
}

#[cfg(test)]
mod test {
    use std::{collections::BTreeMap, time::Duration};

    use super::EventCacheManager;

    #[test]
    fn test_record_event() {
        let manager = EventCacheManager::new(Duration::from_secs(60), 16);
        let ids = BTreeMap::new();
        assert!(!manager.is_event_recorded("u1", false, "100", &ids));

        assert!(manager.try_record_event("u1", false, "100", &ids));
        assert!(!manager.try_record_event("u1", false, "100", &ids));
        assert!(manager.is_event_recorded("u1", false, "100", &ids));
        assert!(!manager.is_event_recorded("u1", false, "200", &ids));
        assert!(!manager.is_event_recorded("u1", true, "100", &ids));

        let other = BTreeMap::from([("store".to_string(), "s1".to_string())]);
        assert!(!manager.is_event_recorded("u1", false, "100", &other));

        manager.forget_event("u1", false, "100", &ids);
        assert!(!manager.is_event_recorded("u1", false, "100", &ids));
        assert!(manager.try_record_event("u1", false, "100", &ids));
    }

    #[test]
    fn test_disabled_cache() {
        let manager = EventCacheManager::new(Duration::from_secs(60), 0);
        assert!(!manager.is_enabled());
        assert!(manager.try_record_event("u1", false, "100", &BTreeMap::new()));
        assert!(manager.try_record_event("u1", false, "100", &BTreeMap::new()));
        assert!(!manager.is_event_recorded("u1", false, "100", &BTreeMap::new()));
    }
}
