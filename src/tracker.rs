use std::collections::HashMap;

use anyhow::Result;

/// Analytics client used to report experiment exposures.
///
/// Implement this on top of whatever tracking SDK the host application uses.
/// Errors returned from automatic exposure reporting are logged and never
/// fail a fetch.
pub trait Tracker: Send + Sync {
    fn track(
        &self,
        distinct_id: &str,
        event_name: &str,
        properties: HashMap<String, serde_json::Value>,
        is_login_id: bool,
    ) -> Result<()>;
}
