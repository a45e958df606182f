use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use anyhow::{bail, Result};
use httptest::{matchers::request, responders::json_encoded, Expectation, Server};
use serde_json::json;
use sensors_abtesting::{models::AbTestOptions, AbTest, Tracker};

pub const PATH: &str = "/api/v2/abtest/online/results";

#[derive(Default)]
pub struct RecordingTracker {
    pub events: Mutex<Vec<(String, HashMap<String, serde_json::Value>)>>,
    pub fail: bool,
    /// Blocks every call, like a slow analytics backend.
    pub delay: Duration,
}

impl RecordingTracker {
    pub fn count(&self) -> usize {
        self.events.lock().expect("tracker lock").len()
    }
}

impl Tracker for RecordingTracker {
    fn track(
        &self,
        distinct_id: &str,
        _event_name: &str,
        properties: HashMap<String, serde_json::Value>,
        _is_login_id: bool,
    ) -> Result<()> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if self.fail {
            bail!("tracking backend unavailable");
        }
        self.events
            .lock()
            .expect("tracker lock")
            .push((distinct_id.to_string(), properties));
        Ok(())
    }
}

pub fn experiments_payload() -> serde_json::Value {
    json!({
        "status": "SUCCESS",
        "results": [
            {
                "abtest_experiment_id": "100",
                "abtest_experiment_group_id": "1",
                "is_control_group": false,
                "is_white_list": false,
                "variables": [
                    {"name": "button_color", "type": "STRING", "value": "red"},
                    {"name": "discount", "type": "INTEGER", "value": "15"}
                ]
            },
            {
                "abtest_experiment_id": "200",
                "abtest_experiment_group_id": "3",
                "is_control_group": true,
                "is_white_list": true,
                "variables": [
                    {"name": "show_banner", "type": "BOOLEAN", "value": "True"},
                    {"name": "layout", "type": "JSON", "value": "{\"columns\": 2}"}
                ]
            }
        ]
    })
}

/// Serves the experiments payload exactly `times` times.
pub fn expect_experiments(server: &Server, times: usize) {
    server.expect(
        Expectation::matching(request::method_path("POST", PATH))
            .times(times)
            .respond_with(json_encoded(experiments_payload())),
    );
}

pub fn create_client(
    server: &Server,
    tracker: Arc<RecordingTracker>,
    options: AbTestOptions,
) -> Arc<AbTest> {
    Arc::new(
        AbTest::new(format!("http://{}{}", server.addr(), PATH), tracker, options)
            .expect("should be able to create abtest client"),
    )
}
