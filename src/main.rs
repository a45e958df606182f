use std::{collections::HashMap, sync::Arc};

use sensors_abtesting::{
    models::{AbTestOptions, FetchParams},
    AbTest, Tracker,
};

struct PrintTracker;

impl Tracker for PrintTracker {
    fn track(
        &self,
        distinct_id: &str,
        event_name: &str,
        properties: HashMap<String, serde_json::Value>,
        is_login_id: bool,
    ) -> anyhow::Result<()> {
        println!(
            "track {} for {} (login: {}): {:?}",
            event_name, distinct_id, is_login_id, properties
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let url = std::env::var("SENSORS_AB_URL")
        .unwrap_or_else(|_| "http://localhost:8202/api/v2/abtest/online/results".to_string());
    let client = AbTest::new(
        url,
        Arc::new(PrintTracker),
        AbTestOptions {
            enable_log: true,
            ..AbTestOptions::default()
        },
    )
    .unwrap();

    for _ in 0..2 {
        let params = FetchParams::new("1238", false, "button_color", "grey");
        println!("{:?}", client.fast_fetch_ab_test(params).await.map(|e| e.to_string()));
    }

    let params = FetchParams::new("1239", true, "discount", 0);
    println!("{:?}", client.fetch_ab_test(params).await.map(|e| e.to_string()));
}
