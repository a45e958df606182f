use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use reqwest::{
    header,
    header::{HeaderMap, HeaderValue},
    Client, ClientBuilder,
};
use serde::Serialize;
use serde_with::skip_serializing_none;
use tokio::time::Duration;

use crate::interpreter::models::ExperimentResponse;

pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");
const PLATFORM: &str = "Rust";

/// The environment variable to change the default timeout for experiment requests.
const SENSORS_AB_TIMEOUT_MS: &str = "SENSORS_AB_TIMEOUT_MS";
const DEFAULT_TIMEOUT_MS: u64 = 3000;

/// Timeout used when a fetch doesn't set a usable one.
pub fn default_timeout() -> Duration {
    let timeout = std::env::var(SENSORS_AB_TIMEOUT_MS)
        .ok()
        .and_then(|t| t.parse::<u64>().ok())
        .filter(|t| *t > 0)
        .unwrap_or(DEFAULT_TIMEOUT_MS);
    Duration::from_millis(timeout)
}

fn create_http_connection_client() -> Client {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    ClientBuilder::new()
        .pool_idle_timeout(Some(Duration::from_secs(60)))
        .tcp_keepalive(Some(Duration::from_secs(30)))
        .default_headers(headers)
        .build()
        .expect("should be able to build the http client")
}

/// Request body of the experiment query.
#[skip_serializing_none]
#[derive(Debug, Serialize)]
pub struct FetchBody<'a> {
    login_id: Option<&'a str>,
    anonymous_id: Option<&'a str>,
    platform: &'static str,
    abtest_lib_version: &'static str,
    properties: serde_json::Map<String, serde_json::Value>,
    custom_ids: Option<&'a BTreeMap<String, String>>,
    custom_properties: Option<&'a BTreeMap<String, serde_json::Value>>,
    param_name: Option<&'a str>,
}

impl<'a> FetchBody<'a> {
    /// `custom_properties` must already be validated. It is only sent, with
    /// `param_name`, when not empty.
    pub fn new(
        distinct_id: &'a str,
        is_login_id: bool,
        custom_ids: &'a BTreeMap<String, String>,
        custom_properties: &'a BTreeMap<String, serde_json::Value>,
        param_name: &'a str,
    ) -> Self {
        let (login_id, anonymous_id) = if is_login_id {
            (Some(distinct_id), None)
        } else {
            (None, Some(distinct_id))
        };
        let has_properties = !custom_properties.is_empty();
        Self {
            login_id,
            anonymous_id,
            platform: PLATFORM,
            abtest_lib_version: SDK_VERSION,
            properties: serde_json::Map::new(),
            custom_ids: (!custom_ids.is_empty()).then_some(custom_ids),
            custom_properties: has_properties.then_some(custom_properties),
            param_name: has_properties.then_some(param_name),
        }
    }
}

#[derive(Clone)]
pub struct AbHttpClient {
    base_url: String,
    http_client: Client,
}

impl AbHttpClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            http_client: create_http_connection_client(),
        }
    }

    /// Queries the experiments of a subject. Only a 2xx answer with a
    /// successful status and a result list is returned as `Ok`.
    pub async fn fetch_experiments(
        &self,
        body: &FetchBody<'_>,
        timeout: Duration,
    ) -> Result<ExperimentResponse> {
        let response = self
            .http_client
            .post(&self.base_url)
            .timeout(timeout)
            .json(body)
            .send()
            .await;
        let res = match response {
            Ok(result) if result.status().is_success() => Ok(result),
            Ok(result) => Err(anyhow!("abtest error: {}", result.status())),
            Err(err) if err.is_timeout() => Err(anyhow!("abtest request timed out: {}", err)),
            Err(err) => Err(anyhow!("failed to send request: {}", err)),
        }?;

        let parsed = res
            .json::<ExperimentResponse>()
            .await
            .map_err(|e| anyhow!("error parsing abtest response: {}", e))?;

        if !parsed.is_success() {
            return Err(anyhow!(
                "abtest request unsuccessful, status: {:?}, error: {:?}",
                parsed.status,
                parsed.error
            ));
        }
        Ok(parsed)
    }
}
