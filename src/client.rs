use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex},
};

use anyhow::Result as AnyResult;
use chrono::{Local, NaiveDate};
use tokio::time::Duration;
use tracing::{event, Level};

use crate::{
    cache::{EventCacheManager, ExperimentCacheManager},
    error::{Error, Result},
    http::{default_timeout, AbHttpClient, FetchBody, SDK_VERSION},
    interpreter::{models::ExperimentResponse, Interpreter},
    models::{AbTestOptions, Experiment, FetchParams, PropertyValue},
    tracker::Tracker,
    validation::{build_custom_properties, check_custom_ids},
};

const EVENT_TYPE: &str = "$ABTestTrigger";
const EXPERIMENT_ID: &str = "$abtest_experiment_id";
const EXPERIMENT_GROUP_ID: &str = "$abtest_experiment_group_id";
const LIB_PLUGIN_VERSION: &str = "$lib_plugin_version";
const AB_TEST_EVENT_LIB_VERSION: &str = "rust_abtesting";

const DEFAULT_CACHE_SIZE: usize = 4096;
const DEFAULT_CACHE_MINUTES: i64 = 1440;

/// A/B testing client with a local experiment cache and exposure dedup.
///
/// Share one instance between tasks with an `Arc`. A fetch waits on the
/// network for at most its timeout and never spawns work of its own.
pub struct AbTest {
    enable_event_cache: bool,
    enable_log: bool,
    http_client: AbHttpClient,
    interpreter: Interpreter,
    experiment_cache: ExperimentCacheManager,
    event_cache: EventCacheManager,
    tracker: Arc<dyn Tracker>,
    track_day: Mutex<Option<NaiveDate>>,
}

impl AbTest {
    pub fn new(
        base_url: String,
        tracker: Arc<dyn Tracker>,
        options: AbTestOptions,
    ) -> Result<Self> {
        if base_url.trim().is_empty() {
            return Err(Error::IllegalArgument(
                "base_url is empty, init failed".to_string(),
            ));
        }
        if let Err(e) = reqwest::Url::parse(&base_url) {
            return Err(Error::IllegalArgument(format!(
                "base_url {} is invalid: {}",
                base_url, e
            )));
        }

        Ok(Self {
            enable_event_cache: options.enable_event_cache,
            enable_log: options.enable_log,
            http_client: AbHttpClient::new(base_url),
            interpreter: Interpreter::new(options.enable_log),
            experiment_cache: ExperimentCacheManager::new(
                cache_time(options.experiment_cache_time),
                cache_size(options.experiment_cache_size),
            ),
            event_cache: EventCacheManager::new(
                cache_time(options.event_cache_time),
                cache_size(options.event_cache_size),
            ),
            tracker,
            track_day: Mutex::new(None),
        })
    }

    /// Fetches the variable from the server, ignoring cached results.
    ///
    /// A successful answer still refreshes the experiment cache.
    pub async fn fetch_ab_test(&self, params: FetchParams) -> Result<Experiment> {
        self.fetch_ab(params, false).await
    }

    /// Fetches the variable, answering from the experiment cache when the
    /// cached result for the subject knows about the variable.
    pub async fn fast_fetch_ab_test(&self, params: FetchParams) -> Result<Experiment> {
        self.fetch_ab(params, true).await
    }

    /// Reports the `$ABTestTrigger` event for an experiment result.
    ///
    /// Does nothing when the result didn't come from an experiment, is a
    /// whitelist match or was already reported in the event cache window.
    pub fn track_ab_test_trigger(
        &self,
        experiment: &Experiment,
        custom_ids: &BTreeMap<String, String>,
        properties: &BTreeMap<String, PropertyValue>,
    ) -> Result<()> {
        let properties = build_custom_properties(properties)?;
        self.track_exposure(experiment, custom_ids, properties.into_iter().collect())
            .map_err(Error::Track)
    }
}

// Private methods
impl AbTest {
    async fn fetch_ab(&self, params: FetchParams, enable_cache: bool) -> Result<Experiment> {
        if params.distinct_id.is_empty() {
            return Err(Error::IllegalArgument("distinct_id is empty".to_string()));
        }
        if params.param_name.is_empty() {
            return Err(Error::IllegalArgument("param_name is empty".to_string()));
        }
        if let Some(reason) = check_custom_ids(&params.custom_ids) {
            self.log(format_args!("request with invalid custom_ids, {}", reason));
            return Ok(Experiment::with_default(
                params.distinct_id,
                params.is_login_id,
                params.default_value,
            ));
        }
        let custom_properties = build_custom_properties(&params.properties)?;
        let timeout = params
            .timeout
            .filter(|t| !t.is_zero())
            .unwrap_or_else(default_timeout);

        let cached = if enable_cache {
            self.experiment_cache.get_cached(
                &params.distinct_id,
                params.is_login_id,
                &params.custom_ids,
                &params.param_name,
            )
        } else {
            None
        };

        let payload = match cached {
            Some(payload) => {
                self.log(format_args!("return cache for {}", params.param_name));
                Some(payload)
            }
            None => {
                let body = FetchBody::new(
                    &params.distinct_id,
                    params.is_login_id,
                    &params.custom_ids,
                    &custom_properties,
                    &params.param_name,
                );
                let fetched = self.fetch_from_server(&body, timeout).await;
                if let Some(payload) = &fetched {
                    self.experiment_cache.set_cached(
                        &params.distinct_id,
                        params.is_login_id,
                        &params.custom_ids,
                        payload.clone(),
                    );
                }
                fetched
            }
        };

        let experiment = self.interpreter.convert_experiment(
            payload.as_deref(),
            &params.distinct_id,
            params.is_login_id,
            &params.param_name,
            &params.default_value,
        );

        if params.enable_auto_track_event {
            if let Err(e) = self.track_exposure(&experiment, &params.custom_ids, HashMap::new()) {
                event!(
                    Level::ERROR,
                    "Failed to track exposure for {}: {}",
                    params.distinct_id,
                    e
                );
            }
        }

        Ok(experiment)
    }

    async fn fetch_from_server(
        &self,
        body: &FetchBody<'_>,
        timeout: Duration,
    ) -> Option<Arc<ExperimentResponse>> {
        match self.http_client.fetch_experiments(body, timeout).await {
            Ok(payload) => Some(Arc::new(payload)),
            Err(e) => {
                event!(Level::ERROR, "Failed to fetch experiments: {}", e);
                None
            }
        }
    }

    fn track_exposure(
        &self,
        experiment: &Experiment,
        custom_ids: &BTreeMap<String, String>,
        mut properties: HashMap<String, serde_json::Value>,
    ) -> AnyResult<()> {
        let experiment_id = match &experiment.ab_experiment_id {
            Some(id) if experiment.is_white_list != Some(true) => id,
            _ => {
                self.log(format_args!(
                    "skip exposure, user not hit experiment or in the whitelist"
                ));
                return Ok(());
            }
        };
        // reserved before tracking so concurrent triggers report it once
        if self.enable_event_cache
            && !self.event_cache.try_record_event(
                &experiment.distinct_id,
                experiment.is_login_id,
                experiment_id,
                custom_ids,
            )
        {
            self.log(format_args!("the event has been triggered"));
            return Ok(());
        }

        properties.insert(EXPERIMENT_ID.to_string(), experiment_id.clone().into());
        properties.insert(
            EXPERIMENT_GROUP_ID.to_string(),
            experiment.ab_experiment_group_id.clone().into(),
        );
        let today = Local::now().date_naive();
        let day_first = self.is_day_first(today);
        if day_first {
            properties.insert(
                LIB_PLUGIN_VERSION.to_string(),
                serde_json::json!([format!("{}:{}", AB_TEST_EVENT_LIB_VERSION, SDK_VERSION)]),
            );
        }

        let tracked = self.tracker.track(
            &experiment.distinct_id,
            EVENT_TYPE,
            properties,
            experiment.is_login_id,
        );
        if tracked.is_err() {
            if self.enable_event_cache {
                self.event_cache.forget_event(
                    &experiment.distinct_id,
                    experiment.is_login_id,
                    experiment_id,
                    custom_ids,
                );
            }
            if day_first {
                self.release_day(today);
            }
        }
        tracked
    }

    /// True the first time it's called on a given day.
    fn is_day_first(&self, today: NaiveDate) -> bool {
        let mut track_day = self
            .track_day
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *track_day == Some(today) {
            return false;
        }
        *track_day = Some(today);
        true
    }

    /// Hands the day's version marker back to the next trigger.
    fn release_day(&self, today: NaiveDate) {
        let mut track_day = self
            .track_day
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *track_day == Some(today) {
            *track_day = None;
        }
    }

    fn log(&self, args: std::fmt::Arguments<'_>) {
        if self.enable_log {
            event!(Level::DEBUG, "{}", args);
        }
    }
}

fn cache_size(size: Option<i64>) -> usize {
    size.and_then(|s| usize::try_from(s).ok())
        .unwrap_or(DEFAULT_CACHE_SIZE)
}

fn cache_time(minutes: Option<i64>) -> Duration {
    let minutes = minutes
        .filter(|m| (0..=DEFAULT_CACHE_MINUTES).contains(m))
        .unwrap_or(DEFAULT_CACHE_MINUTES);
    Duration::from_secs(minutes as u64 * 60)
}
