use std::{collections::BTreeMap, fmt, time::Duration};

use serde::{Deserialize, Serialize};

/// A variable value, either the caller's default or the one resolved from an
/// experiment. The variant of the default decides which declared variable
/// type is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Integer(i64),
    Boolean(bool),
    String(String),
    Json(serde_json::Map<String, serde_json::Value>),
}

impl VariableValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            VariableValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            VariableValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            VariableValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        match self {
            VariableValue::Json(m) => Some(m),
            _ => None,
        }
    }
}

impl From<i64> for VariableValue {
    fn from(v: i64) -> Self {
        VariableValue::Integer(v)
    }
}

impl From<i32> for VariableValue {
    fn from(v: i32) -> Self {
        VariableValue::Integer(v.into())
    }
}

impl From<bool> for VariableValue {
    fn from(v: bool) -> Self {
        VariableValue::Boolean(v)
    }
}

impl From<&str> for VariableValue {
    fn from(v: &str) -> Self {
        VariableValue::String(v.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(v: String) -> Self {
        VariableValue::String(v)
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for VariableValue {
    fn from(v: serde_json::Map<String, serde_json::Value>) -> Self {
        VariableValue::Json(v)
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableValue::Integer(i) => write!(f, "{}", i),
            VariableValue::Boolean(b) => write!(f, "{}", b),
            VariableValue::String(s) => write!(f, "{}", s),
            VariableValue::Json(m) => write!(f, "{}", serde_json::Value::Object(m.clone())),
        }
    }
}

/// Value of a custom property sent along with a fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Integer(i64),
    Number(f64),
    Boolean(bool),
    String(String),
    List(Vec<String>),
}

impl PropertyValue {
    /// Lists travel as their JSON text, everything else as is.
    pub(crate) fn to_wire(&self) -> serde_json::Value {
        match self {
            PropertyValue::Integer(i) => serde_json::Value::from(*i),
            PropertyValue::Number(n) => serde_json::Value::from(*n),
            PropertyValue::Boolean(b) => serde_json::Value::from(*b),
            PropertyValue::String(s) => serde_json::Value::from(s.clone()),
            PropertyValue::List(l) => serde_json::Value::String(
                serde_json::to_string(l).unwrap_or_else(|_| "[]".to_string()),
            ),
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Integer(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        PropertyValue::Integer(v.into())
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Number(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Boolean(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::String(v)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(v: Vec<String>) -> Self {
        PropertyValue::List(v)
    }
}

/// Outcome of a fetch: the resolved value and the experiment it came from.
///
/// When no experiment matched, `result` is the default value and every
/// experiment field is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub distinct_id: String,
    pub is_login_id: bool,
    pub result: VariableValue,
    pub ab_experiment_id: Option<String>,
    pub ab_experiment_group_id: Option<String>,
    pub is_control_group: Option<bool>,
    pub is_white_list: Option<bool>,
}

impl Experiment {
    pub fn with_default(distinct_id: String, is_login_id: bool, result: VariableValue) -> Self {
        Self {
            distinct_id,
            is_login_id,
            result,
            ab_experiment_id: None,
            ab_experiment_group_id: None,
            is_control_group: None,
            is_white_list: None,
        }
    }
}

impl fmt::Display for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "distinct_id = {}, is_login_id = {}, result = {}, ab_experiment_id = {:?}, \
             ab_experiment_group_id = {:?}, is_control_group = {:?}, is_white_list = {:?}",
            self.distinct_id,
            self.is_login_id,
            self.result,
            self.ab_experiment_id,
            self.ab_experiment_group_id,
            self.is_control_group,
            self.is_white_list
        )
    }
}

/// Parameters of a single variable fetch.
///
/// Build with [`FetchParams::new`] and override the remaining fields with
/// struct update syntax.
#[derive(Debug, Clone)]
pub struct FetchParams {
    pub distinct_id: String,
    pub is_login_id: bool,
    pub param_name: String,
    pub default_value: VariableValue,
    pub enable_auto_track_event: bool,
    /// Falls back to the client default when unset or zero.
    pub timeout: Option<Duration>,
    pub custom_ids: BTreeMap<String, String>,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl FetchParams {
    pub fn new(
        distinct_id: impl Into<String>,
        is_login_id: bool,
        param_name: impl Into<String>,
        default_value: impl Into<VariableValue>,
    ) -> Self {
        Self {
            distinct_id: distinct_id.into(),
            is_login_id,
            param_name: param_name.into(),
            default_value: default_value.into(),
            enable_auto_track_event: true,
            timeout: None,
            custom_ids: BTreeMap::new(),
            properties: BTreeMap::new(),
        }
    }
}

/// Options to use when creating the client, they will override default values, if they exist.
///
/// Cache times are in minutes and valid from 0 to 1440, cache sizes are entry
/// counts and must not be negative. Out of range values fall back to 1440
/// minutes and 4096 entries. A size of 0 disables that cache.
pub struct AbTestOptions {
    pub event_cache_time: Option<i64>,
    pub event_cache_size: Option<i64>,
    pub experiment_cache_time: Option<i64>,
    pub experiment_cache_size: Option<i64>,
    /// Record reported exposures so they are sent once per cache window.
    pub enable_event_cache: bool,
    pub enable_log: bool,
}

impl AbTestOptions {
    pub fn default() -> Self {
        Self {
            event_cache_time: None,
            event_cache_size: None,
            experiment_cache_time: None,
            experiment_cache_size: None,
            enable_event_cache: true,
            enable_log: false,
        }
    }
}
