use serde::{Deserialize, Deserializer, Serialize};

pub const SUCCESS_STATUS: &str = "SUCCESS";

/// Body returned by the experiment service. This is what the experiment cache
/// stores.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExperimentResponse {
    pub status: Option<String>,
    pub results: Option<Vec<ExperimentRecord>>,
    pub error_type: Option<String>,
    pub error: Option<String>,
}

impl ExperimentResponse {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some(SUCCESS_STATUS) && self.results.is_some()
    }

    /// Whether any experiment in the payload defines `variable_name`.
    pub fn has_variable(&self, variable_name: &str) -> bool {
        self.results
            .iter()
            .flatten()
            .flat_map(|r| r.variables.iter())
            .any(|v| v.name == variable_name)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExperimentRecord {
    #[serde(default, deserialize_with = "string_or_number")]
    pub abtest_experiment_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub abtest_experiment_group_id: Option<String>,
    pub is_control_group: Option<bool>,
    pub is_white_list: Option<bool>,
    #[serde(default)]
    pub variables: Vec<ExperimentVariable>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExperimentVariable {
    pub name: String,
    pub r#type: VariableType,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariableType {
    String,
    Integer,
    Boolean,
    Json,
    #[serde(other)]
    Unknown,
}

// experiment ids have been seen both as numbers and as strings
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match v {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
