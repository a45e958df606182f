use super::models::{ExperimentVariable, VariableType};
use crate::models::VariableValue;

/// Why a variable with the right name was still not used.
#[derive(Debug, PartialEq, Eq)]
pub enum Mismatch {
    /// The declared type doesn't match the default value's type.
    Type(VariableType),
    /// The declared type matches but the value doesn't parse as that type.
    Unparsable(VariableType),
}

/// Coerces the string encoded `variable` into the variant of `default_value`.
pub fn coerce_value(
    variable: &ExperimentVariable,
    default_value: &VariableValue,
) -> Result<VariableValue, Mismatch> {
    let ty = variable.r#type;
    match (ty, default_value) {
        (VariableType::String, VariableValue::String(_)) => {
            Ok(VariableValue::String(variable.value.clone()))
        }
        (VariableType::Integer, VariableValue::Integer(_)) => variable
            .value
            .trim()
            .parse::<i64>()
            .map(VariableValue::Integer)
            .map_err(|_| Mismatch::Unparsable(ty)),
        (VariableType::Boolean, VariableValue::Boolean(_)) => Ok(VariableValue::Boolean(
            variable.value.eq_ignore_ascii_case("true"),
        )),
        (VariableType::Json, VariableValue::Json(_)) => {
            match serde_json::from_str::<serde_json::Value>(&variable.value) {
                Ok(serde_json::Value::Object(map)) => Ok(VariableValue::Json(map)),
                _ => Err(Mismatch::Unparsable(ty)),
            }
        }
        _ => Err(Mismatch::Type(ty)),
    }
}
