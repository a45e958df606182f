use tracing::{event, Level};

use crate::models::{Experiment, VariableValue};

use self::getters::{coerce_value, Mismatch};
use self::models::ExperimentResponse;

mod getters;
pub mod models;

/// Turns a raw experiment payload into the [`Experiment`] for one variable.
pub struct Interpreter {
    enable_log: bool,
}

impl Interpreter {
    pub fn new(enable_log: bool) -> Self {
        Self { enable_log }
    }

    /// Resolves `param_name` from `payload`. Any problem with the payload
    /// resolves to `default_value` with no experiment attached.
    ///
    /// Experiments are scanned in server order and the first variable with a
    /// matching name and a compatible type wins.
    pub fn convert_experiment(
        &self,
        payload: Option<&ExperimentResponse>,
        distinct_id: &str,
        is_login_id: bool,
        param_name: &str,
        default_value: &VariableValue,
    ) -> Experiment {
        let fallback =
            Experiment::with_default(distinct_id.to_string(), is_login_id, default_value.clone());

        let records = match payload {
            Some(p) if p.is_success() => p.results.as_deref().unwrap_or_default(),
            _ => return fallback,
        };

        for record in records {
            for variable in record.variables.iter().filter(|v| v.name == param_name) {
                match coerce_value(variable, default_value) {
                    Ok(result) => {
                        return Experiment {
                            result,
                            ab_experiment_id: record.abtest_experiment_id.clone(),
                            ab_experiment_group_id: record.abtest_experiment_group_id.clone(),
                            is_control_group: record.is_control_group,
                            is_white_list: record.is_white_list,
                            ..fallback
                        };
                    }
                    Err(Mismatch::Type(ty)) => self.log(format_args!(
                        "the default value type should be {:?} for {}",
                        ty, param_name
                    )),
                    Err(Mismatch::Unparsable(ty)) => self.log(format_args!(
                        "value of {} can't be parsed as {:?}",
                        param_name, ty
                    )),
                }
            }
        }

        self.log(format_args!(
            "return default value, result does not contain {}",
            param_name
        ));
        fallback
    }

    fn log(&self, args: std::fmt::Arguments<'_>) {
        if self.enable_log {
            event!(Level::DEBUG, "{}", args);
        }
    }
}
