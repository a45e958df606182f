//! Implements the Sensors A/B testing client
//!
//! Variables are resolved by the experiment service and cached per subject.
//! Exposures are reported through a [`Tracker`] at most once per subject and
//! experiment within the event cache window.
//!
//! To change the default request timeout set the SENSORS_AB_TIMEOUT_MS
//! environment variable to the desired timeout value.
mod client;
mod http;
mod interpreter;
mod tracker;
mod validation;

pub mod cache;
pub mod error;
pub mod models;
pub use crate::client::AbTest;
pub use crate::error::Error;
pub use crate::interpreter::models::{ExperimentResponse, VariableType};
pub use crate::tracker::Tracker;
