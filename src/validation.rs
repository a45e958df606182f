use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    error::{Error, Result},
    models::PropertyValue,
};

pub const MAX_CUSTOM_ID_LENGTH: usize = 1024;
pub const MAX_PROPERTY_NAME_LENGTH: usize = 100;
pub const MAX_PROPERTY_VALUE_LENGTH: usize = 8192;

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]{1,99}$").expect("name pattern should compile"));

const RESERVED_NAMES: &[&str] = &[
    "distinct_id",
    "original_id",
    "time",
    "properties",
    "id",
    "first_id",
    "second_id",
    "users",
    "events",
    "event",
    "user_id",
    "date",
    "datetime",
    "device_id",
];

const RESERVED_PREFIXES: &[&str] = &["user_group", "user_tag"];

/// Checks a custom subject or custom property name against the naming rules.
pub fn is_valid_name(name: &str) -> bool {
    if !NAME_PATTERN.is_match(name) {
        return false;
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return false;
    }
    let lower = name.to_ascii_lowercase();
    !RESERVED_NAMES.contains(&lower.as_str())
        && !RESERVED_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Returns the reason the custom subjects can't be sent, if any.
pub fn check_custom_ids(custom_ids: &BTreeMap<String, String>) -> Option<&'static str> {
    for (key, value) in custom_ids {
        if key.trim().is_empty() {
            return Some("the keys of custom_ids has null or empty");
        }
        if !is_valid_name(key) {
            return Some("the key mismatch");
        }
        if value.trim().is_empty() {
            return Some("the value of custom_ids has null or empty");
        }
        if value.chars().count() > MAX_CUSTOM_ID_LENGTH {
            return Some("the value length is too long");
        }
    }
    None
}

/// Validates outbound custom properties and converts them to their wire form.
pub fn build_custom_properties(
    properties: &BTreeMap<String, PropertyValue>,
) -> Result<BTreeMap<String, serde_json::Value>> {
    let mut out = BTreeMap::new();
    for (name, value) in properties {
        if name.is_empty() {
            return Err(Error::IllegalData("The property name is null".to_string()));
        }
        if name.chars().count() > MAX_PROPERTY_NAME_LENGTH {
            return Err(Error::IllegalData(format!(
                "The property name {} is too long, max length is {}",
                name, MAX_PROPERTY_NAME_LENGTH
            )));
        }
        if !is_valid_name(name) {
            return Err(Error::IllegalData(format!(
                "The property name {} is invalid format",
                name
            )));
        }
        if let PropertyValue::String(s) = value {
            if s.chars().count() > MAX_PROPERTY_VALUE_LENGTH {
                return Err(Error::IllegalData(format!(
                    "The property name {} of value is too long, max length is {}",
                    name, MAX_PROPERTY_VALUE_LENGTH
                )));
            }
        }
        out.insert(name.clone(), value.to_wire());
    }
    Ok(out)
}
