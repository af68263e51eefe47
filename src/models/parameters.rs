use crate::error::{AppError, Result};
use serde_json::Value;
use std::collections::BTreeMap;

pub const MASK: &str = "********";

/// Parameter values handed to `set_execution_parameter_value`, already
/// coerced to text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet(BTreeMap<String, String>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the JSON object stored on a package definition.
    pub fn from_json(raw: Option<&str>) -> Result<Self> {
        let Some(raw) = raw else {
            return Ok(Self::new());
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::new());
        }

        let value: Value = serde_json::from_str(trimmed)
            .map_err(|e| AppError::ParameterParse(format!("Invalid package parameters: {}", e)))?;
        let Value::Object(map) = value else {
            return Err(AppError::ParameterParse(
                "Package parameters must be a JSON object".to_string(),
            ));
        };

        let mut params = Self::new();
        for (name, value) in map {
            if name.trim().is_empty() {
                return Err(AppError::ParameterParse(
                    "Parameter name cannot be empty".to_string(),
                ));
            }
            params.insert(name, Self::coerce(value));
        }
        Ok(params)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The value as it may appear in a transcript.
    pub fn loggable_value<'a>(name: &str, value: &'a str) -> &'a str {
        if name.to_lowercase().contains("password") {
            MASK
        } else {
            value
        }
    }

    /// Snapshot persisted on the execution record, passwords masked.
    pub fn masked_json(&self) -> String {
        let masked: BTreeMap<&str, &str> = self
            .iter()
            .map(|(name, value)| (name, Self::loggable_value(name, value)))
            .collect();
        serde_json::to_string(&masked).unwrap_or_else(|_| "{}".to_string())
    }

    fn coerce(value: Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => s,
            other => other.to_string(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}
