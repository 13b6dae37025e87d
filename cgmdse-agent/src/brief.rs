//! Requirements and constraints a run explores against

use cgmdse_error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::Path;

/// Named, free-form design inputs. Values are whatever JSON the caller
/// supplied; no schema is enforced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fields(Map<String, Value>);

pub type Requirements = Fields;
pub type Constraints = Fields;

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The value rendered for a prompt: strings verbatim, anything else as
    /// compact JSON. Absent, null and blank values count as missing.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn text_or(&self, key: &str, default: &str) -> String {
        self.text(key).unwrap_or_else(|| default.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Requirements plus constraints: everything the seed prompt is built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignBrief {
    #[serde(default)]
    pub requirements: Requirements,
    #[serde(default)]
    pub constraints: Constraints,
}

const REQUIRED_REQUIREMENTS: [&str; 3] = ["sampling_interval", "alert_thresholds", "battery_life"];
const REQUIRED_CONSTRAINTS: [&str; 1] = ["adc_bits"];

impl DesignBrief {
    pub fn new(requirements: Requirements, constraints: Constraints) -> Self {
        Self {
            requirements,
            constraints,
        }
    }

    /// The continuous glucose monitor example the CLI runs by default.
    pub fn glucose_monitor() -> Self {
        Self {
            requirements: Fields::new()
                .with("sampling_interval", "5 ± 0.2 min")
                .with("alert_thresholds", json!({ "low": 70, "high": 180 }))
                .with("battery_life", ">=24h"),
            constraints: Fields::new()
                .with("adc_bits", "{10,12,14,16}")
                .with("ble_range", "≤5m"),
        }
    }

    /// Load a brief from a JSON file shaped like
    /// `{"requirements": {...}, "constraints": {...}}`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::from(e).with_context("path", path.display().to_string()))?;

        serde_json::from_str(&content).map_err(|e| {
            Error::parse_failed(format!("brief is not valid JSON: {}", e))
                .with_operation("brief::from_json_file")
                .with_context("path", path.display().to_string())
                .set_source(e)
        })
    }

    /// Reject a brief that lacks the fields the seed prompt cannot do without.
    pub fn validate(&self) -> Result<()> {
        let mut missing: Vec<&str> = REQUIRED_REQUIREMENTS
            .iter()
            .copied()
            .filter(|key| self.requirements.text(key).is_none())
            .collect();
        missing.extend(
            REQUIRED_CONSTRAINTS
                .iter()
                .copied()
                .filter(|key| self.constraints.text(key).is_none()),
        );

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::invalid_argument(format!(
                "missing required fields: {}",
                missing.join(", ")
            ))
            .with_operation("brief::validate"))
        }
    }

    /// Alert thresholds as `<low / >high mg/dL` when given as a `{low, high}`
    /// object, otherwise the value as text.
    pub fn alert_thresholds(&self) -> String {
        match self.requirements.get("alert_thresholds") {
            Some(Value::Object(map)) if map.contains_key("low") && map.contains_key("high") => {
                format!("<{} / >{} mg/dL", plain(&map["low"]), plain(&map["high"]))
            }
            _ => self.requirements.text_or("alert_thresholds", "unspecified"),
        }
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_glucose_monitor_brief_is_valid() {
        let brief = DesignBrief::glucose_monitor();
        assert!(brief.validate().is_ok());
        assert_eq!(brief.requirements.len(), 3);
        assert_eq!(brief.constraints.text("ble_range").as_deref(), Some("≤5m"));
    }

    #[test]
    fn test_alert_threshold_rendering() {
        let brief = DesignBrief::glucose_monitor();
        assert_eq!(brief.alert_thresholds(), "<70 / >180 mg/dL");

        let brief = DesignBrief::new(
            Fields::new().with("alert_thresholds", "hypo below 3.9 mmol/L"),
            Fields::new(),
        );
        assert_eq!(brief.alert_thresholds(), "hypo below 3.9 mmol/L");
    }

    #[test]
    fn test_validate_lists_every_missing_field() {
        let brief = DesignBrief::new(
            Fields::new()
                .with("sampling_interval", "5 min")
                .with("battery_life", ""),
            Fields::new().with("ble_range", "≤5m"),
        );
        let err = brief.validate().unwrap_err();
        assert_eq!(err.kind(), cgmdse_error::ErrorKind::InvalidArgument);
        assert_eq!(
            err.message(),
            "missing required fields: alert_thresholds, battery_life, adc_bits"
        );
    }

    #[test]
    fn test_fields_keep_insertion_order() {
        let fields = Fields::new()
            .with("sampling_interval", "5 min")
            .with("alert_thresholds", "<70")
            .with("battery_life", ">=24h");
        assert_eq!(
            serde_json::to_string(&fields).unwrap(),
            r#"{"sampling_interval":"5 min","alert_thresholds":"<70","battery_life":">=24h"}"#
        );

        let parsed: Fields = serde_json::from_str(r#"{"z_last": 1, "a_first": 2}"#).unwrap();
        assert_eq!(serde_json::to_string(&parsed).unwrap(), r#"{"z_last":1,"a_first":2}"#);
    }

    #[test]
    fn test_text_renders_non_strings_as_json() {
        let fields = Fields::new()
            .with("adc_bits", json!([10, 12]))
            .with("range", Value::Null);
        assert_eq!(fields.text("adc_bits").as_deref(), Some("[10,12]"));
        assert_eq!(fields.text("range"), None);
        assert_eq!(fields.text_or("range", "≤5m"), "≤5m");
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"requirements": {{"sampling_interval": "1 min", "alert_thresholds": "<60", "battery_life": "7d"}},
                "constraints": {{"adc_bits": "{{12,16}}"}}}}"#
        )
        .unwrap();

        let brief = DesignBrief::from_json_file(file.path()).unwrap();
        assert_eq!(brief.requirements.text("battery_life").as_deref(), Some("7d"));
        assert!(brief.validate().is_ok());
    }

    #[test]
    fn test_from_json_file_errors() {
        let err = DesignBrief::from_json_file("/definitely/not/here.json").unwrap_err();
        assert_eq!(err.kind(), cgmdse_error::ErrorKind::FileNotFound);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "requirements: nope").unwrap();
        let err = DesignBrief::from_json_file(file.path()).unwrap_err();
        assert_eq!(err.kind(), cgmdse_error::ErrorKind::ParseFailed);
    }
}
