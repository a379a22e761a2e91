use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;
use tree::{Easing, Rgb};

/// A single tunable value from a pattern manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// Named parameters handed to a pattern factory.
///
/// Lookups never fail: a missing or unusable value falls back to the default
/// supplied by the pattern, with a warning when the value was present but
/// wrong.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternParams {
    values: BTreeMap<String, ParamValue>,
}

impl PatternParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: ParamValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn number(&self, key: &str, default: f64) -> f64 {
        match self.values.get(key) {
            None => default,
            Some(ParamValue::Number(value)) if value.is_finite() => *value,
            Some(other) => {
                warn!(param = key, value = ?other, "expected a number; using default");
                default
            }
        }
    }

    /// A number clamped into `min..=max`.
    pub fn ranged(&self, key: &str, default: f64, min: f64, max: f64) -> f64 {
        self.number(key, default).clamp(min, max)
    }

    /// A positive whole number of frames or steps.
    pub fn count(&self, key: &str, default: u32) -> u32 {
        let value = self.number(key, f64::from(default));
        if value < 1.0 {
            warn!(param = key, value, "expected a count of at least 1; using default");
            return default;
        }
        value.min(f64::from(u32::MAX)).round() as u32
    }

    pub fn flag(&self, key: &str, default: bool) -> bool {
        match self.values.get(key) {
            None => default,
            Some(ParamValue::Bool(value)) => *value,
            Some(other) => {
                warn!(param = key, value = ?other, "expected true or false; using default");
                default
            }
        }
    }

    /// A color given as `#RRGGBB` or a palette name.
    pub fn color(&self, key: &str, default: Rgb) -> Rgb {
        match self.values.get(key) {
            None => default,
            Some(ParamValue::Text(raw)) => raw.parse().unwrap_or_else(|err| {
                warn!(param = key, error = %err, "invalid color; using default");
                default
            }),
            Some(other) => {
                warn!(param = key, value = ?other, "expected a color string; using default");
                default
            }
        }
    }

    pub fn easing(&self, key: &str, default: Easing) -> Easing {
        match self.values.get(key) {
            None => default,
            Some(ParamValue::Text(raw)) => Easing::from_name(raw).unwrap_or_else(|| {
                warn!(param = key, value = %raw, "unknown easing; using default");
                default
            }),
            Some(other) => {
                warn!(param = key, value = ?other, "expected an easing name; using default");
                default
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> PatternParams {
        toml::from_str(
            r##"
speed = 0.75
steps = 12
tint = "#102030"
named = "teal"
bad = "#zz0000"
sparkle = true
curve = "smoothstep"
"##,
        )
        .unwrap()
    }

    #[test]
    fn reads_typed_values() {
        let params = params();
        assert_eq!(params.number("speed", 0.1), 0.75);
        assert_eq!(params.count("steps", 3), 12);
        assert_eq!(params.color("tint", Rgb::BLACK), Rgb::new(0x10, 0x20, 0x30));
        assert_eq!(params.color("named", Rgb::BLACK), Rgb::TEAL);
        assert!(params.flag("sparkle", false));
        assert!(matches!(params.easing("curve", Easing::Linear), Easing::Smoothstep));
    }

    #[test]
    fn falls_back_on_missing_or_invalid_values() {
        let params = params();
        assert_eq!(params.number("missing", 0.3), 0.3);
        assert_eq!(params.number("tint", 0.3), 0.3);
        assert_eq!(params.color("bad", Rgb::RED), Rgb::RED);
        assert_eq!(params.count("speed", 4), 4);
        assert_eq!(params.ranged("speed", 0.3, 0.02, 0.5), 0.5);
    }
}
