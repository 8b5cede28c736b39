use glance_types::{CropMargins, TargetKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::settings::{
    INTERVAL_MAX_SECS, INTERVAL_MIN_SECS, OcrSettings, THRESHOLD_MAX, THRESHOLD_MIN,
};

/// Override-only configuration fragment for one application.
///
/// Absent fields inherit the global value. An all-`None` fragment is a
/// valid persistent state: the application is tracked but currently
/// identical to global.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsOverrides {
    #[serde(rename = "cropUp", skip_serializing_if = "Option::is_none")]
    pub crop_up: Option<u8>,
    #[serde(rename = "cropLeft", skip_serializing_if = "Option::is_none")]
    pub crop_left: Option<u8>,
    #[serde(rename = "cropRight", skip_serializing_if = "Option::is_none")]
    pub crop_right: Option<u8>,
    #[serde(rename = "cropDown", skip_serializing_if = "Option::is_none")]
    pub crop_down: Option<u8>,
    #[serde(rename = "spotlight_cropUp", skip_serializing_if = "Option::is_none")]
    pub spotlight_crop_up: Option<u8>,
    #[serde(rename = "spotlight_cropLeft", skip_serializing_if = "Option::is_none")]
    pub spotlight_crop_left: Option<u8>,
    #[serde(rename = "spotlight_cropRight", skip_serializing_if = "Option::is_none")]
    pub spotlight_crop_right: Option<u8>,
    #[serde(rename = "spotlight_cropDown", skip_serializing_if = "Option::is_none")]
    pub spotlight_crop_down: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<f64>,
}

impl SettingsOverrides {
    pub fn is_empty(&self) -> bool {
        *self == SettingsOverrides::default()
    }

    /// Extract overrides from raw JSON, key by key.
    ///
    /// Values of the wrong type or outside the documented range are logged
    /// and skipped, so one bad key never discards the rest of a profile.
    pub fn from_value(raw: &Value) -> Self {
        let Some(map) = raw.as_object() else {
            tracing::warn!("profile data is not a JSON object, ignoring");
            return Self::default();
        };

        Self {
            crop_up: crop_key(map, "cropUp"),
            crop_left: crop_key(map, "cropLeft"),
            crop_right: crop_key(map, "cropRight"),
            crop_down: crop_key(map, "cropDown"),
            spotlight_crop_up: crop_key(map, "spotlight_cropUp"),
            spotlight_crop_left: crop_key(map, "spotlight_cropLeft"),
            spotlight_crop_right: crop_key(map, "spotlight_cropRight"),
            spotlight_crop_down: crop_key(map, "spotlight_cropDown"),
            target: map.get("target").and_then(|value| {
                let target = value.as_i64().and_then(TargetKind::from_index);
                if target.is_none() {
                    tracing::warn!(%value, "skipping invalid target override");
                }
                target
            }),
            threshold: float_key(map, "threshold", THRESHOLD_MIN, THRESHOLD_MAX),
            interval: float_key(map, "interval", INTERVAL_MIN_SECS, INTERVAL_MAX_SECS),
        }
    }

    /// Drop every override equal to the corresponding global value.
    ///
    /// Converts legacy full-snapshot profiles to override-only form;
    /// applying it twice yields the same result.
    pub fn normalized(&self, global: &OcrSettings) -> Self {
        Self {
            crop_up: self.crop_up.filter(|v| *v != global.crop_up),
            crop_left: self.crop_left.filter(|v| *v != global.crop_left),
            crop_right: self.crop_right.filter(|v| *v != global.crop_right),
            crop_down: self.crop_down.filter(|v| *v != global.crop_down),
            spotlight_crop_up: self
                .spotlight_crop_up
                .filter(|v| *v != global.spotlight_crop_up),
            spotlight_crop_left: self
                .spotlight_crop_left
                .filter(|v| *v != global.spotlight_crop_left),
            spotlight_crop_right: self
                .spotlight_crop_right
                .filter(|v| *v != global.spotlight_crop_right),
            spotlight_crop_down: self
                .spotlight_crop_down
                .filter(|v| *v != global.spotlight_crop_down),
            target: self.target.filter(|v| *v != global.target),
            threshold: self.threshold.filter(|v| *v != global.threshold),
            interval: self.interval.filter(|v| *v != global.interval),
        }
    }

    /// Overlay these overrides on the global settings.
    pub fn apply(&self, global: &OcrSettings) -> OcrSettings {
        OcrSettings {
            crop_up: self.crop_up.unwrap_or(global.crop_up),
            crop_left: self.crop_left.unwrap_or(global.crop_left),
            crop_right: self.crop_right.unwrap_or(global.crop_right),
            crop_down: self.crop_down.unwrap_or(global.crop_down),
            spotlight_crop_up: self.spotlight_crop_up.unwrap_or(global.spotlight_crop_up),
            spotlight_crop_left: self
                .spotlight_crop_left
                .unwrap_or(global.spotlight_crop_left),
            spotlight_crop_right: self
                .spotlight_crop_right
                .unwrap_or(global.spotlight_crop_right),
            spotlight_crop_down: self
                .spotlight_crop_down
                .unwrap_or(global.spotlight_crop_down),
            target: self.target.unwrap_or(global.target),
            threshold: self.threshold.unwrap_or(global.threshold),
            interval: self.interval.unwrap_or(global.interval),
        }
    }

    /// Build overrides from a full settings snapshot: keep only the values
    /// that differ from global.
    pub fn diff(full: &OcrSettings, global: &OcrSettings) -> Self {
        Self {
            crop_up: Some(full.crop_up),
            crop_left: Some(full.crop_left),
            crop_right: Some(full.crop_right),
            crop_down: Some(full.crop_down),
            spotlight_crop_up: Some(full.spotlight_crop_up),
            spotlight_crop_left: Some(full.spotlight_crop_left),
            spotlight_crop_right: Some(full.spotlight_crop_right),
            spotlight_crop_down: Some(full.spotlight_crop_down),
            target: Some(full.target),
            threshold: Some(full.threshold),
            interval: Some(full.interval),
        }
        .normalized(global)
    }

    pub fn set_spotlight_crop(&mut self, margins: CropMargins) {
        self.spotlight_crop_up = Some(margins.up);
        self.spotlight_crop_left = Some(margins.left);
        self.spotlight_crop_right = Some(margins.right);
        self.spotlight_crop_down = Some(margins.down);
    }
}

fn crop_key(map: &serde_json::Map<String, Value>, key: &str) -> Option<u8> {
    let value = map.get(key)?;
    let number = value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64));
    match number {
        Some(n) if (0..=100).contains(&n) => Some(n as u8),
        _ => {
            tracing::warn!(key, %value, "skipping invalid crop override");
            None
        }
    }
}

fn float_key(map: &serde_json::Map<String, Value>, key: &str, min: f64, max: f64) -> Option<f64> {
    let value = map.get(key)?;
    match value.as_f64() {
        Some(f) if f.is_finite() && (min..=max).contains(&f) => Some(f),
        _ => {
            tracing::warn!(key, %value, "skipping invalid override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn global() -> OcrSettings {
        OcrSettings::default()
    }

    #[test]
    fn absent_keys_inherit_global() {
        let overrides = SettingsOverrides::default();
        assert_eq!(overrides.apply(&global()), global());
    }

    #[test]
    fn present_keys_win() {
        let overrides = SettingsOverrides {
            threshold: Some(0.8),
            ..SettingsOverrides::default()
        };
        let effective = overrides.apply(&global());
        assert_eq!(effective.threshold, 0.8);
        assert_eq!(effective.interval, global().interval);
        assert_eq!(effective.crop(), global().crop());
    }

    #[test]
    fn normalize_keeps_only_differences() {
        // Legacy full-snapshot profile: most values match global.
        let raw = json!({
            "cropLeft": 0,
            "cropRight": 25,
            "target": 1,
            "threshold": 0.5,
            "interval": 2.0
        });
        let overrides = SettingsOverrides::from_value(&raw).normalized(&global());
        assert_eq!(overrides.crop_left, None);
        assert_eq!(overrides.crop_right, Some(25));
        assert_eq!(overrides.target, None);
        assert_eq!(overrides.threshold, None);
        assert_eq!(overrides.interval, Some(2.0));
    }

    #[test]
    fn normalize_is_idempotent() {
        let raw = json!({ "cropDown": 10, "threshold": 0.9 });
        let once = SettingsOverrides::from_value(&raw).normalized(&global());
        let twice = once.normalized(&global());
        assert_eq!(once, twice);
    }

    #[test]
    fn invalid_values_are_skipped() {
        let raw = json!({
            "cropLeft": "wide",
            "cropRight": 250,
            "cropUp": 15,
            "target": 9,
            "threshold": "high",
            "interval": -3.0
        });
        let overrides = SettingsOverrides::from_value(&raw);
        assert_eq!(overrides.crop_left, None);
        assert_eq!(overrides.crop_right, None);
        assert_eq!(overrides.crop_up, Some(15));
        assert_eq!(overrides.target, None);
        assert_eq!(overrides.threshold, None);
        assert_eq!(overrides.interval, None);
    }

    #[test]
    fn non_object_profile_is_ignored() {
        assert!(SettingsOverrides::from_value(&json!([1, 2, 3])).is_empty());
        assert!(SettingsOverrides::from_value(&json!("text")).is_empty());
    }

    #[test]
    fn diff_then_apply_roundtrips() {
        let mut full = global();
        full.crop_left = 12;
        full.target = TargetKind::Focus;
        let overrides = SettingsOverrides::diff(&full, &global());
        assert_eq!(overrides.crop_left, Some(12));
        assert_eq!(overrides.target, Some(TargetKind::Focus));
        assert_eq!(overrides.threshold, None);
        assert_eq!(overrides.apply(&global()), full);
    }

    #[test]
    fn empty_overrides_serialize_to_empty_object() {
        let json = serde_json::to_string(&SettingsOverrides::default()).unwrap();
        assert_eq!(json, "{}");
    }
}
