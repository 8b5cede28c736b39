use glance_types::{CropMargins, TargetKind};
use serde::{Deserialize, Serialize};

pub const CROP_MAX_PERCENT: u8 = 100;
pub const THRESHOLD_MIN: f64 = 0.0;
pub const THRESHOLD_MAX: f64 = 1.0;
pub const INTERVAL_MIN_SECS: f64 = 0.0;
pub const INTERVAL_MAX_SECS: f64 = 10.0;

fn default_target() -> TargetKind {
    TargetKind::Screen
}

fn default_threshold() -> f64 {
    0.5
}

fn default_interval() -> f64 {
    1.0
}

/// The full recognized configuration, one value per key.
///
/// Field names mirror the persisted JSON schema: `cropUp`..`cropDown` for
/// the live-loop region, `spotlight_*` for the manually scanned region,
/// plus `target`, `threshold` and `interval`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    #[serde(rename = "cropUp")]
    pub crop_up: u8,
    #[serde(rename = "cropLeft")]
    pub crop_left: u8,
    #[serde(rename = "cropRight")]
    pub crop_right: u8,
    #[serde(rename = "cropDown")]
    pub crop_down: u8,
    #[serde(rename = "spotlight_cropUp")]
    pub spotlight_crop_up: u8,
    #[serde(rename = "spotlight_cropLeft")]
    pub spotlight_crop_left: u8,
    #[serde(rename = "spotlight_cropRight")]
    pub spotlight_crop_right: u8,
    #[serde(rename = "spotlight_cropDown")]
    pub spotlight_crop_down: u8,
    pub target: TargetKind,
    /// Similarity below this ratio counts as "new text".
    pub threshold: f64,
    /// Seconds between scan iterations.
    pub interval: f64,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            crop_up: 0,
            crop_left: 0,
            crop_right: 0,
            crop_down: 0,
            spotlight_crop_up: 0,
            spotlight_crop_left: 0,
            spotlight_crop_right: 0,
            spotlight_crop_down: 0,
            target: default_target(),
            threshold: default_threshold(),
            interval: default_interval(),
        }
    }
}

impl OcrSettings {
    pub fn crop(&self) -> CropMargins {
        CropMargins::new(self.crop_up, self.crop_left, self.crop_right, self.crop_down)
    }

    pub fn spotlight_crop(&self) -> CropMargins {
        CropMargins::new(
            self.spotlight_crop_up,
            self.spotlight_crop_left,
            self.spotlight_crop_right,
            self.spotlight_crop_down,
        )
    }

    /// Check every value against its documented range.
    ///
    /// Rejecting here keeps bad values out of persistent storage; callers
    /// surface the message to the user and leave stored state untouched.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (name, value) in [
            ("crop up", self.crop_up),
            ("crop left", self.crop_left),
            ("crop right", self.crop_right),
            ("crop down", self.crop_down),
            ("spotlight crop up", self.spotlight_crop_up),
            ("spotlight crop left", self.spotlight_crop_left),
            ("spotlight crop right", self.spotlight_crop_right),
            ("spotlight crop down", self.spotlight_crop_down),
        ] {
            if value > CROP_MAX_PERCENT {
                return Err(SettingsError::CropOutOfRange { name, value });
            }
        }
        if self.crop_left as u16 + self.crop_right as u16 >= 100 {
            return Err(SettingsError::CropOverlap {
                axis: "horizontal",
                first: self.crop_left,
                second: self.crop_right,
            });
        }
        if self.crop_up as u16 + self.crop_down as u16 >= 100 {
            return Err(SettingsError::CropOverlap {
                axis: "vertical",
                first: self.crop_up,
                second: self.crop_down,
            });
        }
        if !self.threshold.is_finite() || !(THRESHOLD_MIN..=THRESHOLD_MAX).contains(&self.threshold)
        {
            return Err(SettingsError::ThresholdOutOfRange(self.threshold));
        }
        if !self.interval.is_finite()
            || !(INTERVAL_MIN_SECS..=INTERVAL_MAX_SECS).contains(&self.interval)
        {
            return Err(SettingsError::IntervalOutOfRange(self.interval));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SettingsError {
    #[error("{name} is {value}%, must be between 0 and 100")]
    CropOutOfRange { name: &'static str, value: u8 },

    #[error("{axis} crop margins overlap: {first}% plus {second}% must stay under 100%")]
    CropOverlap {
        axis: &'static str,
        first: u8,
        second: u8,
    },

    #[error("threshold is {0}, must be between 0.0 and 1.0")]
    ThresholdOutOfRange(f64),

    #[error("interval is {0} seconds, must be between 0.0 and 10.0")]
    IntervalOutOfRange(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_schema() {
        let settings = OcrSettings::default();
        assert_eq!(settings.crop(), CropMargins::default());
        assert_eq!(settings.spotlight_crop(), CropMargins::default());
        assert_eq!(settings.target, TargetKind::Screen);
        assert_eq!(settings.threshold, 0.5);
        assert_eq!(settings.interval, 1.0);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn persisted_keys_are_flat() {
        let settings = OcrSettings {
            crop_left: 5,
            spotlight_crop_down: 7,
            ..OcrSettings::default()
        };
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["cropLeft"], 5);
        assert_eq!(json["spotlight_cropDown"], 7);
        assert_eq!(json["target"], 1);
    }

    #[test]
    fn overlapping_crop_is_rejected() {
        let settings = OcrSettings {
            crop_left: 60,
            crop_right: 40,
            ..OcrSettings::default()
        };
        assert_eq!(
            settings.validate(),
            Err(SettingsError::CropOverlap {
                axis: "horizontal",
                first: 60,
                second: 40,
            })
        );
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let settings = OcrSettings {
            threshold: 1.5,
            ..OcrSettings::default()
        };
        assert_eq!(
            settings.validate(),
            Err(SettingsError::ThresholdOutOfRange(1.5))
        );

        let settings = OcrSettings {
            interval: 11.0,
            ..OcrSettings::default()
        };
        assert_eq!(
            settings.validate(),
            Err(SettingsError::IntervalOutOfRange(11.0))
        );
    }
}
