//! Global settings persistence.
//!
//! The settings file uses the same flat key schema as the profiles. Loading
//! degrades key by key: a value of the wrong type or outside its range
//! falls back to the documented default instead of failing the whole file.

use std::fs;
use std::path::Path;

use glance_config::{OcrSettings, SettingsOverrides};

use crate::store::StoreError;

/// Load global settings, substituting defaults for anything missing,
/// malformed, or out of range.
pub fn load_settings(path: &Path) -> OcrSettings {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no settings file, using defaults");
            return OcrSettings::default();
        }
        Err(error) => {
            tracing::error!(path = %path.display(), %error, "cannot read settings, using defaults");
            return OcrSettings::default();
        }
    };
    let raw: serde_json::Value = match serde_json::from_str(&data) {
        Ok(raw) => raw,
        Err(error) => {
            tracing::error!(path = %path.display(), %error, "malformed settings, using defaults");
            return OcrSettings::default();
        }
    };
    SettingsOverrides::from_value(&raw).apply(&OcrSettings::default())
}

/// Write the settings file, creating parent directories as needed.
pub fn save_settings(path: &Path, settings: &OcrSettings) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    let data = serde_json::to_string_pretty(settings).map_err(|source| StoreError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, data).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), "saved settings");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let settings = load_settings(&dir.path().join("settings.json"));
        assert_eq!(settings, OcrSettings::default());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = OcrSettings {
            crop_down: 25,
            threshold: 0.75,
            interval: 2.5,
            ..OcrSettings::default()
        };
        save_settings(&path, &settings).unwrap();
        assert_eq!(load_settings(&path), settings);
    }

    #[test]
    fn bad_values_fall_back_individually() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"cropLeft": 12, "cropRight": "lots", "threshold": 7.0, "interval": 2.0}"#,
        )
        .unwrap();
        let settings = load_settings(&path);
        assert_eq!(settings.crop_left, 12);
        assert_eq!(settings.crop_right, 0);
        assert_eq!(settings.threshold, 0.5);
        assert_eq!(settings.interval, 2.0);
    }
}
