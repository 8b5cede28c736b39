//! Per-application profile files and their in-memory mirror.
//!
//! One JSON file per tracked application, holding only the keys that
//! differ from the global settings. The cache is preloaded at startup so
//! focus-change lookups never touch disk, and it is write-through: a save
//! or delete updates memory only after the filesystem operation succeeds.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::PoisonError;
use std::sync::RwLock;

use glance_config::{OcrSettings, SettingsOverrides};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Reduce an application identifier to a filesystem-safe profile name.
pub fn sanitize_app_name(app: &str) -> String {
    let safe: String = app
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if safe.is_empty() {
        "unnamed".to_string()
    } else {
        safe
    }
}

pub struct ProfileStore {
    dir: PathBuf,
    cache: RwLock<HashMap<String, SettingsOverrides>>,
}

impl ProfileStore {
    /// Open a store rooted at `dir`, creating the directory if missing.
    /// A directory that cannot be created is logged; reads then behave as
    /// "no profiles" and saves report the failure.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(error) = fs::create_dir_all(&dir) {
            tracing::error!(dir = %dir.display(), %error, "failed to create profiles directory");
        }
        Self {
            dir,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Read every persisted profile into the cache, normalizing against
    /// `global`. Unreadable files are logged and skipped.
    pub fn preload(&self, global: &OcrSettings) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(dir = %self.dir.display(), %error, "cannot enumerate profiles");
                return;
            }
        };
        let mut count = 0usize;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if self.load_from_disk(name, global).is_some() {
                count += 1;
            }
        }
        tracing::info!(count, dir = %self.dir.display(), "preloaded profiles");
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Overrides for `app`, or `None` when the application has never been
    /// tracked. An empty overrides value is a real result: the app has a
    /// profile that currently matches global.
    pub fn load(&self, app: &str, global: &OcrSettings) -> Option<SettingsOverrides> {
        let name = sanitize_app_name(app);
        if let Some(overrides) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&name)
        {
            return Some(overrides.clone());
        }
        self.load_from_disk(&name, global)
    }

    fn load_from_disk(&self, name: &str, global: &OcrSettings) -> Option<SettingsOverrides> {
        let path = self.path_for(name);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return None,
            Err(error) => {
                tracing::error!(path = %path.display(), %error, "cannot read profile");
                return None;
            }
        };
        let raw: serde_json::Value = match serde_json::from_str(&data) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::error!(path = %path.display(), %error, "malformed profile, ignoring");
                return None;
            }
        };

        let overrides = SettingsOverrides::from_value(&raw).normalized(global);

        // Migrate legacy full-snapshot profiles to override-only form on
        // disk. Keeping the normalized data on a failed write is fine; the
        // migration will simply be retried next load.
        match serde_json::to_value(&overrides) {
            Ok(normalized_value) if normalized_value != raw => {
                if let Err(error) = self.write_file(&path, &overrides) {
                    tracing::warn!(path = %path.display(), %error, "profile migration not persisted");
                } else {
                    tracing::info!(profile = %name, "migrated profile to override-only form");
                }
            }
            _ => {}
        }

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), overrides.clone());
        Some(overrides)
    }

    /// Persist overrides for `app`, then update the cache. An empty
    /// overrides value is saved as `{}` and keeps the app tracked.
    pub fn save(&self, app: &str, overrides: &SettingsOverrides) -> Result<(), StoreError> {
        let name = sanitize_app_name(app);
        let path = self.path_for(&name);
        self.write_file(&path, overrides)?;
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, overrides.clone());
        tracing::info!(profile = %app, "saved profile");
        Ok(())
    }

    fn write_file(&self, path: &Path, overrides: &SettingsOverrides) -> Result<(), StoreError> {
        let data = serde_json::to_string_pretty(overrides).map_err(|source| StoreError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, data).map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Remove the profile file and forget the cache entry.
    pub fn delete(&self, app: &str) -> Result<(), StoreError> {
        let name = sanitize_app_name(app);
        let path = self.path_for(&name);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(StoreError::Delete { path, source }),
        }
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&name);
        tracing::info!(profile = %app, "deleted profile");
        Ok(())
    }

    /// True when `app` has a persisted (possibly empty) profile.
    pub fn contains(&self, app: &str) -> bool {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&sanitize_app_name(app))
    }

    /// Sanitized names of every cached profile, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn global() -> OcrSettings {
        OcrSettings::default()
    }

    #[test]
    fn sanitize_keeps_only_safe_characters() {
        assert_eq!(sanitize_app_name("fire fox.exe"), "firefoxexe");
        assert_eq!(sanitize_app_name("my-app_2"), "my-app_2");
        assert_eq!(sanitize_app_name("///"), "unnamed");
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::open(dir.path());
        let overrides = SettingsOverrides {
            threshold: Some(0.8),
            crop_left: Some(20),
            ..SettingsOverrides::default()
        };
        store.save("editor", &overrides).unwrap();

        // A fresh store reads from disk; the first one hits its cache.
        assert_eq!(store.load("editor", &global()), Some(overrides.clone()));
        let second = ProfileStore::open(dir.path());
        assert_eq!(second.load("editor", &global()), Some(overrides));
    }

    #[test]
    fn missing_profile_loads_as_none() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::open(dir.path());
        assert_eq!(store.load("nothing", &global()), None);
    }

    #[test]
    fn malformed_profile_is_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        let store = ProfileStore::open(dir.path());
        assert_eq!(store.load("broken", &global()), None);
    }

    #[test]
    fn legacy_full_profile_is_migrated_on_load() {
        let dir = tempdir().unwrap();
        // Legacy format: a full snapshot, mostly equal to global.
        fs::write(
            dir.path().join("legacy.json"),
            r#"{"cropUp":0,"cropLeft":0,"cropRight":30,"cropDown":0,"target":1,"threshold":0.5,"interval":1.0}"#,
        )
        .unwrap();

        let store = ProfileStore::open(dir.path());
        let overrides = store.load("legacy", &global()).unwrap();
        assert_eq!(
            overrides,
            SettingsOverrides {
                crop_right: Some(30),
                ..SettingsOverrides::default()
            }
        );

        // The override-only form was written back.
        let on_disk: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("legacy.json")).unwrap())
                .unwrap();
        assert_eq!(on_disk, serde_json::json!({ "cropRight": 30 }));
    }

    #[test]
    fn empty_profile_stays_persistent() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::open(dir.path());
        store.save("tracked", &SettingsOverrides::default()).unwrap();

        let second = ProfileStore::open(dir.path());
        second.preload(&global());
        assert!(second.contains("tracked"));
        assert_eq!(
            second.load("tracked", &global()),
            Some(SettingsOverrides::default())
        );
        assert_eq!(second.list(), vec!["tracked".to_string()]);
    }

    #[test]
    fn preload_fills_cache_for_all_profiles() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::open(dir.path());
        store
            .save("alpha", &SettingsOverrides { interval: Some(2.0), ..Default::default() })
            .unwrap();
        store
            .save("beta", &SettingsOverrides { threshold: Some(0.9), ..Default::default() })
            .unwrap();

        let second = ProfileStore::open(dir.path());
        second.preload(&global());
        assert_eq!(second.list(), vec!["alpha".to_string(), "beta".to_string()]);
    }

    #[test]
    fn delete_removes_file_and_cache_entry() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::open(dir.path());
        store
            .save("gone", &SettingsOverrides { interval: Some(3.0), ..Default::default() })
            .unwrap();
        store.delete("gone").unwrap();

        assert!(!store.contains("gone"));
        assert_eq!(store.load("gone", &global()), None);
        assert!(!dir.path().join("gone.json").exists());

        // Deleting an untracked profile is not an error.
        store.delete("never-existed").unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn failed_save_leaves_cache_unchanged() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::open(dir.path());
        // Occupy the profile path with a directory so the write fails.
        fs::create_dir(dir.path().join("blocked.json")).unwrap();

        let overrides = SettingsOverrides {
            threshold: Some(0.7),
            ..SettingsOverrides::default()
        };
        assert!(store.save("blocked", &overrides).is_err());
        assert!(!store.contains("blocked"));
    }
}
