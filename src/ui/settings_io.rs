use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::ui::settings::TutorSettings;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("could not access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("settings file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub fn settings_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("cafe_trainer");
    path.push("settings.json");
    path
}

/// Loads settings, falling back to defaults on any problem.
pub fn load_settings() -> TutorSettings {
    let path = settings_path();
    match load_settings_from(&path) {
        Ok(settings) => settings,
        Err(err) => {
            warn!(error = %err, "using default settings");
            TutorSettings::default()
        }
    }
}

/// A missing file is not an error; it yields the defaults.
pub fn load_settings_from(path: &Path) -> Result<TutorSettings, SettingsError> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no settings file yet");
            return Ok(TutorSettings::default());
        }
        Err(source) => {
            return Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(&json).map_err(|source| SettingsError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_settings(settings: &TutorSettings) {
    let path = settings_path();
    if let Err(err) = save_settings_to(&path, settings) {
        warn!(error = %err, "failed to save settings");
    }
}

pub fn save_settings_to(path: &Path, settings: &TutorSettings) -> Result<(), SettingsError> {
    let io_err = |source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(|source| SettingsError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::settings::Provider;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let settings = load_settings_from(&dir.path().join("absent.json")).unwrap();

        assert_eq!(settings, TutorSettings::default());
    }

    #[test]
    fn saved_settings_load_back() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("nested").join("settings.json");
        let settings = TutorSettings {
            provider: Provider::OpenAiCompatible,
            model: "local-model".into(),
            ui_scale: 1.25,
            ..TutorSettings::default()
        };

        save_settings_to(&path, &settings).unwrap();
        assert_eq!(load_settings_from(&path).unwrap(), settings);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_settings_from(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Json { .. }));
    }
}
