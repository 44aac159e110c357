//! User preference loading with XDG Base Directory compliance.
//!
//! Settings are read once at startup; the player never writes playback
//! state back to disk.

use std::{
    env::var,
    fs::read_to_string,
    io::Error as StdError,
    path::{Path, PathBuf},
};

use {
    serde::{Deserialize, Serialize},
    serde_json::{Error as SerdeJsonError, from_str},
    thiserror::Error,
    tracing::debug,
};

/// Tracks bundled with the player, in playback order.
pub const BUNDLED_TRACKS: [&str; 5] = [
    "01-Jak.mp3",
    "02-Narodziny-swiata.mp3",
    "03-Czarny-blues-o-czwartej-nad-ranem.mp3",
    "04-Opadły-mgły,-wstaje-nowy-dzień.mp3",
    "05-Pieśń-na-wyjście.mp3",
];

/// Error type for settings operations.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Failed to read the settings file.
    #[error("IO error: {0}")]
    IoError(#[from] StdError),
    /// Failed to deserialize settings.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] SerdeJsonError),
    /// Invalid settings value.
    #[error("Invalid settings value: {reason}")]
    InvalidValue { reason: String },
}

/// Serializable user settings structure with default values.
///
/// Missing fields in the settings file fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    /// Directory the track identifiers are resolved against.
    pub assets_dir: PathBuf,
    /// Ordered track identifiers.
    pub tracks: Vec<String>,
    /// Progress refresh cadence in milliseconds.
    pub sync_interval_ms: u64,
    /// Distance covered by the skip buttons in milliseconds.
    pub skip_step_ms: i64,
    /// Output latency hint in milliseconds.
    pub buffer_duration_ms: u32,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
            tracks: BUNDLED_TRACKS.iter().map(ToString::to_string).collect(),
            sync_interval_ms: 1000,
            skip_step_ms: 10_000,
            buffer_duration_ms: 50,
        }
    }
}

impl UserSettings {
    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidValue` for an empty track list, a zero
    /// sync interval, or a non-positive skip step.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.tracks.is_empty() {
            return Err(SettingsError::InvalidValue {
                reason: "track list must not be empty".to_string(),
            });
        }
        if self.sync_interval_ms == 0 {
            return Err(SettingsError::InvalidValue {
                reason: "sync_interval_ms must be greater than 0".to_string(),
            });
        }
        if self.skip_step_ms <= 0 {
            return Err(SettingsError::InvalidValue {
                reason: "skip_step_ms must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Handles loading and validation of user preferences.
#[derive(Debug, Clone)]
pub struct SettingsManager {
    /// Loaded user settings.
    settings: UserSettings,
    /// Path to the configuration file on disk.
    config_path: PathBuf,
}

impl SettingsManager {
    /// Loads settings from the default config path.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if an existing settings file cannot be read or is invalid.
    pub fn new() -> Result<Self, SettingsError> {
        Self::with_config_path(get_config_path())
    }

    /// Loads settings from a custom config path.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Path of the settings file
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the file exists but cannot be read, parsed or validated.
    pub fn with_config_path(config_path: PathBuf) -> Result<Self, SettingsError> {
        let settings = if config_path.exists() {
            debug!("Loading settings from existing file: {:?}", config_path);
            let contents = read_to_string(&config_path)?;
            from_str(&contents)?
        } else {
            debug!("No settings file at {:?}, using defaults", config_path);
            UserSettings::default()
        };
        settings.validate()?;

        Ok(Self {
            settings,
            config_path,
        })
    }

    /// Gets the current settings.
    #[must_use]
    pub fn get_settings(&self) -> &UserSettings {
        &self.settings
    }

    /// Gets the configuration file path.
    #[must_use]
    pub fn get_config_path(&self) -> &Path {
        &self.config_path
    }
}

/// Location of the settings file under the XDG config directory.
#[must_use]
pub fn get_config_path() -> PathBuf {
    let mut config_dir = get_xdg_config_home();
    config_dir.push("musicbox");
    config_dir.push("settings.json");
    config_dir
}

/// Gets the XDG config home directory following XDG Base Directory specification.
///
/// Uses `XDG_CONFIG_HOME` environment variable if set, otherwise defaults to $HOME/.config
fn get_xdg_config_home() -> PathBuf {
    if let Ok(config_home) = var("XDG_CONFIG_HOME")
        && !config_home.is_empty()
    {
        return PathBuf::from(config_home);
    }

    if let Ok(home) = var("HOME") {
        let mut path = PathBuf::from(home);
        path.push(".config");
        return path;
    }

    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use std::{fs::write, io::Error, io::ErrorKind::NotFound, path::PathBuf};

    use {serde_json::from_str, tempfile::tempdir};

    use crate::config::settings::{BUNDLED_TRACKS, SettingsError, SettingsManager, UserSettings};

    #[test]
    fn test_user_settings_default() {
        let settings = UserSettings::default();
        assert_eq!(settings.tracks.len(), BUNDLED_TRACKS.len());
        assert_eq!(settings.tracks[0], "01-Jak.mp3");
        assert_eq!(settings.sync_interval_ms, 1000);
        assert_eq!(settings.skip_step_ms, 10_000);
        assert_eq!(settings.assets_dir, PathBuf::from("assets"));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: UserSettings = from_str(r#"{ "assets_dir": "/opt/music" }"#).unwrap();
        assert_eq!(settings.assets_dir, PathBuf::from("/opt/music"));
        assert_eq!(settings.tracks.len(), 5);
        assert_eq!(settings.sync_interval_ms, 1000);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let manager = SettingsManager::with_config_path(dir.path().join("settings.json")).unwrap();
        assert_eq!(manager.get_settings(), &UserSettings::default());
        assert!(!manager.get_config_path().exists());
    }

    #[test]
    fn test_settings_file_is_loaded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        write(
            &path,
            r#"{ "tracks": ["a.mp3", "b.mp3"], "sync_interval_ms": 500 }"#,
        )
        .unwrap();

        let manager = SettingsManager::with_config_path(path).unwrap();
        assert_eq!(manager.get_settings().tracks, vec!["a.mp3", "b.mp3"]);
        assert_eq!(manager.get_settings().sync_interval_ms, 500);
    }

    #[test]
    fn test_empty_track_list_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        write(&path, r#"{ "tracks": [] }"#).unwrap();

        let result = SettingsManager::with_config_path(path);
        assert!(matches!(result, Err(SettingsError::InvalidValue { .. })));
    }

    #[test]
    fn test_malformed_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        write(&path, "{ not json").unwrap();

        let result = SettingsManager::with_config_path(path);
        assert!(matches!(result, Err(SettingsError::SerializationError(_))));
    }

    #[test]
    fn test_settings_error_display() {
        let io_error = Error::new(NotFound, "File not found");
        let settings_error = SettingsError::IoError(io_error);
        assert!(settings_error.to_string().contains("IO error"));

        let invalid_value_error = SettingsError::InvalidValue {
            reason: "test reason".to_string(),
        };
        assert_eq!(
            invalid_value_error.to_string(),
            "Invalid settings value: test reason"
        );
    }
}
