use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::app_dirs::AppDirs;
use crate::discovery::{DEFAULT_CHECK_INTERVAL_SECS, DEFAULT_THRESHOLD};
use crate::error::{Result, TrackerError};
use crate::geo::GeoPoint;
use crate::manual::DEFAULT_STEP_DEGREES;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub discovery_interval_secs: u64,
    /// An encounter check fires when a uniform draw exceeds this.
    pub discovery_threshold: f64,
    pub rarity_weighted: bool,
    pub manual_step_degrees: f64,
    pub tick_rate_ms: u64,
    pub start_latitude: f64,
    pub start_longitude: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discovery_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            discovery_threshold: DEFAULT_THRESHOLD,
            rarity_weighted: false,
            manual_step_degrees: DEFAULT_STEP_DEGREES,
            tick_rate_ms: 100,
            // Seoul City Hall
            start_latitude: 37.5663,
            start_longitude: 126.9779,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.discovery_interval_secs == 0 {
            return Err(TrackerError::InvalidConfig(
                "discovery interval must be at least one second".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.discovery_threshold) {
            return Err(TrackerError::InvalidConfig(format!(
                "discovery threshold {} is outside [0, 1]",
                self.discovery_threshold
            )));
        }
        if !(self.manual_step_degrees > 0.0 && self.manual_step_degrees < 1.0) {
            return Err(TrackerError::InvalidConfig(format!(
                "manual step {} must be within (0, 1) degrees",
                self.manual_step_degrees
            )));
        }
        if self.tick_rate_ms == 0 {
            return Err(TrackerError::InvalidConfig("tick rate must be positive".into()));
        }
        self.start_point().map(|_| ())
    }

    pub fn start_point(&self) -> Result<GeoPoint> {
        GeoPoint::new(self.start_latitude, self.start_longitude)
    }

    pub fn discovery_interval(&self) -> Duration {
        Duration::from_secs(self.discovery_interval_secs)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("catwalk_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            debug!(path = %self.path.display(), "no config file; using defaults");
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "malformed config; using defaults");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config {
            discovery_interval_secs: 10,
            discovery_threshold: 0.7,
            rarity_weighted: true,
            manual_step_degrees: 0.0005,
            tick_rate_ms: 50,
            start_latitude: 35.1154,
            start_longitude: 129.0421,
        };
        store.save(&cfg).unwrap();
        assert_eq!(cfg, store.load());
    }

    #[test]
    fn missing_or_malformed_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        assert_eq!(store.load(), Config::default());

        fs::write(&path, b"{ not json").unwrap();
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, br#"{ "discovery_threshold": 0.7 }"#).unwrap();

        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.discovery_threshold, 0.7);
        assert_eq!(cfg.discovery_interval_secs, 30);
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(Config::default().validate().is_ok());

        let bad = [
            Config {
                discovery_interval_secs: 0,
                ..Config::default()
            },
            Config {
                discovery_threshold: 1.5,
                ..Config::default()
            },
            Config {
                manual_step_degrees: 0.0,
                ..Config::default()
            },
            Config {
                tick_rate_ms: 0,
                ..Config::default()
            },
        ];
        for cfg in bad {
            assert_matches!(cfg.validate(), Err(TrackerError::InvalidConfig(_)));
        }

        let off_map = Config {
            start_latitude: 95.0,
            ..Config::default()
        };
        assert_matches!(
            off_map.validate(),
            Err(TrackerError::InvalidCoordinate { .. })
        );
    }
}
