//! Configuration loader - YAML viewer settings + .env secrets

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::detail::EdgePolicy;

/// Main configuration loaded from viewer.yaml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub map: MapConfig,
    pub spin: SpinConfig,
    pub selection: SelectionConfig,
    pub detail: DetailConfig,
    pub carousel: CarouselConfig,
    pub fog: FogConfig,
    /// Dataset file; the bundled dataset is used when unset
    pub dataset: Option<PathBuf>,
    /// GeoJSON with coastlines / borders to draw on the globe
    pub borders: Option<PathBuf>,
    pub preferences_path: PreferencesPath,
}

/// Initial camera and zoom limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub initial_zoom: f64,
    /// [lng, lat]
    pub center: [f64; 2],
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            initial_zoom: 3.0,
            center: [0.0, 20.0],
            min_zoom: 0.0,
            max_zoom: 12.0,
        }
    }
}

/// Idle globe spin
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinConfig {
    pub enabled: bool,
    pub seconds_per_revolution: f64,
    /// At or above this zoom the globe does not spin
    pub max_spin_zoom: f64,
    /// Above this zoom the spin slows down linearly
    pub slow_spin_zoom: f64,
    pub frames_per_second: f64,
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            seconds_per_revolution: 120.0,
            max_spin_zoom: 5.0,
            slow_spin_zoom: 3.0,
            frames_per_second: 60.0,
        }
    }
}

/// Camera moves triggered by selection and double-click
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub fly_to_zoom: f64,
    pub fly_to_duration_ms: u64,
    pub double_click_zoom_step: f64,
    pub double_click_duration_ms: u64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            fly_to_zoom: 8.0,
            fly_to_duration_ms: 2000,
            double_click_zoom_step: 2.0,
            double_click_duration_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailConfig {
    pub edge_policy: EdgePolicy,
}

/// Image carousel inside the detail view
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CarouselConfig {
    pub interval_secs: u64,
    /// Prefix of the hero URL derived from a temple name
    pub fallback_base_url: String,
    pub placeholder_url: String,
    pub thumbnail_placeholder_url: String,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            interval_secs: 8,
            fallback_base_url: "https://churchofjesuschrist.org/imgs/temples".to_string(),
            placeholder_url: "https://placehold.co/1920x1080/1a1a1a/ffffff.png?text=Temple+Image".to_string(),
            thumbnail_placeholder_url: "https://placehold.co/200x120/1a1a1a/ffffff.png?text=Temple".to_string(),
        }
    }
}

/// Globe atmosphere
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FogConfig {
    /// Lower atmosphere
    pub color: [u8; 3],
    /// Upper atmosphere
    pub high_color: [u8; 3],
    /// Atmosphere thickness as a fraction of the globe radius
    pub horizon_blend: f32,
    pub space_color: [u8; 3],
    pub star_intensity: f32,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            color: [186, 210, 235],
            high_color: [36, 92, 223],
            horizon_blend: 0.02,
            space_color: [11, 11, 25],
            star_intensity: 0.6,
        }
    }
}

/// Path of the accessibility preference file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreferencesPath(pub PathBuf);

impl Default for PreferencesPath {
    fn default() -> Self {
        Self(PathBuf::from("accessibility.yaml"))
    }
}

/// Secrets and environment overrides loaded from .env
#[derive(Debug, Clone)]
pub struct Secrets {
    pub nominatim_url: String,
    pub user_agent: String,
    pub dataset_path: PathBuf,
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when it exists, otherwise defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            tracing::info!("Loading config from {:?}", path);
            Self::load(path)
        } else {
            tracing::warn!("Config file not found: {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        if self.map.min_zoom > self.map.max_zoom {
            anyhow::bail!("map.min_zoom ({}) exceeds map.max_zoom ({})", self.map.min_zoom, self.map.max_zoom);
        }
        if self.spin.slow_spin_zoom >= self.spin.max_spin_zoom {
            anyhow::bail!(
                "spin.slow_spin_zoom ({}) must be below spin.max_spin_zoom ({})",
                self.spin.slow_spin_zoom,
                self.spin.max_spin_zoom
            );
        }
        if self.spin.seconds_per_revolution <= 0.0 || self.spin.frames_per_second <= 0.0 {
            anyhow::bail!("spin.seconds_per_revolution and spin.frames_per_second must be positive");
        }
        Ok(())
    }
}

impl Secrets {
    /// Load secrets from .env file
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        Secrets {
            nominatim_url: std::env::var("NOMINATIM_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org/search".to_string()),
            user_agent: std::env::var("GEOCODER_USER_AGENT").unwrap_or_else(|_| "TempleGeocoder/1.0".to_string()),
            dataset_path: std::env::var("DATASET_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/temples.json")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "spin:\n  seconds_per_revolution: 60\ndetail:\n  edge_policy: clamp\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.spin.seconds_per_revolution, 60.0);
        assert_eq!(config.spin.max_spin_zoom, 5.0);
        assert_eq!(config.detail.edge_policy, EdgePolicy::Clamp);
        assert_eq!(config.map.center, [0.0, 20.0]);
        assert_eq!(config.preferences_path.0, PathBuf::from("accessibility.yaml"));
    }

    #[test]
    fn test_rejects_inverted_spin_zooms() {
        let mut config = Config::default();
        config.spin.slow_spin_zoom = 6.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let config = Config::load_or_default(Path::new("does/not/exist/viewer.yaml")).unwrap();

        assert_eq!(config.spin.seconds_per_revolution, Config::default().spin.seconds_per_revolution);
        assert_eq!(config.map.center, [0.0, 20.0]);
        assert_eq!(config.detail.edge_policy, EdgePolicy::Wrap);
        assert!(config.dataset.is_none());
    }

    #[test]
    fn test_existing_invalid_config_is_an_error() {
        let path = std::env::temp_dir().join(format!("temple_globe_viewer_{}.yaml", std::process::id()));
        std::fs::write(&path, "map:
  min_zoom: 9
  max_zoom: 2
").unwrap();

        let result = Config::load_or_default(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }
}
