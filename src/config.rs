//! Configuration loading.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{controls::ControlsConfig, error::SceneResult};

/// Environment variable naming an alternative configuration file.
pub const CONFIG_ENV: &str = "CUBES_DEMO_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "cubes-demo.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub dome: DomeConfig,
    #[serde(default)]
    pub controls: ControlsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            width: default_width(),
            height: default_height(),
        }
    }
}

fn default_title() -> String {
    "cubes-demo".to_string()
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

/// Where editor overrides are persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Key under which the editable state is stored
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Directory of the file store on native targets
    #[serde(default = "default_dir")]
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            dir: default_dir(),
        }
    }
}

fn default_namespace() -> String {
    "cubes-demo".to_string()
}

fn default_dir() -> PathBuf {
    PathBuf::from(".editable-state")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomeConfig {
    #[serde(default = "default_texture_url")]
    pub texture_url: String,
    #[serde(default = "default_radius")]
    pub radius: f32,
    #[serde(default = "default_width_segments")]
    pub width_segments: u32,
    #[serde(default = "default_height_segments")]
    pub height_segments: u32,
}

impl Default for DomeConfig {
    fn default() -> Self {
        Self {
            texture_url: default_texture_url(),
            radius: default_radius(),
            width_segments: default_width_segments(),
            height_segments: default_height_segments(),
        }
    }
}

fn default_texture_url() -> String {
    "http://192.168.1.198:3000/2294472375_24a3b8ef46_o.jpg".to_string()
}

fn default_radius() -> f32 {
    500.0
}

fn default_width_segments() -> u32 {
    60
}

fn default_height_segments() -> u32 {
    40
}

impl Config {
    pub fn from_toml(content: &str) -> SceneResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> SceneResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> SceneResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            log::info!(
                "Configuration file {} not found, using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    /// Path from `CUBES_DEMO_CONFIG`, falling back to `cubes-demo.toml`.
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.storage.namespace, "cubes-demo");
        assert_eq!(config.dome.radius, 500.0);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml(
            r#"
            [window]
            width = 640

            [controls]
            auto_rotate = false
            "#,
        )
        .unwrap();
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 720);
        assert!(!config.controls.auto_rotate);
        assert_eq!(config.controls.rotate_speed, -0.5);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let err = Config::from_toml("[window]\nwidth = \"wide\"").unwrap_err();
        assert!(matches!(err, crate::error::SceneError::Config(_)));
    }
}
