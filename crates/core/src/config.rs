//! Map configuration.
//!
//! Defaults reproduce the stock globe view: centered on East Asia, globe
//! projection, transparent fog, Mapbox light/dark v10 styles. A YAML file may
//! override any subset of fields.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::LngLat;

pub const LIGHT_STYLE_URL: &str = "mapbox://styles/mapbox/light-v10";
pub const DARK_STYLE_URL: &str = "mapbox://styles/mapbox/dark-v10";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Projection {
    #[default]
    Globe,
    Mercator,
}

impl Projection {
    pub fn as_str(self) -> &'static str {
        match self {
            Projection::Globe => "globe",
            Projection::Mercator => "mercator",
        }
    }
}

/// Style URL for each presentation mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleUrls {
    pub light: String,
    pub dark: String,
}

impl Default for StyleUrls {
    fn default() -> Self {
        Self {
            light: LIGHT_STYLE_URL.to_string(),
            dark: DARK_STYLE_URL.to_string(),
        }
    }
}

impl StyleUrls {
    pub fn for_theme(&self, dark: bool) -> &str {
        if dark {
            &self.dark
        } else {
            &self.light
        }
    }
}

/// Atmosphere parameters, serialized with the provider's kebab-case keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FogConfig {
    pub color: String,
    pub high_color: String,
    pub space_color: String,
    pub horizon_blend: f64,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            color: "rgba(0,0,0,0)".to_string(),
            high_color: "rgba(255,255,255,0.1)".to_string(),
            space_color: "rgba(0,0,0,0)".to_string(),
            horizon_blend: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupOptions {
    pub offset: f64,
    pub close_button: bool,
    pub close_on_move: bool,
    pub focus_after_open: bool,
}

impl Default for PopupOptions {
    fn default() -> Self {
        Self {
            offset: 8.0,
            close_button: false,
            close_on_move: false,
            focus_after_open: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub access_token: String,
    pub center: [f64; 2],
    pub zoom: f64,
    pub projection: Projection,
    pub drag_rotate: bool,
    pub touch_pitch: bool,
    pub attribution_control: bool,
    pub styles: StyleUrls,
    pub fog: FogConfig,
    pub popup: PopupOptions,
    /// BCP 47 tag of the viewer, e.g. `zh-CN`. Drives the label language.
    pub locale: Option<String>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            center: [100.0, 30.0],
            zoom: 2.0,
            projection: Projection::Globe,
            drag_rotate: true,
            touch_pitch: true,
            attribution_control: false,
            styles: StyleUrls::default(),
            fog: FogConfig::default(),
            popup: PopupOptions::default(),
            locale: None,
        }
    }
}

impl MapConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = token.into();
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn center(&self) -> LngLat {
        LngLat::from(self.center)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_globe_view() {
        let config = MapConfig::default();
        assert_eq!(config.center(), LngLat::new(100.0, 30.0));
        assert_eq!(config.zoom, 2.0);
        assert_eq!(config.projection, Projection::Globe);
        assert!(config.drag_rotate && config.touch_pitch);
        assert!(!config.attribution_control);
        assert_eq!(config.styles.for_theme(true), DARK_STYLE_URL);
        assert_eq!(config.styles.for_theme(false), LIGHT_STYLE_URL);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = MapConfig::from_yaml("zoom: 3.5\nprojection: mercator\nlocale: zh-TW\n").unwrap();
        assert_eq!(config.zoom, 3.5);
        assert_eq!(config.projection, Projection::Mercator);
        assert_eq!(config.locale.as_deref(), Some("zh-TW"));
        assert_eq!(config.center, [100.0, 30.0]);
        assert_eq!(config.popup.offset, 8.0);
    }

    #[test]
    fn test_fog_uses_provider_keys() {
        let json = serde_json::to_value(FogConfig::default()).unwrap();
        assert_eq!(json["high-color"], "rgba(255,255,255,0.1)");
        assert_eq!(json["horizon-blend"], 0.0);
        assert!(json.get("high_color").is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.yaml");
        std::fs::write(&path, "styles:\n  dark: mapbox://styles/me/night\n").unwrap();
        let config = MapConfig::load(&path).unwrap();
        assert_eq!(config.styles.dark, "mapbox://styles/me/night");
        assert_eq!(config.styles.light, LIGHT_STYLE_URL);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = MapConfig::load(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_bad_yaml_is_yaml_error() {
        let err = MapConfig::from_yaml("zoom: [not, a, number]").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }
}
