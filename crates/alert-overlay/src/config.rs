//! Layer configuration.
//!
//! Loaded from YAML or from `ALERT_*` environment variables. Dates accept
//! either raw alert date values (`16060`) or ISO dates (`2016-03-01`).

use std::path::Path;
use std::time::Duration;

use alert_common::{parse_date_value, AlertError, AlertResult};
use alert_renderer::FilterState;
use serde::{Deserialize, Deserializer, Serialize};

/// Placeholders every tile URL template must carry.
pub const URL_PLACEHOLDERS: [&str; 3] = ["{z}", "{x}", "{y}"];

fn default_min_date() -> u32 {
    15000
}

fn default_max_date() -> u32 {
    16365
}

/// Configuration for one alert layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Tile URL template, e.g. `https://tiles.example.org/alerts/{z}/{x}/{y}.png`
    pub tile_url: String,

    /// Inclusive lower date bound
    #[serde(default = "default_min_date", deserialize_with = "date_setting")]
    pub min_date: u32,

    /// Inclusive upper date bound
    #[serde(default = "default_max_date", deserialize_with = "date_setting")]
    pub max_date: u32,

    /// Hide provisional detections
    #[serde(default)]
    pub confirmed_only: bool,

    /// Drop tile results that arrive after the viewport moved on.
    /// Off by default: late tiles still composite onto the surface.
    #[serde(default)]
    pub discard_stale_tiles: bool,

    /// Per-request timeout. Unset means requests never time out.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl OverlayConfig {
    /// Config with the default date range for a tile URL template.
    pub fn new(tile_url: impl Into<String>) -> Self {
        Self {
            tile_url: tile_url.into(),
            min_date: default_min_date(),
            max_date: default_max_date(),
            confirmed_only: false,
            discard_stale_tiles: false,
            request_timeout_secs: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// `ALERT_TILE_URL` is required; everything else falls back to defaults.
    pub fn from_env() -> AlertResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> AlertResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let tile_url = lookup("ALERT_TILE_URL")
            .ok_or_else(|| AlertError::config("ALERT_TILE_URL", "not set"))?;
        let mut config = Self::new(tile_url);

        if let Some(val) = lookup("ALERT_MIN_DATE") {
            config.min_date = parse_date_value(&val)?;
        }
        if let Some(val) = lookup("ALERT_MAX_DATE") {
            config.max_date = parse_date_value(&val)?;
        }
        if let Some(val) = lookup("ALERT_CONFIRMED_ONLY") {
            config.confirmed_only = parse_flag(&val);
        }
        if let Some(val) = lookup("ALERT_DISCARD_STALE_TILES") {
            config.discard_stale_tiles = parse_flag(&val);
        }
        if let Some(val) = lookup("ALERT_REQUEST_TIMEOUT_SECS") {
            let secs = val.trim().parse().map_err(|_| {
                AlertError::config("ALERT_REQUEST_TIMEOUT_SECS", format!("not a number: {}", val))
            })?;
            config.request_timeout_secs = Some(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> AlertResult<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| AlertError::ConfigRead(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> AlertResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> AlertResult<()> {
        if !(self.tile_url.starts_with("http://") || self.tile_url.starts_with("https://")) {
            return Err(AlertError::config(
                "tile_url",
                format!("expected an http(s) URL, got '{}'", self.tile_url),
            ));
        }
        for placeholder in URL_PLACEHOLDERS {
            if !self.tile_url.contains(placeholder) {
                return Err(AlertError::config(
                    "tile_url",
                    format!("missing {} placeholder", placeholder),
                ));
            }
        }
        if self.min_date > self.max_date {
            return Err(AlertError::InvertedDateRange {
                min: self.min_date,
                max: self.max_date,
            });
        }
        if self.request_timeout_secs == Some(0) {
            return Err(AlertError::config(
                "request_timeout_secs",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Initial filter state for a layer built from this config.
    pub fn filter_state(&self) -> FilterState {
        let mut state = FilterState::new(self.min_date, self.max_date);
        state.confirmed_only = self.confirmed_only;
        state
    }
}

fn parse_flag(val: &str) -> bool {
    val.eq_ignore_ascii_case("true") || val == "1"
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DateSetting {
    Value(u32),
    Text(String),
}

fn date_setting<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    match DateSetting::deserialize(deserializer)? {
        DateSetting::Value(v) => Ok(v),
        DateSetting::Text(s) => parse_date_value(&s).map_err(serde::de::Error::custom),
    }
}
