//! Runtime settings.
//!
//! Settings are read once at startup from an optional TOML file, then from
//! `VANTAGE_*` environment variables (nested keys use `__`), and passed by
//! reference to whatever needs them.
//!
//! ```toml
//! important_problems_business_impact = 3
//! disable_inner_problems_computation = false
//! log_level = "debug"
//!
//! [worldmap]
//! zoom = 5
//! hosts_level = [3, 4, 5]
//! ```

use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::synthesis::SynthesisMode;

/// Settings for the data manager and its widgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Minimum business impact for an item to be listed as a problem.
    pub problems_business_impact: i32,
    /// Minimum business impact for the "important" hosts and services.
    pub important_problems_business_impact: i32,
    /// Trust the framework's problem/impact flags instead of recomputing them.
    pub disable_inner_problems_computation: bool,
    /// Default tracing filter when `RUST_LOG` is not set.
    pub log_level: String,
    pub worldmap: WorldmapSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            problems_business_impact: 0,
            important_problems_business_impact: 0,
            disable_inner_problems_computation: false,
            log_level: "info".to_string(),
            worldmap: WorldmapSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from an optional file, overridden by the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("VANTAGE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// How synthesis derives problem and impact flags.
    pub fn synthesis_mode(&self) -> SynthesisMode {
        if self.disable_inner_problems_computation {
            SynthesisMode::TrustFramework
        } else {
            SynthesisMode::Recompute
        }
    }
}

/// Map widget settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldmapSettings {
    pub zoom: u8,
    /// Default map centre latitude.
    pub lat: f64,
    /// Default map centre longitude.
    pub lng: f64,
    /// Business impacts of the hosts shown on the map.
    pub hosts_level: Vec<i32>,
    /// Business impacts of the services listed in host popups.
    pub services_level: Vec<i32>,
}

impl Default for WorldmapSettings {
    fn default() -> Self {
        Self {
            zoom: 7,
            lat: 48.858674,
            lng: 2.293858,
            hosts_level: (0..=5).collect(),
            services_level: (0..=5).collect(),
        }
    }
}
