//! Server configuration
//!
//! Loads settings from a TOML file or uses defaults. Example:
//!
//! ```toml
//! listen = "0.0.0.0:9100"
//!
//! [engine]
//! poll_interval_secs = 5
//! fuel_alert_threshold = 15.0
//!
//! [source]
//! type = "http"
//! base_url = "http://fleet-backend:8080"
//! ```

use anyhow::{Context, Result};
use fleet_core::{ConfigError, EngineConfig, TelemetrySource};
use fleet_sources::{http, DemoSource, HttpSource, PushHandle, PushSource};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the REST API binds to
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub source: SourceConfig,
}

/// Where the scheduler gets its samples from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Poll a producer's REST API
    Http {
        base_url: String,
        #[serde(default = "default_bulk_path")]
        bulk_path: String,
        #[serde(default = "default_vehicle_path")]
        vehicle_path: String,
    },
    /// Synthetic delivery fleet
    Demo {
        #[serde(default = "default_demo_vehicles")]
        vehicles: usize,
    },
    /// Samples POSTed to `/api/telemetry/ingest`
    Push {
        #[serde(default = "default_push_capacity")]
        capacity: usize,
    },
}

fn default_listen() -> String {
    "0.0.0.0:9100".to_string()
}

fn default_bulk_path() -> String {
    http::DEFAULT_BULK_PATH.to_string()
}

fn default_vehicle_path() -> String {
    http::DEFAULT_VEHICLE_PATH.to_string()
}

fn default_demo_vehicles() -> usize {
    8
}

fn default_push_capacity() -> usize {
    10_000
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Demo {
            vehicles: default_demo_vehicles(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            engine: EngineConfig::default(),
            source: SourceConfig::default(),
        }
    }
}

/// A ready-to-poll source plus, for push sources, the producer-side handle
pub struct SourceSetup {
    pub source: Arc<dyn TelemetrySource>,
    pub push: Option<PushHandle>,
}

impl ServerConfig {
    /// Load from `path`, falling back to defaults when the file doesn't exist
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            info!("No config file given, using defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        self.listen_addr()?;
        self.source.validate()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen
            .parse()
            .with_context(|| format!("Invalid listen address {:?}", self.listen))
    }
}

impl SourceConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceConfig::Http { .. } => "http",
            SourceConfig::Demo { .. } => "demo",
            SourceConfig::Push { .. } => "push",
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            SourceConfig::Http { base_url, .. } if base_url.trim().is_empty() => {
                Err(ConfigError::Source("http source needs a base_url".to_string()))
            }
            SourceConfig::Demo { vehicles: 0 } => Err(ConfigError::Source(
                "demo source needs at least one vehicle".to_string(),
            )),
            SourceConfig::Push { capacity: 0 } => Err(ConfigError::Source(
                "push buffer capacity must be at least 1".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Construct the configured source
    pub fn build(&self, engine: &EngineConfig) -> Result<SourceSetup, ConfigError> {
        self.validate()?;

        let setup = match self {
            SourceConfig::Http {
                base_url,
                bulk_path,
                vehicle_path,
            } => SourceSetup {
                source: Arc::new(HttpSource::with_paths(
                    base_url,
                    bulk_path,
                    vehicle_path,
                    engine.fetch_timeout(),
                )?),
                push: None,
            },
            SourceConfig::Demo { vehicles } => SourceSetup {
                source: Arc::new(DemoSource::new(*vehicles)),
                push: None,
            },
            SourceConfig::Push { capacity } => {
                let source = PushSource::new(*capacity);
                let handle = source.handle();
                SourceSetup {
                    source: Arc::new(source),
                    push: Some(handle),
                }
            }
        };

        Ok(setup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        let config = ServerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.listen, "0.0.0.0:9100");
        assert_eq!(config.source, SourceConfig::Demo { vehicles: 8 });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_http_source_with_default_paths() {
        let config = ServerConfig::from_toml_str(
            r#"
            [engine]
            pollIntervalSeconds = 5

            [source]
            type = "http"
            base_url = "http://backend:8080"
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.poll_interval_secs, 5);
        assert_eq!(config.engine.activity_window_secs, 60);
        assert_eq!(
            config.source,
            SourceConfig::Http {
                base_url: "http://backend:8080".to_string(),
                bulk_path: "/api/telemetry".to_string(),
                vehicle_path: "/api/vehicle-telemetry".to_string(),
            }
        );
    }

    #[test]
    fn test_push_source() {
        let config = ServerConfig::from_toml_str(
            r#"
            [source]
            type = "push"
            "#,
        )
        .unwrap();
        assert_eq!(config.source, SourceConfig::Push { capacity: 10_000 });

        let setup = config.source.build(&config.engine).unwrap();
        assert_eq!(setup.source.name(), "push");
        assert!(setup.push.is_some());
    }

    #[test]
    fn test_unknown_source_type_rejected() {
        let result = ServerConfig::from_toml_str(
            r#"
            [source]
            type = "kafka"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let config = ServerConfig::from_toml_str(
            r#"
            [engine]
            fuel_alert_threshold = -1.0
            "#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::InvalidThreshold {
                name: "fuel_alert_threshold",
                value: -1.0
            })
        );
    }

    #[test]
    fn test_bad_listen_address_rejected() {
        let config = ServerConfig {
            listen: "localhost".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("localhost"), "got: {}", err);
        assert!(config.listen_addr().is_err());
    }

    #[test]
    fn test_source_validation() {
        assert!(SourceConfig::Demo { vehicles: 0 }.validate().is_err());
        assert!(SourceConfig::Push { capacity: 0 }.validate().is_err());
        assert!(SourceConfig::Http {
            base_url: " ".to_string(),
            bulk_path: default_bulk_path(),
            vehicle_path: default_vehicle_path(),
        }
        .validate()
        .is_err());

        let bad_url = SourceConfig::Http {
            base_url: "nope".to_string(),
            bulk_path: default_bulk_path(),
            vehicle_path: default_vehicle_path(),
        };
        assert!(bad_url.build(&EngineConfig::default()).is_err());
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = ServerConfig::load(Some(Path::new("/nonexistent/fleet.toml"))).unwrap();
        assert_eq!(config, ServerConfig::default());
    }
}
