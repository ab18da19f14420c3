//! Viewer configuration.

use std::path::Path;
use std::time::Duration;

use pipecast_core::SessionConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration for the viewer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Stream decoder limits.
    pub decoder: DecoderConfig,
    /// Periodic summary output.
    pub report: ReportConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Capture peer address (host:port).
    pub address: String,
    /// Connection timeout in milliseconds.
    pub timeout_ms: u64,
}

/// Decoder limits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Largest frame body accepted, in bytes. 0 disables the check.
    pub max_body_bytes: u64,
}

/// Summary output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Seconds between pipe summaries; 0 disables them.
    pub interval_secs: u64,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Install a log subscriber at all.
    pub enabled: bool,
    /// Filter directive, e.g. "info" or "pipecast_core=debug".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8000".into(),
            timeout_ms: 5000,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { interval_secs: 1 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ViewerConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Session parameters for `pipecast-core`.
    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            address: self.network.address.clone(),
            connect_timeout: Duration::from_millis(self.network.timeout_ms),
            max_body: match self.decoder.max_body_bytes {
                0 => None,
                n => Some(usize::try_from(n).unwrap_or(usize::MAX)),
            },
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = ViewerConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("address"));
        assert!(text.contains("max_body_bytes"));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = ViewerConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ViewerConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.network.address, "127.0.0.1:8000");
        assert_eq!(parsed.network.timeout_ms, 5000);
        assert!(parsed.logging.enabled);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let parsed: ViewerConfig = toml::from_str(
            r#"
            [network]
            address = "10.0.0.7:9000"

            [decoder]
            max_body_bytes = 4194304
            "#,
        )
        .unwrap();
        assert_eq!(parsed.network.timeout_ms, 5000);
        assert_eq!(parsed.logging.level, "info");

        let session = parsed.session();
        assert_eq!(session.address, "10.0.0.7:9000");
        assert_eq!(session.max_body, Some(4_194_304));
        assert_eq!(session.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn zero_cap_means_unlimited() {
        assert_eq!(ViewerConfig::default().session().max_body, None);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let cfg = ViewerConfig::load(Path::new("/nonexistent/pipecast-viewer.toml"));
        assert_eq!(cfg.report.interval_secs, 1);
    }
}
