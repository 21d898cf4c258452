//! Configuration for the qmux platform layer.
//!
//! TOML-backed, with serde defaults for every field so a partial file (or
//! none at all) yields a runnable configuration. Validation collects every
//! problem instead of stopping at the first.

use anyhow::{Context, Result};
use qmux_quic::TransportSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Stream-transport knobs handed to the stream manager.
    pub transport: TransportConfig,

    /// AF_XDP fast-path sender knobs.
    pub xsk: XskConfig,
}

impl Config {
    /// Load configuration from a TOML file. A missing file yields the
    /// defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(config_path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing TOML config {}", path.display()))
    }

    /// Validate the whole configuration, collecting every error.
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if let Err(e) = self.transport.to_transport_settings().validate() {
            errors.extend(e);
        }
        if let Err(e) = self.xsk.validate() {
            errors.extend(e);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Stream-transport configuration surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Advertised initial_max_streams_bidi.
    pub initial_max_streams_bidi: u64,

    /// Advertised initial_max_streams_uni.
    pub initial_max_streams_uni: u64,

    /// Consecutive write-queue grants per stream before round-robin.
    pub priority_queue_writes_per_stream: u64,

    /// Denominator of the closed-stream window that triggers MAX_STREAMS.
    pub stream_limit_windowing_fraction: u64,

    /// Dispatch unidirectional read callbacks before bidirectional ones.
    pub unidirectional_streams_read_callbacks_first: bool,

    /// Advertised initial bidirectional stream group count (0..=128).
    pub initial_bidirectional_stream_groups: u64,

    /// Advertised initial unidirectional stream group count (0..=128).
    pub initial_unidirectional_stream_groups: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        let defaults = TransportSettings::default();
        Self {
            initial_max_streams_bidi: defaults.advertised_initial_max_streams_bidi,
            initial_max_streams_uni: defaults.advertised_initial_max_streams_uni,
            priority_queue_writes_per_stream: defaults.priority_queue_writes_per_stream,
            stream_limit_windowing_fraction: defaults.stream_limit_windowing_fraction,
            unidirectional_streams_read_callbacks_first: defaults
                .unidirectional_streams_read_callbacks_first,
            initial_bidirectional_stream_groups: defaults
                .advertised_initial_bidirectional_stream_group_count,
            initial_unidirectional_stream_groups: defaults
                .advertised_initial_unidirectional_stream_group_count,
        }
    }
}

impl TransportConfig {
    /// Convert into the settings record the stream manager consumes.
    pub fn to_transport_settings(&self) -> TransportSettings {
        TransportSettings {
            advertised_initial_max_streams_bidi: self.initial_max_streams_bidi,
            advertised_initial_max_streams_uni: self.initial_max_streams_uni,
            peer_initial_max_streams_bidi: None,
            peer_initial_max_streams_uni: None,
            priority_queue_writes_per_stream: self.priority_queue_writes_per_stream,
            stream_limit_windowing_fraction: self.stream_limit_windowing_fraction,
            unidirectional_streams_read_callbacks_first: self
                .unidirectional_streams_read_callbacks_first,
            advertised_initial_bidirectional_stream_group_count: self
                .initial_bidirectional_stream_groups,
            advertised_initial_unidirectional_stream_group_count: self
                .initial_unidirectional_stream_groups,
        }
    }
}

/// AF_XDP sender configuration surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XskConfig {
    /// Network interface to bind the XDP socket to.
    pub interface: String,

    /// Interface queue index.
    pub queue_id: u32,

    /// UMEM frame count (power of two).
    pub num_frames: u32,

    /// UMEM frame size in bytes (power of two).
    pub frame_size: u32,

    /// Descriptors submitted before an automatic flush.
    pub batch_size: u32,

    /// Local MAC address, colon-separated hex.
    pub local_mac: String,

    /// Gateway MAC address, colon-separated hex.
    pub gateway_mac: String,
}

impl Default for XskConfig {
    fn default() -> Self {
        Self {
            interface: "eth0".to_string(),
            queue_id: 0,
            num_frames: 4096,
            frame_size: 4096,
            batch_size: 64,
            local_mac: "00:00:00:00:00:00".to_string(),
            gateway_mac: "00:00:00:00:00:00".to_string(),
        }
    }
}

impl XskConfig {
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.interface.is_empty() {
            errors.push("xsk.interface must not be empty".to_string());
        }
        if !self.num_frames.is_power_of_two() {
            errors.push(format!("xsk.num_frames {} is not a power of two", self.num_frames));
        }
        if !self.frame_size.is_power_of_two() {
            errors.push(format!("xsk.frame_size {} is not a power of two", self.frame_size));
        }
        if self.batch_size == 0 {
            errors.push("xsk.batch_size must be greater than zero".to_string());
        }
        if let Err(e) = parse_mac(&self.local_mac) {
            errors.push(format!("xsk.local_mac: {e}"));
        }
        if let Err(e) = parse_mac(&self.gateway_mac) {
            errors.push(format!("xsk.gateway_mac: {e}"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn local_mac_bytes(&self) -> Result<[u8; 6]> {
        parse_mac(&self.local_mac).map_err(|e| anyhow::anyhow!("local_mac: {e}"))
    }

    pub fn gateway_mac_bytes(&self) -> Result<[u8; 6]> {
        parse_mac(&self.gateway_mac).map_err(|e| anyhow::anyhow!("gateway_mac: {e}"))
    }
}

fn parse_mac(raw: &str) -> std::result::Result<[u8; 6], String> {
    let mut bytes = [0u8; 6];
    let mut parts = raw.split(':');
    for byte in &mut bytes {
        let part = parts
            .next()
            .ok_or_else(|| format!("'{raw}' has fewer than six octets"))?;
        *byte = u8::from_str_radix(part, 16)
            .map_err(|_| format!("'{raw}' contains invalid octet '{part}'"))?;
    }
    if parts.next().is_some() {
        return Err(format!("'{raw}' has more than six octets"));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [transport]
            initial_max_streams_bidi = 256

            [xsk]
            interface = "ens3"
            "#,
        )
        .unwrap();
        assert_eq!(config.transport.initial_max_streams_bidi, 256);
        assert_eq!(config.transport.initial_max_streams_uni, 100);
        assert_eq!(config.xsk.interface, "ens3");
        assert_eq!(config.xsk.num_frames, 4096);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let config: Config = toml::from_str(
            r#"
            [transport]
            stream_limit_windowing_fraction = 0

            [xsk]
            num_frames = 1000
            local_mac = "not-a-mac"
            "#,
        )
        .unwrap();
        let errors = config.validate().unwrap_err();
        assert!(errors.len() >= 3);
        assert!(errors.iter().any(|e| e.contains("windowing_fraction")));
        assert!(errors.iter().any(|e| e.contains("num_frames")));
        assert!(errors.iter().any(|e| e.contains("local_mac")));
    }

    #[test]
    fn test_mac_parsing() {
        assert_eq!(
            parse_mac("02:1a:ff:00:10:0b").unwrap(),
            [0x02, 0x1a, 0xff, 0x00, 0x10, 0x0b]
        );
        assert!(parse_mac("02:1a:ff:00:10").is_err());
        assert!(parse_mac("02:1a:ff:00:10:0b:ee").is_err());
        assert!(parse_mac("zz:1a:ff:00:10:0b").is_err());
    }

    #[test]
    fn test_transport_settings_conversion() {
        let mut config = TransportConfig::default();
        config.initial_max_streams_bidi = 42;
        config.unidirectional_streams_read_callbacks_first = true;
        let settings = config.to_transport_settings();
        assert_eq!(settings.advertised_initial_max_streams_bidi, 42);
        assert!(settings.unidirectional_streams_read_callbacks_first);
        assert!(settings.peer_initial_max_streams_bidi.is_none());
    }
}
