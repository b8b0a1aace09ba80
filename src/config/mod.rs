//! Configuration management

use crate::domain::shared::{MediaError, Result};
use crate::infrastructure::media::rtp::JitterBufferConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment prefix, e.g. `RTC__MEDIA__MAX_PAYLOAD_SIZE=1200`
pub const ENV_PREFIX: &str = "RTC";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub media: MediaConfig,
    pub jitter: JitterBufferConfig,
    pub transport: TransportConfig,
}

/// Send pipeline sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Largest RTP payload a payloader may produce
    pub max_payload_size: usize,
    /// Payload buffer allocated when a transceiver is created
    pub initial_payload_capacity: usize,
    /// Chunk length table entries allocated when a transceiver is created
    pub initial_chunk_capacity: usize,
    /// Spare bytes reserved per packet for the SRTP auth tag
    pub auth_tag_margin: usize,
}

/// SRTP_AES128_CM_HMAC_SHA1_80 tag length
pub const MIN_AUTH_TAG_MARGIN: usize = 10;

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_payload_size: 1300,
            initial_payload_capacity: 1500,
            initial_chunk_capacity: 8,
            auth_tag_margin: MIN_AUTH_TAG_MARGIN,
        }
    }
}

impl MediaConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_payload_size == 0 {
            return Err(MediaError::Config(
                "max_payload_size must be greater than zero".to_string(),
            ));
        }
        if self.auth_tag_margin < MIN_AUTH_TAG_MARGIN {
            return Err(MediaError::Config(format!(
                "auth_tag_margin must be at least {} bytes",
                MIN_AUTH_TAG_MARGIN
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub bind_address: String,
    pub remote_address: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:0".to_string(),
            remote_address: "127.0.0.1:5004".to_string(),
        }
    }
}

impl Config {
    /// Defaults, then the optional TOML file, then `RTC__` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = ::config::Config::try_from(&Config::default()).map_err(config_error)?;
        let mut builder = ::config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(
                ::config::File::from(path).format(::config::FileFormat::Toml),
            );
        }

        let config: Config = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(config_error)?;

        config.media.validate()?;
        Ok(config)
    }
}

fn config_error(err: ::config::ConfigError) -> MediaError {
    MediaError::Config(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.media.max_payload_size, 1300);
        assert_eq!(config.media.initial_payload_capacity, 1500);
        assert_eq!(config.media.auth_tag_margin, 10);
        assert!(config.media.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero_mtu = MediaConfig {
            max_payload_size: 0,
            ..MediaConfig::default()
        };
        assert!(matches!(zero_mtu.validate(), Err(MediaError::Config(_))));

        let small_margin = MediaConfig {
            auth_tag_margin: 4,
            ..MediaConfig::default()
        };
        assert!(small_margin.validate().is_err());
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[media]\nmax_payload_size = 1200\n\n[jitter]\nmax_delay_ms = 500\n\n[transport]\nremote_address = \"10.0.0.2:6000\""
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.media.max_payload_size, 1200);
        assert_eq!(config.media.initial_chunk_capacity, 8);
        assert_eq!(config.jitter.max_delay_ms, 500);
        assert_eq!(config.transport.remote_address, "10.0.0.2:6000");
    }

    #[test]
    fn test_load_rejects_invalid_file_values() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[media]\nmax_payload_size = 0").unwrap();

        assert!(matches!(
            Config::load(Some(file.path())),
            Err(MediaError::Config(_))
        ));
    }
}
