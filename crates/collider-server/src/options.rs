use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use collider_alloc::NodeIdAllocator;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Resource layout of a synthesis server.
///
/// Every field has a default matching the server's own defaults, so a
/// configuration file only needs to list what differs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerOptions {
    /// Address of the server's control port.
    pub address: SocketAddr,

    /// Total audio buses, hardware channels included.
    pub num_audio_bus_channels: u32,

    /// Hardware input channels, placed after the outputs.
    pub num_input_bus_channels: u32,

    /// Hardware output channels, starting at bus 0.
    pub num_output_bus_channels: u32,

    pub num_control_bus_channels: u32,

    /// Number of sample buffer slots.
    pub num_buffers: u32,

    /// Prefix for node ids, so several clients can share one server.
    pub client_id: u32,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([127, 0, 0, 1], 57110)),
            num_audio_bus_channels: 128,
            num_input_bus_channels: 8,
            num_output_bus_channels: 8,
            num_control_bus_channels: 4096,
            num_buffers: 1024,
            client_id: 0,
        }
    }
}

impl ServerOptions {
    /// Reads and validates options from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            operation: "read".to_string(),
            source: e,
        })?;
        log::debug!("Loading server options from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Parses and validates options from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let options: ServerOptions = toml::from_str(content)?;
        options.validate()?;
        Ok(options)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Writes the options as TOML.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml_string()?;
        fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            operation: "write".to_string(),
            source: e,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let hardware = self.num_input_bus_channels as u64 + self.num_output_bus_channels as u64;
        if hardware > self.num_audio_bus_channels as u64 {
            return Err(ConfigError::InvalidOptions(format!(
                "{} hardware channels do not fit into {} audio buses",
                hardware, self.num_audio_bus_channels
            )));
        }
        if self.client_id > NodeIdAllocator::user_max() {
            return Err(ConfigError::InvalidOptions(format!(
                "client_id {} exceeds the maximum of {}",
                self.client_id,
                NodeIdAllocator::user_max()
            )));
        }
        Ok(())
    }

    /// First audio bus not taken by hardware inputs or outputs.
    pub fn first_private_bus(&self) -> u32 {
        self.num_output_bus_channels + self.num_input_bus_channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let options = ServerOptions::from_toml_str("").unwrap();
        assert_eq!(options, ServerOptions::default());
        assert_eq!(options.first_private_bus(), 16);
    }

    #[test]
    fn partial_file_overrides_fields() {
        let options = ServerOptions::from_toml_str(
            "address = \"10.0.0.2:57120\"\nnum_buffers = 64\nclient_id = 3\n",
        )
        .unwrap();
        assert_eq!(options.address, "10.0.0.2:57120".parse().unwrap());
        assert_eq!(options.num_buffers, 64);
        assert_eq!(options.client_id, 3);
        assert_eq!(options.num_control_bus_channels, 4096);
    }

    #[test]
    fn rejects_too_many_hardware_channels() {
        let err = ServerOptions::from_toml_str(
            "num_audio_bus_channels = 8\nnum_input_bus_channels = 4\nnum_output_bus_channels = 8\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOptions(_)));
    }

    #[test]
    fn rejects_client_id_out_of_range() {
        let err = ServerOptions::from_toml_str("client_id = 32").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOptions(_)));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = ServerOptions::from_toml_str("num_buffers = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn toml_text_round_trips() {
        let options = ServerOptions { num_buffers: 12, client_id: 5, ..Default::default() };
        let text = options.to_toml_string().unwrap();
        assert_eq!(ServerOptions::from_toml_str(&text).unwrap(), options);
    }
}
