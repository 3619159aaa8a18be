//! # Configuration Management Module
//!
//! Centralized configuration for the meshgate system: type-safe TOML sections
//! with serde, sensible defaults, and simple load/create helpers.
//!
//! ## Configuration Structure
//!
//! - [`GatewayConfig`] - Gateway identity and operator contact
//! - [`ChatConfig`] - Chat-platform channel and role identifiers
//! - [`MeshConfig`] - Mesh radio link settings
//! - [`StorageConfig`] - Data persistence settings and table size ceilings
//! - [`LoggingConfig`] - Logging settings
//!
//! ## Configuration File Format
//!
//! ```toml
//! [gateway]
//! name = "Mesh Gateway"
//!
//! [chat]
//! mesh_channel_id = "123456"
//! node_channel_id = "123457"
//! admin_role_id = "900100"
//! node_owner_role_id = "900101"
//!
//! [mesh]
//! port = "/dev/ttyUSB0"
//! baud_rate = 115200
//! channel = 0
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub chat: ChatConfig,
    pub mesh: MeshConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub name: String,
    pub contact_info: String,
}

/// Identifiers on the chat-platform side. These are opaque strings handed to
/// the [`crate::chat::ChatTransport`] implementation; the gateway never
/// interprets them beyond equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Channel receiving relayed mesh text messages and claim announcements.
    pub mesh_channel_id: String,
    /// Channel receiving "new node detected" announcements.
    pub node_channel_id: String,
    /// Optional channel for operational notices (startup, reboot recovery).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_log_channel_id: Option<String>,
    /// Role required for admin-gated commands. The capability check itself is
    /// performed by the chat adapter; this id is used for role grant/revoke.
    pub admin_role_id: String,
    /// Role granted to principals that own at least one node.
    pub node_owner_role_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Default mesh channel index for broadcasts and alerts (0-7).
    pub channel: u8,
    /// Require the radio to be available at startup. If false (default), the
    /// gateway starts without a device and mesh-dependent operations degrade
    /// to reported no-ops.
    #[serde(default)]
    pub require_device_at_startup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Serialized size ceiling for the message log table; oldest entries are
    /// evicted first once exceeded.
    #[serde(default = "default_max_message_log_bytes")]
    pub max_message_log_bytes: usize,
    /// Serialized size ceiling for the preferences table; oldest entries are
    /// evicted first once exceeded.
    #[serde(default = "default_max_preferences_bytes")]
    pub max_preferences_bytes: usize,
}

fn default_max_message_log_bytes() -> usize {
    500_000_000
}

fn default_max_preferences_bytes() -> usize {
    10_000_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            gateway: GatewayConfig {
                name: "Mesh Gateway".to_string(),
                contact_info: String::new(),
            },
            chat: ChatConfig {
                mesh_channel_id: String::new(),
                node_channel_id: String::new(),
                admin_log_channel_id: None,
                admin_role_id: String::new(),
                node_owner_role_id: String::new(),
            },
            mesh: MeshConfig {
                port: "/dev/ttyUSB0".to_string(),
                baud_rate: 115200,
                channel: 0,
                require_device_at_startup: false,
            },
            storage: StorageConfig {
                data_dir: "./data".to_string(),
                max_message_log_bytes: default_max_message_log_bytes(),
                max_preferences_bytes: default_max_preferences_bytes(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("meshgate.log".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.mesh.channel, 0);
        assert_eq!(parsed.storage.max_message_log_bytes, 500_000_000);
        assert!(parsed.chat.admin_log_channel_id.is_none());
    }

    #[test]
    fn size_ceilings_default_when_absent() {
        let toml_src = r#"
            [gateway]
            name = "gw"
            contact_info = ""

            [chat]
            mesh_channel_id = "1"
            node_channel_id = "2"
            admin_role_id = "3"
            node_owner_role_id = "4"

            [mesh]
            port = ""
            baud_rate = 115200
            channel = 0

            [storage]
            data_dir = "./data"

            [logging]
            level = "info"
        "#;
        let parsed: Config = toml::from_str(toml_src).unwrap();
        assert_eq!(parsed.storage.max_message_log_bytes, 500_000_000);
        assert_eq!(parsed.storage.max_preferences_bytes, 10_000_000);
    }
}
