//! Configuration types for the broker authorization backend
//!
//! Provides JSON-serializable configuration for the administrator credential,
//! the device fleet, the single virtual host, the topic namespace, and the
//! HTTP listener. Loaded once at startup and immutable afterwards.

use crate::acl::ResourceKind;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Secret used for device password derivation when none is configured.
pub const DEFAULT_SECRET: &str = "choreo-mqtt-demo-secret";

/// Broker authorization backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct BrokerAuthConfig {
    /// Administrator principal
    pub admin: AdminConfig,

    /// Device fleet and credential derivation
    pub devices: DeviceConfig,

    /// Virtual host access
    pub vhost: VhostConfig,

    /// Topic namespace for device publishing
    pub topics: TopicConfig,

    /// HTTP listener settings
    pub server: ServerConfig,
}

impl BrokerAuthConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Check invariants that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.admin.username.is_empty() {
            bail!("admin username must not be empty");
        }
        if self.devices.prefix.is_empty() {
            bail!("device prefix must not be empty");
        }
        if self.devices.fleet_size == 0 {
            bail!("device fleet size must be at least 1");
        }
        if self.vhost.name.is_empty() {
            bail!("vhost name must not be empty");
        }
        if let Some(kind) = self
            .devices
            .resources
            .iter()
            .find(|kind| !matches!(kind, ResourceKind::Exchange | ResourceKind::Topic))
        {
            bail!(
                "device resources may only contain exchange and topic, got '{:?}'",
                kind
            );
        }
        if self.devices.prefix.contains(['/', '.']) {
            bail!(
                "device prefix '{}' must not contain a topic separator",
                self.devices.prefix
            );
        }
        if self.topics.routing_key_style == RoutingKeyStyle::Dot && self.topics.root.contains('.') {
            bail!(
                "topic root '{}' must not contain '.' with dot-style routing keys",
                self.topics.root
            );
        }

        // The administrator and device classes must stay disjoint.
        let admin = &self.admin.username;
        if let Some(ordinal) = admin
            .strip_prefix(self.devices.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('-'))
        {
            if ordinal.parse::<u32>().is_ok() {
                bail!(
                    "admin username '{}' collides with the device identity pattern '{}-<N>'",
                    admin,
                    self.devices.prefix
                );
            }
        }

        Ok(())
    }
}

// ============================================================================
// Administrator
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AdminConfig {
    /// Administrator username
    pub username: String,

    /// Administrator password (compared verbatim)
    pub password: String,
}

impl AdminConfig {
    /// Whether the built-in demo password is still in use
    pub fn uses_default_password(&self) -> bool {
        self.password == default_admin_password()
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: default_admin_username(),
            password: default_admin_password(),
        }
    }
}

// ============================================================================
// Device fleet
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DeviceConfig {
    /// Identifier prefix, devices are named `<prefix>-<N>`
    pub prefix: String,

    /// Highest valid device ordinal (ordinals start at 1)
    pub fleet_size: u32,

    /// Shared secret for password derivation.
    ///
    /// Falls back to [`DEFAULT_SECRET`] with a warning when unset.
    pub secret: Option<String>,

    /// Resource kinds devices may read from and write to.
    ///
    /// Only `exchange` and `topic` are accepted.
    pub resources: Vec<ResourceKind>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            prefix: default_device_prefix(),
            fleet_size: default_fleet_size(),
            secret: None,
            resources: default_device_resources(),
        }
    }
}

// ============================================================================
// Virtual host
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct VhostConfig {
    /// The single virtual host principals may access
    pub name: String,
}

impl Default for VhostConfig {
    fn default() -> Self {
        Self { name: "/".to_string() }
    }
}

// ============================================================================
// Topic namespace
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TopicConfig {
    /// Hierarchical root under which each device owns `<root>/<device>`
    pub root: String,

    /// How the broker presents routing keys in topic checks
    pub routing_key_style: RoutingKeyStyle,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            root: default_topic_root(),
            routing_key_style: RoutingKeyStyle::default(),
        }
    }
}

/// Separator convention of routing keys received from the broker
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoutingKeyStyle {
    /// AMQP routing keys, MQTT `/` rewritten to `.` by the broker
    #[default]
    Dot,
    /// MQTT topic names passed through unchanged
    Path,
}

impl RoutingKeyStyle {
    /// Segment separator used on the wire
    pub fn separator(self) -> char {
        match self {
            Self::Dot => '.',
            Self::Path => '/',
        }
    }
}

// ============================================================================
// HTTP listener
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ServerConfig {
    /// Address the HTTP backend listens on
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_password() -> String {
    "admin123".to_string()
}

fn default_device_prefix() -> String {
    "Bus".to_string()
}

fn default_fleet_size() -> u32 {
    50
}

fn default_device_resources() -> Vec<ResourceKind> {
    vec![ResourceKind::Exchange, ResourceKind::Topic]
}

fn default_topic_root() -> String {
    "/some/path".to_string()
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3001))
}
