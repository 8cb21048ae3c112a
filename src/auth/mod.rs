//! Principal authentication
//!
//! Classifies usernames into the administrator, a fleet device, or an unknown
//! principal, and checks the credentials each class must present.

mod credentials;

pub use credentials::{DeviceCredential, DeviceCredentials, DeviceId, PASSWORD_LEN};

use crate::config::{AdminConfig, DeviceConfig};
use anyhow::Result;
use tracing::warn;

/// Class of a presented username
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal<'a> {
    /// The configured administrator
    Administrator,
    /// A device of the fleet
    Device(DeviceId<'a>),
    /// Anything else
    Unknown,
}

/// Principal classifier and credential checker
pub struct Authenticator {
    admin: AdminConfig,
    devices: DeviceCredentials,
}

impl Authenticator {
    /// Create a new authenticator from configuration
    pub fn new(admin: &AdminConfig, devices: &DeviceConfig) -> Result<Self> {
        if admin.uses_default_password() {
            warn!(
                username = %admin.username,
                "Administrator is using the default password"
            );
        }

        Ok(Self {
            admin: admin.clone(),
            devices: DeviceCredentials::new(devices)?,
        })
    }

    /// Classify a username
    pub fn classify<'a>(&self, username: &'a str) -> Principal<'a> {
        if username == self.admin.username {
            return Principal::Administrator;
        }

        match self.devices.parse_device(username) {
            Some(device) => Principal::Device(device),
            None => Principal::Unknown,
        }
    }

    /// Check the administrator password
    pub fn verify_admin(&self, password: &str) -> bool {
        !password.is_empty() && password == self.admin.password
    }

    /// Device credential derivation and verification
    pub fn devices(&self) -> &DeviceCredentials {
        &self.devices
    }
}
