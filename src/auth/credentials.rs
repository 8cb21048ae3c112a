//! Derived device credentials
//!
//! Device passwords are never stored. Each one is recomputed from the device
//! identifier and the process-wide shared secret.

use crate::config::{DeviceConfig, DEFAULT_SECRET};
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::warn;

/// Length of a derived device password
pub const PASSWORD_LEN: usize = 16;

/// A device identifier that passed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceId<'a> {
    /// Full identifier, e.g. `Bus-7`
    pub name: &'a str,
    /// Ordinal within the fleet, in `1..=fleet_size`
    pub ordinal: u32,
}

/// Device credential provisioning entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCredential {
    pub device: String,
    pub password: String,
}

/// Derives and verifies device passwords
pub struct DeviceCredentials {
    /// Identifier prefix, devices are `<prefix>-<N>`
    prefix: String,
    /// Anchored identifier pattern
    pattern: Regex,
    /// Highest valid ordinal
    fleet_size: u32,
    /// Shared secret
    secret: String,
}

impl DeviceCredentials {
    /// Create from device configuration
    pub fn new(config: &DeviceConfig) -> Result<Self> {
        let secret = match &config.secret {
            Some(secret) if !secret.is_empty() => secret.clone(),
            _ => {
                warn!("No device secret configured, falling back to the well-known default secret");
                DEFAULT_SECRET.to_string()
            }
        };

        let pattern = Regex::new(&format!(
            "^{}-([1-9][0-9]*)$",
            regex::escape(&config.prefix)
        ))
        .with_context(|| format!("Invalid device prefix: {}", config.prefix))?;

        Ok(Self {
            prefix: config.prefix.clone(),
            pattern,
            fleet_size: config.fleet_size,
            secret,
        })
    }

    /// Derive the password a device identifier must present.
    ///
    /// `base64(sha256("<identifier>:<secret>"))`, truncated to [`PASSWORD_LEN`].
    /// No validation happens here.
    pub fn derive(&self, identifier: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(identifier.as_bytes());
        hasher.update(b":");
        hasher.update(self.secret.as_bytes());

        let mut encoded = BASE64.encode(hasher.finalize());
        encoded.truncate(PASSWORD_LEN);
        encoded
    }

    /// Parse a device identifier, rejecting malformed or out-of-fleet names
    pub fn parse_device<'a>(&self, identifier: &'a str) -> Option<DeviceId<'a>> {
        let captures = self.pattern.captures(identifier)?;
        let ordinal: u32 = captures.get(1)?.as_str().parse().ok()?;

        if ordinal == 0 || ordinal > self.fleet_size {
            return None;
        }

        Some(DeviceId {
            name: identifier,
            ordinal,
        })
    }

    /// Whether the identifier names a device of this fleet
    pub fn is_valid_device(&self, identifier: &str) -> bool {
        self.parse_device(identifier).is_some()
    }

    /// Check a presented device password
    pub fn verify(&self, identifier: &str, presented: &str) -> bool {
        if identifier.is_empty() || presented.is_empty() {
            return false;
        }

        if !self.is_valid_device(identifier) {
            return false;
        }

        self.derive(identifier) == presented
    }

    /// Provisioning table for every device in the fleet
    pub fn fleet(&self) -> impl Iterator<Item = DeviceCredential> + '_ {
        (1..=self.fleet_size).map(move |ordinal| {
            let device = format!("{}-{}", self.prefix, ordinal);
            let password = self.derive(&device);
            DeviceCredential { device, password }
        })
    }

    /// Highest valid ordinal
    pub fn fleet_size(&self) -> u32 {
        self.fleet_size
    }

    /// Whether the built-in secret is in use
    pub fn uses_default_secret(&self) -> bool {
        self.secret == DEFAULT_SECRET
    }
}
