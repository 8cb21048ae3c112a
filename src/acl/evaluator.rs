//! Decision engine
//!
//! Evaluates the four broker decision points. Every operation is a pure
//! function of its request and the immutable configuration; anything that does
//! not reach an explicit allow resolves to deny.

use crate::auth::{Authenticator, DeviceCredentials, DeviceId, Principal};
use crate::config::BrokerAuthConfig;
use crate::routing::TopicNamespace;
use anyhow::Result;
use tracing::debug;

use super::rules::{
    field, Decision, Permission, ResourceKind, ResourceRequest, TopicRequest, UserRequest,
    VhostRequest,
};

/// Broker authorization decision engine
pub struct DecisionEngine {
    /// Administrator and device credentials
    authenticator: Authenticator,
    /// The single allowed virtual host
    vhost: String,
    /// Resource kinds devices may read and write
    device_resources: Vec<ResourceKind>,
    /// Device topic namespace
    topics: TopicNamespace,
}

impl DecisionEngine {
    /// Create a new decision engine from configuration
    pub fn new(config: &BrokerAuthConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            authenticator: Authenticator::new(&config.admin, &config.devices)?,
            vhost: config.vhost.name.clone(),
            device_resources: config.devices.resources.clone(),
            topics: TopicNamespace::new(&config.topics),
        })
    }

    /// Decide whether a principal may connect
    pub fn user(&self, request: &UserRequest) -> Decision {
        let (Some(username), Some(password)) = (request.username(), request.password()) else {
            return Decision::missing_fields();
        };

        let decision = match self.authenticator.classify(username) {
            Principal::Administrator if self.authenticator.verify_admin(password) => {
                Decision::allow_administrator("Administrator authenticated")
            }
            Principal::Device(device) if self.devices().verify(device.name, password) => {
                Decision::allow("Device authenticated")
            }
            _ => Decision::deny("Authentication failed"),
        };

        debug!(
            username = %username,
            verdict = %decision.verdict,
            reason = decision.reason,
            "user decision"
        );
        decision
    }

    /// Decide whether a principal may open the requested virtual host
    pub fn vhost(&self, request: &VhostRequest) -> Decision {
        let (Some(username), Some(vhost)) = (field(&request.username), field(&request.vhost))
        else {
            return Decision::missing_fields();
        };

        let decision = if self.is_allowed_vhost(vhost) {
            Decision::allow("Vhost access granted")
        } else {
            Decision::deny("Unknown vhost")
        };

        debug!(
            username = %username,
            vhost = %vhost,
            ip = ?request.ip,
            verdict = %decision.verdict,
            "vhost decision"
        );
        decision
    }

    /// Decide whether a principal may use a broker resource
    pub fn resource(&self, request: &ResourceRequest) -> Decision {
        let (Some(username), Some(_vhost), Some(resource), Some(permission)) = (
            field(&request.username),
            field(&request.vhost),
            field(&request.resource),
            field(&request.permission),
        ) else {
            return Decision::missing_fields();
        };

        let decision = self.dispatch(username, |_device| {
            let kind = resource.parse::<ResourceKind>().ok();
            let permission = permission.parse::<Permission>().ok();

            match (kind, permission) {
                (Some(kind), Some(Permission::Read | Permission::Write))
                    if self.device_resources.contains(&kind) =>
                {
                    Decision::allow("Device message resource access")
                }
                _ => Decision::deny("Devices may only read or write message resources"),
            }
        });

        debug!(
            username = %username,
            resource = %resource,
            name = ?request.name,
            permission = %permission,
            verdict = %decision.verdict,
            "resource decision"
        );
        decision
    }

    /// Decide whether a principal may publish or subscribe on a routing key
    pub fn topic(&self, request: &TopicRequest) -> Decision {
        let (Some(username), Some(_vhost), Some(_resource), Some(permission), Some(routing_key)) = (
            field(&request.username),
            field(&request.vhost),
            field(&request.resource),
            field(&request.permission),
            field(&request.routing_key),
        ) else {
            return Decision::missing_fields();
        };

        let decision = self.dispatch(username, |device| match permission.parse::<Permission>() {
            Ok(Permission::Write) if self.topics.is_within_device_path(device.name, routing_key) => {
                Decision::allow("Device publishing within its own namespace")
            }
            Ok(Permission::Write) => Decision::deny("Device publishing outside its namespace"),
            // Reads are unscoped for every device.
            Ok(Permission::Read) => Decision::allow("Device subscription"),
            _ => Decision::default_deny(),
        });

        debug!(
            username = %username,
            routing_key = %routing_key,
            permission = %permission,
            verdict = %decision.verdict,
            reason = decision.reason,
            "topic decision"
        );
        decision
    }

    /// Device credential derivation, exposed for provisioning
    pub fn devices(&self) -> &DeviceCredentials {
        self.authenticator.devices()
    }

    /// Device topic namespace
    pub fn topics(&self) -> &TopicNamespace {
        &self.topics
    }

    /// Administrator guard shared by the resource and topic checks.
    /// Devices go through `device_rule`, unknown principals are denied.
    fn dispatch<F>(&self, username: &str, device_rule: F) -> Decision
    where
        F: FnOnce(DeviceId<'_>) -> Decision,
    {
        match self.authenticator.classify(username) {
            Principal::Administrator => Decision::allow("Administrator bypass"),
            Principal::Device(device) => device_rule(device),
            Principal::Unknown => Decision::default_deny(),
        }
    }

    fn is_allowed_vhost(&self, requested: &str) -> bool {
        if requested == self.vhost {
            return true;
        }

        match urlencoding::decode(requested) {
            Ok(decoded) => decoded == self.vhost,
            Err(_) => false,
        }
    }
}
