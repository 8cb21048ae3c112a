//! Access request records and decision types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Connection authentication request
///
/// Brokers send either `username`/`password` or the short `user`/`pass`
/// keys. Both spellings may be present at once; the long form wins unless it
/// is empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub pass: Option<String>,
}

impl UserRequest {
    pub fn username(&self) -> Option<&str> {
        field(&self.username).or_else(|| field(&self.user))
    }

    pub fn password(&self) -> Option<&str> {
        field(&self.password).or_else(|| field(&self.pass))
    }
}

/// Virtual host access request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VhostRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub vhost: Option<String>,
    /// Client address, informational only
    #[serde(default)]
    pub ip: Option<String>,
}

/// Resource access request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub vhost: Option<String>,
    /// Resource kind (`exchange`, `queue`, `topic`)
    #[serde(default)]
    pub resource: Option<String>,
    /// Resource name, informational only
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub permission: Option<String>,
}

/// Topic (routing key) access request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopicRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub vhost: Option<String>,
    #[serde(default)]
    pub resource: Option<String>,
    /// Exchange name, informational only
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub permission: Option<String>,
    #[serde(default)]
    pub routing_key: Option<String>,
}

/// A request field, with empty strings treated as absent
pub(crate) fn field(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Broker resource kinds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Exchange,
    Queue,
    Topic,
}

impl FromStr for ResourceKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exchange" => Ok(Self::Exchange),
            "queue" => Ok(Self::Queue),
            "topic" => Ok(Self::Topic),
            _ => Err(()),
        }
    }
}

/// Broker permissions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Configure,
    Write,
    Read,
}

impl FromStr for Permission {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "configure" => Ok(Self::Configure),
            "write" => Ok(Self::Write),
            "read" => Ok(Self::Read),
            _ => Err(()),
        }
    }
}

/// Verdict returned to the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Grants the requested action only
    Allow,
    /// Grants the action plus the broker's management capability
    AllowAdministrator,
    Deny,
}

impl Verdict {
    /// Token sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::AllowAdministrator => "allow administrator management",
            Self::Deny => "deny",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub verdict: Verdict,
    /// Reason for the decision, for logging
    pub reason: &'static str,
}

impl Decision {
    pub fn allow(reason: &'static str) -> Self {
        Self {
            verdict: Verdict::Allow,
            reason,
        }
    }

    pub fn allow_administrator(reason: &'static str) -> Self {
        Self {
            verdict: Verdict::AllowAdministrator,
            reason,
        }
    }

    pub fn deny(reason: &'static str) -> Self {
        Self {
            verdict: Verdict::Deny,
            reason,
        }
    }

    pub fn missing_fields() -> Self {
        Self::deny("Missing required fields")
    }

    pub fn default_deny() -> Self {
        Self::deny("No matching rule, default deny")
    }
}
