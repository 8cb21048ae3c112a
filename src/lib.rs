//! Broker Authorization Backend
//!
//! Stateless authentication and authorization decisions for a message broker
//! fronting a fleet of low-trust devices:
//!
//! - **Credentials**: device passwords derived from the device identifier and
//!   one shared secret, never stored
//! - **Principals**: a single administrator and the `<prefix>-<N>` device fleet
//! - **Access Control**: `user`, `vhost`, `resource` and `topic` decisions,
//!   fail-closed to `deny`
//! - **Topic Namespace**: each device publishes only under its own
//!   `<root>/<device>` subtree, matched segment by segment
//!
//! # Architecture
//!
//! The broker's HTTP auth backend calls one endpoint per decision point and
//! enforces the returned verdict token (`allow`, `allow administrator
//! management`, `deny`). The engine keeps no request history; configuration is
//! loaded once at startup.
//!
//! # Example Configuration
//!
//! ```json
//! {
//!   "admin": { "username": "admin", "password": "change-me" },
//!   "devices": {
//!     "prefix": "Bus",
//!     "fleet-size": 50,
//!     "resources": ["exchange", "topic"]
//!   },
//!   "vhost": { "name": "/" },
//!   "topics": { "root": "/some/path", "routing-key-style": "dot" }
//! }
//! ```

pub mod acl;
pub mod auth;
pub mod config;
pub mod routing;
pub mod server;

// Re-export main types
pub use acl::{DecisionEngine, Verdict};
pub use config::BrokerAuthConfig;
