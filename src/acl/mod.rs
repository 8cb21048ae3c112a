//! Access control
//!
//! The four broker decision points: `user`, `vhost`, `resource` and `topic`.

mod evaluator;
mod rules;

pub use evaluator::DecisionEngine;
pub use rules::{
    Decision, Permission, ResourceKind, ResourceRequest, TopicRequest, UserRequest, Verdict,
    VhostRequest,
};
