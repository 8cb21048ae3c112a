//! Routing-key handling
//!
//! Maps the hierarchical device topic namespace onto the routing keys the
//! broker presents in topic authorization checks.

mod topic;

pub use topic::{is_segment_prefix, TopicNamespace};
