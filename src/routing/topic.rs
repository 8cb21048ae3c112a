//! Device topic namespace
//!
//! Every device owns the private subtree `<root>/<device>`. The template is
//! kept in hierarchical MQTT form and rendered into the broker's routing-key
//! separator on demand, so both representations come from one source.

use crate::config::{RoutingKeyStyle, TopicConfig};

/// Device topic namespace
#[derive(Debug, Clone)]
pub struct TopicNamespace {
    /// Root in hierarchical form, without trailing separator unless it is `/`
    root: String,
    /// Routing-key convention of the broker
    style: RoutingKeyStyle,
}

impl TopicNamespace {
    /// Create from topic configuration
    pub fn new(config: &TopicConfig) -> Self {
        let trimmed = config.root.trim_end_matches('/');
        let root = if trimmed.is_empty() && config.root.starts_with('/') {
            "/"
        } else {
            trimmed
        };

        Self {
            root: root.to_string(),
            style: config.routing_key_style,
        }
    }

    /// Segment separator of rendered routing keys
    pub fn separator(&self) -> char {
        self.style.separator()
    }

    /// Hierarchical MQTT topic owned by a device, e.g. `/some/path/Bus-3`
    pub fn device_topic(&self, device: &str) -> String {
        if self.root.is_empty() {
            device.to_string()
        } else if self.root == "/" {
            format!("/{}", device)
        } else {
            format!("{}/{}", self.root, device)
        }
    }

    /// Device topic rendered as the broker presents it, e.g. `.some.path.Bus-3`
    pub fn device_routing_key(&self, device: &str) -> String {
        let topic = self.device_topic(device);
        match self.style {
            RoutingKeyStyle::Path => topic,
            RoutingKeyStyle::Dot => topic.replace('/', "."),
        }
    }

    /// Whether a routing key is the device's own path or lies beneath it.
    ///
    /// Compares whole segments: `.some.path.Bus-31` is not under `Bus-3`.
    pub fn is_within_device_path(&self, device: &str, routing_key: &str) -> bool {
        let own = self.device_routing_key(device);
        is_segment_prefix(&own, routing_key, self.separator())
    }
}

/// Whether `path` equals `prefix` or continues it at a segment boundary
pub fn is_segment_prefix(prefix: &str, path: &str, separator: char) -> bool {
    let mut path_segments = path.split(separator);

    for expected in prefix.split(separator) {
        match path_segments.next() {
            Some(segment) if segment == expected => {}
            _ => return false,
        }
    }

    true
}
