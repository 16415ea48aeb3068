//! Bus configuration, per spec §6's enumerated configuration surface.

use std::time::Duration;

use zebus_core::ids::Endpoint;
use zebus_core::message::DEFAULT_DISPATCH_QUEUE;

/// Configuration consumed when starting a [`crate::bus::Bus`].
#[derive(Debug, Clone)]
pub struct BusConfiguration {
    /// Ordered list of directory endpoints to try at registration time.
    pub directory_service_endpoints: Vec<Endpoint>,
    /// Whether to shuffle `directory_service_endpoints` before trying
    /// them, rather than trying them in configured order.
    pub is_directory_picked_randomly: bool,
    /// Whether this peer's registration should survive directory
    /// restarts.
    pub is_persistent: bool,
    /// Timeout applied to each individual directory request before
    /// falling through to the next configured endpoint.
    pub registration_timeout: Duration,
    /// Name of the dispatch queue a handler lands on when it doesn't
    /// name one explicitly.
    pub default_dispatch_queue_name: String,
}

impl BusConfiguration {
    /// Build a configuration pointed at a single directory endpoint,
    /// non-persistent, with a 10s registration timeout — a reasonable
    /// default for local development.
    #[must_use]
    pub fn single(directory_endpoint: impl Into<Endpoint>) -> Self {
        Self {
            directory_service_endpoints: vec![directory_endpoint.into()],
            is_directory_picked_randomly: false,
            is_persistent: false,
            registration_timeout: Duration::from_secs(10),
            default_dispatch_queue_name: DEFAULT_DISPATCH_QUEUE.to_string(),
        }
    }

    /// Override the default dispatch queue name.
    #[must_use]
    pub fn with_default_dispatch_queue_name(mut self, name: impl Into<String>) -> Self {
        self.default_dispatch_queue_name = name.into();
        self
    }
}
