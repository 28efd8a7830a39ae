//! Single-host liveness probe.

use std::sync::Arc;

use tracing::debug;

use crate::admin::AdminClient;

/// Probes one host with `ping`.
#[derive(Clone)]
pub struct HostAvailabilityChecker {
    admin: Arc<dyn AdminClient>,
}

impl HostAvailabilityChecker {
    pub fn new(admin: Arc<dyn AdminClient>) -> Self {
        Self { admin }
    }

    /// True only when `ping` succeeds and replies `ok: 1`.  Failures are
    /// an expected condition while the environment comes up and are
    /// swallowed here.
    pub async fn is_available(&self, host: &str) -> bool {
        match self.admin.ping(host).await {
            Ok(reply) if reply.is_ok() => true,
            Ok(reply) => {
                debug!(host, ok = reply.ok, "ping answered without success");
                false
            }
            Err(err) => {
                debug!(host, error = %err, "ping failed");
                false
            }
        }
    }
}
