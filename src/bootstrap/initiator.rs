//! One-time `replSetInitiate`, guarded by a status check.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::admin::{probe_status, AdminClient, StatusProbe};
use crate::errors::BootstrapError;
use crate::topology::{ClusterConfig, ClusterStatus};

/// What `initiate_if_needed` did.
#[derive(Debug, Clone, PartialEq)]
pub enum InitiateOutcome {
    /// The set already reported `ok: 1`; nothing was sent.
    AlreadyInitialized(ClusterStatus),
    /// `replSetInitiate` was accepted.
    Initiated,
}

pub struct ClusterInitiator {
    admin: Arc<dyn AdminClient>,
}

impl ClusterInitiator {
    pub fn new(admin: Arc<dyn AdminClient>) -> Self {
        Self { admin }
    }

    /// Initiate the replica set unless it already reports a healthy status.
    ///
    /// Anything short of a healthy status counts as "needs initialization",
    /// including a failed status query.  A failed initiation is fatal and
    /// is not retried.
    pub async fn initiate_if_needed(
        &self,
        config: &ClusterConfig,
    ) -> Result<InitiateOutcome, BootstrapError> {
        match probe_status(self.admin.as_ref()).await {
            StatusProbe::Healthy(status) => {
                info!("Replica set {} is already initialized", config.id);
                return Ok(InitiateOutcome::AlreadyInitialized(status));
            }
            StatusProbe::NotInitialized => {
                info!("Replica set {} is not initialized yet", config.id);
            }
            StatusProbe::Unhealthy(status) => {
                info!("Replica set status reported ok: {}; initializing", status.ok);
            }
            StatusProbe::Transient(err) => {
                debug!(error = %err, "status check failed; assuming not initialized");
            }
        }

        info!(
            "Initializing replica set {} with members {}",
            config.id,
            config
                .members
                .iter()
                .map(|m| format!("{}(priority {})", m.host, m.priority))
                .collect::<Vec<_>>()
                .join(", ")
        );

        match self.admin.initiate(config).await {
            Ok(()) => {
                info!("Replica set {} initiation accepted", config.id);
                Ok(InitiateOutcome::Initiated)
            }
            Err(err) => {
                error!("Replica set initiation failed: {err}");
                Err(BootstrapError::InitiateFailed {
                    message: err.to_string(),
                })
            }
        }
    }
}
