//! Abstract administrative client and status classification.

use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;

use crate::errors::AdminError;
use crate::topology::{ClusterConfig, ClusterStatus};

/// Minimal command reply: just the success flag.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CommandReply {
    pub ok: f64,
}

impl CommandReply {
    pub const fn ok() -> Self {
        Self { ok: 1.0 }
    }

    pub fn is_ok(&self) -> bool {
        (self.ok - 1.0).abs() < f64::EPSILON
    }
}

/// Async administrative command contract.
pub trait AdminClient: Send + Sync + 'static {
    /// Send `ping` to `host`.
    fn ping(
        &self,
        host: &str,
    ) -> Pin<Box<dyn Future<Output = Result<CommandReply, AdminError>> + Send + '_>>;

    /// Query replica set status from the seed host.
    fn status(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<ClusterStatus, AdminError>> + Send + '_>>;

    /// Submit `config` as the initial replica set configuration via the seed host.
    fn initiate(
        &self,
        config: &ClusterConfig,
    ) -> Pin<Box<dyn Future<Output = Result<(), AdminError>> + Send + '_>>;
}

/// Outcome of one status query, folded into the cases callers act on.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusProbe {
    /// The query succeeded with `ok: 1`.
    Healthy(ClusterStatus),
    /// The query succeeded but `ok` was not 1.
    Unhealthy(ClusterStatus),
    /// The node is not part of a replica set yet.
    NotInitialized,
    /// Anything else; expected to clear up on a later try.
    Transient(AdminError),
}

impl StatusProbe {
    pub fn classify(result: Result<ClusterStatus, AdminError>) -> Self {
        match result {
            Ok(status) if status.is_ok() => StatusProbe::Healthy(status),
            Ok(status) => StatusProbe::Unhealthy(status),
            Err(AdminError::NotYetInitialized { .. }) => StatusProbe::NotInitialized,
            Err(err) => StatusProbe::Transient(err),
        }
    }
}

/// Query status and classify the result.
pub async fn probe_status(admin: &dyn AdminClient) -> StatusProbe {
    StatusProbe::classify(admin.status().await)
}
