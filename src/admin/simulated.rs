//! In-process simulated replica set.
//!
//! Behaves like three freshly started `mongod`s: hosts can refuse a
//! number of pings before coming up, status reports NotYetInitialized
//! until `initiate` is accepted, and after initiation a number of status
//! queries can fail before the set settles with the highest-priority
//! member as primary.  Every command is recorded so tests can assert on
//! ordering and call counts.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde_json::{Map, Value};
use tokio::sync::Mutex;

use super::client::{AdminClient, CommandReply};
use crate::errors::{AdminError, ALREADY_INITIALIZED_CODE};
use crate::topology::{
    ClusterConfig, ClusterStatus, MemberStatus, STATE_PRIMARY, STATE_SECONDARY,
};

/// One recorded administrative command.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminCall {
    Ping(String),
    Status,
    Initiate(ClusterConfig),
}

struct SimState {
    /// Remaining refused pings per host.
    refusals: HashMap<String, u32>,
    initiated: Option<ClusterConfig>,
    /// Status queries that fail after initiation before the set settles.
    pending_failures: u32,
    /// Status queries that return `ok: 0` after the failures are used up.
    pending_degraded: u32,
    initiate_failure: Option<String>,
    elects_primary: bool,
    calls: Vec<AdminCall>,
}

/// Simulated three-member replica set.
pub struct SimulatedCluster {
    state: Mutex<SimState>,
}

impl Default for SimulatedCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedCluster {
    /// All hosts reachable, not initialized, elects a primary immediately.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState {
                refusals: HashMap::new(),
                initiated: None,
                pending_failures: 0,
                pending_degraded: 0,
                initiate_failure: None,
                elects_primary: true,
                calls: Vec::new(),
            }),
        }
    }

    /// A slow environment bring-up for `--backend simulated` runs.
    pub fn rehearsal(config: &ClusterConfig) -> Self {
        let mut cluster = Self::new().with_status_failures(2);
        for (i, member) in config.members.iter().enumerate() {
            cluster = cluster.with_unreachable(&member.host, i as u32);
        }
        cluster
    }

    /// `host` refuses its first `refusals` pings.  `u32::MAX` never answers.
    pub fn with_unreachable(mut self, host: &str, refusals: u32) -> Self {
        self.state
            .get_mut()
            .refusals
            .insert(host.to_string(), refusals);
        self
    }

    /// Start out as an already-initiated set.
    pub fn already_initialized(mut self, config: ClusterConfig) -> Self {
        self.state.get_mut().initiated = Some(config);
        self
    }

    /// Fail the first `count` status queries after initiation.
    pub fn with_status_failures(mut self, count: u32) -> Self {
        self.state.get_mut().pending_failures = count;
        self
    }

    /// Report `ok: 0` for `count` status queries after the failures.
    pub fn with_degraded_status(mut self, count: u32) -> Self {
        self.state.get_mut().pending_degraded = count;
        self
    }

    /// Reject `initiate` with `message`.
    pub fn with_initiate_failure(mut self, message: &str) -> Self {
        self.state.get_mut().initiate_failure = Some(message.to_string());
        self
    }

    /// Report `ok: 1` without any member reaching PRIMARY.
    pub fn without_election(mut self) -> Self {
        self.state.get_mut().elects_primary = false;
        self
    }

    /// Every command received so far, in order.
    pub async fn calls(&self) -> Vec<AdminCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn ping_count(&self, host: &str) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| matches!(c, AdminCall::Ping(h) if h == host))
            .count()
    }

    pub async fn status_count(&self) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| matches!(c, AdminCall::Status))
            .count()
    }

    /// Configurations passed to `initiate`, in order.
    pub async fn initiate_calls(&self) -> Vec<ClusterConfig> {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter_map(|c| match c {
                AdminCall::Initiate(config) => Some(config.clone()),
                _ => None,
            })
            .collect()
    }
}

fn settled_status(config: &ClusterConfig, elects_primary: bool) -> ClusterStatus {
    let primary = config.primary_designate().map(str::to_string);
    let members = config
        .members
        .iter()
        .map(|m| {
            let state = if !elects_primary {
                "STARTUP2"
            } else if primary.as_deref() == Some(m.host.as_str()) {
                STATE_PRIMARY
            } else {
                STATE_SECONDARY
            };
            MemberStatus {
                name: m.host.clone(),
                state_str: state.to_string(),
                health: Some(1.0),
                extra: Map::from_iter([("_id".to_string(), Value::from(m.id))]),
            }
        })
        .collect();
    ClusterStatus {
        set: Some(config.id.clone()),
        ok: 1.0,
        members,
        extra: Map::new(),
    }
}

impl AdminClient for SimulatedCluster {
    fn ping(
        &self,
        host: &str,
    ) -> Pin<Box<dyn Future<Output = Result<CommandReply, AdminError>> + Send + '_>> {
        let host = host.to_string();
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.calls.push(AdminCall::Ping(host.clone()));
            match state.refusals.get_mut(&host) {
                Some(remaining) if *remaining > 0 => {
                    if *remaining != u32::MAX {
                        *remaining -= 1;
                    }
                    Err(AdminError::Unreachable {
                        message: format!("connection refused: {host}"),
                    })
                }
                _ => Ok(CommandReply::ok()),
            }
        })
    }

    fn status(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<ClusterStatus, AdminError>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.calls.push(AdminCall::Status);
            let Some(config) = state.initiated.clone() else {
                return Err(AdminError::NotYetInitialized {
                    message: "no replset config has been received".to_string(),
                });
            };
            if state.pending_failures > 0 {
                state.pending_failures -= 1;
                return Err(AdminError::Unreachable {
                    message: "connection reset during election".to_string(),
                });
            }
            if state.pending_degraded > 0 {
                state.pending_degraded -= 1;
                let mut status = settled_status(&config, false);
                status.ok = 0.0;
                return Ok(status);
            }
            Ok(settled_status(&config, state.elects_primary))
        })
    }

    fn initiate(
        &self,
        config: &ClusterConfig,
    ) -> Pin<Box<dyn Future<Output = Result<(), AdminError>> + Send + '_>> {
        let config = config.clone();
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.calls.push(AdminCall::Initiate(config.clone()));
            if state.initiated.is_some() {
                return Err(AdminError::from_code(
                    ALREADY_INITIALIZED_CODE,
                    "AlreadyInitialized",
                    "already initialized",
                ));
            }
            if let Some(message) = &state.initiate_failure {
                return Err(AdminError::Command {
                    code: 93,
                    code_name: "InvalidReplicaSetConfig".to_string(),
                    message: message.clone(),
                });
            }
            state.initiated = Some(config);
            Ok(())
        })
    }
}
