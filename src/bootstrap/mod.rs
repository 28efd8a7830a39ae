//! Replica set bootstrap sequence.
//!
//! Strictly sequential: wait for every member, initiate if needed, then
//! poll until the set reports a healthy status.  Any failure ends the run;
//! reruns are safe because initiation is skipped on a healthy set.

pub mod availability;
pub mod initiator;
pub mod poller;
pub mod waiter;

use std::sync::Arc;

use tracing::info;

use crate::admin::AdminClient;
use crate::errors::BootstrapError;
use crate::retry::AttemptBudget;
use crate::topology::{ClusterConfig, ClusterStatus};

pub use availability::HostAvailabilityChecker;
pub use initiator::{ClusterInitiator, InitiateOutcome};
pub use poller::{InitializationPoller, PrimaryInfo};
pub use waiter::MemberWaiter;

/// Immutable inputs of one bootstrap run.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapPlan {
    pub cluster: ClusterConfig,
    pub host_wait: AttemptBudget,
    pub primary_poll: AttemptBudget,
}

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapOutcome {
    /// The set was already healthy; nothing was changed.
    AlreadyInitialized(ClusterStatus),
    /// The set was initiated and reported a healthy status.
    Initialized(PrimaryInfo),
}

/// Runs the full bootstrap sequence against one admin backend.
pub struct Bootstrapper {
    plan: BootstrapPlan,
    waiter: MemberWaiter,
    initiator: ClusterInitiator,
    poller: InitializationPoller,
}

impl Bootstrapper {
    pub fn new(admin: Arc<dyn AdminClient>, plan: BootstrapPlan) -> Self {
        Self {
            plan,
            waiter: MemberWaiter::new(HostAvailabilityChecker::new(admin.clone())),
            initiator: ClusterInitiator::new(admin.clone()),
            poller: InitializationPoller::new(admin),
        }
    }

    pub async fn run(&self) -> Result<BootstrapOutcome, BootstrapError> {
        let plan = &self.plan;
        info!(
            "Bootstrapping replica set {} ({} members)",
            plan.cluster.id,
            plan.cluster.members.len()
        );

        self.waiter
            .wait_for_all(&plan.cluster.members, plan.host_wait)
            .await?;

        match self.initiator.initiate_if_needed(&plan.cluster).await? {
            InitiateOutcome::AlreadyInitialized(status) => {
                Ok(BootstrapOutcome::AlreadyInitialized(status))
            }
            InitiateOutcome::Initiated => {
                let info = self.poller.poll_until_primary(plan.primary_poll).await?;
                Ok(BootstrapOutcome::Initialized(info))
            }
        }
    }
}

/// Process exit status for a finished run.
pub fn exit_code(result: &Result<BootstrapOutcome, BootstrapError>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(err) => err.exit_code(),
    }
}
