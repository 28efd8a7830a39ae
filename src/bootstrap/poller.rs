//! Post-initiation status polling.
//!
//! POLLING ends in SUCCESS on the first `ok: 1` status, whether or not a
//! member is PRIMARY yet, or in TIMED_OUT when the budget runs out.  A
//! failed query is just another tick.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::admin::{probe_status, AdminClient, StatusProbe};
use crate::errors::BootstrapError;
use crate::retry::{retry, Attempt, AttemptBudget};
use crate::topology::ClusterStatus;

/// Result of a successful poll.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryInfo {
    /// Name of the member reporting PRIMARY, if any did.
    pub primary: Option<String>,
    /// The healthy status snapshot that ended polling.
    pub status: ClusterStatus,
    /// Number of status queries issued.
    pub ticks: u32,
}

pub struct InitializationPoller {
    admin: Arc<dyn AdminClient>,
}

impl InitializationPoller {
    pub fn new(admin: Arc<dyn AdminClient>) -> Self {
        Self { admin }
    }

    pub async fn poll_until_primary(
        &self,
        budget: AttemptBudget,
    ) -> Result<PrimaryInfo, BootstrapError> {
        info!("Waiting for the replica set to report a healthy status...");
        let admin = self.admin.as_ref();

        let polled = retry(budget, |tick| async move {
            match probe_status(admin).await {
                StatusProbe::Healthy(status) => Attempt::Done((status, tick)),
                StatusProbe::Unhealthy(status) => {
                    info!("Poll {tick}/{}: status ok: {}", budget.max_attempts, status.ok);
                    Attempt::Retry
                }
                StatusProbe::NotInitialized => {
                    info!("Poll {tick}/{}: not initialized yet", budget.max_attempts);
                    Attempt::Retry
                }
                StatusProbe::Transient(err) => {
                    debug!(error = %err, "status query failed");
                    info!("Poll {tick}/{}: status unavailable", budget.max_attempts);
                    Attempt::Retry
                }
            }
        })
        .await;

        let (status, ticks) = match polled {
            Ok(done) => done,
            Err(exhausted) => {
                error!(
                    "Replica set did not report a healthy status after {} polls",
                    exhausted.attempts
                );
                return Err(BootstrapError::PrimaryTimeout {
                    attempts: exhausted.attempts,
                });
            }
        };

        let primary = status.primary().map(|m| m.name.clone());
        match &primary {
            Some(name) => info!("Replica set is healthy; primary is {name}"),
            None => warn!("Replica set is healthy but no member reports PRIMARY yet"),
        }
        Ok(PrimaryInfo {
            primary,
            status,
            ticks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::simulated::SimulatedCluster;
    use crate::admin::CommandReply;
    use crate::errors::AdminError;
    use crate::topology::{ClusterConfig, MemberStatus, STATE_PRIMARY};
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    /// Replays a fixed sequence of status results, then keeps failing.
    struct ScriptedStatus {
        script: Mutex<VecDeque<Result<ClusterStatus, AdminError>>>,
        ticks: Mutex<u32>,
    }

    impl ScriptedStatus {
        fn new(script: Vec<Result<ClusterStatus, AdminError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                ticks: Mutex::new(0),
            }
        }

        fn ticks(&self) -> u32 {
            *self.ticks.lock().unwrap()
        }
    }

    impl AdminClient for ScriptedStatus {
        fn ping(
            &self,
            _host: &str,
        ) -> Pin<Box<dyn Future<Output = Result<CommandReply, AdminError>> + Send + '_>> {
            Box::pin(async { Ok(CommandReply::ok()) })
        }

        fn status(
            &self,
        ) -> Pin<Box<dyn Future<Output = Result<ClusterStatus, AdminError>> + Send + '_>> {
            *self.ticks.lock().unwrap() += 1;
            let next = self.script.lock().unwrap().pop_front().unwrap_or_else(|| {
                Err(AdminError::Unreachable {
                    message: "script exhausted".to_string(),
                })
            });
            Box::pin(async move { next })
        }

        fn initiate(
            &self,
            _config: &ClusterConfig,
        ) -> Pin<Box<dyn Future<Output = Result<(), AdminError>> + Send + '_>> {
            Box::pin(async { Ok(()) })
        }
    }

    fn raised() -> Result<ClusterStatus, AdminError> {
        Err(AdminError::Unreachable {
            message: "connection refused".to_string(),
        })
    }

    #[tokio::test]
    async fn test_five_failures_then_primary() {
        let mut script: Vec<_> = (0..5).map(|_| raised()).collect();
        script.push(Ok(ClusterStatus::healthy(vec![MemberStatus::new(
            "mongo-primary:27017",
            STATE_PRIMARY,
        )])));
        let admin = Arc::new(ScriptedStatus::new(script));

        let info = InitializationPoller::new(admin.clone())
            .poll_until_primary(AttemptBudget::new(60, 0))
            .await
            .unwrap();

        assert_eq!(info.primary.as_deref(), Some("mongo-primary:27017"));
        assert_eq!(info.ticks, 6);
        assert_eq!(admin.ticks(), 6);
    }

    #[tokio::test]
    async fn test_times_out_after_exactly_budget_ticks() {
        let not_ok = ClusterStatus {
            set: None,
            ok: 0.0,
            members: vec![],
            extra: Default::default(),
        };
        let script = vec![raised(), Ok(not_ok.clone()), raised(), Ok(not_ok)];
        let admin = Arc::new(ScriptedStatus::new(script));

        let err = InitializationPoller::new(admin.clone())
            .poll_until_primary(AttemptBudget::new(9, 0))
            .await
            .unwrap_err();

        assert!(matches!(err, BootstrapError::PrimaryTimeout { attempts: 9 }));
        assert_eq!(admin.ticks(), 9);
    }

    #[tokio::test]
    async fn test_healthy_without_primary_still_succeeds() {
        let sim = Arc::new(
            SimulatedCluster::new()
                .already_initialized(ClusterConfig::default())
                .without_election(),
        );
        let info = InitializationPoller::new(sim.clone())
            .poll_until_primary(AttemptBudget::new(3, 0))
            .await
            .unwrap();
        assert!(info.primary.is_none());
        assert!(info.status.is_ok());
        assert_eq!(info.ticks, 1);
        assert_eq!(sim.status_count().await, 1);
    }

    #[tokio::test]
    async fn test_not_initialized_counts_as_tick() {
        let sim = Arc::new(SimulatedCluster::new());
        let err = InitializationPoller::new(sim.clone())
            .poll_until_primary(AttemptBudget::new(4, 0))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(sim.status_count().await, 4);
    }

    #[tokio::test]
    async fn test_simulated_failures_then_settled() {
        let sim = Arc::new(
            SimulatedCluster::new()
                .already_initialized(ClusterConfig::default())
                .with_status_failures(5),
        );
        let info = InitializationPoller::new(sim.clone())
            .poll_until_primary(AttemptBudget::new(60, 0))
            .await
            .unwrap();
        assert_eq!(info.primary.as_deref(), Some("mongo-primary:27017"));
        assert_eq!(info.ticks, 6);
        assert_eq!(sim.status_count().await, 6);
    }
}
