//! Waits for every member host to answer `ping`, in declaration order.

use tracing::{error, info};

use super::availability::HostAvailabilityChecker;
use crate::errors::BootstrapError;
use crate::retry::{retry, Attempt, AttemptBudget};
use crate::topology::MemberSpec;

pub struct MemberWaiter {
    checker: HostAvailabilityChecker,
}

impl MemberWaiter {
    pub fn new(checker: HostAvailabilityChecker) -> Self {
        Self { checker }
    }

    /// Wait for each member in turn.  The first member that exhausts the
    /// budget fails the whole wait; later members are not probed.
    pub async fn wait_for_all(
        &self,
        members: &[MemberSpec],
        budget: AttemptBudget,
    ) -> Result<(), BootstrapError> {
        for member in members {
            let host = member.host.as_str();
            let checker = &self.checker;
            info!("Waiting for {host}...");

            let waited = retry(budget, |attempt| async move {
                if checker.is_available(host).await {
                    info!("{host} is available (attempt {attempt}/{})", budget.max_attempts);
                    Attempt::Done(())
                } else {
                    info!(
                        "Attempt {attempt}/{}: {host} not available yet",
                        budget.max_attempts
                    );
                    Attempt::Retry
                }
            })
            .await;

            if let Err(exhausted) = waited {
                error!("{host} did not become available after {} attempts", exhausted.attempts);
                return Err(BootstrapError::HostTimeout {
                    host: host.to_string(),
                    attempts: exhausted.attempts,
                });
            }
        }
        info!("All {} members are available", members.len());
        Ok(())
    }
}
