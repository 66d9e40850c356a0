use crate::config::{ContainerOptions, ProvisionSettings};
use crate::error::DeployError;
use crate::services::storage::{StorageError, StorageGateway};
use crate::utils::advisory::advisory;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Two-tier fixed backoff: a short delay before the first attempt and a
/// longer one before every attempt after that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub retry_delay: Duration,
}

impl Default for ProvisionPolicy {
    fn default() -> Self {
        Self::from(&ProvisionSettings::default())
    }
}

impl From<&ProvisionSettings> for ProvisionPolicy {
    fn from(settings: &ProvisionSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            initial_delay: Duration::from_millis(settings.initial_delay_in_ms),
            retry_delay: Duration::from_millis(settings.retry_delay_in_ms),
        }
    }
}

impl ProvisionPolicy {
    /// Delay before the given 1-based attempt.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            self.initial_delay
        } else {
            self.retry_delay
        }
    }
}

/// Loop state, local to one `ensure_container` call.
#[derive(Debug)]
struct ProvisionState {
    attempt_count: u32,
    max_attempts: u32,
    wait: Duration,
    completed: bool,
}

impl ProvisionState {
    fn new(policy: &ProvisionPolicy) -> Self {
        Self {
            attempt_count: 0,
            max_attempts: policy.max_attempts,
            wait: policy.delay_before(1),
            completed: false,
        }
    }

    fn should_continue(&self) -> bool {
        !self.completed && self.attempt_count < self.max_attempts
    }
}

pub struct RetryingProvisioner {
    gateway: Arc<dyn StorageGateway>,
    policy: ProvisionPolicy,
    simulate: bool,
}

impl RetryingProvisioner {
    pub fn new(gateway: Arc<dyn StorageGateway>, policy: ProvisionPolicy) -> Self {
        Self {
            gateway,
            policy,
            simulate: false,
        }
    }

    /// In simulation mode no call reaches the gateway.
    pub fn simulated(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }

    /// Best-effort delete; a failure here never stops the batch.
    pub async fn delete_container(&self, name: &str, timeout: Duration) {
        if self.simulate {
            info!("🧪 Simulation: skipping delete of container [{}]", name);
            return;
        }

        info!("🗑️  Deleting container [{}] ...", name);
        let operation = format!("deleting container [{}]", name);
        if advisory(&operation, self.gateway.delete_container(name, timeout))
            .await
            .is_some()
        {
            info!("✅ Container [{}] deleted", name);
        }
    }

    /// Creates the container if absent, retrying only while it is being deleted.
    pub async fn ensure_container(
        &self,
        name: &str,
        options: &ContainerOptions,
    ) -> Result<(), DeployError> {
        if self.simulate {
            info!("🧪 Simulation: container [{}] assumed ready", name);
            return Ok(());
        }

        info!("🪣 Create blob container [{}] ...", name);
        let timeout = options.timeout();
        let mut state = ProvisionState::new(&self.policy);

        while state.should_continue() {
            state.attempt_count += 1;
            tokio::time::sleep(state.wait).await;
            state.wait = self.policy.delay_before(state.attempt_count + 1);

            debug!(
                "Create attempt {}/{} for container [{}]",
                state.attempt_count, state.max_attempts, name
            );

            let attempt = tokio::time::timeout(
                timeout,
                self.gateway.create_container_if_absent(name, options),
            )
            .await
            .unwrap_or(Err(StorageError::Timeout(timeout)));

            match attempt {
                Ok(()) => state.completed = true,
                Err(e) if e.is_being_deleted() => {
                    warn!(
                        "⏳ Container [{}] is being deleted, retrying (attempt {}/{})",
                        name, state.attempt_count, state.max_attempts
                    );
                }
                Err(source) => {
                    error!("❌ createContainer for [{}] aborted: {}", name, source);
                    return Err(DeployError::ProvisioningFatal {
                        container: name.to_string(),
                        source,
                    });
                }
            }
        }

        if state.completed {
            info!(
                "✅ Container [{}] ready after {} attempt(s)",
                name, state.attempt_count
            );
            Ok(())
        } else {
            error!("❌ createContainer for [{}] not completed", name);
            Err(DeployError::ProvisioningExhausted {
                container: name.to_string(),
                attempts: state.attempt_count,
            })
        }
    }
}
