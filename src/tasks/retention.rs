/// Periodic removal of finished tasks
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::store::TaskStore;
use crate::config::RetentionConfig;
use crate::observability::Metrics;

/// How long finished tasks are kept and how often they are swept
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    pub max_age: Duration,
    pub interval: Duration,
}

impl From<&RetentionConfig> for RetentionPolicy {
    fn from(config: &RetentionConfig) -> Self {
        Self {
            max_age: Duration::from_secs(config.task_ttl_hours.saturating_mul(3600)),
            interval: Duration::from_secs(config.sweep_interval_secs),
        }
    }
}

/// Run `sweep` on every tick until `shutdown` fires
pub fn spawn_sweeper(
    store: TaskStore,
    policy: RetentionPolicy,
    metrics: Arc<Metrics>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    info!(
        max_age_secs = policy.max_age.as_secs(),
        interval_secs = policy.interval.as_secs(),
        "Starting retention sweeper"
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(policy.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Retention sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = store.sweep(policy.max_age).await;
                    if removed > 0 {
                        metrics.tasks_swept(removed);
                    }
                }
            }
        }
    })
}
