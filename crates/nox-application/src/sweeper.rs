//! Periodic eviction of abandoned application sessions.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use nox_core::platform::Messenger;
use nox_core::timespec::TimeSpec;
use nox_core::SessionRegistry;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

const TIMEOUT_NOTICE: &str =
    "⌛ Your application timed out due to inactivity. You can start a new one at any time.";

/// Evicts sessions idle for at least `max_idle` and tells each applicant.
///
/// Returns the number of sessions evicted.
pub async fn sweep_once(
    registry: &SessionRegistry,
    messenger: &dyn Messenger,
    max_idle: TimeSpec,
) -> usize {
    // A TimeSpec never exceeds one week, so the cast is lossless.
    let max_idle = chrono::Duration::seconds(max_idle.seconds() as i64);
    let expired = registry.evict_idle(Utc::now(), max_idle).await;

    for applicant in &expired {
        if let Err(e) = messenger.send_direct(&applicant.id, TIMEOUT_NOTICE).await {
            tracing::debug!(
                "[IdleSweeper] Could not tell {} about the timeout: {}",
                applicant.id,
                e
            );
        }
    }
    expired.len()
}

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stops the sweeper and waits for the task to finish.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!("[IdleSweeper] Task ended abnormally: {}", e);
        }
    }
}

/// Spawns a task that calls [`sweep_once`] every `every`.
pub fn spawn(
    registry: Arc<SessionRegistry>,
    messenger: Arc<dyn Messenger>,
    max_idle: TimeSpec,
    every: Duration,
) -> SweeperHandle {
    let token = CancellationToken::new();
    let task_token = token.clone();

    let task = tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            "[IdleSweeper] Started (timeout {}, every {}s)",
            max_idle,
            every.as_secs()
        );

        loop {
            tokio::select! {
                _ = task_token.cancelled() => break,
                _ = ticker.tick() => {
                    let evicted = sweep_once(&registry, messenger.as_ref(), max_idle).await;
                    if evicted > 0 {
                        tracing::info!("[IdleSweeper] Evicted {} idle session(s)", evicted);
                    }
                }
            }
        }
        tracing::info!("[IdleSweeper] Stopped");
    });

    SweeperHandle { token, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nox_core::identity::{Applicant, MemberId, ServerId};
    use nox_infrastructure::InMemoryPlatform;

    #[tokio::test]
    async fn test_sweep_once_evicts_and_notifies() {
        let platform = Arc::new(InMemoryPlatform::new("Nox"));
        platform.add_member("1", "Alice");
        platform.add_member("2", "Bob");
        let registry = SessionRegistry::default();

        let long_ago = Utc::now() - chrono::Duration::hours(3);
        registry
            .begin(Applicant::new("1", "Alice"), ServerId::new("g"), long_ago)
            .await
            .unwrap();
        registry
            .begin(Applicant::new("2", "Bob"), ServerId::new("g"), Utc::now())
            .await
            .unwrap();

        let evicted = sweep_once(&registry, platform.as_ref(), "2h".parse().unwrap()).await;
        assert_eq!(evicted, 1);
        assert!(!registry.contains(&MemberId::new("1")).await);
        assert!(registry.contains(&MemberId::new("2")).await);
        assert_eq!(platform.inbox(&MemberId::new("1")), vec![TIMEOUT_NOTICE.to_string()]);
        assert!(platform.inbox(&MemberId::new("2")).is_empty());
    }

    #[tokio::test]
    async fn test_spawned_sweeper_stops() {
        let platform = Arc::new(InMemoryPlatform::new("Nox"));
        platform.add_member("1", "Alice");
        let registry = Arc::new(SessionRegistry::default());
        registry
            .begin(
                Applicant::new("1", "Alice"),
                ServerId::new("g"),
                Utc::now() - chrono::Duration::minutes(10),
            )
            .await
            .unwrap();

        let handle = spawn(
            registry.clone(),
            platform.clone(),
            "5m".parse().unwrap(),
            Duration::from_millis(10),
        );
        // The first tick fires immediately.
        for _ in 0..50 {
            if registry.is_empty().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(registry.is_empty().await);
        handle.stop().await;
    }
}
