//! Delayed deletion of review surfaces.
//!
//! Each scheduled deletion is a detached tokio task keyed by surface id and
//! paired with a cancellation token, so pending deletions can be listed,
//! replaced or cancelled. Tasks are not awaited by whoever scheduled them;
//! shutting the process down drops whatever is still pending.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use nox_core::platform::Directory;
use nox_core::SurfaceId;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// A deletion that has been scheduled and not yet run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeletion {
    pub surface: SurfaceId,
    pub due_at: DateTime<Utc>,
}

struct ScheduledTask {
    token: CancellationToken,
    due_at: DateTime<Utc>,
    generation: u64,
}

pub struct DeletionScheduler {
    directory: Arc<dyn Directory>,
    tasks: Arc<Mutex<HashMap<SurfaceId, ScheduledTask>>>,
    next_generation: AtomicU64,
}

impl DeletionScheduler {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self {
            directory,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Schedules `surface` for deletion after `delay`.
    ///
    /// Scheduling a surface that already has a pending deletion replaces it.
    pub async fn schedule(&self, surface: SurfaceId, delay: Duration) -> PendingDeletion {
        let token = CancellationToken::new();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let due_at = Utc::now()
            + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());

        {
            let mut tasks = self.tasks.lock().await;
            let previous = tasks.insert(
                surface.clone(),
                ScheduledTask {
                    token: token.clone(),
                    due_at,
                    generation,
                },
            );
            if let Some(previous) = previous {
                tracing::info!(
                    "[DeletionScheduler] Replacing pending deletion of {}",
                    surface
                );
                previous.token.cancel();
            }
        }

        let tasks = Arc::clone(&self.tasks);
        let directory = Arc::clone(&self.directory);
        let task_surface = surface.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!("[DeletionScheduler] Deletion of {} cancelled", task_surface);
                }
                _ = tokio::time::sleep(delay) => {
                    {
                        let mut tasks = tasks.lock().await;
                        // Lost a race with cancel() or a replacement.
                        if tasks.get(&task_surface).map(|t| t.generation) != Some(generation) {
                            return;
                        }
                        tasks.remove(&task_surface);
                    }

                    match directory.delete_surface(&task_surface).await {
                        Ok(()) => tracing::info!("[DeletionScheduler] Deleted surface {}", task_surface),
                        Err(e) => tracing::warn!(
                            "[DeletionScheduler] Failed to delete surface {}: {}",
                            task_surface,
                            e
                        ),
                    }
                }
            }
        });

        tracing::info!(
            "[DeletionScheduler] Surface {} scheduled for deletion at {}",
            surface,
            due_at.to_rfc3339()
        );
        PendingDeletion { surface, due_at }
    }

    /// Cancels a pending deletion. Returns `false` if none was pending.
    pub async fn cancel(&self, surface: &SurfaceId) -> bool {
        match self.tasks.lock().await.remove(surface) {
            Some(task) => {
                task.token.cancel();
                tracing::info!("[DeletionScheduler] Cancelled deletion of {}", surface);
                true
            }
            None => false,
        }
    }

    /// Pending deletions, soonest first.
    pub async fn pending(&self) -> Vec<PendingDeletion> {
        let tasks = self.tasks.lock().await;
        let mut pending: Vec<PendingDeletion> = tasks
            .iter()
            .map(|(surface, task)| PendingDeletion {
                surface: surface.clone(),
                due_at: task.due_at,
            })
            .collect();
        pending.sort_by_key(|p| p.due_at);
        pending
    }

    /// Cancels every pending deletion.
    pub async fn cancel_all(&self) {
        let mut tasks = self.tasks.lock().await;
        for (_, task) in tasks.drain() {
            task.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nox_core::platform::SurfaceAccess;
    use nox_infrastructure::InMemoryPlatform;

    async fn setup() -> (Arc<InMemoryPlatform>, DeletionScheduler, SurfaceId) {
        let platform = Arc::new(InMemoryPlatform::new("Nox"));
        let surface = platform
            .create_review_surface("application-alice", 1, &SurfaceAccess::default())
            .await
            .unwrap();
        let scheduler = DeletionScheduler::new(platform.clone());
        (platform, scheduler, surface)
    }

    #[tokio::test(start_paused = true)]
    async fn test_deletes_after_delay() {
        let (platform, scheduler, surface) = setup().await;
        scheduler.schedule(surface.clone(), Duration::from_secs(600)).await;
        assert_eq!(scheduler.pending().await.len(), 1);

        tokio::time::sleep(Duration::from_secs(599)).await;
        assert!(platform.surface(&surface).is_some());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(platform.surface(&surface).is_none());
        assert!(scheduler.pending().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_deletion() {
        let (platform, scheduler, surface) = setup().await;
        scheduler.schedule(surface.clone(), Duration::from_secs(60)).await;
        assert!(scheduler.cancel(&surface).await);
        assert!(!scheduler.cancel(&surface).await);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(platform.surface(&surface).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_previous() {
        let (platform, scheduler, surface) = setup().await;
        scheduler.schedule(surface.clone(), Duration::from_secs(60)).await;
        scheduler.schedule(surface.clone(), Duration::from_secs(3600)).await;
        assert_eq!(scheduler.pending().await.len(), 1);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(platform.surface(&surface).is_some());

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert!(platform.surface(&surface).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_surface_already_gone_is_tolerated() {
        let (platform, scheduler, surface) = setup().await;
        scheduler.schedule(surface.clone(), Duration::from_secs(10)).await;
        platform.delete_surface(&surface).await.unwrap();

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(scheduler.pending().await.is_empty());
    }
}
