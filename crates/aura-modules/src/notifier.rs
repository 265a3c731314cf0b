//! Background deadline notifier.
//!
//! Periodically looks for tasks whose deadline falls inside the lookahead
//! window and announces each one once.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use aura_core::config::NotificationsConfig;
use aura_core::error::AuraError;
use aura_storage::{TaskRecord, TaskRepository};

/// Loop that logs upcoming task deadlines.
pub struct DeadlineNotifier {
    tasks: TaskRepository,
    interval: Duration,
    lookahead: chrono::Duration,
    shutdown: Arc<Notify>,
}

impl DeadlineNotifier {
    pub fn new(tasks: TaskRepository, config: &NotificationsConfig) -> Self {
        Self {
            tasks,
            interval: Duration::from_secs(config.interval_secs.max(1)),
            lookahead: chrono::Duration::minutes(config.lookahead_minutes),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Announce every not-yet-notified task due between `now` and the end of
    /// the lookahead window, then mark it notified.
    pub fn check_once(&self, now: DateTime<Utc>) -> Result<Vec<TaskRecord>, AuraError> {
        let due = self.tasks.pending_notifications(now, now + self.lookahead)?;
        for task in &due {
            let deadline = task
                .deadline
                .map(|d| d.to_rfc3339())
                .unwrap_or_default();
            tracing::info!(
                title = %task.title,
                %deadline,
                priority = %task.priority,
                "Upcoming Task: {}",
                task.title
            );
            self.tasks.mark_notified(&task.title)?;
        }
        Ok(due)
    }

    /// Run until [`shutdown`](Self::shutdown) is called. Checks once
    /// immediately, then every interval.
    pub async fn run(&self) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            lookahead_minutes = self.lookahead.num_minutes(),
            "Deadline notifier started"
        );
        loop {
            if let Err(e) = self.check_once(Utc::now()) {
                tracing::warn!(error = %e, "Deadline check failed");
            }
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.shutdown.notified() => {
                    tracing::info!("Deadline notifier stopped");
                    return;
                }
            }
        }
    }

    /// Signal the loop to stop.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}
