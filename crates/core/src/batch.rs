use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::domain::activity::UserId;
use crate::errors::ApplicationError;
use crate::lifecycle::RecommendationService;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchSettings {
    pub concurrency: usize,
    pub deadline: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self::from(&SchedulerConfig::default())
    }
}

impl From<&SchedulerConfig> for BatchSettings {
    fn from(config: &SchedulerConfig) -> Self {
        Self { concurrency: config.batch_concurrency.max(1), deadline: config.deadline() }
    }
}

/// Tally of one batch run.
///
/// The deadline and cancellation stop new users from being started. Users
/// never started count as failed; users already running are awaited, so a
/// persisted set is always announced and counted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
    pub timed_out: bool,
    pub cancelled: bool,
}

/// Generates recommendations for every user with recorded activity.
pub struct BatchOrchestrator {
    service: Arc<RecommendationService>,
    settings: BatchSettings,
}

impl BatchOrchestrator {
    pub fn new(service: Arc<RecommendationService>, settings: BatchSettings) -> Self {
        Self { service, settings }
    }

    pub async fn run(&self, cancel: &CancellationToken) -> Result<BatchOutcome, ApplicationError> {
        let batch_id = Uuid::new_v4().to_string();
        let users = self.service.users_with_activity().await?;
        let mut outcome = BatchOutcome { total: users.len(), ..BatchOutcome::default() };

        info!(
            event_name = "batch.started",
            correlation_id = %batch_id,
            users = outcome.total,
            concurrency = self.settings.concurrency,
            "batch recommendation generation started"
        );

        let permits = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));
        let mut pending = users.into_iter();
        let mut next_user = pending.next();
        let mut tasks = JoinSet::new();
        let mut stopped = false;

        let deadline = tokio::time::sleep(self.settings.deadline);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled(), if !stopped && next_user.is_some() => {
                    outcome.cancelled = true;
                    stopped = true;
                }
                _ = &mut deadline, if !stopped && next_user.is_some() => {
                    outcome.timed_out = true;
                    stopped = true;
                }
                Some(joined) = tasks.join_next() => match joined {
                    Ok((_, Ok(_))) => outcome.success += 1,
                    Ok((user_id, Err(failure))) => {
                        outcome.failed += 1;
                        log_user_failure(&batch_id, &user_id, &failure);
                    }
                    Err(join_error) => {
                        outcome.failed += 1;
                        error!(
                            event_name = "batch.task_panicked",
                            correlation_id = %batch_id,
                            error = %join_error,
                            "batch task did not complete"
                        );
                    }
                },
                permit = permits.clone().acquire_owned(), if !stopped && next_user.is_some() => {
                    let (Ok(permit), Some(user_id)) = (permit, next_user.take()) else {
                        stopped = true;
                        continue;
                    };
                    next_user = pending.next();
                    let service = self.service.clone();
                    tasks.spawn(async move {
                        let result = service.generate_user_recommendations(&user_id, None).await;
                        drop(permit);
                        (user_id, result)
                    });
                }
                else => break,
            }
        }

        let not_started = outcome.total - outcome.success - outcome.failed;
        if not_started > 0 {
            outcome.failed += not_started;
            warn!(
                event_name = "batch.interrupted",
                correlation_id = %batch_id,
                cancelled = outcome.cancelled,
                timed_out = outcome.timed_out,
                not_started,
                "batch stopped before every user was started"
            );
        }

        info!(
            event_name = "batch.completed",
            correlation_id = %batch_id,
            success = outcome.success,
            failed = outcome.failed,
            total = outcome.total,
            timed_out = outcome.timed_out,
            cancelled = outcome.cancelled,
            "batch recommendation generation complete"
        );
        Ok(outcome)
    }
}

fn log_user_failure(batch_id: &str, user_id: &UserId, failure: &ApplicationError) {
    warn!(
        event_name = "batch.user_failed",
        correlation_id = %batch_id,
        user_id = %user_id,
        error_class = failure.class(),
        error = %failure,
        "recommendation generation failed for user"
    );
}
