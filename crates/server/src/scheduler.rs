use std::sync::Arc;
use std::time::Duration;

use curio_core::{BatchOrchestrator, BatchSettings, RecommendationService};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Run the recommendation batch every `period` until `cancel` fires.
///
/// The first run happens one full period after start. A failed run is logged
/// and the loop waits for the next tick. Returns the number of completed runs.
pub async fn run_batch_loop(
    service: Arc<RecommendationService>,
    settings: BatchSettings,
    period: Duration,
    cancel: CancellationToken,
) -> usize {
    let orchestrator = BatchOrchestrator::new(service, settings);
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut runs = 0;
    let mut consecutive_failures = 0u32;

    info!(
        event_name = "scheduler.started",
        interval_secs = period.as_secs(),
        "scheduled batch loop started"
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                match orchestrator.run(&cancel).await {
                    Ok(outcome) => {
                        runs += 1;
                        if consecutive_failures > 0 {
                            info!(
                                event_name = "scheduler.recovered",
                                recovered_after = consecutive_failures,
                                "scheduled batch recovered after failures"
                            );
                            consecutive_failures = 0;
                        }
                        if outcome.cancelled {
                            break;
                        }
                    }
                    Err(failure) => {
                        consecutive_failures += 1;
                        error!(
                            event_name = "scheduler.batch_failed",
                            error_class = failure.class(),
                            error = %failure,
                            consecutive_failures,
                            "scheduled batch failed, will retry on next interval"
                        );
                    }
                }
            }
        }
    }

    info!(event_name = "scheduler.stopped", runs, "scheduled batch loop stopped");
    runs
}
