use crate::commands::runtime::{execute, Failure, Workspace};
use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let result = execute(|config| async move {
        let workspace = Workspace::open(&config).await?;
        let outcome = workspace
            .service
            .generate_batch_recommendations()
            .await
            .map_err(Failure::application);
        workspace.close().await;
        outcome
    });

    match result {
        Ok(outcome) => CommandResult::success_with_data(
            "batch",
            format!(
                "generated recommendations for {} of {} users ({} failed)",
                outcome.success, outcome.total, outcome.failed
            ),
            &outcome,
        ),
        Err(failure) => CommandResult::from_failure("batch", failure),
    }
}
