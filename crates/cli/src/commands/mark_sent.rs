use curio_core::domain::recommendation::RecommendationId;

use crate::commands::runtime::{execute, Failure, Workspace};
use crate::commands::CommandResult;

pub fn run(recommendation_id: &str) -> CommandResult {
    let id = RecommendationId::from(recommendation_id);

    let result = execute(|config| async move {
        let workspace = Workspace::open(&config).await?;
        let marked = workspace
            .service
            .mark_recommendation_as_sent(&id)
            .await
            .map_err(Failure::application);
        workspace.close().await;
        marked
    });

    match result {
        Ok(set) => CommandResult::success_with_data(
            "mark-sent",
            format!("recommendation set {} marked as sent", set.id),
            &set,
        ),
        Err(failure) => CommandResult::from_failure("mark-sent", failure),
    }
}
