use curio_core::domain::activity::UserId;

use crate::commands::runtime::{execute, Failure, Workspace};
use crate::commands::CommandResult;

/// Fetching delivers: the returned set is marked sent.
pub fn run(user_id: &str) -> CommandResult {
    let user_id = UserId::from(user_id);

    let result = execute(|config| async move {
        let workspace = Workspace::open(&config).await?;
        let view = workspace
            .service
            .get_user_recommendations(&user_id)
            .await
            .map_err(Failure::application);
        workspace.close().await;
        view
    });

    match result {
        Ok(view) => CommandResult::success_with_data(
            "recommendations",
            format!("{} recommendations for {}", view.products.len(), view.user_id),
            &view,
        ),
        Err(failure) => CommandResult::from_failure("recommendations", failure),
    }
}
