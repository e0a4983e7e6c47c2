use curio_core::domain::activity::UserId;
use curio_core::recommend::UserPreferences;

use crate::commands::runtime::{execute, Failure, Workspace};
use crate::commands::CommandResult;

pub fn run(user_id: &str, categories: &[String]) -> CommandResult {
    let user_id = UserId::from(user_id);
    let preferences = (!categories.is_empty())
        .then(|| UserPreferences::with_categories(categories.iter().cloned()));

    let result = execute(|config| async move {
        let workspace = Workspace::open(&config).await?;
        let generated = workspace
            .service
            .generate_user_recommendations(&user_id, preferences.as_ref())
            .await
            .map_err(Failure::application);
        workspace.close().await;
        generated
    });

    match result {
        Ok(set) => CommandResult::success_with_data(
            "generate",
            format!("recommendation set {} holds {} products", set.id, set.products.len()),
            &set,
        ),
        Err(failure) => CommandResult::from_failure("generate", failure),
    }
}
