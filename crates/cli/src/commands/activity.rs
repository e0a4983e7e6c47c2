use curio_core::domain::activity::{ActivityMetadata, ActivityType, UserId};
use curio_core::domain::product::ProductId;
use curio_core::ApplicationError;

use crate::commands::runtime::{execute, Failure, Workspace};
use crate::commands::CommandResult;

#[derive(Debug, Clone)]
pub struct ActivityArgs {
    pub user_id: String,
    pub product_id: String,
    pub activity_type: String,
    pub search_query: Option<String>,
}

pub fn run(args: ActivityArgs) -> CommandResult {
    let activity_type = match args.activity_type.parse::<ActivityType>() {
        Ok(activity_type) => activity_type,
        Err(error) => {
            return CommandResult::from_failure(
                "activity",
                Failure::application(ApplicationError::from(error)),
            );
        }
    };
    let metadata = args.search_query.map(ActivityMetadata::search);
    let user_id = UserId(args.user_id);
    let product_id = ProductId(args.product_id);

    let result = execute(|config| async move {
        let workspace = Workspace::open(&config).await?;
        let created = workspace
            .service
            .create_user_activity(&user_id, &product_id, activity_type, metadata)
            .await
            .map_err(Failure::application);
        workspace.close().await;
        created
    });

    match result {
        Ok(record) => CommandResult::success_with_data(
            "activity",
            format!("recorded {} of {} by {}", record.activity_type, record.product_id, record.user_id),
            &record,
        ),
        Err(failure) => CommandResult::from_failure("activity", failure),
    }
}
