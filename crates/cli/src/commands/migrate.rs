use crate::commands::runtime::{execute, open_database};
use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let result = execute(|config| async move {
        let pool = open_database(&config).await?;
        pool.close().await;
        Ok(())
    });

    match result {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err(failure) => CommandResult::from_failure("migrate", failure),
    }
}
