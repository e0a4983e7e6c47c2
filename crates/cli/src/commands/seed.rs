use chrono::Utc;

use curio_db::{SeedDataset, SqlActivityStore, SqlCatalog};

use crate::commands::runtime::{execute, open_database, Failure};
use crate::commands::CommandResult;

pub fn run(seed: u64) -> CommandResult {
    let result = execute(|config| async move {
        let pool = open_database(&config).await?;
        let catalog = SqlCatalog::new(pool.clone());
        let activities = SqlActivityStore::new(pool.clone());

        let loaded = SeedDataset::new(seed)
            .load(&catalog, &activities, Utc::now())
            .await
            .map_err(|error| Failure::new("seed_execution", error.to_string(), 5))?;

        let verification = SeedDataset::verify(&catalog, &activities)
            .await
            .map_err(|error| Failure::new("seed_verification", error.to_string(), 6))?;

        pool.close().await;

        if verification.all_present {
            Ok(loaded)
        } else {
            Err(Failure::new("seed_verification", failed_checks_message(&verification.checks), 6))
        }
    });

    match result {
        Ok(loaded) => CommandResult::success_with_data(
            "seed",
            format!(
                "seeded {} products and {} activities for {} users",
                loaded.products_seeded,
                loaded.activities_seeded,
                loaded.users.len()
            ),
            &loaded,
        ),
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

fn failed_checks_message(checks: &[(String, bool)]) -> String {
    let failed: Vec<&str> =
        checks.iter().filter_map(|(check, passed)| (!passed).then_some(check.as_str())).collect();
    if failed.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed.join(", "))
    }
}
