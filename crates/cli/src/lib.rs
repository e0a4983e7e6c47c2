pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::{activity, batch, config, generate, mark_sent, migrate, recommendations, seed};

#[derive(Debug, Parser)]
#[command(
    name = "curio",
    about = "Curio recommendation operator CLI",
    long_about = "Operate the Curio recommendation store: migrations, demo seeding, \
                  recommendation generation and delivery bookkeeping.",
    after_help = "Examples:\n  curio migrate\n  curio seed --seed 7\n  \
                  curio generate 607f1f77bcf86cd799439011 --category electronics\n  curio batch"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo catalog and user activity")]
    Seed {
        #[arg(long, default_value_t = curio_db::fixtures::DEFAULT_SEED)]
        seed: u64,
    },
    #[command(about = "Generate (or reuse) the active recommendation set for a user")]
    Generate {
        user_id: String,
        #[arg(long = "category", help = "Preferred category; repeatable")]
        categories: Vec<String>,
    },
    #[command(about = "Fetch a user's recommendations; marks the set as sent")]
    Recommendations { user_id: String },
    #[command(about = "Record a user activity against a catalog product")]
    Activity {
        user_id: String,
        product_id: String,
        #[arg(help = "view | cart | purchase | wishlist | search")]
        activity_type: String,
        #[arg(long)]
        search_query: Option<String>,
    },
    #[command(about = "Mark a recommendation set as sent")]
    MarkSent { recommendation_id: String },
    #[command(about = "Generate recommendations for every user with activity")]
    Batch,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => migrate::run(),
        Command::Seed { seed } => seed::run(seed),
        Command::Generate { user_id, categories } => generate::run(&user_id, &categories),
        Command::Recommendations { user_id } => recommendations::run(&user_id),
        Command::Activity { user_id, product_id, activity_type, search_query } => {
            activity::run(activity::ActivityArgs {
                user_id,
                product_id,
                activity_type,
                search_query,
            })
        }
        Command::MarkSent { recommendation_id } => mark_sent::run(&recommendation_id),
        Command::Batch => batch::run(),
        Command::Config => commands::CommandResult { exit_code: 0, output: config::run() },
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
