//! ICT Asset Desk CLI - migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! ict-cli migrate
//!
//! # Insert the default ICT categories
//! ict-cli seed categories
//!
//! # Promote a user
//! ict-cli user set-role 6f1c2d4e-0000-4000-8000-000000000001 admin
//!
//! # List profiles
//! ict-cli user list
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ict-cli")]
#[command(author, version, about = "ICT Asset Desk CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed reference data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage user profiles
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert the default asset categories (idempotent)
    Categories,
}

#[derive(Subcommand)]
enum UserAction {
    /// Set a user's role, creating the profile if needed
    SetRole {
        /// Identity user id (UUID)
        user_id: String,

        /// Role (`admin`, `admin_assistant`, `staff`)
        role: String,
    },
    /// List all profiles
    List,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Categories => {
                commands::seed::categories().await?;
            }
        },
        Commands::User { action } => match action {
            UserAction::SetRole { user_id, role } => {
                commands::user::set_role(&user_id, &role).await?;
            }
            UserAction::List => commands::user::list().await?,
        },
    }
    Ok(())
}
