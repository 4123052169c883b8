//! Bazaar CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! bazaar-cli migrate
//!
//! # Create a staff account, or promote an existing one
//! bazaar-cli admin create -e admin@example.com -n "Ada Lovelace" -r admin
//!
//! # Load the demo catalog
//! bazaar-cli seed
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `BAZAAR_ADMIN_PASSWORD` - Password for `admin create` when `--password` is omitted

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bazaar-cli")]
#[command(author, version, about = "Bazaar CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Manage staff accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Load a demo catalog (skips anything whose slug already exists)
    Seed,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a staff account, or change the role of an existing one
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role (`viewer` or `admin`)
        #[arg(short, long, default_value = "admin")]
        role: String,

        /// Password; required when the account does not exist yet
        #[arg(short, long, env = "BAZAAR_ADMIN_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
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

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                role,
                password,
            } => {
                commands::admin::create_user(&email, &name, &role, password.as_deref()).await?;
            }
        },
        Commands::Seed => commands::seed::run().await?,
    }
    Ok(())
}
