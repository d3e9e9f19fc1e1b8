//! Bamboo CLI - Database migrations and back-office bootstrap tools.
//!
//! # Usage
//!
//! ```bash
//! # Run back-office database migrations
//! bamboo-cli migrate
//!
//! # Create the first super admin (password from BAMBOO_ADMIN_PASSWORD)
//! bamboo-cli admin create-super -u root -e root@bamboo.ga -f Awa -l Ndong
//!
//! # Load banks and insurance companies
//! bamboo-cli seed institutions data/institutions.yaml
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bamboo-cli")]
#[command(author, version, about = "Bamboo back-office CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Load reference data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a super admin account
    CreateSuper {
        /// Login username
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// First name
        #[arg(short, long)]
        first_name: String,

        /// Last name
        #[arg(short, long)]
        last_name: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Upsert banks and insurance companies from a YAML file
    Institutions {
        /// Path to the YAML file
        file: String,
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
            AdminAction::CreateSuper {
                username,
                email,
                first_name,
                last_name,
            } => {
                commands::admin::create_super(commands::admin::SuperAdminArgs {
                    username,
                    email,
                    first_name,
                    last_name,
                })
                .await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Institutions { file } => commands::seed::institutions(&file).await?,
        },
    }
    Ok(())
}
