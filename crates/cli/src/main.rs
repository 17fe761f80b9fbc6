//! 1nceMore CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run accounts database migrations
//! oncemore-cli migrate accounts
//!
//! # Run catalog database migrations
//! oncemore-cli migrate catalog
//!
//! # Run all database migrations
//! oncemore-cli migrate all
//!
//! # Create a verified admin account
//! oncemore-cli admin create -e admin@example.com -n "Admin Name" -p 'a-strong-password'
//!
//! # Load catalog products from YAML
//! oncemore-cli seed products products.yaml
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "oncemore-cli")]
#[command(author, version, about = "1nceMore CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Load data from files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Run accounts database migrations
    Accounts,
    /// Run catalog database migrations
    Catalog,
    /// Run all database migrations
    All,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a verified admin account
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin full name
        #[arg(short, long)]
        name: String,

        /// Initial password (at least 6 characters)
        #[arg(short, long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert catalog products from a YAML list
    Products {
        /// Path to the YAML file
        file: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate { target } => match target {
            MigrateTarget::Accounts => commands::migrate::accounts().await?,
            MigrateTarget::Catalog => commands::migrate::catalog().await?,
            MigrateTarget::All => {
                commands::migrate::accounts().await?;
                commands::migrate::catalog().await?;
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
            } => {
                commands::admin::create_user(&email, &name, &password).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Products { file } => {
                commands::seed::products(&file).await?;
            }
        },
    }
    Ok(())
}
