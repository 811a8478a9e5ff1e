//! Shoppy CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! shoppy-cli migrate
//!
//! # Seed the checkout country list
//! shoppy-cli seed countries --file instance/countries.txt
//!
//! # Seed default categories and characteristic labels
//! shoppy-cli seed catalog
//!
//! # Grant admin access to a user
//! shoppy-cli admin grant -e admin@example.com
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Load reference data (countries, part categories, labels)
//! - `admin grant|revoke` - Manage admin flags

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "shoppy-cli")]
#[command(author, version, about = "Shoppy CLI tools")]
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
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Load the checkout country list from a `name, code` file
    Countries {
        /// Path to the countries file, one `name, code` pair per line
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Load default part categories and characteristic labels
    Catalog,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Grant admin access to an existing user
    Grant {
        /// User email address
        #[arg(short, long)]
        email: String,
    },
    /// Revoke admin access from a user
    Revoke {
        /// User email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::Seed { target } => match target {
            SeedTarget::Countries { file } => commands::seed::countries(&file).await,
            SeedTarget::Catalog => commands::seed::catalog().await,
        },
        Commands::Admin { action } => match action {
            AdminAction::Grant { email } => commands::admin::set_admin(&email, true).await,
            AdminAction::Revoke { email } => commands::admin::set_admin(&email, false).await,
        },
    }
}
