//! SolarShop CLI - database migrations and back-office tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply schema and session store migrations
//! ss-cli migrate
//!
//! # Create an admin user
//! ss-cli admin create -e admin@example.com -p 'S3cure-pass' -f Jane -l Doe
//!
//! # Promote an existing customer
//! ss-cli admin promote -e ops@example.com
//!
//! # Load demo categories and products
//! ss-cli seed -f crates/cli/seed/catalog.yaml
//!
//! # Compare stock balances against the movement ledger
//! ss-cli inventory audit
//! ```
//!
//! # Environment Variables
//!
//! - `SOLARSHOP_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ss-cli")]
#[command(author, version, about = "SolarShop CLI tools")]
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
    /// Seed the catalog from a YAML file
    Seed {
        /// Path to the catalog file
        #[arg(short, long, default_value = "crates/cli/seed/catalog.yaml")]
        file: String,
    },
    /// Inventory maintenance
    Inventory {
        #[command(subcommand)]
        action: InventoryAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user with a verified email
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Initial password
        #[arg(short, long)]
        password: String,

        /// First name
        #[arg(short, long)]
        first_name: String,

        /// Last name
        #[arg(short, long)]
        last_name: String,
    },
    /// Give an existing user the admin role
    Promote {
        /// Email of the user to promote
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum InventoryAction {
    /// Report products whose stock differs from their movement history
    Audit,
}

#[tokio::main]
async fn main() {
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                password,
                first_name,
                last_name,
            } => {
                commands::admin::create_user(&email, &password, &first_name, &last_name).await?;
            }
            AdminAction::Promote { email } => commands::admin::promote(&email).await?,
        },
        Commands::Seed { file } => commands::seed::catalog(&file).await?,
        Commands::Inventory { action } => match action {
            InventoryAction::Audit => commands::inventory::audit().await?,
        },
    }
    Ok(())
}
