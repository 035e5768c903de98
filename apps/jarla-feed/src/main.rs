use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jarla_db::Collection;

mod backend;
mod commands;
mod config;
mod rest_source;

use backend::Backend;
use config::FeedConfig;

#[derive(Parser)]
#[command(name = "jarla-feed")]
#[command(about = "Jarla campaign and deal feed tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Project earnings for a tier schedule, e.g. --tiers 0-10000:10,10000-:5
    Projection {
        #[arg(long)]
        tiers: String,
        /// Campaign max payout
        #[arg(long)]
        max: f64,
        #[arg(long, default_value = "sek")]
        currency: String,
    },
    /// Page through active campaigns or deals, newest first
    Feed {
        #[arg(long, default_value = "campaigns")]
        collection: Collection,
        /// Number of batches to load
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Record a listing as recently viewed
    View { id: String },
    /// Show recently viewed listings, most recent first
    Recent {
        #[arg(long, default_value = "campaigns")]
        collection: Collection,
        /// Forget the recently viewed list instead
        #[arg(long)]
        clear: bool,
    },
    /// Manage a user's favorites
    Favorites {
        #[command(subcommand)]
        action: FavoriteCommands,
    },
    /// Apply the bundled schema to a local Postgres database
    Migrate,
}

#[derive(Subcommand)]
enum FavoriteCommands {
    List {
        user: String,
        #[arg(long, default_value = "campaigns")]
        collection: Collection,
    },
    Add {
        user: String,
        id: String,
    },
    Remove {
        user: String,
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jarla_feed=info,jarla_db=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // reqwest is built without a bundled crypto provider
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();

    if let Commands::Projection {
        tiers,
        max,
        currency,
    } = &cli.command
    {
        return commands::projection(tiers, *max, currency);
    }

    let config = FeedConfig::load()?;

    if let Commands::View { id } = &cli.command {
        return commands::view(&config, id);
    }

    let backend = Backend::connect(&config).await?;
    tracing::info!("Using {:?} backend", config.backend);

    match cli.command {
        Commands::Feed { collection, pages } => {
            commands::feed(&backend, &config, collection, pages.max(1)).await?;
        }
        Commands::Recent { collection, clear } => {
            commands::recent(backend.source(), &config, collection, clear).await?;
        }
        Commands::Favorites { action } => match action {
            FavoriteCommands::List { user, collection } => {
                commands::favorites(&backend, &config, &user, collection).await?;
            }
            FavoriteCommands::Add { user, id } => {
                backend.add_favorite(&user, &id).await?;
                println!("Added {} to favorites of {}", id, user);
            }
            FavoriteCommands::Remove { user, id } => {
                backend.remove_favorite(&user, &id).await?;
                println!("Removed {} from favorites of {}", id, user);
            }
        },
        Commands::Migrate => {
            let pool = backend
                .pool()
                .context("migrate needs the postgres backend (JARLA_BACKEND=postgres)")?;
            jarla_db::db::run_migrations(pool).await?;
            println!("Migrations applied.");
        }
        Commands::Projection { .. } | Commands::View { .. } => {}
    }

    Ok(())
}
