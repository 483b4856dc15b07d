//! Pizzeria CLI - inspect the storefront engine against a live backend.
//!
//! # Usage
//!
//! ```bash
//! # Menu sorted by rating
//! pz menu --sort rating
//!
//! # Track an order
//! pz order show IIDSAT
//!
//! # Order history of a signed-in user
//! PIZZERIA_API_TOKEN=... pz --user-id 7 order history
//!
//! # Operator statistics
//! PIZZERIA_API_TOKEN=... pz --user-id 1 --admin admin stats
//! ```
//!
//! # Commands
//!
//! - `menu` - List the menu
//! - `order` - Track orders and list history
//! - `favorites` - List favorites
//! - `admin` - Operator ledger (stats, status changes, deletion)
//!
//! Configuration comes from the environment; see
//! [`pizzeria_storefront::config`].

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use pizzeria_core::{OrderId, OrderStatus, UserId};
use pizzeria_storefront::models::CurrentUser;
use pizzeria_storefront::{MenuSort, Storefront, StorefrontConfig};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "pz")]
#[command(author, version, about = "Pizzeria storefront CLI")]
struct Cli {
    /// Sign in as this user id with `PIZZERIA_API_TOKEN`
    #[arg(long, global = true)]
    user_id: Option<i32>,

    /// Treat the signed-in user as an operator
    #[arg(long, global = true)]
    admin: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the menu
    Menu {
        /// Ordering (`featured`, `price-asc`, `price-desc`, `rating`, `name`)
        #[arg(short, long, default_value = "featured")]
        sort: MenuSort,
    },
    /// Track orders
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// List favorites
    Favorites,
    /// Operator ledger
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Show one order
    Show {
        /// Order id
        id: String,
    },
    /// Mark an order as priority
    Prioritize {
        /// Order id
        id: String,
    },
    /// List the signed-in user's orders
    History,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Show ledger statistics
    Stats,
    /// Set an order's status
    SetStatus {
        /// Order id
        id: String,
        /// Status identifier (e.g. `delivering`)
        status: String,
    },
    /// Delete an order
    Delete {
        /// Order id
        id: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Map tracing levels to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Configuration error: {e}");
            }
            std::process::exit(2);
        }
    };

    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for the engine if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pizzeria_storefront=info,pizzeria_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), Box<dyn std::error::Error>> {
    let token = config.api_token.clone();
    let storefront = Storefront::from_config(config)?;

    if let (Some(token), Some(id)) = (token, cli.user_id) {
        let user = CurrentUser {
            id: UserId::new(id),
            username: format!("user-{id}"),
            is_admin: cli.admin,
        };
        storefront.sign_in(token, user).await?;
    }

    match cli.command {
        Commands::Menu { sort } => commands::menu::list(&storefront, sort).await?,
        Commands::Order { action } => match action {
            OrderAction::Show { id } => {
                commands::orders::show(&storefront, &OrderId::from(id)).await?;
            }
            OrderAction::Prioritize { id } => {
                commands::orders::prioritize(&storefront, &OrderId::from(id)).await?;
            }
            OrderAction::History => commands::orders::history(&storefront).await?,
        },
        Commands::Favorites => commands::favorites::list(&storefront).await?,
        Commands::Admin { action } => match action {
            AdminAction::Stats => commands::admin::stats(&storefront).await?,
            AdminAction::SetStatus { id, status } => {
                let status = OrderStatus::from(status);
                commands::admin::set_status(&storefront, &OrderId::from(id), status).await?;
            }
            AdminAction::Delete { id } => {
                commands::admin::delete(&storefront, &OrderId::from(id)).await?;
            }
        },
    }
    Ok(())
}
