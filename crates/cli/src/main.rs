//! DWA Market CLI - Shop, sell and manage your account from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Check the backend and the saved session
//! dwa ping
//!
//! # Sign in and browse
//! dwa login -e ama@ashesi.edu.gh -p 'S3cret!pw'
//! dwa items
//!
//! # Fill the cart and pay
//! dwa cart add 6f1c...
//! dwa checkout
//!
//! # Vendors
//! dwa vendor add -n "Desk lamp" -c ELECTRONICS -q 3 --cost 45.50
//! dwa vendor sales
//! ```
//!
//! # Commands
//!
//! - `ping` / `whoami` - Backend and session status
//! - `login` / `signup` / `logout` - Session management
//! - `items` / `item` - Browse the catalogue
//! - `cart` - Show and edit the server-synced cart
//! - `checkout` - Pay for every line in the cart
//! - `vendor` - Manage listings and view sales
//! - `profile` - Update or delete the account
//!
//! Configuration is read from the environment (see `dwa_client::config`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dwa_core::Category;

mod commands;

#[derive(Parser)]
#[command(name = "dwa")]
#[command(author, version, about = "DWA Market command-line client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the backend and the saved session
    Ping,
    /// Sign in
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },
    /// Create an account
    Signup {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password (at least 8 characters)
        #[arg(short, long)]
        password: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Register as a vendor instead of a buyer
        #[arg(long)]
        vendor: bool,
    },
    /// Sign out and forget the saved session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List items for sale
    Items {
        /// Only items listed by this vendor
        #[arg(long)]
        vendor: Option<String>,
    },
    /// Show one item
    Item {
        /// Item ID
        iid: String,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Pay for everything in the cart
    Checkout,
    /// Manage your listings (vendors)
    Vendor {
        #[command(subcommand)]
        action: VendorAction,
    },
    /// Manage your account
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart with its price breakdown
    Show,
    /// Add one unit of an item
    Add {
        /// Item ID
        iid: String,
    },
    /// Set the quantity of a line (0 removes it)
    Set {
        /// Item ID
        iid: String,
        /// Vendor ID
        vid: String,
        /// New quantity
        quantity: u32,
    },
    /// Remove a line
    Remove {
        /// Item ID
        iid: String,
        /// Vendor ID
        vid: String,
    },
    /// Empty the cart
    Clear,
    /// Reload the cart from the server
    Refresh,
}

#[derive(Subcommand)]
enum VendorAction {
    /// List a new item
    Add {
        /// Item name
        #[arg(short, long)]
        name: String,

        /// Category (`FASHION`, `BOOKS_SUPPLIES`, `SERVICES`, `ELECTRONICS`)
        #[arg(short, long)]
        category: Category,

        /// Units in stock
        #[arg(short, long)]
        quantity: i32,

        /// Unit price
        #[arg(long)]
        cost: Decimal,

        /// Description
        #[arg(short, long)]
        description: Option<String>,

        /// Picture URL
        #[arg(long)]
        picture: Option<String>,
    },
    /// Change a listing
    Update {
        /// Item ID
        iid: String,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        category: Option<Category>,

        #[arg(short, long)]
        quantity: Option<i32>,

        #[arg(long)]
        cost: Option<Decimal>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(long)]
        picture: Option<String>,
    },
    /// Remove a listing
    Delete {
        /// Item ID
        iid: String,
    },
    /// Show sales and total earnings
    Sales,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Change email and display name
    Update {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        name: String,
    },
    /// Delete the account
    Delete {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

/// Initialize Sentry when `SENTRY_DSN` is set; the guard must be kept alive.
fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|d| !d.trim().is_empty())?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load .env before reading SENTRY_DSN (ignore errors if not found)
    let _ = dotenvy::dotenv();
    let sentry_guard = init_sentry();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dwa_client=info,dwa_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_guard.as_ref().map(|_| {
            sentry_tracing::layer().event_filter(sentry_event_filter)
        }))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    use commands::{account, shop, vendor};

    // Every command starts from the restored and verified session.
    let ctx = commands::Context::load().await?;

    match cli.command {
        Commands::Ping => account::ping(&ctx).await?,
        Commands::Login { email, password } => account::login(&ctx, email, password).await?,
        Commands::Signup {
            email,
            password,
            name,
            vendor,
        } => account::signup(&ctx, email, password, name, vendor).await?,
        Commands::Logout => account::logout(&ctx)?,
        Commands::Whoami => account::whoami(&ctx),
        Commands::Items { vendor } => shop::items(&ctx, vendor.as_deref()).await?,
        Commands::Item { iid } => shop::item(&ctx, &iid).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => shop::show_cart(&ctx),
            CartAction::Add { iid } => shop::add_to_cart(&ctx, &iid).await?,
            CartAction::Set { iid, vid, quantity } => {
                shop::set_quantity(&ctx, &iid, &vid, quantity).await?;
            }
            CartAction::Remove { iid, vid } => shop::remove_from_cart(&ctx, &iid, &vid).await?,
            CartAction::Clear => shop::clear_cart(&ctx).await?,
            CartAction::Refresh => shop::refresh_cart(&ctx).await?,
        },
        Commands::Checkout => shop::checkout(&ctx).await?,
        Commands::Vendor { action } => match action {
            VendorAction::Add {
                name,
                category,
                quantity,
                cost,
                description,
                picture,
            } => {
                let listing = vendor::Listing {
                    name,
                    category,
                    quantity,
                    cost,
                    description,
                    picture,
                };
                vendor::add(&ctx, listing).await?;
            }
            VendorAction::Update {
                iid,
                name,
                category,
                quantity,
                cost,
                description,
                picture,
            } => {
                let changes = vendor::Changes {
                    name,
                    category,
                    quantity,
                    cost,
                    description,
                    picture,
                };
                vendor::update(&ctx, &iid, changes).await?;
            }
            VendorAction::Delete { iid } => vendor::delete(&ctx, &iid).await?,
            VendorAction::Sales => vendor::sales(&ctx).await?,
        },
        Commands::Profile { action } => match action {
            ProfileAction::Update { email, name } => {
                account::update_profile(&ctx, &email, &name).await?;
            }
            ProfileAction::Delete { yes } => account::delete_account(&ctx, yes).await?,
        },
    }
    Ok(())
}
