//! Craftcart CLI - a shopping cart on the command line.
//!
//! The cart is persisted under `CRAFTCART_DATA_DIR` (default `.craftcart`),
//! so it survives between invocations.
//!
//! # Usage
//!
//! ```bash
//! # Add two clay mugs
//! craftcart add --id 12 --name "Clay mug" --price 349 --quantity 2
//!
//! # Apply a coupon
//! craftcart apply-coupon save10
//!
//! # Show the cart and order summary
//! craftcart show
//! ```
//!
//! # Commands
//!
//! - `show` - Print the cart and its order summary
//! - `add` / `remove` / `set-quantity` - Edit line items
//! - `apply-coupon` / `remove-coupon` - Manage the applied coupon
//! - `clear` - Empty the cart
//! - `coupons` - List available coupons
//!
//! Set `RUST_LOG` to adjust logging (default `warn`) and
//! `CRAFTCART_LOG_FORMAT=json` for JSON log lines. Logs go to stderr.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use craftcart_core::{Money, ProductId};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "craftcart")]
#[command(author, version, about = "Craftcart shopping cart")]
struct Cli {
    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cart and its order summary
    Show,
    /// Add a product, or increase its quantity if already present
    Add {
        /// Product id
        #[arg(long)]
        id: ProductId,

        /// Product name
        #[arg(long)]
        name: String,

        /// Unit price
        #[arg(long)]
        price: Money,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Image URL
        #[arg(long, default_value = "")]
        image: String,

        /// Product category
        #[arg(long)]
        category: Option<String>,
    },
    /// Remove a product from the cart
    Remove {
        /// Product id
        id: ProductId,
    },
    /// Set a product's quantity (zero or less removes it)
    SetQuantity {
        /// Product id
        id: ProductId,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Apply a coupon code
    ApplyCoupon {
        /// Coupon code (case-insensitive)
        code: String,
    },
    /// Remove the applied coupon
    RemoveCoupon,
    /// Remove every item and the applied coupon
    Clear,
    /// List available coupons
    Coupons,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());
    let json = std::env::var("CRAFTCART_LOG_FORMAT").is_ok_and(|format| format == "json");

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli);

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = commands::Session::open(cli.json)?;
    match cli.command {
        Commands::Show => session.show()?,
        Commands::Add {
            id,
            name,
            price,
            quantity,
            image,
            category,
        } => {
            let mut product = craftcart_cart::Product::new(id, name, price, image);
            if let Some(category) = category {
                product = product.with_category(category);
            }
            session.add(product, quantity)?;
        }
        Commands::Remove { id } => session.remove(id)?,
        Commands::SetQuantity { id, quantity } => session.set_quantity(id, quantity)?,
        Commands::ApplyCoupon { code } => session.apply_coupon(&code)?,
        Commands::RemoveCoupon => session.remove_coupon()?,
        Commands::Clear => session.clear()?,
        Commands::Coupons => session.coupons()?,
    }
    Ok(())
}
