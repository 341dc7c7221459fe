//! Cart commands.
//!
//! ```bash
//! torodo cart add milk 1 2
//! torodo cart set milk 1 5
//! torodo cart remove milk 1
//! torodo cart show
//! torodo cart checkout --customer <id>
//! ```

use clap::Subcommand;

use torodo_core::{CustomerId, Liters, ProductId};
use torodo_storefront::cart::LineKey;
use torodo_storefront::state::AppState;

use super::CliError;

#[derive(Subcommand)]
pub enum CartAction {
    /// Show the cart lines and total
    Show,
    /// Add units of a product size
    Add {
        /// Product ID (see `torodo products`)
        product: String,
        /// Size in liters
        liters: String,
        /// Number of units
        #[arg(default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a line
    Remove {
        /// Product ID
        product: String,
        /// Size in liters
        liters: String,
    },
    /// Change the quantity of a line (values below 1 are ignored)
    Set {
        /// Product ID
        product: String,
        /// Size in liters
        liters: String,
        /// New number of units
        quantity: u32,
    },
    /// Empty the cart
    Clear,
    /// Record the cart as a sale and empty it
    Checkout {
        /// Attribute the sale to this customer
        #[arg(short, long)]
        customer: Option<String>,
    },
}

#[allow(clippy::print_stdout)]
pub fn run(state: &mut AppState, action: CartAction) -> Result<(), CliError> {
    match action {
        CartAction::Show => show(state),
        CartAction::Add {
            product,
            liters,
            quantity,
        } => {
            let liters = Liters::parse(&liters).map_err(|e| CliError::InvalidArgument(e.to_string()))?;
            let catalog = state.catalog();
            state
                .cart
                .add_catalog_item(catalog, &ProductId::new(product), liters, quantity)?;
            show(state);
        }
        CartAction::Remove { product, liters } => {
            let key = line_key(state, &product, &liters)?;
            state.cart.remove_line(&key);
            show(state);
        }
        CartAction::Set {
            product,
            liters,
            quantity,
        } => {
            let key = line_key(state, &product, &liters)?;
            if !state.cart.set_quantity(&key, quantity) {
                println!("Quantity must be at least 1; cart unchanged");
            }
            show(state);
        }
        CartAction::Clear => {
            state.cart.clear();
            println!("Cart cleared");
        }
        CartAction::Checkout { customer } => {
            let customer = customer.map(CustomerId::new);
            let sale = state.checkout(customer.as_ref())?;
            println!("Sale {} recorded: {}", sale.id, sale.total);
        }
    }
    Ok(())
}

/// Find the cart line for a product and size in liters.
fn line_key(state: &AppState, product: &str, liters: &str) -> Result<LineKey, CliError> {
    let liters = Liters::parse(liters).map_err(|e| CliError::InvalidArgument(e.to_string()))?;
    state
        .cart
        .lines()
        .iter()
        .find(|line| line.product_id.as_str() == product && line.size.liters == liters)
        .map(|line| line.key())
        .ok_or_else(|| CliError::InvalidArgument(format!("no {liters} {product} in the cart")))
}

#[allow(clippy::print_stdout)]
fn show(state: &AppState) {
    if state.cart.is_empty() {
        println!("Cart is empty");
        return;
    }
    for line in state.cart.lines() {
        println!(
            "{} x {} {} = {}",
            line.quantity,
            line.name,
            line.size,
            line.subtotal()
        );
    }
    println!("Total: {} ({} items)", state.cart.total(), state.cart.item_count());
}
