//! Stock commands.
//!
//! ```bash
//! torodo stock show
//! torodo stock adjust A 40
//! torodo stock adjust B -2.5
//! torodo stock transfer A B 12,5
//! ```

use clap::Subcommand;
use rust_decimal::Decimal;

use torodo_core::WarehouseId;
use torodo_storefront::state::AppState;

use super::CliError;

#[derive(Subcommand)]
pub enum StockAction {
    /// Show the level of every warehouse
    Show,
    /// Add (or, with a negative value, remove) liters; levels stop at 0
    Adjust {
        /// Warehouse ID
        warehouse: String,
        /// Liters to add; negative to remove
        #[arg(allow_hyphen_values = true)]
        delta: String,
    },
    /// Move liters from one warehouse to another
    Transfer {
        /// Source warehouse ID
        from: String,
        /// Destination warehouse ID
        to: String,
        /// Liters to move (e.g. `12.5` or `12,5`)
        amount: String,
    },
}

#[allow(clippy::print_stdout)]
pub fn run(state: &mut AppState, action: StockAction) -> Result<(), CliError> {
    match action {
        StockAction::Show => {
            for (warehouse, level) in &state.stock.levels().0 {
                println!("{warehouse}: {level}");
            }
            println!("Total: {}", state.stock.total());
        }
        StockAction::Adjust { warehouse, delta } => {
            let delta = parse_delta(&delta)?;
            let level = state.stock.adjust(&WarehouseId::new(warehouse.as_str()), delta)?;
            println!("{warehouse}: {level}");
        }
        StockAction::Transfer { from, to, amount } => {
            let from = WarehouseId::new(from);
            let to = WarehouseId::new(to);
            state.stock.transfer_input(&from, &to, &amount)?;
            println!("{from}: {}", state.stock.level(&from));
            println!("{to}: {}", state.stock.level(&to));
        }
    }
    Ok(())
}

fn parse_delta(input: &str) -> Result<Decimal, CliError> {
    input
        .trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| CliError::InvalidArgument(format!("'{input}' is not a number")))
}
