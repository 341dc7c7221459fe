//! Sales history commands.
//!
//! ```bash
//! torodo sales list --limit 10
//! torodo sales summary
//! ```

use clap::Subcommand;

use torodo_storefront::state::AppState;

#[derive(Subcommand)]
pub enum SalesAction {
    /// List sales, newest first
    List {
        /// Show at most this many sales
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Count, revenue and liters sold per product
    Summary,
}

#[allow(clippy::print_stdout)]
pub fn run(state: &AppState, action: SalesAction) {
    match action {
        SalesAction::List { limit } => {
            let sales = state.sales.all();
            for sale in sales.iter().take(limit.unwrap_or(sales.len())) {
                println!(
                    "{}  {}  {}  {}",
                    sale.date.format("%Y-%m-%d %H:%M"),
                    sale.id,
                    sale.total,
                    sale.liters()
                );
                for line in &sale.lines {
                    println!("    {} x {} {}", line.quantity, line.name, line.size);
                }
            }
        }
        SalesAction::Summary => {
            let summary = state.sales.summary();
            println!("Sales:   {}", summary.sales);
            println!("Revenue: {}", summary.revenue);
            for (product, liters) in &summary.liters_by_product {
                println!("  {product}: {liters}");
            }
        }
    }
}
