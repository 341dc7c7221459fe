//! Subscription commands.
//!
//! ```bash
//! torodo subscriptions add --customer <id> --product milk --liters 1 --quantity 2 --frequency weekly --warehouse A
//! torodo subscriptions list --active
//! torodo subscriptions cancel <id>
//! ```

use clap::{Args, Subcommand};

use torodo_core::{CustomerId, DeliveryFrequency, Liters, ProductId, SubscriptionId, WarehouseId};
use torodo_storefront::error::AppError;
use torodo_storefront::state::AppState;
use torodo_storefront::subscriptions::{NewSubscription, Subscription, SubscriptionUpdate};

use super::CliError;

#[derive(Subcommand)]
pub enum SubscriptionAction {
    /// List subscriptions
    List {
        /// Only this customer's subscriptions
        #[arg(short, long)]
        customer: Option<String>,
        /// Only subscriptions to this product
        #[arg(short, long)]
        product: Option<String>,
        /// Hide cancelled subscriptions
        #[arg(short, long)]
        active: bool,
    },
    /// Create a subscription; the first delivery is one period from now
    Add(AddArgs),
    /// Change quantity, frequency or warehouse
    Update {
        /// Subscription ID
        id: String,
        #[arg(long)]
        quantity: Option<u32>,
        #[arg(long)]
        frequency: Option<DeliveryFrequency>,
        #[arg(long)]
        warehouse: Option<String>,
    },
    /// Cancel a subscription (kept in history as inactive)
    Cancel {
        /// Subscription ID
        id: String,
    },
}

#[derive(Args)]
pub struct AddArgs {
    #[arg(short, long)]
    customer: String,
    #[arg(short, long)]
    product: String,
    /// Size in liters
    #[arg(short, long)]
    liters: String,
    #[arg(short, long, default_value_t = 1)]
    quantity: u32,
    /// daily, weekly or monthly
    #[arg(short, long, default_value = "weekly")]
    frequency: DeliveryFrequency,
    /// Warehouse ID delivering the order
    #[arg(short, long)]
    warehouse: String,
}

#[allow(clippy::print_stdout)]
pub fn run(state: &mut AppState, action: SubscriptionAction) -> Result<(), CliError> {
    match action {
        SubscriptionAction::List {
            customer,
            product,
            active,
        } => {
            let customer = customer.map(CustomerId::new);
            let product = product.map(ProductId::new);
            let selected: Vec<&Subscription> = state
                .subscriptions
                .all()
                .iter()
                .filter(|s| customer.as_ref().is_none_or(|c| &s.customer_id == c))
                .filter(|s| product.as_ref().is_none_or(|p| &s.product_id == p))
                .filter(|s| !active || s.active)
                .collect();
            for sub in &selected {
                print_row(sub);
            }
            println!("{} subscription(s)", selected.len());
        }
        SubscriptionAction::Add(args) => {
            let product = ProductId::new(args.product);
            let liters =
                Liters::parse(&args.liters).map_err(|e| CliError::InvalidArgument(e.to_string()))?;
            let size = state
                .catalog()
                .size(&product, liters)
                .ok_or_else(|| AppError::not_found("size", format!("{product} {liters}")))?;
            let customer = CustomerId::new(args.customer);
            if state.customers.get(&customer).is_none() {
                return Err(AppError::not_found("customer", &customer).into());
            }
            let warehouse = WarehouseId::new(args.warehouse);
            if state.catalog().warehouse(&warehouse).is_none() {
                return Err(AppError::not_found("warehouse", &warehouse).into());
            }

            let sub = state.subscriptions.add(NewSubscription {
                product_id: product,
                size,
                quantity: args.quantity,
                frequency: args.frequency,
                customer_id: customer,
                warehouse_id: warehouse,
            })?;
            print_row(&sub);
        }
        SubscriptionAction::Update {
            id,
            quantity,
            frequency,
            warehouse,
        } => {
            let sub = state.subscriptions.update(
                &SubscriptionId::new(id),
                SubscriptionUpdate {
                    quantity,
                    frequency,
                    warehouse_id: warehouse.map(WarehouseId::new),
                    ..SubscriptionUpdate::default()
                },
            )?;
            print_row(&sub);
        }
        SubscriptionAction::Cancel { id } => {
            let id = SubscriptionId::new(id);
            state.subscriptions.cancel(&id)?;
            println!("Subscription {id} cancelled");
        }
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_row(sub: &Subscription) {
    println!(
        "{}  customer {}  {} x {} {}  {}  next {}  from {}{}",
        sub.id,
        sub.customer_id,
        sub.quantity,
        sub.product_id,
        sub.size,
        sub.frequency,
        sub.next_delivery_at.format("%Y-%m-%d"),
        sub.warehouse_id,
        if sub.active { "" } else { "  (cancelled)" }
    );
}
