//! Customer registry commands.
//!
//! ```bash
//! torodo customers add --name "Awa Diop" --phone "77 123 45 67" --address Dakar
//! torodo customers list --query awa
//! torodo customers show <id>
//! torodo customers update <id> --warehouse B
//! ```

use clap::{Args, Subcommand};

use torodo_core::{CustomerId, WarehouseId};
use torodo_storefront::customers::{Customer, CustomerUpdate, NewCustomer};
use torodo_storefront::error::AppError;
use torodo_storefront::state::AppState;

use super::CliError;

#[derive(Subcommand)]
pub enum CustomerAction {
    /// List customers, optionally filtered
    List {
        /// Case-insensitive match on name, phone or email
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Show one customer with their subscriptions
    Show {
        /// Customer ID
        id: String,
    },
    /// Register a customer
    Add(AddArgs),
    /// Change customer fields
    Update {
        /// Customer ID
        id: String,
        #[command(flatten)]
        fields: UpdateArgs,
    },
}

#[derive(Args)]
pub struct AddArgs {
    #[arg(short, long)]
    name: String,
    #[arg(short, long)]
    phone: String,
    #[arg(short, long, default_value = "")]
    address: String,
    #[arg(short, long)]
    email: Option<String>,
    /// Preferred warehouse ID
    #[arg(short, long)]
    warehouse: Option<String>,
}

#[derive(Args)]
pub struct UpdateArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    address: Option<String>,
    /// New email; an empty value removes it
    #[arg(long)]
    email: Option<String>,
    /// Preferred warehouse ID; an empty value removes it
    #[arg(long)]
    warehouse: Option<String>,
}

fn optional_warehouse(id: &str) -> Option<WarehouseId> {
    let id = id.trim();
    (!id.is_empty()).then(|| WarehouseId::new(id))
}

#[allow(clippy::print_stdout)]
pub fn run(state: &mut AppState, action: CustomerAction) -> Result<(), CliError> {
    match action {
        CustomerAction::List { query } => {
            let found = state.customers.search(query.as_deref().unwrap_or_default());
            for customer in &found {
                print_row(customer);
            }
            println!("{} customer(s)", found.len());
        }
        CustomerAction::Show { id } => {
            let id = CustomerId::new(id);
            let customer = state
                .customers
                .get(&id)
                .ok_or_else(|| AppError::not_found("customer", &id))?;
            print_details(customer);
            for sub in state.subscriptions.for_customer(&id) {
                println!(
                    "  subscription {}: {} x {} {} {} from {}{}",
                    sub.id,
                    sub.quantity,
                    sub.product_id,
                    sub.size,
                    sub.frequency,
                    sub.warehouse_id,
                    if sub.active { "" } else { " (cancelled)" }
                );
            }
        }
        CustomerAction::Add(args) => {
            let customer = state.customers.add(NewCustomer {
                name: args.name,
                phone: args.phone,
                address: args.address,
                email: args.email,
                preferred_warehouse: args.warehouse.as_deref().and_then(optional_warehouse),
            })?;
            println!("Customer {} added", customer.id);
        }
        CustomerAction::Update { id, fields } => {
            let update = CustomerUpdate {
                name: fields.name,
                phone: fields.phone,
                address: fields.address,
                email: fields.email.map(Some),
                preferred_warehouse: fields.warehouse.as_deref().map(optional_warehouse),
            };
            let customer = state.customers.update(&CustomerId::new(id), update)?;
            print_details(&customer);
        }
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_row(customer: &Customer) {
    println!(
        "{}  {}  {}  {} order(s), {}",
        customer.id, customer.name, customer.phone, customer.total_orders, customer.total_spent
    );
}

#[allow(clippy::print_stdout)]
fn print_details(customer: &Customer) {
    println!("{} ({})", customer.name, customer.id);
    println!("  phone:    {}", customer.phone);
    if !customer.address.is_empty() {
        println!("  address:  {}", customer.address);
    }
    if let Some(email) = &customer.email {
        println!("  email:    {email}");
    }
    if let Some(warehouse) = &customer.preferred_warehouse {
        println!("  warehouse: {warehouse}");
    }
    println!("  since:    {}", customer.created_at.format("%Y-%m-%d"));
    println!(
        "  orders:   {} for {}",
        customer.total_orders, customer.total_spent
    );
    if let Some(at) = customer.last_order_at {
        println!("  last order: {}", at.format("%Y-%m-%d %H:%M"));
    }
}
