//! Catalog listing.
//!
//! ```bash
//! torodo products
//! ```

use torodo_storefront::state::AppState;

/// Print every product with its sizes, then the warehouses.
#[allow(clippy::print_stdout)]
pub fn list(state: &AppState) {
    let catalog = state.catalog();

    println!("Products:");
    for product in catalog.products() {
        println!("  {} - {}", product.id, product.name);
        for size in &product.sizes {
            println!("      {size}");
        }
    }

    println!("Warehouses:");
    for warehouse in catalog.warehouses() {
        println!("  {} - {} ({})", warehouse.id, warehouse.name, warehouse.location);
    }
}
