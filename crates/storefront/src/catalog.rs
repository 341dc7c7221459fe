//! Built-in product and warehouse catalog.
//!
//! The catalog is static reference data: it is compiled in, never persisted,
//! and shared by every container that needs to resolve a product or warehouse.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use torodo_core::{Amount, Liters, ProductId, WarehouseId};

/// A purchasable size of a product.
///
/// Persisted as `{"size": <liters>, "price": <CFA>}` to match stored data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SizeVariant {
    #[serde(rename = "size")]
    pub liters: Liters,
    #[serde(rename = "price")]
    pub unit_price: Amount,
}

impl SizeVariant {
    #[must_use]
    pub fn new(liters: i64, unit_price: i64) -> Self {
        Self {
            liters: Liters::whole(liters),
            unit_price: Amount::from_cfa(unit_price),
        }
    }
}

impl std::fmt::Display for SizeVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} @ {}", self.liters, self.unit_price)
    }
}

/// A product with its available sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub sizes: Vec<SizeVariant>,
}

/// A storage location holding stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: WarehouseId,
    pub name: String,
    pub location: String,
}

/// Products and warehouses known to the application.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
    warehouses: Vec<Warehouse>,
}

static BUILTIN: LazyLock<Catalog> = LazyLock::new(|| {
    let sizes = vec![SizeVariant::new(1, 1000), SizeVariant::new(10, 8000)];
    Catalog::new(
        vec![
            Product {
                id: ProductId::new("milk"),
                name: "Lait Frais".to_string(),
                description: "Lait frais de vache, riche en calcium. Idéal pour toute la famille."
                    .to_string(),
                sizes: sizes.clone(),
            },
            Product {
                id: ProductId::new("yoghurt"),
                name: "SOOW".to_string(),
                description: "SOOW nature crémeux fait à partir de lait frais. Riche en probiotiques."
                    .to_string(),
                sizes,
            },
        ],
        vec![
            Warehouse {
                id: WarehouseId::new("A"),
                name: "Warehouse A".to_string(),
                location: "Main Facility".to_string(),
            },
            Warehouse {
                id: WarehouseId::new("B"),
                name: "Warehouse B".to_string(),
                location: "Secondary Facility".to_string(),
            },
        ],
    )
});

impl Catalog {
    #[must_use]
    pub const fn new(products: Vec<Product>, warehouses: Vec<Warehouse>) -> Self {
        Self {
            products,
            warehouses,
        }
    }

    /// The catalog shipped with the application.
    #[must_use]
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    #[must_use]
    pub fn warehouses(&self) -> &[Warehouse] {
        &self.warehouses
    }

    #[must_use]
    pub fn product(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id)
    }

    /// Find the size of `product` holding `liters` per unit.
    #[must_use]
    pub fn size(&self, product: &ProductId, liters: Liters) -> Option<SizeVariant> {
        self.product(product)?
            .sizes
            .iter()
            .find(|s| s.liters == liters)
            .copied()
    }

    #[must_use]
    pub fn warehouse(&self, id: &WarehouseId) -> Option<&Warehouse> {
        self.warehouses.iter().find(|w| &w.id == id)
    }
}
