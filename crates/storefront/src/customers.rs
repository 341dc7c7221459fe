//! Customer registry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use torodo_core::{Amount, CustomerId, Email, Phone, WarehouseId};
use tracing::info;

use crate::clock::Clock;
use crate::container::{Entity, PersistPolicy, StateContainer};
use crate::error::{AppError, Result};
use crate::store::{DurableStore, StorageKey, StoreError};

/// A customer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub phone: Phone,
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "lastOrder", default, skip_serializing_if = "Option::is_none")]
    pub last_order_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_orders: u32,
    #[serde(default)]
    pub total_spent: Amount,
    #[serde(
        rename = "preferredWarehouseId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub preferred_warehouse: Option<WarehouseId>,
}

impl Customer {
    /// Case-insensitive substring match over name, phone and email.
    ///
    /// The phone number matches on its digits as well, so `"77 123"` finds
    /// `+221771234567`.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let phone_like = needle
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '.' | '+'));
        let digits: String = needle.chars().filter(char::is_ascii_digit).collect();

        self.name.to_lowercase().contains(&needle)
            || self.phone.as_str().contains(&needle)
            || (phone_like && !digits.is_empty() && self.phone.digits().contains(&digits))
            || self
                .email
                .as_ref()
                .is_some_and(|email| email.contains_lowercase(&needle))
    }
}

/// Fields supplied when registering a customer. Raw text, validated on add.
#[derive(Debug, Clone, Default)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub email: Option<String>,
    pub preferred_warehouse: Option<WarehouseId>,
}

/// A partial update; `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// `Some(None)` or `Some(Some(""))` removes the email.
    pub email: Option<Option<String>>,
    /// `Some(None)` removes the preference.
    pub preferred_warehouse: Option<Option<WarehouseId>>,
}

fn required_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name is required"));
    }
    Ok(name.to_string())
}

fn optional_email(email: Option<&str>) -> Result<Option<Email>> {
    match email.map(str::trim) {
        None | Some("") => Ok(None),
        Some(email) => Ok(Some(Email::parse(email)?)),
    }
}

/// The persisted customer list, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerList(pub Vec<Customer>);

impl Entity for CustomerList {
    const KEY: StorageKey = StorageKey::Customers;
}

impl CustomerList {
    fn find_mut(&mut self, id: &CustomerId) -> Result<&mut Customer> {
        self.0
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| AppError::not_found("customer", id))
    }
}

/// The customer container.
#[derive(Debug)]
pub struct Customers {
    state: StateContainer<CustomerList>,
    clock: Arc<dyn Clock>,
}

impl Customers {
    /// Open the registry, loading any stored customers.
    pub async fn open(store: Arc<dyn DurableStore>, policy: PersistPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: StateContainer::open(store, policy).await,
            clock,
        }
    }

    /// Register a customer with zeroed order statistics.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the name is blank, or the phone or
    /// email is malformed.
    pub fn add(&mut self, new: NewCustomer) -> Result<Customer> {
        let customer = Customer {
            id: CustomerId::generate(),
            name: required_name(&new.name)?,
            phone: Phone::parse(&new.phone)?,
            address: new.address.trim().to_string(),
            email: optional_email(new.email.as_deref())?,
            created_at: self.clock.now(),
            last_order_at: None,
            total_orders: 0,
            total_spent: Amount::ZERO,
            preferred_warehouse: new.preferred_warehouse,
        };

        let added = customer.clone();
        self.state.update(move |list| {
            list.0.push(customer);
            Ok(())
        })?;
        info!(customer_id = %added.id, "Customer added");
        Ok(added)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown id, or
    /// `AppError::Validation` if a supplied field is malformed.
    pub fn update(&mut self, id: &CustomerId, update: CustomerUpdate) -> Result<Customer> {
        let name = update.name.as_deref().map(required_name).transpose()?;
        let phone = update.phone.as_deref().map(Phone::parse).transpose()?;
        let email = update
            .email
            .map(|email| optional_email(email.as_deref()))
            .transpose()?;

        self.state.update(|list| {
            let customer = list.find_mut(id)?;
            if let Some(name) = name {
                customer.name = name;
            }
            if let Some(phone) = phone {
                customer.phone = phone;
            }
            if let Some(address) = update.address {
                customer.address = address.trim().to_string();
            }
            if let Some(email) = email {
                customer.email = email;
            }
            if let Some(warehouse) = update.preferred_warehouse {
                customer.preferred_warehouse = warehouse;
            }
            Ok(customer.clone())
        })
    }

    /// Count one more order of `amount` and stamp the order time.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown id, or
    /// `AppError::Validation` for a negative amount or a total that would
    /// overflow.
    pub fn record_order(&mut self, id: &CustomerId, amount: Amount) -> Result<()> {
        if amount.is_negative() {
            return Err(AppError::validation("order amount cannot be negative"));
        }
        let now = self.clock.now();
        self.state.update(|list| {
            let customer = list.find_mut(id)?;
            customer.total_orders = customer.total_orders.saturating_add(1);
            customer.total_spent = customer
                .total_spent
                .checked_add(amount)
                .ok_or_else(|| AppError::validation("customer total spent is out of range"))?;
            customer.last_order_at = Some(now);
            Ok(())
        })
    }

    #[must_use]
    pub fn get(&self, id: &CustomerId) -> Option<&Customer> {
        self.all().iter().find(|c| &c.id == id)
    }

    #[must_use]
    pub fn all(&self) -> &[Customer] {
        &self.state.get().0
    }

    /// Customers whose name, phone or email contains `query`, ignoring case.
    /// A blank query returns everyone.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&Customer> {
        self.all().iter().filter(|c| c.matches(query)).collect()
    }

    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    /// Wait for pending saves.
    ///
    /// # Errors
    ///
    /// Returns the store error if the latest save failed.
    pub async fn flush(&self) -> std::result::Result<(), StoreError> {
        self.state.flush().await
    }

    pub(crate) fn reset(&mut self) {
        self.state.reset();
    }
}
