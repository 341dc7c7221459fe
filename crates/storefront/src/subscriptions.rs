//! Recurring delivery subscriptions.
//!
//! Cancelling a subscription only marks it inactive; records are never
//! deleted, so delivery history stays attributable.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use torodo_core::{CustomerId, DeliveryFrequency, ProductId, SubscriptionId, WarehouseId};
use tracing::info;

use crate::catalog::SizeVariant;
use crate::clock::Clock;
use crate::container::{Entity, PersistPolicy, StateContainer};
use crate::error::{AppError, Result};
use crate::store::{DurableStore, StorageKey, StoreError};

/// A recurring delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: SubscriptionId,
    pub product_id: ProductId,
    pub size: SizeVariant,
    pub quantity: u32,
    pub frequency: DeliveryFrequency,
    #[serde(rename = "nextDelivery")]
    pub next_delivery_at: DateTime<Utc>,
    pub customer_id: CustomerId,
    pub warehouse_id: WarehouseId,
    pub active: bool,
}

/// Fields supplied when creating a subscription.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub product_id: ProductId,
    pub size: SizeVariant,
    pub quantity: u32,
    pub frequency: DeliveryFrequency,
    pub customer_id: CustomerId,
    pub warehouse_id: WarehouseId,
}

/// A partial update; `None` leaves a field as it is.
///
/// Changing the frequency does not move `next_delivery_at`; set it
/// explicitly if the schedule should change.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionUpdate {
    pub size: Option<SizeVariant>,
    pub quantity: Option<u32>,
    pub frequency: Option<DeliveryFrequency>,
    pub next_delivery_at: Option<DateTime<Utc>>,
    pub warehouse_id: Option<WarehouseId>,
    pub active: Option<bool>,
}

/// The persisted subscription list, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionList(pub Vec<Subscription>);

impl Entity for SubscriptionList {
    const KEY: StorageKey = StorageKey::Subscriptions;
}

impl SubscriptionList {
    fn find_mut(&mut self, id: &SubscriptionId) -> Result<&mut Subscription> {
        self.0
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| AppError::not_found("subscription", id))
    }
}

fn positive_quantity(quantity: u32) -> Result<u32> {
    if quantity < 1 {
        return Err(AppError::validation("quantity must be at least 1"));
    }
    Ok(quantity)
}

/// The subscription container.
#[derive(Debug)]
pub struct Subscriptions {
    state: StateContainer<SubscriptionList>,
    clock: Arc<dyn Clock>,
}

impl Subscriptions {
    /// Open the container, loading any stored subscriptions.
    pub async fn open(store: Arc<dyn DurableStore>, policy: PersistPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: StateContainer::open(store, policy).await,
            clock,
        }
    }

    /// Create an active subscription. The first delivery is one period
    /// after now.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if `quantity` is zero.
    pub fn add(&mut self, new: NewSubscription) -> Result<Subscription> {
        let subscription = Subscription {
            id: SubscriptionId::generate(),
            product_id: new.product_id,
            size: new.size,
            quantity: positive_quantity(new.quantity)?,
            frequency: new.frequency,
            next_delivery_at: new.frequency.next_delivery_after(self.clock.now()),
            customer_id: new.customer_id,
            warehouse_id: new.warehouse_id,
            active: true,
        };

        let added = subscription.clone();
        self.state.update(move |list| {
            list.0.push(subscription);
            Ok(())
        })?;
        info!(
            subscription_id = %added.id,
            customer_id = %added.customer_id,
            frequency = %added.frequency,
            "Subscription added"
        );
        Ok(added)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown id, or
    /// `AppError::Validation` for a zero quantity.
    pub fn update(&mut self, id: &SubscriptionId, update: SubscriptionUpdate) -> Result<Subscription> {
        let quantity = update.quantity.map(positive_quantity).transpose()?;
        self.state.update(|list| {
            let sub = list.find_mut(id)?;
            if let Some(size) = update.size {
                sub.size = size;
            }
            if let Some(quantity) = quantity {
                sub.quantity = quantity;
            }
            if let Some(frequency) = update.frequency {
                sub.frequency = frequency;
            }
            if let Some(at) = update.next_delivery_at {
                sub.next_delivery_at = at;
            }
            if let Some(warehouse) = update.warehouse_id {
                sub.warehouse_id = warehouse;
            }
            if let Some(active) = update.active {
                sub.active = active;
            }
            Ok(sub.clone())
        })
    }

    /// Mark a subscription inactive. The record is kept.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown id.
    pub fn cancel(&mut self, id: &SubscriptionId) -> Result<()> {
        self.state.update(|list| {
            list.find_mut(id)?.active = false;
            Ok(())
        })?;
        info!(subscription_id = %id, "Subscription cancelled");
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &SubscriptionId) -> Option<&Subscription> {
        self.all().iter().find(|s| &s.id == id)
    }

    #[must_use]
    pub fn all(&self) -> &[Subscription] {
        &self.state.get().0
    }

    /// Every subscription of a customer, cancelled ones included.
    #[must_use]
    pub fn for_customer(&self, customer: &CustomerId) -> Vec<&Subscription> {
        self.all()
            .iter()
            .filter(|s| &s.customer_id == customer)
            .collect()
    }

    /// Every subscription to a product, cancelled ones included.
    #[must_use]
    pub fn for_product(&self, product: &ProductId) -> Vec<&Subscription> {
        self.all()
            .iter()
            .filter(|s| &s.product_id == product)
            .collect()
    }

    #[must_use]
    pub fn active(&self) -> Vec<&Subscription> {
        self.all().iter().filter(|s| s.active).collect()
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
