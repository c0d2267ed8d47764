use super::journal::{OrderJournal, OrderRecord};
use crate::domain::order::{EntityId, Order, OrderId, OrderStatus};
use crate::domain::ports::{OrderStore, SettingsProvider};
use crate::domain::settings::SettingKey;
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use tokio::sync::RwLock;

/// A thread-safe in-memory order store.
///
/// Uses `Arc<RwLock<HashMap<OrderId, OrderRecord>>>`; every mutation holds the
/// write lock, which serializes concurrent operations on the same order.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, OrderRecord>>>,
}

impl InMemoryOrderStore {
    /// Creates a new, empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an order, replacing any previous record with the same id.
    pub async fn insert(&self, order: Order) {
        let mut orders = self.orders.write().await;
        orders.insert(order.id, OrderRecord::new(order));
    }

    /// Journal of side effects applied to an order; empty for unknown orders.
    pub async fn journal(&self, order_id: OrderId) -> OrderJournal {
        let orders = self.orders.read().await;
        orders
            .get(&order_id)
            .map(|record| record.journal.clone())
            .unwrap_or_default()
    }

    async fn with_record<F>(&self, order_id: OrderId, apply: F) -> Result<()>
    where
        F: FnOnce(&mut OrderRecord) + Send,
    {
        let mut orders = self.orders.write().await;
        let record = orders.get_mut(&order_id).ok_or_else(|| {
            GatewayError::ValidationError(format!("Order {} not found in store", order_id))
        })?;
        apply(record);
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&order_id).map(|record| record.order.clone()))
    }

    async fn transaction_ids(&self, order_id: OrderId) -> Result<Vec<EntityId>> {
        let orders = self.orders.read().await;
        Ok(orders
            .get(&order_id)
            .map(|record| record.order.transaction_ids.clone())
            .unwrap_or_default())
    }

    async fn add_transaction_id(&self, order_id: OrderId, id: EntityId) -> Result<()> {
        self.with_record(order_id, |record| record.add_transaction_id(id))
            .await
    }

    async fn payment_method(&self, order_id: OrderId) -> Result<Option<String>> {
        let orders = self.orders.read().await;
        Ok(orders
            .get(&order_id)
            .and_then(|record| record.order.payment_method.clone()))
    }

    async fn update_status(&self, order_id: OrderId, status: OrderStatus, note: &str) -> Result<()> {
        self.with_record(order_id, |record| record.update_status(status, note))
            .await
    }

    async fn add_note(&self, order_id: OrderId, note: &str) -> Result<()> {
        self.with_record(order_id, |record| record.add_note(note)).await
    }

    async fn payment_complete(&self, order_id: OrderId) -> Result<()> {
        self.with_record(order_id, OrderRecord::payment_complete).await
    }

    async fn reduce_stock(&self, order_id: OrderId) -> Result<()> {
        self.with_record(order_id, OrderRecord::reduce_stock).await
    }

    async fn empty_cart(&self, order_id: OrderId) -> Result<()> {
        self.with_record(order_id, OrderRecord::empty_cart).await
    }

    async fn increase_coupon_usage(&self, order_id: OrderId) -> Result<()> {
        self.with_record(order_id, OrderRecord::increase_coupon_usage)
            .await
    }

    async fn decrease_coupon_usage(&self, order_id: OrderId) -> Result<()> {
        self.with_record(order_id, OrderRecord::decrease_coupon_usage)
            .await
    }
}

/// Settings held in memory, for tests and embedding hosts.
///
/// Values can be changed at runtime; each gateway call sees the values
/// current at its start.
#[derive(Default, Clone)]
pub struct StaticSettings {
    values: Arc<std::sync::RwLock<HashMap<SettingKey, String>>>,
}

impl StaticSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: SettingKey, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&self, key: SettingKey, value: impl Into<String>) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value.into());
    }
}

impl SettingsProvider for StaticSettings {
    fn get(&self, key: SettingKey) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }
}
