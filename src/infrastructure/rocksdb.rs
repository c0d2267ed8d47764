use super::journal::{OrderJournal, OrderRecord};
use crate::domain::order::{EntityId, Order, OrderId, OrderStatus};
use crate::domain::ports::OrderStore;
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing orders.
pub const CF_ORDERS: &str = "orders";
/// Column Family for storing each order's journal.
pub const CF_JOURNALS: &str = "journals";

fn internal(message: String) -> GatewayError {
    GatewayError::InternalError(Box::new(std::io::Error::other(message)))
}

/// A persistent order store using RocksDB.
///
/// Orders and their journals live in separate Column Families and are written
/// together in one batch. Mutations run under a single writer lock, so the
/// read-modify-write of one operation never interleaves with another.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBOrderStore {
    db: Arc<DB>,
    writer: Arc<Mutex<()>>,
}

impl RocksDBOrderStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families ("orders" and "journals") exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_orders = ColumnFamilyDescriptor::new(CF_ORDERS, Options::default());
        let cf_journals = ColumnFamilyDescriptor::new(CF_JOURNALS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_orders, cf_journals])?;

        Ok(Self {
            db: Arc::new(db),
            writer: Arc::new(Mutex::new(())),
        })
    }

    /// Seeds an order. An existing journal for the same id is kept.
    pub async fn insert(&self, order: Order) -> Result<()> {
        let _guard = self.writer.lock().await;
        let journal = self.load_journal(order.id)?;
        self.write(&OrderRecord { order, journal })
    }

    /// Journal of side effects applied to an order; empty for unknown orders.
    pub async fn journal(&self, order_id: OrderId) -> Result<OrderJournal> {
        self.load_journal(order_id)
    }

    fn load_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let cf = self
            .db
            .cf_handle(CF_ORDERS)
            .ok_or_else(|| internal("Orders column family not found".to_string()))?;

        match self.db.get_cf(&cf, order_id.value().to_be_bytes())? {
            Some(bytes) => {
                let order = serde_json::from_slice(&bytes)
                    .map_err(|e| internal(format!("Failed to deserialize order: {}", e)))?;
                Ok(Some(order))
            }
            None => Ok(None),
        }
    }

    fn load_journal(&self, order_id: OrderId) -> Result<OrderJournal> {
        let cf = self
            .db
            .cf_handle(CF_JOURNALS)
            .ok_or_else(|| internal("Journals column family not found".to_string()))?;

        match self.db.get_cf(&cf, order_id.value().to_be_bytes())? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| internal(format!("Failed to deserialize journal: {}", e))),
            None => Ok(OrderJournal::default()),
        }
    }

    fn write(&self, record: &OrderRecord) -> Result<()> {
        let orders = self
            .db
            .cf_handle(CF_ORDERS)
            .ok_or_else(|| internal("Orders column family not found".to_string()))?;
        let journals = self
            .db
            .cf_handle(CF_JOURNALS)
            .ok_or_else(|| internal("Journals column family not found".to_string()))?;

        let key = record.order.id.value().to_be_bytes();
        let mut batch = WriteBatch::default();
        batch.put_cf(&orders, key, serde_json::to_vec(&record.order)?);
        batch.put_cf(&journals, key, serde_json::to_vec(&record.journal)?);
        self.db.write(batch)?;
        Ok(())
    }

    async fn with_record<F>(&self, order_id: OrderId, apply: F) -> Result<()>
    where
        F: FnOnce(&mut OrderRecord) + Send,
    {
        let _guard = self.writer.lock().await;
        let order = self.load_order(order_id)?.ok_or_else(|| {
            GatewayError::ValidationError(format!("Order {} not found in store", order_id))
        })?;
        let mut record = OrderRecord {
            order,
            journal: self.load_journal(order_id)?,
        };
        apply(&mut record);
        self.write(&record)
    }
}

#[async_trait]
impl OrderStore for RocksDBOrderStore {
    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        self.load_order(order_id)
    }

    async fn transaction_ids(&self, order_id: OrderId) -> Result<Vec<EntityId>> {
        Ok(self
            .load_order(order_id)?
            .map(|order| order.transaction_ids)
            .unwrap_or_default())
    }

    async fn add_transaction_id(&self, order_id: OrderId, id: EntityId) -> Result<()> {
        self.with_record(order_id, |record| record.add_transaction_id(id))
            .await
    }

    async fn payment_method(&self, order_id: OrderId) -> Result<Option<String>> {
        Ok(self
            .load_order(order_id)?
            .and_then(|order| order.payment_method))
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
