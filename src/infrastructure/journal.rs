use crate::domain::order::{EntityId, Order, OrderStatus};
use serde::{Deserialize, Serialize};

/// Host-side record of what happened to an order, kept by the bundled stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderJournal {
    pub notes: Vec<String>,
    /// `(from, to)` pairs in the order they were applied.
    pub status_changes: Vec<(OrderStatus, OrderStatus)>,
    pub transaction_id_updates: usize,
    pub payment_completions: usize,
    pub stock_reductions: usize,
    pub carts_emptied: usize,
    pub coupon_usage_delta: i64,
}

impl OrderJournal {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// An order together with its journal; every store mutation goes through here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order: Order,
    pub journal: OrderJournal,
}

impl OrderRecord {
    pub fn new(order: Order) -> Self {
        Self {
            order,
            journal: OrderJournal::default(),
        }
    }

    pub fn add_transaction_id(&mut self, id: EntityId) {
        self.order.transaction_ids.push(id);
        self.journal.transaction_id_updates += 1;
    }

    pub fn update_status(&mut self, status: OrderStatus, note: &str) {
        self.set_status(status);
        if !note.is_empty() {
            self.add_note(note);
        }
    }

    pub fn add_note(&mut self, note: &str) {
        self.journal.notes.push(note.to_string());
    }

    pub fn payment_complete(&mut self) {
        self.set_status(OrderStatus::Processing);
        self.journal.payment_completions += 1;
    }

    pub fn reduce_stock(&mut self) {
        self.journal.stock_reductions += 1;
    }

    pub fn empty_cart(&mut self) {
        self.journal.carts_emptied += 1;
    }

    pub fn increase_coupon_usage(&mut self) {
        self.journal.coupon_usage_delta += self.order.coupons.len() as i64;
    }

    pub fn decrease_coupon_usage(&mut self) {
        self.journal.coupon_usage_delta -= self.order.coupons.len() as i64;
    }

    fn set_status(&mut self, status: OrderStatus) {
        let from = self.order.status;
        if from != status {
            self.order.status = status;
            self.journal.status_changes.push((from, status));
        }
    }
}
