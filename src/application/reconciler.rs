use crate::domain::order::{Order, OrderId, OrderStatus};
use crate::domain::outcome::{OperationKind, Outcome};
use crate::domain::ports::{OrderStore, OrderStoreBox};
use crate::domain::settings::Settings;
use crate::error::Result;
use tracing::{debug, error, info};

/// Writes the single log entry for a failed operation.
pub fn record_failure(operation: OperationKind, order_id: Option<OrderId>, outcome: &Outcome) {
    let Some(failure) = outcome.failure() else {
        return;
    };
    error!(
        %operation,
        order_id = ?order_id.map(|id| id.value()),
        kind = %failure.kind,
        diagnostic = failure.diagnostic.as_deref().unwrap_or("-"),
        "{}",
        outcome.message()
    );
}

/// Maps operation outcomes onto order state, touching the order only through the store.
pub struct OrderReconciler {
    store: OrderStoreBox,
}

impl OrderReconciler {
    pub fn new(store: OrderStoreBox) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn OrderStore {
        self.store.as_ref()
    }

    /// Applies `outcome` to `order`.
    ///
    /// Failed outcomes are logged and leave the order untouched. Approved ones
    /// always append the new transaction id first, so later operations chain
    /// from it.
    pub async fn reconcile(
        &self,
        order: &Order,
        outcome: &Outcome,
        operation: OperationKind,
        settings: &Settings,
    ) -> Result<()> {
        if !outcome.is_ok() {
            record_failure(operation, Some(order.id), outcome);
            return Ok(());
        }
        let Some(entity_id) = outcome.entity_id().cloned() else {
            return Ok(());
        };
        if operation == OperationKind::CreatePaymentToken {
            debug!(order_id = %order.id, "payment tokens do not change order state");
            return Ok(());
        }

        // A charge is applied to its order at most once; ids chained after it stay latest.
        if operation.opens_charge()
            && self
                .store
                .transaction_ids(order.id)
                .await?
                .contains(&entity_id)
        {
            info!(%operation, order_id = %order.id, entity_id = %entity_id, "charge already applied to order");
            return Ok(());
        }

        let note = outcome.message();
        self.store.add_transaction_id(order.id, entity_id.clone()).await?;

        match operation {
            op if op.opens_charge() => {
                self.store
                    .update_status(order.id, settings.initial_order_status, note)
                    .await?;
                self.store.reduce_stock(order.id).await?;
                self.store.empty_cart(order.id).await?;
            }
            OperationKind::Capture => {
                self.store.add_note(order.id, note).await?;
                self.store.payment_complete(order.id).await?;
            }
            OperationKind::Void => {
                if settings.cancel_on_void {
                    self.store
                        .update_status(order.id, OrderStatus::Cancelled, note)
                        .await?;
                    self.store.decrease_coupon_usage(order.id).await?;
                } else {
                    self.store.add_note(order.id, note).await?;
                }
            }
            OperationKind::Refund => {
                self.store
                    .update_status(order.id, OrderStatus::Refunded, note)
                    .await?;
            }
            _ => {}
        }

        info!(%operation, order_id = %order.id, entity_id = %entity_id, "order reconciled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Currency;
    use crate::domain::order::EntityId;
    use crate::domain::outcome::ErrorKind;
    use crate::domain::settings::SettingKey;
    use crate::infrastructure::in_memory::{InMemoryOrderStore, StaticSettings};
    use rust_decimal_macros::dec;

    fn settings(void_status: &str) -> Settings {
        let provider = StaticSettings::new()
            .with(SettingKey::SecretKey, "sk_test_reconciler")
            .with(SettingKey::OrderStatus, "on-hold")
            .with(SettingKey::VoidStatus, void_status);
        Settings::resolve(&provider).unwrap()
    }

    async fn seeded() -> (InMemoryOrderStore, Order) {
        let store = InMemoryOrderStore::new();
        let mut order = Order::new(OrderId::new(9), Currency::new("USD").unwrap(), dec!(12.00));
        order.coupons.push("WELCOME".to_string());
        store.insert(order.clone()).await;
        (store, order)
    }

    #[tokio::test]
    async fn test_error_outcome_leaves_order_untouched() {
        let (store, order) = seeded().await;
        let reconciler = OrderReconciler::new(Box::new(store.clone()));
        let outcome = Outcome::error(ErrorKind::Transport, "Transaction was not voided", None);

        reconciler
            .reconcile(&order, &outcome, OperationKind::Void, &settings("yes"))
            .await
            .unwrap();

        let journal = store.journal(order.id).await;
        assert!(journal.is_empty());
        assert_eq!(store.get(order.id).await.unwrap().unwrap().status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_charge_sets_initial_status_and_side_effects() {
        let (store, order) = seeded().await;
        let reconciler = OrderReconciler::new(Box::new(store.clone()));
        let outcome = Outcome::ok("Charge Approved", EntityId::new("charge_1"));

        reconciler
            .reconcile(&order, &outcome, OperationKind::CreateCharge, &settings("yes"))
            .await
            .unwrap();

        let stored = store.get(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::OnHold);
        assert_eq!(stored.latest_transaction_id(), Some(&EntityId::new("charge_1")));

        let journal = store.journal(order.id).await;
        assert_eq!(journal.stock_reductions, 1);
        assert_eq!(journal.carts_emptied, 1);
        assert_eq!(journal.notes, vec!["Charge Approved".to_string()]);
    }

    #[tokio::test]
    async fn test_repeated_charge_is_applied_once() {
        let (store, order) = seeded().await;
        let reconciler = OrderReconciler::new(Box::new(store.clone()));
        let charge = Outcome::ok("Charge Approved", EntityId::new("charge_1"));
        let capture = Outcome::ok("Capture Charge Approved", EntityId::new("capture_1"));
        let settings = settings("yes");

        reconciler
            .reconcile(&order, &charge, OperationKind::VerifyChargePaymentToken, &settings)
            .await
            .unwrap();
        reconciler
            .reconcile(&order, &capture, OperationKind::Capture, &settings)
            .await
            .unwrap();
        reconciler
            .reconcile(&order, &charge, OperationKind::VerifyCharge, &settings)
            .await
            .unwrap();

        let stored = store.get(order.id).await.unwrap().unwrap();
        assert_eq!(
            stored.transaction_ids,
            vec![EntityId::new("charge_1"), EntityId::new("capture_1")]
        );
        assert_eq!(stored.status, OrderStatus::Processing);
        let journal = store.journal(order.id).await;
        assert_eq!(journal.stock_reductions, 1);
        assert_eq!(journal.carts_emptied, 1);
    }

    #[tokio::test]
    async fn test_void_with_cancel_decrements_coupons() {
        let (store, order) = seeded().await;
        let reconciler = OrderReconciler::new(Box::new(store.clone()));
        let outcome = Outcome::ok("Void Charge Approved", EntityId::new("void_1"));

        reconciler
            .reconcile(&order, &outcome, OperationKind::Void, &settings("yes"))
            .await
            .unwrap();

        let stored = store.get(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Cancelled);
        assert_eq!(store.journal(order.id).await.coupon_usage_delta, -1);
    }

    #[tokio::test]
    async fn test_refund_always_marks_refunded() {
        let (store, order) = seeded().await;
        let reconciler = OrderReconciler::new(Box::new(store.clone()));
        let outcome = Outcome::ok("Refund Charge Approved", EntityId::new("refund_1"));

        reconciler
            .reconcile(&order, &outcome, OperationKind::Refund, &settings("no"))
            .await
            .unwrap();

        let stored = store.get(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Refunded);
        assert_eq!(stored.latest_transaction_id(), Some(&EntityId::new("refund_1")));
    }
}
