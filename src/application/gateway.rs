use super::executor::{Approved, ChargeExecutor, OperationError};
use super::reconciler::{OrderReconciler, record_failure};
use crate::domain::money::Currency;
use crate::domain::order::{EntityId, Order, OrderId};
use crate::domain::outcome::{OperationKind, Outcome, Precondition};
use crate::domain::ports::{OrderStoreBox, ProcessorClientFactory, SettingsProviderBox};
use crate::domain::request_context::RequestContext;
use crate::domain::settings::Settings;
use crate::error::{GatewayError, Result};
use rust_decimal::Decimal;
use tracing::{debug, error};

/// Payment-method marker stored on orders paid through this gateway.
pub const PAYMENT_METHOD_CODE: &str = "checkout_non_pci";

type Prepared = std::result::Result<(Order, Settings), OperationError>;

/// Logs a store failure once before it propagates to the host.
fn record_store_failure(
    operation: OperationKind,
    order_id: OrderId,
    entity_id: Option<&EntityId>,
    error: &GatewayError,
) {
    error!(
        %operation,
        order_id = order_id.value(),
        entity_id = entity_id.map(EntityId::as_str).unwrap_or("-"),
        %error,
        "order store failed"
    );
}

fn into_outcome(result: std::result::Result<Approved, OperationError>) -> Outcome {
    match result {
        Ok(approved) => approved.into(),
        Err(error) => error.into(),
    }
}

/// The entry point the host calls for every payment lifecycle action.
///
/// Each call resolves the settings once, runs at most one processor operation
/// and applies the outcome to the order. Business failures come back as error
/// [`Outcome`]s; only store and I/O failures surface as `Err`.
pub struct Gateway {
    executor: ChargeExecutor,
    reconciler: OrderReconciler,
    settings: SettingsProviderBox,
}

impl Gateway {
    pub fn new(
        clients: ProcessorClientFactory,
        store: OrderStoreBox,
        settings: SettingsProviderBox,
    ) -> Self {
        Self {
            executor: ChargeExecutor::new(clients),
            reconciler: OrderReconciler::new(store),
            settings,
        }
    }

    fn resolve_settings(&self, operation: OperationKind) -> std::result::Result<Settings, OperationError> {
        Settings::resolve(self.settings.as_ref())
            .map_err(|e| OperationError::configuration(operation, &e))
    }

    fn reject(&self, order_id: Option<OrderId>, error: OperationError) -> Outcome {
        let operation = error.operation;
        let outcome = Outcome::from(error);
        record_failure(operation, order_id, &outcome);
        outcome
    }

    async fn load_order(
        &self,
        operation: OperationKind,
        order_id: OrderId,
    ) -> Result<std::result::Result<Order, OperationError>> {
        Ok(self
            .reconciler
            .store()
            .get(order_id)
            .await
            .inspect_err(|e| record_store_failure(operation, order_id, None, e))?
            .ok_or_else(|| OperationError::precondition(operation, Precondition::OrderNotFound(order_id))))
    }

    /// Loads the order and the settings snapshot, optionally enforcing the
    /// payment-method guard in between.
    async fn prepare(&self, operation: OperationKind, order_id: OrderId, guarded: bool) -> Result<Prepared> {
        let order = match self.load_order(operation, order_id).await? {
            Ok(order) => order,
            Err(error) => return Ok(Err(error)),
        };
        if guarded && order.payment_method.as_deref() != Some(PAYMENT_METHOD_CODE) {
            let found = order.payment_method.clone();
            return Ok(Err(OperationError::precondition(
                operation,
                Precondition::PaymentMethodMismatch { found },
            )));
        }
        Ok(self.resolve_settings(operation).map(|settings| (order, settings)))
    }

    async fn finish(
        &self,
        order: &Order,
        settings: &Settings,
        result: std::result::Result<Approved, OperationError>,
        operation: OperationKind,
    ) -> Result<Outcome> {
        let outcome = into_outcome(result);
        self.reconciler
            .reconcile(order, &outcome, operation, settings)
            .await
            .inspect_err(|e| record_store_failure(operation, order.id, outcome.entity_id(), e))?;
        Ok(outcome)
    }

    async fn is_own_order(&self, operation: OperationKind, order_id: OrderId) -> Result<bool> {
        let method = self
            .reconciler
            .store()
            .payment_method(order_id)
            .await
            .inspect_err(|e| record_store_failure(operation, order_id, None, e))?;
        Ok(method.as_deref() == Some(PAYMENT_METHOD_CODE))
    }

    /// Whether an order can be captured through this gateway.
    pub async fn can_capture(&self, order_id: OrderId) -> Result<bool> {
        self.is_own_order(OperationKind::Capture, order_id).await
    }

    /// Whether an order can be voided through this gateway.
    pub async fn can_void(&self, order_id: OrderId) -> Result<bool> {
        self.is_own_order(OperationKind::Void, order_id).await
    }

    pub async fn capture(&self, order_id: OrderId) -> Result<Outcome> {
        let operation = OperationKind::Capture;
        let (order, settings) = match self.prepare(operation, order_id, true).await? {
            Ok(prepared) => prepared,
            Err(error) => return Ok(self.reject(Some(order_id), error)),
        };
        let result = self.executor.capture(&settings, &order).await;
        self.finish(&order, &settings, result, operation).await
    }

    pub async fn void(&self, order_id: OrderId) -> Result<Outcome> {
        let operation = OperationKind::Void;
        let (order, settings) = match self.prepare(operation, order_id, true).await? {
            Ok(prepared) => prepared,
            Err(error) => return Ok(self.reject(Some(order_id), error)),
        };
        let result = self.executor.void(&settings, &order).await;
        self.finish(&order, &settings, result, operation).await
    }

    /// Refunds `amount`, or the order total when no (or a zero) amount is given.
    pub async fn refund(
        &self,
        order_id: OrderId,
        amount: Option<Decimal>,
        message: &str,
    ) -> Result<Outcome> {
        let operation = OperationKind::Refund;
        let (order, settings) = match self.prepare(operation, order_id, false).await? {
            Ok(prepared) => prepared,
            Err(error) => return Ok(self.reject(Some(order_id), error)),
        };
        let result = self.executor.refund(&settings, &order, amount, message).await;
        self.finish(&order, &settings, result, operation).await
    }

    /// Issues a payment token for a checkout session. No order is involved yet.
    pub async fn create_payment_token(
        &self,
        amount: Decimal,
        currency: &Currency,
        context: &RequestContext,
    ) -> Outcome {
        let operation = OperationKind::CreatePaymentToken;
        let settings = match self.resolve_settings(operation) {
            Ok(settings) => settings,
            Err(error) => return self.reject(None, error),
        };
        match self
            .executor
            .create_payment_token(&settings, amount, currency, context)
            .await
        {
            Ok(token) => Outcome::ok(
                format!(
                    "{} Approved (Transaction ID - {})",
                    operation.approval_label(),
                    token.token
                ),
                token.token,
            ),
            Err(error) => self.reject(None, error),
        }
    }

    pub async fn create_charge(
        &self,
        order_id: OrderId,
        card_token: &str,
        context: &RequestContext,
    ) -> Result<Outcome> {
        let operation = OperationKind::CreateCharge;
        let (order, settings) = match self.prepare(operation, order_id, false).await? {
            Ok(prepared) => prepared,
            Err(error) => return Ok(self.reject(Some(order_id), error)),
        };
        let result = self
            .executor
            .create_charge(&settings, &order, card_token, context)
            .await;
        self.finish(&order, &settings, result, operation).await
    }

    pub async fn verify_charge_payment_token(
        &self,
        order_id: OrderId,
        payment_token: &str,
    ) -> Result<Outcome> {
        let operation = OperationKind::VerifyChargePaymentToken;
        let (order, settings) = match self.prepare(operation, order_id, false).await? {
            Ok(prepared) => prepared,
            Err(error) => return Ok(self.reject(Some(order_id), error)),
        };
        let result = self
            .executor
            .verify_charge_payment_token(&settings, &order, payment_token)
            .await;
        self.finish(&order, &settings, result, operation).await
    }

    /// Verifies a payment token returned from a redirect and applies it to the
    /// order named by the processor's track id.
    pub async fn verify_charge(&self, payment_token: &str) -> Result<Outcome> {
        let operation = OperationKind::VerifyCharge;
        let settings = match self.resolve_settings(operation) {
            Ok(settings) => settings,
            Err(error) => return Ok(self.reject(None, error)),
        };
        let approved = match self.executor.verify_charge(&settings, payment_token).await {
            Ok(approved) => approved,
            Err(error) => return Ok(self.reject(None, error)),
        };

        let track_id = approved.track_id.clone().unwrap_or_default();
        let unknown = || {
            OperationError::precondition(operation, Precondition::UnknownTrackId(track_id.clone()))
        };
        let Ok(order_id) = track_id.parse::<OrderId>() else {
            return Ok(self.reject(None, unknown()));
        };
        let stored = self
            .reconciler
            .store()
            .get(order_id)
            .await
            .inspect_err(|e| record_store_failure(operation, order_id, Some(&approved.entity_id), e))?;
        let Some(order) = stored else {
            return Ok(self.reject(Some(order_id), unknown()));
        };

        debug!(%operation, order_id = %order.id, "track id resolved to order");
        self.finish(&order, &settings, Ok(approved), operation).await
    }
}
