use super::validator::validate;
use crate::domain::charge::{
    CaptureRequest, ChargeRequest, ProcessorRequest, RefundRequest, TokenRequest, VerifyRequest,
    VoidRequest,
};
use crate::domain::money::{Amount, Currency, MinorUnits};
use crate::domain::order::{EntityId, Order};
use crate::domain::outcome::{ErrorKind, OperationKind, Outcome, Precondition};
use crate::domain::ports::{ProcessorClient, ProcessorClientBox, ProcessorClientFactory, ProcessorResult};
use crate::domain::request_context::RequestContext;
use crate::domain::response::{ExceptionState, ProcessorResponse};
use crate::domain::settings::Settings;
use crate::error::GatewayError;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};

const CAPTURE_DESCRIPTION: &str = "capture description";
const VOID_DESCRIPTION: &str = "Void Description";
const METADATA_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A response that passed every check, reduced to what the caller needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approved {
    pub operation: OperationKind,
    pub entity_id: EntityId,
    /// The id or token this result chains from.
    pub parent_id: Option<String>,
    pub track_id: Option<String>,
}

impl Approved {
    pub fn message(&self) -> String {
        let label = self.operation.approval_label();
        match &self.parent_id {
            Some(parent) => format!(
                "{} Approved (Transaction ID - {}, Parent ID - {})",
                label, self.entity_id, parent
            ),
            None => format!("{} Approved (Transaction ID - {})", label, self.entity_id),
        }
    }
}

impl From<Approved> for Outcome {
    fn from(approved: Approved) -> Self {
        let message = approved.message();
        Outcome::ok(message, approved.entity_id)
    }
}

/// A payment token issued for a checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentToken {
    pub token: EntityId,
    pub value: MinorUnits,
    pub currency: Currency,
}

/// A failed operation. `message` is safe to show to a shopper or operator;
/// `diagnostic` carries processor codes for the logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct OperationError {
    pub operation: OperationKind,
    pub kind: ErrorKind,
    pub message: String,
    pub diagnostic: Option<String>,
}

impl OperationError {
    pub fn transport(operation: OperationKind, exception: &ExceptionState) -> Self {
        let detail = exception.error_message().trim().trim_end_matches('.');
        Self {
            operation,
            kind: ErrorKind::Transport,
            message: format!(
                "{}: {}. Try again or contact customer support.",
                operation.failure_phrase(),
                detail
            ),
            diagnostic: Some(exception.error_message().to_string()),
        }
    }

    pub fn validation(operation: OperationKind, response: &ProcessorResponse) -> Self {
        Self {
            operation,
            kind: ErrorKind::Validation,
            message: format!(
                "{}. Try again or contact customer support.",
                operation.failure_phrase()
            ),
            diagnostic: Some(response.diagnostic()),
        }
    }

    /// Misconfiguration surfaces to callers exactly like a failed processor call.
    pub fn configuration(operation: OperationKind, error: &GatewayError) -> Self {
        let detail = match error {
            GatewayError::ConfigurationError(detail) => detail.clone(),
            other => other.to_string(),
        };
        Self {
            operation,
            kind: ErrorKind::Configuration,
            message: format!(
                "{}: {}. Try again or contact customer support.",
                operation.failure_phrase(),
                detail
            ),
            diagnostic: Some(detail),
        }
    }

    pub fn precondition(operation: OperationKind, precondition: Precondition) -> Self {
        Self {
            operation,
            message: format!("{}: {}.", operation.failure_phrase(), precondition),
            kind: ErrorKind::Precondition(precondition),
            diagnostic: None,
        }
    }
}

impl From<OperationError> for Outcome {
    fn from(error: OperationError) -> Self {
        Outcome::error(error.kind, error.message, error.diagnostic)
    }
}

/// Applies the success rules in a fixed order: transport, validity, response code, id.
fn check(
    operation: OperationKind,
    result: ProcessorResult,
) -> Result<(ProcessorResponse, EntityId), OperationError> {
    let response = result.map_err(|exception| OperationError::transport(operation, &exception))?;
    if !validate(&response) {
        return Err(OperationError::validation(operation, &response));
    }
    match response.id.clone() {
        Some(entity_id) => Ok((response, entity_id)),
        None => Err(OperationError::validation(operation, &response)),
    }
}

fn approve(
    operation: OperationKind,
    result: ProcessorResult,
    parent_id: Option<String>,
) -> Result<Approved, OperationError> {
    let (response, entity_id) = check(operation, result)?;
    info!(%operation, entity_id = %entity_id, "processor approved operation");
    Ok(Approved {
        operation,
        entity_id,
        parent_id,
        track_id: response.track_id,
    })
}

fn latest_transaction_id(operation: OperationKind, order: &Order) -> Result<EntityId, OperationError> {
    order
        .latest_transaction_id()
        .cloned()
        .ok_or_else(|| OperationError::precondition(operation, Precondition::MissingTransactionId))
}

fn require_token(operation: OperationKind, token: &str) -> Result<String, OperationError> {
    let token = token.trim();
    if token.is_empty() {
        Err(OperationError::precondition(operation, Precondition::MissingToken))
    } else {
        Ok(token.to_string())
    }
}

fn to_minor_units(
    operation: OperationKind,
    client: &dyn ProcessorClient,
    amount: Decimal,
    currency: &Currency,
) -> Result<MinorUnits, OperationError> {
    client
        .value_to_decimal(amount, currency)
        .map_err(|e| OperationError::precondition(operation, Precondition::InvalidAmount(e.to_string())))
}

/// Falls back to the order total when no (or a zero) amount is given.
pub fn resolve_refund_amount(order: &Order, amount: Option<Decimal>) -> Result<Decimal, Precondition> {
    match amount {
        None => Ok(order.total),
        Some(amount) if amount.is_zero() => Ok(order.total),
        Some(amount) => Amount::new(amount)
            .map(Decimal::from)
            .map_err(|e| Precondition::InvalidAmount(e.to_string())),
    }
}

/// Runs one lifecycle operation against the processor and normalizes its result.
///
/// The executor never touches order state and never retries; a failure is
/// terminal for the call.
pub struct ChargeExecutor {
    clients: ProcessorClientFactory,
}

impl ChargeExecutor {
    pub fn new(clients: ProcessorClientFactory) -> Self {
        Self { clients }
    }

    fn client(&self, settings: &Settings) -> ProcessorClientBox {
        (self.clients)(settings.mode)
    }

    pub async fn create_payment_token(
        &self,
        settings: &Settings,
        amount: Decimal,
        currency: &Currency,
        context: &RequestContext,
    ) -> Result<PaymentToken, OperationError> {
        let operation = OperationKind::CreatePaymentToken;
        Amount::new(amount).map_err(|e| {
            OperationError::precondition(operation, Precondition::InvalidAmount(e.to_string()))
        })?;

        let client = self.client(settings);
        let value = to_minor_units(operation, client.as_ref(), amount, currency)?;
        let request = ProcessorRequest::new(
            settings.secret_key.clone(),
            TokenRequest::new(value, currency.clone(), settings, context.client_ip()),
        );
        debug!(%operation, %value, %currency, mode = %settings.mode, "requesting payment token");

        let approved = approve(operation, client.get_payment_token(&request).await, None)?;
        Ok(PaymentToken {
            token: approved.entity_id,
            value,
            currency: currency.clone(),
        })
    }

    pub async fn create_charge(
        &self,
        settings: &Settings,
        order: &Order,
        card_token: &str,
        context: &RequestContext,
    ) -> Result<Approved, OperationError> {
        let operation = OperationKind::CreateCharge;
        let card_token = require_token(operation, card_token)?;

        let client = self.client(settings);
        let value = to_minor_units(operation, client.as_ref(), order.total, &order.currency)?;
        let time = chrono::Utc::now().format(METADATA_TIME_FORMAT).to_string();
        let request = ProcessorRequest::new(
            settings.secret_key.clone(),
            ChargeRequest::for_order(order, &card_token, value, settings, context.client_ip(), time),
        );
        debug!(%operation, order_id = %order.id, %value, auto_capture = request.posted_param.auto_capture.flag(), "creating charge");

        approve(operation, client.create_charge(&request).await, Some(card_token))
    }

    pub async fn verify_charge_payment_token(
        &self,
        settings: &Settings,
        order: &Order,
        payment_token: &str,
    ) -> Result<Approved, OperationError> {
        let operation = OperationKind::VerifyChargePaymentToken;
        let payment_token = require_token(operation, payment_token)?;

        let client = self.client(settings);
        let request = ProcessorRequest::new(
            settings.secret_key.clone(),
            VerifyRequest {
                payment_token: payment_token.clone(),
            },
        );
        debug!(%operation, order_id = %order.id, "verifying payment token");

        let (response, entity_id) =
            check(operation, client.verify_charge_payment_token(&request).await)?;
        client
            .update_track_id(&response, order.id)
            .await
            .map_err(|exception| OperationError::transport(operation, &exception))?;

        info!(%operation, order_id = %order.id, entity_id = %entity_id, "payment token verified");
        Ok(Approved {
            operation,
            entity_id,
            parent_id: Some(payment_token),
            track_id: Some(order.id.to_string()),
        })
    }

    /// Verifies a payment token before any order is known; the order is found
    /// afterwards through the response's track id.
    pub async fn verify_charge(
        &self,
        settings: &Settings,
        payment_token: &str,
    ) -> Result<Approved, OperationError> {
        let operation = OperationKind::VerifyCharge;
        let payment_token = require_token(operation, payment_token)?;

        let client = self.client(settings);
        let request = ProcessorRequest::new(
            settings.secret_key.clone(),
            VerifyRequest {
                payment_token: payment_token.clone(),
            },
        );
        debug!(%operation, "verifying payment token");

        approve(
            operation,
            client.verify_charge_payment_token(&request).await,
            Some(payment_token),
        )
    }

    pub async fn capture(&self, settings: &Settings, order: &Order) -> Result<Approved, OperationError> {
        let operation = OperationKind::Capture;
        let charge_id = latest_transaction_id(operation, order)?;

        let client = self.client(settings);
        let value = to_minor_units(operation, client.as_ref(), order.total, &order.currency)?;
        let request = ProcessorRequest::new(
            settings.secret_key.clone(),
            CaptureRequest {
                charge_id: charge_id.clone(),
                value,
                track_id: order.id,
                description: CAPTURE_DESCRIPTION.to_string(),
            },
        );
        debug!(%operation, order_id = %order.id, %charge_id, %value, "capturing charge");

        approve(
            operation,
            client.capture_charge(&request).await,
            Some(charge_id.to_string()),
        )
    }

    pub async fn void(&self, settings: &Settings, order: &Order) -> Result<Approved, OperationError> {
        let operation = OperationKind::Void;
        let charge_id = latest_transaction_id(operation, order)?;

        let client = self.client(settings);
        let request = ProcessorRequest::new(
            settings.secret_key.clone(),
            VoidRequest {
                charge_id: charge_id.clone(),
                track_id: order.id,
                description: VOID_DESCRIPTION.to_string(),
            },
        );
        debug!(%operation, order_id = %order.id, %charge_id, "voiding charge");

        approve(
            operation,
            client.void_charge(&request).await,
            Some(charge_id.to_string()),
        )
    }

    pub async fn refund(
        &self,
        settings: &Settings,
        order: &Order,
        amount: Option<Decimal>,
        message: &str,
    ) -> Result<Approved, OperationError> {
        let operation = OperationKind::Refund;
        let charge_id = latest_transaction_id(operation, order)?;
        let amount = resolve_refund_amount(order, amount)
            .map_err(|precondition| OperationError::precondition(operation, precondition))?;

        let client = self.client(settings);
        let value = to_minor_units(operation, client.as_ref(), amount, &order.currency)?;
        let request = ProcessorRequest::new(
            settings.secret_key.clone(),
            RefundRequest {
                charge_id: charge_id.clone(),
                value,
                track_id: order.id,
                description: message.to_string(),
            },
        );
        debug!(%operation, order_id = %order.id, %charge_id, %value, "refunding charge");

        approve(
            operation,
            client.refund_charge(&request).await,
            Some(charge_id.to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderId;
    use crate::domain::settings::SettingKey;
    use crate::infrastructure::in_memory::StaticSettings;
    use crate::infrastructure::simulated::SimulatedProcessor;
    use rust_decimal_macros::dec;

    fn settings(action: &str) -> Settings {
        let provider = StaticSettings::new()
            .with(SettingKey::SecretKey, "sk_test_executor")
            .with(SettingKey::PaymentAction, action);
        Settings::resolve(&provider).unwrap()
    }

    fn order(total: Decimal) -> Order {
        Order::new(OrderId::new(100), Currency::new("USD").unwrap(), total)
    }

    #[tokio::test]
    async fn test_authorize_then_capture_chains_ids() {
        let processor = SimulatedProcessor::new();
        let executor = ChargeExecutor::new(processor.factory());
        let settings = settings("authorize");
        let mut order = order(dec!(19.99));

        let charge = executor
            .create_charge(&settings, &order, "card_tok_ok", &RequestContext::new())
            .await
            .unwrap();
        order.transaction_ids.push(charge.entity_id.clone());

        let capture = executor.capture(&settings, &order).await.unwrap();
        assert_ne!(capture.entity_id, charge.entity_id);
        assert_eq!(capture.parent_id.as_deref(), Some(charge.entity_id.as_str()));
        assert!(capture.message().contains(&format!("Parent ID - {}", charge.entity_id)));
    }

    #[tokio::test]
    async fn test_capture_without_transaction_is_precondition() {
        let processor = SimulatedProcessor::new();
        let executor = ChargeExecutor::new(processor.factory());

        let err = executor.capture(&settings("authorize"), &order(dec!(5))).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Precondition(Precondition::MissingTransactionId));
        assert_eq!(processor.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_charge_is_transport_error() {
        let processor = SimulatedProcessor::new();
        let executor = ChargeExecutor::new(processor.factory());
        let mut order = order(dec!(5));
        order.transaction_ids.push(EntityId::new("charge_missing"));

        let err = executor.void(&settings("authorize"), &order).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Transport);
        assert!(err.message.starts_with("Transaction was not voided: "));
        assert!(err.message.ends_with("Try again or contact customer support."));
    }

    #[tokio::test]
    async fn test_declined_card_is_validation_error_with_hidden_code() {
        let processor = SimulatedProcessor::new();
        let executor = ChargeExecutor::new(processor.factory());

        let err = executor
            .create_charge(&settings("authorize"), &order(dec!(5)), "card_tok_decline", &RequestContext::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(!err.message.contains("20005"));
        assert!(err.diagnostic.unwrap().contains("20005"));
    }

    #[tokio::test]
    async fn test_payment_token_carries_minor_units() {
        let processor = SimulatedProcessor::new();
        let executor = ChargeExecutor::new(processor.factory());
        let jpy = Currency::new("JPY").unwrap();

        let token = executor
            .create_payment_token(&settings("authorize_capture"), dec!(1500.4), &jpy, &RequestContext::new())
            .await
            .unwrap();
        assert_eq!(token.value, MinorUnits::new(1500));
        assert_eq!(token.currency, jpy);
    }

    #[tokio::test]
    async fn test_non_positive_token_amount_is_rejected_locally() {
        let processor = SimulatedProcessor::new();
        let executor = ChargeExecutor::new(processor.factory());
        let usd = Currency::new("USD").unwrap();

        let err = executor
            .create_payment_token(&settings("authorize"), dec!(0), &usd, &RequestContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Precondition(Precondition::InvalidAmount(_))));
        assert_eq!(processor.calls(), 0);
    }

    #[test]
    fn test_refund_amount_resolution() {
        let order = Order::new(OrderId::new(1), Currency::new("EUR").unwrap(), dec!(50.00));
        assert_eq!(resolve_refund_amount(&order, None).unwrap(), dec!(50.00));
        assert_eq!(resolve_refund_amount(&order, Some(dec!(0))).unwrap(), dec!(50.00));
        assert_eq!(resolve_refund_amount(&order, Some(dec!(12.5))).unwrap(), dec!(12.5));
        assert!(matches!(
            resolve_refund_amount(&order, Some(dec!(-1))),
            Err(Precondition::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_configuration_error_is_transport_shaped() {
        let err = OperationError::configuration(
            OperationKind::Capture,
            &GatewayError::ConfigurationError("Secret key is not configured".to_string()),
        );
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert_eq!(
            err.message,
            "Transaction was not captured: Secret key is not configured. Try again or contact customer support."
        );
    }
}
