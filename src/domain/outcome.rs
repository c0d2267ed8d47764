use super::order::{EntityId, OrderId};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// The lifecycle actions the gateway performs against the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    CreatePaymentToken,
    CreateCharge,
    VerifyChargePaymentToken,
    VerifyCharge,
    Capture,
    Void,
    Refund,
}

impl OperationKind {
    /// Lead-in of the message shown when the operation fails.
    pub fn failure_phrase(&self) -> &'static str {
        match self {
            OperationKind::Capture => "Transaction was not captured",
            OperationKind::Void => "Transaction was not voided",
            OperationKind::Refund => "Transaction was not refunded",
            OperationKind::CreatePaymentToken
            | OperationKind::CreateCharge
            | OperationKind::VerifyChargePaymentToken
            | OperationKind::VerifyCharge => "Your payment was not completed",
        }
    }

    pub fn approval_label(&self) -> &'static str {
        match self {
            OperationKind::CreatePaymentToken => "Payment Token",
            OperationKind::CreateCharge
            | OperationKind::VerifyChargePaymentToken
            | OperationKind::VerifyCharge => "Charge",
            OperationKind::Capture => "Capture Charge",
            OperationKind::Void => "Void Charge",
            OperationKind::Refund => "Refund Charge",
        }
    }

    /// Whether a successful result starts a new charge chain on the order.
    pub fn opens_charge(&self) -> bool {
        matches!(
            self,
            OperationKind::CreateCharge
                | OperationKind::VerifyChargePaymentToken
                | OperationKind::VerifyCharge
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::CreatePaymentToken => "create_payment_token",
            OperationKind::CreateCharge => "create_charge",
            OperationKind::VerifyChargePaymentToken => "verify_charge_payment_token",
            OperationKind::VerifyCharge => "verify_charge",
            OperationKind::Capture => "capture",
            OperationKind::Void => "void",
            OperationKind::Refund => "refund",
        };
        f.write_str(name)
    }
}

/// Prior state that an operation needs and did not find.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Precondition {
    #[error("Order {0} was not found")]
    OrderNotFound(OrderId),
    #[error("Order has no transaction to reference")]
    MissingTransactionId,
    #[error("Order was not paid with this gateway")]
    PaymentMethodMismatch { found: Option<String> },
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("No order matches track id '{0}'")]
    UnknownTrackId(String),
    #[error("Payment token is missing")]
    MissingToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("transport error")]
    Transport,
    #[error("validation error")]
    Validation,
    #[error("precondition failed: {0}")]
    Precondition(Precondition),
    #[error("configuration error")]
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Ok,
    Error,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Ok => f.write_str("ok"),
            OutcomeStatus::Error => f.write_str("error"),
        }
    }
}

/// Why an operation failed. The diagnostic is for logs only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: ErrorKind,
    pub diagnostic: Option<String>,
}

/// The normalized result of one gateway call.
///
/// Only [`Outcome::ok`] attaches an entity id, so an error outcome can never
/// carry one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    status: OutcomeStatus,
    message: String,
    entity_id: Option<EntityId>,
    failure: Option<Failure>,
}

impl Outcome {
    pub fn ok(message: impl Into<String>, entity_id: EntityId) -> Self {
        Self {
            status: OutcomeStatus::Ok,
            message: message.into(),
            entity_id: Some(entity_id),
            failure: None,
        }
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>, diagnostic: Option<String>) -> Self {
        Self {
            status: OutcomeStatus::Error,
            message: message.into(),
            entity_id: None,
            failure: Some(Failure { kind, diagnostic }),
        }
    }

    pub fn status(&self) -> OutcomeStatus {
        self.status
    }

    pub fn is_ok(&self) -> bool {
        self.status == OutcomeStatus::Ok
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn entity_id(&self) -> Option<&EntityId> {
        self.entity_id.as_ref()
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    pub fn error_kind(&self) -> Option<&ErrorKind> {
        self.failure.as_ref().map(|failure| &failure.kind)
    }

    /// True when the gateway refused the operation locally because the order
    /// belongs to another payment method.
    pub fn is_not_applicable(&self) -> bool {
        matches!(
            self.error_kind(),
            Some(ErrorKind::Precondition(Precondition::PaymentMethodMismatch { .. }))
        )
    }
}
