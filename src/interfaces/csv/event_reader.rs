use crate::domain::order::OrderId;
use crate::error::{GatewayError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fmt;
use std::io::Read;

/// The host actions an event row can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    Token,
    Charge,
    VerifyToken,
    Verify,
    Capture,
    Void,
    Refund,
    CanCapture,
    CanVoid,
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventAction::Token => "token",
            EventAction::Charge => "charge",
            EventAction::VerifyToken => "verify_token",
            EventAction::Verify => "verify",
            EventAction::Capture => "capture",
            EventAction::Void => "void",
            EventAction::Refund => "refund",
            EventAction::CanCapture => "can_capture",
            EventAction::CanVoid => "can_void",
        };
        f.write_str(name)
    }
}

/// One row of an events file. Columns that an action does not use may be empty.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderEvent {
    pub action: EventAction,
    #[serde(default)]
    pub order: Option<OrderId>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl OrderEvent {
    pub fn require_order(&self) -> Result<OrderId> {
        self.order.ok_or_else(|| self.missing("order"))
    }

    pub fn require_amount(&self) -> Result<Decimal> {
        self.amount.ok_or_else(|| self.missing("amount"))
    }

    pub fn require_currency(&self) -> Result<&str> {
        self.currency.as_deref().ok_or_else(|| self.missing("currency"))
    }

    pub fn require_token(&self) -> Result<&str> {
        self.token.as_deref().ok_or_else(|| self.missing("token"))
    }

    fn missing(&self, column: &str) -> GatewayError {
        GatewayError::ValidationError(format!(
            "'{}' event requires the '{}' column",
            self.action, column
        ))
    }
}

/// Reads order events from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// so trailing empty columns may be omitted.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and deserializes events.
    pub fn events(self) -> impl Iterator<Item = Result<OrderEvent>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(GatewayError::from))
    }
}
