use super::money::Currency;
use crate::error::GatewayError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The order-management system's identifier, sent to the processor as the track id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(u64);

impl OrderId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrderId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// The processor's own identifier for a charge, capture, void, refund or token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,
    Processing,
    OnHold,
    Completed,
    Cancelled,
    Refunded,
    Failed,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::OnHold => "on-hold",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl FromStr for OrderStatus {
    type Err = GatewayError;

    /// Accepts both bare names and the host's `wc-` prefixed slugs.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let slug = s.trim().to_ascii_lowercase();
        match slug.strip_prefix("wc-").unwrap_or(&slug) {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "on-hold" => Ok(OrderStatus::OnHold),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "refunded" => Ok(OrderStatus::Refunded),
            "failed" => Ok(OrderStatus::Failed),
            other => Err(GatewayError::ConfigurationError(format!(
                "Unknown order status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
#[serde(default)]
pub struct BillingDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address_1: String,
    pub address_2: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct LineItem {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub sku: String,
}

/// A snapshot of a host order, as returned by the order store.
///
/// The adapter reads these fields and requests transitions through the store;
/// it never creates or deletes orders.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    pub currency: Currency,
    pub total: Decimal,
    /// Marker of the gateway the order was paid with.
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub billing: BillingDetails,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub coupons: Vec<String>,
    /// Processor ids in the order they were returned; the last one is current.
    #[serde(default)]
    pub transaction_ids: Vec<EntityId>,
}

impl Order {
    pub fn new(id: OrderId, currency: Currency, total: Decimal) -> Self {
        Self {
            id,
            status: OrderStatus::Pending,
            currency,
            total,
            payment_method: None,
            billing: BillingDetails::default(),
            items: Vec::new(),
            coupons: Vec::new(),
            transaction_ids: Vec::new(),
        }
    }

    /// The id subsequent capture/void/refund calls chain from.
    pub fn latest_transaction_id(&self) -> Option<&EntityId> {
        self.transaction_ids.last()
    }

    pub fn customer_name(&self) -> String {
        format!("{} {}", self.billing.first_name, self.billing.last_name)
            .trim()
            .to_string()
    }
}
