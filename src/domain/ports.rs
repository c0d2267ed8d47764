use super::charge::{
    CaptureRequest, ChargeRequest, ProcessorRequest, RefundRequest, TokenRequest, VerifyRequest,
    VoidRequest,
};
use super::money::{Currency, MinorUnits};
use super::order::{EntityId, Order, OrderId, OrderStatus};
use super::response::{ExceptionState, ProcessorResponse};
use super::settings::{EndpointMode, SettingKey};
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// What a processor call yields: a response, or the exception state that replaced it.
pub type ProcessorResult = std::result::Result<ProcessorResponse, ExceptionState>;

/// The host's order-management system.
///
/// Implementations own per-order serialization; the gateway never locks orders itself.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get(&self, order_id: OrderId) -> Result<Option<Order>>;
    async fn transaction_ids(&self, order_id: OrderId) -> Result<Vec<EntityId>>;
    /// Appends to the transaction-id history; the appended id becomes the latest.
    async fn add_transaction_id(&self, order_id: OrderId, id: EntityId) -> Result<()>;
    async fn payment_method(&self, order_id: OrderId) -> Result<Option<String>>;
    async fn update_status(&self, order_id: OrderId, status: OrderStatus, note: &str) -> Result<()>;
    async fn add_note(&self, order_id: OrderId, note: &str) -> Result<()>;
    /// Marks the order paid, moving it to processing.
    async fn payment_complete(&self, order_id: OrderId) -> Result<()>;
    async fn reduce_stock(&self, order_id: OrderId) -> Result<()>;
    async fn empty_cart(&self, order_id: OrderId) -> Result<()>;
    async fn increase_coupon_usage(&self, order_id: OrderId) -> Result<()>;
    async fn decrease_coupon_usage(&self, order_id: OrderId) -> Result<()>;
}

pub type OrderStoreBox = Box<dyn OrderStore>;

/// A client bound to one processor endpoint.
#[async_trait]
pub trait ProcessorClient: Send + Sync {
    async fn get_payment_token(&self, request: &ProcessorRequest<TokenRequest>) -> ProcessorResult;
    async fn create_charge(&self, request: &ProcessorRequest<ChargeRequest>) -> ProcessorResult;
    async fn verify_charge_payment_token(
        &self,
        request: &ProcessorRequest<VerifyRequest>,
    ) -> ProcessorResult;
    async fn capture_charge(&self, request: &ProcessorRequest<CaptureRequest>) -> ProcessorResult;
    async fn void_charge(&self, request: &ProcessorRequest<VoidRequest>) -> ProcessorResult;
    async fn refund_charge(&self, request: &ProcessorRequest<RefundRequest>) -> ProcessorResult;
    /// Associates a verified payment-token charge with an order server-side.
    async fn update_track_id(
        &self,
        response: &ProcessorResponse,
        order_id: OrderId,
    ) -> std::result::Result<(), ExceptionState>;

    /// Converts a major-unit amount into the processor's minor-unit integer.
    fn value_to_decimal(&self, amount: Decimal, currency: &Currency) -> Result<MinorUnits> {
        MinorUnits::from_decimal(amount, currency)
    }
}

pub type ProcessorClientBox = Box<dyn ProcessorClient>;

/// Hands out a client for the configured endpoint mode.
pub type ProcessorClientFactory = Box<dyn Fn(EndpointMode) -> ProcessorClientBox + Send + Sync>;

/// Admin configuration as stored by the host.
pub trait SettingsProvider: Send + Sync {
    fn get(&self, key: SettingKey) -> Option<String>;
}

pub type SettingsProviderBox = Box<dyn SettingsProvider>;
