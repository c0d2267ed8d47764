//! Outbound request payloads, one tagged struct per processor operation.
//!
//! Field names follow the processor's camelCase wire format. Ids that travel in
//! the request path rather than the body (`chargeId`) are skipped during
//! serialization.

use super::money::{Currency, MinorUnits};
use super::order::{EntityId, Order, OrderId};
use super::settings::{ChargeMode, SecretKey, Settings};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

/// Marks a customer-initiated, non-recurring payment.
pub const TRANSACTION_INDICATOR_REGULAR: u8 = 1;
/// Hours the processor waits before auto-capturing an authorization.
pub const AUTO_CAPTURE_TIME: u32 = 0;
pub const INTEGRATION_TYPE: &str = "JS";
pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoCapture {
    Capture,
    Authorize,
}

impl AutoCapture {
    pub fn flag(&self) -> &'static str {
        match self {
            AutoCapture::Capture => "Y",
            AutoCapture::Authorize => "N",
        }
    }
}

impl Serialize for AutoCapture {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.flag())
    }
}

/// An operation payload together with the key that authorizes it.
#[derive(Debug, Clone)]
pub struct ProcessorRequest<T> {
    pub authorization: SecretKey,
    pub posted_param: T,
}

impl<T> ProcessorRequest<T> {
    pub fn new(authorization: SecretKey, posted_param: T) -> Self {
        Self {
            authorization,
            posted_param,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub value: MinorUnits,
    pub currency: Currency,
    pub charge_mode: ChargeMode,
    pub transaction_indicator: u8,
    pub customer_ip: String,
    pub auto_cap_time: u32,
    pub auto_capture: AutoCapture,
}

impl TokenRequest {
    pub fn new(value: MinorUnits, currency: Currency, settings: &Settings, customer_ip: String) -> Self {
        Self {
            value,
            currency,
            charge_mode: settings.charge_mode,
            transaction_indicator: TRANSACTION_INDICATOR_REGULAR,
            customer_ip,
            auto_cap_time: AUTO_CAPTURE_TIME,
            auto_capture: settings.auto_capture(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Phone {
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingDetails {
    pub address_line1: String,
    pub address_line2: String,
    pub postcode: String,
    pub country: String,
    pub city: String,
    pub state: String,
    pub phone: Phone,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub quantity: u32,
    pub sku: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegrationMetadata {
    pub server: String,
    pub quote_id: OrderId,
    pub plugin_version: String,
    pub lib_version: String,
    pub integration_type: String,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeRequest {
    pub value: MinorUnits,
    pub currency: Currency,
    pub track_id: OrderId,
    pub customer_name: String,
    pub email: String,
    pub customer_ip: String,
    pub card_token: String,
    pub shipping_details: ShippingDetails,
    pub products: Vec<Product>,
    pub metadata: IntegrationMetadata,
    pub auto_capture: AutoCapture,
    pub auto_cap_time: u32,
    pub charge_mode: ChargeMode,
    pub transaction_indicator: u8,
}

impl ChargeRequest {
    /// Snapshots the order into a charge payload. `time` is the request timestamp.
    pub fn for_order(
        order: &Order,
        card_token: &str,
        value: MinorUnits,
        settings: &Settings,
        customer_ip: String,
        time: String,
    ) -> Self {
        let billing = &order.billing;
        let shipping_details = ShippingDetails {
            address_line1: billing.address_1.clone(),
            address_line2: billing.address_2.clone(),
            postcode: billing.postcode.clone(),
            country: billing.country.clone(),
            city: billing.city.clone(),
            state: billing.state.clone(),
            phone: Phone {
                number: billing.phone.clone(),
            },
        };

        let products = order
            .items
            .iter()
            .map(|item| Product {
                name: item.name.clone(),
                description: item.description.clone(),
                price: item.price,
                quantity: item.quantity,
                sku: item.sku.clone(),
            })
            .collect();

        Self {
            value,
            currency: order.currency.clone(),
            track_id: order.id,
            customer_name: order.customer_name(),
            email: billing.email.clone(),
            customer_ip,
            card_token: card_token.to_string(),
            shipping_details,
            products,
            metadata: IntegrationMetadata {
                server: settings.site_url.clone().unwrap_or_default(),
                quote_id: order.id,
                plugin_version: PLUGIN_VERSION.to_string(),
                lib_version: PLUGIN_VERSION.to_string(),
                integration_type: INTEGRATION_TYPE.to_string(),
                time,
            },
            auto_capture: settings.auto_capture(),
            auto_cap_time: AUTO_CAPTURE_TIME,
            charge_mode: settings.charge_mode,
            transaction_indicator: TRANSACTION_INDICATOR_REGULAR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub payment_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    #[serde(skip)]
    pub charge_id: EntityId,
    pub value: MinorUnits,
    pub track_id: OrderId,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoidRequest {
    #[serde(skip)]
    pub charge_id: EntityId,
    pub track_id: OrderId,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    #[serde(skip)]
    pub charge_id: EntityId,
    pub value: MinorUnits,
    pub track_id: OrderId,
    pub description: String,
}
