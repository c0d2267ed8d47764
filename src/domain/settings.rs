use super::charge::AutoCapture;
use super::order::OrderStatus;
use super::ports::SettingsProvider;
use crate::error::{GatewayError, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Keys understood by a [`SettingsProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    SecretKey,
    PublicKey,
    PrivateSharedKey,
    Mode,
    PaymentAction,
    OrderStatus,
    VoidStatus,
    Is3d,
    SiteUrl,
}

impl SettingKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::SecretKey => "secret_key",
            SettingKey::PublicKey => "public_key",
            SettingKey::PrivateSharedKey => "private_shared_key",
            SettingKey::Mode => "mode",
            SettingKey::PaymentAction => "payment_action",
            SettingKey::OrderStatus => "order_status",
            SettingKey::VoidStatus => "void_status",
            SettingKey::Is3d => "is_3d",
            SettingKey::SiteUrl => "site_url",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointMode {
    Sandbox,
    Live,
}

impl FromStr for EndpointMode {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(EndpointMode::Sandbox),
            "live" => Ok(EndpointMode::Live),
            other => Err(GatewayError::ConfigurationError(format!(
                "Unknown endpoint mode '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for EndpointMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointMode::Sandbox => f.write_str("sandbox"),
            EndpointMode::Live => f.write_str("live"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentAction {
    Authorize,
    AuthorizeCapture,
}

impl PaymentAction {
    /// Only an explicit "authorize" holds funds; every other configured action captures.
    pub fn from_setting(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("authorize") => PaymentAction::Authorize,
            _ => PaymentAction::AuthorizeCapture,
        }
    }

    pub fn auto_capture(&self) -> AutoCapture {
        match self {
            PaymentAction::Authorize => AutoCapture::Authorize,
            PaymentAction::AuthorizeCapture => AutoCapture::Capture,
        }
    }
}

/// Cardholder-authentication mode passed through to the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChargeMode {
    #[default]
    NonThreeD,
    ThreeD,
    AttemptThreeD,
}

impl ChargeMode {
    pub fn code(&self) -> u8 {
        match self {
            ChargeMode::NonThreeD => 1,
            ChargeMode::ThreeD => 2,
            ChargeMode::AttemptThreeD => 3,
        }
    }
}

impl FromStr for ChargeMode {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "no" => Ok(ChargeMode::NonThreeD),
            "2" | "yes" => Ok(ChargeMode::ThreeD),
            "3" => Ok(ChargeMode::AttemptThreeD),
            other => Err(GatewayError::ConfigurationError(format!(
                "Unknown 3-D mode '{}'",
                other
            ))),
        }
    }
}

impl Serialize for ChargeMode {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.code())
    }
}

/// The processor secret key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(****)")
    }
}

/// A typed snapshot of the gateway configuration.
///
/// Resolved from the [`SettingsProvider`] at the start of every gateway call
/// and dropped at its end, so configuration changes apply to the next call.
#[derive(Debug, Clone)]
pub struct Settings {
    pub mode: EndpointMode,
    pub payment_action: PaymentAction,
    pub initial_order_status: OrderStatus,
    pub cancel_on_void: bool,
    pub charge_mode: ChargeMode,
    pub secret_key: SecretKey,
    pub public_key: Option<String>,
    pub private_shared_key: Option<String>,
    pub site_url: Option<String>,
}

impl Settings {
    pub fn resolve(provider: &dyn SettingsProvider) -> Result<Self> {
        let lookup = |key: SettingKey| {
            provider
                .get(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let secret_key = lookup(SettingKey::SecretKey).ok_or_else(|| {
            GatewayError::ConfigurationError("Secret key is not configured".to_string())
        })?;

        let mode = match lookup(SettingKey::Mode) {
            Some(mode) => mode.parse()?,
            None => EndpointMode::Sandbox,
        };

        let initial_order_status = match lookup(SettingKey::OrderStatus) {
            Some(status) => status.parse()?,
            None => OrderStatus::Processing,
        };

        let charge_mode = match lookup(SettingKey::Is3d) {
            Some(mode) => mode.parse()?,
            None => ChargeMode::default(),
        };

        Ok(Self {
            mode,
            payment_action: PaymentAction::from_setting(lookup(SettingKey::PaymentAction).as_deref()),
            initial_order_status,
            cancel_on_void: lookup(SettingKey::VoidStatus).as_deref() != Some("no"),
            charge_mode,
            secret_key: SecretKey::new(secret_key),
            public_key: lookup(SettingKey::PublicKey),
            private_shared_key: lookup(SettingKey::PrivateSharedKey),
            site_url: lookup(SettingKey::SiteUrl),
        })
    }

    pub fn auto_capture(&self) -> AutoCapture {
        self.payment_action.auto_capture()
    }
}
