#![allow(dead_code)]

use async_trait::async_trait;
use checkout_gateway::application::gateway::{Gateway, PAYMENT_METHOD_CODE};
use checkout_gateway::domain::charge::{
    CaptureRequest, ChargeRequest, ProcessorRequest, RefundRequest, TokenRequest, VerifyRequest,
    VoidRequest,
};
use checkout_gateway::domain::money::{Currency, MinorUnits};
use checkout_gateway::domain::order::{EntityId, Order, OrderId, OrderStatus};
use checkout_gateway::domain::ports::{
    OrderStore, ProcessorClient, ProcessorClientBox, ProcessorClientFactory, ProcessorResult,
};
use checkout_gateway::domain::response::{ExceptionState, ProcessorResponse};
use checkout_gateway::domain::settings::{EndpointMode, SettingKey};
use checkout_gateway::error::{GatewayError, Result as GatewayResult};
use checkout_gateway::infrastructure::in_memory::{InMemoryOrderStore, StaticSettings};
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// A processor call as the scripted client saw it.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Token { value: MinorUnits, currency: String },
    Charge { value: MinorUnits, auto_capture: String, card_token: String },
    Verify { payment_token: String },
    Capture { charge_id: EntityId, value: MinorUnits },
    Void { charge_id: EntityId },
    Refund { charge_id: EntityId, value: MinorUnits, description: String },
    UpdateTrackId { order_id: OrderId },
}

#[derive(Default)]
struct Script {
    replies: VecDeque<ProcessorResult>,
    calls: Vec<Call>,
    modes: Vec<EndpointMode>,
    track_id_failure: Option<String>,
}

/// A processor client that replays queued replies and records every call.
#[derive(Clone, Default)]
pub struct ScriptedProcessor {
    script: Arc<Mutex<Script>>,
}

impl ScriptedProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, result: ProcessorResult) -> &Self {
        self.script.lock().unwrap().replies.push_back(result);
        self
    }

    pub fn approve(&self, id: &str) -> &Self {
        self.reply(Ok(ProcessorResponse::approved(id)))
    }

    pub fn raise(&self, message: &str) -> &Self {
        self.reply(Err(ExceptionState::new(message)))
    }

    pub fn fail_track_id_update(&self, message: &str) {
        self.script.lock().unwrap().track_id_failure = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn modes(&self) -> Vec<EndpointMode> {
        self.script.lock().unwrap().modes.clone()
    }

    pub fn factory(&self) -> ProcessorClientFactory {
        let script = self.script.clone();
        Box::new(move |mode| -> ProcessorClientBox {
            script.lock().unwrap().modes.push(mode);
            Box::new(ScriptedClient {
                script: script.clone(),
            })
        })
    }
}

struct ScriptedClient {
    script: Arc<Mutex<Script>>,
}

impl ScriptedClient {
    fn next(&self, call: Call) -> ProcessorResult {
        let mut script = self.script.lock().unwrap();
        script.calls.push(call);
        script
            .replies
            .pop_front()
            .unwrap_or_else(|| Err(ExceptionState::new("No scripted reply left")))
    }
}

#[async_trait]
impl ProcessorClient for ScriptedClient {
    async fn get_payment_token(&self, request: &ProcessorRequest<TokenRequest>) -> ProcessorResult {
        self.next(Call::Token {
            value: request.posted_param.value,
            currency: request.posted_param.currency.to_string(),
        })
    }

    async fn create_charge(&self, request: &ProcessorRequest<ChargeRequest>) -> ProcessorResult {
        self.next(Call::Charge {
            value: request.posted_param.value,
            auto_capture: request.posted_param.auto_capture.flag().to_string(),
            card_token: request.posted_param.card_token.clone(),
        })
    }

    async fn verify_charge_payment_token(
        &self,
        request: &ProcessorRequest<VerifyRequest>,
    ) -> ProcessorResult {
        self.next(Call::Verify {
            payment_token: request.posted_param.payment_token.clone(),
        })
    }

    async fn capture_charge(&self, request: &ProcessorRequest<CaptureRequest>) -> ProcessorResult {
        self.next(Call::Capture {
            charge_id: request.posted_param.charge_id.clone(),
            value: request.posted_param.value,
        })
    }

    async fn void_charge(&self, request: &ProcessorRequest<VoidRequest>) -> ProcessorResult {
        self.next(Call::Void {
            charge_id: request.posted_param.charge_id.clone(),
        })
    }

    async fn refund_charge(&self, request: &ProcessorRequest<RefundRequest>) -> ProcessorResult {
        self.next(Call::Refund {
            charge_id: request.posted_param.charge_id.clone(),
            value: request.posted_param.value,
            description: request.posted_param.description.clone(),
        })
    }

    async fn update_track_id(
        &self,
        _response: &ProcessorResponse,
        order_id: OrderId,
    ) -> Result<(), ExceptionState> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(Call::UpdateTrackId { order_id });
        match &script.track_id_failure {
            Some(message) => Err(ExceptionState::new(message.clone())),
            None => Ok(()),
        }
    }
}

/// Counts ERROR-level events so tests can assert "logged exactly once".
#[derive(Clone, Default)]
pub struct ErrorCounter {
    count: Arc<AtomicUsize>,
}

impl ErrorCounter {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Installs the counter as this thread's default subscriber.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        use tracing_subscriber::layer::SubscriberExt;
        let subscriber = tracing_subscriber::registry().with(self.clone());
        tracing::subscriber::set_default(subscriber)
    }
}

impl<S: Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }
}

pub struct Harness {
    pub gateway: Gateway,
    pub store: InMemoryOrderStore,
    pub processor: ScriptedProcessor,
    pub settings: StaticSettings,
}

pub fn base_settings() -> StaticSettings {
    StaticSettings::new().with(SettingKey::SecretKey, "sk_test_integration")
}

pub fn order(id: u64, total: Decimal, currency: &str) -> Order {
    let mut order = Order::new(OrderId::new(id), Currency::new(currency).unwrap(), total);
    order.payment_method = Some(PAYMENT_METHOD_CODE.to_string());
    order
}

pub async fn harness(settings: StaticSettings, orders: Vec<Order>) -> Harness {
    let store = InMemoryOrderStore::new();
    for order in orders {
        store.insert(order).await;
    }
    let processor = ScriptedProcessor::new();
    let gateway = Gateway::new(
        processor.factory(),
        Box::new(store.clone()),
        Box::new(settings.clone()),
    );
    Harness {
        gateway,
        store,
        processor,
        settings,
    }
}

/// An order store that reads from memory and fails every write.
#[derive(Clone, Default)]
pub struct ReadOnlyStore {
    inner: InMemoryOrderStore,
}

impl ReadOnlyStore {
    pub async fn with_orders(orders: Vec<Order>) -> Self {
        let inner = InMemoryOrderStore::new();
        for order in orders {
            inner.insert(order).await;
        }
        Self { inner }
    }

    fn refuse() -> GatewayResult<()> {
        Err(GatewayError::InternalError(Box::new(std::io::Error::other(
            "order store is read-only",
        ))))
    }
}

#[async_trait]
impl OrderStore for ReadOnlyStore {
    async fn get(&self, order_id: OrderId) -> GatewayResult<Option<Order>> {
        self.inner.get(order_id).await
    }

    async fn transaction_ids(&self, order_id: OrderId) -> GatewayResult<Vec<EntityId>> {
        self.inner.transaction_ids(order_id).await
    }

    async fn add_transaction_id(&self, _order_id: OrderId, _id: EntityId) -> GatewayResult<()> {
        Self::refuse()
    }

    async fn payment_method(&self, order_id: OrderId) -> GatewayResult<Option<String>> {
        self.inner.payment_method(order_id).await
    }

    async fn update_status(&self, _order_id: OrderId, _status: OrderStatus, _note: &str) -> GatewayResult<()> {
        Self::refuse()
    }

    async fn add_note(&self, _order_id: OrderId, _note: &str) -> GatewayResult<()> {
        Self::refuse()
    }

    async fn payment_complete(&self, _order_id: OrderId) -> GatewayResult<()> {
        Self::refuse()
    }

    async fn reduce_stock(&self, _order_id: OrderId) -> GatewayResult<()> {
        Self::refuse()
    }

    async fn empty_cart(&self, _order_id: OrderId) -> GatewayResult<()> {
        Self::refuse()
    }

    async fn increase_coupon_usage(&self, _order_id: OrderId) -> GatewayResult<()> {
        Self::refuse()
    }

    async fn decrease_coupon_usage(&self, _order_id: OrderId) -> GatewayResult<()> {
        Self::refuse()
    }
}
