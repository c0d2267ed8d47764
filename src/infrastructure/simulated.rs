use crate::domain::charge::{
    AutoCapture, CaptureRequest, ChargeRequest, ProcessorRequest, RefundRequest, TokenRequest,
    VerifyRequest, VoidRequest,
};
use crate::domain::money::MinorUnits;
use crate::domain::order::{EntityId, OrderId};
use crate::domain::ports::{ProcessorClient, ProcessorClientBox, ProcessorClientFactory, ProcessorResult};
use crate::domain::response::{ExceptionState, ProcessorResponse};
use crate::domain::settings::{EndpointMode, SecretKey};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Response code for a card the issuer refuses.
pub const CODE_DECLINED: &str = "20005";
/// Error code for an operation the charge's current state does not allow.
pub const CODE_INVALID_TRANSACTION: &str = "20012";
/// Error code for an amount outside what the charge allows.
pub const CODE_INVALID_AMOUNT: &str = "20013";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeState {
    Authorized,
    Captured,
    Voided,
    Refunded,
}

#[derive(Debug, Clone)]
struct ChargeEntry {
    state: ChargeState,
    value: MinorUnits,
    refunded: i64,
    track_id: Option<String>,
}

#[derive(Debug, Clone)]
struct TokenEntry {
    value: MinorUnits,
    auto_capture: AutoCapture,
    charge_id: Option<String>,
}

#[derive(Debug, Default)]
struct Ledger {
    next_id: u64,
    calls: usize,
    charges: HashMap<String, ChargeEntry>,
    /// Every issued charge-chain id, mapped to the charge it belongs to.
    links: HashMap<String, String>,
    tokens: HashMap<String, TokenEntry>,
}

impl Ledger {
    fn issue(&mut self, prefix: &str, mode: EndpointMode) -> String {
        self.next_id += 1;
        let env = match mode {
            EndpointMode::Sandbox => "test",
            EndpointMode::Live => "live",
        };
        format!("{}_{}_{}", prefix, env, self.next_id)
    }

    fn open_charge(&mut self, mode: EndpointMode, entry: ChargeEntry) -> String {
        let id = self.issue("charge", mode);
        self.links.insert(id.clone(), id.clone());
        self.charges.insert(id.clone(), entry);
        id
    }

    fn root_of(&self, charge_id: &str) -> Result<String, ExceptionState> {
        self.links
            .get(charge_id)
            .cloned()
            .ok_or_else(|| ExceptionState::new(format!("No charge found with id {}", charge_id)))
    }

    /// Issues a follow-up id on an existing charge chain.
    fn follow_up(&mut self, mode: EndpointMode, root: &str) -> String {
        let id = self.issue("charge", mode);
        self.links.insert(id.clone(), root.to_string());
        id
    }
}

/// A deterministic in-process stand-in for the processor's sandbox.
///
/// Clones share state, so the handle kept by a test or the CLI sees every
/// call made through clients handed out by [`SimulatedProcessor::factory`].
#[derive(Debug, Clone, Default)]
pub struct SimulatedProcessor {
    ledger: Arc<Mutex<Ledger>>,
}

impl SimulatedProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory(&self) -> ProcessorClientFactory {
        let ledger = self.ledger.clone();
        Box::new(move |mode| -> ProcessorClientBox {
            Box::new(SimulatedClient {
                mode,
                ledger: ledger.clone(),
            })
        })
    }

    /// Number of processor calls received so far.
    pub fn calls(&self) -> usize {
        lock(&self.ledger).calls
    }

    /// State of the charge chain that `id` belongs to.
    pub fn charge_state(&self, id: &EntityId) -> Option<ChargeState> {
        let ledger = lock(&self.ledger);
        let root = ledger.links.get(id.as_str())?;
        ledger.charges.get(root).map(|charge| charge.state)
    }
}

fn lock(ledger: &Mutex<Ledger>) -> MutexGuard<'_, Ledger> {
    ledger.lock().unwrap_or_else(PoisonError::into_inner)
}

struct SimulatedClient {
    mode: EndpointMode,
    ledger: Arc<Mutex<Ledger>>,
}

impl SimulatedClient {
    /// Counts the call and checks the key before anything else.
    fn begin(&self, authorization: &SecretKey) -> Result<MutexGuard<'_, Ledger>, ExceptionState> {
        let mut ledger = lock(&self.ledger);
        ledger.calls += 1;
        let key = authorization.expose();
        let accepted = match self.mode {
            EndpointMode::Sandbox => key.starts_with("sk_"),
            EndpointMode::Live => key.starts_with("sk_") && !key.starts_with("sk_test_"),
        };
        if accepted {
            Ok(ledger)
        } else {
            Err(ExceptionState::new(format!(
                "Authentication failed for the {} endpoint",
                self.mode
            )))
        }
    }
}

fn initial_state(auto_capture: AutoCapture) -> ChargeState {
    match auto_capture {
        AutoCapture::Capture => ChargeState::Captured,
        AutoCapture::Authorize => ChargeState::Authorized,
    }
}

fn respond(id: String, track_id: Option<&String>) -> ProcessorResponse {
    let response = ProcessorResponse::approved(id);
    match track_id {
        Some(track_id) => response.with_track_id(track_id.clone()),
        None => response,
    }
}

#[async_trait]
impl ProcessorClient for SimulatedClient {
    async fn get_payment_token(&self, request: &ProcessorRequest<TokenRequest>) -> ProcessorResult {
        let mut ledger = self.begin(&request.authorization)?;
        let params = &request.posted_param;
        if params.value.value() <= 0 {
            return Ok(ProcessorResponse::invalid(CODE_INVALID_AMOUNT, "Value must be positive"));
        }

        let id = ledger.issue("pay_tok", self.mode);
        ledger.tokens.insert(
            id.clone(),
            TokenEntry {
                value: params.value,
                auto_capture: params.auto_capture,
                charge_id: None,
            },
        );
        debug!(token = %id, value = %params.value, "simulated token issued");
        Ok(ProcessorResponse::approved(id))
    }

    async fn create_charge(&self, request: &ProcessorRequest<ChargeRequest>) -> ProcessorResult {
        let mut ledger = self.begin(&request.authorization)?;
        let params = &request.posted_param;
        if params.card_token.trim().is_empty() {
            return Ok(ProcessorResponse::invalid(CODE_INVALID_TRANSACTION, "Card token is required"));
        }
        if params.value.value() <= 0 {
            return Ok(ProcessorResponse::invalid(CODE_INVALID_AMOUNT, "Value must be positive"));
        }
        let track_id = params.track_id.to_string();

        if params.card_token.contains("decline") {
            let id = ledger.issue("charge", self.mode);
            return Ok(ProcessorResponse::declined(id, CODE_DECLINED).with_track_id(track_id));
        }

        let id = ledger.open_charge(
            self.mode,
            ChargeEntry {
                state: initial_state(params.auto_capture),
                value: params.value,
                refunded: 0,
                track_id: Some(track_id.clone()),
            },
        );
        debug!(charge = %id, value = %params.value, "simulated charge created");
        Ok(ProcessorResponse::approved(id).with_track_id(track_id))
    }

    async fn verify_charge_payment_token(
        &self,
        request: &ProcessorRequest<VerifyRequest>,
    ) -> ProcessorResult {
        let mut ledger = self.begin(&request.authorization)?;
        let token_id = request.posted_param.payment_token.as_str();
        let token = ledger.tokens.get(token_id).cloned().ok_or_else(|| {
            ExceptionState::new(format!("No payment token found with id {}", token_id))
        })?;

        let charge_id = match token.charge_id {
            Some(charge_id) => charge_id,
            None => {
                let charge_id = ledger.open_charge(
                    self.mode,
                    ChargeEntry {
                        state: initial_state(token.auto_capture),
                        value: token.value,
                        refunded: 0,
                        track_id: None,
                    },
                );
                if let Some(entry) = ledger.tokens.get_mut(token_id) {
                    entry.charge_id = Some(charge_id.clone());
                }
                charge_id
            }
        };

        let track_id = ledger
            .charges
            .get(&charge_id)
            .and_then(|charge| charge.track_id.clone());
        Ok(respond(charge_id, track_id.as_ref()))
    }

    async fn capture_charge(&self, request: &ProcessorRequest<CaptureRequest>) -> ProcessorResult {
        let mut ledger = self.begin(&request.authorization)?;
        let params = &request.posted_param;
        let root = ledger.root_of(params.charge_id.as_str())?;
        let Some(charge) = ledger.charges.get_mut(&root) else {
            return Err(ExceptionState::new(format!("No charge found with id {}", root)));
        };

        if charge.state != ChargeState::Authorized {
            return Ok(ProcessorResponse::invalid(
                CODE_INVALID_TRANSACTION,
                format!("Charge cannot be captured while {:?}", charge.state),
            ));
        }
        if params.value.value() <= 0 || params.value > charge.value {
            return Ok(ProcessorResponse::invalid(
                CODE_INVALID_AMOUNT,
                "Capture value exceeds the authorized amount",
            ));
        }
        charge.state = ChargeState::Captured;

        let id = ledger.follow_up(self.mode, &root);
        Ok(ProcessorResponse::approved(id).with_track_id(params.track_id.to_string()))
    }

    async fn void_charge(&self, request: &ProcessorRequest<VoidRequest>) -> ProcessorResult {
        let mut ledger = self.begin(&request.authorization)?;
        let params = &request.posted_param;
        let root = ledger.root_of(params.charge_id.as_str())?;
        let Some(charge) = ledger.charges.get_mut(&root) else {
            return Err(ExceptionState::new(format!("No charge found with id {}", root)));
        };

        if charge.state != ChargeState::Authorized {
            return Ok(ProcessorResponse::invalid(
                CODE_INVALID_TRANSACTION,
                format!("Charge cannot be voided while {:?}", charge.state),
            ));
        }
        charge.state = ChargeState::Voided;

        let id = ledger.follow_up(self.mode, &root);
        Ok(ProcessorResponse::approved(id).with_track_id(params.track_id.to_string()))
    }

    async fn refund_charge(&self, request: &ProcessorRequest<RefundRequest>) -> ProcessorResult {
        let mut ledger = self.begin(&request.authorization)?;
        let params = &request.posted_param;
        let root = ledger.root_of(params.charge_id.as_str())?;
        let Some(charge) = ledger.charges.get_mut(&root) else {
            return Err(ExceptionState::new(format!("No charge found with id {}", root)));
        };

        if !matches!(charge.state, ChargeState::Captured | ChargeState::Refunded) {
            return Ok(ProcessorResponse::invalid(
                CODE_INVALID_TRANSACTION,
                format!("Charge cannot be refunded while {:?}", charge.state),
            ));
        }
        let remaining = charge.value.value() - charge.refunded;
        if params.value.value() <= 0 || params.value.value() > remaining {
            return Ok(ProcessorResponse::invalid(
                CODE_INVALID_AMOUNT,
                format!("Refund value exceeds the {} still refundable", remaining),
            ));
        }
        charge.refunded += params.value.value();
        charge.state = ChargeState::Refunded;

        let id = ledger.follow_up(self.mode, &root);
        Ok(ProcessorResponse::approved(id).with_track_id(params.track_id.to_string()))
    }

    async fn update_track_id(
        &self,
        response: &ProcessorResponse,
        order_id: OrderId,
    ) -> Result<(), ExceptionState> {
        let mut ledger = lock(&self.ledger);
        ledger.calls += 1;
        let charge_id = response
            .id
            .as_ref()
            .ok_or_else(|| ExceptionState::new("Response carries no charge id"))?;
        let root = ledger.root_of(charge_id.as_str())?;
        if let Some(charge) = ledger.charges.get_mut(&root) {
            charge.track_id = Some(order_id.to_string());
        }
        Ok(())
    }
}
