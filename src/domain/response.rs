use super::order::EntityId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Response code for an approved transaction.
pub const RESPONSE_CODE_APPROVED: &str = "10000";
/// Approved, but flagged by the processor's risk rules.
pub const RESPONSE_CODE_APPROVED_WITH_RISK: &str = "10100";

/// The processor's answer to a single call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessorResponse {
    pub id: Option<EntityId>,
    pub track_id: Option<String>,
    /// The processor's own judgement of the response.
    pub valid: bool,
    pub response_code: Option<String>,
    pub error_code: Option<String>,
    pub event_id: Option<String>,
    pub message: Option<String>,
}

impl ProcessorResponse {
    pub fn approved(id: impl Into<String>) -> Self {
        Self {
            id: Some(EntityId::new(id)),
            valid: true,
            response_code: Some(RESPONSE_CODE_APPROVED.to_string()),
            ..Self::default()
        }
    }

    pub fn declined(id: impl Into<String>, response_code: impl Into<String>) -> Self {
        Self {
            id: Some(EntityId::new(id)),
            valid: true,
            response_code: Some(response_code.into()),
            ..Self::default()
        }
    }

    pub fn invalid(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            valid: false,
            error_code: Some(error_code.into()),
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_track_id(mut self, track_id: impl Into<String>) -> Self {
        self.track_id = Some(track_id.into());
        self
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Codes worth logging when the response is rejected, most specific first.
    pub fn diagnostic(&self) -> String {
        let mut parts = Vec::new();
        if let Some(code) = &self.response_code {
            parts.push(format!("response code {}", code));
        }
        match (&self.event_id, &self.error_code) {
            (Some(event_id), _) => parts.push(format!("event {}", event_id)),
            (None, Some(error_code)) => parts.push(format!("error code {}", error_code)),
            (None, None) => {}
        }
        if let Some(message) = &self.message {
            parts.push(message.clone());
        }
        if parts.is_empty() {
            "no diagnostic supplied".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// A call that could not be completed or was rejected at the protocol level.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExceptionState {
    message: String,
}

impl ExceptionState {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn error_message(&self) -> &str {
        &self.message
    }
}
