use crate::domain::response::{
    ProcessorResponse, RESPONSE_CODE_APPROVED, RESPONSE_CODE_APPROVED_WITH_RISK,
};

/// Response codes the processor uses for a successful transaction.
pub const ACCEPTED_RESPONSE_CODES: &[&str] = &[RESPONSE_CODE_APPROVED, RESPONSE_CODE_APPROVED_WITH_RISK];

/// Decides whether a received response can be treated as a success.
///
/// The response must report itself valid, and its response code, when one is
/// present, must be on the allow-list. Transport failures never reach here.
pub fn validate(response: &ProcessorResponse) -> bool {
    if !response.is_valid() {
        return false;
    }

    match response.response_code.as_deref() {
        Some(code) => ACCEPTED_RESPONSE_CODES.contains(&code.trim()),
        None => true,
    }
}
