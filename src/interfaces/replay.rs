use super::csv::event_reader::{EventAction, OrderEvent};
use super::csv::outcome_writer::OutcomeRow;
use crate::application::gateway::Gateway;
use crate::domain::money::Currency;
use crate::domain::request_context::RequestContext;
use crate::error::Result;

const DEFAULT_REFUND_MESSAGE: &str = "Refund";

/// Runs one event through the gateway.
///
/// `Err` means the event itself could not be run (a missing column, a bad
/// currency, a store failure); gateway failures come back as error rows.
pub async fn replay_event(gateway: &Gateway, event: &OrderEvent) -> Result<OutcomeRow> {
    let context = RequestContext::new();
    let action = event.action;

    let row = match action {
        EventAction::Token => {
            let currency = Currency::new(event.require_currency()?)?;
            let outcome = gateway
                .create_payment_token(event.require_amount()?, &currency, &context)
                .await;
            OutcomeRow::from_outcome(action, None, &outcome)
        }
        EventAction::Charge => {
            let order = event.require_order()?;
            let outcome = gateway
                .create_charge(order, event.require_token()?, &context)
                .await?;
            OutcomeRow::from_outcome(action, Some(order), &outcome)
        }
        EventAction::VerifyToken => {
            let order = event.require_order()?;
            let outcome = gateway
                .verify_charge_payment_token(order, event.require_token()?)
                .await?;
            OutcomeRow::from_outcome(action, Some(order), &outcome)
        }
        EventAction::Verify => {
            let outcome = gateway.verify_charge(event.require_token()?).await?;
            OutcomeRow::from_outcome(action, event.order, &outcome)
        }
        EventAction::Capture => {
            let order = event.require_order()?;
            let outcome = gateway.capture(order).await?;
            OutcomeRow::from_outcome(action, Some(order), &outcome)
        }
        EventAction::Void => {
            let order = event.require_order()?;
            let outcome = gateway.void(order).await?;
            OutcomeRow::from_outcome(action, Some(order), &outcome)
        }
        EventAction::Refund => {
            let order = event.require_order()?;
            let message = event.message.as_deref().unwrap_or(DEFAULT_REFUND_MESSAGE);
            let outcome = gateway.refund(order, event.amount, message).await?;
            OutcomeRow::from_outcome(action, Some(order), &outcome)
        }
        EventAction::CanCapture => {
            let order = event.require_order()?;
            OutcomeRow::answer(action, order, gateway.can_capture(order).await?)
        }
        EventAction::CanVoid => {
            let order = event.require_order()?;
            OutcomeRow::answer(action, order, gateway.can_void(order).await?)
        }
    };
    Ok(row)
}
