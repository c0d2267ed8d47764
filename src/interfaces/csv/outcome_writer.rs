use crate::domain::order::OrderId;
use crate::domain::outcome::{Outcome, OutcomeStatus};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// One line of replay output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeRow {
    pub action: String,
    pub order: Option<OrderId>,
    pub status: OutcomeStatus,
    pub entity: Option<String>,
    pub message: String,
}

impl OutcomeRow {
    pub fn from_outcome(action: impl ToString, order: Option<OrderId>, outcome: &Outcome) -> Self {
        Self {
            action: action.to_string(),
            order,
            status: outcome.status(),
            entity: outcome.entity_id().map(ToString::to_string),
            message: outcome.message().to_string(),
        }
    }

    /// A row for a yes/no query such as `can_capture`.
    pub fn answer(action: impl ToString, order: OrderId, answer: bool) -> Self {
        Self {
            action: action.to_string(),
            order: Some(order),
            status: OutcomeStatus::Ok,
            entity: None,
            message: answer.to_string(),
        }
    }
}

/// Writes outcome rows as CSV with an `action,order,status,entity,message` header.
pub struct OutcomeWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OutcomeWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write(&mut self, row: &OutcomeRow) -> Result<()> {
        self.writer.serialize(row)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
