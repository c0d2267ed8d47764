//! Domain types and the ports through which the gateway reaches the host and the processor.

pub mod charge;
pub mod money;
pub mod order;
pub mod outcome;
pub mod ports;
pub mod request_context;
pub mod response;
pub mod settings;
