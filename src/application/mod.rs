//! Application layer orchestrating the payment lifecycle.
//!
//! The [`gateway::Gateway`] facade is the entry point. It delegates processor
//! calls to the [`executor::ChargeExecutor`], which normalizes every result
//! through the [`validator`], and hands outcomes to the
//! [`reconciler::OrderReconciler`] to update the order.

pub mod executor;
pub mod gateway;
pub mod reconciler;
pub mod validator;
