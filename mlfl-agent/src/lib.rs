//! Question dispatch for mlfl
//!
//! Wires a [`SessionManager`](mlfl_core::SessionManager) to an
//! [`AnswerProvider`](mlfl_providers::AnswerProvider).

pub mod assistant;

pub use assistant::{AskOutcome, Assistant};
