//! Generation session domain module.
//!
//! This module contains the session state machine that drives the quiz and
//! flashcard generation flows: the session model, the inbound stream event
//! vocabulary, and the transition logic that applies events to state.
//!
//! # Module Structure
//!
//! - `model`: Core session state (`GenerationSession`, `ProgressInfo`,
//!   `GenerationResult`, `LogEntry`)
//! - `event`: Tagged inbound stream events (`StreamEvent`)
//! - `machine`: State transitions (`GenerationSession::apply` and the
//!   one-shot lifecycle entry points)

mod event;
mod machine;
mod model;

// Re-export public API
pub use event::StreamEvent;
pub use machine::Transition;
pub use model::{
    GenerationMode, GenerationResult, GenerationSession, GenerationStep, LogEntry, LogKind,
    ProgressCounters, ProgressInfo, Stage,
};
