//! Backend interaction layer for Studykit.
//!
//! Everything that talks to the generation backend lives here: the
//! endpoint configuration, the one-shot request dispatcher, the mimic
//! stream session, and the [`GenerationManager`] facade that owns the
//! client's single generation session.

pub mod config;
pub mod dispatcher;
pub mod manager;
pub mod stream;

pub use config::BackendConfig;
pub use dispatcher::{Flashcard, RequestDispatcher};
pub use manager::{GenerationManager, QuestionSource};
pub use stream::{MIMIC_STREAM_PATH, MimicInit, MimicInput};
