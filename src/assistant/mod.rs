//! Assistant - the single owning context driven by the CLI

mod error;
mod guard;
mod photo;
mod service;

pub use error::AssistError;
pub use service::{Assistant, AssistantStats, Diagnosis, Resolution};
