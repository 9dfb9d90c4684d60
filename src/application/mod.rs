//! Application layer - turns wire requests into orchestrator runs

pub mod dto;
pub mod errors;
pub mod setup;

pub use dto::*;
pub use errors::*;
pub use setup::SetupUseCase;
