//! Infrastructure layer - concrete implementations of domain ports

pub mod generation;
pub mod publish;
