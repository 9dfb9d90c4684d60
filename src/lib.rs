//! sdkforge: turn one OpenAPI document into a config repository plus one
//! SDK repository per requested language.
#![deny(unsafe_code)]

pub mod application;
pub mod generation;
pub mod infrastructure;
pub mod orchestrator;
pub mod publish;
pub mod sdk_config;
pub mod server;
pub mod settings;
pub mod spec;
