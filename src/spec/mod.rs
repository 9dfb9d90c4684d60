//! Specification intake: parsing, sanity checks, and fingerprinting
//!
//! Nothing downstream ever sees raw text; everything works from a
//! [`ValidatedSpec`].

pub mod errors;
pub mod parser;
pub mod types;
pub mod validator;

pub use errors::SpecError;
pub use parser::OpenApiParser;
pub use types::*;
pub use validator::{canonicalize, fingerprint, validate};
