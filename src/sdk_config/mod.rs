//! Config repository builder
//!
//! Produces the shared configuration artifact every SDK derives from:
//! repository names, package names, generator pins, and the API definition
//! itself.

pub mod artifact;
pub mod builder;
pub mod errors;
pub mod naming;
pub mod policy;

pub use artifact::{ConfigArtifact, LanguageSettings};
pub use builder::ConfigBuilder;
pub use errors::ConfigError;
pub use policy::{LanguagePolicy, PackageRegistry, supported_languages};
