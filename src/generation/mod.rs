//! Generation domain module
//!
//! Types and ports shared by every language generator. Concrete generators
//! and their templates live in `infrastructure::generation`.

pub mod context;
pub mod errors;
pub mod sanitizers;
pub mod traits;
pub mod types;
pub mod utils;

pub use context::*;
pub use errors::*;
pub use traits::*;
pub use types::*;

