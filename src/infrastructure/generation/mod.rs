//! Generation infrastructure implementations

pub mod python;
pub mod registry;
pub mod schema_plan;
pub mod template_renderer;
pub mod typescript;

pub use python::PythonGenerator;
pub use registry::GeneratorRegistry;
pub use template_renderer::{TemplateFile, TeraTemplateRenderer};
pub use typescript::TypeScriptGenerator;
