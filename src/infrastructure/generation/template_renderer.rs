//! Tera-based renderer for template sets compiled into the binary

use std::error::Error as StdError;
use tera::Tera;

use crate::generation::{Artifact, RenderContext};

/// One template file; both path and body are Tera templates
#[derive(Debug, Clone, Copy)]
pub struct TemplateFile {
    pub path: &'static str,
    pub body: &'static str,
}

impl TemplateFile {
    pub const fn new(path: &'static str, body: &'static str) -> Self {
        Self { path, body }
    }
}

/// Tera-based template renderer
pub struct TeraTemplateRenderer;

impl TeraTemplateRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render every file of a template set against one context.
    ///
    /// Output order follows the order of `files`, so rendering is deterministic.
    pub fn render(
        &self,
        files: &[TemplateFile],
        context: &RenderContext,
    ) -> Result<Vec<Artifact>, String> {
        // Create a new Tera instance for this template set
        let mut tera = Tera::default();
        tera.add_raw_templates(files.iter().map(|file| (file.path, file.body)))
            .map_err(|e| describe("Failed to add templates", &e))?;

        let tera_context = context.to_tera_context();
        files
            .iter()
            .map(|file| {
                let content = tera
                    .render(file.path, &tera_context)
                    .map_err(|e| describe(&format!("Failed to render {}", file.path), &e))?;

                // Render the path as well (it might contain variables)
                let path = if file.path.contains("{{") {
                    Tera::one_off(file.path, &tera_context, false)
                        .map_err(|e| describe("Failed to render path", &e))?
                } else {
                    file.path.to_string()
                };

                Ok(Artifact::new(path, content))
            })
            .collect()
    }
}

impl Default for TeraTemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Tera reports the useful detail in the source chain
fn describe(prefix: &str, error: &tera::Error) -> String {
    let mut message = format!("{prefix}: {error}");
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
