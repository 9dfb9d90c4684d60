//! Render context handed to project templates

use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Render context used for template rendering
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub variables: HashMap<String, JsonValue>,
}

impl RenderContext {
    /// Create a new render context
    pub fn new() -> Self {
        Self {
            variables: HashMap::new(),
        }
    }

    /// Add a variable to the render context
    pub fn add_variable(&mut self, key: &str, value: JsonValue) {
        self.variables.insert(key.to_string(), value);
    }

    /// Convert into a Tera context
    pub fn to_tera_context(&self) -> tera::Context {
        let mut context = tera::Context::new();
        for (key, value) in &self.variables {
            context.insert(key.as_str(), value);
        }
        context
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_variable_replaces_previous_value() {
        let mut context = RenderContext::new();
        context.add_variable("package_name", json!("acme_sdk"));
        context.add_variable("package_name", json!("acme_corp_sdk"));

        assert_eq!(context.variables.len(), 1);
        assert_eq!(context.variables["package_name"], "acme_corp_sdk");
    }

    #[test]
    fn test_to_tera_context_renders() {
        let mut context = RenderContext::new();
        context.add_variable("name", json!("Acme"));

        let rendered =
            tera::Tera::one_off("hello {{ name }}", &context.to_tera_context(), false).unwrap();
        assert_eq!(rendered, "hello Acme");
    }
}
