//! Registry for language generators

use std::collections::HashMap;
use std::sync::Arc;

use super::{PythonGenerator, TypeScriptGenerator};
use crate::generation::{GenerationCause, GenerationError, LanguageGenerator, LanguageId};

/// Registry that maps language ids to their generators
#[derive(Clone)]
pub struct GeneratorRegistry {
    generators: HashMap<LanguageId, Arc<dyn LanguageGenerator>>,
}

impl GeneratorRegistry {
    /// Create an empty registry
    pub fn empty() -> Self {
        Self {
            generators: HashMap::new(),
        }
    }

    /// Create a registry with the built-in generators
    pub fn new() -> Self {
        let mut registry = Self::empty();

        // Register default generators
        registry.register(Arc::new(PythonGenerator::new()));
        registry.register(Arc::new(TypeScriptGenerator::new()));

        registry
    }

    /// Register a generator under the language it reports, replacing any previous one
    pub fn register(&mut self, generator: Arc<dyn LanguageGenerator>) {
        self.generators.insert(generator.language(), generator);
    }

    /// Get the generator for a language
    pub fn get(
        &self,
        language: &LanguageId,
    ) -> Result<Arc<dyn LanguageGenerator>, GenerationError> {
        self.generators
            .get(language)
            .cloned()
            .ok_or_else(|| GenerationError::new(language.clone(), GenerationCause::NoGenerator))
    }

    /// Get all languages with a generator, sorted
    pub fn supported_languages(&self) -> Vec<LanguageId> {
        let mut languages: Vec<_> = self.generators.keys().cloned().collect();
        languages.sort();
        languages
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("languages", &self.supported_languages())
            .finish()
    }
}
