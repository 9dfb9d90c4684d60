//! End-to-end setup runs against the in-memory publisher

use async_trait::async_trait;
use sdkforge::generation::{GeneratedProject, GenerationError, LanguageGenerator, LanguageId};
use sdkforge::infrastructure::generation::GeneratorRegistry;
use sdkforge::infrastructure::publish::InMemoryPublisher;
use sdkforge::orchestrator::{
    ErrorKind, OrchestratorConfig, RetryPolicy, SetupOrchestrator, SetupRequest, SetupStatus,
};
use sdkforge::publish::Publisher;
use sdkforge::sdk_config::{ConfigBuilder, LanguageSettings};
use sdkforge::spec::ValidatedSpec;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const MINIMAL: &str = include_str!("fixtures/openapi/minimal.yaml");
const PETSTORE: &str = include_str!("fixtures/openapi/petstore.json");

/// Stands in for a generator backend that always fails
struct FailingGenerator(&'static str);

#[async_trait]
impl LanguageGenerator for FailingGenerator {
    fn language(&self) -> LanguageId {
        LanguageId::new(self.0)
    }

    async fn generate(
        &self,
        _spec: &ValidatedSpec,
        _settings: &LanguageSettings,
    ) -> Result<GeneratedProject, GenerationError> {
        Err(GenerationError::render(self.language(), "simulated generator failure"))
    }
}

fn orchestrator(registry: GeneratorRegistry, publisher: Arc<dyn Publisher>) -> SetupOrchestrator {
    SetupOrchestrator::new(
        Arc::new(registry),
        publisher,
        ConfigBuilder::default(),
        OrchestratorConfig {
            max_fan_out: 4,
            retry: RetryPolicy::none(),
        },
    )
}

fn request(spec: &str, languages: &[&str]) -> SetupRequest {
    SetupRequest::new("Acme", spec, languages.iter().copied()).unwrap()
}

#[tokio::test]
async fn test_acme_minimal_spec_publishes_config_and_both_sdks() {
    let publisher = Arc::new(InMemoryPublisher::new());
    let result = orchestrator(GeneratorRegistry::new(), publisher.clone())
        .run(request(MINIMAL, &["python", "typescript"]), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.status(), SetupStatus::Success);
    assert_eq!(result.config.as_str(), "memory://repos/acme-config");
    assert_eq!(
        result.get(&LanguageId::new("python")).unwrap().location().unwrap().as_str(),
        "memory://repos/acme-python-sdk"
    );
    assert_eq!(
        result.get(&LanguageId::new("typescript")).unwrap().location().unwrap().as_str(),
        "memory://repos/acme-typescript-sdk"
    );

    let config = publisher.get("acme-config").unwrap();
    assert_eq!(config.description, "SDK configuration for Acme");
    assert!(config.files.iter().any(|f| f.path.ends_with("fern/openapi.yaml")));
}

#[tokio::test]
async fn test_unsupported_language_rejected_before_any_publish() {
    let publisher = Arc::new(InMemoryPublisher::new());
    let rejection = orchestrator(GeneratorRegistry::new(), publisher.clone())
        .run(request(MINIMAL, &["python", "cobol"]), CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(rejection.kind, ErrorKind::UnsupportedLanguage);
    assert!(rejection.message.contains("cobol"));
    assert_eq!(publisher.publish_count(), 0);
}

#[tokio::test]
async fn test_empty_and_malformed_specs_never_publish() {
    let publisher = Arc::new(InMemoryPublisher::new());
    let orchestrator = orchestrator(GeneratorRegistry::new(), publisher.clone());

    for (document, kind) in [
        ("", ErrorKind::Parse),
        ("\u{feff}  \n", ErrorKind::Parse),
        ("{ not json: [", ErrorKind::Parse),
        ("openapi: 3.0.0\ninfo:\n  title: x\n", ErrorKind::Semantic),
    ] {
        let rejection = orchestrator
            .run(request(document, &["python"]), CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(rejection.kind, kind, "document {document:?}");
    }

    assert_eq!(publisher.publish_count(), 0);
}

#[tokio::test]
async fn test_failing_python_generator_leaves_typescript_intact() {
    let mut registry = GeneratorRegistry::new();
    registry.register(Arc::new(FailingGenerator("python")));
    let publisher = Arc::new(InMemoryPublisher::new());

    let result = orchestrator(registry, publisher.clone())
        .run(request(PETSTORE, &["python", "typescript"]), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.status(), SetupStatus::Partial);
    let python = result.get(&LanguageId::new("python")).unwrap();
    assert_eq!(python.error().unwrap().kind, ErrorKind::Generation);
    assert!(python.error().unwrap().message.contains("simulated generator failure"));
    assert!(result.get(&LanguageId::new("typescript")).unwrap().is_success());

    assert!(publisher.get("acme-config").is_some());
    assert!(publisher.get("acme-python-sdk").is_none());
}

#[tokio::test]
async fn test_construct_unsupported_by_one_language_is_isolated() {
    let spec = PETSTORE.replace(
        r#""Status": { "type": "string", "enum": ["available", "pending", "sold"] }"#,
        r#""Status": { "not": { "type": "integer" } }"#,
    );
    let publisher = Arc::new(InMemoryPublisher::new());

    let result = orchestrator(GeneratorRegistry::new(), publisher)
        .run(request(&spec, &["python", "typescript"]), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.status(), SetupStatus::Partial);
    assert!(result.get(&LanguageId::new("python")).unwrap().is_success());
    let typescript = result.get(&LanguageId::new("typescript")).unwrap();
    let error = typescript.error().unwrap();
    assert_eq!(error.kind, ErrorKind::Generation);
    assert!(error.message.contains("#/components/schemas/Status"));
}

#[tokio::test]
async fn test_result_keys_equal_deduplicated_request_languages() {
    let orchestrator = orchestrator(GeneratorRegistry::new(), Arc::new(InMemoryPublisher::new()));

    for languages in [
        vec!["python"],
        vec!["typescript", "python"],
        vec!["Python", "python ", "TYPESCRIPT", "typescript"],
    ] {
        let expected: BTreeSet<LanguageId> = languages.iter().map(LanguageId::new).collect();
        let result = orchestrator
            .run(request(PETSTORE, &languages), CancellationToken::new())
            .await
            .unwrap();

        let keys: BTreeSet<LanguageId> =
            result.languages.iter().map(|(id, _)| id.clone()).collect();
        assert_eq!(keys, expected);
        assert_eq!(result.languages.len(), expected.len());
    }
}

#[tokio::test]
async fn test_rerunning_same_request_converges_on_same_locations() {
    let publisher = Arc::new(InMemoryPublisher::new());
    let orchestrator = orchestrator(GeneratorRegistry::new(), publisher.clone());

    let first = orchestrator
        .run(request(PETSTORE, &["python", "typescript"]), CancellationToken::new())
        .await
        .unwrap();
    let second = orchestrator
        .run(request(PETSTORE, &["python", "typescript"]), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(first.fingerprint, second.fingerprint);
    assert_eq!(first.config, second.config);
    assert_eq!(first.languages, second.languages);
    assert_eq!(publisher.repo_names().len(), 3);
    assert_eq!(publisher.publish_count(), 6);
}
