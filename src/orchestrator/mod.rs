//! Setup orchestrator
//!
//! Drives one request through validation, config building, config
//! publishing and the per-language fan-out, then aggregates the terminal
//! outcome of every language into a [`SetupResult`].

pub mod request;
pub mod result;
pub mod retry;
pub mod state;

pub use request::SetupRequest;
pub use result::*;
pub use retry::{RetryError, RetryPolicy, publish_with_retry};
pub use state::{InvalidTransition, SetupState, SetupStateMachine};

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};

use crate::generation::LanguageId;
use crate::infrastructure::generation::GeneratorRegistry;
use crate::publish::{DestinationKey, PublishArtifact, Publisher};
use crate::sdk_config::{ConfigArtifact, ConfigBuilder};
use crate::settings::OrchestratorSettings;
use crate::spec::{ValidatedSpec, validate};

/// Fan-out and retry limits for one orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub max_fan_out: usize,
    pub retry: RetryPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&OrchestratorSettings::default())
    }
}

impl From<&OrchestratorSettings> for OrchestratorConfig {
    fn from(settings: &OrchestratorSettings) -> Self {
        Self {
            max_fan_out: settings.max_fan_out,
            retry: RetryPolicy::from(&settings.retry),
        }
    }
}

impl From<InvalidTransition> for SetupRejection {
    fn from(error: InvalidTransition) -> Self {
        SetupRejection::new(ErrorKind::Internal, error.to_string())
    }
}

/// Orchestrates config and SDK generation for setup requests.
///
/// Holds no per-request state; every call to [`SetupOrchestrator::run`]
/// owns its own state machine and task set.
#[derive(Clone)]
pub struct SetupOrchestrator {
    registry: Arc<GeneratorRegistry>,
    publisher: Arc<dyn Publisher>,
    config_builder: ConfigBuilder,
    config: OrchestratorConfig,
}

/// Everything one per-language task needs, shared read-only
struct LanguageTask {
    language: LanguageId,
    spec: Arc<ValidatedSpec>,
    config: Arc<ConfigArtifact>,
    registry: Arc<GeneratorRegistry>,
    publisher: Arc<dyn Publisher>,
    retry: RetryPolicy,
    cancel: CancellationToken,
    permits: Arc<Semaphore>,
}

impl SetupOrchestrator {
    pub fn new(
        registry: Arc<GeneratorRegistry>,
        publisher: Arc<dyn Publisher>,
        config_builder: ConfigBuilder,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            registry,
            publisher,
            config_builder,
            config,
        }
    }

    /// Run one request to a terminal state.
    ///
    /// `Err` is a rejection; `Ok` is a completed run, which may still carry
    /// failed languages.
    pub async fn run(
        &self,
        request: SetupRequest,
        cancel: CancellationToken,
    ) -> Result<SetupResult, SetupRejection> {
        let span = info_span!(
            "setup",
            request_id = %request.request_id,
            company = %request.company_name
        );
        self.run_inner(request, cancel).instrument(span).await
    }

    async fn run_inner(
        &self,
        request: SetupRequest,
        cancel: CancellationToken,
    ) -> Result<SetupResult, SetupRejection> {
        let mut machine = SetupStateMachine::new();
        info!(languages = request.languages.len(), "Setup received");

        machine.advance(SetupState::Validating)?;
        if cancel.is_cancelled() {
            return Err(reject(&mut machine, cancelled_rejection()));
        }
        let spec = match validate(&request.spec_document, request.format_hint.as_deref()) {
            Ok(spec) => Arc::new(spec),
            Err(e) => return Err(reject(&mut machine, e.into())),
        };
        info!(
            fingerprint = spec.fingerprint.short(),
            operations = spec.operations.len(),
            "Spec validated"
        );

        machine.advance(SetupState::ConfigBuilding)?;
        let config = match self
            .config_builder
            .build(&request.company_name, &spec, &request.languages)
        {
            Ok(config) => Arc::new(config),
            Err(e) => return Err(reject(&mut machine, e.into())),
        };
        let files = match config.render_files() {
            Ok(files) => files,
            Err(e) => return Err(reject(&mut machine, e.into())),
        };

        machine.advance(SetupState::ConfigPublishing)?;
        let destination = DestinationKey::config(&config.namespace);
        let artifact = PublishArtifact::new(config.description(), files);
        let repo_name = destination.repo_name();
        let config_location = match publish_with_retry(&self.config.retry, &cancel, &repo_name, || {
            self.publisher.publish(&artifact, &destination)
        })
        .await
        {
            Ok(location) => location,
            Err(RetryError::Cancelled) => return Err(reject(&mut machine, cancelled_rejection())),
            Err(RetryError::Failed(e)) => {
                let rejection = SetupRejection::new(ErrorKind::Publish, e.to_string());
                return Err(reject(&mut machine, rejection));
            }
        };
        info!(repo = %repo_name, location = %config_location, "Config repository published");

        machine.advance(SetupState::GeneratingAll)?;
        let outcomes = self
            .generate_all(&request.languages, spec.clone(), config, &cancel)
            .await;

        machine.advance(SetupState::Aggregating)?;
        let result = SetupResult {
            request_id: request.request_id,
            fingerprint: spec.fingerprint.clone(),
            config: config_location,
            languages: aggregate(&request.languages, outcomes),
        };

        machine.advance(SetupState::Completed)?;
        info!(status = ?result.status(), "Setup completed");
        Ok(result)
    }

    /// Fan out one task per language and wait for all of them
    async fn generate_all(
        &self,
        languages: &[LanguageId],
        spec: Arc<ValidatedSpec>,
        config: Arc<ConfigArtifact>,
        cancel: &CancellationToken,
    ) -> HashMap<LanguageId, GenerationResult> {
        let permits = Arc::new(Semaphore::new(self.config.max_fan_out.max(1)));
        let mut tasks = JoinSet::new();
        let mut task_languages = HashMap::new();

        for language in languages {
            let task = LanguageTask {
                language: language.clone(),
                spec: spec.clone(),
                config: config.clone(),
                registry: self.registry.clone(),
                publisher: self.publisher.clone(),
                retry: self.config.retry.clone(),
                cancel: cancel.clone(),
                permits: permits.clone(),
            };
            let span = info_span!("language", language = %language);
            let handle = tasks.spawn(task.run().instrument(span));
            task_languages.insert(handle.id(), language.clone());
        }

        let mut outcomes = HashMap::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, (language, outcome))) => {
                    outcomes.insert(language, outcome);
                }
                Err(e) => {
                    let Some(language) = task_languages.get(&e.id()).cloned() else {
                        continue;
                    };
                    let outcome = if e.is_cancelled() {
                        GenerationResult::Failed {
                            error: ErrorDetail::cancelled(),
                        }
                    } else {
                        warn!(language = %language, "Language task panicked");
                        GenerationResult::failed(ErrorKind::Internal, "language task panicked")
                    };
                    outcomes.insert(language, outcome);
                }
            }
        }
        outcomes
    }
}

impl LanguageTask {
    async fn run(self) -> (LanguageId, GenerationResult) {
        let outcome = self.generate_and_publish().await;
        match &outcome {
            GenerationResult::Succeeded { location } => {
                info!(location = %location, "SDK published");
            }
            GenerationResult::Failed { error } => {
                warn!(kind = %error.kind, error = %error.message, "SDK failed");
            }
        }
        (self.language, outcome)
    }

    async fn generate_and_publish(&self) -> GenerationResult {
        let _permit = tokio::select! {
            permit = self.permits.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => {
                    return GenerationResult::failed(ErrorKind::Internal, "fan-out limiter closed");
                }
            },
            _ = self.cancel.cancelled() => {
                return GenerationResult::Failed {
                    error: ErrorDetail::cancelled(),
                };
            }
        };

        let Some(settings) = self.config.settings_for(&self.language) else {
            return GenerationResult::failed(
                ErrorKind::Internal,
                format!("no settings for {}", self.language),
            );
        };
        let project = match self.registry.get(&self.language) {
            Ok(generator) => generator.generate(&self.spec, settings).await,
            Err(e) => Err(e),
        };
        let project = match project {
            Ok(project) => project,
            Err(e) => return GenerationResult::Failed { error: (&e).into() },
        };

        let destination = DestinationKey::sdk(&settings.namespace, self.language.clone());
        let artifact = PublishArtifact::new(settings.description(), project.artifacts);
        let repo_name = destination.repo_name();
        match publish_with_retry(&self.retry, &self.cancel, &repo_name, || {
            self.publisher.publish(&artifact, &destination)
        })
        .await
        {
            Ok(location) => GenerationResult::Succeeded { location },
            Err(RetryError::Cancelled) => GenerationResult::Failed {
                error: ErrorDetail::cancelled(),
            },
            Err(RetryError::Failed(e)) => GenerationResult::Failed { error: (&e).into() },
        }
    }
}

fn cancelled_rejection() -> SetupRejection {
    SetupRejection::new(ErrorKind::Cancelled, "request was cancelled")
}

fn reject(machine: &mut SetupStateMachine, rejection: SetupRejection) -> SetupRejection {
    if let Err(e) = machine.advance(SetupState::Rejected) {
        return e.into();
    }
    warn!(kind = %rejection.kind, error = %rejection.message, "Setup rejected");
    rejection
}

/// Order outcomes by request; a language without an outcome is an internal failure
fn aggregate(
    languages: &[LanguageId],
    mut outcomes: HashMap<LanguageId, GenerationResult>,
) -> Vec<(LanguageId, GenerationResult)> {
    languages
        .iter()
        .map(|language| {
            let outcome = outcomes.remove(language).unwrap_or_else(|| {
                GenerationResult::failed(ErrorKind::Internal, "language task produced no outcome")
            });
            (language.clone(), outcome)
        })
        .collect()
}
