//! Use case for running a setup request

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::application::{ApplicationError, SetupRequestBody, SetupResponse};
use crate::orchestrator::SetupOrchestrator;

/// Use case for the `POST /setup` flow
#[derive(Clone)]
pub struct SetupUseCase {
    orchestrator: Arc<SetupOrchestrator>,
    request_timeout: Duration,
}

impl SetupUseCase {
    pub fn new(orchestrator: Arc<SetupOrchestrator>, request_timeout: Duration) -> Self {
        Self {
            orchestrator,
            request_timeout,
        }
    }

    /// Run a request to completion.
    ///
    /// The orchestrator runs on its own task, so dropping this future (the
    /// caller went away) does not abort publishes already in flight; the
    /// caller signals that through `cancel` instead. The request timeout
    /// cancels the same token.
    pub async fn execute(
        &self,
        body: SetupRequestBody,
        cancel: CancellationToken,
    ) -> Result<SetupResponse, ApplicationError> {
        let request = body.into_request()?;
        let request_id = request.request_id;

        let orchestrator = self.orchestrator.clone();
        let run_cancel = cancel.clone();
        let mut run = tokio::spawn(async move { orchestrator.run(request, run_cancel).await });

        let joined = match tokio::time::timeout(self.request_timeout, &mut run).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(
                    request_id = %request_id,
                    timeout = ?self.request_timeout,
                    "Setup timed out, cancelling"
                );
                cancel.cancel();
                run.await
            }
        };

        match joined {
            Ok(Ok(result)) => Ok(SetupResponse::from(&result)),
            Ok(Err(rejection)) => Err(rejection.into()),
            Err(e) => Err(ApplicationError::Internal(format!("setup task failed: {e}"))),
        }
    }
}
