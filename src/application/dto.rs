//! Data Transfer Objects for the setup endpoint

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::orchestrator::{
    ErrorDetail, GenerationResult, SetupRejection, SetupRequest, SetupResult, SetupStatus,
};

/// Body of `POST /setup`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupRequestBody {
    pub company_name: String,
    /// Raw text of the uploaded YAML or JSON file
    pub openapi_spec: String,
    pub languages: Vec<String>,
    /// Name of the uploaded file, used as the format hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl SetupRequestBody {
    pub fn into_request(self) -> Result<SetupRequest, SetupRejection> {
        Ok(SetupRequest::new(self.company_name, self.openapi_spec, self.languages)?
            .with_format_hint(self.filename))
    }
}

/// One entry of `repos.sdks`: a URL on success, an error object otherwise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SdkEntry {
    Url(String),
    Failed { error: ErrorDetail },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReposBody {
    pub config: String,
    /// Keyed in request order
    pub sdks: IndexMap<String, SdkEntry>,
}

/// Response of a completed setup, for both full and partial success
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupResponse {
    pub status: SetupStatus,
    pub repos: ReposBody,
    pub fingerprint: String,
    pub request_id: Uuid,
}

impl From<&SetupResult> for SetupResponse {
    fn from(result: &SetupResult) -> Self {
        let sdks = result
            .languages
            .iter()
            .map(|(language, outcome)| {
                let entry = match outcome {
                    GenerationResult::Succeeded { location } => SdkEntry::Url(location.to_string()),
                    GenerationResult::Failed { error } => SdkEntry::Failed {
                        error: error.clone(),
                    },
                };
                (language.to_string(), entry)
            })
            .collect();

        Self {
            status: result.status(),
            repos: ReposBody {
                config: result.config.to_string(),
                sdks,
            },
            fingerprint: result.fingerprint.to_string(),
            request_id: result.request_id,
        }
    }
}

/// Body of every non-2xx response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

impl ErrorBody {
    pub fn new(error: ErrorDetail) -> Self {
        Self { error }
    }
}
