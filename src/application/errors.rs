//! Application layer error types

use axum::http::StatusCode;
use thiserror::Error;

use crate::application::ErrorBody;
use crate::orchestrator::{ErrorDetail, ErrorKind, SetupRejection};

/// Application layer errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("Setup rejected: {0}")]
    Rejected(#[from] SetupRejection),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApplicationError::Rejected(rejection) => rejection.kind,
            ApplicationError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status for the rejection kind
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Parse | ErrorKind::Semantic => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::UnsupportedLanguage | ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Publish => StatusCode::BAD_GATEWAY,
            ErrorKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Generation | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let detail = match self {
            ApplicationError::Rejected(rejection) => rejection.detail(),
            ApplicationError::Internal(message) => {
                ErrorDetail::new(ErrorKind::Internal, message.clone())
            }
        };
        ErrorBody::new(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_by_kind() {
        let status = |kind| ApplicationError::from(SetupRejection::new(kind, "x")).status_code();

        assert_eq!(status(ErrorKind::Parse), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status(ErrorKind::Semantic), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status(ErrorKind::UnsupportedLanguage), StatusCode::BAD_REQUEST);
        assert_eq!(status(ErrorKind::InvalidRequest), StatusCode::BAD_REQUEST);
        assert_eq!(status(ErrorKind::Publish), StatusCode::BAD_GATEWAY);
        assert_eq!(status(ErrorKind::Cancelled), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            ApplicationError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_body_carries_kind_and_message() {
        let error =
            ApplicationError::from(SetupRejection::new(ErrorKind::Parse, "document is empty"));
        let body = serde_json::to_value(error.body()).unwrap();
        assert_eq!(body["error"]["kind"], "parse");
        assert_eq!(body["error"]["message"], "document is empty");
    }
}
