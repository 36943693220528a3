use serde::Deserialize;
use thiserror::Error;

/// Errors returned by [`crate::FaceServiceClient`].
#[derive(Debug, Error)]
pub enum FaceClientError {
    /// The service answered with a non-success status.
    #[error("Face API Error: {status} {reason}: {body}")]
    Api {
        status: u16,
        reason: String,
        body: String,
    },
    #[error("Name Conflict: a {kind} named '{name}' already exists")]
    NameConflict { kind: &'static str, name: String },
    #[error("Ambiguous Name: {count} {kind}s are named '{name}'")]
    AmbiguousName {
        kind: &'static str,
        name: String,
        count: usize,
    },
    #[error("Request Error: {0}")]
    Request(String),
    #[error("Decode Error: {0}")]
    Decode(String),
    /// An id that cannot name a single path segment (empty, `.` or `..`).
    #[error("Invalid Id: '{0}'")]
    InvalidId(String),
    #[error("Invalid Config: {0}")]
    InvalidConfig(String),
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    code: String,
}

impl FaceClientError {
    /// Remote error code (e.g. `PersonGroupNotFound`) when the body carries one.
    pub fn api_error_code(&self) -> Option<String> {
        match self {
            FaceClientError::Api { body, .. } => serde_json::from_str::<ErrorEnvelope>(body)
                .ok()
                .map(|envelope| envelope.error.code),
            _ => None,
        }
    }

    /// HTTP status of an [`FaceClientError::Api`] failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            FaceClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display_keeps_reason_and_body() {
        let err = FaceClientError::Api {
            status: 400,
            reason: "Bad Request".into(),
            body: r#"{"error":{"code":"InvalidURL","message":"Invalid image URL."}}"#.into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Bad Request"));
        assert!(msg.contains(r#"{"error":{"code":"InvalidURL","message":"Invalid image URL."}}"#));
        assert_eq!(err.api_error_code().as_deref(), Some("InvalidURL"));
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_api_error_code_absent_for_plain_body() {
        let err = FaceClientError::Api {
            status: 502,
            reason: "Bad Gateway".into(),
            body: "upstream down".into(),
        };
        assert!(err.api_error_code().is_none());
        assert!(FaceClientError::Request("timeout".into()).api_error_code().is_none());
    }
}
