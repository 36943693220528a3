use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::error::FaceClientError;

/// Connection settings for a Face API resource.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FaceServiceConfig {
    /// Resource endpoint, e.g. `https://my-resource.cognitiveservices.azure.com`.
    pub endpoint: String,
    pub api_key: String,
}

impl fmt::Debug for FaceServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaceServiceConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl FaceServiceConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Check the settings and return the endpoint without trailing slashes.
    pub fn validate(&self) -> Result<String, FaceClientError> {
        if self.api_key.trim().is_empty() {
            return Err(FaceClientError::InvalidConfig("api_key must not be empty".into()));
        }
        let parsed = Url::parse(&self.endpoint)
            .map_err(|e| FaceClientError::InvalidConfig(format!("endpoint '{}': {}", self.endpoint, e)))?;
        if parsed.scheme() != "https" && parsed.scheme() != "http" {
            return Err(FaceClientError::InvalidConfig(format!(
                "endpoint '{}' must use http or https",
                self.endpoint
            )));
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(FaceClientError::InvalidConfig(format!(
                "endpoint '{}' must not carry a query string or fragment",
                self.endpoint
            )));
        }
        Ok(self.endpoint.trim_end_matches('/').to_string())
    }
}
