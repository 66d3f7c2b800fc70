//! The backend authorization service, as seen from the consent flow.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::authorize::AuthorizationRequest;

#[cfg(test)]
pub mod fake;
#[cfg(test)]
mod test;

mod http;

pub use http::HttpAuthorizationService;

/// One requested permission, described for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ScopeInfo {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidateResponse {
    pub scopes: Vec<ScopeInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub code: String,
    pub message: String,
}

/// Body the authorization service answers with when it rejects a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct ValidationError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub errors: HashMap<String, FieldError>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("the authorization service rejected the request: {0}")]
    Rejected(#[source] ValidationError),
    #[error("the session is no longer authenticated")]
    Unauthenticated,
    #[error("the authorization service answered with status {0}")]
    UnexpectedStatus(u16),
    #[error("the authorization service answered with an unreadable body: {0}")]
    MalformedResponse(String),
    #[error("could not reach the authorization service: {0}")]
    Transport(String),
}

/// The two operations the consent flow needs from the authorization service.
///
/// Implementations don't have to guard against duplicate calls, the flow
/// controller never issues them.
#[async_trait::async_trait]
pub trait AuthorizationService: Send + Sync {
    /// Checks the request and describes the scopes it asks for.
    async fn validate(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<ValidateResponse, ServiceError>;

    /// Records the user's consent.
    async fn accept(&self, request: &AuthorizationRequest) -> Result<(), ServiceError>;
}
