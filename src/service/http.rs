use std::time::Duration;

use reqwest::StatusCode;
use tracing::instrument;
use url::Url;

use super::{AuthorizationService, ServiceError, ValidateResponse, ValidationError};
use crate::authorize::AuthorizationRequest;

const VALIDATE_PATH: &str = "authorize/validate/";
const ACCEPT_PATH: &str = "authorize/";

#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    #[error("could not build the http client")]
    Client(#[from] reqwest::Error),
    #[error("invalid authorization service url")]
    Url(#[from] url::ParseError),
}

/// Talks to the authorization service over JSON/HTTP.
#[derive(Debug, Clone)]
pub struct HttpAuthorizationService {
    client: reqwest::Client,
    validate_url: Url,
    accept_url: Url,
}

impl HttpAuthorizationService {
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, ClientBuildError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_client(client, base_url)
    }

    /// Uses an already configured client, e.g. one carrying the user's session.
    pub fn with_client(client: reqwest::Client, base_url: &Url) -> Result<Self, ClientBuildError> {
        // `Url::join` drops the last segment unless the base ends with a slash.
        let mut base_url = base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            validate_url: base_url.join(VALIDATE_PATH)?,
            accept_url: base_url.join(ACCEPT_PATH)?,
        })
    }

    async fn post(
        &self,
        url: &Url,
        request: &AuthorizationRequest,
    ) -> Result<reqwest::Response, ServiceError> {
        let response = self
            .client
            .post(url.clone())
            .json(request)
            .send()
            .await
            .map_err(|error| ServiceError::Transport(error.to_string()))?;

        let status = response.status();
        tracing::trace!(%url, %status, "authorization service answered");

        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ServiceError::Unauthenticated);
        }

        match response.json::<ValidationError>().await {
            Ok(validation_error) => Err(ServiceError::Rejected(validation_error)),
            Err(_) => Err(ServiceError::UnexpectedStatus(status.as_u16())),
        }
    }
}

#[async_trait::async_trait]
impl AuthorizationService for HttpAuthorizationService {
    #[instrument(skip_all, fields(client_id = request.client_id()))]
    async fn validate(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<ValidateResponse, ServiceError> {
        self.post(&self.validate_url, request)
            .await?
            .json::<ValidateResponse>()
            .await
            .map_err(|error| ServiceError::MalformedResponse(error.to_string()))
    }

    #[instrument(skip_all, fields(client_id = request.client_id()))]
    async fn accept(&self, request: &AuthorizationRequest) -> Result<(), ServiceError> {
        self.post(&self.accept_url, request).await.map(|_| ())
    }
}
