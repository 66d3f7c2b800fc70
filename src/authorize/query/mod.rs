//! This module turns the consent page query into an [`AuthorizationRequest`].
//!
//! Parsing happens in two steps. The raw, still percent-encoded query string is
//! first decoded into [`QueryParameters`], then [`AuthorizationRequest::parse`]
//! checks the required parameters. Only the second step can reject a request.

use std::collections::HashMap;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::instrument;


mod openapi;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum AuthorizationQueryParams {
    ResponseType,
    ClientId,
    RedirectUri,
    Scope,
    State,
    CodeChallenge,
    CodeChallengeMethod,
}

impl AuthorizationQueryParams {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ResponseType => "response_type",
            Self::ClientId => "client_id",
            Self::RedirectUri => "redirect_uri",
            Self::Scope => "scope",
            Self::State => "state",
            Self::CodeChallenge => "code_challenge",
            Self::CodeChallengeMethod => "code_challenge_method",
        }
    }
}

/// The query parameters of the consent page, already decoded.
///
/// Only the first occurrence of a repeated key is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParameters(HashMap<String, String>);

impl QueryParameters {
    /// Returns the value of `key`. Parameters without values count as unsent,
    /// as per section 3.1 of RFC 6749.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut parameters = HashMap::new();
        for (key, value) in iter {
            parameters.entry(key.into()).or_insert_with(|| value.into());
        }
        Self(parameters)
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("the query is not in urlencoded format")]
pub struct QueryFormatError;

impl std::str::FromStr for QueryParameters {
    type Err = QueryFormatError;

    /// Decodes a still percent-encoded query string.
    fn from_str(query: &str) -> Result<Self, Self::Err> {
        let pairs = serde_urlencoded::from_str::<Vec<(String, String)>>(query)
            .map_err(|_| QueryFormatError)?;
        Ok(pairs.into_iter().collect())
    }
}

impl IntoResponse for QueryFormatError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for QueryParameters
where
    S: Send + Sync,
{
    type Rejection = QueryFormatError;

    #[instrument(name = "decode_consent_query", skip_all)]
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = parts.uri.query().unwrap_or_default();
        query.parse()
    }
}

/// A required parameter was not sent. Holds the name of the first one missing.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
#[error("missing parameter {0:?}")]
pub struct MissingParameterError(pub &'static str);

/// Represents one pending delegation request.
///
/// The only way to build one is [`AuthorizationRequest::parse`], so a value of
/// this type always has its three required parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct AuthorizationRequest {
    response_type: String,
    client_id: String,
    redirect_uri: String,
    scope: Option<String>,
    state: Option<String>,
    code_challenge: Option<String>,
    code_challenge_method: Option<String>,
}

impl AuthorizationRequest {
    /// Extracts the request from `params`, failing on the first required
    /// parameter missing, in the order `response_type`, `client_id`,
    /// `redirect_uri`.
    #[instrument(name = "parse_authorization_request", skip_all)]
    pub fn parse(params: &QueryParameters) -> Result<Self, MissingParameterError> {
        use AuthorizationQueryParams as Params;

        let required = |param: Params| {
            params
                .get(param.name())
                .map(str::to_owned)
                .ok_or(MissingParameterError(param.name()))
        };
        let optional = |param: Params| params.get(param.name()).map(str::to_owned);

        let result = AuthorizationRequest {
            response_type: required(Params::ResponseType)?,
            client_id: required(Params::ClientId)?,
            redirect_uri: required(Params::RedirectUri)?,
            scope: optional(Params::Scope),
            state: optional(Params::State),
            code_challenge: optional(Params::CodeChallenge),
            code_challenge_method: optional(Params::CodeChallengeMethod),
        };

        tracing::trace!(
            response_type = result.response_type(),
            client_id = result.client_id(),
            redirect_uri = result.redirect_uri(),
            scope = result.scope(),
            state = result.state(),
            code_challenge = result.code_challenge(),
            code_challenge_method = result.code_challenge_method(),
            "consent query accepted"
        );

        Ok(result)
    }

    pub fn response_type(&self) -> &str {
        &self.response_type
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn code_challenge(&self) -> Option<&str> {
        self.code_challenge.as_deref()
    }

    pub fn code_challenge_method(&self) -> Option<&str> {
        self.code_challenge_method.as_deref()
    }
}
