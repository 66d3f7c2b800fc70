use serde::Serialize;
use url::Url;

use super::{AuthorizationRequest, MissingParameterError, SubmissionError, ValidationServiceError};
use crate::service::ScopeInfo;

/// A request the authorization service accepted, with the scopes it described.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub request: AuthorizationRequest,
    pub scopes: Vec<ScopeInfo>,
}

/// Lifecycle of one authorization attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FlowState {
    #[default]
    Idle,
    Parsing,
    ParseError(MissingParameterError),
    Validating(AuthorizationRequest),
    Ready(ValidatedRequest),
    ValidationError(ValidationServiceError),
    Submitting(ValidatedRequest),
    Submitted(ValidatedRequest),
    /// Same data as `Ready`, submitting again is allowed.
    SubmissionError(ValidatedRequest, SubmissionError),
    /// The user refused access. `None` when the `redirect_uri` could not be
    /// turned into a URL.
    Denied(ValidatedRequest, Option<Url>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FlowStateTag {
    Idle,
    Parsing,
    ParseError,
    Validating,
    Ready,
    ValidationError,
    Submitting,
    Submitted,
    SubmissionError,
    Denied,
}

impl FlowState {
    pub fn tag(&self) -> FlowStateTag {
        match self {
            Self::Idle => FlowStateTag::Idle,
            Self::Parsing => FlowStateTag::Parsing,
            Self::ParseError(_) => FlowStateTag::ParseError,
            Self::Validating(_) => FlowStateTag::Validating,
            Self::Ready(_) => FlowStateTag::Ready,
            Self::ValidationError(_) => FlowStateTag::ValidationError,
            Self::Submitting(_) => FlowStateTag::Submitting,
            Self::Submitted(_) => FlowStateTag::Submitted,
            Self::SubmissionError(_, _) => FlowStateTag::SubmissionError,
            Self::Denied(_, _) => FlowStateTag::Denied,
        }
    }

    /// No intent can move the flow out of a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ParseError(_) | Self::ValidationError(_) | Self::Submitted(_) | Self::Denied(_, _)
        )
    }

    /// The validated request, from the moment it exists.
    fn validated(&self) -> Option<&ValidatedRequest> {
        match self {
            Self::Ready(validated)
            | Self::Submitting(validated)
            | Self::Submitted(validated)
            | Self::SubmissionError(validated, _)
            | Self::Denied(validated, _) => Some(validated),
            Self::Idle
            | Self::Parsing
            | Self::ParseError(_)
            | Self::Validating(_)
            | Self::ValidationError(_) => None,
        }
    }

    pub fn request(&self) -> Option<&AuthorizationRequest> {
        match self {
            Self::Validating(request) => Some(request),
            _ => self.validated().map(|validated| &validated.request),
        }
    }

    pub fn view(&self) -> ViewModel {
        ViewModel {
            state: self.tag(),
            request: self.request().cloned(),
            scopes: self
                .validated()
                .map(|validated| validated.scopes.clone())
                .unwrap_or_default(),
            error: matches!(self, Self::ParseError(_) | Self::ValidationError(_)),
            submission_failed: matches!(self, Self::SubmissionError(_, _)),
            redirect: match self {
                Self::Denied(_, redirect) => redirect.clone(),
                _ => None,
            },
        }
    }
}

/// What the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct ViewModel {
    pub state: FlowStateTag,
    pub request: Option<AuthorizationRequest>,
    pub scopes: Vec<ScopeInfo>,
    /// The flow failed for good. Parse and validation failures look the same here.
    pub error: bool,
    /// The last submission failed and can be retried.
    pub submission_failed: bool,
    /// Set once the user denied access.
    #[schema(value_type = Option<String>, format = Uri)]
    pub redirect: Option<Url>,
}
