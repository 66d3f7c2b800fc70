use crate::service::ServiceError;

/// `validate` failed: the service rejected the request or could not be reached.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("the authorization request could not be validated")]
pub struct ValidationServiceError(#[source] pub ServiceError);

/// `accept` failed. The user may submit again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("the consent could not be submitted")]
pub struct SubmissionError(#[source] pub ServiceError);
