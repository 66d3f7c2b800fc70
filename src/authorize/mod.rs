//! The consent flow controller.
//!
//! One [`AuthorizationFlow`] drives one authorization attempt: it parses the
//! page query, asks the authorization service to validate it, then forwards
//! the user's decision. It is the only caller of the [`AuthorizationService`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use itertools::Itertools;
use tokio::sync::watch;
use tracing::{instrument, Instrument};


mod error;
mod query;
mod redirect;
mod state;

pub use error::{SubmissionError, ValidationServiceError};
pub use query::{AuthorizationRequest, MissingParameterError, QueryParameters};
pub use state::{FlowState, FlowStateTag, ValidatedRequest, ViewModel};

use crate::service::{AuthorizationService, ServiceError};

/// Handle on one authorization attempt. Clones share the same attempt.
#[derive(Clone)]
pub struct AuthorizationFlow {
    shared: Arc<Shared>,
}

struct Shared {
    service: Arc<dyn AuthorizationService>,
    state: watch::Sender<FlowState>,
    closed: AtomicBool,
}

impl AuthorizationFlow {
    pub fn new(service: Arc<dyn AuthorizationService>) -> Self {
        let (state, _) = watch::channel(FlowState::Idle);
        Self {
            shared: Arc::new(Shared {
                service,
                state,
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn state(&self) -> FlowState {
        self.shared.state.borrow().clone()
    }

    pub fn view(&self) -> ViewModel {
        self.shared.state.borrow().view()
    }

    /// Notified on every transition.
    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<FlowState> {
        self.shared.state.subscribe()
    }

    /// Applies `next` to the current state under the channel lock. Returns
    /// whether a transition happened. Once closed, nothing changes.
    fn transition(&self, next: impl FnOnce(&FlowState) -> Option<FlowState>) -> bool {
        let closed = &self.shared.closed;
        self.shared.state.send_if_modified(|state| {
            if closed.load(Ordering::Acquire) {
                return false;
            }
            match next(state) {
                Some(next) => {
                    tracing::debug!(from = ?state.tag(), to = ?next.tag(), "flow transition");
                    *state = next;
                    true
                }
                None => false,
            }
        })
    }

    /// Parses `params` and validates the resulting request. Only the first
    /// call does anything, later ones return the current view.
    #[instrument(name = "start_authorization_flow", skip_all)]
    pub async fn start(&self, params: &QueryParameters) -> ViewModel {
        if !self.transition(|state| matches!(state, FlowState::Idle).then_some(FlowState::Parsing)) {
            tracing::debug!("flow already started");
            return self.view();
        }

        let request = match AuthorizationRequest::parse(params) {
            Ok(request) => request,
            Err(error) => {
                tracing::warn!(%error, "rejecting authorization request");
                self.transition(|state| {
                    matches!(state, FlowState::Parsing).then_some(FlowState::ParseError(error))
                });
                return self.view();
            }
        };

        if !self.transition(|state| {
            matches!(state, FlowState::Parsing).then(|| FlowState::Validating(request.clone()))
        }) {
            return self.view();
        }

        // Applied on its own task: dropping this future must not strand the
        // flow in `Validating`. Same for `Submitting` below.
        let flow = self.clone();
        let validation = tokio::spawn(
            async move {
                let next = match flow.shared.service.validate(&request).await {
                    Ok(response) => {
                        tracing::debug!(
                            client_id = request.client_id(),
                            scopes = %response.scopes.iter().map(|scope| &scope.name).join(" "),
                            "authorization request validated"
                        );
                        FlowState::Ready(ValidatedRequest {
                            request,
                            scopes: response.scopes,
                        })
                    }
                    Err(error) => {
                        tracing::warn!(%error, "authorization request failed validation");
                        FlowState::ValidationError(ValidationServiceError(error))
                    }
                };
                flow.transition(|state| matches!(state, FlowState::Validating(_)).then_some(next))
            }
            .in_current_span(),
        );

        match validation.await {
            Ok(true) => {}
            Ok(false) => tracing::debug!("ignoring validation response for a closed flow"),
            Err(error) => {
                tracing::error!(%error, "validation task failed");
                self.transition(|state| {
                    matches!(state, FlowState::Validating(_)).then(|| {
                        FlowState::ValidationError(ValidationServiceError(ServiceError::Transport(
                            error.to_string(),
                        )))
                    })
                });
            }
        }
        self.view()
    }

    /// The user accepts. Allowed from `Ready` and after a failed submission;
    /// anything else, a submission in flight included, is ignored.
    #[instrument(name = "submit_consent", skip_all)]
    pub async fn submit(&self) -> ViewModel {
        let mut submitting = None;
        self.transition(|state| match state {
            FlowState::Ready(validated) | FlowState::SubmissionError(validated, _) => {
                submitting = Some(validated.clone());
                Some(FlowState::Submitting(validated.clone()))
            }
            _ => None,
        });

        let Some(validated) = submitting else {
            tracing::debug!(state = ?self.state().tag(), "ignoring submit");
            return self.view();
        };

        let flow = self.clone();
        let submission = tokio::spawn(
            async move {
                let outcome = flow.shared.service.accept(&validated.request).await;
                if let Err(error) = &outcome {
                    tracing::warn!(%error, "consent submission failed");
                }
                flow.transition(|state| match state {
                    FlowState::Submitting(validated) => Some(match outcome {
                        Ok(()) => FlowState::Submitted(validated.clone()),
                        Err(error) => {
                            FlowState::SubmissionError(validated.clone(), SubmissionError(error))
                        }
                    }),
                    _ => None,
                })
            }
            .in_current_span(),
        );

        match submission.await {
            Ok(true) => {}
            Ok(false) => tracing::debug!("ignoring accept response for a closed flow"),
            Err(error) => {
                tracing::error!(%error, "submission task failed");
                self.transition(|state| match state {
                    FlowState::Submitting(validated) => Some(FlowState::SubmissionError(
                        validated.clone(),
                        SubmissionError(ServiceError::Transport(error.to_string())),
                    )),
                    _ => None,
                });
            }
        }
        self.view()
    }

    /// The user refuses access. Allowed wherever `submit` is, except while a
    /// submission is in flight.
    #[instrument(name = "deny_consent", skip_all)]
    pub fn cancel(&self) -> ViewModel {
        let denied = self.transition(|state| match state {
            FlowState::Ready(validated) | FlowState::SubmissionError(validated, _) => {
                let redirect = redirect::access_denied(&validated.request)
                    .map_err(|error| {
                        tracing::warn!(%error, "redirect_uri is not a valid url");
                    })
                    .ok();
                Some(FlowState::Denied(validated.clone(), redirect))
            }
            _ => None,
        });
        if !denied {
            tracing::debug!(state = ?self.state().tag(), "ignoring cancel");
        }
        self.view()
    }

    /// Tears the flow down. Responses still in flight are dropped when they
    /// arrive and no further transition happens.
    pub fn close(&self) {
        let closed = &self.shared.closed;
        self.shared.state.send_if_modified(|_| {
            closed.store(true, Ordering::Release);
            false
        });
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}
