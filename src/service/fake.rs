//! In-memory authorization service for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use super::{AuthorizationService, ScopeInfo, ServiceError, ValidateResponse};
use crate::authorize::AuthorizationRequest;

pub fn scope(name: &str, description: &str) -> ScopeInfo {
    ScopeInfo {
        name: name.to_owned(),
        description: description.to_owned(),
    }
}

/// Answers `validate` with a fixed outcome and `accept` with queued outcomes
/// (`Ok` once the queue runs out). Either call can be held until its gate is
/// notified.
pub struct FakeService {
    validate_outcome: Result<Vec<ScopeInfo>, ServiceError>,
    accept_outcomes: Mutex<VecDeque<Result<(), ServiceError>>>,
    validate_gate: Option<Arc<Notify>>,
    accept_gate: Option<Arc<Notify>>,
    validate_calls: Mutex<Vec<AuthorizationRequest>>,
    accept_calls: Mutex<Vec<AuthorizationRequest>>,
}

impl FakeService {
    pub fn granting(scopes: Vec<ScopeInfo>) -> Self {
        Self::with_validate_outcome(Ok(scopes))
    }

    pub fn rejecting(error: ServiceError) -> Self {
        Self::with_validate_outcome(Err(error))
    }

    fn with_validate_outcome(validate_outcome: Result<Vec<ScopeInfo>, ServiceError>) -> Self {
        Self {
            validate_outcome,
            accept_outcomes: Mutex::default(),
            validate_gate: None,
            accept_gate: None,
            validate_calls: Mutex::default(),
            accept_calls: Mutex::default(),
        }
    }

    pub fn then_accept(self, outcome: Result<(), ServiceError>) -> Self {
        self.accept_outcomes.lock().unwrap().push_back(outcome);
        self
    }

    pub fn hold_validate(mut self, gate: Arc<Notify>) -> Self {
        self.validate_gate = Some(gate);
        self
    }

    pub fn hold_accept(mut self, gate: Arc<Notify>) -> Self {
        self.accept_gate = Some(gate);
        self
    }

    pub fn validate_calls(&self) -> Vec<AuthorizationRequest> {
        self.validate_calls.lock().unwrap().clone()
    }

    pub fn accept_calls(&self) -> Vec<AuthorizationRequest> {
        self.accept_calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AuthorizationService for FakeService {
    async fn validate(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<ValidateResponse, ServiceError> {
        self.validate_calls.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.validate_gate {
            gate.notified().await;
        }
        self.validate_outcome
            .clone()
            .map(|scopes| ValidateResponse { scopes })
    }

    async fn accept(&self, request: &AuthorizationRequest) -> Result<(), ServiceError> {
        self.accept_calls.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.accept_gate {
            gate.notified().await;
        }
        let outcome = self.accept_outcomes.lock().unwrap().pop_front();
        outcome.unwrap_or(Ok(()))
    }
}
