//! HTTP adapter for the consent page.
//!
//! Each visit of the consent page gets its own [`AuthorizationFlow`], addressed
//! by the `flow_id` returned when it is created. Flows that reach a terminal
//! state are forgotten once their final view has been returned, and flows left
//! untouched for the configured idle timeout are discarded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::{Instant, MissedTickBehavior};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::authorize::{
    AuthorizationFlow, AuthorizationRequest, FlowStateTag, QueryParameters, ViewModel,
};
use crate::service::{AuthorizationService, ScopeInfo};


pub type FlowId = u64;

#[derive(OpenApi)]
#[openapi(
    paths(start_flow, get_flow, submit_flow, cancel_flow, close_flow),
    components(schemas(FlowResponse, ViewModel, FlowStateTag, AuthorizationRequest, ScopeInfo)),
    tags((name = "authorize", description = "Consent to an application's authorization request"))
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    service: Arc<dyn AuthorizationService>,
    flows: Arc<RwLock<HashMap<FlowId, RegisteredFlow>>>,
    next_id: Arc<AtomicU64>,
    idle_timeout: Duration,
}

struct RegisteredFlow {
    flow: AuthorizationFlow,
    touched: Instant,
}

impl RegisteredFlow {
    fn is_idle(&self, now: Instant, idle_timeout: Duration) -> bool {
        now.duration_since(self.touched) >= idle_timeout
    }
}

impl AppState {
    /// Flows untouched for `idle_timeout` are discarded.
    pub fn new(service: Arc<dyn AuthorizationService>, idle_timeout: Duration) -> Self {
        Self {
            service,
            flows: Arc::default(),
            next_id: Arc::new(AtomicU64::new(1)),
            idle_timeout,
        }
    }

    async fn register(&self) -> (FlowId, AuthorizationFlow) {
        let flow_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let flow = AuthorizationFlow::new(self.service.clone());
        let registered = RegisteredFlow {
            flow: flow.clone(),
            touched: Instant::now(),
        };
        self.flows.write().await.insert(flow_id, registered);
        (flow_id, flow)
    }

    /// Looks the flow up and marks it as used. An idle flow is discarded
    /// instead, even if the sweep has not reached it yet.
    async fn flow(&self, flow_id: FlowId) -> Result<AuthorizationFlow, ApiError> {
        let now = Instant::now();
        let mut flows = self.flows.write().await;

        let registered = flows
            .get_mut(&flow_id)
            .ok_or(ApiError::UnknownFlow(flow_id))?;
        if !registered.is_idle(now, self.idle_timeout) {
            registered.touched = now;
            return Ok(registered.flow.clone());
        }

        if let Some(expired) = flows.remove(&flow_id) {
            tracing::debug!(flow_id, "discarding idle flow");
            expired.flow.close();
        }
        Err(ApiError::UnknownFlow(flow_id))
    }

    /// Drops the flow from the registry if nothing can happen to it anymore.
    async fn settle(&self, flow_id: FlowId, flow: &AuthorizationFlow) {
        if flow.state().is_terminal() {
            tracing::debug!(flow_id, "forgetting finished flow");
            self.flows.write().await.remove(&flow_id);
        }
    }

    async fn discard_idle_flows(&self) {
        let now = Instant::now();
        let mut flows = self.flows.write().await;
        flows.retain(|&flow_id, registered| {
            let idle = registered.is_idle(now, self.idle_timeout);
            if idle {
                tracing::debug!(flow_id, "discarding idle flow");
                registered.flow.close();
            }
            !idle
        });
    }

    /// Discards idle flows every `idle_timeout`, for flows nobody asks about
    /// again. Runs until the runtime shuts down.
    pub async fn sweep_idle_flows(self) {
        let mut sweep = tokio::time::interval(self.idle_timeout);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            sweep.tick().await;
            self.discard_idle_flows().await;
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FlowResponse {
    flow_id: u64,
    view: ViewModel,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unknown authorization flow {0}")]
    UnknownFlow(FlowId),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::UnknownFlow(_) => (StatusCode::NOT_FOUND, self.to_string()).into_response(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/authorize", get(start_flow))
        .route("/authorize/:flow_id", get(get_flow).delete(close_flow))
        .route("/authorize/:flow_id/submit", post(submit_flow))
        .route("/authorize/:flow_id/cancel", post(cancel_flow))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[utoipa::path(
    get,
    path = "/authorize",
    tag = "authorize",
    params(QueryParameters),
    responses(
        (status = 200, description = "
A new flow, already validated against the authorization service.

If a required parameter is missing or the authorization service rejects the request, `view.error` is set and the flow is over.", body = FlowResponse),
        (status = 400, description = "The query is not in urlencoded format.")
    )
)]
pub async fn start_flow(
    State(app): State<AppState>,
    params: QueryParameters,
) -> Json<FlowResponse> {
    let (flow_id, flow) = app.register().await;
    let view = flow.start(&params).await;
    app.settle(flow_id, &flow).await;
    Json(FlowResponse { flow_id, view })
}

#[utoipa::path(
    get,
    path = "/authorize/{flow_id}",
    tag = "authorize",
    params(("flow_id" = u64, Path, description = "Flow returned by `GET /authorize`")),
    responses(
        (status = 200, description = "Current view of the flow.", body = FlowResponse),
        (status = 404, description = "Unknown, finished or expired flow.")
    )
)]
pub async fn get_flow(
    State(app): State<AppState>,
    Path(flow_id): Path<FlowId>,
) -> Result<Json<FlowResponse>, ApiError> {
    let view = app.flow(flow_id).await?.view();
    Ok(Json(FlowResponse { flow_id, view }))
}

#[utoipa::path(
    post,
    path = "/authorize/{flow_id}/submit",
    tag = "authorize",
    params(("flow_id" = u64, Path, description = "Flow returned by `GET /authorize`")),
    responses(
        (status = 200, description = "
The user accepted. The view is `submitted` on success, `submission_error` if the authorization service refused it (submitting again is allowed), or unchanged if the flow was not ready.", body = FlowResponse),
        (status = 404, description = "Unknown, finished or expired flow.")
    )
)]
pub async fn submit_flow(
    State(app): State<AppState>,
    Path(flow_id): Path<FlowId>,
) -> Result<Json<FlowResponse>, ApiError> {
    let flow = app.flow(flow_id).await?;
    let view = flow.submit().await;
    app.settle(flow_id, &flow).await;
    Ok(Json(FlowResponse { flow_id, view }))
}

#[utoipa::path(
    post,
    path = "/authorize/{flow_id}/cancel",
    tag = "authorize",
    params(("flow_id" = u64, Path, description = "Flow returned by `GET /authorize`")),
    responses(
        (status = 200, description = "
The user refused access. `view.redirect` is the client's redirect_uri with `error=access_denied` and the `state` parameter preserved as-is added to the query string.", body = FlowResponse),
        (status = 404, description = "Unknown, finished or expired flow.")
    )
)]
pub async fn cancel_flow(
    State(app): State<AppState>,
    Path(flow_id): Path<FlowId>,
) -> Result<Json<FlowResponse>, ApiError> {
    let flow = app.flow(flow_id).await?;
    let view = flow.cancel();
    app.settle(flow_id, &flow).await;
    Ok(Json(FlowResponse { flow_id, view }))
}

#[utoipa::path(
    delete,
    path = "/authorize/{flow_id}",
    tag = "authorize",
    params(("flow_id" = u64, Path, description = "Flow returned by `GET /authorize`")),
    responses(
        (status = 204, description = "The page was left. Answers still pending from the authorization service are ignored."),
        (status = 404, description = "Unknown, finished or expired flow.")
    )
)]
pub async fn close_flow(
    State(app): State<AppState>,
    Path(flow_id): Path<FlowId>,
) -> Result<StatusCode, ApiError> {
    let registered = app
        .flows
        .write()
        .await
        .remove(&flow_id)
        .ok_or(ApiError::UnknownFlow(flow_id))?;
    registered.flow.close();
    Ok(StatusCode::NO_CONTENT)
}
