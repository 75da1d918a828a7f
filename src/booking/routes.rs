//! REST endpoints for booking sessions, plus the in-process session registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::availability::Rejection;
use crate::error::{FieldError, WorkflowError};
use crate::timezone::DisplaySlot;

use super::manager::{BookingWorkflow, StepView};
use super::model::{SlotSelection, WorkflowSession};
use super::state::{Action, Step, Transition};

// ── Session registry ────────────────────────────────────────────────────

/// A session plus the time it was last touched.
pub struct TrackedSession {
    pub session: WorkflowSession,
    last_seen: Instant,
}

impl TrackedSession {
    fn touch(&mut self) {
        self.last_seen = Instant::now();
    }
}

pub type SharedSession = Arc<Mutex<TrackedSession>>;

/// In-memory map of live sessions. Each session has its own lock, so one
/// customer's action never waits on another's.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SharedSession>>>,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
        }
    }

    /// Start a fresh session at step 1.
    pub async fn create(&self) -> (Uuid, SharedSession) {
        self.prune().await;
        let id = Uuid::new_v4();
        let shared = Arc::new(Mutex::new(TrackedSession {
            session: WorkflowSession::new(),
            last_seen: Instant::now(),
        }));
        self.sessions.write().await.insert(id, shared.clone());
        info!(session_id = %id, "Booking session started");
        (id, shared)
    }

    pub async fn get(&self, id: Uuid) -> Option<SharedSession> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Drop sessions idle longer than the timeout. Sessions currently in
    /// use are kept.
    pub async fn prune(&self) -> usize {
        let timeout = self.idle_timeout;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, shared| match shared.try_lock() {
            Ok(tracked) => tracked.last_seen.elapsed() <= timeout,
            Err(_) => true,
        });
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, remaining = sessions.len(), "Pruned idle booking sessions");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Spawn a background task that prunes idle sessions every minute.
pub fn spawn_prune_task(registry: SessionRegistry) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            registry.prune().await;
        }
    })
}

// ── Errors ──────────────────────────────────────────────────────────────

/// JSON error body, with the step the session is left on when known.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<FieldError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rejection: Option<Rejection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<Step>,
}

impl ApiError {
    fn unknown_session(id: Uuid) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: format!("Unknown booking session: {id}"),
            fields: Vec::new(),
            rejection: None,
            step: None,
        }
    }

    fn at(mut self, step: Step) -> Self {
        self.step = Some(step);
        self
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        let status = match &err {
            WorkflowError::Validation(_)
            | WorkflowError::SelectionRejected(_)
            | WorkflowError::Timezone(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WorkflowError::LookupNotFound { .. } => StatusCode::NOT_FOUND,
            WorkflowError::IllegalTransition { .. } => StatusCode::CONFLICT,
            WorkflowError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let rejection = match &err {
            WorkflowError::SelectionRejected(r) => Some(r.clone()),
            _ => None,
        };
        Self {
            status,
            error: err.to_string(),
            fields: err.field_errors().to_vec(),
            rejection,
            step: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(&self)).into_response()
    }
}

// ── Handlers ────────────────────────────────────────────────────────────

/// Shared state for booking routes.
#[derive(Clone)]
pub struct BookingRouteState {
    pub workflow: Arc<BookingWorkflow>,
    pub sessions: SessionRegistry,
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    id: Uuid,
    session: WorkflowSession,
    view: StepView,
    #[serde(skip_serializing_if = "Option::is_none")]
    transition: Option<Transition>,
}

#[derive(Debug, Serialize)]
struct SelectionCheck {
    selectable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<Rejection>,
}

#[derive(Debug, Serialize)]
struct SelectionResponse {
    slot: DisplaySlot,
    session: WorkflowSession,
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "appointment-booking"
    }))
}

/// POST /api/sessions
async fn create_session(
    State(state): State<BookingRouteState>,
) -> Result<impl IntoResponse, ApiError> {
    let (id, shared) = state.sessions.create().await;
    let mut tracked = shared.lock().await;
    let view = state.workflow.view(&mut tracked.session).await?;
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            id,
            session: tracked.session.clone(),
            view,
            transition: None,
        }),
    ))
}

/// GET /api/sessions/{id}
async fn get_session(
    State(state): State<BookingRouteState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let shared = state.sessions.get(id).await.ok_or_else(|| ApiError::unknown_session(id))?;
    let mut tracked = shared.lock().await;
    tracked.touch();

    let view = state
        .workflow
        .view(&mut tracked.session)
        .await
        .map_err(|e| ApiError::from(e).at(tracked.session.current_step))?;
    Ok(Json(SessionResponse {
        id,
        session: tracked.session.clone(),
        view,
        transition: None,
    }))
}

/// POST /api/sessions/{id}/actions
async fn apply_action(
    State(state): State<BookingRouteState>,
    Path(id): Path<Uuid>,
    Json(action): Json<Action>,
) -> Result<Json<SessionResponse>, ApiError> {
    let shared = state.sessions.get(id).await.ok_or_else(|| ApiError::unknown_session(id))?;
    let mut tracked = shared.lock().await;
    tracked.touch();

    let transition = state
        .workflow
        .apply(&mut tracked.session, action)
        .await
        .map_err(|e| ApiError::from(e).at(tracked.session.current_step))?;
    let view = state
        .workflow
        .view(&mut tracked.session)
        .await
        .map_err(|e| ApiError::from(e).at(tracked.session.current_step))?;

    Ok(Json(SessionResponse {
        id,
        session: tracked.session.clone(),
        view,
        transition: Some(transition),
    }))
}

/// POST /api/sessions/{id}/selection/check
///
/// Calendar select-allow hook. A rejected selection is a normal answer,
/// not an error.
async fn check_selection(
    State(state): State<BookingRouteState>,
    Path(id): Path<Uuid>,
    Json(selection): Json<SlotSelection>,
) -> Result<Json<SelectionCheck>, ApiError> {
    let shared = state.sessions.get(id).await.ok_or_else(|| ApiError::unknown_session(id))?;
    let mut tracked = shared.lock().await;
    tracked.touch();

    match state.workflow.check_selection(&tracked.session, &selection).await {
        Ok(_) => Ok(Json(SelectionCheck {
            selectable: true,
            reason: None,
        })),
        Err(WorkflowError::SelectionRejected(reason)) => Ok(Json(SelectionCheck {
            selectable: false,
            reason: Some(reason),
        })),
        Err(e) => Err(ApiError::from(e).at(tracked.session.current_step)),
    }
}

/// POST /api/sessions/{id}/selection
async fn select_slot(
    State(state): State<BookingRouteState>,
    Path(id): Path<Uuid>,
    Json(selection): Json<SlotSelection>,
) -> Result<Json<SelectionResponse>, ApiError> {
    let shared = state.sessions.get(id).await.ok_or_else(|| ApiError::unknown_session(id))?;
    let mut tracked = shared.lock().await;
    tracked.touch();

    let slot = state
        .workflow
        .select_slot(&mut tracked.session, &selection)
        .await
        .map_err(|e| ApiError::from(e).at(tracked.session.current_step))?;
    Ok(Json(SelectionResponse {
        slot,
        session: tracked.session.clone(),
    }))
}

/// Build the booking REST routes.
pub fn booking_routes(state: BookingRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session))
        .route("/api/sessions/{id}/actions", post(apply_action))
        .route("/api/sessions/{id}/selection/check", post(check_selection))
        .route("/api/sessions/{id}/selection", post(select_slot))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registry_creates_and_finds_sessions() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let (id, shared) = registry.create().await;
        assert_eq!(shared.lock().await.session.current_step, Step::Agency);
        assert!(registry.get(id).await.is_some());
        assert!(registry.get(Uuid::new_v4()).await.is_none());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn idle_sessions_are_pruned() {
        let registry = SessionRegistry::new(Duration::ZERO);
        let (id, _shared) = registry.create().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(registry.prune().await, 1);
        assert!(registry.get(id).await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn locked_sessions_survive_pruning() {
        let registry = SessionRegistry::new(Duration::ZERO);
        let (id, shared) = registry.create().await;
        let _guard = shared.lock().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(registry.prune().await, 0);
        assert!(registry.get(id).await.is_some());
    }

    #[test]
    fn workflow_errors_map_to_statuses() {
        let cases = [
            (WorkflowError::field("agency", "Please select an agency."), StatusCode::UNPROCESSABLE_ENTITY),
            (WorkflowError::SelectionRejected(Rejection::EmptyRange), StatusCode::UNPROCESSABLE_ENTITY),
            (WorkflowError::not_found("adviser", "unset"), StatusCode::NOT_FOUND),
            (
                WorkflowError::IllegalTransition {
                    step: Step::Agency,
                    action: "back",
                },
                StatusCode::CONFLICT,
            ),
            (
                WorkflowError::Store(crate::error::StoreError::Unavailable("down".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }
}
