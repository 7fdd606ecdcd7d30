use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::auth::{
    AUTHORIZED_AT_HEADER, CAPABILITIES_HEADER, CLINICIAN_HEADER, CORRELATION_HEADER,
    RawCallerHeaders, TENANT_HEADER, authenticate,
};
use api_shared::{
    CreateNoteReq, ErrorRes, EstablishSessionReq, EstablishSessionRes, GateDecisionRes,
    GateVerdict, HealthRes, HealthService, NoteActionRes, NoteActionView, NoteView, ReadNoteRes,
    SessionView,
};
use recordgate_core::constants::{
    DEFAULT_AUTHORIZED_AT_MAX_AGE_SECS, DEFAULT_CLOCK_SKEW_TOLERANCE_SECS,
    DEFAULT_SESSION_TTL_SECS, READ_NOTE_CAPABILITY,
};
use recordgate_core::{
    AccessDecisionGate, AuthContext, ClinicalRecordLifecycle, CoreConfig, EstablishSessionInput,
    InMemoryNoteRepository, LifecycleError, NoteDraft, RawGateRequest,
    SessionContextEstablisher, SystemClock, TracingAuditSink, UuidIdSource,
    duration_secs_from_env_value,
};
use recordgate_types::{EncounterId, NoteId, PatientId};

/// Application state shared across REST API handlers
///
/// Holds the three core services behind `Arc` so handlers can evaluate
/// access decisions, establish sessions, and drive the note lifecycle.
#[derive(Clone)]
struct AppState {
    gate: Arc<AccessDecisionGate>,
    establisher: Arc<SessionContextEstablisher>,
    lifecycle: Arc<ClinicalRecordLifecycle<InMemoryNoteRepository>>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        evaluate_gate,
        establish_session,
        create_note,
        finalize_note,
        sign_note,
        lock_note,
        read_note
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        GateDecisionRes,
        GateVerdict,
        EstablishSessionReq,
        EstablishSessionRes,
        SessionView,
        CreateNoteReq,
        NoteActionRes,
        NoteActionView,
        ReadNoteRes,
        NoteView
    ))
)]
struct ApiDoc;

/// Main entry point for the RecordGate application
///
/// Starts the REST server on port 3000 (configurable via RECORDGATE_ADDR).
///
/// # Environment Variables
/// - `RECORDGATE_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `RECORDGATE_SESSION_TTL_SECS`: patient session lifetime (default: 3600)
/// - `RECORDGATE_AUTHORIZED_AT_MAX_AGE_SECS`: read authorisation age limit (default: 900)
/// - `RECORDGATE_CLOCK_SKEW_TOLERANCE_SECS`: forward clock skew tolerance (default: 300)
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If server startup or runtime fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("recordgate=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("RECORDGATE_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(config_from_env()?);
    let clock = Arc::new(SystemClock);
    let ids = Arc::new(UuidIdSource);
    let audit = Arc::new(TracingAuditSink);

    let state = AppState {
        gate: Arc::new(AccessDecisionGate::new(
            clock.clone(),
            ids.clone(),
            audit.clone(),
        )),
        establisher: Arc::new(SessionContextEstablisher::new(
            cfg.clone(),
            clock.clone(),
            audit.clone(),
        )),
        lifecycle: Arc::new(ClinicalRecordLifecycle::new(
            cfg,
            Arc::new(InMemoryNoteRepository::new()),
            clock,
            ids,
            audit,
        )),
    };

    tracing::info!("++ Starting RecordGate REST on {}", rest_addr);

    let app = Router::new()
        .route("/health", get(health))
        .route("/gate/decisions", post(evaluate_gate))
        .route("/sessions", post(establish_session))
        .route("/notes", post(create_note))
        .route("/notes/:id/finalize", post(finalize_note))
        .route("/notes/:id/sign", post(sign_note))
        .route("/notes/:id/lock", post(lock_note))
        .route("/notes/:id", get(read_note))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Resolve core configuration from the environment, once, at startup.
fn config_from_env() -> anyhow::Result<CoreConfig> {
    let session_ttl = duration_secs_from_env_value(
        std::env::var("RECORDGATE_SESSION_TTL_SECS").ok(),
        DEFAULT_SESSION_TTL_SECS,
    )?;
    let max_age = duration_secs_from_env_value(
        std::env::var("RECORDGATE_AUTHORIZED_AT_MAX_AGE_SECS").ok(),
        DEFAULT_AUTHORIZED_AT_MAX_AGE_SECS,
    )?;
    let skew = duration_secs_from_env_value(
        std::env::var("RECORDGATE_CLOCK_SKEW_TOLERANCE_SECS").ok(),
        DEFAULT_CLOCK_SKEW_TOLERANCE_SECS,
    )?;
    Ok(CoreConfig::new(
        session_ttl,
        max_age,
        skew,
        READ_NOTE_CAPABILITY.into(),
    )?)
}

fn caller_headers(headers: &HeaderMap) -> RawCallerHeaders {
    let value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };
    RawCallerHeaders {
        tenant_id: value(TENANT_HEADER),
        clinician_id: value(CLINICIAN_HEADER),
        authorized_at: value(AUTHORIZED_AT_HEADER),
        correlation_id: value(CORRELATION_HEADER),
        capabilities: value(CAPABILITIES_HEADER),
    }
}

/// Authenticate the caller for a mutating route, or produce the generic
/// unauthenticated response.
fn require_auth(headers: &HeaderMap) -> Result<AuthContext, (StatusCode, Json<ErrorRes>)> {
    authenticate(&caller_headers(headers)).map_err(|e| {
        tracing::warn!(reason = %e, "request authentication failed");
        (StatusCode::UNAUTHORIZED, Json(ErrorRes::denied()))
    })
}

/// Collapse a lifecycle failure into a status code and a generic body.
fn lifecycle_failure(err: LifecycleError) -> (StatusCode, Json<ErrorRes>) {
    let status = match &err {
        LifecycleError::InvalidInput(_) | LifecycleError::MissingSigner => StatusCode::BAD_REQUEST,
        // Tenant-foreign notes read as absent.
        LifecycleError::NotFound | LifecycleError::TenantMismatch => StatusCode::NOT_FOUND,
        LifecycleError::InvalidTransition { .. } => StatusCode::CONFLICT,
        LifecycleError::IdSource(_) | LifecycleError::Repository(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "lifecycle operation failed");
        (status, Json(ErrorRes::internal()))
    } else {
        tracing::debug!(error = %err, "lifecycle operation denied");
        (status, Json(ErrorRes::denied()))
    }
}

fn parse_note_id(raw: &str) -> Result<NoteId, (StatusCode, Json<ErrorRes>)> {
    // A malformed id can't name any stored note.
    NoteId::parse(raw).map_err(|_| (StatusCode::NOT_FOUND, Json(ErrorRes::denied())))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks.
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/gate/decisions",
    responses(
        (status = 200, description = "Access decision verdict", body = GateDecisionRes)
    )
)]
/// Evaluate an access decision
///
/// The gate never fails from the caller's point of view: malformed or
/// contradictory requests produce a deny verdict, and the response never
/// says why a request was denied.
async fn evaluate_gate(
    State(state): State<AppState>,
    Json(req): Json<RawGateRequest>,
) -> Json<GateDecisionRes> {
    let decision = state.gate.evaluate(&req);
    Json(GateDecisionRes::from(&decision))
}

#[utoipa::path(
    post,
    path = "/sessions",
    request_body = EstablishSessionReq,
    responses(
        (status = 201, description = "Patient session established", body = EstablishSessionRes),
        (status = 400, description = "Session rejected", body = ErrorRes)
    )
)]
/// Establish a bounded-lifetime patient session context
///
/// Fails closed: any missing or malformed mandatory field rejects the
/// whole request with a generic body. The auth token is never echoed.
async fn establish_session(
    State(state): State<AppState>,
    Json(req): Json<EstablishSessionReq>,
) -> Result<(StatusCode, Json<EstablishSessionRes>), (StatusCode, Json<ErrorRes>)> {
    let input = EstablishSessionInput {
        auth_token: req.auth_token,
        tenant_id: req.tenant_id,
        patient_id: req.patient_id,
        consent_proof: None,
    };
    match state.establisher.establish(input) {
        Ok(session) => Ok((
            StatusCode::CREATED,
            Json(EstablishSessionRes::from(&session)),
        )),
        Err(e) => {
            tracing::debug!(error = %e, "session establishment rejected");
            Err((StatusCode::BAD_REQUEST, Json(ErrorRes::denied())))
        }
    }
}

#[utoipa::path(
    post,
    path = "/notes",
    request_body = CreateNoteReq,
    responses(
        (status = 201, description = "Draft note created", body = NoteActionRes),
        (status = 400, description = "Invalid input", body = ErrorRes),
        (status = 401, description = "Unauthenticated", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Create a draft clinical note in the caller's tenant
async fn create_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateNoteReq>,
) -> Result<(StatusCode, Json<NoteActionRes>), (StatusCode, Json<ErrorRes>)> {
    let auth = require_auth(&headers)?;
    let draft = NoteDraft {
        encounter_id: EncounterId::parse(&req.encounter_id)
            .map_err(|_| (StatusCode::BAD_REQUEST, Json(ErrorRes::denied())))?,
        patient_id: PatientId::parse(&req.patient_id)
            .map_err(|_| (StatusCode::BAD_REQUEST, Json(ErrorRes::denied())))?,
        content: req.content,
    };
    let note = state
        .lifecycle
        .start_draft(&auth, draft)
        .map_err(lifecycle_failure)?;
    Ok((StatusCode::CREATED, Json(NoteActionRes::from(&note))))
}

#[utoipa::path(
    post,
    path = "/notes/{id}/finalize",
    params(("id" = String, Path, description = "Note identifier")),
    responses(
        (status = 200, description = "Note finalized", body = NoteActionRes),
        (status = 401, description = "Unauthenticated", body = ErrorRes),
        (status = 404, description = "Note not found", body = ErrorRes),
        (status = 409, description = "Invalid status transition", body = ErrorRes)
    )
)]
/// Finalize a draft note
async fn finalize_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<NoteActionRes>, (StatusCode, Json<ErrorRes>)> {
    let auth = require_auth(&headers)?;
    let note_id = parse_note_id(&id)?;
    let note = state
        .lifecycle
        .finalize_note(&auth, &note_id)
        .map_err(lifecycle_failure)?;
    Ok(Json(NoteActionRes::from(&note)))
}

#[utoipa::path(
    post,
    path = "/notes/{id}/sign",
    params(("id" = String, Path, description = "Note identifier")),
    responses(
        (status = 200, description = "Note signed", body = NoteActionRes),
        (status = 401, description = "Unauthenticated", body = ErrorRes),
        (status = 404, description = "Note not found", body = ErrorRes),
        (status = 409, description = "Invalid status transition", body = ErrorRes)
    )
)]
/// Sign a finalized note as the authenticated clinician
async fn sign_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<NoteActionRes>, (StatusCode, Json<ErrorRes>)> {
    let auth = require_auth(&headers)?;
    let note_id = parse_note_id(&id)?;
    let note = state
        .lifecycle
        .sign_note(&auth, &note_id)
        .map_err(lifecycle_failure)?;
    Ok(Json(NoteActionRes::from(&note)))
}

#[utoipa::path(
    post,
    path = "/notes/{id}/lock",
    params(("id" = String, Path, description = "Note identifier")),
    responses(
        (status = 200, description = "Note locked", body = NoteActionRes),
        (status = 401, description = "Unauthenticated", body = ErrorRes),
        (status = 404, description = "Note not found", body = ErrorRes),
        (status = 409, description = "Invalid status transition", body = ErrorRes)
    )
)]
/// Administratively lock a note
async fn lock_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<NoteActionRes>, (StatusCode, Json<ErrorRes>)> {
    let auth = require_auth(&headers)?;
    let note_id = parse_note_id(&id)?;
    let note = state
        .lifecycle
        .lock_note(&auth, &note_id)
        .map_err(lifecycle_failure)?;
    Ok(Json(NoteActionRes::from(&note)))
}

#[utoipa::path(
    get,
    path = "/notes/{id}",
    params(("id" = String, Path, description = "Note identifier")),
    responses(
        (status = 200, description = "Signed note content", body = ReadNoteRes),
        (status = 403, description = "Read denied", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Read a signed note through the guarded read path
///
/// Every denial, including an unknown note id, returns the same generic
/// body; only system faults differ in status code.
async fn read_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ReadNoteRes>, (StatusCode, Json<ErrorRes>)> {
    let ctx = caller_headers(&headers).read_context();
    match state.lifecycle.read_note(&ctx, &id) {
        Ok(note) => Ok(Json(ReadNoteRes::from(&note))),
        Err(e) if e.is_system_failure() => {
            tracing::error!(error = %e, "guarded read failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorRes::internal()),
            ))
        }
        Err(e) => {
            tracing::debug!(error = %e, "guarded read denied");
            Err((StatusCode::FORBIDDEN, Json(ErrorRes::denied())))
        }
    }
}
