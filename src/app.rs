use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json},
    routing::{get, post, MethodRouter},
    Router,
};
use serde_json::json;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::{LoginService, Operation, TokenCodec, TokenError};
use crate::config::AppConfig;
use crate::database::{RecordStore, Store};
use crate::handlers::{protected, public};
use crate::middleware::{authorize_operation, jwt_auth_middleware, validate_tenant_middleware};

/// Shared per-process state handed to every handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub codec: Arc<TokenCodec>,
    pub login: Arc<LoginService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Result<Self, TokenError> {
        let codec = Arc::new(TokenCodec::new(&config.security)?);
        let login = Arc::new(LoginService::new(codec.clone(), &config.security, &config.login));
        Ok(Self {
            store,
            codec,
            login,
            config: Arc::new(config),
        })
    }

    pub fn records(&self) -> &dyn RecordStore {
        self.store.records()
    }
}

pub fn app(state: AppState) -> Router {
    let protected_routes = Router::new()
        .merge(auth_routes())
        .merge(record_routes())
        .merge(grade_routes())
        .merge(attendance_routes())
        // Layers run bottom-up: authenticate, then bind the tenant
        .layer(middleware::from_fn_with_state(state.clone(), validate_tenant_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), jwt_auth_middleware));

    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes())
        .merge(protected_routes)
        // Global middleware
        .layer(TimeoutLayer::new(Duration::from_secs(state.config.api.request_timeout_secs)));

    if state.config.security.enable_cors {
        router = router.layer(cors_layer(&state.config.security.cors_origins));
    }
    if state.config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

/// Attach the role allow-list of `operation` to a route
fn guarded(route: MethodRouter<AppState>, operation: Operation) -> MethodRouter<AppState> {
    route.route_layer(middleware::from_fn(move |request: Request, next: Next| {
        authorize_operation(operation, request, next)
    }))
}

fn auth_public_routes() -> Router<AppState> {
    Router::new().route("/auth/login", post(public::auth::login_post))
}

fn auth_routes() -> Router<AppState> {
    use protected::auth;

    Router::new().route("/api/auth/whoami", guarded(get(auth::whoami_get), Operation::WhoAmI))
}

fn record_routes() -> Router<AppState> {
    use protected::academic;

    Router::new()
        .route(
            "/api/classrooms",
            guarded(get(academic::classrooms_list), Operation::ReadClassrooms),
        )
        .route(
            "/api/classrooms/:id",
            guarded(get(academic::classroom_get), Operation::ReadClassrooms),
        )
        .route(
            "/api/assessments",
            guarded(get(academic::assessments_list), Operation::ReadAssessments),
        )
        .route(
            "/api/assessments/:id",
            guarded(get(academic::assessment_get), Operation::ReadAssessments),
        )
        .route(
            "/api/enrollments",
            guarded(get(academic::enrollments_list), Operation::ReadEnrollments),
        )
        .route(
            "/api/enrollments/:id",
            guarded(get(academic::enrollment_get), Operation::ReadEnrollments),
        )
}

fn grade_routes() -> Router<AppState> {
    use protected::grades;

    Router::new()
        .route(
            "/api/grades",
            guarded(get(grades::grades_list), Operation::ReadGrades)
                .merge(guarded(axum::routing::put(grades::grade_put), Operation::WriteGrade)),
        )
        .route("/api/grades/:id", guarded(get(grades::grade_get), Operation::ReadGrades))
        .route(
            "/api/grades/:id/audit",
            guarded(get(grades::grade_audit_get), Operation::ReadGradeAudit),
        )
}

fn attendance_routes() -> Router<AppState> {
    use protected::attendance;

    Router::new()
        .route(
            "/api/attendance/sessions",
            guarded(get(attendance::sessions_list), Operation::ReadAttendance),
        )
        .route(
            "/api/attendance/sessions/:id",
            guarded(get(attendance::session_get), Operation::ReadAttendance),
        )
        .route(
            "/api/attendance/records",
            guarded(get(attendance::records_list), Operation::ReadAttendance),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    base.allow_origin(AllowOrigin::list(origins))
}

async fn root() -> Json<serde_json::Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Escola API",
            "version": version,
            "description": "Multi-school academic records API",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "public_auth": "/auth/login (public - token acquisition)",
                "auth": "/api/auth/whoami (protected)",
                "records": "/api/classrooms[/:id], /api/assessments[/:id], /api/enrollments[/:id] (protected, scoped)",
                "grades": "/api/grades[/:id], PUT /api/grades, /api/grades/:id/audit (protected, scoped)",
                "attendance": "/api/attendance/sessions[/:id], /api/attendance/records (protected, scoped)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
