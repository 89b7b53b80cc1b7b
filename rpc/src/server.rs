//! Axum-based HTTP server.

use std::net::SocketAddr;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::{AppState, RpcError};

/// Build the full route table.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::me))
        .route(
            "/admin/accounts",
            get(handlers::list_accounts).post(handlers::create_account),
        )
        .route("/admin/accounts/:address", delete(handlers::delete_account))
        .route("/admin/accounts/:address/role", put(handlers::assign_role))
        .route("/profile", put(handlers::update_profile))
        .route(
            "/classes",
            get(handlers::list_classes).post(handlers::create_class),
        )
        .route(
            "/classes/:class_id",
            get(handlers::get_class)
                .put(handlers::update_class)
                .delete(handlers::delete_class),
        )
        .route("/classes/:class_id/students", post(handlers::enroll_student))
        .route(
            "/classes/:class_id/students/:address",
            delete(handlers::unenroll_student).put(handlers::edit_student),
        )
        .route("/attendance/mark", post(handlers::mark_attendance))
        .route("/attendance/validate", post(handlers::validate_attendance))
        .route("/attendance/:id/badge", post(handlers::retry_badge))
        .route("/attendance/class/:class_id", get(handlers::class_attendance))
        .route("/student/attendance/stats", get(handlers::attendance_stats))
        .route("/student/profile", get(handlers::student_profile))
        .route("/student/badges", get(handlers::student_badges));

    Router::new()
        .nest("/api", api)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
}

/// CORS for a browser front end on another origin. Credentials are allowed
/// so the session cookie travels, which requires a concrete origin.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, RpcError> {
    let origin: HeaderValue = origin
        .parse()
        .map_err(|_| RpcError::InvalidRequest(format!("invalid CORS origin: {origin}")))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]))
}

pub struct RpcServer {
    pub addr: SocketAddr,
    pub state: AppState,
    pub cors_origin: Option<String>,
}

impl RpcServer {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self {
            addr,
            state,
            cors_origin: None,
        }
    }

    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origin = Some(origin.into());
        self
    }

    /// Bind and serve until the future is dropped.
    pub async fn start(&self) -> Result<(), RpcError> {
        let mut app = router(self.state.clone());
        if let Some(origin) = self.cors_origin.as_deref() {
            app = app.layer(cors_layer(origin)?);
        }

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| RpcError::Internal(format!("bind {}: {e}", self.addr)))?;
        tracing::info!(addr = %self.addr, "HTTP API listening");

        axum::serve(listener, app)
            .await
            .map_err(|e| RpcError::Internal(format!("serve: {e}")))
    }
}
