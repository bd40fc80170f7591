//! Kwanza Web Server
//!
//! Axum-based REST API for the Kwanza finance backend:
//! - Transaction CRUD and file ingestion
//! - Three AI analysis endpoints (cash-flow forecast, fraud, credit)
//! - Static serving for the three front-end tab bundles

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

use kwanza_core::ai::{AiClient, AnalysisBackend};
use kwanza_core::db::Database;

mod handlers;

/// Maximum file upload size (10 MB)
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Shared application state
pub struct AppState {
    pub db: Database,
    /// None puts the analysis endpoints into sample mode
    pub ai: Option<AiClient>,
}

/// Create the application router
pub fn create_router(db: Database, static_dir: Option<&str>) -> Router {
    let ai = AiClient::from_env();
    match ai {
        Some(ref client) => {
            info!(
                "AI backend configured: {} (model: {})",
                client.host(),
                client.model()
            );
        }
        None => {
            info!("ℹ️  AI backend not configured (set GEMINI_API_KEY to enable live analysis); analysis endpoints serve sample data");
        }
    }

    create_router_with_options(db, static_dir, ai)
}

/// Create the application router with an explicit AI client (for testing)
pub fn create_router_with_options(
    db: Database,
    static_dir: Option<&str>,
    ai: Option<AiClient>,
) -> Router {
    let state = Arc::new(AppState { db, ai });

    let api_routes = Router::new()
        // Transactions
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::add_transaction),
        )
        // Analysis flows
        .route("/analyze_cashflow", post(handlers::analyze_cashflow))
        .route("/detect_fraud", post(handlers::detect_fraud))
        .route("/analyze_credit", post(handlers::analyze_credit))
        // File ingestion
        .route("/upload_transactions", post(handlers::upload_transactions));

    // Restrictive CORS default: same-origin only
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    // CSP: same-origin scripts, inline styles allowed for the tab bundles
    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self' https://cdn.jsdelivr.net; style-src 'self' 'unsafe-inline'; img-src 'self' data:; connect-src 'self'; frame-ancestors 'none'",
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    // Serve the three tab bundles if a static directory is provided; the
    // root landing page is the forecast tab
    if let Some(dir) = static_dir {
        let root = std::path::Path::new(dir);
        app = app
            .route_service(
                "/",
                ServeFile::new(root.join("previsao_fluxo_ai").join("index.html")),
            )
            .fallback_service(ServeDir::new(dir));
    }

    app
}

/// Start the server
pub async fn serve(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
) -> anyhow::Result<()> {
    let app = create_router(db, static_dir);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An unexpected error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}
