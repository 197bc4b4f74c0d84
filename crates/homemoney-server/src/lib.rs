//! HomeMoney Web Server
//!
//! Axum-based REST API for the HomeMoney household finance backend.
//!
//! - Expense records, statistics, and filter metadata
//! - Members, the plan catalog, and the subscription lifecycle
//! - File-backed JSON documents and the client operation-log sink
//! - Mock payment flows
//! - Optional periodic subscription sweeps

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use homemoney_core::{
    Database, ErrorKind, JsonFileStore, MockGateway, PaymentConfig, PaymentService, RenewPolicy,
};

mod handlers;
mod scheduler;

pub use scheduler::{run_sweep, start_sweep_scheduler, SweepReport, SweepScheduleConfig};

/// Comma-separated list of allowed CORS origins
pub const CORS_ORIGINS_ENV: &str = "HOMEMONEY_CORS_ORIGINS";

/// Renew policy switch: `allow` or `active-only`
pub const RENEW_POLICY_ENV: &str = "HOMEMONEY_RENEW_POLICY";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// Whether renew may reactivate canceled or expired subscriptions
    pub renew_policy: RenewPolicy,
    /// Root for the JSON document store and donation records
    pub data_dir: PathBuf,
    /// Merchant identity passed to the payment gateway
    pub payment: PaymentConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![],
            renew_policy: RenewPolicy::default(),
            data_dir: PathBuf::from("data"),
            payment: PaymentConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Build a configuration from environment variables
    pub fn from_env(data_dir: PathBuf) -> Self {
        let allowed_origins = std::env::var(CORS_ORIGINS_ENV)
            .map(|s| parse_origins(&s))
            .unwrap_or_default();

        let renew_policy = match std::env::var(RENEW_POLICY_ENV) {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("{}; falling back to '{}'", e, RenewPolicy::default());
                RenewPolicy::default()
            }),
            Err(_) => RenewPolicy::default(),
        };

        Self {
            allowed_origins,
            renew_policy,
            data_dir,
            payment: PaymentConfig::from_env(),
        }
    }
}

/// Split a comma-separated origin list, dropping blanks
pub fn parse_origins(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    pub json_files: JsonFileStore,
    pub payments: PaymentService<MockGateway>,
    pub started_at: Instant,
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(db: Database, config: ServerConfig) -> anyhow::Result<Router> {
    let json_files = JsonFileStore::new(config.data_dir.join("json-files"))?;
    let payments = PaymentService::new(MockGateway, config.payment.clone());

    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        json_files,
        payments,
        started_at: Instant::now(),
    });

    let api_routes = Router::new()
        // Health
        .route("/health", get(handlers::health))
        .route("/health/lite", get(handlers::health_lite))
        // Expenses
        .route(
            "/expenses",
            get(handlers::list_expenses).post(handlers::create_expense),
        )
        .route("/expenses/batch", post(handlers::create_expenses_batch))
        .route("/expenses/statistics", get(handlers::expense_statistics))
        .route(
            "/expenses/:id",
            get(handlers::get_expense)
                .put(handlers::update_expense)
                .delete(handlers::delete_expense),
        )
        // Members
        .route(
            "/members",
            get(handlers::list_members).post(handlers::get_or_create_member),
        )
        .route(
            "/members/subscription-plans",
            get(handlers::list_active_plans),
        )
        .route("/members/:username", get(handlers::get_member))
        .route(
            "/members/:username/status",
            put(handlers::update_member_status),
        )
        .route(
            "/members/:username/subscriptions",
            get(handlers::list_member_subscriptions),
        )
        .route(
            "/members/:username/current-subscription",
            get(handlers::get_current_subscription),
        )
        // Subscriptions
        .route("/subscriptions", post(handlers::create_subscription))
        .route("/subscriptions/:id", delete(handlers::cancel_subscription))
        .route("/subscriptions/:id/renew", post(handlers::renew_subscription))
        // Plan administration
        .route(
            "/admin/subscription-plans",
            get(handlers::list_plans).post(handlers::create_plan),
        )
        .route(
            "/admin/subscription-plans/:id",
            put(handlers::update_plan).delete(handlers::delete_plan),
        )
        .route(
            "/admin/subscription-plans/:id/toggle",
            post(handlers::toggle_plan),
        )
        // Maintenance sweeps
        .route(
            "/maintenance/check-subscriptions",
            get(handlers::check_subscriptions),
        )
        .route(
            "/maintenance/process-renewals",
            get(handlers::process_renewals),
        )
        .route(
            "/maintenance/expiring-subscriptions",
            get(handlers::expiring_subscriptions),
        )
        // JSON documents
        .route("/json-files", get(handlers::list_json_files))
        .route(
            "/json-files/:filename",
            get(handlers::read_json_file)
                .post(handlers::write_json_file)
                .delete(handlers::delete_json_file),
        )
        .route("/json-files/:filename/info", get(handlers::json_file_info))
        // Operation logs
        .route(
            "/logs",
            get(handlers::list_logs).post(handlers::ingest_log),
        )
        .route("/logs/stats", get(handlers::log_stats))
        .route("/logs/clean", delete(handlers::clean_logs))
        // Payments
        .route("/payments/donate", post(handlers::donate))
        .route("/payments/subscribe", post(handlers::subscribe_payment));

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE])
    };

    let app = Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ));

    Ok(app)
}

/// Start the server
pub async fn serve(db: Database, host: &str, port: u16) -> anyhow::Result<()> {
    serve_with_config(db, host, port, ServerConfig::default(), None).await
}

/// Start the server with custom configuration and an optional sweep schedule
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    config: ServerConfig,
    sweep: Option<SweepScheduleConfig>,
) -> anyhow::Result<()> {
    info!(
        renew_policy = %config.renew_policy,
        data_dir = %config.data_dir.display(),
        "Server configuration loaded"
    );
    if config.renew_policy == RenewPolicy::AllowAny {
        info!("Renew may reactivate canceled or expired subscriptions");
    }

    match sweep {
        Some(sweep_config) => start_sweep_scheduler(db.clone(), sweep_config),
        None => info!("ℹ️  Subscription sweeps not scheduled (set HOMEMONEY_SWEEP_INTERVAL_MINUTES to enable)"),
    }

    let app = create_router(db, config)?.into_make_service();
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
#[derive(Debug)]
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

    pub fn conflict(msg: &str) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
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

        // Domain errors carry their own classification
        if let Some(core) = err.downcast_ref::<homemoney_core::Error>() {
            let message = core.to_string();
            match core.kind() {
                ErrorKind::Validation => return Self::bad_request(&message),
                ErrorKind::NotFound => return Self::not_found(&message),
                ErrorKind::StateConflict => return Self::conflict(&message),
                ErrorKind::Store => {}
            }
        }

        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}
