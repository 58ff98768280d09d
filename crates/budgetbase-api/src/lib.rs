//! HTTP API for Budgetbase
//!
//! Axum router exposing signup, signin and the token-protected profile route,
//! with an OpenAPI document served at `/api/openapi.json`.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use budgetbase_auth::AuthService;

/// Application state shared across handlers
pub struct AppState {
    pub auth: Arc<AuthService>,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Budgetbase API",
        version = "0.1.0",
        description = "Account registration and session authentication",
        contact(
            name = "Budgetbase Team",
            email = "team@budgetbase.io"
        )
    ),
    paths(
        handlers::welcome,
        handlers::health_check,
        handlers::signup,
        handlers::signin,
        handlers::get_current_user,
    ),
    components(
        schemas(
            models::SignupRequest,
            models::SigninRequest,
            models::TokenResponse,
            models::UserProfile,
            models::HealthResponse,
            models::ErrorResponse,
        )
    ),
    tags(
        (name = "auth", description = "Signup, signin and session endpoints"),
        (name = "system", description = "System health and info endpoints")
    )
)]
struct ApiDoc;

/// API server configuration
pub struct ApiServerConfig {
    /// Address to bind the API server
    pub bind_addr: SocketAddr,
    /// Allow cross-origin requests from any origin
    pub enable_cors: bool,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            enable_cors: true,
        }
    }
}

/// API Server
pub struct ApiServer {
    config: ApiServerConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(config: ApiServerConfig, auth: Arc<AuthService>) -> Self {
        let state = Arc::new(AppState { auth });

        Self { config, state }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let api_doc = ApiDoc::openapi();

        // Build PUBLIC routes (no authentication required)
        let public_router = Router::new()
            .route("/api", get(handlers::welcome))
            .route("/api/health", get(handlers::health_check))
            .route("/api/signup", post(handlers::signup))
            .route("/api/signin", post(handlers::signin))
            .with_state(self.state.clone());

        // Build PROTECTED routes (require a valid session token)
        let protected_router = Router::new()
            .route("/api/me", get(handlers::get_current_user))
            .with_state(self.state.clone())
            .layer(axum_middleware::from_fn_with_state(
                self.state.clone(),
                middleware::require_auth,
            ));

        let api_router = public_router.merge(protected_router);

        // SwaggerUi automatically creates a route for /api/openapi.json
        let mut router = Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", api_doc))
            .merge(api_router)
            .layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            router = router.layer(CorsLayer::permissive());
        }

        router
    }

    /// Start the API server and serve until Ctrl-C
    pub async fn start(self) -> Result<(), anyhow::Error> {
        let router = self.build_router();

        info!("Server is up and listening on {}", self.config.bind_addr);
        info!(
            "OpenAPI spec: http://{}/api/openapi.json",
            self.config.bind_addr
        );

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to listen for Ctrl-C, running until killed: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
