//! HTTP server setup

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::errors::ControlError;
use crate::server::handlers::{
    alive_handler, container_handler, files_handler, generate_token_handler,
    get_deployment_handler, register_user_handler, setup_deployment_handler,
};
use crate::server::state::ServerState;
use crate::storage::settings::ServerSettings;

/// Start the admin API server
pub async fn serve(
    options: &ServerSettings,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), ControlError>>, ControlError> {
    let app = Router::new()
        // Deployments
        .route("/deploy/new", put(setup_deployment_handler))
        .route("/deploy/files", put(files_handler))
        .route("/deploy/container", put(container_handler))
        .route("/deployment/{*url}", get(get_deployment_handler))
        // Credentials
        .route("/user/register", put(register_user_handler))
        .route("/token/generate", post(generate_token_handler))
        // Liveness
        .route("/alive", get(alive_handler))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting admin API server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| ControlError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| ControlError::ServerError(e.to_string()))
    });

    Ok(handle)
}
