//! Admin API request handlers.
//!
//! Every mutating route resolves a Permissions value through the
//! classifier chain before touching the bus.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::authn::bearer::create_bearer_token;
use crate::authn::permissions::Permissions;
use crate::errors::ControlError;
use crate::models::credentials::ExternalUser;
use crate::models::deployment::{
    Deployment, DeploymentContent, DeploymentMetadata, ExternalSourceType,
};
use crate::models::url::Url;
use crate::server::state::ServerState;
use crate::utils::{sha256_hash, version_info};

/// API error wrapper mapping error kinds onto HTTP statuses
pub struct ApiError(ControlError);

impl From<ControlError> for ApiError {
    fn from(err: ControlError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ControlError::NotFound(_) => StatusCode::NOT_FOUND,
            ControlError::Conflict(_) => StatusCode::CONFLICT,
            ControlError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ControlError::Forbidden(_) => StatusCode::FORBIDDEN,
            ControlError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ControlError::UpstreamPushFailed(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

/// Resolve the caller's capabilities from connection and header data
async fn authorize(
    state: &ServerState,
    remote: SocketAddr,
    headers: &HeaderMap,
) -> Result<Permissions, ApiError> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    Ok(state.resolver.resolve(remote, authorization).await?)
}

fn forbidden(what: &str) -> ApiError {
    ApiError(ControlError::Forbidden(format!(
        "caller may not {}",
        what
    )))
}

// ================================ DEPLOYMENTS ================================ //

/// Metadata create/update request
#[derive(Debug, Deserialize)]
pub struct SetupDeploymentRequest {
    /// `"domain/path"` form
    pub url: String,

    #[serde(default)]
    pub external_source: Option<String>,

    #[serde(default)]
    pub external_source_type: Option<ExternalSourceType>,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    #[serde(default)]
    pub preserve_external_path: bool,
}

#[derive(Debug, Serialize)]
pub struct DeploymentResponse {
    pub url: String,
    pub has_content: bool,
    pub deployment: Deployment,
}

/// `PUT /deploy/new`: upsert deployment metadata
pub async fn setup_deployment_handler(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<SetupDeploymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let perms = authorize(&state, remote, &headers).await?;

    let url = Url::parse(&request.url)?;
    let metadata = DeploymentMetadata {
        url: url.clone(),
        external_source: request.external_source,
        external_source_type: request.external_source_type,
        tags: request.tags,
        preserve_external_path: request.preserve_external_path,
        dont_persist: false,
    };

    // Scoped callers may only touch records bound to their own source,
    // both the existing record and the one they are proposing.
    let proposed = Deployment::new(metadata.clone());
    match state.bus.get_deployment_by_url(&url).await {
        Ok(existing) => {
            if !perms.can_modify_deployment(&existing) || !perms.can_modify_deployment(&proposed) {
                return Err(forbidden("modify this deployment"));
            }
        }
        Err(ControlError::NotFound(_)) => {
            if !perms.can_create_deployment() && !perms.can_modify_deployment(&proposed) {
                return Err(forbidden("create deployments"));
            }
        }
        Err(e) => return Err(e.into()),
    }

    state.bus.setup_deployment(metadata).await?;
    let deployment = state.bus.get_deployment_by_url(&url).await?;

    Ok(Json(DeploymentResponse {
        url: url.to_string(),
        has_content: deployment.has_content(),
        deployment,
    }))
}

/// `GET /deployment/{url}`: exact-match lookup
pub async fn get_deployment_handler(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(url): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let perms = authorize(&state, remote, &headers).await?;

    let url = Url::parse(&url)?;
    let deployment = state.bus.get_deployment_by_url(&url).await?;

    if !perms.can_view_deployment(&deployment) {
        return Err(forbidden("view this deployment"));
    }

    Ok(Json(DeploymentResponse {
        url: url.to_string(),
        has_content: deployment.has_content(),
        deployment,
    }))
}

/// `PUT /deploy/files`: multipart static-content upload.
///
/// Text fields: `url` (required), `spa` ("true" enables SPA fallback).
/// Every part with a filename is written under the deployment's content
/// root at its part filename (site-relative path).
pub async fn files_handler(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let perms = authorize(&state, remote, &headers).await?;

    let mut url: Option<Url> = None;
    let mut spa_mode = false;
    let mut files: Vec<(String, Vec<u8>)> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ControlError::ValidationError(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match (name.as_str(), field.file_name().map(String::from)) {
            ("url", _) => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ControlError::ValidationError(e.to_string()))?;
                url = Some(Url::parse(&text)?);
            }
            ("spa", _) => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ControlError::ValidationError(e.to_string()))?;
                spa_mode = text.trim() == "true";
            }
            (_, Some(filename)) => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ControlError::ValidationError(e.to_string()))?;
                files.push((filename, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let url = url.ok_or_else(|| ControlError::ValidationError("missing url field".to_string()))?;
    if files.is_empty() {
        return Err(ControlError::ValidationError("no files uploaded".to_string()).into());
    }

    let deployment = state.bus.get_deployment_by_url(&url).await?;
    if !perms.can_modify_deployment(&deployment) {
        return Err(forbidden("modify this deployment"));
    }

    // Replace the content root wholesale; partial uploads never mix with
    // a previous bundle.
    let site_dir = state.layout.site_dir(&url.to_string());
    site_dir.clear().await?;

    let mut digest_input = Vec::new();
    for (rel_path, bytes) in &files {
        let rel_path = sanitize_rel_path(rel_path)?;
        site_dir.file(&rel_path).write_bytes(bytes).await?;
        digest_input.extend_from_slice(rel_path.as_bytes());
        digest_input.extend_from_slice(bytes);
    }

    info!(
        "Stored {} files for {} (sha256 {})",
        files.len(),
        url,
        sha256_hash(&digest_input)
    );

    let root = site_dir.path().to_string_lossy().to_string();
    state
        .bus
        .put_deployment_content_by_url(&url, DeploymentContent::static_files(root, spa_mode))
        .await?;

    let deployment = state.bus.get_deployment_by_url(&url).await?;
    Ok(Json(DeploymentResponse {
        url: url.to_string(),
        has_content: deployment.has_content(),
        deployment,
    }))
}

/// Container/proxy/redirect content request
#[derive(Debug, Deserialize)]
pub struct ContainerRequest {
    /// `"domain/path"` form
    pub url: String,

    /// Upstream `host:port` for container/proxy kinds, target URL for
    /// redirects
    pub target: String,

    /// "container" (default), "proxy" or "redirect"
    #[serde(default)]
    pub kind: Option<String>,
}

/// `PUT /deploy/container`: attach routed content to a deployment
pub async fn container_handler(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<ContainerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let perms = authorize(&state, remote, &headers).await?;

    let url = Url::parse(&request.url)?;
    let deployment = state.bus.get_deployment_by_url(&url).await?;
    if !perms.can_modify_deployment(&deployment) {
        return Err(forbidden("modify this deployment"));
    }

    let content = match request.kind.as_deref().unwrap_or("container") {
        "container" => DeploymentContent::docker_container(request.target),
        "proxy" => DeploymentContent::reverse_proxy(request.target),
        "redirect" => DeploymentContent::redirect(request.target),
        other => {
            return Err(
                ControlError::ValidationError(format!("unknown content kind '{}'", other)).into(),
            )
        }
    };

    state.bus.put_deployment_content_by_url(&url, content).await?;

    let deployment = state.bus.get_deployment_by_url(&url).await?;
    Ok(Json(DeploymentResponse {
        url: url.to_string(),
        has_content: deployment.has_content(),
        deployment,
    }))
}

// ================================ CREDENTIALS ================================ //

#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub external_id: String,

    #[serde(default = "default_source_type")]
    pub external_source_type: ExternalSourceType,

    #[serde(default)]
    pub full_permissions: bool,
}

fn default_source_type() -> ExternalSourceType {
    ExternalSourceType::GithubRepo
}

#[derive(Debug, Serialize)]
pub struct RegisterUserResponse {
    pub external_id: String,
    pub full_permissions: bool,
}

/// `PUT /user/register`: register a federated actor
pub async fn register_user_handler(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<RegisterUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let perms = authorize(&state, remote, &headers).await?;
    if !perms.can_create_credentials() {
        return Err(forbidden("register users"));
    }

    let user = ExternalUser {
        external_source_type: request.external_source_type,
        external_id: request.external_id.clone(),
        full_permissions: request.full_permissions,
    };
    state.registry.save_external_user(&user).await?;

    info!(
        "Registered external user {} (full={})",
        user.external_id, user.full_permissions
    );
    Ok(Json(RegisterUserResponse {
        external_id: user.external_id,
        full_permissions: user.full_permissions,
    }))
}

#[derive(Debug, Deserialize)]
pub struct GenerateTokenRequest {
    #[serde(default)]
    pub full_permissions: bool,
}

#[derive(Debug, Serialize)]
pub struct GenerateTokenResponse {
    /// Plaintext `"<id>.<secret>"`, shown exactly once
    pub token: String,
}

/// `POST /token/generate`: mint a bearer token
pub async fn generate_token_handler(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<GenerateTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let perms = authorize(&state, remote, &headers).await?;
    if !perms.can_create_credentials() {
        return Err(forbidden("generate tokens"));
    }

    let token = create_bearer_token(state.registry.as_ref(), request.full_permissions).await?;

    Ok(Json(GenerateTokenResponse {
        token: token.expose_secret().to_string(),
    }))
}

// ================================= LIVENESS ================================= //

#[derive(Debug, Serialize)]
pub struct AliveResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// `GET /alive`: liveness probe, unauthenticated
pub async fn alive_handler() -> impl IntoResponse {
    let version = version_info();
    Json(AliveResponse {
        status: "alive".to_string(),
        service: "wharfd".to_string(),
        version: version.version,
    })
}

/// Reject path components that would escape the content root
fn sanitize_rel_path(path: &str) -> Result<String, ControlError> {
    let cleaned = path.trim_start_matches('/');
    if cleaned.is_empty()
        || cleaned
            .split('/')
            .any(|part| part.is_empty() || part == "." || part == "..")
    {
        return Err(ControlError::ValidationError(format!(
            "unsafe file path '{}'",
            path
        )));
    }
    Ok(cleaned.to_string())
}
