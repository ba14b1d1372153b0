//! Deployment bus behavior

mod common;

use std::sync::Arc;

use common::{MemoryRegistry, RecordingEdge};
use wharfd::bus::DeploymentBus;
use wharfd::errors::ControlError;
use wharfd::models::deployment::{DeploymentContent, DeploymentMetadata};
use wharfd::models::url::Url;
use wharfd::routes::table::{Route, RouteHandler};
use wharfd::routes::ADMIN_ROUTE_PATH;

fn bus_with(
    registry: Arc<MemoryRegistry>,
    edge: Arc<RecordingEdge>,
    admin_upstream: Option<&str>,
) -> DeploymentBus {
    DeploymentBus::new(registry, edge, admin_upstream.map(String::from))
}

fn metadata(url: &str) -> DeploymentMetadata {
    DeploymentMetadata::new(Url::parse(url).unwrap())
}

fn route_host(route: &Route) -> Option<&str> {
    route.matcher.as_ref().and_then(|m| m.host.as_deref())
}

fn route_path(route: &Route) -> Option<&str> {
    route.matcher.as_ref().and_then(|m| m.path_prefix())
}

#[tokio::test]
async fn test_setup_creates_content_less_deployment_with_placeholder_route() {
    let registry = Arc::new(MemoryRegistry::new());
    let edge = Arc::new(RecordingEdge::new());
    let bus = bus_with(registry.clone(), edge.clone(), None);
    bus.load().await.unwrap();

    bus.setup_deployment(metadata("new.example.com")).await.unwrap();

    let deployment = bus
        .get_deployment_by_url(&Url::host("new.example.com"))
        .await
        .unwrap();
    assert!(!deployment.has_content());

    // Servable before any content exists, to bootstrap certificate issuance
    let table = edge.last_push();
    assert_eq!(table.len(), 1);
    assert_eq!(route_host(&table.routes[0]), Some("new.example.com"));
    assert!(matches!(
        table.routes[0].handlers[0],
        RouteHandler::StaticResponse { .. }
    ));
}

#[tokio::test]
async fn test_uniqueness_upsert_by_url() {
    let registry = Arc::new(MemoryRegistry::new());
    let edge = Arc::new(RecordingEdge::new());
    let bus = bus_with(registry, edge, None);
    bus.load().await.unwrap();

    let mut first = metadata("a.example.com");
    first.tags.insert("one".to_string());
    bus.setup_deployment(first).await.unwrap();

    let mut second = metadata("a.example.com");
    second.tags.insert("two".to_string());
    bus.setup_deployment(second).await.unwrap();

    let list = bus.list().await;
    assert_eq!(list.len(), 1);
    assert!(list[0].metadata.tags.contains("two"));
}

#[tokio::test]
async fn test_idempotent_upsert_leaves_set_unchanged() {
    let registry = Arc::new(MemoryRegistry::new());
    let edge = Arc::new(RecordingEdge::new());
    let bus = bus_with(registry, edge, None);
    bus.load().await.unwrap();

    bus.setup_deployment(metadata("a.example.com")).await.unwrap();
    let before = bus.list().await;

    bus.setup_deployment(metadata("a.example.com")).await.unwrap();
    let after = bus.list().await;

    assert_eq!(before, after);
}

#[tokio::test]
async fn test_metadata_update_preserves_content() {
    let registry = Arc::new(MemoryRegistry::new());
    let edge = Arc::new(RecordingEdge::new());
    let bus = bus_with(registry, edge, None);
    bus.load().await.unwrap();

    let url = Url::host("a.example.com");
    bus.setup_deployment(metadata("a.example.com")).await.unwrap();
    bus.put_deployment_content_by_url(&url, DeploymentContent::static_files("/srv/a", false))
        .await
        .unwrap();

    let mut update = metadata("a.example.com");
    update.tags.insert("retagged".to_string());
    bus.setup_deployment(update).await.unwrap();

    let deployment = bus.get_deployment_by_url(&url).await.unwrap();
    assert!(deployment.has_content());
    assert!(deployment.metadata.tags.contains("retagged"));
}

#[tokio::test]
async fn test_put_content_requires_existing_deployment() {
    let registry = Arc::new(MemoryRegistry::new());
    let edge = Arc::new(RecordingEdge::new());
    let bus = bus_with(registry, edge, None);
    bus.load().await.unwrap();

    let result = bus
        .put_deployment_content_by_url(
            &Url::host("ghost.example.com"),
            DeploymentContent::static_files("/srv/x", false),
        )
        .await;

    assert!(matches!(result, Err(ControlError::NotFound(_))));
}

#[tokio::test]
async fn test_delete_removes_record_and_route() {
    let registry = Arc::new(MemoryRegistry::new());
    let edge = Arc::new(RecordingEdge::new());
    let bus = bus_with(registry.clone(), edge.clone(), None);
    bus.load().await.unwrap();

    let url = Url::host("gone.example.com");
    bus.setup_deployment(metadata("gone.example.com")).await.unwrap();
    bus.delete_deployment(&url).await.unwrap();

    let result = bus.get_deployment_by_url(&url).await;
    assert!(matches!(result, Err(ControlError::NotFound(_))));

    let table = edge.last_push();
    assert!(table
        .routes
        .iter()
        .all(|r| route_host(r) != Some("gone.example.com")));

    assert!(registry.saved_deployments().is_empty());
}

#[tokio::test]
async fn test_delete_unknown_url_fails() {
    let registry = Arc::new(MemoryRegistry::new());
    let edge = Arc::new(RecordingEdge::new());
    let bus = bus_with(registry, edge, None);
    bus.load().await.unwrap();

    let result = bus.delete_deployment(&Url::host("never.example.com")).await;
    assert!(matches!(result, Err(ControlError::NotFound(_))));
}

#[tokio::test]
async fn test_push_failure_rolls_back_memory_and_skips_persist() {
    let registry = Arc::new(MemoryRegistry::new());
    let edge = Arc::new(RecordingEdge::new());
    let bus = bus_with(registry.clone(), edge.clone(), None);
    bus.load().await.unwrap();

    bus.setup_deployment(metadata("ok.example.com")).await.unwrap();
    let before = bus.list().await;
    let saved_before = registry.saved_deployments();
    let pushes_before = edge.push_count();

    edge.fail_next_push();
    let result = bus.setup_deployment(metadata("doomed.example.com")).await;

    assert!(matches!(result, Err(ControlError::UpstreamPushFailed(_))));
    // Memory, edge and registry all stay at the previous state
    assert_eq!(bus.list().await, before);
    assert_eq!(registry.saved_deployments(), saved_before);
    assert_eq!(edge.push_count(), pushes_before);
}

#[tokio::test]
async fn test_persist_failure_surfaces_but_keeps_pushed_state() {
    let registry = Arc::new(MemoryRegistry::new());
    let edge = Arc::new(RecordingEdge::new());
    let bus = bus_with(registry.clone(), edge.clone(), None);
    bus.load().await.unwrap();

    registry
        .fail_saves
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let result = bus.setup_deployment(metadata("a.example.com")).await;

    assert!(matches!(result, Err(ControlError::PersistenceFailed(_))));
    // The edge accepted the table, so memory keeps the committed state
    assert_eq!(bus.list().await.len(), 1);
}

#[tokio::test]
async fn test_load_bootstraps_admin_route_without_persisting_it() {
    let registry = Arc::new(MemoryRegistry::new());
    let edge = Arc::new(RecordingEdge::new());
    let bus = bus_with(registry.clone(), edge.clone(), Some("127.0.0.1:8675"));
    bus.load().await.unwrap();

    let table = edge.last_push();
    assert_eq!(route_path(&table.routes[0]), Some(ADMIN_ROUTE_PATH));

    // A later mutation persists everything except the admin record
    bus.setup_deployment(metadata("a.example.com")).await.unwrap();
    let saved = registry.saved_deployments();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].url(), &Url::host("a.example.com"));
}

#[tokio::test]
async fn test_admin_route_strips_prefix_before_proxying() {
    let registry = Arc::new(MemoryRegistry::new());
    let edge = Arc::new(RecordingEdge::new());
    let bus = bus_with(registry, edge.clone(), Some("127.0.0.1:8675"));
    bus.load().await.unwrap();

    // The admin listener mounts its routes at the root, so the proxied
    // request must arrive without the sentinel prefix.
    let table = edge.last_push();
    let handlers = &table.routes[0].handlers;
    assert!(matches!(
        &handlers[0],
        RouteHandler::StripPrefix { prefix } if prefix == ADMIN_ROUTE_PATH
    ));
    assert!(matches!(&handlers[1], RouteHandler::ReverseProxy { .. }));
}

#[tokio::test]
async fn test_domain_less_deployment_rejected_before_any_push() {
    let registry = Arc::new(MemoryRegistry::new());
    let edge = Arc::new(RecordingEdge::new());
    let bus = bus_with(registry.clone(), edge.clone(), None);
    bus.load().await.unwrap();

    let pushes_before = edge.push_count();
    let result = bus.setup_deployment(metadata("/shadow-everyone")).await;

    assert!(matches!(result, Err(ControlError::ValidationError(_))));
    assert!(bus.list().await.is_empty());
    assert_eq!(edge.push_count(), pushes_before);
    assert!(registry.saved_deployments().is_empty());
}

#[tokio::test]
async fn test_admin_route_stays_first_among_path_routes() {
    let registry = Arc::new(MemoryRegistry::new());
    let edge = Arc::new(RecordingEdge::new());
    let bus = bus_with(registry, edge.clone(), Some("127.0.0.1:8675"));
    bus.load().await.unwrap();

    let mut m = metadata("a.example.com/a/very/long/path/prefix");
    bus.setup_deployment(m.clone()).await.unwrap();
    m.url = Url::parse("a.example.com/x").unwrap();
    bus.setup_deployment(m).await.unwrap();

    let table = edge.last_push();
    let paths: Vec<Option<&str>> = table.routes.iter().map(route_path).collect();
    assert_eq!(
        paths,
        vec![
            Some(ADMIN_ROUTE_PATH),
            Some("/a/very/long/path/prefix"),
            Some("/x"),
        ]
    );
}

#[tokio::test]
async fn test_load_restores_persisted_deployments() {
    let registry = Arc::new(MemoryRegistry::new());
    let edge = Arc::new(RecordingEdge::new());

    {
        let bus = bus_with(registry.clone(), edge.clone(), None);
        bus.load().await.unwrap();
        bus.setup_deployment(metadata("a.example.com")).await.unwrap();
        let url = Url::host("a.example.com");
        bus.put_deployment_content_by_url(&url, DeploymentContent::redirect("https://b.example.com"))
            .await
            .unwrap();
    }

    // Fresh bus over the same registry sees the same state
    let bus = bus_with(registry, edge.clone(), None);
    bus.load().await.unwrap();

    let deployment = bus
        .get_deployment_by_url(&Url::host("a.example.com"))
        .await
        .unwrap();
    assert!(deployment.has_content());

    let table = edge.last_push();
    assert!(matches!(
        table.routes[0].handlers[0],
        RouteHandler::Redirect { .. }
    ));
}
