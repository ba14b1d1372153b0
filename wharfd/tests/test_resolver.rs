//! Permission resolver chain behavior

mod common;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use common::{MemoryRegistry, StaticVerifier};
use secrecy::ExposeSecret;
use wharfd::authn::bearer::create_bearer_token;
use wharfd::authn::permissions::Permissions;
use wharfd::authn::resolver::PermissionResolver;
use wharfd::errors::ControlError;
use wharfd::models::credentials::ExternalUser;
use wharfd::models::deployment::ExternalSourceType;
use wharfd::registry::Registry;

fn loopback() -> SocketAddr {
    "127.0.0.1:50000".parse().unwrap()
}

fn remote() -> SocketAddr {
    "203.0.113.9:50000".parse().unwrap()
}

fn resolver_with(
    registry: Arc<MemoryRegistry>,
    verifier: StaticVerifier,
    trusted_peers: Vec<IpAddr>,
) -> PermissionResolver {
    PermissionResolver::new(registry, Arc::new(verifier), trusted_peers)
}

#[tokio::test]
async fn test_loopback_resolves_local_with_full_capabilities() {
    let registry = Arc::new(MemoryRegistry::new());
    let resolver = resolver_with(registry, StaticVerifier::rejecting(), vec![]);

    let perms = resolver.resolve(loopback(), None).await.unwrap();
    assert_eq!(perms, Permissions::Local);
    assert!(perms.can_create_deployment());
    assert!(perms.can_create_credentials());
}

#[tokio::test]
async fn test_local_classifier_wins_over_malformed_bearer() {
    let registry = Arc::new(MemoryRegistry::new());
    let resolver = resolver_with(registry, StaticVerifier::rejecting(), vec![]);

    // Classifier order is fixed, not content-dependent
    let perms = resolver
        .resolve(loopback(), Some("Bearer garbage.garbage"))
        .await
        .unwrap();
    assert_eq!(perms, Permissions::Local);
}

#[tokio::test]
async fn test_trusted_peer_resolves_local() {
    let registry = Arc::new(MemoryRegistry::new());
    let peer: IpAddr = "203.0.113.9".parse().unwrap();
    let resolver = resolver_with(registry, StaticVerifier::rejecting(), vec![peer]);

    let perms = resolver.resolve(remote(), None).await.unwrap();
    assert_eq!(perms, Permissions::Local);
}

#[tokio::test]
async fn test_no_credentials_is_unauthenticated() {
    let registry = Arc::new(MemoryRegistry::new());
    let resolver = resolver_with(registry, StaticVerifier::rejecting(), vec![]);

    let result = resolver.resolve(remote(), None).await;
    assert!(matches!(result, Err(ControlError::Unauthenticated(_))));
}

#[tokio::test]
async fn test_bearer_token_round_trip() {
    let registry = Arc::new(MemoryRegistry::new());
    let token = create_bearer_token(registry.as_ref(), true).await.unwrap();
    let token = token.expose_secret().to_string();
    assert!(token.contains('.'));

    let resolver = resolver_with(registry, StaticVerifier::rejecting(), vec![]);
    let header = format!("Bearer {}", token);

    let perms = resolver.resolve(remote(), Some(&header)).await.unwrap();
    assert_eq!(
        perms,
        Permissions::Token {
            full_permissions: true
        }
    );
    assert!(perms.can_create_deployment());
}

#[tokio::test]
async fn test_tampered_secret_is_unauthenticated() {
    let registry = Arc::new(MemoryRegistry::new());
    let token = create_bearer_token(registry.as_ref(), true).await.unwrap();
    let (id, _secret) = token.expose_secret().split_once('.').unwrap();

    let resolver = resolver_with(registry, StaticVerifier::rejecting(), vec![]);
    let header = format!("Bearer {}.{}", id, "0".repeat(64));

    let result = resolver.resolve(remote(), Some(&header)).await;
    assert!(matches!(result, Err(ControlError::Unauthenticated(_))));
}

#[tokio::test]
async fn test_unknown_token_id_is_unauthenticated() {
    let registry = Arc::new(MemoryRegistry::new());
    let resolver = resolver_with(registry, StaticVerifier::rejecting(), vec![]);

    let result = resolver
        .resolve(remote(), Some("Bearer deadbeef.cafef00d"))
        .await;
    assert!(matches!(result, Err(ControlError::Unauthenticated(_))));
}

#[tokio::test]
async fn test_limited_token_has_no_capabilities() {
    let registry = Arc::new(MemoryRegistry::new());
    let token = create_bearer_token(registry.as_ref(), false).await.unwrap();
    let header = format!("Bearer {}", token.expose_secret());

    let resolver = resolver_with(registry, StaticVerifier::rejecting(), vec![]);
    let perms = resolver.resolve(remote(), Some(&header)).await.unwrap();

    assert!(!perms.can_create_deployment());
    assert!(!perms.can_create_credentials());
}

#[tokio::test]
async fn test_federated_actor_scoped_to_repository() {
    let registry = Arc::new(MemoryRegistry::new());
    let verifier = StaticVerifier::accepting("acme/site", Some("refs/heads/main"));
    let resolver = resolver_with(registry, verifier, vec![]);

    let perms = resolver
        .resolve(remote(), Some("GithubOIDC header.payload.sig"))
        .await
        .unwrap();

    assert_eq!(
        perms,
        Permissions::Federated {
            full_permissions: false,
            repository: "acme/site".to_string(),
            branch: Some("main".to_string()),
        }
    );
}

#[tokio::test]
async fn test_registered_federated_actor_is_elevated() {
    let registry = Arc::new(MemoryRegistry::new());
    registry
        .save_external_user(&ExternalUser {
            external_source_type: ExternalSourceType::GithubRepo,
            external_id: "acme/site".to_string(),
            full_permissions: true,
        })
        .await
        .unwrap();

    let verifier = StaticVerifier::accepting("acme/site", None);
    let resolver = resolver_with(registry, verifier, vec![]);

    let perms = resolver
        .resolve(remote(), Some("GithubOIDC header.payload.sig"))
        .await
        .unwrap();

    assert!(perms.can_create_deployment());
    assert!(perms.can_create_credentials());
}

#[tokio::test]
async fn test_rejected_federated_token_is_terminal() {
    let registry = Arc::new(MemoryRegistry::new());
    let resolver = resolver_with(registry, StaticVerifier::rejecting(), vec![]);

    // The federated classifier accepted the scheme; its rejection is final
    let result = resolver
        .resolve(remote(), Some("GithubOIDC bad.token.here"))
        .await;
    assert!(matches!(result, Err(ControlError::Unauthenticated(_))));
}

#[tokio::test]
async fn test_token_ids_are_unique_across_issuance() {
    let registry = Arc::new(MemoryRegistry::new());

    let mut ids = std::collections::HashSet::new();
    for _ in 0..16 {
        let token = create_bearer_token(registry.as_ref(), false).await.unwrap();
        let (id, _) = token.expose_secret().split_once('.').unwrap();
        assert!(ids.insert(id.to_string()));
    }

    assert_eq!(registry.tokens.lock().unwrap().len(), 16);
}
