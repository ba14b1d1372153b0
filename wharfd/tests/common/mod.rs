//! Shared in-process test doubles

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use wharfd::authn::federated::{FederatedClaims, FederatedVerifier};
use wharfd::errors::ControlError;
use wharfd::models::credentials::{BearerTokenRecord, ExternalUser};
use wharfd::models::deployment::Deployment;
use wharfd::registry::Registry;
use wharfd::edge::EdgeEngine;
use wharfd::routes::table::RouteTable;

/// In-memory registry honoring the dont_persist contract
#[derive(Default)]
pub struct MemoryRegistry {
    pub deployments: Mutex<Vec<Deployment>>,
    pub users: Mutex<HashMap<String, ExternalUser>>,
    pub tokens: Mutex<HashMap<String, BearerTokenRecord>>,
    pub fail_saves: AtomicBool,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved_deployments(&self) -> Vec<Deployment> {
        self.deployments.lock().unwrap().clone()
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn save_deployments(&self, deployments: &[Deployment]) -> Result<(), ControlError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(ControlError::PersistenceFailed("disk full".to_string()));
        }
        let persisted: Vec<Deployment> = deployments
            .iter()
            .filter(|d| !d.metadata.dont_persist)
            .cloned()
            .collect();
        *self.deployments.lock().unwrap() = persisted;
        Ok(())
    }

    async fn get_deployments(&self) -> Result<Vec<Deployment>, ControlError> {
        Ok(self.deployments.lock().unwrap().clone())
    }

    async fn save_external_user(&self, user: &ExternalUser) -> Result<(), ControlError> {
        self.users
            .lock()
            .unwrap()
            .insert(user.external_id.clone(), user.clone());
        Ok(())
    }

    async fn get_external_user(&self, id: &str) -> Result<Option<ExternalUser>, ControlError> {
        Ok(self.users.lock().unwrap().get(id).cloned())
    }

    async fn save_bearer_token(&self, token: &BearerTokenRecord) -> Result<(), ControlError> {
        self.tokens
            .lock()
            .unwrap()
            .insert(token.id.clone(), token.clone());
        Ok(())
    }

    async fn get_bearer_token(&self, id: &str) -> Result<Option<BearerTokenRecord>, ControlError> {
        Ok(self.tokens.lock().unwrap().get(id).cloned())
    }
}

/// Edge engine double that records every push and can reject the next one
#[derive(Default)]
pub struct RecordingEdge {
    pub pushes: Mutex<Vec<RouteTable>>,
    pub fail_next: AtomicBool,
}

impl RecordingEdge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_push(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn last_push(&self) -> RouteTable {
        self.pushes
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no route table was pushed")
    }

    pub fn push_count(&self) -> usize {
        self.pushes.lock().unwrap().len()
    }
}

#[async_trait]
impl EdgeEngine for RecordingEdge {
    async fn deploy_all(&self, table: &RouteTable) -> Result<(), ControlError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ControlError::UpstreamPushFailed(
                "engine rejected table".to_string(),
            ));
        }
        self.pushes.lock().unwrap().push(table.clone());
        Ok(())
    }

    async fn stop(&self) -> Result<(), ControlError> {
        Ok(())
    }
}

/// Verifier double returning fixed claims, or rejecting everything
pub struct StaticVerifier {
    pub claims: Option<FederatedClaims>,
}

impl StaticVerifier {
    pub fn accepting(repository: &str, git_ref: Option<&str>) -> Self {
        Self {
            claims: Some(FederatedClaims {
                sub: format!("repo:{}", repository),
                repository: repository.to_string(),
                git_ref: git_ref.map(String::from),
                exp: i64::MAX,
            }),
        }
    }

    pub fn rejecting() -> Self {
        Self { claims: None }
    }
}

#[async_trait]
impl FederatedVerifier for StaticVerifier {
    async fn verify(&self, _token: &str) -> Result<FederatedClaims, ControlError> {
        match &self.claims {
            Some(claims) => Ok(claims.clone()),
            None => Err(ControlError::Unauthenticated(
                "token rejected".to_string(),
            )),
        }
    }
}
