//! Business logic services

pub mod approvals;
pub mod auth;
pub mod equipment;
pub mod requests;

use std::sync::Arc;

use crate::{config::AuthConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub equipment: equipment::EquipmentService,
    pub requests: requests::RequestService,
    pub approvals: approvals::ApprovalService,
    pub auth: Arc<dyn auth::CredentialVerifier>,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, auth_config: &AuthConfig) -> AppResult<Self> {
        let verifier = auth::build_verifier(auth_config)?;
        Ok(Self::with_verifier(repository, verifier))
    }

    /// Create all services with an already built credential verifier
    pub fn with_verifier(repository: Repository, verifier: Arc<dyn auth::CredentialVerifier>) -> Self {
        let requests = requests::RequestService::new(repository.clone());
        Self {
            equipment: equipment::EquipmentService::new(repository.clone()),
            approvals: approvals::ApprovalService::new(repository.clone(), requests.clone()),
            requests,
            auth: verifier,
            repository,
        }
    }

    /// Storage readiness, used by the readiness probe
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}
