//! The service catalog port and its in-memory implementation.
//!
//! The catalog answers two questions during booking: what does this service
//! cost and how long does it run, and how many concurrent appointments does
//! its workspace hold.

use crate::types::{ServiceId, ServiceRecord, WorkspaceId, WorkspaceRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Catalog lookup failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No service registered under this id
    #[error("no service registered for {0}")]
    ServiceNotFound(ServiceId),

    /// No workspace registered under this id
    #[error("no workspace registered for {0}")]
    WorkspaceNotFound(WorkspaceId),

    /// The catalog backend is unreachable or degraded
    #[error("service catalog unavailable: {0}")]
    Unavailable(String),
}

/// Port to the service catalog
#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    /// Look up a service by id
    ///
    /// # Errors
    ///
    /// [`CatalogError::ServiceNotFound`] for an unknown id, or
    /// [`CatalogError::Unavailable`] when the backend is degraded.
    async fn find_service(&self, id: ServiceId) -> Result<ServiceRecord, CatalogError>;

    /// Look up a workspace by id
    ///
    /// # Errors
    ///
    /// [`CatalogError::WorkspaceNotFound`] for an unknown id, or
    /// [`CatalogError::Unavailable`] when the backend is degraded.
    async fn find_workspace(&self, id: WorkspaceId) -> Result<WorkspaceRecord, CatalogError>;
}

struct CatalogState {
    services: HashMap<ServiceId, ServiceRecord>,
    workspaces: HashMap<WorkspaceId, WorkspaceRecord>,
}

/// In-memory catalog for tests and the demo binary
#[derive(Clone)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<CatalogState>>,
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCatalog {
    /// Creates an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(CatalogState {
                services: HashMap::new(),
                workspaces: HashMap::new(),
            })),
        }
    }

    /// Register a service at construction time, builder style.
    ///
    /// Only usable before the catalog is shared; a contended lock means the
    /// builder phase is over, which debug builds treat as a bug and release
    /// builds resolve by dropping the record.
    #[must_use]
    pub fn with_service(self, service: ServiceRecord) -> Self {
        {
            let state = self.state.try_write();
            debug_assert!(
                state.is_ok(),
                "with_service called after the catalog was shared"
            );
            if let Ok(mut state) = state {
                state.services.insert(service.id, service);
            }
        }
        self
    }

    /// Register a workspace at construction time, builder style.
    ///
    /// Same sharing rule as [`InMemoryCatalog::with_service`].
    #[must_use]
    pub fn with_workspace(self, workspace: WorkspaceRecord) -> Self {
        {
            let state = self.state.try_write();
            debug_assert!(
                state.is_ok(),
                "with_workspace called after the catalog was shared"
            );
            if let Ok(mut state) = state {
                state.workspaces.insert(workspace.id, workspace);
            }
        }
        self
    }

    /// Flip a service's availability flag, if the service exists
    pub async fn set_service_available(&self, id: ServiceId, available: bool) {
        let mut state = self.state.write().await;
        if let Some(service) = state.services.get_mut(&id) {
            service.available = available;
        }
    }
}

#[async_trait]
impl ServiceCatalog for InMemoryCatalog {
    async fn find_service(&self, id: ServiceId) -> Result<ServiceRecord, CatalogError> {
        let state = self.state.read().await;
        state
            .services
            .get(&id)
            .cloned()
            .ok_or(CatalogError::ServiceNotFound(id))
    }

    async fn find_workspace(&self, id: WorkspaceId) -> Result<WorkspaceRecord, CatalogError> {
        let state = self.state.read().await;
        state
            .workspaces
            .get(&id)
            .cloned()
            .ok_or(CatalogError::WorkspaceNotFound(id))
    }
}
