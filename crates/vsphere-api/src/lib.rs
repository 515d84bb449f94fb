//! Typed vSphere object model and the collaborator interface used to drive it.
//!
//! Covers the subset needed for creating virtual machines:
//! config specs, device changes, storage DRS placement and tasks.

mod network;
mod types;

pub use network::*;
pub use types::*;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{kind} `{name}` not found")]
    NotFound { kind: &'static str, name: String },

    #[error("vsphere fault: {0}")]
    Fault(String),

    #[error("task {task} failed: {message}")]
    TaskFailed { task: String, message: String },

    #[error("unknown device type: {0}")]
    UnknownDeviceType(String),

    #[error("invalid api revision: {0}")]
    InvalidRevision(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Connection to a vCenter/ESXi endpoint.
///
/// Lookups are read-only and idempotent. `wait_for_task` blocks until the
/// task reaches a terminal state and fails with [`Error::TaskFailed`] when
/// that state is `error`.
#[async_trait]
pub trait Vsphere: Send + Sync {
    /// API revision of the endpoint.
    async fn revision(&self) -> Result<Revision>;

    /// Named resource pool inside a cluster.
    async fn resource_pool(
        &self,
        datacenter: &str,
        cluster: &str,
        name: &str,
    ) -> Result<ManagedObjectRef>;

    /// Root resource pool of a cluster.
    async fn cluster_resource_pool(&self, datacenter: &str, cluster: &str)
    -> Result<ManagedObjectRef>;

    /// VM folder by slash-separated path below the datacenter's `vm` folder.
    async fn vm_folder(&self, datacenter: &str, path: &str) -> Result<ManagedObjectRef>;

    /// Network by name, optionally restricted to one distributed switch.
    async fn network(
        &self,
        datacenter: &str,
        name: &str,
        virtual_switch: Option<&str>,
    ) -> Result<Box<dyn NetworkRef>>;

    async fn storage_pod(&self, datacenter: &str, name: &str) -> Result<ManagedObjectRef>;

    async fn datastore(&self, datacenter: &str, name: &str) -> Result<ManagedObjectRef>;

    // ── Mutating ─────────────────────────────────────────────────────

    /// `Folder.CreateVM_Task`.
    async fn create_vm_task(
        &self,
        folder: &ManagedObjectRef,
        pool: &ManagedObjectRef,
        config: &VirtualMachineConfigSpec,
    ) -> Result<Task>;

    /// `StorageResourceManager.RecommendDatastores`.
    async fn recommend_datastores(
        &self,
        spec: &StoragePlacementSpec,
    ) -> Result<StoragePlacementResult>;

    /// `StorageResourceManager.ApplyStorageDrsRecommendation_Task`.
    async fn apply_storage_drs_recommendation_task(&self, keys: &[String]) -> Result<Task>;

    async fn wait_for_task(&self, task: &Task) -> Result<TaskResult>;
}
