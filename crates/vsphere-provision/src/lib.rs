//! Turns a declarative [`MachineSpec`] into a vSphere `VirtualMachineConfigSpec`
//! and drives the VM's creation, either directly on a datastore or through a
//! storage DRS recommendation on a storage pod.

pub mod config;
pub mod config_spec;
pub mod devices;
pub mod placement;
pub mod types;

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, error, info};
use vsphere_api::{
    ApplyStorageRecommendationResult, ManagedObjectRef, StorageDrsPodSelectionSpec,
    StoragePlacementSpec, StoragePlacementType, Task, TaskResult, VirtualMachine,
    VirtualMachineConfigSpec, Vsphere,
};

pub use config::ProvisionerConfig;
pub use placement::Placement;
pub use types::{ControllerOptions, Interface, MachineId, MachineSpec, SharedOption, Volume};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{kind} `{name}` lookup failed: {source}")]
    Lookup {
        kind: &'static str,
        name: String,
        #[source]
        source: vsphere_api::Error,
    },

    #[error("api revision query failed: {0}")]
    Revision(#[source] vsphere_api::Error),

    #[error("could not create vm on storage pod `{storage_pod}`, did not get a storage recommendation")]
    NoStorageRecommendation { storage_pod: String },

    #[error("{task} failed: {source}")]
    RemoteTask {
        task: String,
        #[source]
        source: vsphere_api::Error,
    },

    #[error("{task} returned an unexpected result")]
    UnexpectedTaskResult { task: String },

    #[error("invalid machine spec: {0}")]
    InvalidSpec(String),

    #[error("invalid value for env var {var}: {value}")]
    InvalidEnv { var: String, value: String },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure of [`Provisioner::create_vm`], whichever step failed.
///
/// The underlying [`Error`] is kept as the source.
#[derive(Debug, thiserror::Error)]
#[error("{message}: {source}")]
pub struct CreateVmError {
    message: &'static str,
    #[source]
    source: Error,
}

impl CreateVmError {
    fn new(source: Error) -> Self {
        Self {
            message: "failed to create vm",
            source,
        }
    }

    pub fn kind(&self) -> &Error {
        &self.source
    }

    pub fn into_inner(self) -> Error {
        self.source
    }
}

/// Creates VMs through a [`Vsphere`] connection.
#[derive(Clone)]
pub struct Provisioner {
    vsphere: Arc<dyn Vsphere>,
    config: ProvisionerConfig,
}

impl Provisioner {
    pub fn new(vsphere: Arc<dyn Vsphere>, config: ProvisionerConfig) -> Self {
        Self { vsphere, config }
    }

    /// Create with configuration from env vars, see [`ProvisionerConfig::from_env`].
    pub fn from_env(vsphere: Arc<dyn Vsphere>) -> Result<Self> {
        Ok(Self::new(vsphere, ProvisionerConfig::from_env()?))
    }

    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    /// Create the VM described by `spec` and return its instance UUID.
    pub async fn create_vm(
        &self,
        spec: &MachineSpec,
    ) -> std::result::Result<MachineId, CreateVmError> {
        self.try_create_vm(spec).await.map_err(|e| {
            error!(vm = %spec.name, error = %e, "vsphere: vm creation failed");
            CreateVmError::new(e)
        })
    }

    async fn try_create_vm(&self, spec: &MachineSpec) -> Result<MachineId> {
        spec.validate()?;

        let pool = self.resource_pool(spec).await?;
        let folder = self
            .vsphere
            .vm_folder(&spec.datacenter, &spec.path)
            .await
            .map_err(|source| Error::Lookup {
                kind: "folder",
                name: spec.path.clone(),
                source,
            })?;

        let revision = self.vsphere.revision().await.map_err(Error::Revision)?;
        let placement = Placement::resolve(spec, revision, &self.config.fallback_datastore);
        let devices = devices::device_change(self.vsphere.as_ref(), spec, &placement).await?;
        let config = config_spec::config_spec(spec, &placement, devices, &self.config.boot_order);

        let vm = match &placement {
            Placement::StoragePod(pod) => {
                self.create_on_storage_pod(spec, pod, config, folder, pool)
                    .await?
            }
            Placement::Datastore(_) => {
                self.create_on_datastore(spec, &config, &folder, &pool)
                    .await?
            }
        };

        info!(
            vm = %vm.name,
            instance_uuid = %vm.instance_uuid,
            storage_pod = placement.is_storage_pod(),
            "vsphere: vm created"
        );
        Ok(MachineId(vm.instance_uuid))
    }

    async fn resource_pool(&self, spec: &MachineSpec) -> Result<ManagedObjectRef> {
        match &spec.resource_pool {
            Some(name) => self
                .vsphere
                .resource_pool(&spec.datacenter, &spec.cluster, name)
                .await
                .map_err(|source| Error::Lookup {
                    kind: "resource pool",
                    name: name.clone(),
                    source,
                }),
            None => self
                .vsphere
                .cluster_resource_pool(&spec.datacenter, &spec.cluster)
                .await
                .map_err(|source| Error::Lookup {
                    kind: "cluster",
                    name: spec.cluster.clone(),
                    source,
                }),
        }
    }

    async fn create_on_datastore(
        &self,
        spec: &MachineSpec,
        config: &VirtualMachineConfigSpec,
        folder: &ManagedObjectRef,
        pool: &ManagedObjectRef,
    ) -> Result<VirtualMachine> {
        if self.config.validate_datastores {
            let datastores: BTreeSet<&str> = spec
                .volumes
                .iter()
                .filter_map(|v| v.datastore.as_deref())
                .collect();
            for name in datastores {
                self.vsphere
                    .datastore(&spec.datacenter, name)
                    .await
                    .map_err(|source| Error::Lookup {
                        kind: "datastore",
                        name: name.to_string(),
                        source,
                    })?;
            }
        }

        let task = self
            .vsphere
            .create_vm_task(folder, pool, config)
            .await
            .map_err(|source| Error::RemoteTask {
                task: "CreateVM_Task".into(),
                source,
            })?;
        info!(vm = %config.name, task = %task.reference, "vsphere: create task submitted");

        match self.wait(&task).await? {
            TaskResult::VirtualMachine(vm) => Ok(vm),
            _ => Err(Error::UnexpectedTaskResult { task: task.name }),
        }
    }

    async fn create_on_storage_pod(
        &self,
        spec: &MachineSpec,
        pod: &str,
        config: VirtualMachineConfigSpec,
        folder: ManagedObjectRef,
        pool: ManagedObjectRef,
    ) -> Result<VirtualMachine> {
        let storage_pod = self
            .vsphere
            .storage_pod(&spec.datacenter, pod)
            .await
            .map_err(|source| Error::Lookup {
                kind: "storage pod",
                name: pod.to_string(),
                source,
            })?;

        let placement_spec = StoragePlacementSpec {
            kind: StoragePlacementType::Create,
            folder,
            resource_pool: pool,
            pod_selection_spec: StorageDrsPodSelectionSpec { storage_pod },
            config_spec: config,
        };

        let result = self
            .vsphere
            .recommend_datastores(&placement_spec)
            .await
            .map_err(|source| Error::RemoteTask {
                task: "RecommendDatastores".into(),
                source,
            })?;

        let Some(recommendation) = result.recommendations.first() else {
            return Err(Error::NoStorageRecommendation {
                storage_pod: pod.to_string(),
            });
        };
        debug!(
            vm = %spec.name,
            storage_pod = pod,
            key = %recommendation.key,
            recommendations = result.recommendations.len(),
            "applying storage recommendation"
        );

        let task = self
            .vsphere
            .apply_storage_drs_recommendation_task(&[recommendation.key.clone()])
            .await
            .map_err(|source| Error::RemoteTask {
                task: "ApplyStorageDrsRecommendation_Task".into(),
                source,
            })?;
        info!(vm = %spec.name, task = %task.reference, "vsphere: storage recommendation task submitted");

        // The VM only exists in the task result; the config spec has no reference to it.
        match self.wait(&task).await? {
            TaskResult::ApplyStorageRecommendation(ApplyStorageRecommendationResult {
                vm: Some(vm),
            }) => Ok(vm),
            _ => Err(Error::UnexpectedTaskResult { task: task.name }),
        }
    }

    async fn wait(&self, task: &Task) -> Result<TaskResult> {
        self.vsphere
            .wait_for_task(task)
            .await
            .map_err(|source| Error::RemoteTask {
                task: task.name.clone(),
                source,
            })
    }
}
