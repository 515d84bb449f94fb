use tracing::{debug, warn};
use vsphere_api::Revision;

use crate::types::{MachineSpec, Volume};

/// Datastore used for the VM's files when the spec has no volumes.
pub const DEFAULT_DATASTORE: &str = "datastore1";

/// Where the VM's files and disks are placed.
///
/// Computed once per request: the config spec's `vmPathName` and every disk
/// backing are derived from the same decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Explicit datastore; holds the datastore of the VM's own files.
    Datastore(String),
    /// Storage DRS picks the datastores inside this storage pod.
    StoragePod(String),
}

impl Placement {
    /// Decide placement for `spec`.
    ///
    /// The first volume naming a storage pod moves the whole VM onto that pod,
    /// provided the endpoint supports storage DRS. Otherwise the VM's files
    /// follow its first volume, or `fallback_datastore` without volumes.
    pub fn resolve(spec: &MachineSpec, revision: Revision, fallback_datastore: &str) -> Self {
        let requested_pod = spec.volumes.iter().find_map(|v| v.storage_pod.as_deref());

        if let Some(pod) = requested_pod {
            if revision.supports_storage_drs() {
                debug!(vm = %spec.name, storage_pod = pod, "placing vm on storage pod");
                return Self::StoragePod(pod.to_string());
            }
            warn!(
                vm = %spec.name,
                storage_pod = pod,
                %revision,
                "storage pods need api revision 5.0 or later, using datastores"
            );
        }

        let datastore = spec
            .volumes
            .first()
            .and_then(|v| v.datastore.as_deref())
            .unwrap_or(fallback_datastore);

        debug!(vm = %spec.name, datastore, "placing vm on datastore");
        Self::Datastore(datastore.to_string())
    }

    pub fn is_storage_pod(&self) -> bool {
        matches!(self, Self::StoragePod(_))
    }

    /// `files.vmPathName` for the config spec. Storage DRS requires it empty.
    pub fn path_prefix(&self) -> String {
        match self {
            Self::Datastore(name) => format!("[{name}]"),
            Self::StoragePod(_) => String::new(),
        }
    }

    /// Backing file name for a disk. Storage DRS requires it empty.
    ///
    /// A volume without its own datastore lands next to the VM's files.
    pub fn disk_file_name(&self, volume: &Volume) -> String {
        match self {
            Self::Datastore(name) => {
                format!("[{}]", volume.datastore.as_deref().unwrap_or(name))
            }
            Self::StoragePod(_) => String::new(),
        }
    }
}
