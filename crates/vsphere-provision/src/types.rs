use std::fmt;

use serde::{Deserialize, Serialize};
use vsphere_api::{DeviceOperation, DiskMode, EthernetCardType, Firmware, ScsiControllerType};

use crate::{Error, Result};

/// Stable identifier of a created VM: its `config.instanceUuid`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MachineId(pub String);

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declarative description of a VM to create.
///
/// `firmware` and the hot-add flags are tri-state: `None` means "leave it to
/// the platform" and is never sent, which is not the same as `Some(false)`.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineSpec {
    pub name: String,
    pub guest_id: String,
    pub hardware_version: String,
    pub cpus: u32,
    pub cores_per_socket: u32,
    pub memory_mb: u64,
    pub firmware: Option<Firmware>,
    pub cpu_hot_add_enabled: Option<bool>,
    pub memory_hot_add_enabled: Option<bool>,
    pub datacenter: String,
    pub cluster: String,
    pub resource_pool: Option<String>,
    /// Folder path below the datacenter's VM folder. Empty means the root.
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub interfaces: Vec<Interface>,
    #[serde(default)]
    pub volumes: Vec<Volume>,
    pub scsi_controller: Option<ControllerOptions>,
}

impl MachineSpec {
    /// Check the volume placement rules before anything is sent to the platform.
    ///
    /// A volume names either a datastore or a storage pod, and at most one
    /// volume of the machine names a storage pod.
    pub fn validate(&self) -> Result<()> {
        for (position, volume) in self.volumes.iter().enumerate() {
            if volume.datastore.is_some() && volume.storage_pod.is_some() {
                return Err(Error::InvalidSpec(format!(
                    "volume {position} sets both a datastore and a storage pod"
                )));
            }
        }

        let pods = self
            .volumes
            .iter()
            .filter(|v| v.storage_pod.is_some())
            .count();
        if pods > 1 {
            return Err(Error::InvalidSpec(format!(
                "{pods} volumes set a storage pod, at most one is allowed"
            )));
        }

        Ok(())
    }
}

/// A virtual NIC.
#[derive(Debug, Clone, Deserialize)]
pub struct Interface {
    /// Network (port group) name.
    pub network: String,
    /// Distributed switch the port group belongs to, when the name is ambiguous.
    pub virtual_switch: Option<String>,
    #[serde(rename = "type", default)]
    pub device_type: EthernetCardType,
    pub name: String,
    #[serde(default)]
    pub summary: String,
}

/// A virtual disk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Volume {
    pub datastore: Option<String>,
    pub storage_pod: Option<String>,
    #[serde(default)]
    pub mode: DiskMode,
    pub thin: Option<bool>,
    pub eager_zero: Option<bool>,
    /// Capacity in KB.
    pub size: i64,
    pub key: Option<i32>,
}

/// Caller overrides for the SCSI controller. Unset fields keep their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControllerOptions {
    pub operation: Option<DeviceOperation>,
    #[serde(rename = "type")]
    pub controller_type: Option<ScsiControllerType>,
    pub key: Option<i32>,
    #[serde(alias = "bus_id")]
    pub bus_number: Option<i32>,
    pub shared: Option<SharedOption>,
}

/// Requested bus sharing, as loosely as callers express it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SharedOption {
    Flag(bool),
    Mode(String),
    Other(serde_json::Value),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume(datastore: Option<&str>, storage_pod: Option<&str>) -> Volume {
        Volume {
            datastore: datastore.map(Into::into),
            storage_pod: storage_pod.map(Into::into),
            size: 1024,
            ..Default::default()
        }
    }

    fn spec(volumes: Vec<Volume>) -> MachineSpec {
        serde_json::from_value::<MachineSpec>(serde_json::json!({
            "name": "web-1",
            "guest_id": "otherGuest64",
            "hardware_version": "vmx-13",
            "cpus": 2,
            "cores_per_socket": 1,
            "memory_mb": 2048,
            "datacenter": "dc1",
            "cluster": "cl1",
        }))
        .map(|mut s| {
            s.volumes = volumes;
            s
        })
        .unwrap()
    }

    #[test]
    fn deserializes_tri_state_flags() {
        let spec: MachineSpec = serde_json::from_value(serde_json::json!({
            "name": "web-1",
            "guest_id": "otherGuest64",
            "hardware_version": "vmx-13",
            "cpus": 2,
            "cores_per_socket": 1,
            "memory_mb": 2048,
            "cpu_hot_add_enabled": false,
            "firmware": "efi",
            "datacenter": "dc1",
            "cluster": "cl1",
            "path": "prod/web",
            "interfaces": [{ "network": "VM Network", "type": "VirtualE1000", "name": "nic0" }],
            "volumes": [{ "datastore": "ds1", "mode": "independent_persistent", "size": 10240 }],
            "scsi_controller": { "type": "ParaVirtualSCSIController", "bus_id": 1, "shared": true },
        }))
        .unwrap();

        assert_eq!(spec.cpu_hot_add_enabled, Some(false));
        assert_eq!(spec.memory_hot_add_enabled, None);
        assert_eq!(spec.firmware, Some(Firmware::Efi));
        assert_eq!(spec.interfaces[0].device_type, EthernetCardType::E1000);
        assert_eq!(spec.volumes[0].mode, DiskMode::IndependentPersistent);

        let controller = spec.scsi_controller.unwrap();
        assert_eq!(controller.controller_type, Some(ScsiControllerType::ParaVirtual));
        assert_eq!(controller.bus_number, Some(1));
        assert_eq!(controller.shared, Some(SharedOption::Flag(true)));
    }

    #[test]
    fn unknown_controller_type_is_rejected() {
        let result = serde_json::from_value::<ControllerOptions>(serde_json::json!({
            "type": "VirtualFloppyController",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn shared_option_keeps_whatever_was_given() {
        let options: ControllerOptions =
            serde_json::from_value(serde_json::json!({ "shared": "physicalSharing" })).unwrap();
        assert_eq!(options.shared, Some(SharedOption::Mode("physicalSharing".into())));

        let options: ControllerOptions =
            serde_json::from_value(serde_json::json!({ "shared": 3 })).unwrap();
        assert_eq!(options.shared, Some(SharedOption::Other(serde_json::json!(3))));
    }

    #[test]
    fn single_storage_pod_is_valid() {
        let spec = spec(vec![
            volume(Some("ds1"), None),
            volume(None, Some("pod1")),
        ]);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn two_storage_pods_are_rejected() {
        let spec = spec(vec![
            volume(None, Some("pod1")),
            volume(None, Some("pod2")),
        ]);
        assert!(matches!(spec.validate(), Err(Error::InvalidSpec(_))));
    }

    #[test]
    fn datastore_and_pod_on_one_volume_is_rejected() {
        let spec = spec(vec![volume(Some("ds1"), Some("pod1"))]);
        assert!(matches!(spec.validate(), Err(Error::InvalidSpec(_))));
    }
}
