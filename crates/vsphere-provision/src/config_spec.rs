use vsphere_api::{
    OptionValue, VirtualDeviceConfigSpec, VirtualMachineConfigSpec, VirtualMachineFileInfo,
};

use crate::placement::Placement;
use crate::types::MachineSpec;

/// `extraConfig` key holding the BIOS boot device order.
pub const BOOT_ORDER_KEY: &str = "bios.bootOrder";

/// Boot device used unless configured otherwise: the first NIC.
pub const DEFAULT_BOOT_ORDER: &str = "ethernet0";

/// Assemble the `VirtualMachineConfigSpec` for `CreateVM_Task`.
pub fn config_spec(
    spec: &MachineSpec,
    placement: &Placement,
    devices: Vec<VirtualDeviceConfigSpec>,
    boot_order: &str,
) -> VirtualMachineConfigSpec {
    VirtualMachineConfigSpec {
        name: spec.name.clone(),
        guest_id: spec.guest_id.clone(),
        version: spec.hardware_version.clone(),
        files: VirtualMachineFileInfo {
            vm_path_name: placement.path_prefix(),
        },
        num_cpus: spec.cpus,
        num_cores_per_socket: spec.cores_per_socket,
        memory_mb: spec.memory_mb,
        device_change: devices,
        extra_config: vec![OptionValue {
            key: BOOT_ORDER_KEY.into(),
            value: boot_order.into(),
        }],
        cpu_hot_add_enabled: spec.cpu_hot_add_enabled,
        memory_hot_add_enabled: spec.memory_hot_add_enabled,
        firmware: spec.firmware,
    }
}

#[cfg(test)]
mod tests {
    use vsphere_api::Firmware;

    use super::*;

    fn spec() -> MachineSpec {
        MachineSpec {
            name: "build-agent".into(),
            guest_id: "centos7_64Guest".into(),
            hardware_version: "vmx-15".into(),
            cpus: 8,
            cores_per_socket: 4,
            memory_mb: 16384,
            firmware: None,
            cpu_hot_add_enabled: None,
            memory_hot_add_enabled: None,
            datacenter: "dc1".into(),
            cluster: "cl1".into(),
            resource_pool: None,
            path: "ci".into(),
            interfaces: vec![],
            volumes: vec![],
            scsi_controller: None,
        }
    }

    #[test]
    fn required_fields_are_always_present() {
        let placement = Placement::Datastore("ds1".into());
        let config = config_spec(&spec(), &placement, vec![], DEFAULT_BOOT_ORDER);
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["name"], "build-agent");
        assert_eq!(json["guestId"], "centos7_64Guest");
        assert_eq!(json["version"], "vmx-15");
        assert_eq!(json["numCPUs"], 8);
        assert_eq!(json["numCoresPerSocket"], 4);
        assert_eq!(json["memoryMB"], 16384);
        assert_eq!(json["files"]["vmPathName"], "[ds1]");
        assert_eq!(json["deviceChange"], serde_json::json!([]));
        assert_eq!(
            json["extraConfig"],
            serde_json::json!([{ "key": "bios.bootOrder", "value": "ethernet0" }])
        );
    }

    #[test]
    fn unset_optionals_are_omitted() {
        let placement = Placement::Datastore("ds1".into());
        let config = config_spec(&spec(), &placement, vec![], DEFAULT_BOOT_ORDER);
        let json = serde_json::to_value(&config).unwrap();

        assert!(json.get("firmware").is_none());
        assert!(json.get("cpuHotAddEnabled").is_none());
        assert!(json.get("memoryHotAddEnabled").is_none());
    }

    #[test]
    fn explicit_false_is_sent() {
        let spec = MachineSpec {
            cpu_hot_add_enabled: Some(false),
            memory_hot_add_enabled: Some(true),
            firmware: Some(Firmware::Efi),
            ..spec()
        };
        let placement = Placement::Datastore("ds1".into());
        let config = config_spec(&spec, &placement, vec![], DEFAULT_BOOT_ORDER);
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["cpuHotAddEnabled"], false);
        assert_eq!(json["memoryHotAddEnabled"], true);
        assert_eq!(json["firmware"], "efi");
    }

    #[test]
    fn storage_pod_path_is_empty() {
        let placement = Placement::StoragePod("pod-gold".into());
        let config = config_spec(&spec(), &placement, vec![], "cdrom");
        assert_eq!(config.files.vm_path_name, "");
        assert_eq!(config.extra_config[0].value, "cdrom");
    }
}
