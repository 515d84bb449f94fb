use tracing::debug;
use vsphere_api::{
    AddressType, Description, DeviceOperation, DistributedVirtualSwitchPortConnection,
    EthernetCardBacking, FileOperation, NetworkRef, ScsiControllerType, SharedBus,
    VirtualDevice, VirtualDeviceConfigSpec, VirtualDisk, VirtualDiskFlatVer2BackingInfo,
    VirtualEthernetCard, VirtualEthernetCardDistributedVirtualPortBackingInfo,
    VirtualEthernetCardNetworkBackingInfo, VirtualScsiController, Vsphere,
};

use crate::placement::Placement;
use crate::types::{ControllerOptions, Interface, MachineSpec, SharedOption, Volume};
use crate::{Error, Result};

/// Unit number taken by the SCSI controller itself on its own bus.
pub const CONTROLLER_UNIT_NUMBER: usize = 7;

/// Resolved SCSI controller settings.
///
/// Defaults: `add`, `VirtualLsiLogicController`, key 1000, bus 0, no sharing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    pub operation: DeviceOperation,
    pub kind: ScsiControllerType,
    pub key: i32,
    pub bus_number: i32,
    pub shared_bus: SharedBus,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            operation: DeviceOperation::Add,
            kind: ScsiControllerType::LsiLogic,
            key: 1000,
            bus_number: 0,
            shared_bus: SharedBus::NoSharing,
        }
    }
}

impl ControllerSettings {
    /// Defaults with every field the caller set replaced.
    pub fn with_overrides(options: &ControllerOptions) -> Self {
        let defaults = Self::default();
        Self {
            operation: options.operation.unwrap_or(defaults.operation),
            kind: options.controller_type.unwrap_or(defaults.kind),
            key: options.key.unwrap_or(defaults.key),
            bus_number: options.bus_number.unwrap_or(defaults.bus_number),
            shared_bus: shared_bus(options.shared.as_ref()),
        }
    }

    pub fn device_spec(&self) -> VirtualDeviceConfigSpec {
        VirtualDeviceConfigSpec {
            operation: self.operation,
            file_operation: None,
            device: VirtualDevice::ScsiController(VirtualScsiController {
                kind: self.kind,
                key: self.key,
                bus_number: self.bus_number,
                shared_bus: self.shared_bus.clone(),
            }),
        }
    }
}

/// Map the requested sharing onto a `VirtualSCSISharing` value.
///
/// Anything that is neither a flag nor a mode name falls back to no sharing.
pub fn shared_bus(shared: Option<&SharedOption>) -> SharedBus {
    match shared {
        None | Some(SharedOption::Flag(false)) => SharedBus::NoSharing,
        Some(SharedOption::Flag(true)) => SharedBus::VirtualSharing,
        Some(SharedOption::Mode(mode)) => SharedBus::Raw(mode.clone()),
        Some(SharedOption::Other(_)) => SharedBus::NoSharing,
    }
}

/// Unit number (and default key) of the disk at `position` on the controller.
pub fn unit_number(position: usize) -> i32 {
    let unit = if position >= CONTROLLER_UNIT_NUMBER {
        position + 1
    } else {
        position
    };
    unit as i32
}

pub fn interface_device(
    nic: &Interface,
    index: usize,
    operation: DeviceOperation,
    network: &dyn NetworkRef,
) -> VirtualDeviceConfigSpec {
    VirtualDeviceConfigSpec {
        operation,
        file_operation: None,
        device: VirtualDevice::EthernetCard(VirtualEthernetCard {
            kind: nic.device_type,
            key: index as i32,
            device_info: Description {
                label: nic.name.clone(),
                summary: nic.summary.clone(),
            },
            backing: nic_backing(network),
            address_type: AddressType::Generated,
        }),
    }
}

fn nic_backing(network: &dyn NetworkRef) -> EthernetCardBacking {
    if network.is_distributed()
        && let (Some(portgroup_key), Some(switch_uuid)) =
            (network.portgroup_key(), network.switch_uuid())
    {
        return EthernetCardBacking::DistributedPort(
            VirtualEthernetCardDistributedVirtualPortBackingInfo {
                port: DistributedVirtualSwitchPortConnection {
                    portgroup_key: portgroup_key.to_string(),
                    switch_uuid: switch_uuid.to_string(),
                },
            },
        );
    }

    EthernetCardBacking::Network(VirtualEthernetCardNetworkBackingInfo {
        device_name: network.name().to_string(),
    })
}

pub fn disk_device(
    volume: &Volume,
    position: usize,
    operation: DeviceOperation,
    controller_key: i32,
    placement: &Placement,
) -> VirtualDeviceConfigSpec {
    let unit_number = unit_number(position);
    let adding = operation == DeviceOperation::Add;

    // eagerlyScrub only makes sense on a freshly created thick disk
    let eagerly_scrub =
        (adding && volume.thin == Some(false) && volume.eager_zero == Some(true)).then_some(true);

    VirtualDeviceConfigSpec {
        operation,
        file_operation: Some(if adding {
            FileOperation::Create
        } else {
            FileOperation::Destroy
        }),
        device: VirtualDevice::Disk(VirtualDisk {
            key: volume.key.unwrap_or(unit_number),
            backing: VirtualDiskFlatVer2BackingInfo {
                file_name: placement.disk_file_name(volume),
                disk_mode: volume.mode,
                thin_provisioned: volume.thin,
                eagerly_scrub,
            },
            controller_key,
            unit_number,
            capacity_in_kb: volume.size,
        }),
    }
}

/// Build `deviceChange` for a new VM: NICs, then the SCSI controller, then disks.
///
/// The controller goes before the disks so their `controllerKey` refers to a
/// device the platform has already seen.
pub async fn device_change(
    vsphere: &dyn Vsphere,
    spec: &MachineSpec,
    placement: &Placement,
) -> Result<Vec<VirtualDeviceConfigSpec>> {
    let mut devices = Vec::with_capacity(spec.interfaces.len() + spec.volumes.len() + 1);

    for (index, nic) in spec.interfaces.iter().enumerate() {
        let network = vsphere
            .network(&spec.datacenter, &nic.network, nic.virtual_switch.as_deref())
            .await
            .map_err(|source| Error::Lookup {
                kind: "network",
                name: nic.network.clone(),
                source,
            })?;

        debug!(
            vm = %spec.name,
            network = network.name(),
            distributed = network.is_distributed(),
            "resolved nic network"
        );
        devices.push(interface_device(nic, index, DeviceOperation::Add, network.as_ref()));
    }

    if !spec.volumes.is_empty() {
        let controller = spec
            .scsi_controller
            .as_ref()
            .map(ControllerSettings::with_overrides)
            .unwrap_or_default();
        devices.push(controller.device_spec());

        for (position, volume) in spec.volumes.iter().enumerate() {
            devices.push(disk_device(
                volume,
                position,
                DeviceOperation::Add,
                controller.key,
                placement,
            ));
        }
    }

    debug!(
        vm = %spec.name,
        nics = spec.interfaces.len(),
        disks = spec.volumes.len(),
        "built device change list"
    );
    Ok(devices)
}
