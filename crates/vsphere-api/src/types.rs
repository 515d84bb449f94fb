use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::Error;

// ── Managed objects ──────────────────────────────────────────────────

/// Server-side reference to a managed object (`ResourcePool`, `Folder`, `StoragePod`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManagedObjectRef {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl ManagedObjectRef {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for ManagedObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// API revision reported by the connected vCenter/ESXi endpoint, e.g. `"6.7"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision {
    pub major: u32,
    pub minor: u32,
}

impl Revision {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Storage DRS (storage pods and placement recommendations) exists from 5.0 on.
    pub fn supports_storage_drs(&self) -> bool {
        self.major >= 5
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Revision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidRevision(s.to_string());
        let mut parts = s.trim().split('.');

        let major = parts
            .next()
            .and_then(|p| p.parse::<u32>().ok())
            .ok_or_else(invalid)?;
        let minor = match parts.next() {
            Some(p) => p.parse::<u32>().map_err(|_| invalid())?,
            None => 0,
        };

        Ok(Self { major, minor })
    }
}

// ── VM configuration ─────────────────────────────────────────────────

/// `VirtualMachineConfigSpec` as submitted to `CreateVM_Task`.
///
/// The optional fields are skipped entirely when unset: the platform treats
/// an absent `cpuHotAddEnabled` differently from an explicit `false`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineConfigSpec {
    pub name: String,
    pub guest_id: String,
    pub version: String,
    pub files: VirtualMachineFileInfo,
    #[serde(rename = "numCPUs")]
    pub num_cpus: u32,
    pub num_cores_per_socket: u32,
    #[serde(rename = "memoryMB")]
    pub memory_mb: u64,
    pub device_change: Vec<VirtualDeviceConfigSpec>,
    pub extra_config: Vec<OptionValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_hot_add_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_hot_add_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware: Option<Firmware>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineFileInfo {
    pub vm_path_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionValue {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Firmware {
    Bios,
    Efi,
}

// ── Device changes ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceOperation {
    #[default]
    Add,
    Remove,
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOperation {
    Create,
    Destroy,
    Replace,
}

/// One entry of `VirtualMachineConfigSpec.deviceChange`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualDeviceConfigSpec {
    pub operation: DeviceOperation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_operation: Option<FileOperation>,
    pub device: VirtualDevice,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VirtualDevice {
    EthernetCard(VirtualEthernetCard),
    ScsiController(VirtualScsiController),
    Disk(VirtualDisk),
}

impl VirtualDevice {
    pub fn key(&self) -> i32 {
        match self {
            Self::EthernetCard(card) => card.key,
            Self::ScsiController(controller) => controller.key,
            Self::Disk(disk) => disk.key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Description {
    pub label: String,
    pub summary: String,
}

// ── Ethernet cards ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualEthernetCard {
    #[serde(rename = "_typeName")]
    pub kind: EthernetCardType,
    pub key: i32,
    pub device_info: Description,
    pub backing: EthernetCardBacking,
    pub address_type: AddressType,
}

/// Supported virtual NIC models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum EthernetCardType {
    #[default]
    Vmxnet3,
    Vmxnet2,
    Vmxnet,
    E1000,
    E1000e,
    PcNet32,
    Sriov,
}

impl EthernetCardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vmxnet3 => "VirtualVmxnet3",
            Self::Vmxnet2 => "VirtualVmxnet2",
            Self::Vmxnet => "VirtualVmxnet",
            Self::E1000 => "VirtualE1000",
            Self::E1000e => "VirtualE1000e",
            Self::PcNet32 => "VirtualPCNet32",
            Self::Sriov => "VirtualSriovEthernetCard",
        }
    }
}

impl FromStr for EthernetCardType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "VirtualVmxnet3" | "vmxnet3" => Ok(Self::Vmxnet3),
            "VirtualVmxnet2" | "vmxnet2" => Ok(Self::Vmxnet2),
            "VirtualVmxnet" | "vmxnet" => Ok(Self::Vmxnet),
            "VirtualE1000" | "e1000" => Ok(Self::E1000),
            "VirtualE1000e" | "e1000e" => Ok(Self::E1000e),
            "VirtualPCNet32" | "pcnet32" => Ok(Self::PcNet32),
            "VirtualSriovEthernetCard" | "sriov" => Ok(Self::Sriov),
            other => Err(Error::UnknownDeviceType(other.to_string())),
        }
    }
}

impl TryFrom<String> for EthernetCardType {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Error> {
        s.parse()
    }
}

impl Serialize for EthernetCardType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for EthernetCardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressType {
    Generated,
    Manual,
    Assigned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EthernetCardBacking {
    Network(VirtualEthernetCardNetworkBackingInfo),
    DistributedPort(VirtualEthernetCardDistributedVirtualPortBackingInfo),
}

/// Backing on a standard (host-local) port group, addressed by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "_typeName", rename_all = "camelCase")]
pub struct VirtualEthernetCardNetworkBackingInfo {
    pub device_name: String,
}

/// Backing on a distributed switch port group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "_typeName")]
pub struct VirtualEthernetCardDistributedVirtualPortBackingInfo {
    pub port: DistributedVirtualSwitchPortConnection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "_typeName", rename_all = "camelCase")]
pub struct DistributedVirtualSwitchPortConnection {
    pub portgroup_key: String,
    pub switch_uuid: String,
}

// ── SCSI controllers ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualScsiController {
    #[serde(rename = "_typeName")]
    pub kind: ScsiControllerType,
    pub key: i32,
    pub bus_number: i32,
    pub shared_bus: SharedBus,
}

/// Supported SCSI controller models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum ScsiControllerType {
    #[default]
    LsiLogic,
    LsiLogicSas,
    ParaVirtual,
    BusLogic,
}

impl ScsiControllerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LsiLogic => "VirtualLsiLogicController",
            Self::LsiLogicSas => "VirtualLsiLogicSASController",
            Self::ParaVirtual => "ParaVirtualSCSIController",
            Self::BusLogic => "VirtualBusLogicController",
        }
    }
}

impl FromStr for ScsiControllerType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "VirtualLsiLogicController" | "lsilogic" => Ok(Self::LsiLogic),
            "VirtualLsiLogicSASController" | "lsilogic-sas" => Ok(Self::LsiLogicSas),
            "ParaVirtualSCSIController" | "pvscsi" => Ok(Self::ParaVirtual),
            "VirtualBusLogicController" | "buslogic" => Ok(Self::BusLogic),
            other => Err(Error::UnknownDeviceType(other.to_string())),
        }
    }
}

impl TryFrom<String> for ScsiControllerType {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Error> {
        s.parse()
    }
}

impl Serialize for ScsiControllerType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for ScsiControllerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `VirtualSCSISharing` value. Unrecognized modes are passed through as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharedBus {
    NoSharing,
    VirtualSharing,
    Raw(String),
}

impl SharedBus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::NoSharing => "noSharing",
            Self::VirtualSharing => "virtualSharing",
            Self::Raw(mode) => mode,
        }
    }
}

impl Serialize for SharedBus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ── Disks ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "_typeName", rename_all = "camelCase")]
pub struct VirtualDisk {
    pub key: i32,
    pub backing: VirtualDiskFlatVer2BackingInfo,
    pub controller_key: i32,
    pub unit_number: i32,
    #[serde(rename = "capacityInKB")]
    pub capacity_in_kb: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "_typeName", rename_all = "camelCase")]
pub struct VirtualDiskFlatVer2BackingInfo {
    pub file_name: String,
    pub disk_mode: DiskMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thin_provisioned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eagerly_scrub: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiskMode {
    #[default]
    Persistent,
    Nonpersistent,
    Undoable,
    IndependentPersistent,
    IndependentNonpersistent,
    Append,
}

// ── Storage DRS ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoragePlacementType {
    Create,
    Clone,
    Reconfigure,
    Relocate,
}

/// Input to `StorageResourceManager.RecommendDatastores`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "_typeName", rename_all = "camelCase")]
pub struct StoragePlacementSpec {
    #[serde(rename = "type")]
    pub kind: StoragePlacementType,
    pub folder: ManagedObjectRef,
    pub resource_pool: ManagedObjectRef,
    pub pod_selection_spec: StorageDrsPodSelectionSpec,
    pub config_spec: VirtualMachineConfigSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "_typeName", rename_all = "camelCase")]
pub struct StorageDrsPodSelectionSpec {
    pub storage_pod: ManagedObjectRef,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoragePlacementResult {
    #[serde(default)]
    pub recommendations: Vec<ClusterRecommendation>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRecommendation {
    pub key: String,
    #[serde(default)]
    pub rating: i32,
    pub reason_text: Option<String>,
}

// ── Tasks ────────────────────────────────────────────────────────────

/// Handle to an asynchronous server-side task.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Task {
    pub reference: ManagedObjectRef,
    /// Method that spawned the task, e.g. `CreateVM_Task`.
    pub name: String,
}

/// The `info.result` of a task that reached the `success` state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    VirtualMachine(VirtualMachine),
    ApplyStorageRecommendation(ApplyStorageRecommendationResult),
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachine {
    pub reference: ManagedObjectRef,
    pub name: String,
    /// `config.instanceUuid`; stable for the lifetime of the VM.
    pub instance_uuid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ApplyStorageRecommendationResult {
    pub vm: Option<VirtualMachine>,
}
