use std::fmt;

use crate::ManagedObjectRef;

/// A resolved network a virtual NIC can be attached to.
///
/// Distributed port groups expose the portgroup key and owning switch uuid
/// needed for a distributed-port backing; every other network is attached by
/// name.
pub trait NetworkRef: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn reference(&self) -> &ManagedObjectRef;

    fn is_distributed(&self) -> bool {
        false
    }

    fn portgroup_key(&self) -> Option<&str> {
        None
    }

    fn switch_uuid(&self) -> Option<&str> {
        None
    }
}

/// Standard (host-local) network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub name: String,
    pub reference: ManagedObjectRef,
}

impl NetworkRef for Network {
    fn name(&self) -> &str {
        &self.name
    }

    fn reference(&self) -> &ManagedObjectRef {
        &self.reference
    }
}

/// Port group on a distributed virtual switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributedVirtualPortgroup {
    pub name: String,
    pub reference: ManagedObjectRef,
    pub key: String,
    pub switch_uuid: String,
}

impl NetworkRef for DistributedVirtualPortgroup {
    fn name(&self) -> &str {
        &self.name
    }

    fn reference(&self) -> &ManagedObjectRef {
        &self.reference
    }

    fn is_distributed(&self) -> bool {
        true
    }

    fn portgroup_key(&self) -> Option<&str> {
        Some(&self.key)
    }

    fn switch_uuid(&self) -> Option<&str> {
        Some(&self.switch_uuid)
    }
}
