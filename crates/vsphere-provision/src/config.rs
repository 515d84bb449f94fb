use std::env;

use crate::config_spec::DEFAULT_BOOT_ORDER;
use crate::placement::DEFAULT_DATASTORE;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionerConfig {
    /// Datastore for the VM's files when the spec has no volumes.
    pub fallback_datastore: String,
    /// Device written to `bios.bootOrder`.
    pub boot_order: String,
    /// Resolve every volume datastore before submitting `CreateVM_Task`.
    pub validate_datastores: bool,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            fallback_datastore: DEFAULT_DATASTORE.into(),
            boot_order: DEFAULT_BOOT_ORDER.into(),
            validate_datastores: false,
        }
    }
}

impl ProvisionerConfig {
    /// Create from env vars:
    ///
    /// - `VSPHERE_FALLBACK_DATASTORE` (default: `"datastore1"`)
    /// - `VSPHERE_BOOT_ORDER` (default: `"ethernet0"`)
    /// - `VSPHERE_VALIDATE_DATASTORES` (`true`/`false`, default: `false`)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let fallback_datastore =
            env::var("VSPHERE_FALLBACK_DATASTORE").unwrap_or(defaults.fallback_datastore);
        let boot_order = env::var("VSPHERE_BOOT_ORDER").unwrap_or(defaults.boot_order);
        let validate_datastores = match env::var("VSPHERE_VALIDATE_DATASTORES") {
            Ok(raw) => parse_flag("VSPHERE_VALIDATE_DATASTORES", &raw)?,
            Err(_) => defaults.validate_datastores,
        };

        Ok(Self {
            fallback_datastore,
            boot_order,
            validate_datastores,
        })
    }
}

fn parse_flag(var: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(Error::InvalidEnv {
            var: var.to_string(),
            value: raw.to_string(),
        }),
    }
}
