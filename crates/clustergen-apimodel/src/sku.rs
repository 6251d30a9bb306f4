//! Classification of VM sizes (SKUs) by hardware capability and storage tier.
//!
//! Capability lookups never fail: an unknown SKU simply has no special
//! capabilities. Storage tier selection on the other hand rejects sizes it
//! cannot interpret, instead of guessing a tier.
use std::{collections::BTreeSet, fs, path::Path};

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read SKU catalog from {path}", path = path.display()))]
    ReadCatalog {
        source: std::io::Error,
        path: std::path::PathBuf,
    },

    #[snafu(display("failed to parse SKU catalog from {path}", path = path.display()))]
    ParseCatalog {
        source: serde_yaml::Error,
        path: std::path::PathBuf,
    },
}

/// The VM size could not be mapped to a storage tier.
#[derive(Debug, PartialEq, Eq, Snafu)]
#[snafu(display(
    "unknown VM size format {vm_size:?}, expected <TIER>_<FAMILY>[_<VERSION>], e.g. \"Standard_DS2_v2\""
))]
pub struct UnknownSkuFormatError {
    pub vm_size: String,
}

/// The managed disk storage tier backing a VM.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, strum::Display, strum::AsRefStr)]
pub enum StorageAccountType {
    #[serde(rename = "Premium_LRS")]
    #[strum(serialize = "Premium_LRS")]
    PremiumLrs,

    #[serde(rename = "Standard_LRS")]
    #[strum(serialize = "Standard_LRS")]
    StandardLrs,
}

/// Selects the storage tier for `vm_size`.
///
/// VM sizes follow the `<TIER>_<FAMILY>[_<VERSION>]` format. Families
/// supporting premium storage carry an `s` in their name, e.g. `DS2` or
/// `D2s`.
///
/// ```
/// use clustergen_apimodel::sku::{storage_account_type, StorageAccountType};
///
/// assert_eq!(storage_account_type("Standard_DS2_v2"), Ok(StorageAccountType::PremiumLrs));
/// assert_eq!(storage_account_type("Standard_D2_v2"), Ok(StorageAccountType::StandardLrs));
/// assert!(storage_account_type("D2v2").is_err());
/// ```
pub fn storage_account_type(vm_size: &str) -> Result<StorageAccountType, UnknownSkuFormatError> {
    let mut parts = vm_size.split('_');
    let family = match (parts.next(), parts.next()) {
        (Some(tier), Some(family)) if !tier.is_empty() && !family.is_empty() => family,
        _ => return UnknownSkuFormatSnafu { vm_size }.fail(),
    };

    if family.to_ascii_lowercase().contains('s') {
        Ok(StorageAccountType::PremiumLrs)
    } else {
        Ok(StorageAccountType::StandardLrs)
    }
}

/// Capability tables keyed by exact VM size.
///
/// The built-in tables are available via [`SkuCatalog::default`]. A custom
/// catalog can be loaded from a YAML (or JSON) file using
/// [`SkuCatalog::from_file`]:
///
/// ```yaml
/// nvidiaEnabled:
///   - Standard_NC6
/// sgxEnabled:
///   - Standard_DC2s
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuCatalog {
    /// VM sizes equipped with NVIDIA GPUs (N-series).
    #[serde(default)]
    pub nvidia_enabled: BTreeSet<String>,

    /// VM sizes supporting Intel SGX confidential computing (DC-series).
    #[serde(default)]
    pub sgx_enabled: BTreeSet<String>,
}

const NVIDIA_ENABLED_SKUS: &[&str] = &[
    // K80
    "Standard_NC6",
    "Standard_NC12",
    "Standard_NC24",
    "Standard_NC24r",
    // M60
    "Standard_NV6",
    "Standard_NV12",
    "Standard_NV24",
    "Standard_NV24r",
    "Standard_NV12s_v3",
    "Standard_NV24s_v3",
    "Standard_NV48s_v3",
    // P40
    "Standard_ND6s",
    "Standard_ND12s",
    "Standard_ND24s",
    "Standard_ND24rs",
    // P100
    "Standard_NC6s_v2",
    "Standard_NC12s_v2",
    "Standard_NC24s_v2",
    "Standard_NC24rs_v2",
    // V100
    "Standard_NC6s_v3",
    "Standard_NC12s_v3",
    "Standard_NC24s_v3",
    "Standard_NC24rs_v3",
    "Standard_ND40s_v3",
    "Standard_ND40rs_v2",
];

const SGX_ENABLED_SKUS: &[&str] = &[
    "Standard_DC2s",
    "Standard_DC4s",
    "Standard_DC1s_v2",
    "Standard_DC2s_v2",
    "Standard_DC4s_v2",
    "Standard_DC8_v2",
];

impl Default for SkuCatalog {
    fn default() -> Self {
        Self {
            nvidia_enabled: NVIDIA_ENABLED_SKUS.iter().map(|&s| s.to_owned()).collect(),
            sgx_enabled: SGX_ENABLED_SKUS.iter().map(|&s| s.to_owned()).collect(),
        }
    }
}

impl SkuCatalog {
    /// Loads a catalog from a YAML file. As YAML is a superset of JSON, JSON
    /// files are accepted as well.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).context(ReadCatalogSnafu { path })?;
        serde_yaml::from_str(&content).context(ParseCatalogSnafu { path })
    }

    pub fn is_nvidia_enabled_sku(&self, vm_size: &str) -> bool {
        self.nvidia_enabled.contains(vm_size)
    }

    pub fn is_sgx_enabled_sku(&self, vm_size: &str) -> bool {
        self.sgx_enabled.contains(vm_size)
    }
}
