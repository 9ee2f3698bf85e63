//! Device kinds and discovery profiles

use crate::error::DeviceError;
use crate::path::DerivationPath;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default Trezor account path
pub const TREZOR_PATH: &str = "44'/60'/0'/0/0";

/// Ledger Live account root
pub const LEDGER_LIVE_PATH: &str = "44'/60'/0'";

/// Ledger legacy (MEW/MyCrypto style) account root
pub const LEDGER_LEGACY_PATH: &str = "44'/60'/0'/0";

/// Supported hardware wallet kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Ledger Nano family
    Ledger,
    /// Trezor One / Model T
    Trezor,
}

impl FromStr for DeviceType {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ledger" => Ok(Self::Ledger),
            "trezor" => Ok(Self::Trezor),
            other => Err(DeviceError::DeviceNotFound(format!(
                "unknown device type '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ledger => write!(f, "ledger"),
            Self::Trezor => write!(f, "trezor"),
        }
    }
}

/// Which account layout a Ledger user picked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LedgerPathKind {
    /// Ledger Live layout
    #[default]
    Live,
    /// Legacy layout
    Legacy,
}

impl LedgerPathKind {
    /// Derivation path root for this layout
    #[must_use]
    pub const fn path(&self) -> &'static str {
        match self {
            Self::Live => LEDGER_LIVE_PATH,
            Self::Legacy => LEDGER_LEGACY_PATH,
        }
    }
}

/// Device type plus the derivation path accounts are discovered under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Device kind
    #[serde(rename = "type")]
    pub device_type: DeviceType,

    /// Derivation path root
    pub path: DerivationPath,
}

impl DeviceProfile {
    /// Create a profile from parts
    pub fn new(device_type: DeviceType, path: DerivationPath) -> Self {
        Self { device_type, path }
    }

    /// Trezor with its fixed account path
    pub fn trezor() -> Self {
        Self::new(DeviceType::Trezor, well_known(TREZOR_PATH))
    }

    /// Ledger with the layout the user selected
    pub fn ledger(kind: LedgerPathKind) -> Self {
        Self::new(DeviceType::Ledger, well_known(kind.path()))
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::ledger(LedgerPathKind::default())
    }
}

fn well_known(path: &str) -> DerivationPath {
    match DerivationPath::parse(path) {
        Ok(parsed) => parsed,
        Err(_) => unreachable!("built-in derivation path {path} is valid"),
    }
}
