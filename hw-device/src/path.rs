//! BIP-32 derivation paths

use crate::error::{DeviceError, DeviceResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const HARDENED_BIT: u32 = 0x8000_0000;

/// One component of a derivation path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathComponent {
    /// Index without the hardened bit
    pub index: u32,
    /// Whether the component is hardened (`'` or `h`)
    pub hardened: bool,
}

impl PathComponent {
    /// Raw value as sent to the device (hardened components have the top bit set)
    #[must_use]
    pub const fn raw(&self) -> u32 {
        if self.hardened {
            self.index | HARDENED_BIT
        } else {
            self.index
        }
    }
}

/// Parsed derivation path, e.g. `44'/60'/0'/0/0`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DerivationPath {
    components: Vec<PathComponent>,
}

impl DerivationPath {
    /// Parse a path string
    ///
    /// Accepts an optional `m/` prefix and both `'` and `h` as hardened markers.
    pub fn parse(path: &str) -> DeviceResult<Self> {
        let trimmed = path.trim();
        let body = trimmed
            .strip_prefix("m/")
            .or_else(|| trimmed.strip_prefix("M/"))
            .unwrap_or(trimmed);

        if body.is_empty() {
            return Err(DeviceError::InvalidDerivationPath(path.to_string()));
        }

        let components = body
            .split('/')
            .map(|part| {
                parse_component(part)
                    .ok_or_else(|| DeviceError::InvalidDerivationPath(path.to_string()))
            })
            .collect::<DeviceResult<Vec<_>>>()?;

        Ok(Self { components })
    }

    /// Path components in order
    pub fn components(&self) -> &[PathComponent] {
        &self.components
    }

    /// Number of components
    pub fn depth(&self) -> usize {
        self.components.len()
    }
}

fn parse_component(part: &str) -> Option<PathComponent> {
    let (digits, hardened) = match part.strip_suffix('\'').or_else(|| part.strip_suffix('h')) {
        Some(digits) => (digits, true),
        None => (part, false),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let index: u32 = digits.parse().ok()?;
    if index & HARDENED_BIT != 0 {
        return None;
    }
    Some(PathComponent { index, hardened })
}

impl FromStr for DerivationPath {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", component.index)?;
            if component.hardened {
                f.write_str("'")?;
            }
        }
        Ok(())
    }
}

impl Serialize for DerivationPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DerivationPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
