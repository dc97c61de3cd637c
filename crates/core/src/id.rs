//! Locally generated identifiers.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a sale captured on this device.
///
/// Independent of whatever id the server assigns once the sale is synced.
/// Backed by a UUIDv7: a millisecond timestamp followed by random bits, so ids
/// sort by capture time and do not collide across devices or concurrent captures.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct LocalSaleId(Uuid);

impl LocalSaleId {
    /// Prefix used in the string form, kept for readability in logs and storage.
    pub const PREFIX: &'static str = "sale_";

    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LocalSaleId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for LocalSaleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0.simple())
    }
}

impl FromStr for LocalSaleId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| DomainError::invalid_id(format!("LocalSaleId: missing prefix in {s:?}")))?;
        let uuid = Uuid::from_str(raw)
            .map_err(|e| DomainError::invalid_id(format!("LocalSaleId: {e}")))?;
        Ok(Self(uuid))
    }
}

impl From<LocalSaleId> for String {
    fn from(value: LocalSaleId) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for LocalSaleId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
