//! Maps external chat/group identifiers onto filesystem-safe storage keys.

use serde::{Deserialize, Serialize};
use std::fmt;

/// External id used for single-tenant/local mode.
pub const DEFAULT_TENANT: &str = "default";

const DEFAULT_KEY: &str = "data";
const KEY_PREFIX: &str = "trip_";
const SEPARATOR: char = '_';

/// Storage key for one tenant's trip document.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantKey(String);

impl TenantKey {
    /// Resolve an external identifier. Chat ids may be signed integers or
    /// arbitrary strings; anything that implements `Display` is accepted.
    pub fn resolve(external_id: impl fmt::Display) -> Self {
        let raw = external_id.to_string();
        if raw == DEFAULT_TENANT {
            return TenantKey(DEFAULT_KEY.to_string());
        }
        let sanitized: String = raw
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { SEPARATOR })
            .collect();
        TenantKey(format!("{KEY_PREFIX}{sanitized}"))
    }

    /// Key of the single-tenant document.
    pub fn default_tenant() -> Self {
        TenantKey(DEFAULT_KEY.to_string())
    }

    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_KEY
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name used by the filesystem backend.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
