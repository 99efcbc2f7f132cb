//! Status normalization
//!
//! Providers describe lifecycle with their own vocabulary per resource kind.
//! [`normalize`] maps a raw status onto the closed [`CanonicalStatus`] set
//! through embedded lookup tables (`resources/status.json`, keyed by
//! resource kind then raw value). Values missing from a table pass through
//! verbatim as [`Status::Passthrough`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

const STATUS_TABLES: &str = include_str!("resources/status.json");

/// Lifecycle states understood by the orchestration layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CanonicalStatus {
    Creating,
    Running,
    /// Provisioned and idle (e.g. an unbound address)
    Ready,
    /// Provisioned and attached to something
    InUse,
    Deploying,
    Rebooting,
    Restoring,
    Migrating,
    BackingUp,
    Stopped,
    Failed,
    Deleting,
    Unknown,
}

impl CanonicalStatus {
    pub const ALL: [CanonicalStatus; 13] = [
        Self::Creating,
        Self::Running,
        Self::Ready,
        Self::InUse,
        Self::Deploying,
        Self::Rebooting,
        Self::Restoring,
        Self::Migrating,
        Self::BackingUp,
        Self::Stopped,
        Self::Failed,
        Self::Deleting,
        Self::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Creating => "creating",
            Self::Running => "running",
            Self::Ready => "ready",
            Self::InUse => "in-use",
            Self::Deploying => "deploying",
            Self::Rebooting => "rebooting",
            Self::Restoring => "restoring",
            Self::Migrating => "migrating",
            Self::BackingUp => "backing-up",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
            Self::Deleting => "deleting",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_str() == name)
    }

    /// Transitional states: retry later, do not mutate
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::Creating
                | Self::Deploying
                | Self::Rebooting
                | Self::Restoring
                | Self::Migrating
                | Self::BackingUp
                | Self::Deleting
        )
    }

    /// Settled states a create or action may end in
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Running | Self::Ready | Self::InUse | Self::Stopped)
    }
}

impl fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized status: canonical, or the raw provider value when unmapped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Status {
    Canonical(CanonicalStatus),
    Passthrough(String),
}

impl Status {
    /// Canonical value; unmapped provider values count as unknown
    pub fn canonical(&self) -> CanonicalStatus {
        match self {
            Self::Canonical(s) => *s,
            Self::Passthrough(_) => CanonicalStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Canonical(s) => s.as_str(),
            Self::Passthrough(raw) => raw,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.canonical().is_busy()
    }

    pub fn is_failed(&self) -> bool {
        self.canonical() == CanonicalStatus::Failed
    }

    pub fn is_passthrough(&self) -> bool {
        matches!(self, Self::Passthrough(_))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<CanonicalStatus> for Status {
    fn from(status: CanonicalStatus) -> Self {
        Self::Canonical(status)
    }
}

/// resource kind -> raw provider status -> canonical status
pub type StatusTables = HashMap<String, HashMap<String, CanonicalStatus>>;

static TABLES: OnceLock<StatusTables> = OnceLock::new();

/// Get the status tables (parsed from embedded JSON on first access)
pub fn status_tables() -> &'static StatusTables {
    TABLES.get_or_init(|| {
        serde_json::from_str(STATUS_TABLES)
            .unwrap_or_else(|e| panic!("Failed to parse embedded status JSON: {}", e))
    })
}

/// Map a raw provider status for `kind` onto the canonical set.
///
/// Total over all inputs. Lookup is exact first, then case-insensitive.
pub fn normalize(kind: &str, raw: &str) -> Status {
    normalize_with(status_tables(), kind, raw)
}

/// [`normalize`] against an explicit table set
pub fn normalize_with(tables: &StatusTables, kind: &str, raw: &str) -> Status {
    let found = tables.get(kind).and_then(|table| {
        table.get(raw).copied().or_else(|| {
            table
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(raw))
                .map(|(_, v)| *v)
        })
    });

    match found {
        Some(status) => Status::Canonical(status),
        None => {
            tracing::debug!("Unmapped {} status passed through: {:?}", kind, raw);
            Status::Passthrough(raw.to_string())
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_load() {
        let tables = status_tables();
        for kind in ["db-instance", "elastic-ip", "nat-gateway", "file-share", "lb-backend"] {
            assert!(tables.contains_key(kind), "missing status table for {}", kind);
        }
    }

    #[test]
    fn test_db_intermediate_states_are_busy() {
        for raw in ["BUILD", "MODIFYING", "REBOOTING", "RESTORING", "MIGRATING", "BACKING UP"] {
            let status = normalize("db-instance", raw);
            assert!(status.is_busy(), "{} should be busy", raw);
        }
        assert_eq!(
            normalize("db-instance", "ACTIVE"),
            Status::Canonical(CanonicalStatus::Running)
        );
    }

    #[test]
    fn test_case_insensitive_fallback() {
        assert_eq!(
            normalize("file-share", "AVAILABLE"),
            Status::Canonical(CanonicalStatus::Ready)
        );
    }

    #[test]
    fn test_unmapped_value_passes_through() {
        let status = normalize("elastic-ip", "SOMETHING_NEW");
        assert_eq!(status, Status::Passthrough("SOMETHING_NEW".to_string()));
        assert_eq!(status.canonical(), CanonicalStatus::Unknown);
        assert_eq!(status.as_str(), "SOMETHING_NEW");
    }

    #[test]
    fn test_unknown_kind_passes_through() {
        let status = normalize("no-such-kind", "ACTIVE");
        assert!(status.is_passthrough());
    }

    #[test]
    fn test_canonical_names_round_trip() {
        for status in CanonicalStatus::ALL {
            assert_eq!(CanonicalStatus::from_name(status.as_str()), Some(status));
        }
    }
}
