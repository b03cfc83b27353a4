//! Migration definitions
//!
//! Core types for the driver: the migration unit handed over by the
//! orchestrator, the persisted audit row, and the auditability resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::directives::DirectiveSet;

/// Namespace recorded when a migration does not declare one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// One versioned unit of schema or data change.
///
/// Produced by the orchestration layer from migration source files;
/// identity is `(level, namespace)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Migration {
    /// Ordering key, monotonic per namespace.
    pub level: i64,
    /// Human-readable description.
    pub comment: String,
    /// Raw executable script, run as a single batch.
    pub script: String,
    /// Intended apply time, recorded in the audit row.
    pub timestamp: DateTime<Utc>,
    /// Content hash for drift detection.
    pub checksum: String,
    /// Defaults to `"default"` when absent.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Deprecated: use an `audit` directive in the script instead.
    #[serde(default)]
    pub audit: Option<bool>,
}

impl Migration {
    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }
}

/// Persisted record of a successfully applied, audited migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRow {
    pub level: i64,
    pub timestamp: DateTime<Utc>,
    pub comment: String,
    pub checksum: String,
    pub namespace: String,
}

/// Where the audit decision for a migration comes from.
///
/// Exactly one source applies per migration: directives embedded in the
/// script win, the deprecated top-level `audit` flag is consulted only when
/// the script carries no directives at all, and everything else is audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditSource<'a> {
    Directives(&'a DirectiveSet),
    Legacy(bool),
    Default,
}

impl<'a> AuditSource<'a> {
    pub fn resolve(migration: &Migration, directives: &'a DirectiveSet) -> Self {
        if !directives.is_empty() {
            AuditSource::Directives(directives)
        } else if let Some(audit) = migration.audit {
            AuditSource::Legacy(audit)
        } else {
            AuditSource::Default
        }
    }
}

/// Whether a successful run of this migration must write an audit row.
///
/// The deprecation warning is a side effect of the legacy branch only.
pub fn is_auditable(migration: &Migration, directives: &DirectiveSet, quiet: bool) -> bool {
    match AuditSource::resolve(migration, directives) {
        AuditSource::Directives(set) => set.audit,
        AuditSource::Legacy(audit) => {
            if !quiet {
                warn!("the 'audit' field is deprecated, use an 'audit' directive instead");
            }
            audit
        }
        AuditSource::Default => true,
    }
}
