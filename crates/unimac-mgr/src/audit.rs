//! Structured audit records for port/VLAN reconfiguration.
//!
//! Every mutating manager operation emits a result [`AuditRecord`] through
//! [`audit_log!`](crate::audit_log), whether it succeeds or not. Records go to
//! the `audit` tracing target with the full record as JSON in `audit_json`,
//! so a subscriber can route them apart from operational logs.
//!
//! | Outcome | Level |
//! |---------|-------|
//! | Success | info |
//! | InProgress | debug |
//! | Failure, Denied | warn |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn, Level};

/// Audit event categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditCategory {
    /// Manager initialization and VLAN synchronisation at load
    SystemLifecycle,
    /// VLAN port-group materialisation
    ResourceCreate,
    /// Port moves between VLANs
    ResourceModify,
    /// Config file and boot parameter loading
    ConfigurationChange,
}

impl fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditCategory::SystemLifecycle => write!(f, "SYSTEM_LIFECYCLE"),
            AuditCategory::ResourceCreate => write!(f, "RESOURCE_CREATE"),
            AuditCategory::ResourceModify => write!(f, "RESOURCE_MODIFY"),
            AuditCategory::ConfigurationChange => write!(f, "CONFIGURATION_CHANGE"),
        }
    }
}

/// Outcome of an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// Action completed successfully
    Success,
    /// Action failed part-way, hardware may be left modified
    Failure,
    /// Action is in progress
    InProgress,
    /// Action was rejected before touching hardware
    Denied,
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditOutcome::Success => write!(f, "success"),
            AuditOutcome::Failure => write!(f, "failure"),
            AuditOutcome::InProgress => write!(f, "in_progress"),
            AuditOutcome::Denied => write!(f, "denied"),
        }
    }
}

/// One audit record. Built with the `with_*` methods, then logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub category: AuditCategory,
    /// Component that emitted the record
    pub source: String,
    pub action: String,
    pub outcome: AuditOutcome,
    /// e.g. `port3`, `vlan2`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    /// e.g. `switch_port`, `vlan`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditRecord {
    /// Creates a record stamped now, outcome `InProgress`.
    pub fn new(
        category: AuditCategory,
        source: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            category,
            source: source.into(),
            action: action.into(),
            outcome: AuditOutcome::InProgress,
            object_id: None,
            object_type: None,
            details: None,
            error: None,
        }
    }

    pub fn with_outcome(mut self, outcome: AuditOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn with_object_id(mut self, id: impl Into<String>) -> Self {
        self.object_id = Some(id.into());
        self
    }

    pub fn with_object_type(mut self, obj_type: impl Into<String>) -> Self {
        self.object_type = Some(obj_type.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Sets the error message and marks the outcome as `Failure`.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self.outcome = AuditOutcome::Failure;
        self
    }

    /// Sets outcome and error from an operation result. Hardware failures
    /// become `Failure`, anything rejected up front becomes `Denied`.
    pub fn with_result<T>(self, result: &crate::error::UnmResult<T>) -> Self {
        match result {
            Ok(_) => self.with_outcome(AuditOutcome::Success),
            Err(err) if err.is_hardware_failure() => self.with_error(err.to_string()),
            Err(err) => self
                .with_error(err.to_string())
                .with_outcome(AuditOutcome::Denied),
        }
    }

    /// Level the record is logged at.
    pub fn level(&self) -> Level {
        match self.outcome {
            AuditOutcome::Success => Level::INFO,
            AuditOutcome::InProgress => Level::DEBUG,
            AuditOutcome::Failure | AuditOutcome::Denied => Level::WARN,
        }
    }

    /// Logs the record to the `audit` target.
    pub fn emit(&self) {
        let object = self.object_id.as_deref().unwrap_or("-");
        let audit_json = self.to_json();
        let level = self.level();

        if level == Level::WARN {
            warn!(
                target: "audit",
                category = %self.category,
                object,
                error = self.error.as_deref().unwrap_or(""),
                audit_json = %audit_json,
                "{} {}: {}",
                self.action,
                object,
                self.outcome
            );
        } else if level == Level::DEBUG {
            debug!(
                target: "audit",
                category = %self.category,
                object,
                audit_json = %audit_json,
                "{} {}: {}",
                self.action,
                object,
                self.outcome
            );
        } else {
            info!(
                target: "audit",
                category = %self.category,
                object,
                audit_json = %audit_json,
                "{} {}: {}",
                self.action,
                object,
                self.outcome
            );
        }
    }

    /// Serializes the record to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization_failed","message":"{}"}}"#, e))
    }
}

/// Logs an [`AuditRecord`] through [`AuditRecord::emit`].
#[macro_export]
macro_rules! audit_log {
    ($record:expr) => {
        $crate::audit::AuditRecord::emit(&$record)
    };
}
