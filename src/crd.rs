//! # Custom Resource Definitions
//!
//! CRD types for the Parameter Sync Controller.
//!
//! A `ParameterSync` resource declares a Parameter Store locator and the name of
//! the Secret that should hold the retrieved values. A locator with a trailing
//! `/` selects every parameter directly under that path; without it, exactly one
//! parameter is fetched.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ParameterSync Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: ssm.octopilot.io/v1alpha1
/// kind: ParameterSync
/// metadata:
///   name: app-config
///   namespace: default
/// spec:
///   sourceLocator: /app/config/
///   targetName: app-config
///   decrypt: true
///   updateIntervalSeconds: 300
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "ParameterSync",
    group = "ssm.octopilot.io",
    version = "v1alpha1",
    namespaced,
    status = "ParameterSyncStatus",
    shortname = "psync",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSyncSpec {
    /// Parameter Store name or path to sync.
    /// A trailing `/` marks this as a path; every parameter directly under it
    /// is enumerated (non-recursive). Otherwise it names a single parameter.
    pub source_locator: String,
    /// Name of the Secret to create or update in the resource's namespace.
    pub target_name: String,
    /// Request decryption of SecureString parameter values.
    #[serde(default)]
    pub decrypt: bool,
    /// Refresh period in seconds. `0` means the Secret is only rewritten on
    /// watch events for this resource, never on a timer.
    #[serde(default)]
    pub update_interval_seconds: u32,
}

/// Status of the ParameterSync resource
///
/// Tracks the outcome of the most recent reconciliation.
#[derive(Debug, Clone, Deserialize, Serialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSyncStatus {
    /// Conditions represent the latest available observations
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Generation observed by the last reconciliation
    #[serde(default)]
    pub observed_generation: Option<i64>,
    /// Time of the last successful sync
    #[serde(default)]
    pub last_sync_time: Option<String>,
    /// Number of parameters written to the target Secret
    #[serde(default)]
    pub parameters_synced: Option<i32>,
}

/// Condition represents a status condition for the resource
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of condition (True, False, Unknown)
    pub status: String,
    /// Last transition time
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing condition
    #[serde(default)]
    pub message: Option<String>,
}
