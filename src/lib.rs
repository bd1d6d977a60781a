//! Parameter Sync Controller Library
//!
//! Core functionality for the Parameter Sync Controller: the `ParameterSync`
//! CRD, the Parameter Store abstraction, the resolver, the Secret
//! synchronizer, and the reconciler. Tests live alongside the code in the
//! module files.

pub mod crd;
pub mod metrics;
pub mod reconciler;
pub mod resolver;
pub mod secrets;
pub mod server;
pub mod store;

pub use crd::{Condition, ParameterSync, ParameterSyncSpec, ParameterSyncStatus};
pub use reconciler::{Reconciler, ReconcilerError};
pub use store::{AwsParameterStore, Parameter, ParameterPage, ParameterStore};
