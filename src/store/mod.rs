//! # Parameter Store
//!
//! Abstraction over the external key/value parameter store.
//!
//! The reconciler only ever talks to the [`ParameterStore`] trait, so the AWS
//! client can be swapped for an in-memory double in tests without touching any
//! process globals.

use anyhow::Result;
use async_trait::async_trait;

/// A single parameter as returned by the store.
///
/// `name` is the store's full name for the entry, which may differ from the
/// requested name (e.g. prefix enumeration returns full paths).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

/// One page of a prefix enumeration.
///
/// `next_cursor` is `Some` when more pages remain; the caller must pass it
/// into the next request verbatim.
#[derive(Debug, Clone, Default)]
pub struct ParameterPage {
    pub parameters: Vec<Parameter>,
    pub next_cursor: Option<String>,
}

/// Read-only client for a key/value parameter store.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Fetch exactly one parameter by name.
    async fn get_parameter(&self, name: &str, decrypt: bool) -> Result<Parameter>;

    /// Fetch one page of parameters directly under `path` (non-recursive).
    /// `cursor` is the continuation token from the previous page, or `None`
    /// for the first page.
    async fn get_parameters_by_path(
        &self,
        path: &str,
        decrypt: bool,
        cursor: Option<&str>,
    ) -> Result<ParameterPage>;
}

pub mod aws;

pub use aws::AwsParameterStore;
