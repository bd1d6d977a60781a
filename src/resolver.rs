//! # Parameter Resolver
//!
//! Resolves a `sourceLocator` into a flat map of secret keys to raw parameter
//! values.
//!
//! A locator with a trailing `/` is a path: every parameter directly under it
//! is enumerated page by page, threading the store's continuation cursor into
//! each subsequent request until the store stops returning one. Any other
//! locator names exactly one parameter.

use crate::store::ParameterStore;
use anyhow::Result;
use std::collections::BTreeMap;

/// Separator used in Parameter Store names.
pub const PATH_SEPARATOR: char = '/';

/// Delimiter used in the flattened Secret keys.
pub const KEY_DELIMITER: &str = ".";

/// Convert a full Parameter Store name into a flat Secret data key.
///
/// `/app/db_password` becomes `app.db_password`. Total and deterministic;
/// already-flat names pass through unchanged.
pub fn to_secret_key(name: &str) -> String {
    name.trim_start_matches(PATH_SEPARATOR)
        .replace(PATH_SEPARATOR, KEY_DELIMITER)
}

/// Resolve `locator` against the store into `secret key -> raw value`.
///
/// Distinct store names that flatten to the same key are not reconciled;
/// the last one enumerated wins.
pub async fn resolve(
    store: &dyn ParameterStore,
    locator: &str,
    decrypt: bool,
) -> Result<BTreeMap<String, String>> {
    let mut resolved = BTreeMap::new();

    if locator.ends_with(PATH_SEPARATOR) {
        let mut cursor: Option<String> = None;
        loop {
            let page = store
                .get_parameters_by_path(locator, decrypt, cursor.as_deref())
                .await?;

            for parameter in page.parameters {
                resolved.insert(to_secret_key(&parameter.name), parameter.value);
            }

            // The returned cursor must drive the next request; the loop ends
            // exactly when the store stops returning one.
            cursor = page.next_cursor;
            if cursor.is_none() {
                break;
            }
        }
    } else {
        let parameter = store.get_parameter(locator, decrypt).await?;
        resolved.insert(to_secret_key(&parameter.name), parameter.value);
    }

    Ok(resolved)
}
