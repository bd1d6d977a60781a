//! # Secret Synchronizer
//!
//! Turns resolved parameters into the target Secret's payload and performs the
//! idempotent create-or-update.
//!
//! Values are base64 encoded before being written into the Secret's data map.
//! On create, the Secret is stamped with a controller owner reference pointing
//! back at the `ParameterSync`, so deleting the resource garbage-collects the
//! Secret. On update, the payload is overwritten unconditionally but the write
//! carries the observed `resourceVersion`, so a concurrent edit of the same
//! Secret is rejected by the API server and retried as a whole reconciliation.

use crate::crd::ParameterSync;
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::{Api, ObjectMeta, PostParams};
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use tracing::info;

/// Encode resolved parameters into a Secret data map.
pub fn build_payload(resolved: &BTreeMap<String, String>) -> BTreeMap<String, ByteString> {
    resolved
        .iter()
        .map(|(key, value)| (key.clone(), ByteString(BASE64.encode(value).into_bytes())))
        .collect()
}

/// Build a new Secret for a `ParameterSync`, owned by it.
///
/// Fails when the resource carries no `uid` yet (nothing to own the Secret).
pub fn secret_for(
    parameter_sync: &ParameterSync,
    payload: BTreeMap<String, ByteString>,
) -> Result<Secret> {
    let owner = parameter_sync
        .controller_owner_ref(&())
        .context("ParameterSync has no uid, cannot attach owner reference")?;

    Ok(Secret {
        metadata: ObjectMeta {
            name: Some(parameter_sync.spec.target_name.clone()),
            namespace: parameter_sync.namespace(),
            owner_references: Some(vec![owner]),
            ..ObjectMeta::default()
        },
        data: Some(payload),
        ..Secret::default()
    })
}

/// Create the target Secret, or overwrite the payload of an existing one.
pub async fn write_or_create(
    secret_api: &Api<Secret>,
    existing: Option<Secret>,
    parameter_sync: &ParameterSync,
    payload: BTreeMap<String, ByteString>,
) -> Result<()> {
    let target_name = &parameter_sync.spec.target_name;

    match existing {
        None => {
            info!("Creating Secret: {}", target_name);
            let secret = secret_for(parameter_sync, payload)?;
            secret_api
                .create(&PostParams::default(), &secret)
                .await
                .with_context(|| format!("Failed to create Secret: {target_name}"))?;
        }
        Some(mut secret) => {
            info!("Secret {} already exists, updating", target_name);
            // The read object keeps its resourceVersion, so this replace is a
            // conditional write and conflicts surface as errors.
            secret.data = Some(payload);
            secret_api
                .replace(target_name, &PostParams::default(), &secret)
                .await
                .with_context(|| format!("Failed to update Secret: {target_name}"))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::ParameterSyncSpec;

    fn parameter_sync(uid: Option<&str>) -> ParameterSync {
        let mut parameter_sync = ParameterSync::new(
            "db-credentials",
            ParameterSyncSpec {
                source_locator: "/app/db_password".to_string(),
                target_name: "db-secret".to_string(),
                decrypt: true,
                update_interval_seconds: 60,
            },
        );
        parameter_sync.meta_mut().namespace = Some("default".to_string());
        parameter_sync.meta_mut().uid = uid.map(ToString::to_string);
        parameter_sync
    }

    #[test]
    fn test_build_payload_encodes_values() {
        let mut resolved = BTreeMap::new();
        resolved.insert("app.db_password".to_string(), "s3cr3t".to_string());

        let payload = build_payload(&resolved);

        let encoded = payload.get("app.db_password").unwrap();
        assert_eq!(encoded.0, BASE64.encode("s3cr3t").into_bytes());
    }

    #[test]
    fn test_payload_round_trip() {
        for raw in ["", "s3cr3t", "multi\nline", "ünïcödé ✓", "{\"json\": true}"] {
            let mut resolved = BTreeMap::new();
            resolved.insert("key".to_string(), raw.to_string());

            let payload = build_payload(&resolved);

            let encoded = std::str::from_utf8(&payload.get("key").unwrap().0)
                .unwrap()
                .to_string();
            let decoded = BASE64.decode(encoded).unwrap();
            assert_eq!(decoded, raw.as_bytes());
        }
    }

    #[test]
    fn test_build_payload_one_entry_per_parameter() {
        let mut resolved = BTreeMap::new();
        resolved.insert("app.config.a".to_string(), "1".to_string());
        resolved.insert("app.config.b".to_string(), "2".to_string());

        let payload = build_payload(&resolved);

        assert_eq!(payload.len(), 2);
        assert!(payload.contains_key("app.config.a"));
        assert!(payload.contains_key("app.config.b"));
    }

    #[test]
    fn test_secret_for_sets_metadata_and_owner() {
        let parameter_sync = parameter_sync(Some("11111111-2222-3333-4444-555555555555"));
        let payload = build_payload(&BTreeMap::new());

        let secret = secret_for(&parameter_sync, payload).unwrap();

        assert_eq!(secret.metadata.name.as_deref(), Some("db-secret"));
        assert_eq!(secret.metadata.namespace.as_deref(), Some("default"));

        let owners = secret.metadata.owner_references.unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].kind, "ParameterSync");
        assert_eq!(owners[0].name, "db-credentials");
        assert_eq!(owners[0].controller, Some(true));
    }

    #[test]
    fn test_secret_for_requires_uid() {
        let parameter_sync = parameter_sync(None);

        let result = secret_for(&parameter_sync, BTreeMap::new());

        assert!(result.is_err());
    }
}
