//! # Reconciler
//!
//! Core reconciliation logic for `ParameterSync` resources.
//!
//! ## Reconciliation Flow
//!
//! 1. Re-read the `ParameterSync` from the API server (the watch cache may be
//!    stale; a 404 here means the resource was deleted after the trigger and
//!    the owned Secret is cleaned up by garbage collection)
//! 2. Resolve the locator against the Parameter Store (single fetch or
//!    paginated path enumeration)
//! 3. Create or update the target Secret with the encoded payload
//! 4. Update the resource status
//! 5. Schedule: requeue after `updateIntervalSeconds`, or wait for the next
//!    watch event when the interval is 0
//!
//! Every fetch or write failure requeues after a fixed 5 second delay. There
//! is no backoff growth and no retry budget; a persistently failing resource
//! retries every 5 seconds until the cause is fixed or the resource is
//! deleted.

use crate::crd::{Condition, ParameterSync, ParameterSyncStatus};
use crate::store::ParameterStore;
use crate::{metrics, resolver, secrets};
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info};

/// Fixed delay applied uniformly to all transient failures.
pub const ERROR_REQUEUE_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Failed to fetch parameters: {0}")]
    Fetch(#[source] anyhow::Error),
    #[error("Failed to write Secret: {0}")]
    Write(#[source] anyhow::Error),
    #[error("Failed to update status: {0}")]
    Status(#[source] kube::Error),
}

/// Reconciler context shared across all in-flight reconciliations.
///
/// Holds no per-resource state; both clients are injected at construction so
/// tests can substitute doubles without touching process globals.
#[derive(Clone)]
pub struct Reconciler {
    client: Client,
    store: Arc<dyn ParameterStore>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

/// Compute the post-success scheduling action.
///
/// An interval of 0 means timer-driven refresh is disabled and the resource
/// is only reconciled again on a watch event.
pub fn schedule(update_interval_seconds: u32) -> Action {
    if update_interval_seconds == 0 {
        Action::await_change()
    } else {
        Action::requeue(Duration::from_secs(u64::from(update_interval_seconds)))
    }
}

/// The action taken after any reconciliation error.
pub fn error_requeue() -> Action {
    Action::requeue(ERROR_REQUEUE_DELAY)
}

impl Reconciler {
    pub fn new(client: Client, store: Arc<dyn ParameterStore>) -> Self {
        Self { client, store }
    }

    pub async fn reconcile(
        parameter_sync: Arc<ParameterSync>,
        ctx: Arc<Reconciler>,
    ) -> Result<Action, ReconcilerError> {
        let start = Instant::now();
        let namespace = parameter_sync
            .namespace()
            .unwrap_or_else(|| "default".to_string());
        let name = parameter_sync.name_any();

        metrics::increment_reconciliations();

        // Always re-read the resource so a spec update between trigger and
        // processing cannot leave us acting on stale state.
        let syncs: Api<ParameterSync> = Api::namespaced(ctx.client.clone(), &namespace);
        let parameter_sync = match syncs.get_opt(&name).await {
            Ok(Some(parameter_sync)) => parameter_sync,
            Ok(None) => {
                // Deleted after the reconcile trigger. The owned Secret is
                // garbage collected through its owner reference.
                info!("ParameterSync {}/{} no longer exists", namespace, name);
                return Ok(Action::await_change());
            }
            Err(e) => return Err(ReconcilerError::Fetch(e.into())),
        };

        info!(
            "Reconciling ParameterSync {}/{} with locator {}",
            namespace, name, parameter_sync.spec.source_locator
        );

        let resolved = resolver::resolve(
            ctx.store.as_ref(),
            &parameter_sync.spec.source_locator,
            parameter_sync.spec.decrypt,
        )
        .await
        .map_err(ReconcilerError::Fetch)?;

        let secret_api: Api<Secret> = Api::namespaced(ctx.client.clone(), &namespace);
        let existing = secret_api
            .get_opt(&parameter_sync.spec.target_name)
            .await
            .map_err(|e| ReconcilerError::Write(e.into()))?;

        let payload = secrets::build_payload(&resolved);
        secrets::write_or_create(&secret_api, existing, &parameter_sync, payload)
            .await
            .map_err(ReconcilerError::Write)?;

        let synced = i32::try_from(resolved.len()).unwrap_or(i32::MAX);
        ctx.update_status(&parameter_sync, synced)
            .await
            .map_err(ReconcilerError::Status)?;

        metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
        metrics::increment_parameters_synced(i64::from(synced));

        info!(
            "Reconciliation complete for {}/{} ({} parameters)",
            namespace, name, synced
        );
        Ok(schedule(parameter_sync.spec.update_interval_seconds))
    }

    /// Uniform error policy: log, count, requeue after the fixed delay.
    pub fn error_policy(
        parameter_sync: Arc<ParameterSync>,
        error: &ReconcilerError,
        _ctx: Arc<Reconciler>,
    ) -> Action {
        error!(
            "Reconciliation error for {}/{}: {:?}",
            parameter_sync.namespace().unwrap_or_default(),
            parameter_sync.name_any(),
            error
        );
        metrics::increment_reconciliation_errors();
        error_requeue()
    }

    async fn update_status(
        &self,
        parameter_sync: &ParameterSync,
        parameters_synced: i32,
    ) -> Result<(), kube::Error> {
        let namespace = parameter_sync
            .namespace()
            .unwrap_or_else(|| "default".to_string());
        let api: Api<ParameterSync> = Api::namespaced(self.client.clone(), &namespace);

        let now = chrono::Utc::now().to_rfc3339();
        let status = ParameterSyncStatus {
            conditions: vec![Condition {
                r#type: "Ready".to_string(),
                status: "True".to_string(),
                last_transition_time: Some(now.clone()),
                reason: Some("ReconciliationSucceeded".to_string()),
                message: Some(format!("Synced {parameters_synced} parameters")),
            }],
            observed_generation: parameter_sync.metadata.generation,
            last_sync_time: Some(now),
            parameters_synced: Some(parameters_synced),
        };

        api.patch_status(
            &parameter_sync.name_any(),
            &PatchParams::apply("parameter-sync-controller"),
            &Patch::Merge(serde_json::json!({ "status": status })),
        )
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod scheduling {
        use super::*;

        #[test]
        fn test_zero_interval_waits_for_change() {
            assert_eq!(schedule(0), Action::await_change());
        }

        #[test]
        fn test_nonzero_interval_requeues_in_seconds() {
            assert_eq!(schedule(60), Action::requeue(Duration::from_secs(60)));
            assert_eq!(schedule(1), Action::requeue(Duration::from_secs(1)));
            assert_eq!(schedule(3600), Action::requeue(Duration::from_secs(3600)));
        }

        #[test]
        fn test_interval_is_not_the_error_delay() {
            assert_ne!(schedule(60), error_requeue());
        }

        #[test]
        fn test_error_requeue_is_fixed_five_seconds() {
            assert_eq!(error_requeue(), Action::requeue(Duration::from_secs(5)));
        }
    }

    mod deleted_resource {
        use super::*;
        use crate::crd::ParameterSyncSpec;
        use crate::store::{Parameter, ParameterPage};
        use async_trait::async_trait;
        use http::{Method, Request, Response, StatusCode};
        use kube::client::Body;
        use kube::Resource;
        use std::sync::atomic::{AtomicUsize, Ordering};

        /// Store double that must never be reached.
        struct UntouchedStore {
            calls: AtomicUsize,
        }

        #[async_trait]
        impl ParameterStore for UntouchedStore {
            async fn get_parameter(&self, name: &str, _decrypt: bool) -> anyhow::Result<Parameter> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Err(anyhow::anyhow!("unexpected store call for {name}"))
            }

            async fn get_parameters_by_path(
                &self,
                path: &str,
                _decrypt: bool,
                _cursor: Option<&str>,
            ) -> anyhow::Result<ParameterPage> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Err(anyhow::anyhow!("unexpected store call for {path}"))
            }
        }

        fn not_found_body(name: &str) -> Vec<u8> {
            serde_json::json!({
                "kind": "Status",
                "apiVersion": "v1",
                "metadata": {},
                "status": "Failure",
                "message": format!("parametersyncs.ssm.octopilot.io \"{name}\" not found"),
                "reason": "NotFound",
                "code": 404
            })
            .to_string()
            .into_bytes()
        }

        #[tokio::test]
        async fn test_deleted_resource_completes_without_writing() {
            let (mock_service, mut handle) =
                tower_test::mock::pair::<Request<Body>, Response<Body>>();

            let requests = Arc::new(AtomicUsize::new(0));
            let seen = Arc::clone(&requests);

            // Serve 404 for the resource re-read; anything touching Secrets
            // is a write the reconciler must not attempt.
            let api_server = tokio::spawn(async move {
                while let Some((request, respond)) = handle.next_request().await {
                    seen.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(request.method(), Method::GET);
                    assert!(
                        request
                            .uri()
                            .path()
                            .ends_with("/parametersyncs/db-credentials"),
                        "unexpected API request: {}",
                        request.uri()
                    );
                    respond.send_response(
                        Response::builder()
                            .status(StatusCode::NOT_FOUND)
                            .body(Body::from(not_found_body("db-credentials")))
                            .unwrap(),
                    );
                }
            });

            let client = Client::new(mock_service, "default");
            let store = Arc::new(UntouchedStore {
                calls: AtomicUsize::new(0),
            });
            let reconciler = Arc::new(Reconciler::new(
                client,
                Arc::clone(&store) as Arc<dyn ParameterStore>,
            ));

            let mut parameter_sync = ParameterSync::new(
                "db-credentials",
                ParameterSyncSpec {
                    source_locator: "/app/db_password".to_string(),
                    target_name: "db-secret".to_string(),
                    decrypt: false,
                    update_interval_seconds: 60,
                },
            );
            parameter_sync.meta_mut().namespace = Some("default".to_string());

            let action = Reconciler::reconcile(Arc::new(parameter_sync), reconciler)
                .await
                .unwrap();

            // Normal completion, no requeue, despite the nonzero interval.
            assert_eq!(action, Action::await_change());

            // The reconciler context (and with it the mock service) is gone,
            // so the serving task drains and finishes; joining it surfaces
            // any unexpected-request assertion.
            api_server.await.unwrap();

            // Only the resource GET hit the API server; no Secret read or
            // write was issued and the store was never consulted.
            assert_eq!(requests.load(Ordering::SeqCst), 1);
            assert_eq!(store.calls.load(Ordering::SeqCst), 0);
        }
    }
}
