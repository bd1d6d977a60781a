//! # AWS Parameter Store Client
//!
//! [`ParameterStore`] implementation backed by AWS Systems Manager Parameter
//! Store.
//!
//! The client is constructed once at process startup and injected into the
//! reconciler. Construction reads the region from the `AWS_REGION` environment
//! variable (falling back to `us-east-1`) and uses the SDK's default credential
//! chain, which covers IRSA on EKS as well as local credentials.

use crate::metrics;
use crate::store::{Parameter, ParameterPage, ParameterStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_ssm::Client as SsmClient;
use tracing::{debug, info};

const DEFAULT_REGION: &str = "us-east-1";

/// AWS SSM Parameter Store provider implementation
pub struct AwsParameterStore {
    client: SsmClient,
    region: String,
}

impl std::fmt::Debug for AwsParameterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsParameterStore")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl AwsParameterStore {
    /// Create a new SSM client from the ambient environment.
    ///
    /// Region comes from `AWS_REGION`, defaulting to `us-east-1` when unset.
    /// Credentials come from the SDK's default chain; on EKS this resolves the
    /// IRSA role from the pod's service account annotation.
    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub async fn new() -> Result<Self> {
        let region = std::env::var("AWS_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_string());

        info!("Using AWS region: {}", region);

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.clone()))
            .load()
            .await;

        Ok(Self {
            client: SsmClient::new(&sdk_config),
            region,
        })
    }
}

#[async_trait]
impl ParameterStore for AwsParameterStore {
    async fn get_parameter(&self, name: &str, decrypt: bool) -> Result<Parameter> {
        let start = std::time::Instant::now();
        debug!("Fetching SSM parameter: {}", name);

        let response = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(decrypt)
            .send()
            .await
            .with_context(|| format!("Failed to get SSM parameter: {name}"))?;

        let parameter = response
            .parameter()
            .with_context(|| format!("SSM returned an empty response for parameter: {name}"))?;

        let value = parameter
            .value()
            .with_context(|| format!("SSM parameter has no value: {name}"))?;

        metrics::record_store_operation("get_parameter", start.elapsed().as_secs_f64());

        Ok(Parameter {
            // Map from the returned name so keys reflect the store's canonical path
            name: parameter.name().unwrap_or(name).to_string(),
            value: value.to_string(),
        })
    }

    async fn get_parameters_by_path(
        &self,
        path: &str,
        decrypt: bool,
        cursor: Option<&str>,
    ) -> Result<ParameterPage> {
        let start = std::time::Instant::now();
        debug!("Fetching SSM parameters under path: {}", path);

        let mut request = self
            .client
            .get_parameters_by_path()
            .path(path)
            .recursive(false)
            .with_decryption(decrypt);

        if let Some(token) = cursor {
            request = request.next_token(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to get SSM parameters under path: {path}"))?;

        let parameters = response
            .parameters()
            .iter()
            .filter_map(|p| match (p.name(), p.value()) {
                (Some(name), Some(value)) => Some(Parameter {
                    name: name.to_string(),
                    value: value.to_string(),
                }),
                _ => None,
            })
            .collect();

        metrics::record_store_operation("get_parameters_by_path", start.elapsed().as_secs_f64());

        Ok(ParameterPage {
            parameters,
            next_cursor: response.next_token().map(ToString::to_string),
        })
    }
}
