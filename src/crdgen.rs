//! # CRD Generator
//!
//! Generates the `ParameterSync` CustomResourceDefinition YAML from the Rust
//! type definitions.
//!
//! ## Usage
//!
//! ```bash
//! # Generate CRD YAML
//! cargo run --bin crdgen > config/crd/parametersync.yaml
//!
//! # Generate and apply directly
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use kube::core::CustomResourceExt;
use parameter_sync_controller::ParameterSync;

fn main() -> anyhow::Result<()> {
    let crd = ParameterSync::crd();
    println!("{}", serde_yaml::to_string(&crd)?);
    Ok(())
}
