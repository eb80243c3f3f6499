//! AWS providers for awsdeck
//!
//! This crate implements the `CloudProvider` trait for three AWS resource
//! families:
//!
//! - [`Ec2Provider`] (`ec2`): EC2 instances, Elastic IPs and security groups
//! - [`LightsailInstanceProvider`] (`lightsail`): Lightsail instances and static IPs
//! - [`LightsailDatabaseProvider`] (`lightsail-db`): Lightsail managed databases
//!
//! # Requirements
//!
//! Credentials are resolved through the standard AWS provider chain
//! (environment, shared config/credentials files, SSO, instance metadata).
//!
//! # Example
//!
//! ```ignore
//! use awsdeck_cloud::InventoryAggregator;
//! use awsdeck_cloud_aws::{AwsOptions, load_sdk_config, providers};
//!
//! let config = load_sdk_config(Some("ap-south-1")).await;
//! let mut aggregator = InventoryAggregator::new();
//! for provider in providers(&config, AwsOptions::default()) {
//!     aggregator.register(provider);
//! }
//! let inventory = aggregator.refresh().await?;
//! ```

pub mod catalog;
pub mod ec2;
pub mod error;
pub mod lightsail;
pub mod lightsail_db;

pub use ec2::{Ec2Options, Ec2Provider};
pub use error::{AwsError, ErrorClass, Result, classify};
pub use lightsail::{LightsailInstanceProvider, LightsailOptions};
pub use lightsail_db::LightsailDatabaseProvider;

use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_ec2::config::Region;
use awsdeck_cloud::CloudProvider;
use std::sync::Arc;

/// Creation settings for every AWS provider
#[derive(Debug, Clone, Default)]
pub struct AwsOptions {
    pub ec2: Ec2Options,
    pub lightsail: LightsailOptions,
}

/// Load the shared SDK configuration, optionally pinned to `region`.
pub async fn load_sdk_config(region: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }
    loader.load().await
}

/// All AWS providers, in listing order.
pub fn providers(config: &SdkConfig, options: AwsOptions) -> Vec<Arc<dyn CloudProvider>> {
    vec![
        Arc::new(Ec2Provider::new(config, options.ec2)),
        Arc::new(LightsailInstanceProvider::new(
            config,
            options.lightsail.clone(),
        )),
        Arc::new(LightsailDatabaseProvider::new(config, options.lightsail)),
    ]
}
