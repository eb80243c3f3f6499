//! 設定からプロバイダとオーケストレータを組み立てる

use awsdeck_cloud::{
    ActionOrchestrator, InventoryAggregator, Notification, Notifier, PollConfig, ShellSettings,
};
use awsdeck_cloud_aws::{AwsOptions, Ec2Options, LightsailOptions};
use awsdeck_config::Settings;
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedReceiver;

/// CLI 引数による設定の上書き
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub region: Option<String>,
    pub key: Option<PathBuf>,
}

pub fn apply_overrides(mut settings: Settings, overrides: &Overrides) -> Settings {
    if let Some(region) = &overrides.region {
        settings.region = Some(region.clone());
    }
    if let Some(key) = &overrides.key {
        settings.ssh.key_path = awsdeck_config::expand_home(key);
    }
    settings
}

pub fn aws_options(settings: &Settings) -> AwsOptions {
    AwsOptions {
        ec2: Ec2Options {
            ami_id: settings.ec2.ami_id.clone(),
            key_dir: settings.ec2.key_dir.clone(),
        },
        lightsail: LightsailOptions {
            availability_zone: settings.lightsail.availability_zone.clone(),
            blueprint_id: settings.lightsail.blueprint_id.clone(),
            database_blueprint_id: settings.lightsail.database_blueprint_id.clone(),
            master_database_name: settings.lightsail.master_database_name.clone(),
            master_username: settings.lightsail.master_username.clone(),
        },
    }
}

pub fn poll_config(settings: &Settings) -> PollConfig {
    PollConfig {
        interval: settings.polling.interval(),
        max_polls: settings.polling.max_polls,
    }
}

pub fn shell_settings(settings: &Settings) -> ShellSettings {
    ShellSettings::new(&settings.ssh.key_path, &settings.ssh.user)
}

/// 実行時に共有するもの一式
pub struct AppContext {
    pub settings: Settings,
    pub region: String,
    pub aggregator: InventoryAggregator,
    pub orchestrator: ActionOrchestrator,
    pub notifications: UnboundedReceiver<Notification>,
}

impl AppContext {
    pub async fn build(settings: Settings) -> Self {
        let sdk_config = awsdeck_cloud_aws::load_sdk_config(settings.region.as_deref()).await;
        let region = sdk_config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "(default)".to_string());
        tracing::info!("Using AWS region {}", region);

        let mut aggregator = InventoryAggregator::new();
        for provider in awsdeck_cloud_aws::providers(&sdk_config, aws_options(&settings)) {
            aggregator.register(provider);
        }

        let (notifier, notifications) = Notifier::channel();
        let orchestrator = ActionOrchestrator::for_inventory(&aggregator, notifier)
            .with_poll_config(poll_config(&settings));

        Self {
            settings,
            region,
            aggregator,
            orchestrator,
            notifications,
        }
    }
}
