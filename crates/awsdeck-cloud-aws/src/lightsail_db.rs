//! Lightsail managed database provider

use crate::catalog::LIGHTSAIL_DATABASE_BUNDLES;
use crate::error::sdk_error;
use crate::lightsail::{
    LightsailOptions, apply_tags, check_lightsail_auth, first_operation_id, get_operation_status,
    lightsail_tag,
};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_lightsail::Client;
use aws_sdk_lightsail::types::RelationalDatabase;
use awsdeck_cloud::{
    AuthStatus, CloudProvider, CreateRequest, LifecycleState, OperationStatus, PlanOption,
    RebootHandle, ResourceKind, ResourceRecord, Result,
};

pub const PROVIDER_NAME: &str = "lightsail-db";

/// The master endpoint is not a public address: databases show `N/A` and are
/// never shell targets.
pub(crate) fn database_record(database: &RelationalDatabase) -> Option<ResourceRecord> {
    let name = database.name()?;
    let state = database
        .state()
        .map(LifecycleState::from_provider)
        .unwrap_or(LifecycleState::Unknown);
    if let Some(endpoint) = database.master_endpoint().and_then(|e| e.address()) {
        tracing::debug!("Database {} endpoint {}", name, endpoint);
    }

    let record =
        ResourceRecord::new(name, PROVIDER_NAME, ResourceKind::ManagedDatabase).with_state(state);
    Some(apply_tags(record, database.tags()))
}

/// Lightsail relational database provider
///
/// Databases have no static IPs or port rules; those capabilities fall back
/// to the trait defaults.
pub struct LightsailDatabaseProvider {
    client: Client,
    options: LightsailOptions,
}

impl LightsailDatabaseProvider {
    pub fn new(config: &SdkConfig, options: LightsailOptions) -> Self {
        Self {
            client: Client::new(config),
            options,
        }
    }
}

#[async_trait]
impl CloudProvider for LightsailDatabaseProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn display_name(&self) -> &str {
        "Lightsail databases"
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::ManagedDatabase
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        Ok(check_lightsail_auth(&self.client, "Lightsail databases").await)
    }

    async fn list(&self) -> Result<Vec<ResourceRecord>> {
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let output = self
                .client
                .get_relational_databases()
                .set_page_token(page_token.take())
                .send()
                .await
                .map_err(|e| sdk_error("GetRelationalDatabases", e))?;
            records.extend(
                output
                    .relational_databases()
                    .iter()
                    .filter_map(database_record),
            );

            match output.next_page_token() {
                Some(token) if !token.is_empty() => page_token = Some(token.to_string()),
                _ => break,
            }
        }

        tracing::debug!("Lightsail: {} databases", records.len());
        Ok(records)
    }

    async fn start(&self, id: &str) -> Result<()> {
        tracing::info!("Starting database {}", id);
        self.client
            .start_relational_database()
            .relational_database_name(id)
            .send()
            .await
            .map_err(|e| sdk_error("StartRelationalDatabase", e))?;
        Ok(())
    }

    async fn stop(&self, id: &str) -> Result<()> {
        tracing::info!("Stopping database {}", id);
        self.client
            .stop_relational_database()
            .relational_database_name(id)
            .send()
            .await
            .map_err(|e| sdk_error("StopRelationalDatabase", e))?;
        Ok(())
    }

    async fn reboot(&self, id: &str) -> Result<RebootHandle> {
        tracing::info!("Rebooting database {}", id);
        let output = self
            .client
            .reboot_relational_database()
            .relational_database_name(id)
            .send()
            .await
            .map_err(|e| sdk_error("RebootRelationalDatabase", e))?;
        Ok(RebootHandle::Tracked(first_operation_id(
            "RebootRelationalDatabase",
            output.operations(),
        )?))
    }

    async fn operation_status(&self, operation_id: &str) -> Result<OperationStatus> {
        get_operation_status(&self.client, operation_id).await
    }

    async fn tag(&self, id: &str, key: &str, value: &str) -> Result<()> {
        self.client
            .tag_resource()
            .resource_name(id)
            .tags(lightsail_tag(key, value))
            .send()
            .await
            .map_err(|e| sdk_error("TagResource", e))?;
        Ok(())
    }

    fn catalog(&self) -> &[PlanOption] {
        LIGHTSAIL_DATABASE_BUNDLES
    }

    async fn create(&self, request: &CreateRequest) -> Result<String> {
        self.client
            .create_relational_database()
            .relational_database_name(&request.name)
            .availability_zone(&self.options.availability_zone)
            .relational_database_blueprint_id(&self.options.database_blueprint_id)
            .relational_database_bundle_id(&request.plan)
            .master_database_name(&self.options.master_database_name)
            .master_username(&self.options.master_username)
            .send()
            .await
            .map_err(|e| sdk_error("CreateRelationalDatabase", e))?;

        tracing::info!(
            "Database {} created ({})",
            request.name,
            self.options.database_blueprint_id
        );
        Ok(request.name.clone())
    }
}
