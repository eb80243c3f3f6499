//! Lightsail instance provider
//!
//! Lightsail identifies instances and static IPs by name. Reboots return an
//! operation id that the orchestrator polls through
//! [`CloudProvider::operation_status`].

use crate::catalog::LIGHTSAIL_BUNDLES;
use crate::error::{AwsError, sdk_error};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_lightsail::Client;
use aws_sdk_lightsail::types::{
    Instance, IpAddressType, NetworkProtocol, Operation, OperationStatus as LightsailStatus,
    PortInfo, StaticIp, Tag,
};
use awsdeck_cloud::{
    AddressAttachment, AddressMode, AddressSlot, AttachOutcome, AttachmentPlan, AuthStatus,
    CloudError, CloudProvider, CreateRequest, DetachOutcome, LifecycleState, OperationStatus,
    PlanOption, PortRule, RebootHandle, ResourceKind, ResourceRecord, Result, plan_attachment,
};
use awsdeck_cloud::address::attached_to;

pub const PROVIDER_NAME: &str = "lightsail";

/// Creation settings shared by Lightsail instances and databases
#[derive(Debug, Clone)]
pub struct LightsailOptions {
    pub availability_zone: String,
    pub blueprint_id: String,
    pub database_blueprint_id: String,
    pub master_database_name: String,
    pub master_username: String,
}

impl Default for LightsailOptions {
    fn default() -> Self {
        Self {
            availability_zone: "us-east-1a".to_string(),
            blueprint_id: "ubuntu_22_04".to_string(),
            database_blueprint_id: "mysql_8_0".to_string(),
            master_database_name: "appdb".to_string(),
            master_username: "dbadmin".to_string(),
        }
    }
}

/// Id of the first operation in a Lightsail mutation response
pub(crate) fn first_operation_id(
    operation: &'static str,
    operations: &[Operation],
) -> crate::error::Result<String> {
    operations
        .first()
        .and_then(|op| op.id())
        .map(str::to_string)
        .ok_or(AwsError::MissingField {
            operation,
            field: "operation id",
        })
}

pub(crate) fn map_operation_status(status: Option<&LightsailStatus>) -> OperationStatus {
    match status {
        Some(LightsailStatus::Succeeded | LightsailStatus::Completed) => OperationStatus::Succeeded,
        Some(LightsailStatus::Failed) => OperationStatus::Failed,
        _ => OperationStatus::InFlight,
    }
}

pub(crate) async fn get_operation_status(
    client: &Client,
    operation_id: &str,
) -> Result<OperationStatus> {
    let output = client
        .get_operation()
        .operation_id(operation_id)
        .send()
        .await
        .map_err(|e| sdk_error("GetOperation", e))?;

    let status = output.operation().and_then(|op| op.status());
    Ok(map_operation_status(status))
}

pub(crate) fn apply_tags(mut record: ResourceRecord, tags: &[Tag]) -> ResourceRecord {
    for tag in tags {
        if let Some(key) = tag.key() {
            record = record.with_tag(key, tag.value().unwrap_or_default());
        }
    }
    record
}

pub(crate) fn lightsail_tag(key: &str, value: &str) -> Tag {
    Tag::builder().key(key).value(value).build()
}

pub(crate) async fn check_lightsail_auth(client: &Client, label: &str) -> AuthStatus {
    match client.get_regions().send().await {
        Ok(_) => AuthStatus::ok(label),
        Err(e) => AuthStatus::failed(CloudError::from(sdk_error("GetRegions", e)).to_string()),
    }
}

pub(crate) fn instance_record(instance: &Instance) -> Option<ResourceRecord> {
    let name = instance.name()?;
    let state = instance
        .state()
        .and_then(|s| s.name())
        .map(LifecycleState::from_provider)
        .unwrap_or(LifecycleState::Unknown);

    let record = ResourceRecord::new(name, PROVIDER_NAME, ResourceKind::Vm)
        .with_state(state)
        .with_address(instance.public_ip_address().map(str::to_string));
    Some(apply_tags(record, instance.tags()))
}

pub(crate) fn static_ip_slot(static_ip: &StaticIp) -> Option<AddressSlot> {
    let slot = AddressSlot::new(static_ip.name()?, static_ip.ip_address().map(str::to_string));
    Some(match static_ip.attached_to() {
        Some(instance) if static_ip.is_attached().unwrap_or(true) => slot.attached_to(instance),
        _ => slot,
    })
}

/// Lightsail instance provider
pub struct LightsailInstanceProvider {
    client: Client,
    options: LightsailOptions,
}

impl LightsailInstanceProvider {
    pub fn new(config: &SdkConfig, options: LightsailOptions) -> Self {
        Self {
            client: Client::new(config),
            options,
        }
    }

    async fn static_ips(&self) -> Result<Vec<StaticIp>> {
        let mut static_ips = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let output = self
                .client
                .get_static_ips()
                .set_page_token(page_token.take())
                .send()
                .await
                .map_err(|e| sdk_error("GetStaticIps", e))?;
            static_ips.extend_from_slice(output.static_ips());

            match output.next_page_token() {
                Some(token) if !token.is_empty() => page_token = Some(token.to_string()),
                _ => break,
            }
        }
        Ok(static_ips)
    }

    async fn attach_static_ip(&self, id: &str, static_ip_name: &str) -> Result<()> {
        tracing::debug!("Attaching static IP {} to {}", static_ip_name, id);
        self.client
            .attach_static_ip()
            .static_ip_name(static_ip_name)
            .instance_name(id)
            .send()
            .await
            .map_err(|e| sdk_error("AttachStaticIp", e))?;
        Ok(())
    }

    async fn static_ip_address(&self, static_ip_name: &str) -> Result<String> {
        let output = self
            .client
            .get_static_ip()
            .static_ip_name(static_ip_name)
            .send()
            .await
            .map_err(|e| sdk_error("GetStaticIp", e))?;
        let address = output
            .static_ip()
            .and_then(|ip| ip.ip_address())
            .ok_or(AwsError::MissingField {
                operation: "GetStaticIp",
                field: "ip address",
            })?;
        Ok(address.to_string())
    }
}

#[async_trait]
impl CloudProvider for LightsailInstanceProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn display_name(&self) -> &str {
        "Amazon Lightsail"
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Vm
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        Ok(check_lightsail_auth(&self.client, "Lightsail instances").await)
    }

    async fn list(&self) -> Result<Vec<ResourceRecord>> {
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let output = self
                .client
                .get_instances()
                .set_page_token(page_token.take())
                .send()
                .await
                .map_err(|e| sdk_error("GetInstances", e))?;
            records.extend(output.instances().iter().filter_map(instance_record));

            match output.next_page_token() {
                Some(token) if !token.is_empty() => page_token = Some(token.to_string()),
                _ => break,
            }
        }

        tracing::debug!("Lightsail: {} instances", records.len());
        Ok(records)
    }

    async fn start(&self, id: &str) -> Result<()> {
        tracing::info!("Starting Lightsail instance {}", id);
        self.client
            .start_instance()
            .instance_name(id)
            .send()
            .await
            .map_err(|e| sdk_error("StartInstance", e))?;
        Ok(())
    }

    async fn stop(&self, id: &str) -> Result<()> {
        tracing::info!("Stopping Lightsail instance {}", id);
        self.client
            .stop_instance()
            .instance_name(id)
            .send()
            .await
            .map_err(|e| sdk_error("StopInstance", e))?;
        Ok(())
    }

    async fn reboot(&self, id: &str) -> Result<RebootHandle> {
        tracing::info!("Rebooting Lightsail instance {}", id);
        let output = self
            .client
            .reboot_instance()
            .instance_name(id)
            .send()
            .await
            .map_err(|e| sdk_error("RebootInstance", e))?;
        Ok(RebootHandle::Tracked(first_operation_id(
            "RebootInstance",
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

    async fn attach_address(&self, id: &str, mode: &AddressMode) -> Result<AddressAttachment> {
        let static_ips = self.static_ips().await?;

        match mode {
            AddressMode::ReuseExisting(wanted) => {
                let static_ip = static_ips
                    .iter()
                    .find(|ip| {
                        ip.ip_address() == Some(wanted.as_str())
                            || ip.name() == Some(wanted.as_str())
                    })
                    .ok_or_else(|| CloudError::ResourceNotFound(format!("static IP {}", wanted)))?;
                let slot = static_ip_slot(static_ip).ok_or(AwsError::MissingField {
                    operation: "GetStaticIps",
                    field: "static IP name",
                })?;
                let address = slot.address.clone().unwrap_or_default();

                if slot.attached_to.as_deref() == Some(id) {
                    return Ok(AddressAttachment::new(address, AttachOutcome::AlreadyAttached));
                }
                self.attach_static_ip(id, &slot.handle).await?;
                Ok(AddressAttachment::new(address, AttachOutcome::Attached))
            }
            AddressMode::AllocateNew => {
                let slots: Vec<AddressSlot> =
                    static_ips.iter().filter_map(static_ip_slot).collect();
                match plan_attachment(&slots, id) {
                    AttachmentPlan::AlreadyAttached(slot) => Ok(AddressAttachment::new(
                        slot.address.unwrap_or_default(),
                        AttachOutcome::AlreadyAttached,
                    )),
                    AttachmentPlan::Reuse(slot) => {
                        self.attach_static_ip(id, &slot.handle).await?;
                        Ok(AddressAttachment::new(
                            slot.address.unwrap_or_default(),
                            AttachOutcome::Reused,
                        ))
                    }
                    AttachmentPlan::Allocate => {
                        let static_ip_name = format!("{}-ip", id);
                        self.client
                            .allocate_static_ip()
                            .static_ip_name(&static_ip_name)
                            .send()
                            .await
                            .map_err(|e| sdk_error("AllocateStaticIp", e))?;
                        tracing::info!("Allocated static IP {}", static_ip_name);

                        self.attach_static_ip(id, &static_ip_name).await?;
                        let address = self.static_ip_address(&static_ip_name).await?;
                        Ok(AddressAttachment::new(address, AttachOutcome::Allocated))
                    }
                }
            }
        }
    }

    async fn detach_address(&self, id: &str) -> Result<DetachOutcome> {
        let static_ips = self.static_ips().await?;
        let slots: Vec<AddressSlot> = static_ips.iter().filter_map(static_ip_slot).collect();
        let Some(slot) = attached_to(&slots, id).into_iter().next().cloned() else {
            return Ok(DetachOutcome::NothingToDetach);
        };

        self.client
            .detach_static_ip()
            .static_ip_name(&slot.handle)
            .send()
            .await
            .map_err(|e| sdk_error("DetachStaticIp", e))?;
        tracing::info!("Detached static IP {} from {}", slot.handle, id);

        Ok(DetachOutcome::Detached(slot.address.unwrap_or(slot.handle)))
    }

    async fn open_port(&self, id: &str, rule: &PortRule) -> Result<()> {
        let port_info = PortInfo::builder()
            .from_port(i32::from(rule.from_port))
            .to_port(i32::from(rule.to_port))
            .protocol(NetworkProtocol::from(rule.protocol.as_str()))
            .cidrs(&rule.cidr)
            .build();

        self.client
            .open_instance_public_ports()
            .instance_name(id)
            .port_info(port_info)
            .send()
            .await
            .map_err(|e| sdk_error("OpenInstancePublicPorts", e))?;
        tracing::info!("Opened {} on {}", rule, id);
        Ok(())
    }

    fn catalog(&self) -> &[PlanOption] {
        LIGHTSAIL_BUNDLES
    }

    async fn create(&self, request: &CreateRequest) -> Result<String> {
        if let Some(gib) = request.disk_size_gib {
            tracing::warn!("Lightsail bundles have a fixed disk size; ignoring {} GiB", gib);
        }

        self.client
            .create_instances()
            .instance_names(&request.name)
            .availability_zone(&self.options.availability_zone)
            .blueprint_id(&self.options.blueprint_id)
            .bundle_id(&request.plan)
            .set_key_pair_name(request.key_name.clone())
            .ip_address_type(IpAddressType::Ipv4)
            .send()
            .await
            .map_err(|e| sdk_error("CreateInstances", e))?;

        tracing::info!(
            "Lightsail instance {} created in {}",
            request.name,
            self.options.availability_zone
        );
        Ok(request.name.clone())
    }
}
