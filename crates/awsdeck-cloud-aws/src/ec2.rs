//! EC2 instance provider

use crate::catalog::EC2_INSTANCE_TYPES;
use crate::error::{AwsError, sdk_error};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ec2::Client;
use aws_sdk_ec2::types::{
    Address, BlockDeviceMapping, DomainType, EbsBlockDevice, Filter, Instance, InstanceType,
    IpPermission, IpRange, ResourceType, Tag, TagSpecification, VolumeType,
};
use awsdeck_cloud::{
    AddressAttachment, AddressMode, AddressSlot, AttachOutcome, AttachmentPlan, AuthStatus,
    CloudError, CloudProvider, CreateRequest, DetachOutcome, LifecycleState, PlanOption, PortRule,
    RebootHandle, ResourceKind, ResourceRecord, Result, plan_attachment,
};
use std::path::{Path, PathBuf};

pub const PROVIDER_NAME: &str = "ec2";

/// Instances in other states are not shown
const LISTED_STATES: &[&str] = &["pending", "running", "stopping", "stopped"];

const ROOT_DEVICE: &str = "/dev/sda1";
const DEFAULT_VOLUME_GIB: u32 = 8;

/// Creation settings for EC2
#[derive(Debug, Clone, Default)]
pub struct Ec2Options {
    /// AMI used by the launch flow
    pub ami_id: Option<String>,
    /// Where private keys of newly created key pairs are written
    pub key_dir: PathBuf,
}

/// EC2 provider
pub struct Ec2Provider {
    client: Client,
    region: String,
    options: Ec2Options,
}

impl Ec2Provider {
    pub fn new(config: &SdkConfig, options: Ec2Options) -> Self {
        let region = config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "us-east-1".to_string());

        Self {
            client: Client::new(config),
            region,
            options,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    async fn addresses(&self) -> Result<Vec<Address>> {
        let output = self
            .client
            .describe_addresses()
            .send()
            .await
            .map_err(|e| sdk_error("DescribeAddresses", e))?;
        Ok(output.addresses().to_vec())
    }

    async fn describe_instance(&self, id: &str) -> Result<Instance> {
        let output = self
            .client
            .describe_instances()
            .instance_ids(id)
            .send()
            .await
            .map_err(|e| sdk_error("DescribeInstances", e))?;

        output
            .reservations()
            .iter()
            .flat_map(|r| r.instances())
            .find(|i| i.instance_id() == Some(id))
            .cloned()
            .ok_or_else(|| CloudError::ResourceNotFound(id.to_string()))
    }

    async fn associate(&self, id: &str, allocation_id: &str) -> Result<()> {
        tracing::debug!("Associating {} with {}", allocation_id, id);
        self.client
            .associate_address()
            .instance_id(id)
            .allocation_id(allocation_id)
            .send()
            .await
            .map_err(|e| sdk_error("AssociateAddress", e))?;
        Ok(())
    }

    /// Create the key pair unless it already exists.
    async fn ensure_key_pair(&self, key_name: &str) -> Result<()> {
        match self
            .client
            .describe_key_pairs()
            .key_names(key_name)
            .send()
            .await
        {
            Ok(_) => {
                tracing::debug!("Using existing key pair {}", key_name);
                return Ok(());
            }
            Err(e) => {
                let err = sdk_error("DescribeKeyPairs", e);
                if err.code() != Some("InvalidKeyPair.NotFound") {
                    return Err(err.into());
                }
            }
        }

        let output = self
            .client
            .create_key_pair()
            .key_name(key_name)
            .send()
            .await
            .map_err(|e| sdk_error("CreateKeyPair", e))?;
        let material = output.key_material().ok_or(AwsError::MissingField {
            operation: "CreateKeyPair",
            field: "key material",
        })?;

        let path = write_private_key(&self.options.key_dir, key_name, material).await?;
        tracing::info!(
            "Created key pair {}, private key saved to {}",
            key_name,
            path.display()
        );
        Ok(())
    }
}

/// Write a private key as `<dir>/<key_name>.pem`, readable by the owner only.
///
/// A key left over from an earlier pair of the same name is replaced.
pub(crate) async fn write_private_key(
    dir: &Path,
    key_name: &str,
    material: &str,
) -> crate::error::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{}.pem", key_name));
    // The old file is read-only, so it cannot be opened for writing.
    match tokio::fs::remove_file(&path).await {
        Ok(()) => tracing::debug!("Replacing existing key file {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    tokio::fs::write(&path, material).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o400)).await?;
    }

    Ok(path)
}

fn tag_value<'a>(tags: &'a [Tag], key: &str) -> Option<&'a str> {
    tags.iter()
        .find(|t| t.key() == Some(key))
        .and_then(|t| t.value())
}

pub(crate) fn instance_record(instance: &Instance) -> Option<ResourceRecord> {
    let id = instance.instance_id()?;
    let state = instance
        .state()
        .and_then(|s| s.name())
        .map(|n| LifecycleState::from_provider(n.as_str()))
        .unwrap_or(LifecycleState::Unknown);

    let mut record = ResourceRecord::new(id, PROVIDER_NAME, ResourceKind::Vm)
        .with_state(state)
        .with_address(instance.public_ip_address().map(str::to_string));

    if let Some(name) = tag_value(instance.tags(), "Name") {
        record = record.with_display_name(name);
    }
    for tag in instance.tags() {
        if let (Some(key), Some(value)) = (tag.key(), tag.value()) {
            record = record.with_tag(key, value);
        }
    }
    Some(record)
}

pub(crate) fn address_slot(address: &Address) -> Option<AddressSlot> {
    let handle = address.allocation_id()?;
    let slot = AddressSlot::new(handle, address.public_ip().map(str::to_string));
    Some(match address.instance_id() {
        Some(instance_id) => slot.attached_to(instance_id),
        None => slot,
    })
}

#[async_trait]
impl CloudProvider for Ec2Provider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn display_name(&self) -> &str {
        "Amazon EC2"
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Vm
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        match self.client.describe_account_attributes().send().await {
            Ok(_) => Ok(AuthStatus::ok(format!("EC2 ({})", self.region))),
            Err(e) => {
                let err = CloudError::from(sdk_error("DescribeAccountAttributes", e));
                Ok(AuthStatus::failed(err.to_string()))
            }
        }
    }

    async fn list(&self) -> Result<Vec<ResourceRecord>> {
        let state_filter = Filter::builder()
            .name("instance-state-name")
            .set_values(Some(LISTED_STATES.iter().map(|s| s.to_string()).collect()))
            .build();

        let mut records = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let output = self
                .client
                .describe_instances()
                .filters(state_filter.clone())
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error("DescribeInstances", e))?;

            records.extend(
                output
                    .reservations()
                    .iter()
                    .flat_map(|r| r.instances())
                    .filter_map(instance_record),
            );

            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        tracing::debug!("EC2 {}: {} instances", self.region, records.len());
        Ok(records)
    }

    async fn start(&self, id: &str) -> Result<()> {
        tracing::info!("Starting EC2 instance {}", id);
        self.client
            .start_instances()
            .instance_ids(id)
            .send()
            .await
            .map_err(|e| sdk_error("StartInstances", e))?;
        Ok(())
    }

    async fn stop(&self, id: &str) -> Result<()> {
        tracing::info!("Stopping EC2 instance {}", id);
        self.client
            .stop_instances()
            .instance_ids(id)
            .send()
            .await
            .map_err(|e| sdk_error("StopInstances", e))?;
        Ok(())
    }

    async fn reboot(&self, id: &str) -> Result<RebootHandle> {
        tracing::info!("Rebooting EC2 instance {}", id);
        self.client
            .reboot_instances()
            .instance_ids(id)
            .send()
            .await
            .map_err(|e| sdk_error("RebootInstances", e))?;
        Ok(RebootHandle::Completed)
    }

    async fn tag(&self, id: &str, key: &str, value: &str) -> Result<()> {
        self.client
            .create_tags()
            .resources(id)
            .tags(Tag::builder().key(key).value(value).build())
            .send()
            .await
            .map_err(|e| sdk_error("CreateTags", e))?;
        Ok(())
    }

    async fn attach_address(&self, id: &str, mode: &AddressMode) -> Result<AddressAttachment> {
        let addresses = self.addresses().await?;

        match mode {
            AddressMode::ReuseExisting(ip) => {
                let address = addresses
                    .iter()
                    .find(|a| a.public_ip() == Some(ip.as_str()))
                    .ok_or_else(|| CloudError::ResourceNotFound(format!("Elastic IP {}", ip)))?;
                if address.instance_id() == Some(id) {
                    return Ok(AddressAttachment::new(ip.as_str(), AttachOutcome::AlreadyAttached));
                }
                let allocation_id = address.allocation_id().ok_or(AwsError::MissingField {
                    operation: "DescribeAddresses",
                    field: "allocation id",
                })?;
                self.associate(id, allocation_id).await?;
                Ok(AddressAttachment::new(ip.as_str(), AttachOutcome::Attached))
            }
            AddressMode::AllocateNew => {
                let slots: Vec<AddressSlot> = addresses.iter().filter_map(address_slot).collect();
                match plan_attachment(&slots, id) {
                    AttachmentPlan::AlreadyAttached(slot) => Ok(AddressAttachment::new(
                        slot.address.unwrap_or_default(),
                        AttachOutcome::AlreadyAttached,
                    )),
                    AttachmentPlan::Reuse(slot) => {
                        self.associate(id, &slot.handle).await?;
                        Ok(AddressAttachment::new(
                            slot.address.unwrap_or_default(),
                            AttachOutcome::Reused,
                        ))
                    }
                    AttachmentPlan::Allocate => {
                        let output = self
                            .client
                            .allocate_address()
                            .domain(DomainType::Vpc)
                            .send()
                            .await
                            .map_err(|e| sdk_error("AllocateAddress", e))?;
                        let allocation_id = output.allocation_id().ok_or(AwsError::MissingField {
                            operation: "AllocateAddress",
                            field: "allocation id",
                        })?;
                        let ip = output.public_ip().unwrap_or_default().to_string();
                        tracing::info!("Allocated Elastic IP {} ({})", ip, allocation_id);

                        self.associate(id, allocation_id).await?;
                        Ok(AddressAttachment::new(ip, AttachOutcome::Allocated))
                    }
                }
            }
        }
    }

    async fn detach_address(&self, id: &str) -> Result<DetachOutcome> {
        let addresses = self.addresses().await?;
        let Some(address) = addresses.iter().find(|a| a.instance_id() == Some(id)) else {
            return Ok(DetachOutcome::NothingToDetach);
        };

        let association_id = address.association_id().ok_or(AwsError::MissingField {
            operation: "DescribeAddresses",
            field: "association id",
        })?;
        self.client
            .disassociate_address()
            .association_id(association_id)
            .send()
            .await
            .map_err(|e| sdk_error("DisassociateAddress", e))?;

        Ok(DetachOutcome::Detached(
            address.public_ip().unwrap_or_default().to_string(),
        ))
    }

    async fn open_port(&self, id: &str, rule: &PortRule) -> Result<()> {
        let instance = self.describe_instance(id).await?;
        let groups: Vec<&str> = instance
            .security_groups()
            .iter()
            .filter_map(|g| g.group_id())
            .collect();
        if groups.is_empty() {
            return Err(CloudError::ResourceNotFound(format!(
                "no security group attached to {}",
                id
            )));
        }

        let permission = IpPermission::builder()
            .ip_protocol(rule.protocol.as_str())
            .from_port(i32::from(rule.from_port))
            .to_port(i32::from(rule.to_port))
            .ip_ranges(IpRange::builder().cidr_ip(&rule.cidr).build())
            .build();

        for group in groups {
            let result = self
                .client
                .authorize_security_group_ingress()
                .group_id(group)
                .ip_permissions(permission.clone())
                .send()
                .await;

            match result {
                Ok(_) => tracing::info!("Opened {} on {}", rule, group),
                Err(e) => {
                    let err = sdk_error("AuthorizeSecurityGroupIngress", e);
                    if err.code() == Some("InvalidPermission.Duplicate") {
                        tracing::debug!("{} already allows {}", group, rule);
                    } else {
                        return Err(err.into());
                    }
                }
            }
        }
        Ok(())
    }

    fn catalog(&self) -> &[PlanOption] {
        EC2_INSTANCE_TYPES
    }

    async fn create(&self, request: &CreateRequest) -> Result<String> {
        let ami_id = self
            .options
            .ami_id
            .as_deref()
            .ok_or_else(|| AwsError::NotConfigured("ec2.ami_id".into()))?;

        if let Some(key_name) = &request.key_name {
            self.ensure_key_pair(key_name).await?;
        }

        let volume_gib = request.disk_size_gib.unwrap_or(DEFAULT_VOLUME_GIB);
        let volume_size = i32::try_from(volume_gib)
            .map_err(|_| CloudError::InvalidInput(format!("disk size too large: {}", volume_gib)))?;

        let output = self
            .client
            .run_instances()
            .image_id(ami_id)
            .instance_type(InstanceType::from(request.plan.as_str()))
            .min_count(1)
            .max_count(1)
            .set_key_name(request.key_name.clone())
            .tag_specifications(
                TagSpecification::builder()
                    .resource_type(ResourceType::Instance)
                    .tags(Tag::builder().key("Name").value(&request.name).build())
                    .build(),
            )
            .block_device_mappings(
                BlockDeviceMapping::builder()
                    .device_name(ROOT_DEVICE)
                    .ebs(
                        EbsBlockDevice::builder()
                            .volume_size(volume_size)
                            .volume_type(VolumeType::Gp3)
                            .delete_on_termination(true)
                            .build(),
                    )
                    .build(),
            )
            .send()
            .await
            .map_err(|e| sdk_error("RunInstances", e))?;

        let id = output
            .instances()
            .first()
            .and_then(|i| i.instance_id())
            .ok_or(AwsError::MissingField {
                operation: "RunInstances",
                field: "instance id",
            })?;

        tracing::info!("EC2 instance {} created ({})", request.name, id);
        Ok(id.to_string())
    }
}
