//! Cloud provider trait definition

use crate::error::{CloudError, Result};
use crate::model::{ResourceKind, ResourceRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cloud provider abstraction trait
///
/// Each adapter (EC2, Lightsail instances, Lightsail databases, ...) wraps one
/// provider API surface and exposes it through the same capability set.
/// Capabilities a resource family lacks keep the default implementation,
/// which fails with [`CloudError::Unsupported`].
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Returns the provider name (e.g., "ec2", "lightsail")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Resource family handled by this provider
    fn kind(&self) -> ResourceKind;

    /// Check if the provider is properly configured and authenticated
    async fn check_auth(&self) -> Result<AuthStatus>;

    /// List the current resources of this provider
    async fn list(&self) -> Result<Vec<ResourceRecord>>;

    /// Request a start. Returns once the provider accepted the call.
    async fn start(&self, id: &str) -> Result<()>;

    /// Request a stop. Returns once the provider accepted the call.
    async fn stop(&self, id: &str) -> Result<()>;

    /// Request a reboot
    async fn reboot(&self, id: &str) -> Result<RebootHandle>;

    /// Query the status of a provider-tracked operation
    async fn operation_status(&self, operation_id: &str) -> Result<OperationStatus> {
        let _ = operation_id;
        Err(CloudError::unsupported(self.name(), "operation tracking"))
    }

    /// Upsert one tag
    async fn tag(&self, id: &str, key: &str, value: &str) -> Result<()>;

    /// Associate a public address with the resource
    async fn attach_address(&self, id: &str, mode: &AddressMode) -> Result<AddressAttachment> {
        let _ = (id, mode);
        Err(CloudError::unsupported(self.name(), "public addresses"))
    }

    /// Disassociate whatever public address the resource holds
    async fn detach_address(&self, id: &str) -> Result<DetachOutcome> {
        let _ = id;
        Err(CloudError::unsupported(self.name(), "public addresses"))
    }

    /// Add an ingress rule for the resource
    async fn open_port(&self, id: &str, rule: &PortRule) -> Result<()> {
        let _ = (id, rule);
        Err(CloudError::unsupported(self.name(), "port rules"))
    }

    /// Sizes/plans accepted by [`CloudProvider::create`]
    fn catalog(&self) -> &[PlanOption] {
        &[]
    }

    /// Create a new resource and return its id
    async fn create(&self, request: &CreateRequest) -> Result<String> {
        let _ = request;
        Err(CloudError::unsupported(self.name(), "resource creation"))
    }
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account/user information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}

/// Result of submitting a reboot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebootHandle {
    /// The provider performs the reboot without a trackable operation
    Completed,
    /// The provider issued an operation id that must be polled
    Tracked(String),
}

/// Status of a provider-tracked operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    InFlight,
    Succeeded,
    Failed,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OperationStatus::InFlight)
    }
}

/// How to obtain the address for [`CloudProvider::attach_address`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressMode {
    /// Attach a specific existing address (EC2 public IP or Lightsail static IP name)
    ReuseExisting(String),
    /// Reuse any unassociated address, allocating a new one only when none is free
    AllocateNew,
}

/// How an address ended up attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// The resource already held this address; nothing was changed
    AlreadyAttached,
    /// A free address was found and associated
    Reused,
    /// A new address was allocated and associated
    Allocated,
    /// The explicitly requested address was associated
    Attached,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressAttachment {
    pub address: String,
    pub outcome: AttachOutcome,
}

impl AddressAttachment {
    pub fn new(address: impl Into<String>, outcome: AttachOutcome) -> Self {
        Self {
            address: address.into(),
            outcome,
        }
    }
}

/// Result of [`CloudProvider::detach_address`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetachOutcome {
    Detached(String),
    NothingToDetach,
}

/// Transport protocol of an ingress rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ingress rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRule {
    pub protocol: Protocol,
    pub from_port: u16,
    pub to_port: u16,
    pub cidr: String,
}

impl PortRule {
    /// Open a single TCP port to the world.
    pub fn tcp(port: u16) -> Self {
        Self {
            protocol: Protocol::Tcp,
            from_port: port,
            to_port: port,
            cidr: "0.0.0.0/0".to_string(),
        }
    }

    pub fn with_cidr(mut self, cidr: impl Into<String>) -> Self {
        self.cidr = cidr.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.from_port == 0 || self.from_port > self.to_port {
            return Err(CloudError::InvalidInput(format!(
                "invalid port range {}-{}",
                self.from_port, self.to_port
            )));
        }
        if !self.cidr.contains('/') {
            return Err(CloudError::InvalidInput(format!(
                "invalid CIDR block: {}",
                self.cidr
            )));
        }
        Ok(())
    }
}

impl fmt::Display for PortRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.from_port == self.to_port {
            write!(f, "{}/{} from {}", self.from_port, self.protocol, self.cidr)
        } else {
            write!(
                f,
                "{}-{}/{} from {}",
                self.from_port, self.to_port, self.protocol, self.cidr
            )
        }
    }
}

/// One entry of an adapter's size/plan catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOption {
    pub id: &'static str,
    pub description: &'static str,
}

impl PlanOption {
    pub const fn new(id: &'static str, description: &'static str) -> Self {
        Self { id, description }
    }
}

/// Inputs of the resource creation flow
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateRequest {
    pub name: String,
    pub plan: String,
    pub key_name: Option<String>,
    pub disk_size_gib: Option<u32>,
}

impl CreateRequest {
    pub fn new(name: impl Into<String>, plan: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            plan: plan.into(),
            ..Default::default()
        }
    }

    pub fn with_key_name(mut self, key_name: impl Into<String>) -> Self {
        self.key_name = Some(key_name.into());
        self
    }

    pub fn with_disk_size(mut self, gib: u32) -> Self {
        self.disk_size_gib = Some(gib);
        self
    }

    /// Check the request against the adapter's catalog.
    pub fn validate(&self, catalog: &[PlanOption]) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CloudError::InvalidInput("name must not be empty".into()));
        }
        if !catalog.iter().any(|p| p.id == self.plan) {
            return Err(CloudError::InvalidInput(format!(
                "unknown plan: {}",
                self.plan
            )));
        }
        if self.disk_size_gib == Some(0) {
            return Err(CloudError::InvalidInput(
                "disk size must be a positive number of GiB".into(),
            ));
        }
        Ok(())
    }
}
