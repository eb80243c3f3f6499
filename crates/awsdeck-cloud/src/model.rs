//! Unified resource model
//!
//! Every adapter translates its provider's listing into [`ResourceRecord`]s so
//! the dashboard and the orchestrator never deal with provider-specific shapes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Placeholder shown when a resource has no public address.
pub const NO_ADDRESS: &str = "N/A";

/// Resource family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Virtual machine instance
    Vm,
    /// Managed relational database
    ManagedDatabase,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Vm => write!(f, "instance"),
            ResourceKind::ManagedDatabase => write!(f, "database"),
        }
    }
}

/// Provider-reported lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Pending,
    Running,
    Stopping,
    Stopped,
    Rebooting,
    Terminated,
    Unknown,
}

impl LifecycleState {
    /// Map a provider state string onto the unified lifecycle.
    ///
    /// EC2 reports `pending`/`running`/`shutting-down`/..., Lightsail databases
    /// report `available`/`starting`/`backing-up`/... Unrecognised values map
    /// to [`LifecycleState::Unknown`].
    pub fn from_provider(state: &str) -> Self {
        match state.trim().to_ascii_lowercase().as_str() {
            "pending" | "starting" | "creating" => LifecycleState::Pending,
            "running" | "available" | "backing-up" | "modifying" => LifecycleState::Running,
            "stopping" | "shutting-down" => LifecycleState::Stopping,
            "stopped" => LifecycleState::Stopped,
            "rebooting" => LifecycleState::Rebooting,
            "terminated" | "deleting" => LifecycleState::Terminated,
            _ => LifecycleState::Unknown,
        }
    }

    /// Whether the state is a transition the provider is still working on.
    pub fn is_transitional(&self) -> bool {
        matches!(
            self,
            LifecycleState::Pending | LifecycleState::Stopping | LifecycleState::Rebooting
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Pending => write!(f, "pending"),
            LifecycleState::Running => write!(f, "running"),
            LifecycleState::Stopping => write!(f, "stopping"),
            LifecycleState::Stopped => write!(f, "stopped"),
            LifecycleState::Rebooting => write!(f, "rebooting"),
            LifecycleState::Terminated => write!(f, "terminated"),
            LifecycleState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Identity of a resource: the owning adapter plus the provider id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    pub provider: String,
    pub id: String,
}

impl ResourceKey {
    pub fn new(provider: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.id)
    }
}

/// A single key/value tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Unified representation of one controllable resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    id: String,
    provider: String,
    kind: ResourceKind,
    pub display_name: String,
    pub lifecycle_state: LifecycleState,
    pub public_address: Option<String>,
    pub tags: Vec<Tag>,
}

impl ResourceRecord {
    /// Create a record. `provider` is the name of the owning adapter.
    pub fn new(id: impl Into<String>, provider: impl Into<String>, kind: ResourceKind) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            provider: provider.into(),
            kind,
            lifecycle_state: LifecycleState::Unknown,
            public_address: None,
            tags: Vec::new(),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_state(mut self, state: LifecycleState) -> Self {
        self.lifecycle_state = state;
        self
    }

    pub fn with_address(mut self, address: Option<String>) -> Self {
        self.public_address = address;
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push(Tag::new(key, value));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(&self.provider, &self.id)
    }

    /// Public address, or `N/A` when none is assigned.
    pub fn address_label(&self) -> &str {
        self.public_address.as_deref().unwrap_or(NO_ADDRESS)
    }

    /// Tag keys, deduplicated and sorted for display.
    pub fn display_tags(&self) -> Vec<&str> {
        self.tags
            .iter()
            .map(|t| t.key.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
