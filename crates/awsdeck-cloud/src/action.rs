//! Control actions against a resource

use crate::model::{LifecycleState, ResourceRecord};
use crate::provider::{AddressAttachment, AddressMode, DetachOutcome, PortRule};
use std::fmt;

/// A mutating action requested by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Start,
    Stop,
    Reboot,
    Tag { key: String, value: String },
    AttachAddress(AddressMode),
    DetachAddress,
    OpenPort(PortRule),
}

impl Action {
    /// Short verb used in prompts and notifications
    pub fn label(&self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::Stop => "stop",
            Action::Reboot => "reboot",
            Action::Tag { .. } => "tag",
            Action::AttachAddress(_) => "attach an address to",
            Action::DetachAddress => "detach the address from",
            Action::OpenPort(_) => "open a port on",
        }
    }

    /// Lifecycle state the target must be in, for lifecycle actions
    pub fn required_state(&self) -> Option<LifecycleState> {
        match self {
            Action::Start => Some(LifecycleState::Stopped),
            Action::Stop | Action::Reboot => Some(LifecycleState::Running),
            _ => None,
        }
    }

    /// Whether the action drives the lifecycle state machine
    pub fn is_lifecycle(&self) -> bool {
        self.required_state().is_some()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Tag { key, value } => write!(f, "tag {}={}", key, value),
            Action::AttachAddress(AddressMode::ReuseExisting(addr)) => {
                write!(f, "attach address {}", addr)
            }
            Action::AttachAddress(AddressMode::AllocateNew) => write!(f, "attach address"),
            Action::DetachAddress => write!(f, "detach address"),
            Action::OpenPort(rule) => write!(f, "open port {}", rule),
            other => f.write_str(other.label()),
        }
    }
}

/// An action bound to the resource it targets
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub target: ResourceRecord,
    pub action: Action,
}

impl ActionRequest {
    pub fn new(target: ResourceRecord, action: Action) -> Self {
        Self { target, action }
    }

    /// Confirmation prompt, e.g. "Are you sure you want to stop instance i-123?"
    pub fn prompt(&self) -> String {
        format!(
            "Are you sure you want to {} {} {}?",
            self.action.label(),
            self.target.kind(),
            self.target.id()
        )
    }
}

/// Immediate result of a submitted action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The provider accepted the call; refresh to observe the new state
    Accepted,
    /// A provider operation is being polled in the background
    Tracking { operation_id: String },
    Attached(AddressAttachment),
    Detached(DetachOutcome),
}
