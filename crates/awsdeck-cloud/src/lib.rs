//! awsdeck cloud core
//!
//! This crate provides the resource model, the provider abstraction and the
//! action orchestration used by the awsdeck dashboard.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 awsdeck dashboard                │
//! └───────┬──────────────────────────┬──────────────┘
//!         │ refresh                  │ confirm → submit
//! ┌───────▼──────────────┐  ┌────────▼──────────────┐
//! │ InventoryAggregator  │  │ ConfirmationGate      │
//! └───────┬──────────────┘  │ ActionOrchestrator ───┼──► Notifier
//!         │                 │   (poll tasks)        │
//!         │                 └────────┬──────────────┘
//! ┌───────▼──────────────────────────▼──────────────┐
//! │           trait CloudProvider { ... }            │
//! └───────┬──────────────────┬──────────────┬───────┘
//!   ┌─────▼─────┐    ┌───────▼──────┐ ┌─────▼───────┐
//!   │    ec2    │    │  lightsail   │ │ lightsail-db│
//!   └───────────┘    └──────────────┘ └─────────────┘
//! ```

pub mod action;
pub mod address;
pub mod confirm;
pub mod error;
pub mod inventory;
pub mod model;
pub mod notify;
pub mod orchestrator;
pub mod provider;
pub mod shell;

// Re-exports
pub use action::{Action, ActionOutcome, ActionRequest};
pub use address::{AddressSlot, AttachmentPlan, plan_attachment};
pub use confirm::{ConfirmationGate, ConfirmationTicket, Confirmed};
pub use error::{CloudError, Result};
pub use inventory::{Inventory, InventoryAggregator};
pub use model::{LifecycleState, NO_ADDRESS, ResourceKey, ResourceKind, ResourceRecord, Tag};
pub use notify::{Notification, NotificationLevel, Notifier};
pub use orchestrator::{ActionOrchestrator, OperationKind, PendingOperation, PollConfig};
pub use provider::{
    AddressAttachment, AddressMode, AttachOutcome, AuthStatus, CloudProvider, CreateRequest,
    DetachOutcome, OperationStatus, PlanOption, PortRule, Protocol, RebootHandle,
};
pub use shell::{ShellLauncher, ShellSettings, ShellTarget, prepare_shell};
