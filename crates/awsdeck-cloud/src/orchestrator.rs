//! Action orchestration
//!
//! [`ActionOrchestrator`] dispatches confirmed actions to the provider that
//! owns the target resource, checks lifecycle preconditions against the
//! last-known state, and tracks asynchronous provider operations (reboots) in
//! background tasks that poll until a terminal status or the poll ceiling.

use crate::action::{Action, ActionOutcome, ActionRequest};
use crate::confirm::Confirmed;
use crate::error::{CloudError, Result};
use crate::inventory::InventoryAggregator;
use crate::model::{ResourceKey, ResourceRecord};
use crate::notify::{Notification, NotificationLevel, Notifier};
use crate::provider::{
    AttachOutcome, CloudProvider, CreateRequest, DetachOutcome, OperationStatus, RebootHandle,
};
use crate::shell::{ShellLauncher, ShellSettings, prepare_shell};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Polling configuration for provider-tracked operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Wait before each status check
    pub interval: Duration,

    /// Maximum number of status checks before giving up
    pub max_polls: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_polls: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Reboot,
}

/// A provider operation the orchestrator is polling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOperation {
    pub operation_id: String,
    pub target: ResourceKey,
    pub kind: OperationKind,
    pub status: OperationStatus,
    pub polls: u32,
    pub submitted_at: DateTime<Utc>,
}

/// Dispatches actions to providers and tracks their outcome
#[derive(Clone)]
pub struct ActionOrchestrator {
    providers: Arc<HashMap<String, Arc<dyn CloudProvider>>>,
    pending: Arc<Mutex<HashMap<String, PendingOperation>>>,
    notifier: Notifier,
    poll: PollConfig,
}

impl ActionOrchestrator {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            providers: Arc::new(HashMap::new()),
            pending: Arc::new(Mutex::new(HashMap::new())),
            notifier,
            poll: PollConfig::default(),
        }
    }

    /// Orchestrator over every provider registered with `aggregator`
    pub fn for_inventory(aggregator: &InventoryAggregator, notifier: Notifier) -> Self {
        let mut orchestrator = Self::new(notifier);
        for provider in aggregator.providers() {
            orchestrator.register(Arc::clone(provider));
        }
        orchestrator
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn register(&mut self, provider: Arc<dyn CloudProvider>) {
        Arc::make_mut(&mut self.providers).insert(provider.name().to_string(), provider);
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn provider(&self, name: &str) -> Result<Arc<dyn CloudProvider>> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| CloudError::ProviderNotFound(name.to_string()))
    }

    /// Snapshot of the operations currently being polled
    pub async fn pending(&self) -> Vec<PendingOperation> {
        let mut ops: Vec<_> = self.pending.lock().await.values().cloned().collect();
        ops.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        ops
    }

    /// Execute a confirmed action and report its outcome.
    ///
    /// Exactly one notification is emitted for the immediate outcome. A
    /// tracked reboot emits one more when its operation finishes.
    pub async fn submit(&self, request: Confirmed<ActionRequest>) -> Result<ActionOutcome> {
        let ActionRequest { target, action } = request.into_inner();

        let result = self.dispatch(&target, &action).await;
        let notification = match &result {
            Ok(outcome) => outcome_notification(&target, &action, outcome),
            Err(e) => Notification::from_error(
                format!("Failed to {} {} {}", action.label(), target.kind(), target.id()),
                e,
            ),
        };
        self.notifier.notify(notification.for_resource(target.id()));
        result
    }

    /// Create a resource through the named provider.
    pub async fn launch(&self, provider_name: &str, request: &CreateRequest) -> Result<String> {
        let result = async {
            let provider = self.provider(provider_name)?;
            request.validate(provider.catalog())?;
            tracing::info!("Launching {} via {}", request.name, provider_name);
            provider.create(request).await
        }
        .await;

        match &result {
            Ok(id) => self.notifier.notify(
                Notification::new(
                    NotificationLevel::Success,
                    format!("Launched {} ({})", request.name, id),
                )
                .for_resource(id.as_str()),
            ),
            Err(e) => self
                .notifier
                .notify(Notification::from_error(format!("Failed to launch {}", request.name), e)),
        }
        result
    }

    /// Open an interactive shell on `target`.
    pub async fn open_shell(
        &self,
        target: &ResourceRecord,
        settings: &ShellSettings,
        launcher: &dyn ShellLauncher,
    ) -> Result<()> {
        let result = async {
            let shell = prepare_shell(target, settings)?;
            launcher.launch(&shell).await
        }
        .await;

        let notification = match &result {
            Ok(()) => Notification::new(
                NotificationLevel::Info,
                format!(
                    "Opening SSH session to {} in a new terminal",
                    target.address_label()
                ),
            ),
            Err(e) => Notification::from_error(format!("Cannot open SSH to {}", target.id()), e),
        };
        self.notifier.notify(notification.for_resource(target.id()));
        result
    }

    async fn dispatch(&self, target: &ResourceRecord, action: &Action) -> Result<ActionOutcome> {
        let provider = self.provider_for(target)?;

        if let Some(required) = action.required_state()
            && target.lifecycle_state != required
        {
            return Err(CloudError::InvalidState(format!(
                "cannot {} {} while it is {}",
                action.label(),
                target.id(),
                target.lifecycle_state
            )));
        }
        if action.is_lifecycle()
            && let Some(op) = self.in_flight_for(&target.key()).await
        {
            return Err(CloudError::InvalidState(format!(
                "{} has operation {} in flight",
                target.id(),
                op
            )));
        }

        tracing::info!(resource = %target.key(), "{}", action);
        let id = target.id();
        match action {
            Action::Start => {
                provider.start(id).await?;
                Ok(ActionOutcome::Accepted)
            }
            Action::Stop => {
                provider.stop(id).await?;
                Ok(ActionOutcome::Accepted)
            }
            Action::Reboot => match provider.reboot(id).await? {
                RebootHandle::Completed => Ok(ActionOutcome::Accepted),
                RebootHandle::Tracked(operation_id) => {
                    self.track(provider, target, operation_id.clone()).await;
                    Ok(ActionOutcome::Tracking { operation_id })
                }
            },
            Action::Tag { key, value } => {
                if key.trim().is_empty() {
                    return Err(CloudError::InvalidInput("tag key must not be empty".into()));
                }
                provider.tag(id, key, value).await?;
                Ok(ActionOutcome::Accepted)
            }
            Action::AttachAddress(mode) => Ok(ActionOutcome::Attached(
                provider.attach_address(id, mode).await?,
            )),
            Action::DetachAddress => {
                Ok(ActionOutcome::Detached(provider.detach_address(id).await?))
            }
            Action::OpenPort(rule) => {
                rule.validate()?;
                provider.open_port(id, rule).await?;
                Ok(ActionOutcome::Accepted)
            }
        }
    }

    fn provider_for(&self, target: &ResourceRecord) -> Result<Arc<dyn CloudProvider>> {
        let provider = self.provider(target.provider())?;
        if provider.kind() != target.kind() {
            return Err(CloudError::ProviderNotFound(format!(
                "{} does not manage {} resources",
                provider.name(),
                target.kind()
            )));
        }
        Ok(provider)
    }

    async fn in_flight_for(&self, key: &ResourceKey) -> Option<String> {
        self.pending
            .lock()
            .await
            .values()
            .find(|op| &op.target == key)
            .map(|op| op.operation_id.clone())
    }

    async fn track(
        &self,
        provider: Arc<dyn CloudProvider>,
        target: &ResourceRecord,
        operation_id: String,
    ) {
        let op = PendingOperation {
            operation_id: operation_id.clone(),
            target: target.key(),
            kind: OperationKind::Reboot,
            status: OperationStatus::InFlight,
            polls: 0,
            submitted_at: Utc::now(),
        };
        self.pending.lock().await.insert(operation_id.clone(), op);

        let this = self.clone();
        let target = target.clone();
        tokio::spawn(async move {
            let result = this.poll_operation(provider.as_ref(), &operation_id).await;
            this.pending.lock().await.remove(&operation_id);

            let label = format!("{} {}", target.kind(), target.id());
            let notification = match result {
                Ok(()) => Notification::new(
                    NotificationLevel::Success,
                    format!("{} rebooted successfully", capitalize(&label)),
                ),
                Err(e) => {
                    tracing::warn!("Reboot of {} did not complete: {}", label, e);
                    Notification::from_error(format!("Reboot of {}", label), &e)
                }
            };
            this.notifier.notify(notification.for_resource(target.id()));
        });
    }

    async fn poll_operation(&self, provider: &dyn CloudProvider, operation_id: &str) -> Result<()> {
        let mut polls = 0;
        loop {
            if polls >= self.poll.max_polls {
                return Err(CloudError::OperationTimedOut {
                    operation_id: operation_id.to_string(),
                    polls,
                });
            }

            tokio::time::sleep(self.poll.interval).await;
            polls += 1;

            let status = match provider.operation_status(operation_id).await {
                Ok(status) => status,
                Err(e @ CloudError::Unsupported { .. }) => return Err(e),
                Err(e) => {
                    tracing::warn!("Status check {} for {} failed: {}", polls, operation_id, e);
                    OperationStatus::InFlight
                }
            };
            self.record_poll(operation_id, polls, status).await;

            if !status.is_terminal() {
                tracing::debug!("{} still in flight after {} checks", operation_id, polls);
                continue;
            }
            return match status {
                OperationStatus::Succeeded => Ok(()),
                _ => Err(CloudError::OperationFailed {
                    operation_id: operation_id.to_string(),
                    reason: "provider reported failure".to_string(),
                }),
            };
        }
    }

    async fn record_poll(&self, operation_id: &str, polls: u32, status: OperationStatus) {
        if let Some(op) = self.pending.lock().await.get_mut(operation_id) {
            op.polls = polls;
            op.status = status;
        }
    }
}

fn outcome_notification(
    target: &ResourceRecord,
    action: &Action,
    outcome: &ActionOutcome,
) -> Notification {
    let label = format!("{} {}", target.kind(), target.id());
    let (level, message) = match (action, outcome) {
        (_, ActionOutcome::Tracking { operation_id }) => (
            NotificationLevel::Info,
            format!("Rebooting {} (operation {})", label, operation_id),
        ),
        (Action::Tag { key, value }, _) => (
            NotificationLevel::Success,
            format!("Tag '{}={}' applied to {}", key, value, label),
        ),
        (Action::OpenPort(rule), _) => (
            NotificationLevel::Success,
            format!("Port rule {} added to {}", rule, label),
        ),
        (_, ActionOutcome::Attached(attachment)) => {
            let message = match attachment.outcome {
                AttachOutcome::AlreadyAttached => {
                    format!("Address {} is already attached to {}", attachment.address, label)
                }
                AttachOutcome::Reused => format!(
                    "Reused free address {} and attached it to {}",
                    attachment.address, label
                ),
                AttachOutcome::Allocated => format!(
                    "Allocated new address {} and attached it to {}",
                    attachment.address, label
                ),
                AttachOutcome::Attached => {
                    format!("Address {} attached to {}", attachment.address, label)
                }
            };
            let level = if attachment.outcome == AttachOutcome::AlreadyAttached {
                NotificationLevel::Info
            } else {
                NotificationLevel::Success
            };
            (level, message)
        }
        (_, ActionOutcome::Detached(DetachOutcome::Detached(address))) => (
            NotificationLevel::Success,
            format!("Address {} detached from {}", address, label),
        ),
        (_, ActionOutcome::Detached(DetachOutcome::NothingToDetach)) => (
            NotificationLevel::Info,
            format!("No address is attached to {}; nothing to detach", label),
        ),
        (action, ActionOutcome::Accepted) => (
            NotificationLevel::Success,
            format!("{} requested for {}", capitalize(action.label()), label),
        ),
    };
    Notification::new(level, message)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_poll_config() {
        let poll = PollConfig::default();
        assert_eq!(poll.interval, Duration::from_secs(5));
        assert_eq!(poll.max_polls, 60);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("instance web"), "Instance web");
        assert_eq!(capitalize(""), "");
    }
}
