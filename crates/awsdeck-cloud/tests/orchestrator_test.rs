mod common;

use awsdeck_cloud::{
    Action, ActionOrchestrator, ActionOutcome, AddressMode, AttachOutcome, CloudError,
    CloudProvider, CreateRequest, DetachOutcome, InventoryAggregator, LifecycleState,
    NotificationLevel, Notifier, OperationStatus, PollConfig, PortRule, ResourceKind,
    ResourceRecord,
};
use common::{FakeProvider, ListOnlyProvider, confirmed, drain};
use std::sync::Arc;
use std::time::Duration;

fn orchestrator_with(
    provider: Arc<dyn CloudProvider>,
    max_polls: u32,
) -> (
    ActionOrchestrator,
    tokio::sync::mpsc::UnboundedReceiver<awsdeck_cloud::Notification>,
) {
    let (notifier, rx) = Notifier::channel();
    let mut orchestrator = ActionOrchestrator::new(notifier).with_poll_config(PollConfig {
        interval: Duration::from_secs(5),
        max_polls,
    });
    orchestrator.register(provider);
    (orchestrator, rx)
}

#[tokio::test]
async fn test_start_requires_stopped() {
    let provider = Arc::new(
        FakeProvider::new("ec2", ResourceKind::Vm)
            .with_record("i-1", LifecycleState::Running),
    );
    let (orchestrator, mut rx) = orchestrator_with(provider.clone(), 3);

    let err = orchestrator
        .submit(confirmed(provider.record("i-1"), Action::Start))
        .await
        .unwrap_err();

    assert!(matches!(err, CloudError::InvalidState(_)));
    assert!(provider.calls().is_empty());

    let notes = drain(&mut rx);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, NotificationLevel::Warning);
    assert_eq!(notes[0].resource_id.as_deref(), Some("i-1"));
}

#[tokio::test]
async fn test_stop_running_instance() {
    let provider = Arc::new(
        FakeProvider::new("ec2", ResourceKind::Vm)
            .with_record("i-1", LifecycleState::Running),
    );
    let (orchestrator, mut rx) = orchestrator_with(provider.clone(), 3);

    let outcome = orchestrator
        .submit(confirmed(provider.record("i-1"), Action::Stop))
        .await
        .unwrap();

    assert_eq!(outcome, ActionOutcome::Accepted);
    assert_eq!(provider.calls(), vec!["stop i-1"]);
    assert_eq!(provider.record("i-1").lifecycle_state, LifecycleState::Stopping);

    let notes = drain(&mut rx);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, NotificationLevel::Success);
    assert_eq!(notes[0].message, "Stop requested for instance i-1");
}

#[tokio::test]
async fn test_stop_rejected_for_stopped_instance() {
    let provider = Arc::new(
        FakeProvider::new("ec2", ResourceKind::Vm)
            .with_record("i-1", LifecycleState::Stopped),
    );
    let (orchestrator, _rx) = orchestrator_with(provider.clone(), 3);

    for action in [Action::Stop, Action::Reboot] {
        let err = orchestrator
            .submit(confirmed(provider.record("i-1"), action))
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::InvalidState(_)));
    }
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_detach_without_address_is_noop() {
    let provider = Arc::new(
        FakeProvider::new("lightsail", ResourceKind::Vm)
            .with_record("web", LifecycleState::Running),
    );
    let (orchestrator, mut rx) = orchestrator_with(provider.clone(), 3);

    let outcome = orchestrator
        .submit(confirmed(provider.record("web"), Action::DetachAddress))
        .await
        .unwrap();
    assert_eq!(outcome, ActionOutcome::Detached(DetachOutcome::NothingToDetach));

    let notes = drain(&mut rx);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, NotificationLevel::Info);
    assert!(notes[0].message.contains("nothing to detach"));
}

#[tokio::test]
async fn test_attach_reuses_free_address() {
    let provider = Arc::new(
        FakeProvider::new("ec2", ResourceKind::Vm)
            .with_record("i-1", LifecycleState::Running)
            .with_free_address("eipalloc-1", "198.51.100.20")
            .with_allocatable("203.0.113.99"),
    );
    let (orchestrator, _rx) = orchestrator_with(provider.clone(), 3);

    let outcome = orchestrator
        .submit(confirmed(
            provider.record("i-1"),
            Action::AttachAddress(AddressMode::AllocateNew),
        ))
        .await
        .unwrap();

    let ActionOutcome::Attached(attachment) = outcome else {
        panic!("expected an attachment, got {:?}", outcome);
    };
    assert_eq!(attachment.address, "198.51.100.20");
    assert_eq!(attachment.outcome, AttachOutcome::Reused);
    assert_eq!(provider.allocations(), 0);
}

#[tokio::test]
async fn test_allocate_then_refresh_shows_address() {
    let provider = Arc::new(
        FakeProvider::new("lightsail", ResourceKind::Vm)
            .with_record("vm-1", LifecycleState::Running)
            .with_allocatable("203.0.113.5"),
    );
    let aggregator = InventoryAggregator::new().with_provider(provider.clone());
    let (notifier, mut rx) = Notifier::channel();
    let orchestrator = ActionOrchestrator::for_inventory(&aggregator, notifier);

    let before = aggregator.refresh().await.unwrap();
    let target = before.find_by_id("vm-1").unwrap().clone();
    assert_eq!(target.address_label(), "N/A");

    let outcome = orchestrator
        .submit(confirmed(target, Action::AttachAddress(AddressMode::AllocateNew)))
        .await
        .unwrap();
    let ActionOutcome::Attached(attachment) = outcome else {
        panic!("expected an attachment, got {:?}", outcome);
    };
    assert_eq!(attachment.outcome, AttachOutcome::Allocated);

    let notes = drain(&mut rx);
    assert_eq!(notes.len(), 1);
    assert!(notes[0].message.contains("203.0.113.5"));

    let after = aggregator.refresh().await.unwrap();
    assert_eq!(
        after.find_by_id("vm-1").unwrap().public_address.as_deref(),
        Some("203.0.113.5")
    );
}

#[tokio::test]
async fn test_attach_quota_exceeded() {
    let provider = Arc::new(
        FakeProvider::new("ec2", ResourceKind::Vm)
            .with_record("i-1", LifecycleState::Running),
    );
    let (orchestrator, mut rx) = orchestrator_with(provider.clone(), 3);

    let err = orchestrator
        .submit(confirmed(
            provider.record("i-1"),
            Action::AttachAddress(AddressMode::AllocateNew),
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, CloudError::QuotaExceeded(_)));
    let notes = drain(&mut rx);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, NotificationLevel::Warning);
}

#[tokio::test(start_paused = true)]
async fn test_tracked_reboot_succeeds_after_polling() {
    let provider = Arc::new(
        FakeProvider::new("lightsail", ResourceKind::Vm)
            .with_record("web", LifecycleState::Running)
            .with_tracked_reboots(vec![
                OperationStatus::InFlight,
                OperationStatus::InFlight,
                OperationStatus::InFlight,
                OperationStatus::Succeeded,
            ]),
    );
    let (orchestrator, mut rx) = orchestrator_with(provider.clone(), 10);

    let outcome = orchestrator
        .submit(confirmed(provider.record("web"), Action::Reboot))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        ActionOutcome::Tracking {
            operation_id: "op-web".to_string()
        }
    );
    assert_eq!(orchestrator.pending().await.len(), 1);

    let accepted = rx.recv().await.unwrap();
    assert_eq!(accepted.level, NotificationLevel::Info);
    assert!(accepted.message.starts_with("Rebooting instance web"));

    let done = rx.recv().await.unwrap();
    assert_eq!(done.level, NotificationLevel::Success);
    assert_eq!(done.message, "Instance web rebooted successfully");

    assert_eq!(provider.status_queries(), 4);
    assert!(orchestrator.pending().await.is_empty());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_tracked_reboot_times_out() {
    let provider = Arc::new(
        FakeProvider::new("lightsail", ResourceKind::Vm)
            .with_record("web", LifecycleState::Running)
            .with_tracked_reboots(vec![]),
    );
    let (orchestrator, mut rx) = orchestrator_with(provider.clone(), 3);

    orchestrator
        .submit(confirmed(provider.record("web"), Action::Reboot))
        .await
        .unwrap();
    let _accepted = rx.recv().await.unwrap();

    let done = rx.recv().await.unwrap();
    assert_eq!(done.level, NotificationLevel::Error);
    assert!(done.message.contains("timed out after 3 status checks"));
    assert_eq!(provider.status_queries(), 3);
    assert!(orchestrator.pending().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_tracked_reboot_reports_failure() {
    let provider = Arc::new(
        FakeProvider::new("lightsail", ResourceKind::Vm)
            .with_record("web", LifecycleState::Running)
            .with_tracked_reboots(vec![OperationStatus::InFlight, OperationStatus::Failed]),
    );
    let (orchestrator, mut rx) = orchestrator_with(provider.clone(), 10);

    orchestrator
        .submit(confirmed(provider.record("web"), Action::Reboot))
        .await
        .unwrap();
    let _accepted = rx.recv().await.unwrap();

    let done = rx.recv().await.unwrap();
    assert_eq!(done.level, NotificationLevel::Error);
    assert!(done.message.starts_with("Reboot of instance web"));
    assert_eq!(provider.status_queries(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_status_check_counts_as_poll() {
    let provider = Arc::new(
        FakeProvider::new("lightsail", ResourceKind::Vm)
            .with_record("web", LifecycleState::Running)
            .with_status_script(vec![
                Err(CloudError::ProviderUnavailable("throttled".into())),
                Ok(OperationStatus::Succeeded),
            ]),
    );
    let (orchestrator, mut rx) = orchestrator_with(provider.clone(), 10);

    orchestrator
        .submit(confirmed(provider.record("web"), Action::Reboot))
        .await
        .unwrap();
    let _accepted = rx.recv().await.unwrap();

    let done = rx.recv().await.unwrap();
    assert_eq!(done.level, NotificationLevel::Success);
    assert_eq!(provider.status_queries(), 2);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_refresh_does_not_disturb_polling() {
    let provider = Arc::new(
        FakeProvider::new("lightsail", ResourceKind::Vm)
            .with_record("web", LifecycleState::Running)
            .with_tracked_reboots(vec![OperationStatus::InFlight, OperationStatus::Succeeded]),
    );
    let aggregator = InventoryAggregator::new().with_provider(provider.clone());
    let (orchestrator, mut rx) = orchestrator_with(provider.clone(), 10);

    orchestrator
        .submit(confirmed(provider.record("web"), Action::Reboot))
        .await
        .unwrap();
    let _accepted = rx.recv().await.unwrap();

    let inventory = aggregator.refresh().await.unwrap();
    let web = inventory.find_by_id("web").unwrap();
    assert_eq!(web.lifecycle_state, LifecycleState::Rebooting);
    assert_eq!(orchestrator.pending().await.len(), 1);

    let done = rx.recv().await.unwrap();
    assert_eq!(done.level, NotificationLevel::Success);
    assert_eq!(done.message, "Instance web rebooted successfully");
    assert_eq!(provider.status_queries(), 2);
    assert!(orchestrator.pending().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_lifecycle_action_rejected_while_operation_in_flight() {
    let provider = Arc::new(
        FakeProvider::new("lightsail", ResourceKind::Vm)
            .with_record("web", LifecycleState::Running)
            .with_record("api", LifecycleState::Running)
            .with_tracked_reboots(vec![]),
    );
    let (orchestrator, _rx) = orchestrator_with(provider.clone(), 5);

    // Last-known state from before the reboot was issued
    let stale = provider.record("web");
    orchestrator
        .submit(confirmed(stale.clone(), Action::Reboot))
        .await
        .unwrap();

    let err = orchestrator
        .submit(confirmed(stale.clone(), Action::Stop))
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::InvalidState(_)));

    // Other resources and non-lifecycle actions are unaffected
    orchestrator
        .submit(confirmed(provider.record("api"), Action::Reboot))
        .await
        .unwrap();
    orchestrator
        .submit(confirmed(
            stale,
            Action::Tag {
                key: "env".into(),
                value: "prod".into(),
            },
        ))
        .await
        .unwrap();

    assert_eq!(orchestrator.pending().await.len(), 2);
    assert_eq!(provider.record("web").tags.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reboot_without_status_support_stops_polling() {
    let (orchestrator, mut rx) = orchestrator_with(Arc::new(ListOnlyProvider), 10);
    let target = ResourceRecord::new("orders", "list-only", ResourceKind::ManagedDatabase)
        .with_state(LifecycleState::Running);

    orchestrator
        .submit(confirmed(target, Action::Reboot))
        .await
        .unwrap();
    let _accepted = rx.recv().await.unwrap();

    let done = rx.recv().await.unwrap();
    assert_eq!(done.level, NotificationLevel::Error);
    assert!(done.message.contains("does not support operation tracking"));
}

#[tokio::test]
async fn test_unsupported_capability() {
    let (orchestrator, mut rx) = orchestrator_with(Arc::new(ListOnlyProvider), 3);
    let target = ResourceRecord::new("orders", "list-only", ResourceKind::ManagedDatabase)
        .with_state(LifecycleState::Running);

    let err = orchestrator
        .submit(confirmed(target.clone(), Action::AttachAddress(AddressMode::AllocateNew)))
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::Unsupported { .. }));

    let err = orchestrator
        .submit(confirmed(target, Action::OpenPort(PortRule::tcp(5432))))
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::Unsupported { .. }));
    assert_eq!(drain(&mut rx).len(), 2);
}

#[tokio::test]
async fn test_dispatch_requires_matching_provider() {
    let provider = Arc::new(FakeProvider::new("ec2", ResourceKind::Vm));
    let (orchestrator, _rx) = orchestrator_with(provider, 3);

    let unknown = ResourceRecord::new("web", "lightsail", ResourceKind::Vm)
        .with_state(LifecycleState::Running);
    let err = orchestrator
        .submit(confirmed(unknown, Action::Stop))
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::ProviderNotFound(_)));

    let wrong_kind = ResourceRecord::new("orders", "ec2", ResourceKind::ManagedDatabase)
        .with_state(LifecycleState::Running);
    let err = orchestrator
        .submit(confirmed(wrong_kind, Action::Stop))
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::ProviderNotFound(_)));
}

#[tokio::test]
async fn test_tag_and_open_port() {
    let provider = Arc::new(
        FakeProvider::new("ec2", ResourceKind::Vm)
            .with_record("i-1", LifecycleState::Stopped),
    );
    let (orchestrator, mut rx) = orchestrator_with(provider.clone(), 3);

    let err = orchestrator
        .submit(confirmed(
            provider.record("i-1"),
            Action::Tag {
                key: " ".into(),
                value: "x".into(),
            },
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::InvalidInput(_)));

    orchestrator
        .submit(confirmed(
            provider.record("i-1"),
            Action::Tag {
                key: "team".into(),
                value: "infra".into(),
            },
        ))
        .await
        .unwrap();
    orchestrator
        .submit(confirmed(provider.record("i-1"), Action::OpenPort(PortRule::tcp(443))))
        .await
        .unwrap();

    assert_eq!(provider.record("i-1").display_tags(), vec!["team"]);
    assert_eq!(provider.calls(), vec!["tag i-1", "open i-1 443/tcp from 0.0.0.0/0"]);

    let notes = drain(&mut rx);
    assert_eq!(notes.len(), 3);
    assert_eq!(notes[1].message, "Tag 'team=infra' applied to instance i-1");
}

#[tokio::test]
async fn test_launch_validates_plan() {
    let provider = Arc::new(FakeProvider::new("lightsail", ResourceKind::Vm));
    let (orchestrator, mut rx) = orchestrator_with(provider.clone(), 3);

    let err = orchestrator
        .launch("lightsail", &CreateRequest::new("web-2", "huge"))
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::InvalidInput(_)));
    assert!(provider.calls().is_empty());

    let id = orchestrator
        .launch("lightsail", &CreateRequest::new("web-2", "nano"))
        .await
        .unwrap();
    assert_eq!(id, "web-2");
    assert_eq!(provider.calls(), vec!["create web-2"]);

    let notes = drain(&mut rx);
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[1].message, "Launched web-2 (web-2)");
}
