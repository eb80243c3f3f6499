use async_trait::async_trait;
use awsdeck_cloud::address::attached_to;
use awsdeck_cloud::{
    Action, ActionRequest, AddressAttachment, AddressMode, AddressSlot, AttachOutcome,
    AttachmentPlan, AuthStatus, CloudError, CloudProvider, ConfirmationGate, Confirmed,
    CreateRequest, DetachOutcome, LifecycleState, Notification, OperationStatus, PlanOption,
    PortRule, RebootHandle, ResourceKind, ResourceRecord, Result, plan_attachment,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;

pub const PLANS: &[PlanOption] = &[
    PlanOption::new("nano", "512MB RAM"),
    PlanOption::new("micro", "1GB RAM"),
];

#[derive(Default)]
struct FakeState {
    records: Vec<ResourceRecord>,
    addresses: Vec<AddressSlot>,
    allocatable: VecDeque<String>,
    allocations: u32,
    tracked_reboots: bool,
    script: VecDeque<Result<OperationStatus>>,
    status_queries: u32,
    fail_list: bool,
    calls: Vec<String>,
}

/// In-memory provider that mimics the behaviour of a real adapter
pub struct FakeProvider {
    name: &'static str,
    kind: ResourceKind,
    state: Mutex<FakeState>,
}

#[allow(dead_code)]
impl FakeProvider {
    pub fn new(name: &'static str, kind: ResourceKind) -> Self {
        Self {
            name,
            kind,
            state: Mutex::new(FakeState::default()),
        }
    }

    pub fn with_record(self, id: &str, state: LifecycleState) -> Self {
        let record = ResourceRecord::new(id, self.name, self.kind).with_state(state);
        self.state.lock().unwrap().records.push(record);
        self
    }

    pub fn with_free_address(self, handle: &str, ip: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .addresses
            .push(AddressSlot::new(handle, Some(ip.to_string())));
        self
    }

    pub fn with_allocatable(self, ip: &str) -> Self {
        self.state.lock().unwrap().allocatable.push_back(ip.to_string());
        self
    }

    pub fn with_tracked_reboots(self, script: Vec<OperationStatus>) -> Self {
        self.with_status_script(script.into_iter().map(Ok).collect())
    }

    /// Tracked reboots whose status checks answer from `script`, errors included
    pub fn with_status_script(self, script: Vec<Result<OperationStatus>>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.tracked_reboots = true;
            state.script = script.into();
        }
        self
    }

    pub fn failing(self) -> Self {
        self.state.lock().unwrap().fail_list = true;
        self
    }

    pub fn record(&self, id: &str) -> ResourceRecord {
        self.state
            .lock()
            .unwrap()
            .records
            .iter()
            .find(|r| r.id() == id)
            .cloned()
            .unwrap()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn allocations(&self) -> u32 {
        self.state.lock().unwrap().allocations
    }

    pub fn status_queries(&self) -> u32 {
        self.state.lock().unwrap().status_queries
    }

    fn transition(
        &self,
        call: &str,
        id: &str,
        from: LifecycleState,
        to: LifecycleState,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{} {}", call, id));
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| CloudError::ResourceNotFound(id.to_string()))?;
        if record.lifecycle_state != from {
            return Err(CloudError::InvalidState(format!(
                "{} is {}",
                id, record.lifecycle_state
            )));
        }
        record.lifecycle_state = to;
        Ok(())
    }
}

#[async_trait]
impl CloudProvider for FakeProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn display_name(&self) -> &str {
        self.name
    }

    fn kind(&self) -> ResourceKind {
        self.kind
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        Ok(AuthStatus::ok("test-account"))
    }

    async fn list(&self) -> Result<Vec<ResourceRecord>> {
        let state = self.state.lock().unwrap();
        if state.fail_list {
            return Err(CloudError::ProviderUnavailable("connection refused".into()));
        }
        Ok(state.records.clone())
    }

    async fn start(&self, id: &str) -> Result<()> {
        self.transition("start", id, LifecycleState::Stopped, LifecycleState::Pending)
    }

    async fn stop(&self, id: &str) -> Result<()> {
        self.transition("stop", id, LifecycleState::Running, LifecycleState::Stopping)
    }

    async fn reboot(&self, id: &str) -> Result<RebootHandle> {
        self.transition("reboot", id, LifecycleState::Running, LifecycleState::Rebooting)?;
        if self.state.lock().unwrap().tracked_reboots {
            Ok(RebootHandle::Tracked(format!("op-{}", id)))
        } else {
            Ok(RebootHandle::Completed)
        }
    }

    async fn operation_status(&self, _operation_id: &str) -> Result<OperationStatus> {
        let mut state = self.state.lock().unwrap();
        state.status_queries += 1;
        state
            .script
            .pop_front()
            .unwrap_or(Ok(OperationStatus::InFlight))
    }

    async fn tag(&self, id: &str, key: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("tag {}", id));
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| CloudError::ResourceNotFound(id.to_string()))?;
        record.tags.retain(|t| t.key != key);
        record.tags.push(awsdeck_cloud::Tag::new(key, value));
        Ok(())
    }

    async fn attach_address(&self, id: &str, mode: &AddressMode) -> Result<AddressAttachment> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("attach {}", id));

        let (slot_index, outcome) = match mode {
            AddressMode::ReuseExisting(ip) => {
                let index = state
                    .addresses
                    .iter()
                    .position(|s| s.address.as_deref() == Some(ip.as_str()))
                    .ok_or_else(|| CloudError::ResourceNotFound(ip.clone()))?;
                (index, AttachOutcome::Attached)
            }
            AddressMode::AllocateNew => match plan_attachment(&state.addresses.clone(), id) {
                AttachmentPlan::AlreadyAttached(slot) => {
                    let ip = slot.address.unwrap_or_default();
                    return Ok(AddressAttachment::new(ip, AttachOutcome::AlreadyAttached));
                }
                AttachmentPlan::Reuse(slot) => {
                    let index = state
                        .addresses
                        .iter()
                        .position(|s| s.handle == slot.handle)
                        .unwrap();
                    (index, AttachOutcome::Reused)
                }
                AttachmentPlan::Allocate => {
                    let ip = state
                        .allocatable
                        .pop_front()
                        .ok_or_else(|| CloudError::QuotaExceeded("address limit".into()))?;
                    state.allocations += 1;
                    let handle = format!("alloc-{}", state.allocations);
                    state.addresses.push(AddressSlot::new(handle, Some(ip)));
                    (state.addresses.len() - 1, AttachOutcome::Allocated)
                }
            },
        };

        state.addresses[slot_index].attached_to = Some(id.to_string());
        let ip = state.addresses[slot_index].address.clone().unwrap_or_default();
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| CloudError::ResourceNotFound(id.to_string()))?;
        record.public_address = Some(ip.clone());
        Ok(AddressAttachment::new(ip, outcome))
    }

    async fn detach_address(&self, id: &str) -> Result<DetachOutcome> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("detach {}", id));
        let handle = match attached_to(&state.addresses, id).first() {
            Some(slot) => slot.handle.clone(),
            None => return Ok(DetachOutcome::NothingToDetach),
        };
        let slot = state
            .addresses
            .iter_mut()
            .find(|s| s.handle == handle)
            .unwrap();
        slot.attached_to = None;
        let ip = slot.address.clone().unwrap_or_default();
        if let Some(record) = state.records.iter_mut().find(|r| r.id() == id) {
            record.public_address = None;
        }
        Ok(DetachOutcome::Detached(ip))
    }

    async fn open_port(&self, id: &str, rule: &PortRule) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(format!("open {} {}", id, rule));
        Ok(())
    }

    fn catalog(&self) -> &[PlanOption] {
        PLANS
    }

    async fn create(&self, request: &CreateRequest) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("create {}", request.name));
        let record = ResourceRecord::new(&request.name, self.name, self.kind)
            .with_state(LifecycleState::Pending);
        state.records.push(record);
        Ok(request.name.clone())
    }
}

/// Provider that only implements the mandatory capabilities
pub struct ListOnlyProvider;

#[async_trait]
impl CloudProvider for ListOnlyProvider {
    fn name(&self) -> &str {
        "list-only"
    }

    fn display_name(&self) -> &str {
        "List only"
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::ManagedDatabase
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        Ok(AuthStatus::failed("no credentials"))
    }

    async fn list(&self) -> Result<Vec<ResourceRecord>> {
        Ok(vec![
            ResourceRecord::new("orders", "list-only", ResourceKind::ManagedDatabase)
                .with_state(LifecycleState::Running),
        ])
    }

    async fn start(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn stop(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn reboot(&self, id: &str) -> Result<RebootHandle> {
        Ok(RebootHandle::Tracked(format!("op-{}", id)))
    }

    async fn tag(&self, _id: &str, _key: &str, _value: &str) -> Result<()> {
        Ok(())
    }
}

/// Pass a request through a confirmation gate
pub fn confirmed(target: ResourceRecord, action: Action) -> Confirmed<ActionRequest> {
    let mut gate = ConfirmationGate::new();
    let label = action.label();
    let key = target.key();
    let ticket = gate.request(label, key, ActionRequest::new(target, action));
    gate.confirm(&ticket).unwrap()
}

/// Drain everything currently queued on the notification channel
#[allow(dead_code)]
pub fn drain(rx: &mut UnboundedReceiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}
