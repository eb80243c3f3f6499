//! Confirmation gate
//!
//! Mutating actions are parked here until the user explicitly confirms them.
//! Only [`ConfirmationGate::confirm`] can produce a [`Confirmed`] value, and the
//! orchestrator only accepts confirmed requests.

use crate::model::ResourceKey;
use std::collections::HashMap;

/// Handle returned by [`ConfirmationGate::request`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationTicket {
    target: ResourceKey,
    seq: u64,
}

impl ConfirmationTicket {
    pub fn target(&self) -> &ResourceKey {
        &self.target
    }
}

/// A continuation that passed through the gate
#[derive(Debug)]
pub struct Confirmed<C>(C);

impl<C> Confirmed<C> {
    pub fn get(&self) -> &C {
        &self.0
    }

    pub fn into_inner(self) -> C {
        self.0
    }
}

#[derive(Debug)]
struct PendingConfirmation<C> {
    seq: u64,
    action_label: String,
    continuation: C,
}

/// One-shot confirm/cancel flow, one pending record per target
#[derive(Debug)]
pub struct ConfirmationGate<C> {
    pending: HashMap<ResourceKey, PendingConfirmation<C>>,
    next_seq: u64,
}

impl<C> Default for ConfirmationGate<C> {
    fn default() -> Self {
        Self {
            pending: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<C> ConfirmationGate<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `continuation` until confirmed.
    ///
    /// A pending confirmation for the same target is replaced; its ticket
    /// becomes inert.
    pub fn request(
        &mut self,
        action_label: impl Into<String>,
        target: ResourceKey,
        continuation: C,
    ) -> ConfirmationTicket {
        self.next_seq += 1;
        let seq = self.next_seq;

        let replaced = self.pending.insert(
            target.clone(),
            PendingConfirmation {
                seq,
                action_label: action_label.into(),
                continuation,
            },
        );
        if let Some(old) = replaced {
            tracing::debug!(
                "Replacing pending '{}' confirmation for {}",
                old.action_label,
                target
            );
        }

        ConfirmationTicket { target, seq }
    }

    /// Release the continuation. Returns it exactly once per ticket.
    pub fn confirm(&mut self, ticket: &ConfirmationTicket) -> Option<Confirmed<C>> {
        self.take(ticket).map(|p| Confirmed(p.continuation))
    }

    /// Discard without releasing. Returns whether anything was discarded.
    pub fn cancel(&mut self, ticket: &ConfirmationTicket) -> bool {
        self.take(ticket).is_some()
    }

    /// Label of the action waiting on `target`, if any
    pub fn pending(&self, target: &ResourceKey) -> Option<&str> {
        self.pending.get(target).map(|p| p.action_label.as_str())
    }

    /// Whether `ticket` still refers to a live confirmation
    pub fn is_live(&self, ticket: &ConfirmationTicket) -> bool {
        self.pending
            .get(&ticket.target)
            .is_some_and(|p| p.seq == ticket.seq)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn take(&mut self, ticket: &ConfirmationTicket) -> Option<PendingConfirmation<C>> {
        if !self.is_live(ticket) {
            return None;
        }
        self.pending.remove(&ticket.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn ec2(id: &str) -> ResourceKey {
        ResourceKey::new("ec2", id)
    }

    #[test]
    fn test_confirm_invokes_once() {
        let calls = Cell::new(0);
        let mut gate = ConfirmationGate::new();
        let ticket = gate.request("stop", ec2("i-1"), || calls.set(calls.get() + 1));

        if let Some(f) = gate.confirm(&ticket) {
            (f.into_inner())();
        }
        if let Some(f) = gate.confirm(&ticket) {
            (f.into_inner())();
        }

        assert_eq!(calls.get(), 1);
        assert!(gate.is_empty());
    }

    #[test]
    fn test_cancel_then_confirm_never_invokes() {
        let mut gate = ConfirmationGate::new();
        let ticket = gate.request("reboot", ec2("i-1"), "payload");

        assert!(gate.cancel(&ticket));
        assert!(gate.confirm(&ticket).is_none());
        assert!(!gate.cancel(&ticket));
    }

    #[test]
    fn test_last_request_wins_per_target() {
        let mut gate = ConfirmationGate::new();
        let first = gate.request("start", ec2("i-1"), "start");
        let second = gate.request("stop", ec2("i-1"), "stop");

        assert_eq!(gate.len(), 1);
        assert_eq!(gate.pending(&ec2("i-1")), Some("stop"));
        assert!(gate.confirm(&first).is_none());
        assert_eq!(gate.confirm(&second).map(Confirmed::into_inner), Some("stop"));
    }

    #[test]
    fn test_targets_are_independent() {
        let mut gate = ConfirmationGate::new();
        let a = gate.request("stop", ec2("i-1"), 1);
        let b = gate.request("stop", ec2("i-2"), 2);

        assert!(gate.cancel(&a));
        assert_eq!(gate.pending(&ec2("i-2")), Some("stop"));
        assert_eq!(gate.confirm(&b).map(Confirmed::into_inner), Some(2));
    }

    #[test]
    fn test_same_id_under_different_providers() {
        let mut gate = ConfirmationGate::new();
        let vm = gate.request("stop", ResourceKey::new("lightsail", "web"), "vm");
        let db = gate.request("reboot", ResourceKey::new("lightsail-db", "web"), "db");

        assert_eq!(gate.len(), 2);
        assert!(gate.is_live(&vm));
        assert_eq!(vm.target().provider, "lightsail");
        assert_eq!(gate.confirm(&db).map(Confirmed::into_inner), Some("db"));
        assert_eq!(gate.confirm(&vm).map(Confirmed::into_inner), Some("vm"));
    }
}
