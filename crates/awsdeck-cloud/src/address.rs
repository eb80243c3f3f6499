//! Public address selection
//!
//! Both address-capable adapters read their current address pool from the
//! provider on every attach and feed it through [`plan_attachment`], so the
//! reuse-before-allocate rule lives in one place.

/// A provider address as seen at attach time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressSlot {
    /// Provider handle (EC2 allocation id, Lightsail static IP name)
    pub handle: String,
    /// The public IP, when the provider reports one
    pub address: Option<String>,
    /// Resource id the address is associated with, if any
    pub attached_to: Option<String>,
}

impl AddressSlot {
    pub fn new(handle: impl Into<String>, address: Option<String>) -> Self {
        Self {
            handle: handle.into(),
            address,
            attached_to: None,
        }
    }

    pub fn attached_to(mut self, resource_id: impl Into<String>) -> Self {
        self.attached_to = Some(resource_id.into());
        self
    }

    pub fn is_free(&self) -> bool {
        self.attached_to.is_none()
    }
}

/// What an adapter has to do to give a resource an address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentPlan {
    /// The resource already holds this address
    AlreadyAttached(AddressSlot),
    /// Associate this free address
    Reuse(AddressSlot),
    /// No free address exists; allocate one
    Allocate,
}

/// Decide how to attach an address to `resource_id`.
///
/// An address already associated with the resource wins, then the first free
/// address in provider order, and only then a new allocation.
pub fn plan_attachment(slots: &[AddressSlot], resource_id: &str) -> AttachmentPlan {
    if let Some(slot) = slots
        .iter()
        .find(|s| s.attached_to.as_deref() == Some(resource_id))
    {
        return AttachmentPlan::AlreadyAttached(slot.clone());
    }

    match slots.iter().find(|s| s.is_free()) {
        Some(slot) => AttachmentPlan::Reuse(slot.clone()),
        None => AttachmentPlan::Allocate,
    }
}

/// Addresses currently associated with `resource_id`.
pub fn attached_to<'a>(slots: &'a [AddressSlot], resource_id: &str) -> Vec<&'a AddressSlot> {
    slots
        .iter()
        .filter(|s| s.attached_to.as_deref() == Some(resource_id))
        .collect()
}
