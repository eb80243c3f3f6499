//! Inventory aggregation across providers

use crate::error::{CloudError, Result};
use crate::model::{ResourceKey, ResourceKind, ResourceRecord};
use crate::provider::CloudProvider;
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;

/// Ordered snapshot of all known resources, indexed by [`ResourceKey`]
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    records: Vec<ResourceRecord>,
    index: HashMap<ResourceKey, usize>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from records in order; later duplicates of a key are dropped.
    pub fn from_records(records: impl IntoIterator<Item = ResourceRecord>) -> Self {
        let mut inventory = Self::new();
        for record in records {
            let key = record.key();
            if inventory.index.contains_key(&key) {
                tracing::debug!("Dropping duplicate resource {}", key);
                continue;
            }
            inventory.index.insert(key, inventory.records.len());
            inventory.records.push(record);
        }
        inventory
    }

    pub fn records(&self) -> &[ResourceRecord] {
        &self.records
    }

    pub fn get(&self, key: &ResourceKey) -> Option<&ResourceRecord> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    /// First record in display order with this id
    pub fn find_by_id(&self, id: &str) -> Option<&ResourceRecord> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn by_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceRecord> {
        self.records.iter().filter(move |r| r.kind() == kind)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Fans `list()` out to every registered provider
#[derive(Clone, Default)]
pub struct InventoryAggregator {
    providers: Vec<Arc<dyn CloudProvider>>,
}

impl InventoryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider. Listing order follows registration order.
    pub fn register(&mut self, provider: Arc<dyn CloudProvider>) {
        self.providers.push(provider);
    }

    pub fn with_provider(mut self, provider: Arc<dyn CloudProvider>) -> Self {
        self.register(provider);
        self
    }

    pub fn providers(&self) -> &[Arc<dyn CloudProvider>] {
        &self.providers
    }

    /// List every provider and merge the results.
    ///
    /// Providers are queried concurrently; the result keeps registration
    /// order. A single failing provider fails the whole refresh.
    pub async fn refresh(&self) -> Result<Inventory> {
        let results = join_all(self.providers.iter().map(|p| p.list())).await;

        let mut merged = Vec::new();
        for (provider, result) in self.providers.iter().zip(results) {
            match result {
                Ok(records) => {
                    tracing::debug!("{}: {} resources", provider.name(), records.len());
                    merged.extend(records);
                }
                Err(e) => {
                    tracing::warn!("Listing {} failed: {}", provider.name(), e);
                    return Err(CloudError::ProviderUnavailable(format!(
                        "{}: {}",
                        provider.display_name(),
                        e
                    )));
                }
            }
        }

        let inventory = Inventory::from_records(merged);
        tracing::info!("Inventory refreshed: {} resources", inventory.len());
        Ok(inventory)
    }

    /// Refresh and replace `inventory` only on success.
    pub async fn refresh_into(&self, inventory: &mut Inventory) -> Result<usize> {
        let fresh = self.refresh().await?;
        *inventory = fresh;
        Ok(inventory.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LifecycleState;

    fn vm(id: &str) -> ResourceRecord {
        ResourceRecord::new(id, "ec2", ResourceKind::Vm).with_state(LifecycleState::Running)
    }

    #[test]
    fn test_from_records_keeps_order_and_dedups() {
        let inventory = Inventory::from_records(vec![vm("a"), vm("b"), vm("a")]);
        let ids: Vec<_> = inventory.records().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(inventory.get(&ResourceKey::new("ec2", "b")).is_some());
        assert!(inventory.get(&ResourceKey::new("lightsail", "b")).is_none());
    }

    #[test]
    fn test_same_id_in_different_providers_is_kept() {
        let db = ResourceRecord::new("a", "lightsail-db", ResourceKind::ManagedDatabase);
        let inventory = Inventory::from_records(vec![vm("a"), db]);
        assert_eq!(inventory.len(), 2);
        assert_eq!(inventory.by_kind(ResourceKind::ManagedDatabase).count(), 1);
        assert_eq!(inventory.find_by_id("a").map(|r| r.provider()), Some("ec2"));
    }
}
