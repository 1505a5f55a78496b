//! In-memory store of normalized usage records.
//!
//! Stands in for the ingestion and persistence collaborators: records arrive
//! already normalized, are validated, and are kept per item in date order.
//! Nothing is written to disk.
//!
//! Every successful insert bumps a generation counter. Readers get the
//! generation together with the records under the same lock, so anything
//! derived from a snapshot can be tagged with the data version it saw.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::analysis::validate_record;
use crate::batch::ItemHistory;
use crate::error::{EngineError, EngineResult};
use crate::model::UsageRecord;

/// Records of one item as of one store generation.
#[derive(Debug, Clone)]
pub struct ItemSnapshot {
    pub generation: u64,
    pub records: Vec<UsageRecord>,
    /// Lead time set for the item, if any.
    pub lead_time_days: Option<u32>,
}

#[derive(Default)]
struct Inner {
    items: HashMap<String, Vec<UsageRecord>>,
    lead_times: HashMap<String, u32>,
    generation: u64,
}

/// Shared handle to the record store.
#[derive(Clone, Default)]
pub struct UsageStore {
    inner: Arc<RwLock<Inner>>,
}

impl UsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append a batch of records.
    ///
    /// The batch is all-or-nothing: one invalid quantity rejects every record.
    ///
    /// # Returns
    ///
    /// The number of records stored.
    pub async fn insert_records(&self, records: Vec<UsageRecord>) -> EngineResult<usize> {
        for record in &records {
            validate_record(record)?;
        }

        let count = records.len();
        let mut inner = self.inner.write().await;

        for record in records {
            inner
                .items
                .entry(record.item_id.clone())
                .or_default()
                .push(record);
        }
        for history in inner.items.values_mut() {
            history.sort_by_key(|r| r.date);
        }
        inner.generation += 1;

        Ok(count)
    }

    /// Records of one item and the generation they belong to, or `None` for
    /// an unknown item.
    pub async fn snapshot(&self, item_id: &str) -> Option<ItemSnapshot> {
        let inner = self.inner.read().await;
        let records = inner.items.get(item_id)?.clone();

        Some(ItemSnapshot {
            generation: inner.generation,
            records,
            lead_time_days: inner.lead_times.get(item_id).copied(),
        })
    }

    /// Current data generation.
    pub async fn generation(&self) -> u64 {
        self.inner.read().await.generation
    }

    /// Every stored record, across all items.
    pub async fn all_records(&self) -> Vec<UsageRecord> {
        self.inner
            .read()
            .await
            .items
            .values()
            .flat_map(|records| records.iter().cloned())
            .collect()
    }

    /// Identifiers of every item with at least one record, sorted.
    pub async fn known_items(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.read().await.items.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Per-item histories for batch planning, all at the same stock level.
    pub async fn histories(&self, current_stock: f64) -> Vec<ItemHistory> {
        let inner = self.inner.read().await;
        inner
            .items
            .iter()
            .map(|(item_id, records)| ItemHistory {
                item_id: item_id.clone(),
                records: records.clone(),
                current_stock,
                lead_time_days: inner.lead_times.get(item_id).copied(),
            })
            .collect()
    }

    /// Set the lead time of one item. The item need not have records yet.
    ///
    /// # Errors
    ///
    /// `InvalidLeadTime` unless `1 <= days <= u32::MAX`.
    pub async fn set_lead_time(&self, item_id: &str, days: i64) -> EngineResult<u32> {
        let days = u32::try_from(days)
            .ok()
            .filter(|d| *d >= 1)
            .ok_or(EngineError::InvalidLeadTime(days))?;

        self.inner
            .write()
            .await
            .lead_times
            .insert(item_id.to_string(), days);
        Ok(days)
    }

    /// All item lead times, sorted by item.
    pub async fn lead_times(&self) -> Vec<(String, u32)> {
        let mut entries: Vec<(String, u32)> = self
            .inner
            .read()
            .await
            .lead_times
            .iter()
            .map(|(id, days)| (id.clone(), *days))
            .collect();
        entries.sort();
        entries
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.items.is_empty()
    }
}
