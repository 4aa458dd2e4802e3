//! Process-local usage log.
//!
//! Stands in for the hosted table in the gateway's tests, where it can also
//! be switched to unavailable. Records live only as long as the process.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sml_domain::error::{Error, Result};
use sml_domain::usage::UsageRecord;

use crate::store::UsageStore;

#[derive(Debug, Default)]
pub struct MemoryUsageStore {
    records: RwLock<Vec<UsageRecord>>,
    count_queries: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record with an explicit timestamp.
    pub fn insert_at(&self, caller_id: &str, created_at: DateTime<Utc>) {
        self.records.write().push(UsageRecord {
            caller_id: caller_id.to_owned(),
            created_at,
        });
    }

    /// Snapshot of every record, in insertion order.
    pub fn records(&self) -> Vec<UsageRecord> {
        self.records.read().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// How many window counts have been served so far.
    pub fn count_queries(&self) -> usize {
        self.count_queries.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail with [`Error::Store`] until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::Store("memory store marked unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn count_since(&self, caller_id: &str, since: DateTime<Utc>) -> Result<u64> {
        self.count_queries.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let count = self
            .records
            .read()
            .iter()
            .filter(|r| r.caller_id == caller_id && r.created_at >= since)
            .count();
        Ok(count as u64)
    }

    async fn record(&self, caller_id: &str) -> Result<()> {
        self.check_available()?;
        self.insert_at(caller_id, Utc::now());
        Ok(())
    }
}
