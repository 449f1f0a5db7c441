//! Bounded store of recent transfers, keyed by message id.
//!
//! Two rules bound the store, applied on every insert:
//!
//! - expiry: entries whose transfer ended more than `grace` before now are
//!   swept from the least recently used end, stopping at the first entry that
//!   is still fresh
//! - capacity: while more than `capacity` entries remain, the least recently
//!   used one is evicted
//!
//! Lookups through [`TransferCache::get`] count as a use; peer linking goes
//! through [`TransferCache::peek_mut`], which does not.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use super::entity::TransferRecord;
use crate::simulation::types::MessageId;
use crate::time_driver::SimTime;

pub struct TransferCache {
    capacity: usize,
    grace: Duration,
    next_stamp: u64,
    entries: HashMap<MessageId, (u64, TransferRecord)>,
    // Recency index: oldest stamp first.
    recency: BTreeMap<u64, MessageId>,
}

impl TransferCache {
    pub fn new(capacity: usize, grace: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            grace,
            next_stamp: 0,
            entries: HashMap::new(),
            recency: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Store `record` as the most recent entry, replacing any entry with the
    /// same id, then apply expiry and capacity.
    pub fn insert(&mut self, id: MessageId, record: TransferRecord, now: SimTime) {
        if let Some((old_stamp, _)) = self.entries.remove(&id) {
            self.recency.remove(&old_stamp);
        }
        let stamp = self.bump();
        self.entries.insert(id, (stamp, record));
        self.recency.insert(stamp, id);

        self.sweep_expired(now);
        while self.entries.len() > self.capacity {
            if !self.evict_oldest() {
                break;
            }
        }
    }

    /// Look up a transfer and mark it as most recently used.
    pub fn get(&mut self, id: MessageId) -> Option<&mut TransferRecord> {
        let stamp = self.bump();
        let (old_stamp, record) = self.entries.get_mut(&id)?;
        self.recency.remove(&*old_stamp);
        self.recency.insert(stamp, id);
        *old_stamp = stamp;
        Some(record)
    }

    pub fn peek(&self, id: MessageId) -> Option<&TransferRecord> {
        self.entries.get(&id).map(|(_, record)| record)
    }

    /// Look up a transfer without touching its recency.
    pub fn peek_mut(&mut self, id: MessageId) -> Option<&mut TransferRecord> {
        self.entries.get_mut(&id).map(|(_, record)| record)
    }

    fn bump(&mut self) -> u64 {
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        stamp
    }

    fn sweep_expired(&mut self, now: SimTime) {
        while let Some((&stamp, &id)) = self.recency.first_key_value() {
            let Some((_, record)) = self.entries.get(&id) else {
                self.recency.remove(&stamp);
                continue;
            };
            if record.interference().end() + self.grace >= now {
                break;
            }
            log::trace!("Transfer {} expired from cache at {}", id, now);
            self.recency.remove(&stamp);
            self.entries.remove(&id);
        }
    }

    fn evict_oldest(&mut self) -> bool {
        match self.recency.pop_first() {
            Some((_, id)) => {
                log::debug!("Transfer cache full ({}), evicting {}", self.capacity, id);
                self.entries.remove(&id);
                true
            }
            None => false,
        }
    }
}
