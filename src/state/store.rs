//! Keyed tables backing the registry engine.
//!
//! The store holds data only; every authorization and invariant check lives
//! in the engine. Lookups are by key, insertion order is irrelevant.

use crate::types::{
    BatchHash, BatchRecord, Collaborator, HandlingLicense, RevenueShare, StatusHistoryEntry,
    VersionRecord,
};
use ethers::types::Address;
use std::collections::HashMap;

/// State container owning every registry table and both global counters
///
/// Constructed empty and injected into the engine; dropping it tears the
/// registry down.
#[derive(Debug, Clone, Default)]
pub struct RegistryStore {
    batches: HashMap<BatchHash, BatchRecord>,
    versions: HashMap<(BatchHash, u64), VersionRecord>,
    tags: HashMap<BatchHash, Vec<String>>,
    collaborators: HashMap<(BatchHash, Address), Collaborator>,
    licenses: HashMap<(BatchHash, Address), HandlingLicense>,
    status_history: HashMap<(BatchHash, u64), StatusHistoryEntry>,
    /// Most recent status-update id per batch
    latest_status: HashMap<BatchHash, u64>,
    revenue_shares: HashMap<(BatchHash, Address), RevenueShare>,
    /// Last allocated version id, shared by all batches
    version_counter: u64,
    /// Last allocated status-update id, shared by all batches
    status_update_counter: u64,
}

impl RegistryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Batches

    pub fn contains_batch(&self, hash: &BatchHash) -> bool {
        self.batches.contains_key(hash)
    }

    pub fn batch(&self, hash: &BatchHash) -> Option<&BatchRecord> {
        self.batches.get(hash)
    }

    pub(crate) fn batch_mut(&mut self, hash: &BatchHash) -> Option<&mut BatchRecord> {
        self.batches.get_mut(hash)
    }

    pub(crate) fn insert_batch(&mut self, hash: BatchHash, record: BatchRecord) {
        self.batches.insert(hash, record);
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    // Versions

    pub fn version(&self, hash: &BatchHash, version: u64) -> Option<&VersionRecord> {
        self.versions.get(&(*hash, version))
    }

    /// Allocate the next global version id and store the record under it
    pub(crate) fn append_version(&mut self, hash: BatchHash, record: VersionRecord) -> u64 {
        self.version_counter += 1;
        self.versions.insert((hash, self.version_counter), record);
        self.version_counter
    }

    pub fn last_version_id(&self) -> u64 {
        self.version_counter
    }

    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    // Tags

    pub fn tags(&self, hash: &BatchHash) -> Option<&Vec<String>> {
        self.tags.get(hash)
    }

    pub(crate) fn replace_tags(&mut self, hash: BatchHash, tags: Vec<String>) {
        self.tags.insert(hash, tags);
    }

    // Collaborators

    pub fn collaborator(&self, hash: &BatchHash, who: &Address) -> Option<&Collaborator> {
        self.collaborators.get(&(*hash, *who))
    }

    pub(crate) fn upsert_collaborator(&mut self, hash: BatchHash, who: Address, entry: Collaborator) {
        self.collaborators.insert((hash, who), entry);
    }

    // Licenses

    pub fn license(&self, hash: &BatchHash, licensee: &Address) -> Option<&HandlingLicense> {
        self.licenses.get(&(*hash, *licensee))
    }

    pub(crate) fn upsert_license(&mut self, hash: BatchHash, licensee: Address, license: HandlingLicense) {
        self.licenses.insert((hash, licensee), license);
    }

    // Status history

    pub fn status_entry(&self, hash: &BatchHash, update_id: u64) -> Option<&StatusHistoryEntry> {
        self.status_history.get(&(*hash, update_id))
    }

    /// Id and entry of the most recent status update for `hash`
    pub fn latest_status_entry(&self, hash: &BatchHash) -> Option<(u64, &StatusHistoryEntry)> {
        let update_id = *self.latest_status.get(hash)?;
        self.status_entry(hash, update_id).map(|entry| (update_id, entry))
    }

    /// Allocate the next global status-update id and store the entry under it
    pub(crate) fn append_status(&mut self, hash: BatchHash, entry: StatusHistoryEntry) -> u64 {
        self.status_update_counter += 1;
        let update_id = self.status_update_counter;
        self.status_history.insert((hash, update_id), entry);
        self.latest_status.insert(hash, update_id);
        update_id
    }

    pub fn last_status_update_id(&self) -> u64 {
        self.status_update_counter
    }

    pub fn status_history_count(&self) -> usize {
        self.status_history.len()
    }

    // Revenue shares

    pub fn revenue_share(&self, hash: &BatchHash, participant: &Address) -> Option<&RevenueShare> {
        self.revenue_shares.get(&(*hash, *participant))
    }

    /// Replace the share for `(hash, participant)`; accrual is not carried over
    pub(crate) fn replace_revenue_share(&mut self, hash: BatchHash, participant: Address, share: RevenueShare) {
        self.revenue_shares.insert((hash, participant), share);
    }
}
