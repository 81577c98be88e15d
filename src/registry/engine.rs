//! Registry Engine
//!
//! Applies every state transition of the batch registry. Each mutation runs
//! all of its checks before touching the store, so a failed call leaves the
//! state exactly as it found it. Successful mutations append a
//! `RegistryEvent` to an outbox that the service layer drains.
//!
//! # Authorization
//! - Owner-only: transfer, version, tags, collaborators, licenses, revenue shares
//! - Owner or `update-status` collaborator: status updates

use crate::{
    registry::limits::{self, *},
    state::RegistryStore,
    types::*,
};
use ethers::types::Address;
use tracing::debug;

/// Batch registry state machine
pub struct RegistryEngine {
    store: RegistryStore,
    /// Events of successful mutations not yet handed to the service layer
    outbox: Vec<RegistryEvent>,
}

impl RegistryEngine {
    /// Creates an engine over an injected store
    pub fn new(store: RegistryStore) -> Self {
        Self {
            store,
            outbox: Vec::new(),
        }
    }

    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    /// Take every event emitted since the last drain, in commit order
    pub fn drain_events(&mut self) -> Vec<RegistryEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Register a new batch owned by the caller
    ///
    /// Fails with `AlreadyRegistered` if the hash is known; the existing record
    /// is never touched.
    pub fn register(
        &mut self,
        ctx: &TxContext,
        hash: BatchHash,
        waste_type: String,
        origin: String,
        description: String,
        quantity: u64,
    ) -> Result<(), RegistryError> {
        if self.store.contains_batch(&hash) {
            return Err(RegistryError::AlreadyRegistered);
        }
        limits::check_len("waste_type", &waste_type, MAX_WASTE_TYPE_LEN)?;
        limits::check_len("origin", &origin, MAX_ORIGIN_LEN)?;
        limits::check_len("description", &description, MAX_DESCRIPTION_LEN)?;

        self.outbox.push(RegistryEvent::BatchRegistered {
            hash,
            owner: ctx.sender,
            waste_type: waste_type.clone(),
            quantity,
            block_height: ctx.block_height,
        });
        self.store.insert_batch(
            hash,
            BatchRecord {
                owner: ctx.sender,
                timestamp: ctx.block_height,
                waste_type,
                origin,
                description,
                quantity,
                status: STATUS_REGISTERED.to_string(),
            },
        );
        Ok(())
    }

    /// Hand the batch to `new_owner`
    ///
    /// Only the owner field changes. Collaborators, licenses and revenue shares
    /// granted by the previous owner stay attached to the hash.
    pub fn transfer_ownership(
        &mut self,
        ctx: &TxContext,
        hash: BatchHash,
        new_owner: Address,
    ) -> Result<(), RegistryError> {
        let batch = self.store.batch_mut(&hash).ok_or(RegistryError::NotFound)?;
        if batch.owner != ctx.sender {
            return Err(RegistryError::NotOwner);
        }
        batch.owner = new_owner;

        self.outbox.push(RegistryEvent::OwnershipTransferred {
            hash,
            previous_owner: ctx.sender,
            new_owner,
            block_height: ctx.block_height,
        });
        Ok(())
    }

    /// Record a superseding fingerprint and return its global version id
    ///
    /// The batch record itself, including its primary key, is left unchanged.
    pub fn record_version(
        &mut self,
        ctx: &TxContext,
        hash: BatchHash,
        new_hash: BatchHash,
        notes: String,
    ) -> Result<u64, RegistryError> {
        let batch = self.store.batch(&hash).ok_or(RegistryError::NotFound)?;
        if batch.owner != ctx.sender {
            return Err(RegistryError::NotOwner);
        }
        limits::check_len("notes", &notes, MAX_NOTES_LEN)?;

        let version = self.store.append_version(
            hash,
            VersionRecord {
                updated_hash: new_hash,
                notes,
                timestamp: ctx.block_height,
                updater: ctx.sender,
            },
        );
        self.outbox.push(RegistryEvent::VersionRecorded {
            hash,
            version,
            updated_hash: new_hash,
            updater: ctx.sender,
            block_height: ctx.block_height,
        });
        Ok(version)
    }

    /// Replace the whole tag set of a batch
    pub fn set_tags(
        &mut self,
        ctx: &TxContext,
        hash: BatchHash,
        tags: Vec<String>,
    ) -> Result<(), RegistryError> {
        self.ensure_owner(ctx, &hash)?;
        limits::check_list("tags", &tags, MAX_TAGS, MAX_TAG_LEN)?;

        self.outbox.push(RegistryEvent::TagsSet {
            hash,
            tags: tags.clone(),
        });
        self.store.replace_tags(hash, tags);
        Ok(())
    }

    /// Insert or fully overwrite the collaborator entry for `(hash, collaborator)`
    pub fn add_collaborator(
        &mut self,
        ctx: &TxContext,
        hash: BatchHash,
        collaborator: Address,
        role: String,
        permissions: Vec<String>,
    ) -> Result<(), RegistryError> {
        self.ensure_owner(ctx, &hash)?;
        limits::check_len("role", &role, MAX_ROLE_LEN)?;
        limits::check_list("permissions", &permissions, MAX_PERMISSIONS, MAX_PERMISSION_LEN)?;

        self.outbox.push(RegistryEvent::CollaboratorAdded {
            hash,
            collaborator,
            role: role.clone(),
            permissions: permissions.clone(),
            block_height: ctx.block_height,
        });
        self.store.upsert_collaborator(
            hash,
            collaborator,
            Collaborator {
                role,
                permissions,
                added_at: ctx.block_height,
            },
        );
        Ok(())
    }

    /// Grant a handling license valid until `block_height + duration`
    pub fn grant_license(
        &mut self,
        ctx: &TxContext,
        hash: BatchHash,
        licensee: Address,
        duration: u64,
        terms: String,
    ) -> Result<(), RegistryError> {
        self.ensure_owner(ctx, &hash)?;
        limits::check_len("terms", &terms, MAX_TERMS_LEN)?;
        let expiry = ctx
            .block_height
            .checked_add(duration)
            .ok_or_else(|| RegistryError::InvalidParam("license expiry overflows".to_string()))?;

        self.store.upsert_license(
            hash,
            licensee,
            HandlingLicense {
                expiry,
                terms,
                active: true,
            },
        );
        self.outbox.push(RegistryEvent::LicenseGranted {
            hash,
            licensee,
            expiry,
        });
        Ok(())
    }

    /// Move a batch to `new_status`
    ///
    /// Appends a status history entry and overwrites the batch status in one
    /// step; nothing can fail once the first write has happened.
    pub fn update_status(
        &mut self,
        ctx: &TxContext,
        hash: BatchHash,
        new_status: String,
    ) -> Result<(), RegistryError> {
        let batch = self.store.batch(&hash).ok_or(RegistryError::NotFound)?;
        if batch.owner != ctx.sender
            && !self.has_permission(&hash, &ctx.sender, PERMISSION_UPDATE_STATUS)
        {
            return Err(RegistryError::PermissionDenied);
        }
        limits::check_len("status", &new_status, MAX_STATUS_LEN)?;
        if !KNOWN_STATUSES.contains(&new_status.as_str()) {
            debug!("Batch {:?} moved to unconventional status {:?}", hash, new_status);
        }

        let update_id = self.store.append_status(
            hash,
            StatusHistoryEntry {
                status: new_status.clone(),
                timestamp: ctx.block_height,
                updater: ctx.sender,
            },
        );
        if let Some(batch) = self.store.batch_mut(&hash) {
            batch.status = new_status.clone();
        }

        self.outbox.push(RegistryEvent::StatusUpdated {
            hash,
            update_id,
            status: new_status,
            updater: ctx.sender,
            block_height: ctx.block_height,
        });
        Ok(())
    }

    /// Set a participant's revenue share
    ///
    /// Replace semantics: `total_received` restarts at zero on every call.
    /// Each share is bounded by 100 on its own; the sum across participants is
    /// deliberately left unchecked.
    pub fn set_revenue_share(
        &mut self,
        ctx: &TxContext,
        hash: BatchHash,
        participant: Address,
        percentage: u32,
    ) -> Result<(), RegistryError> {
        self.ensure_owner(ctx, &hash)?;
        limits::check_percentage(percentage)?;

        self.store.replace_revenue_share(
            hash,
            participant,
            RevenueShare {
                percentage,
                total_received: 0,
            },
        );
        self.outbox.push(RegistryEvent::RevenueShareSet {
            hash,
            participant,
            percentage,
        });
        Ok(())
    }

    /// True iff `user` is a collaborator on `hash` holding exactly `permission`
    pub fn has_permission(&self, hash: &BatchHash, user: &Address, permission: &str) -> bool {
        self.store
            .collaborator(hash, user)
            .is_some_and(|c| c.has_permission(permission))
    }

    /// Whether the license is in force at `block_height`
    pub fn is_license_valid(&self, hash: &BatchHash, licensee: &Address, block_height: u64) -> bool {
        self.store
            .license(hash, licensee)
            .is_some_and(|license| license.is_valid_at(block_height))
    }

    pub fn get_batch(&self, hash: &BatchHash) -> Option<&BatchRecord> {
        self.store.batch(hash)
    }

    pub fn get_version(&self, hash: &BatchHash, version: u64) -> Option<&VersionRecord> {
        self.store.version(hash, version)
    }

    pub fn get_tags(&self, hash: &BatchHash) -> Option<&Vec<String>> {
        self.store.tags(hash)
    }

    pub fn get_collaborator(&self, hash: &BatchHash, who: &Address) -> Option<&Collaborator> {
        self.store.collaborator(hash, who)
    }

    pub fn get_license(&self, hash: &BatchHash, licensee: &Address) -> Option<&HandlingLicense> {
        self.store.license(hash, licensee)
    }

    pub fn get_status_history_entry(&self, hash: &BatchHash, update_id: u64) -> Option<&StatusHistoryEntry> {
        self.store.status_entry(hash, update_id)
    }

    pub fn latest_status_entry(&self, hash: &BatchHash) -> Option<(u64, &StatusHistoryEntry)> {
        self.store.latest_status_entry(hash)
    }

    pub fn get_revenue_share(&self, hash: &BatchHash, participant: &Address) -> Option<&RevenueShare> {
        self.store.revenue_share(hash, participant)
    }

    pub fn last_version_id(&self) -> u64 {
        self.store.last_version_id()
    }

    pub fn last_status_update_id(&self) -> u64 {
        self.store.last_status_update_id()
    }

    /// Unknown hashes have no owner, so they fail the owner check too
    fn ensure_owner(&self, ctx: &TxContext, hash: &BatchHash) -> Result<(), RegistryError> {
        match self.store.batch(hash) {
            Some(batch) if batch.owner == ctx.sender => Ok(()),
            _ => Err(RegistryError::NotOwner),
        }
    }
}
