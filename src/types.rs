use ethers::types::{Address, Signature, H256};
use ethers::utils::keccak256;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Content fingerprint identifying one physical batch
pub type BatchHash = H256;

/// Status assigned to every batch at registration
pub const STATUS_REGISTERED: &str = "registered";

/// Permission a collaborator needs to move a batch through its lifecycle
pub const PERMISSION_UPDATE_STATUS: &str = "update-status";

/// Conventional lifecycle vocabulary. Status strings are free-form; these are
/// the values downstream reward and certification services look for.
pub const KNOWN_STATUSES: [&str; 5] = [
    STATUS_REGISTERED,
    "collected",
    "processing",
    "recycled",
    "disposed",
];

/// Caller and logical clock for one registry operation
///
/// Supplied by the hosting environment: `sender` is the authenticated identity,
/// `block_height` the current value of the monotonic logical clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxContext {
    pub sender: Address,
    pub block_height: u64,
}

impl TxContext {
    pub fn new(sender: Address, block_height: u64) -> Self {
        Self { sender, block_height }
    }
}

/// Registered batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub owner: Address,
    pub timestamp: u64,
    pub waste_type: String,
    pub origin: String,
    pub description: String,
    pub quantity: u64,
    pub status: String,
}

/// Historical pointer from a batch to a superseding fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub updated_hash: BatchHash,
    pub notes: String,
    pub timestamp: u64,
    pub updater: Address,
}

/// Delegated permissions granted by a batch owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub role: String,
    pub permissions: Vec<String>,
    pub added_at: u64,
}

impl Collaborator {
    /// Exact, case-sensitive membership test over the stored permission list
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

/// Time-bounded handling license
///
/// `active` is set at grant time and never cleared, so validity must always be
/// derived from `expiry` against the current clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlingLicense {
    pub expiry: u64,
    pub terms: String,
    pub active: bool,
}

impl HandlingLicense {
    pub fn is_valid_at(&self, block_height: u64) -> bool {
        self.active && block_height <= self.expiry
    }
}

/// One row of the append-only status audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub status: String,
    pub timestamp: u64,
    pub updater: Address,
}

/// Revenue entitlement of one participant in one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueShare {
    pub percentage: u32,
    pub total_received: u64,
}

/// Business-rule failures returned by the registry engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum RegistryError {
    #[error("batch is already registered")]
    AlreadyRegistered,
    #[error("batch not found")]
    NotFound,
    #[error("caller is not the batch owner")]
    NotOwner,
    #[error("caller lacks the required permission")]
    PermissionDenied,
    #[error("invalid parameter: {0}")]
    InvalidParam(String),
}

/// State change emitted by every successful registry mutation
///
/// Downstream services (rewards, certification) observe these rather than
/// being called by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RegistryEvent {
    BatchRegistered {
        hash: BatchHash,
        owner: Address,
        waste_type: String,
        quantity: u64,
        block_height: u64,
    },
    OwnershipTransferred {
        hash: BatchHash,
        previous_owner: Address,
        new_owner: Address,
        block_height: u64,
    },
    VersionRecorded {
        hash: BatchHash,
        version: u64,
        updated_hash: BatchHash,
        updater: Address,
        block_height: u64,
    },
    TagsSet {
        hash: BatchHash,
        tags: Vec<String>,
    },
    CollaboratorAdded {
        hash: BatchHash,
        collaborator: Address,
        role: String,
        permissions: Vec<String>,
        block_height: u64,
    },
    LicenseGranted {
        hash: BatchHash,
        licensee: Address,
        expiry: u64,
    },
    StatusUpdated {
        hash: BatchHash,
        update_id: u64,
        status: String,
        updater: Address,
        block_height: u64,
    },
    RevenueShareSet {
        hash: BatchHash,
        participant: Address,
        percentage: u32,
    },
}

impl RegistryEvent {
    /// Batch the event belongs to
    pub fn hash(&self) -> BatchHash {
        match self {
            RegistryEvent::BatchRegistered { hash, .. }
            | RegistryEvent::OwnershipTransferred { hash, .. }
            | RegistryEvent::VersionRecorded { hash, .. }
            | RegistryEvent::TagsSet { hash, .. }
            | RegistryEvent::CollaboratorAdded { hash, .. }
            | RegistryEvent::LicenseGranted { hash, .. }
            | RegistryEvent::StatusUpdated { hash, .. }
            | RegistryEvent::RevenueShareSet { hash, .. } => *hash,
        }
    }

    /// Stable name matching the serialized `event` tag
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryEvent::BatchRegistered { .. } => "batch_registered",
            RegistryEvent::OwnershipTransferred { .. } => "ownership_transferred",
            RegistryEvent::VersionRecorded { .. } => "version_recorded",
            RegistryEvent::TagsSet { .. } => "tags_set",
            RegistryEvent::CollaboratorAdded { .. } => "collaborator_added",
            RegistryEvent::LicenseGranted { .. } => "license_granted",
            RegistryEvent::StatusUpdated { .. } => "status_updated",
            RegistryEvent::RevenueShareSet { .. } => "revenue_share_set",
        }
    }
}

/// Signed envelope carrying the arguments of one mutating call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedCall {
    pub sender: Address,
    pub nonce: u64,
    pub args: Value,
    pub signature: Signature,
}

impl SignedCall {
    /// Digest the sender signed for `method`
    pub fn digest(&self, method: &str) -> H256 {
        call_digest(method, &self.args, self.nonce)
    }
}

/// Compute the digest a caller signs to authorize `method` with `args`
///
/// `serde_json::Value` keeps object keys sorted, so the rendered JSON is
/// canonical for a given value.
pub fn call_digest(method: &str, args: &Value, nonce: u64) -> H256 {
    let mut data = Vec::new();
    data.extend_from_slice(method.as_bytes());
    data.push(0);
    data.extend_from_slice(args.to_string().as_bytes());
    data.extend_from_slice(&nonce.to_be_bytes());

    H256::from_slice(&keccak256(data))
}

/// Reasons a signed call is rejected before it reaches the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum CallError {
    #[error("Invalid call signature")]
    InvalidSignature,
    #[error("Invalid nonce: expected {expected}, got {got}")]
    InvalidNonce { expected: u64, got: u64 },
}
