//! Typed RPC Calls
//!
//! Maps JSON-RPC method names and params onto registry operations. Mutations
//! are decoded from the `args` of a signed call; queries from plain params.

use crate::{
    registry::RegistryEngine,
    types::{BatchHash, RegistryError, TxContext},
};
use ethers::types::Address;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

/// Methods that change registry state and therefore require a signed call
pub const MUTATION_METHODS: [&str; 8] = [
    "registerBatch",
    "transferOwnership",
    "recordVersion",
    "setTags",
    "addCollaborator",
    "grantLicense",
    "updateStatus",
    "setRevenueShare",
];

/// Reasons a method or its params cannot be decoded
#[derive(Debug)]
pub enum DecodeError {
    UnknownMethod,
    InvalidParams(String),
}

fn decode<T: DeserializeOwned>(value: &Value) -> Result<T, DecodeError> {
    T::deserialize(value).map_err(|e| DecodeError::InvalidParams(e.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct RegisterArgs {
    pub hash: BatchHash,
    pub waste_type: String,
    pub origin: String,
    pub description: String,
    pub quantity: u64,
}

#[derive(Debug, Deserialize)]
pub struct TransferArgs {
    pub hash: BatchHash,
    pub new_owner: Address,
}

#[derive(Debug, Deserialize)]
pub struct RecordVersionArgs {
    pub hash: BatchHash,
    pub new_hash: BatchHash,
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub struct SetTagsArgs {
    pub hash: BatchHash,
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddCollaboratorArgs {
    pub hash: BatchHash,
    pub collaborator: Address,
    pub role: String,
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct GrantLicenseArgs {
    pub hash: BatchHash,
    pub licensee: Address,
    pub duration: u64,
    pub terms: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusArgs {
    pub hash: BatchHash,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct SetRevenueShareArgs {
    pub hash: BatchHash,
    pub participant: Address,
    pub percentage: u32,
}

/// A decoded state-changing call
#[derive(Debug)]
pub enum MutationCall {
    Register(RegisterArgs),
    Transfer(TransferArgs),
    RecordVersion(RecordVersionArgs),
    SetTags(SetTagsArgs),
    AddCollaborator(AddCollaboratorArgs),
    GrantLicense(GrantLicenseArgs),
    UpdateStatus(UpdateStatusArgs),
    SetRevenueShare(SetRevenueShareArgs),
}

impl MutationCall {
    pub fn decode(method: &str, args: &Value) -> Result<Self, DecodeError> {
        Ok(match method {
            "registerBatch" => MutationCall::Register(decode(args)?),
            "transferOwnership" => MutationCall::Transfer(decode(args)?),
            "recordVersion" => MutationCall::RecordVersion(decode(args)?),
            "setTags" => MutationCall::SetTags(decode(args)?),
            "addCollaborator" => MutationCall::AddCollaborator(decode(args)?),
            "grantLicense" => MutationCall::GrantLicense(decode(args)?),
            "updateStatus" => MutationCall::UpdateStatus(decode(args)?),
            "setRevenueShare" => MutationCall::SetRevenueShare(decode(args)?),
            _ => return Err(DecodeError::UnknownMethod),
        })
    }

    /// Apply the call to the engine; unit results are reported as `true`
    pub fn apply(self, engine: &mut RegistryEngine, ctx: &TxContext) -> Result<Value, RegistryError> {
        match self {
            MutationCall::Register(a) => engine
                .register(ctx, a.hash, a.waste_type, a.origin, a.description, a.quantity)
                .map(|_| Value::Bool(true)),
            MutationCall::Transfer(a) => engine
                .transfer_ownership(ctx, a.hash, a.new_owner)
                .map(|_| Value::Bool(true)),
            MutationCall::RecordVersion(a) => engine
                .record_version(ctx, a.hash, a.new_hash, a.notes)
                .map(|version| json!(version)),
            MutationCall::SetTags(a) => engine
                .set_tags(ctx, a.hash, a.tags)
                .map(|_| Value::Bool(true)),
            MutationCall::AddCollaborator(a) => engine
                .add_collaborator(ctx, a.hash, a.collaborator, a.role, a.permissions)
                .map(|_| Value::Bool(true)),
            MutationCall::GrantLicense(a) => engine
                .grant_license(ctx, a.hash, a.licensee, a.duration, a.terms)
                .map(|_| Value::Bool(true)),
            MutationCall::UpdateStatus(a) => engine
                .update_status(ctx, a.hash, a.status)
                .map(|_| Value::Bool(true)),
            MutationCall::SetRevenueShare(a) => engine
                .set_revenue_share(ctx, a.hash, a.participant, a.percentage)
                .map(|_| Value::Bool(true)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HashParams {
    pub hash: BatchHash,
}

#[derive(Debug, Deserialize)]
pub struct VersionParams {
    pub hash: BatchHash,
    pub version: u64,
}

/// Lookup keyed by `(hash, identity)`: collaborators, licenses, revenue shares
#[derive(Debug, Deserialize)]
pub struct PartyParams {
    pub hash: BatchHash,
    pub identity: Address,
}

#[derive(Debug, Deserialize)]
pub struct StatusEntryParams {
    pub hash: BatchHash,
    pub update_id: u64,
}

#[derive(Debug, Deserialize)]
pub struct PermissionParams {
    pub hash: BatchHash,
    pub user: Address,
    pub permission: String,
}

/// A decoded read-only call against the engine
#[derive(Debug)]
pub enum QueryCall {
    Batch(HashParams),
    Version(VersionParams),
    Tags(HashParams),
    Collaborator(PartyParams),
    License(PartyParams),
    LicenseValid(PartyParams),
    Permission(PermissionParams),
    StatusEntry(StatusEntryParams),
    LatestStatus(HashParams),
    RevenueShare(PartyParams),
    Counters,
}

impl QueryCall {
    pub fn decode(method: &str, params: &Value) -> Result<Self, DecodeError> {
        Ok(match method {
            "getBatch" => QueryCall::Batch(decode(params)?),
            "getVersion" => QueryCall::Version(decode(params)?),
            "getTags" => QueryCall::Tags(decode(params)?),
            "getCollaborator" => QueryCall::Collaborator(decode(params)?),
            "getLicense" => QueryCall::License(decode(params)?),
            "isLicenseValid" => QueryCall::LicenseValid(decode(params)?),
            "hasPermission" => QueryCall::Permission(decode(params)?),
            "getStatusHistoryEntry" => QueryCall::StatusEntry(decode(params)?),
            "getLatestStatus" => QueryCall::LatestStatus(decode(params)?),
            "getRevenueShare" => QueryCall::RevenueShare(decode(params)?),
            "getCounters" => QueryCall::Counters,
            _ => return Err(DecodeError::UnknownMethod),
        })
    }

    /// Run the lookup; absent records serialize as `null`
    pub fn run(&self, engine: &RegistryEngine, block_height: u64) -> serde_json::Result<Value> {
        match self {
            QueryCall::Batch(p) => serde_json::to_value(engine.get_batch(&p.hash)),
            QueryCall::Version(p) => serde_json::to_value(engine.get_version(&p.hash, p.version)),
            QueryCall::Tags(p) => serde_json::to_value(engine.get_tags(&p.hash)),
            QueryCall::Collaborator(p) => {
                serde_json::to_value(engine.get_collaborator(&p.hash, &p.identity))
            }
            QueryCall::License(p) => serde_json::to_value(engine.get_license(&p.hash, &p.identity)),
            QueryCall::LicenseValid(p) => Ok(Value::Bool(engine.is_license_valid(
                &p.hash,
                &p.identity,
                block_height,
            ))),
            QueryCall::Permission(p) => Ok(Value::Bool(engine.has_permission(
                &p.hash,
                &p.user,
                &p.permission,
            ))),
            QueryCall::StatusEntry(p) => {
                serde_json::to_value(engine.get_status_history_entry(&p.hash, p.update_id))
            }
            QueryCall::LatestStatus(p) => Ok(match engine.latest_status_entry(&p.hash) {
                Some((update_id, entry)) => json!({ "update_id": update_id, "entry": entry }),
                None => Value::Null,
            }),
            QueryCall::RevenueShare(p) => {
                serde_json::to_value(engine.get_revenue_share(&p.hash, &p.identity))
            }
            QueryCall::Counters => Ok(json!({
                "last_version_id": engine.last_version_id(),
                "last_status_update_id": engine.last_status_update_id(),
                "block_height": block_height,
            })),
        }
    }
}
