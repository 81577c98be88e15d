//! API Server Module
//!
//! This module implements a JSON-RPC server for the batch registry.
//! Mutating methods take a signed call which is authenticated before the
//! registry sees it; query methods are plain, unsigned lookups.

use crate::{
    api::calls::{DecodeError, MUTATION_METHODS, MutationCall, QueryCall},
    config::Config,
    registry::RegistryService,
    state::AccountCache,
    types::{CallError, RegistryError, SignedCall},
    validation::CallValidator,
};
use axum::{Router, routing::post, Json, extract::State};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn, error};

/// Standard JSON-RPC error codes
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

/// Server-defined error codes
const UNAUTHORIZED_CALL: i32 = -32010;
const ALREADY_REGISTERED: i32 = -32001;
const NOT_FOUND: i32 = -32002;
const NOT_OWNER: i32 = -32003;
const PERMISSION_DENIED: i32 = -32004;
const INVALID_PARAM: i32 = -32005;

/// Shared application state that is accessible across all request handlers
///
/// - `validator`: Authenticates signed calls (signature and nonce)
/// - `accounts`: Per-sender nonces, exposed through `getNonce`
/// - `registry`: Serialized access to the registry engine
#[derive(Clone)]
pub struct AppState {
    validator: Arc<CallValidator>,
    accounts: AccountCache,
    registry: RegistryService,
}

impl AppState {
    pub fn new(registry: RegistryService) -> Self {
        let accounts = AccountCache::new();
        let validator = Arc::new(CallValidator::new(accounts.clone()));
        Self {
            validator,
            accounts,
            registry,
        }
    }
}

/// The main API server struct
///
/// Encapsulates the server configuration and application state.
pub struct Server {
    config: Config,
    state: AppState,
}

impl Server {
    /// Creates a new API server instance
    ///
    /// # Arguments
    /// * `config` - Server configuration (host, port, etc.)
    /// * `registry` - Registry service shared with the rest of the process
    pub fn new(config: Config, registry: RegistryService) -> Self {
        Self {
            config,
            state: AppState::new(registry),
        }
    }

    /// Starts the API server and begins listening for incoming requests
    ///
    /// # Returns
    /// `Ok(())` when the server shuts down, or an error if binding fails
    pub async fn start(self) -> anyhow::Result<()> {
        let app = router(self.state);

        let addr = format!("{}:{}", self.config.api.host, self.config.api.port);
        info!("API server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Router with the single JSON-RPC endpoint at "/"
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(handle_rpc))
        .with_state(state)
}

/// JSON-RPC 2.0 request structure
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Value,
    id: Value,
}

/// JSON-RPC 2.0 response structure
///
/// Either `result` or `error` will be populated, but not both.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Value,
}

/// JSON-RPC error object
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

impl JsonRpcError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<DecodeError> for JsonRpcError {
    fn from(e: DecodeError) -> Self {
        match e {
            DecodeError::UnknownMethod => JsonRpcError::new(METHOD_NOT_FOUND, "Method not found"),
            DecodeError::InvalidParams(msg) => {
                JsonRpcError::new(INVALID_PARAMS, format!("Invalid params: {}", msg))
            }
        }
    }
}

impl From<CallError> for JsonRpcError {
    fn from(e: CallError) -> Self {
        JsonRpcError::new(UNAUTHORIZED_CALL, e.to_string())
    }
}

impl From<RegistryError> for JsonRpcError {
    fn from(e: RegistryError) -> Self {
        let code = match e {
            RegistryError::AlreadyRegistered => ALREADY_REGISTERED,
            RegistryError::NotFound => NOT_FOUND,
            RegistryError::NotOwner => NOT_OWNER,
            RegistryError::PermissionDenied => PERMISSION_DENIED,
            RegistryError::InvalidParam(_) => INVALID_PARAM,
        };
        JsonRpcError::new(code, e.to_string())
    }
}

type RpcResult = Result<Value, JsonRpcError>;

#[derive(Debug, Deserialize)]
struct NonceParams {
    address: Address,
}

/// Main RPC request handler
///
/// Routes the request to the mutation or query path based on the method name.
async fn handle_rpc(
    State(state): State<AppState>,
    Json(request): Json<JsonRpcRequest>,
) -> Json<JsonRpcResponse> {
    info!("Received RPC request: {}", request.method);

    let method = request.method.as_str();
    let outcome = if MUTATION_METHODS.contains(&method) {
        handle_mutation(&state, method, request.params).await
    } else {
        handle_query(&state, method, request.params).await
    };

    let (result, error) = match outcome {
        Ok(value) => (Some(value), None),
        Err(e) => (None, Some(e)),
    };
    Json(JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        result,
        error,
        id: request.id,
    })
}

/// Handles a signed, state-changing call
///
/// This function:
/// 1. Deserializes the signed envelope and the typed method arguments
/// 2. Authenticates the sender (signature, then nonce)
/// 3. Applies the call through the registry service
///
/// Arguments are decoded before authentication so a malformed call never
/// consumes the sender's nonce.
async fn handle_mutation(state: &AppState, method: &str, params: Value) -> RpcResult {
    let call: SignedCall = serde_json::from_value(params)
        .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid params: {}", e)))?;
    let op = MutationCall::decode(method, &call.args)?;

    if let Err(e) = state.validator.validate(method, &call).await {
        warn!("Rejected {} from {:?}: {}", method, call.sender, e);
        return Err(e.into());
    }

    let result = state
        .registry
        .execute(call.sender, |engine, ctx| op.apply(engine, ctx))
        .await?;
    Ok(result)
}

/// Handles an unsigned, read-only call
async fn handle_query(state: &AppState, method: &str, params: Value) -> RpcResult {
    match method {
        "blockHeight" => return Ok(json!(state.registry.clock().current())),
        "getNonce" => {
            let p: NonceParams = serde_json::from_value(params)
                .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid params: {}", e)))?;
            return Ok(json!(state.accounts.get_nonce(&p.address).await));
        }
        _ => {}
    }

    let query = QueryCall::decode(method, &params)?;
    state
        .registry
        .read(|engine, height| query.run(engine, height))
        .await
        .map_err(|e| {
            error!("Failed to serialize {} result: {}", method, e);
            JsonRpcError::new(INTERNAL_ERROR, "Internal error")
        })
}
