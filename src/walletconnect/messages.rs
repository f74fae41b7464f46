// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # WalletConnect 1.0 Wire Types
//!
//! Bridge envelopes, the encrypted payload carried inside them, and the
//! JSON-RPC bodies exchanged with the dApp once decrypted.
//!
//! ## Layering
//!
//! ```text
//! SocketMessage.payload  ->  EncryptedPayload (JSON string)
//! EncryptedPayload       ->  JsonRpcRequest / JsonRpcResponse (after decrypt)
//! ```

use chrono::Utc;
use k256::elliptic_curve::rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Bridge message type for publishing to a topic.
pub const PUBLISH_TYPE: &str = "pub";

/// Bridge message type for subscribing to a topic.
pub const SUBSCRIBE_TYPE: &str = "sub";

/// JSON-RPC version carried by every WalletConnect 1.0 body.
pub const JSONRPC_VERSION: &str = "2.0";

/// Generic server error, used for rejections and failed operations.
pub const SERVER_ERROR: i64 = -32000;

/// The requested method is not handled by this wallet.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// The request parameters could not be interpreted.
pub const INVALID_PARAMS: i64 = -32602;

// =============================================================================
// Bridge Envelopes
// =============================================================================

/// Envelope exchanged with the bridge server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SocketMessage {
    pub topic: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub payload: String,
    #[serde(default)]
    pub silent: bool,
}

impl SocketMessage {
    /// Publish `payload` to `topic`.
    pub fn publish(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            message_type: PUBLISH_TYPE.to_string(),
            payload: payload.into(),
            silent: true,
        }
    }

    /// Register interest in `topic`. Sent silent, with no payload.
    pub fn subscribe(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            message_type: SUBSCRIBE_TYPE.to_string(),
            payload: String::new(),
            silent: true,
        }
    }
}

/// AES-CBC ciphertext with its HMAC tag and IV, all hex-encoded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncryptedPayload {
    pub data: String,
    pub hmac: String,
    pub iv: String,
}

// =============================================================================
// JSON-RPC
// =============================================================================

/// Inbound JSON-RPC body. `method` is absent when the dApp sends a response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    pub id: u64,
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            id,
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: Some(method.into()),
            params,
        }
    }
}

fn default_jsonrpc() -> String {
    JSONRPC_VERSION.to_string()
}

/// Successful JSON-RPC reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    pub id: u64,
    pub jsonrpc: String,
    pub result: Value,
}

impl JsonRpcResponse {
    pub fn new(id: u64, result: Value) -> Self {
        Self {
            id,
            jsonrpc: JSONRPC_VERSION.to_string(),
            result,
        }
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

/// Failed JSON-RPC reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcErrorResponse {
    pub id: u64,
    pub jsonrpc: String,
    pub error: JsonRpcError,
}

impl JsonRpcErrorResponse {
    pub fn new(id: u64, code: i64, message: impl Into<String>) -> Self {
        Self {
            id,
            jsonrpc: JSONRPC_VERSION.to_string(),
            error: JsonRpcError {
                code,
                message: message.into(),
            },
        }
    }
}

/// Generate a JSON-RPC id in the WalletConnect format:
/// milliseconds since the epoch, times 1000, plus three random digits.
pub fn payload_id() -> u64 {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let extra = u64::from(OsRng.next_u32() % 1000);
    millis * 1000 + extra
}

// =============================================================================
// Session Messages
// =============================================================================

/// Descriptive metadata of a peer (dApp or wallet).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeerMeta {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub icons: Vec<String>,
    #[serde(default)]
    pub name: String,
}

/// `wc_sessionRequest` parameters sent by the dApp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub peer_id: String,
    pub peer_meta: PeerMeta,
    #[serde(default)]
    pub chain_id: Option<u64>,
}

/// Wallet reply to an accepted `wc_sessionRequest`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequestResponse {
    pub peer_id: String,
    pub peer_meta: PeerMeta,
    pub approved: bool,
    pub chain_id: u64,
    pub accounts: Vec<String>,
}

/// `wc_sessionUpdate` parameters. A closing update carries nulls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    pub approved: bool,
    #[serde(default)]
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub network_id: Option<u64>,
    #[serde(default)]
    pub accounts: Option<Vec<String>>,
}

impl SessionUpdate {
    /// The update a wallet sends when it ends the session.
    pub fn closed() -> Self {
        Self {
            approved: false,
            chain_id: None,
            network_id: None,
            accounts: None,
        }
    }
}
