// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use crate::blockchain::ChainError;
use crate::walletconnect::crypto::PayloadError;
use crate::walletconnect::messages::{INVALID_PARAMS, METHOD_NOT_FOUND, SERVER_ERROR};

/// Errors raised while handling a WalletConnect session.
///
/// Errors that occur once a request id is known are returned to the dApp
/// as JSON-RPC errors; see [`WalletConnectError::rpc_code`].
#[derive(Debug, thiserror::Error)]
pub enum WalletConnectError {
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Unsupported method: {0}")]
    MethodNotFound(String),

    #[error("Failed or Rejected Request")]
    Rejected,

    #[error("Session not approved")]
    NotGranted,

    #[error("Account {requested} is not managed by this wallet ({wallet})")]
    AccountMismatch { requested: String, wallet: String },

    #[error("Transaction submission is not configured")]
    SubmissionUnavailable,

    #[error("No dApp peer for this session yet")]
    NoPeer,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Approval task failed: {0}")]
    Approval(String),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WalletConnectError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams(message.into())
    }

    /// JSON-RPC error code reported to the dApp.
    pub fn rpc_code(&self) -> i64 {
        match self {
            WalletConnectError::InvalidParams(_)
            | WalletConnectError::Chain(ChainError::InvalidTypedData(_))
            | WalletConnectError::Chain(ChainError::InvalidTransaction(_)) => INVALID_PARAMS,
            WalletConnectError::MethodNotFound(_) => METHOD_NOT_FOUND,
            _ => SERVER_ERROR,
        }
    }
}
