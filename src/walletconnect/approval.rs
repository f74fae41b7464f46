// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User-approval callbacks for session grants and signing requests.
//!
//! Callbacks are invoked on the blocking worker pool, never on the transport
//! task. Each inbound request produces exactly one callback, and the callback
//! returns its decision by value, so a request is answered at most once.

use std::collections::BTreeMap;

use super::messages::PeerMeta;

/// Kind of request the user is asked to approve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApprovalType {
    TypedData,
    OpaqueData,
    SendingTransaction,
}

impl std::fmt::Display for ApprovalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ApprovalType::TypedData => "Approval to sign 'Typed Data'",
            ApprovalType::OpaqueData => "Approval to sign data",
            ApprovalType::SendingTransaction => "Approval to sign and submit transaction",
        };
        f.write_str(text)
    }
}

/// A dApp asking to open a session.
#[derive(Debug, Clone)]
pub struct SessionProposal {
    /// Bridge the session runs over.
    pub bridge_url: String,
    /// The dApp's own description of itself.
    pub peer_meta: PeerMeta,
    /// Chain the dApp asked for, if any.
    pub chain_id: Option<u64>,
}

/// User's answer to a [`SessionProposal`].
#[derive(Debug, Clone)]
pub enum SessionDecision {
    Accept {
        /// Accounts exposed to the dApp.
        accounts: Vec<String>,
        /// How the wallet presents itself.
        wallet_meta: PeerMeta,
    },
    Reject,
}

/// A signing or submission request awaiting the user.
#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    pub request_id: u64,
    pub approval_type: ApprovalType,
    /// Request details for display, e.g. `address`, `message`, `typedData`.
    pub details: BTreeMap<String, String>,
}

/// User's answer to an [`ApprovalRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDecision {
    Approve,
    Reject,
}

/// The wallet application's side of a WalletConnect session.
///
/// Implementations may block (e.g. waiting on user input).
pub trait DAppSessionClient: Send + Sync + 'static {
    /// Session accepted and the wallet is subscribed for dApp requests.
    fn session_started(&self, dapp_name: &str, topic: &str, client_id: &str, peer_id: &str);

    /// The session could not be established or failed at the transport level.
    fn session_error(&self, reason: &str);

    /// The dApp ended the session.
    fn session_closed(&self, _reason: &str) {}

    /// Ask the user whether to open a session with this dApp.
    fn grant_session(&self, proposal: &SessionProposal) -> SessionDecision;

    /// Ask the user whether to perform a request.
    fn approve_request(&self, request: &ApprovalRequest) -> RequestDecision;
}
