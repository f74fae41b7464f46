// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # WalletConnect 1.0 Wallet Client
//!
//! Joins a dApp's session through a bridge server, decrypts its JSON-RPC
//! requests, asks the user for approval and answers with signatures or
//! transaction hashes.
//!
//! ## Modules
//!
//! - [`uri`]: `wc:` pairing URI parsing
//! - [`crypto`]: AES-256-CBC payload encryption with HMAC-SHA256
//! - [`messages`]: bridge envelopes and JSON-RPC bodies
//! - [`approval`]: callbacks into the wallet application
//! - [`session`]: request dispatch for one session
//! - [`client`]: WebSocket transport

pub mod approval;
pub mod client;
pub mod crypto;
pub mod messages;
pub mod session;
pub mod uri;

pub use approval::{
    ApprovalRequest, ApprovalType, DAppSessionClient, RequestDecision, SessionDecision,
    SessionProposal,
};
pub use client::{SessionHandle, WalletConnect};
pub use messages::PeerMeta;
pub use session::{Session, WalletServices};
pub use uri::SessionDescription;
