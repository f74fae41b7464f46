// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ethereum integration for dApp requests.
//!
//! This module provides functionality for:
//! - Loading the wallet key (PEM, hex, mnemonic)
//! - Personal-message and EIP-712 signing
//! - Submitting dApp transactions

pub mod signing;
pub mod transactions;
pub mod types;

pub use signing::{parse_typed_data, signature_hex, WalletSigner};
pub use transactions::{prepare_transaction, RpcSubmitter, TransactionSubmitter};
pub use types::*;
