// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

/// Ethereum network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Chain ID reported to dApps
    pub chain_id: u64,
    /// Block explorer URL
    pub explorer_url: &'static str,
}

/// Ethereum Mainnet configuration.
pub const ETHEREUM_MAINNET: NetworkConfig = NetworkConfig {
    name: "Ethereum Mainnet",
    chain_id: 1,
    explorer_url: "https://etherscan.io",
};

/// Ropsten testnet configuration.
pub const ETHEREUM_ROPSTEN: NetworkConfig = NetworkConfig {
    name: "Ropsten Testnet",
    chain_id: 3,
    explorer_url: "https://ropsten.etherscan.io",
};

/// WalletConnect 1.0 is Ethereum only: mainnet or the test network.
pub fn network_for(is_mainnet: bool) -> NetworkConfig {
    if is_mainnet {
        ETHEREUM_MAINNET
    } else {
        ETHEREUM_ROPSTEN
    }
}

/// Result of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResult {
    /// Transaction hash (0x-prefixed)
    pub tx_hash: String,
    /// Explorer URL for the transaction
    pub explorer_url: String,
}

/// Errors that can occur during signing or submission.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid typed data: {0}")]
    InvalidTypedData(String),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Transaction sender {actual} does not match wallet {expected}")]
    SenderMismatch { expected: String, actual: String },

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
}
