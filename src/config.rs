// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `WC_URI` | WalletConnect pairing URI (`wc:{topic}@1?bridge=..&key=..`) | Required |
//! | `WC_MAINNET` | Use Ethereum mainnet (chain 1) instead of Ropsten (chain 3) | `false` |
//! | `WC_RPC_URL` | Ethereum JSON-RPC endpoint for `eth_sendTransaction` | Unset (submission disabled) |
//! | `WC_PRIVATE_KEY_PEM_PATH` | PEM-encoded secp256k1 private key file | One key source required |
//! | `WC_PRIVATE_KEY` | Hex private key | |
//! | `WC_MNEMONIC` | BIP-39 phrase (first account) | |
//! | `WC_AUTO_APPROVE` | Approve every session and request without prompting | `false` |
//! | `WC_WALLET_NAME` | Wallet name shown to dApps | `Relational Wallet` |
//! | `WC_WALLET_URL` | Wallet URL shown to dApps | `https://relational.network` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |
//!
//! When several key sources are set, the PEM file wins, then the hex key,
//! then the mnemonic.

use std::path::PathBuf;

use crate::blockchain::{network_for, ChainError, NetworkConfig, WalletSigner};
use crate::walletconnect::uri::{SessionDescription, UriError};
use crate::walletconnect::PeerMeta;

pub const WC_URI_ENV: &str = "WC_URI";
pub const WC_MAINNET_ENV: &str = "WC_MAINNET";
pub const WC_RPC_URL_ENV: &str = "WC_RPC_URL";
pub const WC_PRIVATE_KEY_PEM_PATH_ENV: &str = "WC_PRIVATE_KEY_PEM_PATH";
pub const WC_PRIVATE_KEY_ENV: &str = "WC_PRIVATE_KEY";
pub const WC_MNEMONIC_ENV: &str = "WC_MNEMONIC";
pub const WC_AUTO_APPROVE_ENV: &str = "WC_AUTO_APPROVE";
pub const WC_WALLET_NAME_ENV: &str = "WC_WALLET_NAME";
pub const WC_WALLET_URL_ENV: &str = "WC_WALLET_URL";

pub const DEFAULT_WALLET_NAME: &str = "Relational Wallet";
pub const DEFAULT_WALLET_URL: &str = "https://relational.network";

/// Configuration errors surfaced at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("No wallet key configured: set WC_PRIVATE_KEY_PEM_PATH, WC_PRIVATE_KEY or WC_MNEMONIC")]
    NoKeySource,

    #[error("Failed to read key file {path}: {source}")]
    KeyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Uri(#[from] UriError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Where the wallet key comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum KeySource {
    PemFile(PathBuf),
    Hex(String),
    Mnemonic(String),
}

impl KeySource {
    /// Load the key and build the signer.
    pub fn load_signer(&self) -> Result<WalletSigner, ConfigError> {
        let signer = match self {
            KeySource::PemFile(path) => {
                let pem = std::fs::read(path).map_err(|source| ConfigError::KeyFile {
                    path: path.display().to_string(),
                    source,
                })?;
                WalletSigner::from_pem(&pem)?
            }
            KeySource::Hex(key) => WalletSigner::from_hex(key)?,
            KeySource::Mnemonic(phrase) => WalletSigner::from_mnemonic(phrase)?,
        };
        Ok(signer)
    }
}

impl std::fmt::Debug for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::PemFile(path) => f.debug_tuple("PemFile").field(path).finish(),
            KeySource::Hex(_) => f.write_str("Hex(<redacted>)"),
            KeySource::Mnemonic(_) => f.write_str("Mnemonic(<redacted>)"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub session: SessionDescription,
    pub network: NetworkConfig,
    pub rpc_url: Option<String>,
    pub key_source: KeySource,
    pub auto_approve: bool,
    pub wallet_meta: PeerMeta,
}

impl AppConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let uri = get(WC_URI_ENV).ok_or(ConfigError::Missing(WC_URI_ENV))?;
        let session = SessionDescription::parse(&uri)?;

        let is_mainnet = parse_bool(WC_MAINNET_ENV, get(WC_MAINNET_ENV))?;
        let auto_approve = parse_bool(WC_AUTO_APPROVE_ENV, get(WC_AUTO_APPROVE_ENV))?;

        let key_source = if let Some(path) = get(WC_PRIVATE_KEY_PEM_PATH_ENV) {
            KeySource::PemFile(PathBuf::from(path))
        } else if let Some(key) = get(WC_PRIVATE_KEY_ENV) {
            KeySource::Hex(key)
        } else if let Some(phrase) = get(WC_MNEMONIC_ENV) {
            KeySource::Mnemonic(phrase)
        } else {
            return Err(ConfigError::NoKeySource);
        };

        let wallet_meta = PeerMeta {
            name: get(WC_WALLET_NAME_ENV).unwrap_or_else(|| DEFAULT_WALLET_NAME.to_string()),
            url: get(WC_WALLET_URL_ENV).unwrap_or_else(|| DEFAULT_WALLET_URL.to_string()),
            ..PeerMeta::default()
        };

        Ok(Self {
            session,
            network: network_for(is_mainnet),
            rpc_url: get(WC_RPC_URL_ENV),
            key_source,
            auto_approve,
            wallet_meta,
        })
    }
}

fn parse_bool(name: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    let Some(value) = value else {
        return Ok(false);
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            name,
            reason: format!("expected a boolean, got '{}'", other),
        }),
    }
}
