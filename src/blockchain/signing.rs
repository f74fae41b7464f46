// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Message and typed-data signing for dApp requests.
//!
//! This module converts the configured key material (PEM file, raw hex key
//! or BIP-39 phrase) into a local signer and produces the signatures
//! WalletConnect methods return: EIP-191 personal messages for `eth_sign`
//! and `personal_sign`, EIP-712 digests for `eth_signTypedData`.

use alloy::{
    dyn_abi::TypedData,
    network::EthereumWallet,
    primitives::{Address, B256},
    signers::{
        local::{coins_bip39::English, MnemonicBuilder, PrivateKeySigner},
        Signature, SignerSync,
    },
};
use k256::SecretKey;
use serde_json::Value;

use super::types::ChainError;

/// Local secp256k1 signer for the wallet's single account.
#[derive(Debug, Clone)]
pub struct WalletSigner {
    signer: PrivateKeySigner,
}

impl WalletSigner {
    /// Create a signer from a PEM-encoded private key (SEC1 or PKCS#8).
    pub fn from_pem(pem_bytes: &[u8]) -> Result<Self, ChainError> {
        let pem_str = std::str::from_utf8(pem_bytes)
            .map_err(|e| ChainError::InvalidPrivateKey(format!("Invalid UTF-8: {}", e)))?;

        let pem = pem::parse(pem_str)
            .map_err(|e| ChainError::InvalidPrivateKey(format!("Invalid PEM: {}", e)))?;

        let secret_key = SecretKey::from_sec1_der(pem.contents())
            .or_else(|_| parse_pkcs8_to_secret_key(pem.contents()))
            .map_err(|e| ChainError::InvalidPrivateKey(format!("Invalid key format: {}", e)))?;

        Self::from_slice(&secret_key.to_bytes())
    }

    /// Create a signer from a hex private key (with or without 0x prefix).
    pub fn from_hex(private_key_hex: &str) -> Result<Self, ChainError> {
        let key_bytes = alloy::hex::decode(private_key_hex.trim())
            .map_err(|e| ChainError::InvalidPrivateKey(e.to_string()))?;
        Self::from_slice(&key_bytes)
    }

    /// Derive the first account (`m/44'/60'/0'/0/0`) from a BIP-39 phrase.
    pub fn from_mnemonic(phrase: &str) -> Result<Self, ChainError> {
        let signer = MnemonicBuilder::<English>::default()
            .phrase(phrase.trim())
            .index(0u32)
            .map_err(|e| ChainError::InvalidMnemonic(e.to_string()))?
            .build()
            .map_err(|e| ChainError::InvalidMnemonic(e.to_string()))?;
        Ok(Self { signer })
    }

    fn from_slice(key_bytes: &[u8]) -> Result<Self, ChainError> {
        let signer = PrivateKeySigner::from_slice(key_bytes)
            .map_err(|e| ChainError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self { signer })
    }

    /// The account address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// EIP-55 checksummed account address, as exposed to dApps.
    pub fn address_string(&self) -> String {
        self.address().to_checksum(None)
    }

    /// Sign `message` with the EIP-191 personal-message prefix.
    pub fn sign_message(&self, message: &[u8]) -> Result<Signature, ChainError> {
        self.signer
            .sign_message_sync(message)
            .map_err(|e| ChainError::Signing(e.to_string()))
    }

    /// Sign EIP-712 typed data. Returns the signing digest with the signature.
    pub fn sign_typed_data(&self, typed_data: &TypedData) -> Result<(B256, Signature), ChainError> {
        let digest = typed_data
            .eip712_signing_hash()
            .map_err(|e| ChainError::InvalidTypedData(e.to_string()))?;
        let signature = self
            .signer
            .sign_hash_sync(&digest)
            .map_err(|e| ChainError::Signing(e.to_string()))?;
        Ok((digest, signature))
    }

    /// Wallet for transaction signing through a provider.
    pub fn wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}

/// Parse PKCS#8 DER to extract the secret key.
fn parse_pkcs8_to_secret_key(der: &[u8]) -> Result<SecretKey, String> {
    use k256::pkcs8::DecodePrivateKey;
    SecretKey::from_pkcs8_der(der).map_err(|e| e.to_string())
}

/// Typed data as sent by dApps: either a JSON object or a JSON string.
pub fn parse_typed_data(value: &Value) -> Result<TypedData, ChainError> {
    let parsed = match value {
        Value::String(raw) => serde_json::from_str(raw),
        other => serde_json::from_value(other.clone()),
    };
    parsed.map_err(|e| ChainError::InvalidTypedData(e.to_string()))
}

/// 65-byte `r || s || v` signature as 0x-prefixed hex.
pub fn signature_hex(signature: &Signature) -> String {
    format!("0x{}", alloy::hex::encode(signature.as_bytes()))
}
