// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction submission for `eth_sendTransaction`.
//!
//! dApps hand the wallet an unsigned transaction object. The submitter fills
//! missing gas/nonce/chain fields through the provider, signs with the
//! wallet key and broadcasts.

use alloy::{
    primitives::Address,
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
};
use async_trait::async_trait;
use serde_json::Value;

use super::signing::WalletSigner;
use super::types::{ChainError, NetworkConfig, SendResult};

/// Something that can submit a dApp-provided transaction object.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    async fn submit(&self, transaction: &Value) -> Result<SendResult, ChainError>;
}

/// Submits transactions through an Ethereum JSON-RPC endpoint.
pub struct RpcSubmitter {
    network: NetworkConfig,
    sender: Address,
    provider: DynProvider,
}

impl RpcSubmitter {
    /// Create a submitter signing with `signer` and broadcasting to `rpc_url`.
    pub fn new(
        network: NetworkConfig,
        rpc_url: &str,
        signer: &WalletSigner,
    ) -> Result<Self, ChainError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidRpcUrl(e.to_string()))?;

        let provider = ProviderBuilder::new()
            .wallet(signer.wallet())
            .connect_http(url)
            .erased();

        Ok(Self {
            network,
            sender: signer.address(),
            provider,
        })
    }
}

#[async_trait]
impl TransactionSubmitter for RpcSubmitter {
    async fn submit(&self, transaction: &Value) -> Result<SendResult, ChainError> {
        let tx = prepare_transaction(transaction, self.sender, self.network.chain_id)?;

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| ChainError::TransactionFailed(format!("Failed to send: {}", e)))?;

        let tx_hash = format!("{:?}", pending.tx_hash());
        let explorer_url = format!("{}/tx/{}", self.network.explorer_url, tx_hash);

        tracing::info!(
            network = %self.network.name,
            tx_hash = %tx_hash,
            "Submitted dApp transaction"
        );

        Ok(SendResult {
            tx_hash,
            explorer_url,
        })
    }
}

/// Decode a WalletConnect transaction object.
///
/// Some dApps send `gasLimit` instead of `gas`; it is accepted as an alias.
pub fn parse_transaction_request(value: &Value) -> Result<TransactionRequest, ChainError> {
    let Value::Object(fields) = value else {
        return Err(ChainError::InvalidTransaction(
            "expected a transaction object".to_string(),
        ));
    };

    let mut fields = fields.clone();
    if !fields.contains_key("gas") {
        if let Some(limit) = fields.remove("gasLimit") {
            fields.insert("gas".to_string(), limit);
        }
    }

    serde_json::from_value(Value::Object(fields))
        .map_err(|e| ChainError::InvalidTransaction(e.to_string()))
}

/// Decode a dApp transaction and pin it to the wallet's account and the
/// configured chain, so the provider never fills the chain id from the node.
pub fn prepare_transaction(
    value: &Value,
    sender: Address,
    chain_id: u64,
) -> Result<TransactionRequest, ChainError> {
    let mut tx = parse_transaction_request(value)?;
    check_sender(&tx, sender)?;

    if let Some(requested) = tx.chain_id {
        if requested != chain_id {
            return Err(ChainError::InvalidTransaction(format!(
                "chain id {} does not match the session chain {}",
                requested, chain_id
            )));
        }
    }

    tx.from = Some(sender);
    tx.chain_id = Some(chain_id);
    Ok(tx)
}

/// A transaction naming a different sender than the wallet is refused.
fn check_sender(tx: &TransactionRequest, wallet: Address) -> Result<(), ChainError> {
    match tx.from {
        Some(from) if from != wallet => Err(ChainError::SenderMismatch {
            expected: wallet.to_checksum(None),
            actual: from.to_checksum(None),
        }),
        _ => Ok(()),
    }
}
