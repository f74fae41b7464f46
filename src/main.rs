// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;
use std::sync::Arc;

use relational_walletconnect::blockchain::{RpcSubmitter, TransactionSubmitter};
use relational_walletconnect::config::AppConfig;
use relational_walletconnect::console::ConsoleApprover;
use relational_walletconnect::logging;
use relational_walletconnect::walletconnect::WalletConnect;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    logging::init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::from(2);
        }
    };

    let signer = match config.key_source.load_signer() {
        Ok(signer) => signer,
        Err(e) => {
            error!(error = %e, "Failed to load wallet key");
            return ExitCode::from(2);
        }
    };

    let submitter: Option<Arc<dyn TransactionSubmitter>> = match &config.rpc_url {
        Some(rpc_url) => match RpcSubmitter::new(config.network.clone(), rpc_url, &signer) {
            Ok(submitter) => Some(Arc::new(submitter) as Arc<dyn TransactionSubmitter>),
            Err(e) => {
                error!(error = %e, "Failed to configure transaction submission");
                return ExitCode::from(2);
            }
        },
        None => {
            warn!("WC_RPC_URL not set, eth_sendTransaction requests will be refused");
            None
        }
    };

    info!(
        address = %signer.address_string(),
        network = %config.network.name,
        chain_id = config.network.chain_id,
        auto_approve = config.auto_approve,
        "Wallet loaded"
    );

    let approver = Arc::new(ConsoleApprover::stdio(
        config.auto_approve,
        vec![signer.address_string()],
        config.wallet_meta.clone(),
    ));
    let wallet = WalletConnect::new(config.network.clone(), signer, submitter);

    let handle = match wallet.connect(config.session.clone(), approver).await {
        Ok(handle) => handle,
        Err(e) => {
            error!(error = %e, "Could not join the WalletConnect session");
            return ExitCode::FAILURE;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, disconnecting");
        }
        _ = handle.closed() => {
            info!("Session ended");
            return ExitCode::SUCCESS;
        }
    }

    handle.disconnect().await;
    ExitCode::SUCCESS
}
