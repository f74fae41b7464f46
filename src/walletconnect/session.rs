// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Dispatch
//!
//! Decrypts bridge messages for one WalletConnect session, routes the
//! JSON-RPC requests they carry, and publishes encrypted replies to the dApp.
//!
//! ## Flow
//!
//! ```text
//! bridge text -> SocketMessage -> EncryptedPayload -> JsonRpcRequest
//!             -> handler -> (worker pool) approval -> sign / submit
//!             -> JsonRpcResponse | JsonRpcErrorResponse -> publish(peerId)
//! ```
//!
//! The session never touches the socket directly: frames go through an
//! unbounded channel drained by the transport's writer task. User approvals
//! run on the blocking pool so a slow user never stalls the reader.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use alloy::dyn_abi::TypedData;
use alloy::primitives::Address;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::approval::{
    ApprovalRequest, ApprovalType, DAppSessionClient, RequestDecision, SessionDecision,
    SessionProposal,
};
use super::crypto;
use super::messages::{
    payload_id, EncryptedPayload, JsonRpcErrorResponse, JsonRpcRequest, JsonRpcResponse,
    PeerMeta, SessionRequest, SessionRequestResponse, SessionUpdate, SocketMessage, PUBLISH_TYPE,
    SERVER_ERROR,
};
use super::uri::SessionDescription;
use crate::blockchain::{
    parse_typed_data, prepare_transaction, signature_hex, NetworkConfig, TransactionSubmitter,
    WalletSigner,
};
use crate::error::WalletConnectError;

/// Wallet capabilities shared by every session.
#[derive(Clone)]
pub struct WalletServices {
    pub network: NetworkConfig,
    pub signer: WalletSigner,
    /// `None` answers `eth_sendTransaction` with a server error.
    pub submitter: Option<Arc<dyn TransactionSubmitter>>,
}

/// Work to perform once the user approves a request.
enum PendingAction {
    SignTypedData(TypedData),
    SignMessage(Vec<u8>),
    SendTransaction(Value),
}

/// One WalletConnect session between this wallet and a dApp.
pub struct Session {
    description: SessionDescription,
    client_id: String,
    peer_id: Mutex<Option<String>>,
    /// Set once the user has accepted the dApp's session request.
    granted: AtomicBool,
    services: WalletServices,
    client: Arc<dyn DAppSessionClient>,
    outbound: mpsc::UnboundedSender<Message>,
    shutdown: CancellationToken,
}

impl Session {
    /// Create a session writing frames to `outbound`.
    pub fn new(
        description: SessionDescription,
        services: WalletServices,
        client: Arc<dyn DAppSessionClient>,
        outbound: mpsc::UnboundedSender<Message>,
    ) -> Arc<Self> {
        Arc::new(Self {
            description,
            client_id: Uuid::new_v4().to_string(),
            peer_id: Mutex::new(None),
            granted: AtomicBool::new(false),
            services,
            client,
            outbound,
            shutdown: CancellationToken::new(),
        })
    }

    /// Our own topic, announced to the dApp as `peerId`.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The dApp's topic, known once it has sent `wc_sessionRequest`.
    pub fn peer_id(&self) -> Option<String> {
        self.peer_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether the user has accepted the session.
    pub fn is_granted(&self) -> bool {
        self.granted.load(Ordering::Acquire)
    }

    pub fn description(&self) -> &SessionDescription {
        &self.description
    }

    /// Cancelled when the session ends, from either side.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Wait until the session has ended.
    pub async fn closed(&self) {
        self.shutdown.cancelled().await
    }

    /// Subscribe to `topic` on the bridge.
    pub fn subscribe(&self, topic: &str) {
        if let Err(e) = self.send_socket(&SocketMessage::subscribe(topic)) {
            warn!(topic = %topic, error = %e, "Failed to subscribe");
        } else {
            debug!(topic = %topic, "Subscribed");
        }
    }

    /// Handle one text frame received from the bridge.
    pub fn handle_text(self: &Arc<Self>, text: &str) {
        let request = match self.open(text) {
            Ok(Some(request)) => request,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "Dropping undecodable bridge message");
                return;
            }
        };

        let Some(method) = request.method.clone() else {
            debug!(request_id = request.id, "Ignoring JSON-RPC response from dApp");
            return;
        };

        debug!(request_id = request.id, method = %method, "Received dApp request");

        if let Err(e) = self.dispatch(request.id, &method, request.params) {
            warn!(
                request_id = request.id,
                method = %method,
                error = %e,
                "dApp request failed"
            );
            self.respond_error(request.id, e.rpc_code(), &e.to_string());
        }
    }

    /// End the session: tell the dApp, then close the socket.
    pub fn disconnect(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }

        if self.peer_id().is_some() {
            let sent = closing_update().and_then(|update| self.publish(&update));
            if let Err(e) = sent {
                warn!(error = %e, "Failed to notify dApp of disconnect");
            }
        }

        info!(topic = %self.description.topic(), "Disconnecting session");
        self.close();
    }

    /// Queue a normal close frame and stop the transport.
    fn close(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        };
        // The writer may already be gone if the bridge dropped us.
        let _ = self.outbound.send(Message::Close(Some(frame)));
        self.shutdown.cancel();
    }

    // -------------------------------------------------------------------------
    // Inbound
    // -------------------------------------------------------------------------

    fn open(&self, text: &str) -> Result<Option<JsonRpcRequest>, WalletConnectError> {
        let message: SocketMessage = serde_json::from_str(text)?;
        if message.message_type != PUBLISH_TYPE || message.payload.is_empty() {
            debug!(
                topic = %message.topic,
                message_type = %message.message_type,
                "Ignoring non-publish bridge message"
            );
            return Ok(None);
        }

        let payload: EncryptedPayload = serde_json::from_str(&message.payload)?;
        let plaintext = crypto::recover(self.description.key(), &payload)?;
        Ok(Some(serde_json::from_str(&plaintext)?))
    }

    fn dispatch(
        self: &Arc<Self>,
        id: u64,
        method: &str,
        params: Vec<Value>,
    ) -> Result<(), WalletConnectError> {
        match method {
            "wc_sessionRequest" => return self.handle_session_request(id, params),
            "wc_sessionUpdate" => return self.handle_session_update(params),
            _ => {}
        }

        if !self.is_granted() {
            return Err(WalletConnectError::NotGranted);
        }

        match method {
            "eth_signTypedData" | "eth_signTypedData_v4" => self.handle_sign_typed_data(id, params),
            "eth_sign" => self.handle_sign(id, params, 1, 0),
            "personal_sign" => self.handle_sign(id, params, 0, 1),
            "eth_sendTransaction" => self.handle_send_transaction(id, params),
            other => Err(WalletConnectError::MethodNotFound(other.to_string())),
        }
    }

    fn handle_session_request(
        self: &Arc<Self>,
        id: u64,
        params: Vec<Value>,
    ) -> Result<(), WalletConnectError> {
        if params.len() > 1 {
            return Err(WalletConnectError::invalid_params(
                "wc_sessionRequest takes a single parameter",
            ));
        }
        let first = params
            .into_iter()
            .next()
            .ok_or_else(|| WalletConnectError::invalid_params("missing session request"))?;
        let request: SessionRequest = serde_json::from_value(first)?;

        *self.peer_id.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(request.peer_id.clone());

        info!(
            dapp = %request.peer_meta.name,
            peer_id = %request.peer_id,
            "Session requested"
        );

        let proposal = SessionProposal {
            bridge_url: self.description.bridge().to_string(),
            peer_meta: request.peer_meta.clone(),
            chain_id: request.chain_id,
        };

        let session = Arc::clone(self);
        tokio::spawn(async move {
            let client = Arc::clone(&session.client);
            let decision =
                tokio::task::spawn_blocking(move || client.grant_session(&proposal)).await;

            match decision {
                Ok(SessionDecision::Accept {
                    accounts,
                    wallet_meta,
                }) => session.accept_session(id, request, accounts, wallet_meta).await,
                Ok(SessionDecision::Reject) => {
                    info!(dapp = %request.peer_meta.name, "Session rejected");
                    session.reject_session(id);
                }
                Err(e) => {
                    warn!(error = %e, "Session approval task failed");
                    session.reject_session(id);
                }
            }
        });

        Ok(())
    }

    /// Answer the dApp, then forget it so nothing more is published to it.
    fn reject_session(&self, id: u64) {
        self.respond_error(id, SERVER_ERROR, "Session Rejected");
        if !self.is_granted() {
            *self.peer_id.lock().unwrap_or_else(PoisonError::into_inner) = None;
        }
    }

    async fn accept_session(
        &self,
        id: u64,
        request: SessionRequest,
        accounts: Vec<String>,
        wallet_meta: PeerMeta,
    ) {
        self.granted.store(true, Ordering::Release);
        let response = SessionRequestResponse {
            peer_id: self.client_id.clone(),
            peer_meta: wallet_meta,
            approved: true,
            chain_id: self.services.network.chain_id,
            accounts,
        };
        self.respond(id, &response);
        self.subscribe(&self.client_id);

        info!(
            dapp = %request.peer_meta.name,
            client_id = %self.client_id,
            "Session started"
        );

        let client = Arc::clone(&self.client);
        let topic = self.description.topic().to_string();
        let client_id = self.client_id.clone();
        let started = tokio::task::spawn_blocking(move || {
            client.session_started(
                &request.peer_meta.name,
                &topic,
                &client_id,
                &request.peer_id,
            )
        })
        .await;
        if let Err(e) = started {
            warn!(error = %e, "session_started callback failed");
        }
    }

    fn handle_session_update(self: &Arc<Self>, params: Vec<Value>) -> Result<(), WalletConnectError> {
        let first = params
            .into_iter()
            .next()
            .ok_or_else(|| WalletConnectError::invalid_params("missing session update"))?;
        let update: SessionUpdate = serde_json::from_value(first)?;

        if update.approved {
            debug!(chain_id = ?update.chain_id, "dApp updated the session");
            return Ok(());
        }

        info!(topic = %self.description.topic(), "dApp closed the session");

        let session = Arc::clone(self);
        tokio::spawn(async move {
            let client = Arc::clone(&session.client);
            let notified =
                tokio::task::spawn_blocking(move || client.session_closed("Closed by dApp")).await;
            if let Err(e) = notified {
                warn!(error = %e, "session_closed callback failed");
            }
            session.close();
        });

        Ok(())
    }

    fn handle_sign_typed_data(
        self: &Arc<Self>,
        id: u64,
        params: Vec<Value>,
    ) -> Result<(), WalletConnectError> {
        let address = string_param(&params, 0, "address")?;
        self.check_account(&address)?;
        let raw = params
            .get(1)
            .ok_or_else(|| WalletConnectError::invalid_params("missing typed data parameter"))?;
        let typed_data = parse_typed_data(raw)?;

        let display = match raw {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        let details = BTreeMap::from([
            ("address".to_string(), address),
            ("typedData".to_string(), display),
        ]);

        self.request_approval(
            id,
            ApprovalType::TypedData,
            details,
            PendingAction::SignTypedData(typed_data),
        );
        Ok(())
    }

    /// `eth_sign` and `personal_sign` differ only in parameter order.
    fn handle_sign(
        self: &Arc<Self>,
        id: u64,
        params: Vec<Value>,
        message_index: usize,
        address_index: usize,
    ) -> Result<(), WalletConnectError> {
        let address = string_param(&params, address_index, "address")?;
        self.check_account(&address)?;
        let message_hex = string_param(&params, message_index, "message")?;
        let message = alloy::hex::decode(&message_hex).map_err(|e| {
            WalletConnectError::invalid_params(format!("message is not hex: {}", e))
        })?;

        let details = BTreeMap::from([
            ("address".to_string(), address),
            ("message".to_string(), message_hex),
        ]);

        self.request_approval(
            id,
            ApprovalType::OpaqueData,
            details,
            PendingAction::SignMessage(message),
        );
        Ok(())
    }

    fn handle_send_transaction(
        self: &Arc<Self>,
        id: u64,
        params: Vec<Value>,
    ) -> Result<(), WalletConnectError> {
        let transaction = params
            .into_iter()
            .next()
            .filter(Value::is_object)
            .ok_or_else(|| WalletConnectError::invalid_params("expected a transaction object"))?;
        prepare_transaction(
            &transaction,
            self.services.signer.address(),
            self.services.network.chain_id,
        )?;

        let details = BTreeMap::from([("transaction".to_string(), transaction.to_string())]);

        self.request_approval(
            id,
            ApprovalType::SendingTransaction,
            details,
            PendingAction::SendTransaction(transaction),
        );
        Ok(())
    }

    /// Signing requests must name the wallet's own account.
    fn check_account(&self, requested: &str) -> Result<(), WalletConnectError> {
        let address: Address = requested.parse().map_err(|e| {
            WalletConnectError::invalid_params(format!("invalid address '{}': {}", requested, e))
        })?;
        let wallet = self.services.signer.address();
        if address != wallet {
            return Err(WalletConnectError::AccountMismatch {
                requested: address.to_checksum(None),
                wallet: wallet.to_checksum(None),
            });
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Approval
    // -------------------------------------------------------------------------

    fn request_approval(
        self: &Arc<Self>,
        id: u64,
        approval_type: ApprovalType,
        details: BTreeMap<String, String>,
        action: PendingAction,
    ) {
        let request = ApprovalRequest {
            request_id: id,
            approval_type,
            details,
        };

        let session = Arc::clone(self);
        tokio::spawn(async move {
            let client = Arc::clone(&session.client);
            let decision =
                tokio::task::spawn_blocking(move || client.approve_request(&request)).await;

            let outcome = match decision {
                Ok(RequestDecision::Approve) => session.perform(action).await,
                Ok(RequestDecision::Reject) => Err(WalletConnectError::Rejected),
                Err(e) => Err(WalletConnectError::Approval(e.to_string())),
            };

            match outcome {
                Ok(result) => session.respond(id, &result),
                Err(e) => {
                    info!(request_id = id, approval = %approval_type, error = %e, "Request not fulfilled");
                    session.respond_error(id, e.rpc_code(), &e.to_string());
                }
            }
        });
    }

    async fn perform(&self, action: PendingAction) -> Result<Value, WalletConnectError> {
        let signer = &self.services.signer;
        match action {
            PendingAction::SignTypedData(typed_data) => {
                let (digest, signature) = signer.sign_typed_data(&typed_data)?;
                debug!(digest = %digest, "Signed typed data");
                Ok(Value::String(signature_hex(&signature)))
            }
            PendingAction::SignMessage(message) => {
                let signature = signer.sign_message(&message)?;
                debug!(len = message.len(), "Signed message");
                Ok(Value::String(signature_hex(&signature)))
            }
            PendingAction::SendTransaction(transaction) => {
                let submitter = self
                    .services
                    .submitter
                    .as_ref()
                    .ok_or(WalletConnectError::SubmissionUnavailable)?;
                let sent = submitter.submit(&transaction).await?;
                info!(
                    tx_hash = %sent.tx_hash,
                    explorer = %sent.explorer_url,
                    "dApp transaction sent"
                );
                Ok(Value::String(sent.tx_hash))
            }
        }
    }

    // -------------------------------------------------------------------------
    // Outbound
    // -------------------------------------------------------------------------

    fn respond<T: Serialize>(&self, id: u64, result: &T) {
        let sent = serde_json::to_value(result)
            .map_err(WalletConnectError::from)
            .and_then(|value| self.publish(&JsonRpcResponse::new(id, value)));
        if let Err(e) = sent {
            warn!(request_id = id, error = %e, "Failed to send response");
        }
    }

    fn respond_error(&self, id: u64, code: i64, message: &str) {
        if let Err(e) = self.publish(&JsonRpcErrorResponse::new(id, code, message)) {
            warn!(request_id = id, error = %e, "Failed to send error response");
        }
    }

    /// Encrypt `body` and publish it to the dApp's topic.
    fn publish<T: Serialize>(&self, body: &T) -> Result<(), WalletConnectError> {
        let peer_id = self.peer_id().ok_or(WalletConnectError::NoPeer)?;
        let plaintext = serde_json::to_string(body)?;
        let payload = crypto::construct(self.description.key(), &plaintext);
        let message = SocketMessage::publish(peer_id, serde_json::to_string(&payload)?);
        self.send_socket(&message)
    }

    fn send_socket(&self, message: &SocketMessage) -> Result<(), WalletConnectError> {
        let text = serde_json::to_string(message)?;
        self.outbound
            .send(Message::Text(text.into()))
            .map_err(|_| WalletConnectError::ConnectionClosed)
    }
}

fn closing_update() -> Result<JsonRpcRequest, WalletConnectError> {
    let params = serde_json::to_value(SessionUpdate::closed())?;
    Ok(JsonRpcRequest::new(
        payload_id(),
        "wc_sessionUpdate",
        vec![params],
    ))
}

fn string_param(params: &[Value], index: usize, name: &str) -> Result<String, WalletConnectError> {
    params
        .get(index)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| WalletConnectError::invalid_params(format!("missing {} parameter", name)))
}
