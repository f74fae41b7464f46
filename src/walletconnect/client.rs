// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! WebSocket transport to a WalletConnect bridge.
//!
//! One connection per session. A writer task drains the session's outbound
//! channel into the socket and a reader task feeds text frames to
//! [`Session::handle_text`]. Either task ending cancels the session token,
//! which stops the other. There is no reconnect.

use std::fmt::Display;
use std::sync::Arc;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::approval::DAppSessionClient;
use super::session::{Session, WalletServices};
use super::uri::SessionDescription;
use crate::blockchain::{NetworkConfig, TransactionSubmitter, WalletSigner};
use crate::error::WalletConnectError;

/// Wallet-side WalletConnect client.
#[derive(Clone)]
pub struct WalletConnect {
    services: WalletServices,
}

impl WalletConnect {
    pub fn new(
        network: NetworkConfig,
        signer: WalletSigner,
        submitter: Option<Arc<dyn TransactionSubmitter>>,
    ) -> Self {
        Self {
            services: WalletServices {
                network,
                signer,
                submitter,
            },
        }
    }

    /// Connect to the session's bridge and subscribe to its topic.
    ///
    /// On failure the client's `session_error` is invoked before the error
    /// is returned.
    pub async fn connect(
        &self,
        description: SessionDescription,
        client: Arc<dyn DAppSessionClient>,
    ) -> Result<SessionHandle, WalletConnectError> {
        let url = description.websocket_url();
        info!(
            bridge = %url,
            topic = %description.topic(),
            chain_id = self.services.network.chain_id,
            "Connecting to WalletConnect bridge"
        );

        let stream = match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok((stream, _response)) => stream,
            Err(e) => {
                let reason = format!("Failed to connect to bridge: {}", e);
                warn!(bridge = %url, error = %e, "Bridge connection failed");
                notify_error(&client, reason.clone()).await;
                return Err(WalletConnectError::Transport(reason));
            }
        };

        let (sink, source) = stream.split();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let session = Session::new(
            description,
            self.services.clone(),
            Arc::clone(&client),
            outbound_tx,
        );

        let writer = tokio::spawn(write_loop(sink, outbound_rx, session.shutdown_token()));
        let reader = tokio::spawn(read_loop(source, Arc::clone(&session), client));

        session.subscribe(session.description().topic());

        Ok(SessionHandle {
            session,
            writer,
            reader,
        })
    }
}

/// A live session and its transport tasks.
pub struct SessionHandle {
    session: Arc<Session>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl SessionHandle {
    /// Wait until the session ends from either side.
    pub async fn closed(&self) {
        self.session.closed().await
    }

    /// Send the closing session update, close the socket and wait for the
    /// transport tasks to finish.
    pub async fn disconnect(self) {
        self.session.disconnect();
        if let Err(e) = self.writer.await {
            warn!(error = %e, "Writer task failed");
        }
        if let Err(e) = self.reader.await {
            warn!(error = %e, "Reader task failed");
        }
    }
}

async fn notify_error(client: &Arc<dyn DAppSessionClient>, reason: String) {
    let client = Arc::clone(client);
    if let Err(e) = tokio::task::spawn_blocking(move || client.session_error(&reason)).await {
        warn!(error = %e, "session_error callback failed");
    }
}

async fn write_loop<S>(
    mut sink: S,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    shutdown: CancellationToken,
) where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    loop {
        // Queued frames go out before shutdown is observed, so a close frame
        // queued just before cancellation is still sent.
        let next = tokio::select! {
            biased;
            message = outbound.recv() => message,
            _ = shutdown.cancelled() => None,
        };
        let Some(message) = next else {
            break;
        };

        let closing = message.is_close();
        if let Err(e) = sink.send(message).await {
            warn!(error = %e, "Bridge write failed");
            break;
        }
        if closing {
            debug!("Close frame sent");
            break;
        }
    }
    shutdown.cancel();
}

async fn read_loop<S>(mut source: S, session: Arc<Session>, client: Arc<dyn DAppSessionClient>)
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    let shutdown = session.shutdown_token();
    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => break,
            frame = source.next() => frame,
        };

        match frame {
            Some(Ok(Message::Text(text))) => session.handle_text(text.as_str()),
            Some(Ok(Message::Close(frame))) => {
                info!(frame = ?frame, "Bridge closed the connection");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(error = %e, "Bridge read failed");
                notify_error(&client, format!("Bridge read failed: {}", e)).await;
                break;
            }
            None => {
                info!("Bridge stream ended");
                break;
            }
        }
    }
    shutdown.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::ETHEREUM_ROPSTEN;
    use crate::walletconnect::approval::{
        ApprovalRequest, RequestDecision, SessionDecision, SessionProposal,
    };
    use crate::walletconnect::crypto::SymmetricKey;
    use crate::walletconnect::messages::{SocketMessage, SUBSCRIBE_TYPE};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use url::Url;

    const TOPIC: &str = "5a3b6e2f-7c0d-4e55-9b1a-2f3c4d5e6f70";
    const KEY: &str = "41791102999c339c844880b23950704cc43aa840f3739e365323cda4dfa89e7a";

    #[derive(Default)]
    struct RecordingClient {
        errors: Mutex<Vec<String>>,
    }

    impl DAppSessionClient for RecordingClient {
        fn session_started(&self, _: &str, _: &str, _: &str, _: &str) {}

        fn session_error(&self, reason: &str) {
            self.errors.lock().unwrap().push(reason.to_string());
        }

        fn grant_session(&self, _: &SessionProposal) -> SessionDecision {
            SessionDecision::Reject
        }

        fn approve_request(&self, _: &ApprovalRequest) -> RequestDecision {
            RequestDecision::Reject
        }
    }

    fn wallet() -> WalletConnect {
        let signer = WalletSigner::from_hex(
            "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap();
        WalletConnect::new(ETHEREUM_ROPSTEN, signer, None)
    }

    fn description(addr: std::net::SocketAddr) -> SessionDescription {
        SessionDescription::new(
            TOPIC,
            Url::parse(&format!("http://{}", addr)).unwrap(),
            SymmetricKey::from_hex(KEY).unwrap(),
        )
    }

    #[tokio::test]
    async fn connect_subscribes_and_disconnect_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let bridge = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();

            let first = ws.next().await.unwrap().unwrap();
            let sub: SocketMessage = serde_json::from_str(first.to_text().unwrap()).unwrap();

            let mut closed = false;
            while let Some(Ok(frame)) = ws.next().await {
                if frame.is_close() {
                    closed = true;
                    break;
                }
            }
            (sub, closed)
        });

        let client = Arc::new(RecordingClient::default());
        let handle = wallet()
            .connect(description(addr), client.clone())
            .await
            .unwrap();

        handle.disconnect().await;

        let (sub, closed) = tokio::time::timeout(Duration::from_secs(5), bridge)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sub.topic, TOPIC);
        assert_eq!(sub.message_type, SUBSCRIBE_TYPE);
        assert!(sub.silent);
        assert!(closed);
        assert!(client.errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bridge_close_ends_session() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            let _subscribe = ws.next().await;
            let _ = ws.close(None).await;
        });

        let client = Arc::new(RecordingClient::default());
        let handle = wallet()
            .connect(description(addr), client)
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle.closed())
            .await
            .expect("session should end when the bridge closes");
    }

    #[tokio::test]
    async fn connection_failure_reports_session_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = Arc::new(RecordingClient::default());
        let result = wallet().connect(description(addr), client.clone()).await;

        assert!(matches!(result, Err(WalletConnectError::Transport(_))));
        let errors = client.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Failed to connect to bridge"));
    }
}
