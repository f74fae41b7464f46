// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session descriptor parsed from a WalletConnect 1.0 pairing URI.
//!
//! Format: `wc:{topic}@{version}?bridge={url-encoded bridge}&key={hex key}`

use url::Url;

use super::crypto::{PayloadError, SymmetricKey};

/// Only protocol version accepted by this client.
pub const SUPPORTED_VERSION: &str = "1";

/// Errors from pairing URI parsing.
#[derive(Debug, thiserror::Error)]
pub enum UriError {
    #[error("Malformed WalletConnect URI: {0}")]
    Malformed(String),

    #[error("Unsupported URI scheme `{0}` (expected `wc`)")]
    UnsupportedScheme(String),

    #[error("Unsupported WalletConnect version `{0}`")]
    UnsupportedVersion(String),

    #[error("Missing URI parameter `{0}`")]
    MissingParameter(&'static str),

    #[error("Invalid bridge URL: {0}")]
    InvalidBridge(String),

    #[error("Invalid session key: {0}")]
    InvalidKey(#[from] PayloadError),
}

/// Everything needed to join a dApp's session on its bridge.
#[derive(Debug, Clone)]
pub struct SessionDescription {
    topic: String,
    version: String,
    bridge: Url,
    key: SymmetricKey,
}

impl SessionDescription {
    pub fn new(topic: impl Into<String>, bridge: Url, key: SymmetricKey) -> Self {
        Self {
            topic: topic.into(),
            version: SUPPORTED_VERSION.to_string(),
            bridge,
            key,
        }
    }

    /// Parse a `wc:` pairing URI.
    pub fn parse(uri: &str) -> Result<Self, UriError> {
        let parsed = Url::parse(uri.trim()).map_err(|e| UriError::Malformed(e.to_string()))?;

        if parsed.scheme() != "wc" {
            return Err(UriError::UnsupportedScheme(parsed.scheme().to_string()));
        }

        let (topic, version) = parsed
            .path()
            .split_once('@')
            .ok_or_else(|| UriError::Malformed("expected `topic@version`".to_string()))?;

        if topic.is_empty() {
            return Err(UriError::Malformed("empty topic".to_string()));
        }
        if version != SUPPORTED_VERSION {
            return Err(UriError::UnsupportedVersion(version.to_string()));
        }

        let mut bridge = None;
        let mut key = None;
        for (name, value) in parsed.query_pairs() {
            match name.as_ref() {
                "bridge" => bridge = Some(value.into_owned()),
                "key" => key = Some(value.into_owned()),
                _ => {}
            }
        }

        let bridge = bridge.ok_or(UriError::MissingParameter("bridge"))?;
        let bridge = Url::parse(&bridge).map_err(|e| UriError::InvalidBridge(e.to_string()))?;
        if !matches!(bridge.scheme(), "https" | "http" | "wss" | "ws") {
            return Err(UriError::InvalidBridge(format!(
                "unsupported scheme `{}`",
                bridge.scheme()
            )));
        }

        let key = SymmetricKey::from_hex(&key.ok_or(UriError::MissingParameter("key"))?)?;

        Ok(Self {
            topic: topic.to_string(),
            version: version.to_string(),
            bridge,
            key,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn bridge(&self) -> &Url {
        &self.bridge
    }

    pub fn key(&self) -> &SymmetricKey {
        &self.key
    }

    /// Bridge URL with the HTTP scheme swapped for its WebSocket equivalent.
    pub fn websocket_url(&self) -> String {
        let bridge = self.bridge.as_str();
        if let Some(rest) = bridge.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = bridge.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            bridge.to_string()
        }
    }
}

impl std::fmt::Display for SessionDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "wc:{}@{} via {}", self.topic, self.version, self.bridge)
    }
}
