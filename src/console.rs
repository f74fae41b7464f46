// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Terminal front end for session and request approvals.

use std::io::{BufRead, Write};
use std::sync::{Mutex, PoisonError};

use tracing::{error, info, warn};

use crate::walletconnect::{
    ApprovalRequest, DAppSessionClient, PeerMeta, RequestDecision, SessionDecision,
    SessionProposal,
};

/// Prompts on a terminal (or approves everything when `auto_approve` is set).
pub struct ConsoleApprover {
    auto_approve: bool,
    accounts: Vec<String>,
    wallet_meta: PeerMeta,
    io: Mutex<(Box<dyn BufRead + Send>, Box<dyn Write + Send>)>,
}

impl ConsoleApprover {
    pub fn new(
        auto_approve: bool,
        accounts: Vec<String>,
        wallet_meta: PeerMeta,
        input: Box<dyn BufRead + Send>,
        output: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            auto_approve,
            accounts,
            wallet_meta,
            io: Mutex::new((input, output)),
        }
    }

    /// Prompt on stdin/stdout.
    pub fn stdio(auto_approve: bool, accounts: Vec<String>, wallet_meta: PeerMeta) -> Self {
        Self::new(
            auto_approve,
            accounts,
            wallet_meta,
            Box::new(std::io::BufReader::new(std::io::stdin())),
            Box::new(std::io::stdout()),
        )
    }

    fn confirm(&self, title: &str, lines: &[String]) -> bool {
        if self.auto_approve {
            info!(prompt = %title, "Auto-approved");
            return true;
        }

        let mut io = self.io.lock().unwrap_or_else(PoisonError::into_inner);
        let (input, output) = &mut *io;

        if let Err(e) = write_prompt(&mut **output, title, lines) {
            warn!(error = %e, "Failed to write prompt");
            return false;
        }

        let mut answer = String::new();
        match input.read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(e) => {
                warn!(error = %e, "Failed to read answer");
                false
            }
        }
    }
}

fn write_prompt(output: &mut dyn Write, title: &str, lines: &[String]) -> std::io::Result<()> {
    writeln!(output, "\n{}", title)?;
    for line in lines {
        writeln!(output, "  {}", line)?;
    }
    write!(output, "Approve? [y/N] ")?;
    output.flush()
}

impl DAppSessionClient for ConsoleApprover {
    fn session_started(&self, dapp_name: &str, topic: &str, client_id: &str, peer_id: &str) {
        info!(
            dapp = %dapp_name,
            topic = %topic,
            client_id = %client_id,
            peer_id = %peer_id,
            "Connected to dApp"
        );
    }

    fn session_error(&self, reason: &str) {
        error!(reason = %reason, "Session error");
    }

    fn session_closed(&self, reason: &str) {
        info!(reason = %reason, "Session closed");
    }

    fn grant_session(&self, proposal: &SessionProposal) -> SessionDecision {
        let title = format!("Session request from {}", proposal.peer_meta.name);
        let lines = vec![
            format!("url: {}", proposal.peer_meta.url),
            format!("description: {}", proposal.peer_meta.description),
            format!("bridge: {}", proposal.bridge_url),
            format!("accounts: {}", self.accounts.join(", ")),
        ];

        if self.confirm(&title, &lines) {
            SessionDecision::Accept {
                accounts: self.accounts.clone(),
                wallet_meta: self.wallet_meta.clone(),
            }
        } else {
            SessionDecision::Reject
        }
    }

    fn approve_request(&self, request: &ApprovalRequest) -> RequestDecision {
        let lines: Vec<String> = request
            .details
            .iter()
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect();

        if self.confirm(&request.approval_type.to_string(), &lines) {
            RequestDecision::Approve
        } else {
            RequestDecision::Reject
        }
    }
}
