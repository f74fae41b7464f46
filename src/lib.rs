// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational WalletConnect - WalletConnect 1.0 wallet client
//!
//! This crate lets the Relational wallet join dApp sessions over a
//! WalletConnect 1.0 bridge and hands client transaction bundles to the
//! native wallet core.
//!
//! ## Modules
//!
//! - `walletconnect` - Bridge transport, payload encryption, request dispatch
//! - `blockchain` - Ethereum signing and transaction submission (alloy)
//! - `bundle` - Client transaction bundle marshalling over the core's C ABI
//! - `config` - Environment configuration
//! - `console` - Terminal approval prompts
//! - `logging` - Tracing subscriber setup

pub mod blockchain;
pub mod bundle;
pub mod config;
pub mod console;
pub mod error;
pub mod logging;
pub mod walletconnect;
