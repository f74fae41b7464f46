// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bindings to the native wallet core's bundle symbols.

use std::ffi::{c_char, c_int, c_void};

use super::BundleAbi;

#[link(name = "WalletKitCore")]
extern "C" {
    fn cryptoClientTransactionBundleCreate(
        status: c_int,
        transaction: *const u8,
        transaction_length: usize,
        block_timestamp: u64,
        block_height: u64,
        attributes_count: usize,
        attribute_keys: *const *const c_char,
        attribute_vals: *const *const c_char,
    ) -> *mut c_void;

    fn cryptoClientTransactionBundleRelease(bundle: *mut c_void);
}

/// The linked native wallet core.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCore;

impl BundleAbi for NativeCore {
    unsafe fn create(
        &self,
        status: c_int,
        transaction: *const u8,
        transaction_len: usize,
        block_timestamp: u64,
        block_height: u64,
        meta_count: usize,
        meta_keys: *const *const c_char,
        meta_vals: *const *const c_char,
    ) -> *mut c_void {
        cryptoClientTransactionBundleCreate(
            status,
            transaction,
            transaction_len,
            block_timestamp,
            block_height,
            meta_count,
            meta_keys,
            meta_vals,
        )
    }

    unsafe fn release(&self, handle: *mut c_void) {
        cryptoClientTransactionBundleRelease(handle)
    }
}
