// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Client Transaction Bundles
//!
//! Marshalling layer that hands a transaction bundle to the native wallet
//! core through its C ABI and owns the opaque handle it returns.
//!
//! ## Ownership
//!
//! A [`ClientTransactionBundle`] owns exactly one core handle. The handle is
//! released exactly once: either by [`ClientTransactionBundle::release`] or
//! when the value is dropped. The type is neither `Clone` nor `Copy`, so the
//! handle cannot be aliased from safe code.
//!
//! ## ABI
//!
//! The core's constructor takes the transfer state, the serialized
//! transaction as pointer + length, the block timestamp and height, and the
//! metadata as two parallel arrays of NUL-terminated strings. The
//! [`BundleAbi`] trait is that seam; [`ffi::NativeCore`] binds the real
//! symbols when the `native-core` feature is enabled.

#[cfg(feature = "native-core")]
pub mod ffi;

use std::collections::HashMap;
use std::ffi::{c_char, c_int, c_void, CString};
use std::ptr::{self, NonNull};

use tracing::debug;

/// Transfer state as understood by the native core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferStateType {
    Created,
    Signed,
    Submitted,
    Included,
    Errored,
    Deleted,
}

impl TransferStateType {
    /// Value of the core's C enum for this state.
    pub fn to_core(self) -> c_int {
        match self {
            TransferStateType::Created => 0,
            TransferStateType::Signed => 1,
            TransferStateType::Submitted => 2,
            TransferStateType::Included => 3,
            TransferStateType::Errored => 4,
            TransferStateType::Deleted => 5,
        }
    }

    /// Map a core C enum value back to a state.
    pub fn from_core(value: c_int) -> Result<Self, BundleError> {
        match value {
            0 => Ok(TransferStateType::Created),
            1 => Ok(TransferStateType::Signed),
            2 => Ok(TransferStateType::Submitted),
            3 => Ok(TransferStateType::Included),
            4 => Ok(TransferStateType::Errored),
            5 => Ok(TransferStateType::Deleted),
            other => Err(BundleError::UnknownTransferState(other)),
        }
    }
}

/// Errors raised while marshalling a bundle for the core.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("Metadata {field} contains an interior NUL byte: {value:?}")]
    InteriorNul { field: &'static str, value: String },

    #[error("Unknown transfer state value: {0}")]
    UnknownTransferState(c_int),

    #[error("Native core returned a null bundle handle")]
    NullHandle,
}

/// C ABI of the core's transaction bundle constructor and destructor.
pub trait BundleAbi {
    /// Create a core bundle.
    ///
    /// # Safety
    /// `transaction` must point to `transaction_len` readable bytes, and
    /// `meta_keys` / `meta_vals` must each point to `meta_count` valid
    /// NUL-terminated strings. All pointers are only borrowed for the
    /// duration of the call.
    #[allow(clippy::too_many_arguments)]
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
    ) -> *mut c_void;

    /// Release a handle previously returned by [`BundleAbi::create`].
    ///
    /// # Safety
    /// `handle` must come from `create` on the same ABI and must not have
    /// been released already.
    unsafe fn release(&self, handle: *mut c_void);
}

/// Metadata split into the parallel string arrays the core expects.
///
/// The pointer vectors borrow from the owned `CString`s, which must outlive
/// the ABI call.
struct MarshalledMeta {
    _keys: Vec<CString>,
    _vals: Vec<CString>,
    key_ptrs: Vec<*const c_char>,
    val_ptrs: Vec<*const c_char>,
}

impl MarshalledMeta {
    fn new(meta: &HashMap<String, String>) -> Result<Self, BundleError> {
        let mut keys = Vec::with_capacity(meta.len());
        let mut vals = Vec::with_capacity(meta.len());

        // Iterate pairs once so keys[i] and vals[i] always belong together.
        for (key, val) in meta {
            keys.push(CString::new(key.as_str()).map_err(|_| BundleError::InteriorNul {
                field: "key",
                value: key.clone(),
            })?);
            vals.push(CString::new(val.as_str()).map_err(|_| BundleError::InteriorNul {
                field: "value",
                value: val.clone(),
            })?);
        }

        let key_ptrs = keys.iter().map(|k| k.as_ptr()).collect();
        let val_ptrs = vals.iter().map(|v| v.as_ptr()).collect();

        Ok(Self {
            _keys: keys,
            _vals: vals,
            key_ptrs,
            val_ptrs,
        })
    }

    fn len(&self) -> usize {
        self.key_ptrs.len()
    }

    fn keys_ptr(&self) -> *const *const c_char {
        if self.key_ptrs.is_empty() {
            ptr::null()
        } else {
            self.key_ptrs.as_ptr()
        }
    }

    fn vals_ptr(&self) -> *const *const c_char {
        if self.val_ptrs.is_empty() {
            ptr::null()
        } else {
            self.val_ptrs.as_ptr()
        }
    }
}

/// Owned handle to a core client transaction bundle.
pub struct ClientTransactionBundle<A: BundleAbi> {
    abi: A,
    handle: NonNull<c_void>,
}

impl<A: BundleAbi> ClientTransactionBundle<A> {
    /// Marshal a bundle into the core and take ownership of its handle.
    pub fn create(
        abi: A,
        status: TransferStateType,
        transaction: &[u8],
        block_timestamp: u64,
        block_height: u64,
        meta: &HashMap<String, String>,
    ) -> Result<Self, BundleError> {
        let marshalled = MarshalledMeta::new(meta)?;

        // SAFETY: `transaction` and the metadata arrays are live for the
        // whole call and their lengths are passed alongside.
        let raw = unsafe {
            abi.create(
                status.to_core(),
                transaction.as_ptr(),
                transaction.len(),
                block_timestamp,
                block_height,
                marshalled.len(),
                marshalled.keys_ptr(),
                marshalled.vals_ptr(),
            )
        };

        let handle = NonNull::new(raw).ok_or(BundleError::NullHandle)?;

        debug!(
            status = ?status,
            transaction_len = transaction.len(),
            block_height,
            meta_count = marshalled.len(),
            "Created client transaction bundle"
        );

        Ok(Self { abi, handle })
    }

    /// Raw core handle, for passing to other core calls.
    ///
    /// The pointer stays owned by this bundle.
    pub fn as_ptr(&self) -> *mut c_void {
        self.handle.as_ptr()
    }

    /// Release the core handle now.
    pub fn release(self) {
        drop(self);
    }
}

impl<A: BundleAbi> Drop for ClientTransactionBundle<A> {
    fn drop(&mut self) {
        // SAFETY: the handle came from `create` on this ABI and ownership
        // guarantees this is the only release.
        unsafe { self.abi.release(self.handle.as_ptr()) };
    }
}

impl<A: BundleAbi> std::fmt::Debug for ClientTransactionBundle<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientTransactionBundle")
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorded {
        status: Option<c_int>,
        transaction: Vec<u8>,
        block_timestamp: u64,
        block_height: u64,
        meta: Vec<(String, String)>,
        created: usize,
        released: usize,
        return_null: bool,
    }

    /// In-process stand-in for the core that records every ABI call.
    #[derive(Clone, Default)]
    struct MockCore(Arc<Mutex<Recorded>>);

    impl BundleAbi for MockCore {
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
            let mut rec = self.0.lock().unwrap();
            rec.status = Some(status);
            rec.transaction = std::slice::from_raw_parts(transaction, transaction_len).to_vec();
            rec.block_timestamp = block_timestamp;
            rec.block_height = block_height;
            for i in 0..meta_count {
                let key = CStr::from_ptr(*meta_keys.add(i)).to_str().unwrap().to_string();
                let val = CStr::from_ptr(*meta_vals.add(i)).to_str().unwrap().to_string();
                rec.meta.push((key, val));
            }
            if rec.return_null {
                return ptr::null_mut();
            }
            rec.created += 1;
            Box::into_raw(Box::new(42u64)) as *mut c_void
        }

        unsafe fn release(&self, handle: *mut c_void) {
            self.0.lock().unwrap().released += 1;
            drop(Box::from_raw(handle as *mut u64));
        }
    }

    fn sample_meta() -> HashMap<String, String> {
        HashMap::from([
            ("fee".to_string(), "21000".to_string()),
            ("nonce".to_string(), "7".to_string()),
            ("memo".to_string(), "rent".to_string()),
        ])
    }

    #[test]
    fn create_marshals_all_fields() {
        let core = MockCore::default();
        let meta = sample_meta();

        let bundle = ClientTransactionBundle::create(
            core.clone(),
            TransferStateType::Included,
            &[0xde, 0xad, 0xbe, 0xef],
            1_650_000_000,
            14_000_000,
            &meta,
        )
        .unwrap();
        assert!(!bundle.as_ptr().is_null());

        let rec = core.0.lock().unwrap();
        assert_eq!(rec.status, Some(3));
        assert_eq!(rec.transaction, vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(rec.block_timestamp, 1_650_000_000);
        assert_eq!(rec.block_height, 14_000_000);
        assert_eq!(rec.meta.len(), 3);
        for (key, val) in &rec.meta {
            assert_eq!(meta.get(key), Some(val), "key/value pairing broken for {key}");
        }
    }

    #[test]
    fn drop_releases_exactly_once() {
        let core = MockCore::default();
        {
            let _bundle = ClientTransactionBundle::create(
                core.clone(),
                TransferStateType::Created,
                b"tx",
                0,
                0,
                &HashMap::new(),
            )
            .unwrap();
        }
        let rec = core.0.lock().unwrap();
        assert_eq!(rec.created, 1);
        assert_eq!(rec.released, 1);
    }

    #[test]
    fn explicit_release_does_not_double_free() {
        let core = MockCore::default();
        let bundle = ClientTransactionBundle::create(
            core.clone(),
            TransferStateType::Submitted,
            b"tx",
            1,
            2,
            &sample_meta(),
        )
        .unwrap();

        bundle.release();
        assert_eq!(core.0.lock().unwrap().released, 1);
    }

    #[test]
    fn empty_metadata_passes_zero_count() {
        let core = MockCore::default();
        let _bundle = ClientTransactionBundle::create(
            core.clone(),
            TransferStateType::Signed,
            &[],
            5,
            6,
            &HashMap::new(),
        )
        .unwrap();

        let rec = core.0.lock().unwrap();
        assert!(rec.meta.is_empty());
        assert!(rec.transaction.is_empty());
    }

    #[test]
    fn interior_nul_is_rejected_before_core_call() {
        let core = MockCore::default();
        let meta = HashMap::from([("bad\0key".to_string(), "v".to_string())]);

        let err = ClientTransactionBundle::create(
            core.clone(),
            TransferStateType::Created,
            b"tx",
            0,
            0,
            &meta,
        )
        .unwrap_err();

        assert!(matches!(err, BundleError::InteriorNul { field: "key", .. }));
        assert_eq!(core.0.lock().unwrap().status, None);
    }

    #[test]
    fn null_handle_is_an_error_and_never_released() {
        let core = MockCore::default();
        core.0.lock().unwrap().return_null = true;

        let err = ClientTransactionBundle::create(
            core.clone(),
            TransferStateType::Errored,
            b"tx",
            0,
            0,
            &HashMap::new(),
        )
        .unwrap_err();

        assert!(matches!(err, BundleError::NullHandle));
        assert_eq!(core.0.lock().unwrap().released, 0);
    }

    #[test]
    fn transfer_state_core_values() {
        let all = [
            TransferStateType::Created,
            TransferStateType::Signed,
            TransferStateType::Submitted,
            TransferStateType::Included,
            TransferStateType::Errored,
            TransferStateType::Deleted,
        ];
        for (expected, state) in all.iter().enumerate() {
            assert_eq!(state.to_core(), expected as c_int);
            assert_eq!(TransferStateType::from_core(expected as c_int).unwrap(), *state);
        }
        assert!(matches!(
            TransferStateType::from_core(9),
            Err(BundleError::UnknownTransferState(9))
        ));
    }
}
