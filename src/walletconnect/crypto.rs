// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Encrypted payload construction and recovery.
//!
//! WalletConnect 1.0 bodies are AES-256-CBC with PKCS7 padding under the
//! session key, authenticated by HMAC-SHA256 (same key) over
//! `ciphertext || iv`. The tag is checked before any decryption happens.

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use k256::elliptic_curve::rand_core::{OsRng, RngCore};
use sha2::Sha256;

use super::messages::EncryptedPayload;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Session key length in bytes.
pub const KEY_LEN: usize = 32;

/// AES block / IV length in bytes.
pub const IV_LEN: usize = 16;

/// Errors from payload construction or recovery.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("Invalid hex in {field}: {reason}")]
    InvalidHex { field: &'static str, reason: String },

    #[error("Invalid key length: expected {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("Invalid IV length: expected {IV_LEN} bytes, got {0}")]
    InvalidIvLength(usize),

    #[error("HMAC verification failed")]
    HmacMismatch,

    #[error("Decryption failed: bad padding")]
    BadPadding,

    #[error("Decrypted payload is not UTF-8")]
    NotUtf8,
}

/// Symmetric session key shared with the dApp.
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey([u8; KEY_LEN]);

impl SymmetricKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a hex key, with or without a `0x` prefix.
    pub fn from_hex(key_hex: &str) -> Result<Self, PayloadError> {
        let bytes = decode_hex("key", key_hex)?;
        let array: [u8; KEY_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| PayloadError::InvalidKeyLength(bytes.len()))?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    fn mac(&self) -> HmacSha256 {
        <HmacSha256 as Mac>::new_from_slice(&self.0).expect("HMAC accepts any key length")
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

/// Encrypt `plaintext` under `key` with a fresh random IV.
pub fn construct(key: &SymmetricKey, plaintext: &str) -> EncryptedPayload {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    construct_with_iv(key, plaintext, &iv)
}

fn construct_with_iv(key: &SymmetricKey, plaintext: &str, iv: &[u8; IV_LEN]) -> EncryptedPayload {
    let ciphertext = Aes256CbcEnc::new(key.as_bytes().into(), iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

    let mut mac = key.mac();
    mac.update(&ciphertext);
    mac.update(iv);
    let tag = mac.finalize().into_bytes();

    EncryptedPayload {
        data: alloy::hex::encode(&ciphertext),
        hmac: alloy::hex::encode(tag),
        iv: alloy::hex::encode(iv),
    }
}

/// Authenticate and decrypt `payload` under `key`.
pub fn recover(key: &SymmetricKey, payload: &EncryptedPayload) -> Result<String, PayloadError> {
    let ciphertext = decode_hex("data", &payload.data)?;
    let tag = decode_hex("hmac", &payload.hmac)?;
    let iv_bytes = decode_hex("iv", &payload.iv)?;
    let iv: [u8; IV_LEN] = iv_bytes
        .as_slice()
        .try_into()
        .map_err(|_| PayloadError::InvalidIvLength(iv_bytes.len()))?;

    let mut mac = key.mac();
    mac.update(&ciphertext);
    mac.update(&iv);
    mac.verify_slice(&tag).map_err(|_| PayloadError::HmacMismatch)?;

    let plaintext = Aes256CbcDec::new(key.as_bytes().into(), (&iv).into())
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| PayloadError::BadPadding)?;

    String::from_utf8(plaintext).map_err(|_| PayloadError::NotUtf8)
}

fn decode_hex(field: &'static str, value: &str) -> Result<Vec<u8>, PayloadError> {
    alloy::hex::decode(value).map_err(|e| PayloadError::InvalidHex {
        field,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_HEX: &str = "3e0cd8b6e2f1c07c1e1e8e1e8d6e5bd2f4e0c7e7a9e4b1a2c3d4e5f60718293a";

    fn key() -> SymmetricKey {
        SymmetricKey::from_hex(KEY_HEX).unwrap()
    }

    #[test]
    fn roundtrip_recovers_plaintext() {
        let key = key();
        let plaintexts = [
            "",
            "a",
            "exactly sixteen!",
            r#"{"id":1,"jsonrpc":"2.0","method":"eth_sign","params":["0xabc","0xdef"]}"#,
            "ünïcödé ✓",
        ];
        for plaintext in plaintexts {
            let payload = construct(&key, plaintext);
            assert_eq!(recover(&key, &payload).unwrap(), plaintext);
        }
    }

    #[test]
    fn ciphertext_is_padded_to_block_size() {
        let payload = construct(&key(), "exactly sixteen!");
        // 16 bytes of plaintext gain a full padding block.
        assert_eq!(payload.data.len(), 64);
        assert_eq!(payload.iv.len(), 32);
        assert_eq!(payload.hmac.len(), 64);
    }

    #[test]
    fn fresh_iv_per_payload() {
        let key = key();
        let a = construct(&key, "same");
        let b = construct(&key, "same");
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.data, b.data);
    }

    #[test]
    fn deterministic_with_fixed_iv() {
        let key = key();
        let iv = [7u8; IV_LEN];
        assert_eq!(
            construct_with_iv(&key, "hello", &iv),
            construct_with_iv(&key, "hello", &iv)
        );
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let key = key();
        let mut payload = construct(&key, "transfer 1 ETH");
        let mut bytes = alloy::hex::decode(&payload.data).unwrap();
        bytes[0] ^= 0x01;
        payload.data = alloy::hex::encode(bytes);

        assert!(matches!(recover(&key, &payload), Err(PayloadError::HmacMismatch)));
    }

    #[test]
    fn tampered_iv_fails_authentication() {
        let key = key();
        let mut payload = construct(&key, "transfer 1 ETH");
        let mut bytes = alloy::hex::decode(&payload.iv).unwrap();
        bytes[15] ^= 0x80;
        payload.iv = alloy::hex::encode(bytes);

        assert!(matches!(recover(&key, &payload), Err(PayloadError::HmacMismatch)));
    }

    #[test]
    fn tampered_tag_fails_authentication() {
        let key = key();
        let mut payload = construct(&key, "transfer 1 ETH");
        let mut bytes = alloy::hex::decode(&payload.hmac).unwrap();
        bytes[31] ^= 0xff;
        payload.hmac = alloy::hex::encode(bytes);

        assert!(matches!(recover(&key, &payload), Err(PayloadError::HmacMismatch)));
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let payload = construct(&key(), "secret");
        let other = SymmetricKey::from_bytes([9u8; KEY_LEN]);
        assert!(matches!(recover(&other, &payload), Err(PayloadError::HmacMismatch)));
    }

    #[test]
    fn accepts_0x_prefixed_fields() {
        let key = key();
        let mut payload = construct(&key, "prefixed");
        payload.data = format!("0x{}", payload.data);
        payload.iv = format!("0x{}", payload.iv);
        payload.hmac = format!("0x{}", payload.hmac);
        assert_eq!(recover(&key, &payload).unwrap(), "prefixed");

        let prefixed_key = SymmetricKey::from_hex(&format!("0x{KEY_HEX}")).unwrap();
        assert_eq!(prefixed_key, key);
    }

    #[test]
    fn rejects_bad_key_and_iv() {
        assert!(matches!(
            SymmetricKey::from_hex("abcd"),
            Err(PayloadError::InvalidKeyLength(2))
        ));
        assert!(matches!(
            SymmetricKey::from_hex("zz"),
            Err(PayloadError::InvalidHex { field: "key", .. })
        ));

        let key = key();
        let mut payload = construct(&key, "x");
        payload.iv = "00".repeat(8);
        assert!(matches!(recover(&key, &payload), Err(PayloadError::InvalidIvLength(8))));
    }

    #[test]
    fn authenticated_but_malformed_padding_is_reported() {
        use cbc::cipher::block_padding::NoPadding;

        let key = key();
        let iv = [1u8; IV_LEN];
        // A plaintext block ending in 0x00 is never valid PKCS7.
        let ciphertext = Aes256CbcEnc::new(key.as_bytes().into(), (&iv).into())
            .encrypt_padded_vec_mut::<NoPadding>(&[0u8; IV_LEN]);
        let mut mac = key.mac();
        mac.update(&ciphertext);
        mac.update(&iv);
        let payload = EncryptedPayload {
            data: alloy::hex::encode(&ciphertext),
            hmac: alloy::hex::encode(mac.finalize().into_bytes()),
            iv: alloy::hex::encode(iv),
        };

        assert!(matches!(recover(&key, &payload), Err(PayloadError::BadPadding)));
    }
}
