// SPDX-License-Identifier: PMPL-1.0-or-later
//! Payload cipher and base64 helpers.
//!
//! Payloads are encrypted with AES in ECB mode using PKCS#7 padding and
//! emitted as standard base64. The key is taken as raw UTF-8 bytes; its
//! length selects AES-128, AES-192 or AES-256.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyInit};
use aes::{Aes128, Aes192, Aes256};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{BucketStorageError, Result};

/// Symmetric cipher applied to stored payloads.
#[derive(Clone)]
pub struct AesEncryption {
    key: Vec<u8>,
}

impl AesEncryption {
    /// Build a cipher from a UTF-8 key of 16, 24 or 32 bytes.
    pub fn new(key: &str) -> Result<Self> {
        let key = key.as_bytes().to_vec();
        match key.len() {
            16 | 24 | 32 => Ok(Self { key }),
            len => Err(BucketStorageError::InvalidConfig(format!(
                "encryption key must be 16, 24 or 32 bytes, got {len}"
            ))),
        }
    }

    /// Key size in bits.
    pub fn key_bits(&self) -> usize {
        self.key.len() * 8
    }

    /// Encrypt `plaintext` and return it base64-encoded.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let data = plaintext.as_bytes();
        let ciphertext = match self.key.len() {
            16 => encrypt_with::<Aes128>(&self.key, data)?,
            24 => encrypt_with::<Aes192>(&self.key, data)?,
            _ => encrypt_with::<Aes256>(&self.key, data)?,
        };
        Ok(STANDARD.encode(ciphertext))
    }

    /// Decode base64 `ciphertext`, decrypt it and return the UTF-8 plaintext.
    pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let data = STANDARD
            .decode(ciphertext.trim())
            .map_err(|e| BucketStorageError::Encoding(format!("ciphertext is not base64: {e}")))?;
        let plaintext = match self.key.len() {
            16 => decrypt_with::<Aes128>(&self.key, &data)?,
            24 => decrypt_with::<Aes192>(&self.key, &data)?,
            _ => decrypt_with::<Aes256>(&self.key, &data)?,
        };
        String::from_utf8(plaintext)
            .map_err(|e| BucketStorageError::Encoding(format!("plaintext is not UTF-8: {e}")))
    }
}

impl std::fmt::Debug for AesEncryption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesEncryption")
            .field("key_bits", &self.key_bits())
            .finish_non_exhaustive()
    }
}

fn encrypt_with<C>(key: &[u8], data: &[u8]) -> Result<Vec<u8>>
where
    C: BlockCipher + BlockEncryptMut + KeyInit,
{
    let cipher = ecb::Encryptor::<C>::new_from_slice(key)
        .map_err(|e| BucketStorageError::Crypto(format!("invalid key: {e}")))?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(data))
}

fn decrypt_with<C>(key: &[u8], data: &[u8]) -> Result<Vec<u8>>
where
    C: BlockCipher + BlockDecryptMut + KeyInit,
{
    let cipher = ecb::Decryptor::<C>::new_from_slice(key)
        .map_err(|e| BucketStorageError::Crypto(format!("invalid key: {e}")))?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(data)
        .map_err(|_| BucketStorageError::Crypto("bad padding: wrong key or corrupted payload".into()))
}

/// Standard base64 of the UTF-8 bytes of `text`.
pub fn encode_base64(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Inverse of [`encode_base64`].
pub fn decode_base64(encoded: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| BucketStorageError::Encoding(format!("invalid base64: {e}")))?;
    String::from_utf8(bytes).map_err(|e| BucketStorageError::Encoding(format!("invalid UTF-8: {e}")))
}
