/*
 * keysplit: split-key encryption with threshold share recovery
 * Copyright (C) 2023-2024 Aleksa Sarai <cyphar@cyphar.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use aead::{Aead, Key, KeyInit, Nonce};
use aes_gcm::Aes256Gcm;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

pub type EnvelopeKey = Key<Aes256Gcm>;
pub const KEY_LENGTH: usize = 32;

pub type EnvelopeNonce = Nonce<Aes256Gcm>;
pub const NONCE_LENGTH: usize = 12;

#[cfg(test)]
#[test]
fn check_length_consts() {
    // GenericArray doesn't give us a way to get the size, so we need to do
    // this in a test...
    assert_eq!(KEY_LENGTH, EnvelopeKey::default().len());
    assert_eq!(NONCE_LENGTH, EnvelopeNonce::default().len());
}

/// Largest payload `seal` accepts.
pub const MAX_PAYLOAD_BYTES: usize = 50 * 1024 * 1024; // 50 MiB

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid parameters: {0}")]
    InvalidParameters(&'static str),

    #[error("aead encryption cryptographic error: {0}")]
    AeadEncryption(aead::Error),

    // Deliberately cause-free: wrong key material (too few or inconsistent
    // shares) and a tampered envelope must be indistinguishable.
    #[error("payload authentication failed")]
    AuthenticationFailed,
}

/// What the sealed payload is, carried alongside the ciphertext so the
/// recovering side knows how to present the plaintext.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PayloadMeta {
    Text,
    File { filename: String, mime: String },
}

/// The authenticated-encryption envelope protecting one secret payload.
///
/// Immutable once sealed; holds everything needed to open the payload
/// *except* the key, which is handed to the caller for splitting and never
/// stored.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Envelope {
    pub(crate) nonce: EnvelopeNonce,
    pub(crate) ciphertext: Vec<u8>,
    pub(crate) key_len: usize,
    pub(crate) meta: PayloadMeta,
}

impl Envelope {
    /// Byte length of the symmetric key this envelope was sealed under.
    pub fn key_len(&self) -> usize {
        self.key_len
    }

    pub fn meta(&self) -> &PayloadMeta {
        &self.meta
    }
}

/// Encrypt `plaintext` under a fresh random key and nonce.
///
/// Returns the envelope and the raw key. The key exists solely to be fed
/// to `shamir::split` -- drop it as soon as the shares exist (the
/// zeroizing wrapper wipes it on drop).
pub fn seal(
    plaintext: &[u8],
    meta: PayloadMeta,
) -> Result<(Envelope, Zeroizing<Vec<u8>>), Error> {
    if plaintext.is_empty() {
        return Err(Error::InvalidParameters("payload must not be empty"));
    }
    if plaintext.len() > MAX_PAYLOAD_BYTES {
        return Err(Error::InvalidParameters("payload exceeds the 50 MiB limit"));
    }

    // Fresh key and nonce per seal; a nonce is never reused with a key.
    let mut key = EnvelopeKey::default();
    OsRng.fill_bytes(&mut key);
    let mut nonce = EnvelopeNonce::default();
    OsRng.fill_bytes(&mut nonce);

    let aead = Aes256Gcm::new(&key);
    let ciphertext = aead
        .encrypt(&nonce, plaintext)
        .map_err(Error::AeadEncryption)?;

    let envelope = Envelope {
        nonce,
        ciphertext,
        key_len: KEY_LENGTH,
        meta,
    };
    Ok((envelope, Zeroizing::new(key.to_vec())))
}

/// Decrypt the envelope under `key`.
///
/// Every failure mode -- wrong key, wrong key length, flipped ciphertext or
/// nonce bit, truncation -- is the single `AuthenticationFailed`, with no
/// partial plaintext.
pub fn open(envelope: &Envelope, key: &[u8]) -> Result<Vec<u8>, Error> {
    if key.len() != KEY_LENGTH || envelope.key_len != key.len() {
        // A key of the wrong length is just a wrong key.
        return Err(Error::AuthenticationFailed);
    }

    let aead = Aes256Gcm::new(EnvelopeKey::from_slice(key));
    aead.decrypt(&envelope.nonce, envelope.ciphertext.as_slice())
        .map_err(|_| Error::AuthenticationFailed)
}
