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

use crate::{
    envelope::{Envelope, EnvelopeNonce, PayloadMeta, NONCE_LENGTH},
    wire::{base64_decode, base64_encode},
};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeDecodeError {
    #[error("envelope document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("envelope field is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("nonce must be exactly {expected} bytes, got {actual}")]
    BadNonceLength { expected: usize, actual: usize },
}

/// The JSON envelope artifact: the AEAD-protected payload plus everything
/// needed to open it except the key itself.
///
/// The nonce field is named `iv` on the wire for compatibility with
/// existing envelope files.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeDocument {
    pub ciphertext: String,

    pub iv: String,

    #[serde(rename = "keyLen")]
    pub key_len: usize,

    pub meta: PayloadMeta,
}

impl EnvelopeDocument {
    pub fn encode(envelope: &Envelope) -> Self {
        Self {
            ciphertext: base64_encode(&envelope.ciphertext),
            iv: base64_encode(&envelope.nonce),
            key_len: envelope.key_len,
            meta: envelope.meta.clone(),
        }
    }

    pub fn decode(&self) -> Result<Envelope, EnvelopeDecodeError> {
        let ciphertext = base64_decode(&self.ciphertext)?;
        let raw_nonce = base64_decode(&self.iv)?;
        if raw_nonce.len() != NONCE_LENGTH {
            return Err(EnvelopeDecodeError::BadNonceLength {
                expected: NONCE_LENGTH,
                actual: raw_nonce.len(),
            });
        }

        Ok(Envelope {
            nonce: EnvelopeNonce::clone_from_slice(&raw_nonce),
            ciphertext,
            key_len: self.key_len,
            meta: self.meta.clone(),
        })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("envelope document serialisation cannot fail")
    }

    pub fn from_json(data: &str) -> Result<Self, EnvelopeDecodeError> {
        Ok(serde_json::from_str(data)?)
    }
}
