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
    shamir::{field::FieldElement, ShareVector, MAX_SHARES, PRIME},
    wire::{base64_decode, base64_encode, sha256_hex},
};

use serde::{Deserialize, Serialize};

/// Why a share document was rejected. Callers treat every variant the same
/// way: count it, drop the document, carry on with the remaining shares.
#[derive(Debug, thiserror::Error)]
pub enum ShareDecodeError {
    #[error("share document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("share index {0} is outside the valid range")]
    BadIndex(u16),

    #[error("integrity hash does not match the encoded share")]
    HashMismatch,

    #[error("share payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("share payload is not a whole number of 16-bit elements")]
    TruncatedPayload,

    #[error("share element {0} is outside the field")]
    ElementOutOfRange(u16),
}

/// The JSON share artifact handed to one participant.
///
/// `index`, `share` and `hash` are load-bearing; `keyLen`, `threshold` and
/// `sharesCount` are convenience metadata echoed back to the holder and
/// never trusted during reconstruction.
///
/// Share elements are packed 16-bit little-endian before the base64 pass.
/// The width matters: y values reach 256, so an 8-bit packing would
/// silently truncate them and corrupt reconstruction.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ShareDocument {
    pub index: u16,

    pub share: String,

    #[serde(rename = "keyLen", default, skip_serializing_if = "Option::is_none")]
    pub key_len: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u16>,

    #[serde(rename = "sharesCount", default, skip_serializing_if = "Option::is_none")]
    pub shares_count: Option<u16>,

    pub hash: String,
}

impl ShareDocument {
    /// Encode one share for transport, tagging the encoded payload with its
    /// SHA-256.
    ///
    /// The tag catches corruption or truncation of a stored share file. It
    /// is computed by the same process that dealt the shares, so it is *not*
    /// a commitment against a dishonest dealer.
    pub fn encode(share: &ShareVector, threshold: u16, shares_count: u16) -> Self {
        let encoded = base64_encode(&pack_elements(share));
        let hash = sha256_hex(&encoded);
        Self {
            index: share.index(),
            share: encoded,
            key_len: Some(share.len()),
            threshold: Some(threshold),
            shares_count: Some(shares_count),
            hash,
        }
    }

    /// Verify the integrity tag and unpack the share vector.
    pub fn decode(&self) -> Result<ShareVector, ShareDecodeError> {
        if self.index == 0 || self.index > MAX_SHARES {
            return Err(ShareDecodeError::BadIndex(self.index));
        }
        // The tag covers the base64 text exactly as stored, so it is checked
        // before any decoding happens.
        if sha256_hex(&self.share) != self.hash {
            return Err(ShareDecodeError::HashMismatch);
        }
        let raw = base64_decode(&self.share)?;
        let ys = unpack_elements(&raw)?;
        Ok(ShareVector::new(self.index, ys))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("share document serialisation cannot fail")
    }

    pub fn from_json(data: &str) -> Result<Self, ShareDecodeError> {
        Ok(serde_json::from_str(data)?)
    }
}

fn pack_elements(share: &ShareVector) -> Vec<u8> {
    share
        .ys
        .iter()
        .flat_map(|y| y.inner().to_le_bytes())
        .collect()
}

fn unpack_elements(raw: &[u8]) -> Result<Vec<FieldElement>, ShareDecodeError> {
    if raw.len() % 2 != 0 {
        return Err(ShareDecodeError::TruncatedPayload);
    }
    raw.chunks_exact(2)
        .map(|pair| {
            let v = u16::from_le_bytes([pair[0], pair[1]]);
            if v >= PRIME {
                Err(ShareDecodeError::ElementOutOfRange(v))
            } else {
                Ok(FieldElement::from_inner(v))
            }
        })
        .collect()
}
