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

//! The artifact formats handed across the storage boundary: one envelope
//! document per protected secret, one share document per participant.
//! Both are plain JSON with binary fields carried as standard padded
//! base64, so any conforming implementation can consume them.

mod envelope;
mod share;

pub use envelope::{EnvelopeDecodeError, EnvelopeDocument};
pub use share::{ShareDecodeError, ShareDocument};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};

pub(crate) fn base64_encode(data: &[u8]) -> String {
    BASE64.encode(data)
}

pub(crate) fn base64_decode(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    BASE64.decode(data)
}

/// SHA-256 of `data`, rendered as lowercase hex. Integrity tags are
/// computed over the base64 *text*, exactly as stored in the document.
pub(crate) fn sha256_hex(data: &str) -> String {
    Sha256::digest(data.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sha256_hex_known_vector() {
        // Standard test vector for SHA-256("abc").
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn base64_roundtrip() {
        let data = [0u8, 1, 0, 1, 255];
        assert_eq!(base64_decode(&base64_encode(&data)).unwrap(), data);
    }
}
