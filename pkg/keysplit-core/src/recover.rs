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
    shamir::{self, ShareVector},
    wire::{ShareDecodeError, ShareDocument},
};

use std::collections::BTreeMap;

use zeroize::Zeroizing;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("need at least 2 valid shares with distinct indices, got {have} ({skipped} skipped as invalid)")]
    InsufficientShares { have: usize, skipped: usize },

    #[error("secret reconstruction failed: {0}")]
    Shamir(#[from] shamir::Error),
}

/// Accumulates share documents from untrusted storage.
///
/// A document that fails validation costs a counter bump, not the whole
/// recovery: the caller keeps pushing whatever it has and the set works
/// with the shares that survive. Two documents with the same index
/// collapse into one (the later push wins).
#[derive(Clone, Debug, Default)]
pub struct ShareSet {
    shares: BTreeMap<u16, ShareVector>,
    skipped: usize,
}

impl ShareSet {
    pub fn new() -> Self {
        Default::default()
    }

    /// Decode and admit one share document, returning its index.
    ///
    /// A rejected document is counted in `skipped()`; the error is returned
    /// so the caller can say *why* (the set itself no longer cares).
    pub fn push_document(&mut self, document: &ShareDocument) -> Result<u16, ShareDecodeError> {
        match document.decode() {
            Ok(share) => {
                let index = share.index();
                self.shares.insert(index, share);
                Ok(index)
            }
            Err(err) => {
                self.skipped += 1;
                Err(err)
            }
        }
    }

    /// Parse a JSON share document and admit it. Unparseable input counts
    /// as a skipped share, same as a failed integrity check.
    pub fn push_json(&mut self, data: &str) -> Result<u16, ShareDecodeError> {
        match ShareDocument::from_json(data) {
            Ok(document) => self.push_document(&document),
            Err(err) => {
                self.skipped += 1;
                Err(err)
            }
        }
    }

    /// Number of valid shares (distinct indices) collected so far.
    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    /// Number of documents dropped by validation so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// The indices of the collected shares, ascending.
    pub fn indices(&self) -> Vec<u16> {
        self.shares.keys().copied().collect()
    }

    /// Reconstruct the key the shares were split from.
    ///
    /// Shares whose length does not match `key_len` cannot belong to this
    /// envelope and are dropped like invalid documents. Success only means
    /// interpolation ran: with fewer valid shares than the original
    /// threshold the result is a well-formed but wrong key, and only the
    /// envelope's AEAD verification can tell the difference.
    pub fn recover_key(&self, key_len: usize) -> Result<Zeroizing<Vec<u8>>, Error> {
        let usable = self
            .shares
            .values()
            .filter(|share| share.len() == key_len)
            .cloned()
            .collect::<Vec<_>>();
        let dropped = self.shares.len() - usable.len();

        if usable.len() < 2 {
            return Err(Error::InsufficientShares {
                have: usable.len(),
                skipped: self.skipped + dropped,
            });
        }

        Ok(shamir::reconstruct(&usable, key_len)?)
    }
}
