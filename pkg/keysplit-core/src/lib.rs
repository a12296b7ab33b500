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

#![forbid(unsafe_code)]

#[cfg(test)]
extern crate quickcheck;
#[cfg(test)]
#[macro_use]
extern crate quickcheck_macros;

/// Implementation of Shamir Secret Sharing over the prime field GF(257).
pub mod shamir;

/// The authenticated-encryption envelope the split key protects.
pub mod envelope;

/// JSON artifact formats for envelopes and shares.
pub mod wire;

/// Collection of untrusted share documents into a usable set.
pub mod recover;

pub use envelope::{open, seal, Envelope, PayloadMeta, MAX_PAYLOAD_BYTES};
pub use recover::ShareSet;
pub use shamir::{reconstruct, split, ShareVector, MAX_SHARES};
pub use wire::{EnvelopeDocument, ShareDocument};
