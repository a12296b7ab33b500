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

use crate::shamir::field::{FieldElement, FieldPoint};

/// One participant's piece of a split secret: every byte of the secret,
/// evaluated at this share's x value.
///
/// All shares of one split have the same length (the key length) and carry
/// distinct indices in `1..=MAX_SHARES`. Index 0 never occurs -- a share
/// evaluated at `x = 0` would *be* the secret.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShareVector {
    pub(crate) index: u16,
    pub(crate) ys: Vec<FieldElement>,
}

impl ShareVector {
    pub(crate) fn new(index: u16, ys: Vec<FieldElement>) -> Self {
        Self { index, ys }
    }

    /// The share's x value, `1..=MAX_SHARES`.
    pub fn index(&self) -> u16 {
        self.index
    }

    /// Number of field elements, equal to the byte length of the secret
    /// this share was split from.
    pub fn len(&self) -> usize {
        self.ys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ys.is_empty()
    }

    /// The (x, y) point this share contributes for byte position `b`.
    pub(crate) fn point_at(&self, b: usize) -> FieldPoint {
        (FieldElement::from_inner(self.index), self.ys[b])
    }
}

#[cfg(test)]
impl quickcheck::Arbitrary for ShareVector {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        Self {
            index: u16::arbitrary(g) % crate::shamir::MAX_SHARES + 1,
            ys: (0..g.size().max(1))
                .map(|_| FieldElement::arbitrary(g))
                .collect(),
        }
    }
}
