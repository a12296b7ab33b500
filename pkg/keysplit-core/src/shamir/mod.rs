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

//! This package implements Shamir Secret Sharing over the prime field
//! GF(257), byte-wise: each byte of the secret gets its own fresh random
//! polynomial, and share `i` collects the evaluations of every polynomial
//! at `x = i`. 257 is the smallest prime above 255, so every byte value is
//! a field element -- at the cost of share values needing 16-bit storage
//! (they can reach 256).
//!
//! ## Security ##
//! **This implementation is not remotely constant time and has not been
//! reviewed by any cryptographers. The scheme assumes a trusted dealer:
//! the integrity tags on encoded shares catch storage corruption, not a
//! dealer handing out inconsistent shares.**

pub mod field;
mod share;

pub use field::{FieldElement, PRIME};
pub use share::ShareVector;

use rand::rngs::OsRng;
use rayon::prelude::*;
use std::collections::BTreeMap;
use zeroize::Zeroizing;

use field::SecretPolynomial;

/// Most shares a single split may produce. Each share index must be a
/// distinct non-zero field element, but the practical ceiling sits far
/// below the field size.
pub const MAX_SHARES: u16 = 20;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid parameters: {0}")]
    InvalidParameters(&'static str),

    #[error("need at least 2 shares with distinct indices, got {have}")]
    InsufficientShares { have: usize },

    #[error("share {index} carries {actual} elements but the key is {expected} bytes")]
    ShareLengthMismatch {
        index: u16,
        expected: usize,
        actual: usize,
    },

    #[error("lagrange interpolation failed: {0}")]
    Interpolation(#[from] field::Error),
}

/// Split `secret` into `shares_count` shares such that any `threshold` of
/// them recover it.
///
/// Each byte is hidden behind its own polynomial of degree
/// `threshold - 1` with uniformly random coefficients from a CSPRNG; the
/// polynomial is dropped (and its coefficients wiped) as soon as the
/// evaluations exist. Fewer than `threshold` shares are
/// information-theoretically useless.
pub fn split(secret: &[u8], shares_count: u16, threshold: u16) -> Result<Vec<ShareVector>, Error> {
    // All parameter checks happen before any randomness is consumed.
    if secret.is_empty() {
        return Err(Error::InvalidParameters("secret must not be empty"));
    }
    if threshold < 2 {
        return Err(Error::InvalidParameters("threshold must be at least 2"));
    }
    if threshold > shares_count {
        return Err(Error::InvalidParameters(
            "threshold cannot exceed the number of shares (such a split is unrecoverable)",
        ));
    }
    if shares_count > MAX_SHARES {
        return Err(Error::InvalidParameters("too many shares requested"));
    }

    // One column of evaluations per secret byte. Byte positions are
    // independent, which makes this embarrassingly parallel.
    let columns = secret
        .par_iter()
        .map(|&byte| {
            let poly = SecretPolynomial::new_rand(byte, threshold - 1, &mut OsRng);
            (1..=shares_count)
                .map(|x| poly.evaluate(FieldElement::from_inner(x)))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    Ok((1..=shares_count)
        .map(|index| ShareVector {
            index,
            ys: columns
                .iter()
                .map(|column| column[index as usize - 1])
                .collect(),
        })
        .collect())
}

/// Recover a `key_len`-byte secret from the given shares by interpolating
/// every byte position at `x = 0`.
///
/// At least 2 distinct indices are required; enforcing the original
/// threshold is the caller's job. Given at-least-2-but-too-few shares this
/// still returns a well-formed key -- just not the right one. That is by
/// construction: the only reliable wrongness signal is the AEAD
/// verification downstream, so callers must not treat a successful return
/// as proof the secret was recovered.
pub fn reconstruct(shares: &[ShareVector], key_len: usize) -> Result<Zeroizing<Vec<u8>>, Error> {
    // Deduplicate by index (the last occurrence wins). The map keeps the
    // shares ordered by index, so the result is independent of the order
    // they were supplied in.
    let mut by_index = BTreeMap::new();
    for share in shares {
        if share.len() != key_len {
            return Err(Error::ShareLengthMismatch {
                index: share.index,
                expected: key_len,
                actual: share.len(),
            });
        }
        by_index.insert(share.index, share);
    }
    if by_index.len() < 2 {
        return Err(Error::InsufficientShares {
            have: by_index.len(),
        });
    }
    let shares = by_index.into_values().collect::<Vec<_>>();

    let secret = (0..key_len)
        .into_par_iter()
        .map(|b| {
            let points = shares.iter().map(|s| s.point_at(b)).collect::<Vec<_>>();
            field::lagrange_at_zero(&points).map(FieldElement::to_byte)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Zeroizing::new(secret))
}

#[cfg(test)]
mod test {
    use super::*;

    use itertools::Itertools;
    use quickcheck::TestResult;

    fn assert_invalid(result: Result<Vec<ShareVector>, Error>) {
        assert!(matches!(result, Err(Error::InvalidParameters(_))));
    }

    #[test]
    fn rejects_bad_parameters() {
        let secret = [1u8, 2, 3];
        assert_invalid(split(&[], 3, 2));
        assert_invalid(split(&secret, 3, 1));
        assert_invalid(split(&secret, 3, 0));
        assert_invalid(split(&secret, 2, 3));
        assert_invalid(split(&secret, MAX_SHARES + 1, 2));
    }

    #[test]
    fn boundary_parameters_roundtrip() {
        let secret = [42u8, 0, 255];

        // Smallest possible split.
        let shares = split(&secret, 2, 2).unwrap();
        assert_eq!(*reconstruct(&shares, secret.len()).unwrap(), secret);

        // Widest possible split.
        let shares = split(&secret, MAX_SHARES, 2).unwrap();
        assert_eq!(shares.len(), MAX_SHARES as usize);
        assert_eq!(
            *reconstruct(&shares[..2], secret.len()).unwrap(),
            secret
        );
    }

    // The documented example: a 2-byte key split 2-of-3.
    #[test]
    fn two_byte_key_two_of_three() {
        let secret = [10u8, 250];
        let shares = split(&secret, 3, 2).unwrap();
        assert_eq!(shares.len(), 3);
        assert!(shares.iter().all(|s| s.len() == 2));
        assert_eq!(
            shares.iter().map(ShareVector::index).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        let one_and_three = vec![shares[0].clone(), shares[2].clone()];
        let two_and_three = vec![shares[1].clone(), shares[2].clone()];
        assert_eq!(*reconstruct(&one_and_three, 2).unwrap(), secret);
        assert_eq!(*reconstruct(&two_and_three, 2).unwrap(), secret);

        assert!(matches!(
            reconstruct(&shares[..1], 2),
            Err(Error::InsufficientShares { have: 1 })
        ));
    }

    #[test]
    fn every_threshold_subset_recovers() {
        // Small enough n that every t-subset can be checked exhaustively.
        let secret = [7u8, 130, 255, 0, 64];
        for n in 2u16..=6 {
            for t in 2..=n {
                let shares = split(&secret, n, t).unwrap();
                for subset in shares.iter().cloned().combinations(t as usize) {
                    assert_eq!(
                        *reconstruct(&subset, secret.len()).unwrap(),
                        secret,
                        "t={} n={} subset failed",
                        t,
                        n
                    );
                }
            }
        }
    }

    #[test]
    fn full_parameter_grid_roundtrips() {
        for &key_len in &[1usize, 16, 32, 64] {
            let secret = (0..key_len).map(|i| (i * 37 % 256) as u8).collect::<Vec<_>>();
            for n in 2u16..=MAX_SHARES {
                for t in 2..=n {
                    let shares = split(&secret, n, t).unwrap();

                    // First t and last t shares are different subsets unless
                    // t == n; both must agree with the original.
                    let first = &shares[..t as usize];
                    let last = &shares[shares.len() - t as usize..];
                    assert_eq!(*reconstruct(first, key_len).unwrap(), secret);
                    assert_eq!(*reconstruct(last, key_len).unwrap(), secret);
                }
            }
        }
    }

    #[test]
    fn order_independence() {
        let secret = [200u8, 1, 99, 254];
        let shares = split(&secret, 5, 3).unwrap();

        let subset = vec![shares[0].clone(), shares[2].clone(), shares[4].clone()];
        for permutation in subset.iter().cloned().permutations(subset.len()) {
            assert_eq!(*reconstruct(&permutation, secret.len()).unwrap(), secret);
        }
    }

    #[test]
    fn duplicate_indices_collapse() {
        let secret = [17u8, 18];
        let shares = split(&secret, 3, 2).unwrap();

        // Two copies of one share are one share.
        let doubled = vec![shares[0].clone(), shares[0].clone()];
        assert!(matches!(
            reconstruct(&doubled, 2),
            Err(Error::InsufficientShares { have: 1 })
        ));

        // A duplicate alongside enough distinct shares is harmless.
        let padded = vec![shares[0].clone(), shares[1].clone(), shares[1].clone()];
        assert_eq!(*reconstruct(&padded, 2).unwrap(), secret);
    }

    #[test]
    fn below_threshold_yields_wrong_key() {
        let secret = (0u8..32).collect::<Vec<_>>();
        let shares = split(&secret, 5, 3).unwrap();

        // Two of five shares interpolate *something*, but with 32 bytes the
        // chance of it matching the real key is negligible.
        let recovered = reconstruct(&shares[..2], secret.len()).unwrap();
        assert_eq!(recovered.len(), secret.len());
        assert_ne!(*recovered, secret);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let shares = split(&[1u8, 2, 3], 3, 2).unwrap();
        assert!(matches!(
            reconstruct(&shares, 2),
            Err(Error::ShareLengthMismatch { expected: 2, actual: 3, .. })
        ));
    }

    #[quickcheck]
    fn split_reconstruct_roundtrip(secret: Vec<u8>, n: u8, t: u8) -> TestResult {
        let n = (n % MAX_SHARES as u8) + 1;
        let t = (t % n) + 1;
        if secret.is_empty() || secret.len() > 128 || t < 2 {
            return TestResult::discard();
        }

        let shares = match split(&secret, n as u16, t as u16) {
            Ok(shares) => shares,
            Err(_) => return TestResult::failed(),
        };
        let recovered = reconstruct(&shares[..t as usize], secret.len()).unwrap();
        TestResult::from_bool(*recovered == secret)
    }

    #[quickcheck]
    fn shares_do_not_leak_length_structure(secret: Vec<u8>) -> TestResult {
        if secret.is_empty() || secret.len() > 64 {
            return TestResult::discard();
        }
        let shares = split(&secret, 4, 2).unwrap();
        TestResult::from_bool(shares.iter().all(|s| s.len() == secret.len()))
    }
}
