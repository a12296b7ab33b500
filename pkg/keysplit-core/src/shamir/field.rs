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

use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use rand::{CryptoRng, Rng};
use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("[critical security issue] all points must have distinct, invertible x values")]
    NonInvertiblePoint,
}

/// Primitive uint type for field elements.
pub type FieldElemPrimitive = u16;

/// The field prime. The smallest prime above 255, so every byte value is a
/// field element and no byte is ambiguous after reduction.
pub const PRIME: FieldElemPrimitive = 257;

/// An element of the prime field `GF(257)`.
///
/// Values range over `[0, 256]` inclusive, one more than a byte can hold;
/// any serialisation must keep the full 16-bit width or share value 256
/// silently truncates.
// NOTE: PartialEq is not timing-safe.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Zeroize)]
pub struct FieldElement(FieldElemPrimitive);

/// (x, y) in GF(257).
pub type FieldPoint = (FieldElement, FieldElement);

impl FieldElement {
    /// Additive identity.
    pub const ZERO: FieldElement = FieldElement(0);

    /// Multiplicative identity.
    pub const ONE: FieldElement = FieldElement(1);

    /// Draw a uniformly random field element. `gen_range` is unbiased, which
    /// the secret-sharing security argument depends on.
    pub fn new_rand<R: Rng + CryptoRng + ?Sized>(r: &mut R) -> Self {
        Self(r.gen_range(0..PRIME))
    }

    pub(crate) fn inner(&self) -> FieldElemPrimitive {
        self.0
    }

    pub(crate) fn from_inner(v: FieldElemPrimitive) -> Self {
        Self(v % PRIME)
    }

    pub(crate) fn from_byte(b: u8) -> Self {
        Self(b as FieldElemPrimitive)
    }

    /// Reduce to a byte. Interpolation over inconsistent or below-threshold
    /// share sets can land on 256; the wrap keeps the result a byte (such a
    /// key is wrong either way and only fails later, at AEAD verification).
    pub(crate) fn to_byte(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    // NOTE: Definitely not constant-time.
    pub fn pow(self, mut n: u32) -> Self {
        // Exponentiation by squaring, O(log(n)) multiplications rather than
        // the obvious O(n).
        let mut mult = self;
        let mut result = Self::ONE;
        while n != 0 {
            if n & 1 == 1 {
                result *= mult;
            }
            mult *= mult;
            n >>= 1;
        }
        result
    }

    /// Multiplicative inverse via the extended Euclidean algorithm against
    /// the field prime. `None` iff the element is zero.
    pub fn inverse(self) -> Option<Self> {
        if self == Self::ZERO {
            return None;
        }

        let (mut r, mut newr) = (PRIME as i32, self.0 as i32);
        let (mut t, mut newt) = (0i32, 1i32);
        while newr != 0 {
            let q = r / newr;
            (t, newt) = (newt, t - q * newt);
            (r, newr) = (newr, r - q * newr);
        }

        // gcd(a, P) with P prime and a non-zero is always 1.
        debug_assert_eq!(r, 1);
        Some(Self(t.rem_euclid(PRIME as i32) as FieldElemPrimitive))
    }
}

#[cfg(test)]
impl quickcheck::Arbitrary for FieldElement {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        Self(FieldElemPrimitive::arbitrary(g) % PRIME)
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        Box::new(self.0.shrink().into_iter().map(|v| Self(v % PRIME)))
    }
}

impl Add for FieldElement {
    type Output = Self;
    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl AddAssign for FieldElement {
    fn add_assign(&mut self, rhs: Self) {
        // Both operands are reduced, so the sum fits a u16.
        self.0 = (self.0 + rhs.0) % PRIME;
    }
}

impl Sub for FieldElement {
    type Output = Self;
    fn sub(mut self, rhs: Self) -> Self::Output {
        self -= rhs;
        self
    }
}

impl SubAssign for FieldElement {
    fn sub_assign(&mut self, rhs: Self) {
        // Lift above zero before reducing so no negative residue surfaces.
        self.0 = (self.0 + PRIME - rhs.0) % PRIME;
    }
}

impl Neg for FieldElement {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self((PRIME - self.0) % PRIME)
    }
}

impl Mul for FieldElement {
    type Output = Self;
    fn mul(mut self, rhs: Self) -> Self::Output {
        self *= rhs;
        self
    }
}

impl MulAssign for FieldElement {
    fn mul_assign(&mut self, rhs: Self) {
        // 256 * 256 overflows a u16 by exactly one, so widen first.
        self.0 = ((self.0 as u32 * rhs.0 as u32) % PRIME as u32) as FieldElemPrimitive;
    }
}

/// A polynomial in `GF(257)` whose constant term is the secret byte.
// The coefficients are in *increasing* degree.
#[derive(Clone, Debug, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretPolynomial(Vec<FieldElement>);

impl SecretPolynomial {
    /// Fresh polynomial of degree `degree` hiding `secret`: the constant
    /// term is the secret byte, every higher coefficient is drawn uniformly
    /// from the whole field.
    pub fn new_rand<R: Rng + CryptoRng + ?Sized>(secret: u8, degree: u16, r: &mut R) -> Self {
        let mut coeffs = Vec::with_capacity(degree as usize + 1);
        coeffs.push(FieldElement::from_byte(secret));
        coeffs.extend((0..degree).map(|_| FieldElement::new_rand(r)));
        Self(coeffs)
    }

    pub fn degree(&self) -> u16 {
        match self.0.len() {
            0 => panic!("SecretPolynomial must have at least one element"),
            n => (n - 1) as u16,
        }
    }

    /// Retrieve the constant term of the polynomial.
    pub fn constant(&self) -> FieldElement {
        *self
            .0
            .first()
            .expect("SecretPolynomial must have at least one element")
    }

    /// Evaluate the polynomial at a given `x` value.
    pub fn evaluate(&self, x: FieldElement) -> FieldElement {
        // Horner's method: n additions and n multiplications. Coefficients
        // are stored in increasing degree, so fold in reverse.
        self.0
            .iter()
            .rev()
            .fold(FieldElement::ZERO, |acc, coeff| *coeff + x * acc)
    }
}

#[cfg(test)]
impl quickcheck::Arbitrary for SecretPolynomial {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        SecretPolynomial(
            (0..g.size().max(1))
                .map(|_| FieldElement::arbitrary(g))
                .collect::<Vec<_>>(),
        )
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        Box::new(
            self.0
                .shrink()
                .into_iter()
                .filter(|p| !p.is_empty())
                .map(Self),
        )
    }
}

/// Interpolate the constant term of the polynomial passing through
/// `points`, i.e. its value at `x = 0`.
///
/// The process for this computation is [Lagrange interpolation][lagrange]:
///
/// ```text
///   L(0) = \sum_{j=0}^{k} y_j \prod_{m=0,m!=j}^{k} \frac{0 - x_m}{x_j - x_m}
/// ```
///
/// Only the constant term is ever needed, so the full multi-binomial
/// expansion of the Lagrange basis is avoided entirely.
///
/// [lagrange]: https://en.wikipedia.org/wiki/Lagrange_polynomial
pub fn lagrange_at_zero(points: &[FieldPoint]) -> Result<FieldElement, Error> {
    points
        .iter()
        .enumerate()
        .try_fold(FieldElement::ZERO, |acc, (j, &(xj, yj))| {
            let mut num = FieldElement::ONE;
            let mut den = FieldElement::ONE;
            for (m, &(xm, _)) in points.iter().enumerate() {
                if m == j {
                    continue;
                }
                num *= -xm;
                den *= xj - xm;
            }
            // A zero denominator means two points share an x value.
            let den_inv = den.inverse().ok_or(Error::NonInvertiblePoint)?;
            Ok(acc + yj * num * den_inv)
        })
}

#[cfg(test)]
mod test {
    use super::*;

    use quickcheck::TestResult;
    use rand::rngs::OsRng;

    #[quickcheck]
    fn add_commutativity(a: FieldElement, b: FieldElement) -> bool {
        (a + b) == (b + a)
    }

    #[quickcheck]
    fn mul_commutativity(a: FieldElement, b: FieldElement) -> bool {
        (a * b) == (b * a)
    }

    #[quickcheck]
    fn add_associativity(a: FieldElement, b: FieldElement, c: FieldElement) -> bool {
        ((a + b) + c) == (a + (b + c))
    }

    #[quickcheck]
    fn mul_associativity(a: FieldElement, b: FieldElement, c: FieldElement) -> bool {
        ((a * b) * c) == (a * (b * c))
    }

    #[quickcheck]
    fn add_identity(a: FieldElement) -> bool {
        (a + FieldElement::ZERO) == a
    }

    #[quickcheck]
    fn mul_identity(a: FieldElement) -> bool {
        (a * FieldElement::ONE) == a
    }

    #[quickcheck]
    fn mul_zero(a: FieldElement) -> bool {
        (a * FieldElement::ZERO) == FieldElement::ZERO
    }

    #[quickcheck]
    fn add_inverse(a: FieldElement) -> bool {
        (a + -a) == FieldElement::ZERO && (a - a) == FieldElement::ZERO
    }

    #[quickcheck]
    fn distributivity(a: FieldElement, b: FieldElement, c: FieldElement) -> bool {
        (a * (b + c)) == ((a * b) + (a * c))
    }

    #[quickcheck]
    fn sub_add_roundtrip(a: FieldElement, b: FieldElement) -> bool {
        ((a - b) + b) == a
    }

    // The field is small enough to check every element, so do exactly that
    // rather than trusting sampling.
    #[test]
    fn inverse_exhaustive() {
        assert!(FieldElement::ZERO.inverse().is_none());
        for v in 1..PRIME {
            let a = FieldElement(v);
            let a_inv = a.inverse().expect("non-zero element must be invertible");
            assert_eq!(a * a_inv, FieldElement::ONE, "{} * {} != 1", v, a_inv.0);
        }
    }

    #[test]
    fn mul_exhaustive_in_range() {
        for a in 0..PRIME {
            for b in 0..PRIME {
                let prod = FieldElement(a) * FieldElement(b);
                assert!(prod.0 < PRIME);
                assert_eq!(prod.0 as u64, (a as u64 * b as u64) % PRIME as u64);
            }
        }
    }

    #[quickcheck]
    fn pow_matches_repeated_multiplication(a: FieldElement, n: u8) -> bool {
        let manual = (0..n).fold(FieldElement::ONE, |acc, _| acc * a);
        a.pow(n as u32) == manual
    }

    #[test]
    fn pow_zero_is_one() {
        assert_eq!(FieldElement::ZERO.pow(0), FieldElement::ONE);
        assert_eq!(FieldElement(200).pow(0), FieldElement::ONE);
    }

    // Inefficient, but "obviously correct" implementation of
    // SecretPolynomial::evaluate(), to compare against for the test.
    fn manual_poly(poly: &SecretPolynomial, x: FieldElement) -> FieldElement {
        poly.0
            .iter()
            .enumerate()
            .map(|(n, coeff)| *coeff * x.pow(n as u32))
            .fold(FieldElement::ZERO, Add::add)
    }

    #[quickcheck]
    fn polynomial_evaluate(poly: SecretPolynomial, x: FieldElement) -> bool {
        poly.evaluate(x) == manual_poly(&poly, x)
    }

    #[quickcheck]
    fn polynomial_constant(poly: SecretPolynomial) -> bool {
        poly.evaluate(FieldElement::ZERO) == poly.constant()
    }

    #[quickcheck]
    fn polynomial_lagrange_constant(secret: u8, degree: u8) -> TestResult {
        // Interpolation needs degree+1 distinct non-zero x values, and the
        // field only has 256 of those.
        let degree = (degree % 32) as u16;
        let poly = SecretPolynomial::new_rand(secret, degree, &mut OsRng);

        let points = (1..=degree + 1)
            .map(|x| {
                let x = FieldElement::from_inner(x);
                (x, poly.evaluate(x))
            })
            .collect::<Vec<_>>();
        let constant =
            lagrange_at_zero(&points).expect("distinct x values must interpolate cleanly");

        TestResult::from_bool(constant == poly.constant())
    }

    #[test]
    fn lagrange_rejects_duplicate_x() {
        let x = FieldElement::from_inner(3);
        let points = vec![(x, FieldElement::from_inner(5)), (x, FieldElement::from_inner(9))];
        assert!(matches!(
            lagrange_at_zero(&points),
            Err(Error::NonInvertiblePoint)
        ));
    }

    #[test]
    fn lagrange_known_line() {
        // f(x) = 7 + 3x through x = 1, 2; f(0) = 7.
        let f = |x: u16| FieldElement::from_inner(7 + 3 * x);
        let points = vec![
            (FieldElement::from_inner(1), f(1)),
            (FieldElement::from_inner(2), f(2)),
        ];
        assert_eq!(lagrange_at_zero(&points).unwrap(), FieldElement::from_inner(7));
    }
}
