pub mod ntt;

use std::{
    borrow::Cow,
    ops::{AddAssign, Neg, SubAssign},
};

use log::trace;
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{FromPrimitive, One, Signed, Zero};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// From this ring degree on, [`Polynomial::multiply`] switches from the schoolbook product to the
/// number-theoretic transform.
pub const NTT_THRESHOLD: usize = 64;

/// An element of the negacyclic ring `\mathbb{Z}[X]/(X^n + 1)`, stored as its `n` coefficients in
/// ascending order of powers.
///
/// Coefficients are arbitrary-precision signed integers.  Operations that take an optional modulus
/// reduce their result into `[0, q)`; without a modulus they compute over the integers.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Polynomial {
    coeffs: Vec<BigInt>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum MulStrategy {
    Auto,
    Schoolbook,
    Ntt,
}

impl Polynomial {
    pub fn new(coeffs: Vec<BigInt>) -> Self {
        Self { coeffs }
    }

    pub fn zero(ring_degree: usize) -> Self {
        Self {
            coeffs: vec![BigInt::zero(); ring_degree],
        }
    }

    /// The constant polynomial `value`.  For `ring_degree == 0` this is the empty polynomial.
    pub fn constant(ring_degree: usize, value: BigInt) -> Self {
        let mut this = Self::zero(ring_degree);
        if let Some(first) = this.coeffs.first_mut() {
            *first = value;
        }
        this
    }

    pub fn from_i64s(source: &[i64]) -> Self {
        Self {
            coeffs: source.iter().map(|&c| BigInt::from(c)).collect(),
        }
    }

    /// Rounds every value to the nearest integer (halves away from zero).  Non-finite values become
    /// zero.
    pub fn round_f64(values: &[f64]) -> Self {
        Self {
            coeffs: values
                .iter()
                .map(|v| BigInt::from_f64(v.round()).unwrap_or_default())
                .collect(),
        }
    }

    pub fn ring_degree(&self) -> usize {
        self.coeffs.len()
    }

    pub fn coeffs(&self) -> &[BigInt] {
        &self.coeffs
    }

    pub fn into_coeffs(self) -> Vec<BigInt> {
        self.coeffs
    }

    pub(crate) fn check_degree(&self, expected: usize) -> Result<()> {
        if self.ring_degree() == expected {
            Ok(())
        } else {
            Err(Error::DegreeMismatch {
                expected,
                found: self.ring_degree(),
            })
        }
    }

    pub fn add(&self, rhs: &Self, modulus: Option<&BigInt>) -> Result<Self> {
        rhs.check_degree(self.ring_degree())?;
        let mut sum = self.clone();
        sum += rhs;
        Ok(sum.reduced_opt(modulus))
    }

    pub fn subtract(&self, rhs: &Self, modulus: Option<&BigInt>) -> Result<Self> {
        rhs.check_degree(self.ring_degree())?;
        let mut difference = self.clone();
        difference -= rhs;
        Ok(difference.reduced_opt(modulus))
    }

    /// Multiplies in `\mathbb{Z}[X]/(X^n + 1)` and optionally reduces modulo `modulus`.
    ///
    /// With a modulus, both operands are first brought into their centered representation, which
    /// keeps the intermediate products small.  Small rings use the schoolbook product, larger ones
    /// the NTT (see [`NTT_THRESHOLD`]).  Both strategies compute exactly the same result.
    pub fn multiply(&self, rhs: &Self, modulus: Option<&BigInt>) -> Result<Self> {
        self.multiply_with(rhs, modulus, MulStrategy::Auto)
    }

    pub fn multiply_schoolbook(&self, rhs: &Self, modulus: Option<&BigInt>) -> Result<Self> {
        self.multiply_with(rhs, modulus, MulStrategy::Schoolbook)
    }

    pub fn multiply_ntt(&self, rhs: &Self, modulus: Option<&BigInt>) -> Result<Self> {
        self.multiply_with(rhs, modulus, MulStrategy::Ntt)
    }

    fn multiply_with(
        &self,
        rhs: &Self,
        modulus: Option<&BigInt>,
        strategy: MulStrategy,
    ) -> Result<Self> {
        rhs.check_degree(self.ring_degree())?;

        let (lhs, rhs) = match modulus {
            Some(q) => (
                Cow::Owned(self.reduce_centered(q)),
                Cow::Owned(rhs.reduce_centered(q)),
            ),
            None => (Cow::Borrowed(self), Cow::Borrowed(rhs)),
        };

        let n = self.ring_degree();
        let use_ntt = match strategy {
            MulStrategy::Auto => n >= NTT_THRESHOLD,
            MulStrategy::Schoolbook => false,
            MulStrategy::Ntt => true,
        };
        // The transform needs at least two points.
        let coeffs = if use_ntt && n >= 2 {
            trace!("multiplying degree-{} polynomials via NTT", n);
            ntt::negacyclic_multiply(&lhs.coeffs, &rhs.coeffs)
        } else {
            negacyclic_schoolbook(&lhs.coeffs, &rhs.coeffs)
        };

        Ok(Self { coeffs }.reduced_opt(modulus))
    }

    pub fn scalar_multiply(&self, scalar: &BigInt, modulus: Option<&BigInt>) -> Self {
        Self {
            coeffs: self.coeffs.iter().map(|c| c * scalar).collect(),
        }
        .reduced_opt(modulus)
    }

    pub fn negate(&self, modulus: Option<&BigInt>) -> Self {
        (-self).reduced_opt(modulus)
    }

    /// Replaces every coefficient `c` by `round(c * numerator / denominator)`, where ties are
    /// rounded up.  `denominator` must be positive.
    pub fn scale_and_round(&self, numerator: &BigInt, denominator: &BigInt) -> Self {
        let twice_denominator = denominator << 1;
        Self {
            coeffs: self
                .coeffs
                .iter()
                .map(|c| ((c * numerator << 1u32) + denominator).div_floor(&twice_denominator))
                .collect(),
        }
    }

    /// Divides every coefficient by `divisor` and rounds to the nearest integer.
    pub fn divide_round(&self, divisor: &BigInt) -> Self {
        self.scale_and_round(&BigInt::one(), divisor)
    }

    /// Reduces every coefficient into `[0, modulus)`.
    pub fn reduce(&self, modulus: &BigInt) -> Self {
        self.clone().reduced(modulus)
    }

    /// Reduces every coefficient into `(-modulus/2, modulus/2]`.
    pub fn reduce_centered(&self, modulus: &BigInt) -> Self {
        let half = modulus >> 1;
        Self {
            coeffs: self
                .coeffs
                .iter()
                .map(|c| {
                    let r = c.mod_floor(modulus);
                    if r > half {
                        r - modulus
                    } else {
                        r
                    }
                })
                .collect(),
        }
    }

    /// Splits the polynomial into `num_levels` digit polynomials `d_i` with coefficients in
    /// `[0, base)` such that `self = \sum_i d_i * base^i`, given that all coefficients of `self` lie
    /// in `[0, base^num_levels)`.
    pub fn base_decompose(&self, base: &BigInt, num_levels: usize) -> Vec<Self> {
        let mut remainder = self.coeffs.clone();
        (0..num_levels)
            .map(|_| Self {
                coeffs: remainder
                    .iter_mut()
                    .map(|c| {
                        let (quotient, digit) = c.div_mod_floor(base);
                        *c = quotient;
                        digit
                    })
                    .collect(),
            })
            .collect()
    }

    /// The largest absolute value among the coefficients.
    pub fn infinity_norm(&self) -> BigInt {
        self.coeffs
            .iter()
            .map(|c| c.abs())
            .max()
            .unwrap_or_default()
    }

    /// `p(1) mod modulus`. Over `Z_{2^k}[X]/(X^n + 1)` the polynomial is a unit exactly when this
    /// is odd.
    pub fn evaluate_at_one_mod(&self, modulus: &BigInt) -> BigInt {
        self.coeffs.iter().sum::<BigInt>().mod_floor(modulus)
    }

    fn reduced(mut self, modulus: &BigInt) -> Self {
        for c in self.coeffs.iter_mut() {
            *c = c.mod_floor(modulus);
        }
        self
    }

    fn reduced_opt(self, modulus: Option<&BigInt>) -> Self {
        match modulus {
            Some(q) => self.reduced(q),
            None => self,
        }
    }
}

impl AddAssign<&Self> for Polynomial {
    fn add_assign(&mut self, rhs: &Self) {
        debug_assert_eq!(self.ring_degree(), rhs.ring_degree());
        for (dst, src) in self.coeffs.iter_mut().zip(rhs.coeffs.iter()) {
            *dst += src;
        }
    }
}

impl SubAssign<&Self> for Polynomial {
    fn sub_assign(&mut self, rhs: &Self) {
        debug_assert_eq!(self.ring_degree(), rhs.ring_degree());
        for (dst, src) in self.coeffs.iter_mut().zip(rhs.coeffs.iter()) {
            *dst -= src;
        }
    }
}

impl Neg for Polynomial {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            coeffs: self.coeffs.into_iter().map(|c| -c).collect(),
        }
    }
}

impl Neg for &Polynomial {
    type Output = Polynomial;

    fn neg(self) -> Polynomial {
        -self.clone()
    }
}

fn negacyclic_schoolbook(lhs: &[BigInt], rhs: &[BigInt]) -> Vec<BigInt> {
    let n = lhs.len();
    let mut result = vec![BigInt::zero(); n];
    for (i, a) in lhs.iter().enumerate() {
        if a.is_zero() {
            continue;
        }
        for (j, b) in rhs.iter().enumerate() {
            let product = a * b;
            // X^n = -1
            if i + j < n {
                result[i + j] += product;
            } else {
                result[i + j - n] -= product;
            }
        }
    }
    result
}
