//! The canonical embedding restricted to `n / 2` slots.
//!
//! A polynomial `p` of `\mathbb{R}[X]/(X^n + 1)` is identified with the vector
//! `(p(ζ^{5^0}), p(ζ^{5^1}), ..., p(ζ^{5^{n/2-1}}))` for `ζ = exp(πi / n)`.  The remaining `n / 2`
//! evaluations are the complex conjugates of these, so they carry no extra information.  Both
//! directions are computed with `O(n log n)` butterflies over the rotation group generated by 5.

use std::f64::consts::PI;

use num_complex::Complex64;

#[derive(Clone, Debug)]
pub struct EmbeddingContext {
    num_slots: usize,
    /// `roots[k] = exp(2πik / 2n)` for `k` in `0..=2n`.
    roots: Vec<Complex64>,
    /// `rot_group[j] = 5^j mod 2n`.
    rot_group: Vec<usize>,
}

impl EmbeddingContext {
    pub fn new(poly_degree: usize) -> Self {
        debug_assert!(poly_degree >= 2);
        debug_assert!(poly_degree.is_power_of_two());

        let m = 2 * poly_degree;
        let num_slots = poly_degree / 2;
        let roots = (0..=m)
            .map(|k| Complex64::from_polar(1.0, 2.0 * PI * k as f64 / m as f64))
            .collect();
        let mut rot_group = Vec::with_capacity(num_slots);
        let mut power = 1;
        for _ in 0..num_slots {
            rot_group.push(power);
            power = power * 5 % m;
        }

        Self {
            num_slots,
            roots,
            rot_group,
        }
    }

    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    /// Evaluates the polynomial whose coefficients are `(Re u_i)` and `(Im u_i)` (in the first and
    /// second half, respectively) at the slot roots, in place.
    pub fn embedding(&self, values: &mut [Complex64]) {
        let size = values.len();
        debug_assert_eq!(size, self.num_slots);
        let m = self.roots.len() - 1;

        bit_reverse(values);
        let mut len = 2;
        while len <= size {
            let half = len / 2;
            let quarter_modulus = 4 * len;
            for i in (0..size).step_by(len) {
                for j in 0..half {
                    let index = (self.rot_group[j] % quarter_modulus) * (m / quarter_modulus);
                    let u = values[i + j];
                    let v = values[i + j + half] * self.roots[index];
                    values[i + j] = u + v;
                    values[i + j + half] = u - v;
                }
            }
            len *= 2;
        }
    }

    /// Inverse of [`EmbeddingContext::embedding`], in place.
    pub fn embedding_inverse(&self, values: &mut [Complex64]) {
        let size = values.len();
        debug_assert_eq!(size, self.num_slots);
        let m = self.roots.len() - 1;

        let mut len = size;
        while len >= 2 {
            let half = len / 2;
            let quarter_modulus = 4 * len;
            for i in (0..size).step_by(len) {
                for j in 0..half {
                    let index = (quarter_modulus - self.rot_group[j] % quarter_modulus)
                        * (m / quarter_modulus);
                    let u = values[i + j] + values[i + j + half];
                    let v = (values[i + j] - values[i + j + half]) * self.roots[index];
                    values[i + j] = u;
                    values[i + j + half] = v;
                }
            }
            len /= 2;
        }
        bit_reverse(values);

        let scale = size as f64;
        for value in values.iter_mut() {
            *value /= scale;
        }
    }
}

fn bit_reverse(values: &mut [Complex64]) {
    let size = values.len();
    let mut j = 0;
    for i in 1..size {
        let mut bit = size >> 1;
        while j >= bit {
            j -= bit;
            bit >>= 1;
        }
        j += bit;
        if i < j {
            values.swap(i, j);
        }
    }
}
