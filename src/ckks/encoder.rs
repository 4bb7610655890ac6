use log::trace;
use num_complex::Complex64;
use num_traits::ToPrimitive;

use super::{check_scaling_factor, fft::EmbeddingContext, CkksParameters, Plaintext};
use crate::{
    error::{Error, Result},
    poly::Polynomial,
};

/// Maps vectors of up to `n / 2` complex numbers to plaintext polynomials and back.
#[derive(Clone, Debug)]
pub struct CkksEncoder {
    params: CkksParameters,
    embedding: EmbeddingContext,
}

impl CkksEncoder {
    pub fn new(params: &CkksParameters) -> Self {
        Self {
            params: params.clone(),
            embedding: EmbeddingContext::new(params.poly_degree()),
        }
    }

    /// Encodes `values` at the given scale.  Shorter inputs are padded with zeros.
    ///
    /// The scale must be finite and at least 1, and all values must be finite.
    pub fn encode(&self, values: &[Complex64], scaling_factor: f64) -> Result<Plaintext> {
        check_scaling_factor(scaling_factor)?;
        let num_slots = self.embedding.num_slots();
        if values.len() > num_slots {
            return Err(Error::TooManySlots {
                found: values.len(),
                slots: num_slots,
            });
        }
        if let Some(value) = values.iter().find(|z| !z.is_finite()) {
            return Err(Error::invalid_parameters(format!(
                "cannot encode non-finite value {}",
                value
            )));
        }

        let mut slots = values.to_vec();
        slots.resize(num_slots, Complex64::new(0.0, 0.0));
        self.embedding.embedding_inverse(&mut slots);

        let coeffs: Vec<f64> = slots
            .iter()
            .map(|z| z.re * scaling_factor)
            .chain(slots.iter().map(|z| z.im * scaling_factor))
            .collect();
        trace!("encoded {} values at scale 2^{:.1}", values.len(), scaling_factor.log2());

        Ok(Plaintext {
            poly: Polynomial::round_f64(&coeffs),
            scaling_factor,
        })
    }

    pub fn encode_real(&self, values: &[f64], scaling_factor: f64) -> Result<Plaintext> {
        let values: Vec<_> = values.iter().map(|&v| Complex64::new(v, 0.0)).collect();
        self.encode(&values, scaling_factor)
    }

    /// Decodes all `n / 2` slots of `plaintext`.
    pub fn decode(&self, plaintext: &Plaintext) -> Result<Vec<Complex64>> {
        plaintext.poly.check_degree(self.params.poly_degree())?;
        let num_slots = self.embedding.num_slots();
        let coeffs: Vec<f64> = plaintext
            .poly
            .coeffs()
            .iter()
            .map(|c| c.to_f64().unwrap_or(f64::NAN) / plaintext.scaling_factor)
            .collect();

        let mut slots: Vec<Complex64> = (0..num_slots)
            .map(|i| Complex64::new(coeffs[i], coeffs[i + num_slots]))
            .collect();
        self.embedding.embedding(&mut slots);
        Ok(slots)
    }
}
