use num_bigint::BigInt;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum Error {
    #[display(fmt = "invalid parameters: {}", reason)]
    InvalidParameters { reason: String },
    #[display(fmt = "ring degree mismatch: expected {}, found {}", expected, found)]
    DegreeMismatch { expected: usize, found: usize },
    #[display(fmt = "ciphertext modulus mismatch: {} vs {}", lhs, rhs)]
    ModulusMismatch { lhs: BigInt, rhs: BigInt },
    #[display(fmt = "scale mismatch: {} vs {}", lhs, rhs)]
    ScaleMismatch { lhs: f64, rhs: f64 },
    #[display(fmt = "cannot encode {} values into {} slots", found, slots)]
    TooManySlots { found: usize, slots: usize },
    #[display(fmt = "unsupported operation: {}", reason)]
    Unsupported { reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid_parameters(reason: impl Into<String>) -> Self {
        Self::InvalidParameters {
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(reason: impl Into<String>) -> Self {
        Self::Unsupported {
            reason: reason.into(),
        }
    }
}
