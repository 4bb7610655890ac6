//! Ring-LWE homomorphic encryption over `\mathbb{Z}[X]/(X^n + 1)` with arbitrary-precision
//! moduli: the BFV scheme for exact integer arithmetic and the CKKS scheme for approximate
//! arithmetic on complex vectors.

pub mod bfv;
pub mod ckks;
pub mod error;
pub mod poly;
pub mod rlwe;
pub mod sampling;
pub mod util;

pub use error::{Error, Result};

pub mod examples {
    use std::error::Error;
    use std::time::Instant;

    use log::info;
    use num_complex::Complex64;
    use rand::{CryptoRng, RngCore};

    use crate::{
        bfv::{self, BfvDecryptor, BfvEncryptor, BfvEvaluator, BfvKeyGenerator, BfvParameters},
        ckks::{
            CkksDecryptor, CkksEncoder, CkksEncryptor, CkksEvaluator, CkksKeyGenerator,
            CkksParameters,
        },
    };

    pub const BFV_MESSAGE1: [i64; 16] = [
        246, 211, 243, 250, 152, 111, 147, 153, 73, 244, 58, 61, 63, 49, 93, 168,
    ];
    pub const BFV_MESSAGE2: [i64; 16] = [
        24, 122, 109, 170, 26, 28, 180, 110, 39, 223, 78, 100, 177, 114, 3, 91,
    ];

    /// Encrypts two fixed vectors, then adds, subtracts and multiplies them homomorphically.
    pub fn bfv<R>(params: &BfvParameters, rng: &mut R) -> Result<(), Box<dyn Error>>
    where
        R: CryptoRng + RngCore,
    {
        println!("{}", params);
        let n = params.poly_degree();
        let message1: Vec<i64> = BFV_MESSAGE1.iter().cycle().take(n).copied().collect();
        let message2: Vec<i64> = BFV_MESSAGE2.iter().cycle().take(n).copied().collect();

        let now = Instant::now();
        let keygen = BfvKeyGenerator::new(params, rng)?;
        info!("key generation took {} ms", now.elapsed().as_millis());

        let encryptor = BfvEncryptor::new(params, keygen.public_key());
        let decryptor = BfvDecryptor::new(params, keygen.secret_key());
        let evaluator = BfvEvaluator::new(params);

        let ct1 = encryptor.encrypt(&bfv::Plaintext::new(params, &message1)?, rng)?;
        let ct2 = encryptor.encrypt(&bfv::Plaintext::new(params, &message2)?, rng)?;
        println!("message 1: {:?}", message1);
        println!("message 2: {:?}", message2);

        let sum = evaluator.add(&ct1, &ct2)?;
        println!("sum: {}", format_coeffs(decryptor.decrypt(&sum)?.coeffs()));

        let difference = evaluator.subtract(&ct1, &ct2)?;
        println!(
            "difference: {}",
            format_coeffs(decryptor.decrypt(&difference)?.coeffs())
        );

        let now = Instant::now();
        let product = evaluator.multiply(&ct1, &ct2, keygen.relin_key())?;
        info!("multiplication took {} ms", now.elapsed().as_millis());
        println!("product: {}", format_coeffs(decryptor.decrypt(&product)?.coeffs()));
        println!(
            "noise budget: {} bits fresh, {} bits after multiplication",
            decryptor.invariant_noise_budget(&ct1)?,
            decryptor.invariant_noise_budget(&product)?
        );
        Ok(())
    }

    /// Encrypts two fixed complex vectors, then adds, subtracts and multiplies them
    /// homomorphically.
    pub fn ckks<R>(params: &CkksParameters, rng: &mut R) -> Result<(), Box<dyn Error>>
    where
        R: CryptoRng + RngCore,
    {
        println!("{}", params);
        let message1 = [
            Complex64::new(0.5, 0.0),
            Complex64::new(0.3, 0.2),
            Complex64::new(0.78, 0.0),
            Complex64::new(0.0, 0.88),
        ];
        let message2 = [
            Complex64::new(0.2, 0.0),
            Complex64::new(0.11, 0.0),
            Complex64::new(0.4, 0.67),
            Complex64::new(0.9, 0.99),
        ];
        let num_values = params.num_slots().min(message1.len());

        let now = Instant::now();
        let keygen = CkksKeyGenerator::new(params, rng)?;
        info!("key generation took {} ms", now.elapsed().as_millis());

        let encoder = CkksEncoder::new(params);
        let encryptor = CkksEncryptor::new(params, keygen.public_key());
        let decryptor = CkksDecryptor::new(params, keygen.secret_key());
        let evaluator = CkksEvaluator::new(params);

        let plain1 = encoder.encode(&message1[..num_values], params.scale())?;
        let plain2 = encoder.encode(&message2[..num_values], params.scale())?;
        let ct1 = encryptor.encrypt(&plain1, rng)?;
        let ct2 = encryptor.encrypt(&plain2, rng)?;
        println!("message 1: {:?}", &message1[..num_values]);
        println!("message 2: {:?}", &message2[..num_values]);

        let sum = evaluator.add(&ct1, &ct2)?;
        println!("sum: {:?}", &encoder.decode(&decryptor.decrypt(&sum)?)?[..num_values]);

        let difference = evaluator.subtract(&ct1, &ct2)?;
        println!(
            "difference: {:?}",
            &encoder.decode(&decryptor.decrypt(&difference)?)?[..num_values]
        );

        let now = Instant::now();
        let product = evaluator.multiply(&ct1, &ct2, keygen.relin_key())?;
        let product = evaluator.rescale(&product, params.scaling_factor())?;
        info!("multiplication took {} ms", now.elapsed().as_millis());
        println!(
            "product: {:?}",
            &encoder.decode(&decryptor.decrypt(&product)?)?[..num_values]
        );
        Ok(())
    }

    fn format_coeffs(coeffs: &[num_bigint::BigInt]) -> String {
        let coeffs: Vec<_> = coeffs.iter().map(ToString::to_string).collect();
        format!("[{}]", coeffs.join(", "))
    }
}
