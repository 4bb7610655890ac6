use std::{error::Error, fs, path::PathBuf};

use clap::{Parser, Subcommand};
use num_bigint::BigInt;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rlwe_he::{bfv::BfvParameters, ckks::CkksParameters, examples};

#[derive(Clone, Debug, Parser)]
struct Args {
    /// Seed for reproducible runs; fresh OS randomness otherwise.
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    scheme: Scheme,
}

#[derive(Clone, Debug, Subcommand)]
enum Scheme {
    Bfv {
        #[arg(long, default_value_t = 16)]
        degree: usize,

        #[arg(long, default_value = "256")]
        plain_modulus: BigInt,

        #[arg(long, default_value = "8000000000000")]
        ciph_modulus: BigInt,

        /// JSON parameter file; overrides the other options.
        #[arg(long)]
        params: Option<PathBuf>,
    },
    Ckks {
        #[arg(long, default_value_t = 8)]
        degree: usize,

        #[arg(long, default_value_t = 600)]
        ciph_modulus_bits: u32,

        #[arg(long, default_value_t = 1200)]
        big_modulus_bits: u32,

        #[arg(long, default_value_t = 30)]
        scaling_factor_bits: u32,

        /// JSON parameter file; overrides the other options.
        #[arg(long)]
        params: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut rng = match args.seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_rng(rand::thread_rng())?,
    };

    match args.scheme {
        Scheme::Bfv {
            degree,
            plain_modulus,
            ciph_modulus,
            params,
        } => {
            let params = match params {
                Some(path) => BfvParameters::from_json(&fs::read_to_string(path)?)?,
                None => BfvParameters::new(degree, plain_modulus, ciph_modulus)?,
            };
            examples::bfv(&params, &mut rng)
        }
        Scheme::Ckks {
            degree,
            ciph_modulus_bits,
            big_modulus_bits,
            scaling_factor_bits,
            params,
        } => {
            let params = match params {
                Some(path) => CkksParameters::from_json(&fs::read_to_string(path)?)?,
                None => CkksParameters::with_bits(
                    degree,
                    ciph_modulus_bits,
                    big_modulus_bits,
                    scaling_factor_bits,
                )?,
            };
            examples::ckks(&params, &mut rng)
        }
    }
}
