use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::{OsRng, StdRng};
use rand::{Rng, SeedableRng, TryRngCore};
use uuid::Uuid;

const TEMPLATE: &str = "xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx";

/// Source of user identifiers, chosen once at startup.
///
/// Both strategies produce lowercase v4 UUID text; the fallback is not suitable
/// for anything security sensitive.
pub enum IdGenerator {
    Secure,
    Fallback(Mutex<StdRng>),
}

impl IdGenerator {
    /// Use the OS random source if it works, otherwise fall back to a time-seeded RNG.
    pub fn detect() -> Self {
        let mut buf = [0u8; 16];
        match OsRng.try_fill_bytes(&mut buf) {
            Ok(()) => IdGenerator::Secure,
            Err(e) => {
                tracing::warn!("OS random source unavailable ({e}), using fallback id generator");
                IdGenerator::fallback()
            }
        }
    }

    pub fn fallback() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        IdGenerator::Fallback(Mutex::new(StdRng::seed_from_u64(seed)))
    }

    pub fn is_secure(&self) -> bool {
        matches!(self, IdGenerator::Secure)
    }

    pub fn generate(&self) -> String {
        match self {
            IdGenerator::Secure => Uuid::new_v4().to_string(),
            IdGenerator::Fallback(rng) => {
                let mut rng = rng.lock().unwrap_or_else(PoisonError::into_inner);
                fill_template(&mut *rng)
            }
        }
    }
}

fn fill_template<R: Rng + ?Sized>(rng: &mut R) -> String {
    TEMPLATE
        .chars()
        .map(|c| match c {
            'x' => hex_digit(rng.random_range(0..16)),
            // variant bits 10xx
            'y' => hex_digit((rng.random_range(0..16) & 0x3) | 0x8),
            other => other,
        })
        .collect()
}

fn hex_digit(value: u32) -> char {
    char::from_digit(value, 16).unwrap_or('0')
}
