use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// # Random byte source
/// Supplies the uniformly distributed bytes consumed by `Cxkk`.
///
/// Every `rand` generator is a source, so tests can inject a seeded or mocked one.
pub trait RandomSource {
    fn random_byte(&mut self) -> u8;
}

impl<R: RngCore> RandomSource for R {
    fn random_byte(&mut self) -> u8 {
        self.gen()
    }
}

/// A generator seeded from the system clock
pub fn time_seeded() -> StdRng {
    // A clock before the epoch still yields a usable (if fixed) seed
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default();
    seeded(seed)
}

/// A generator that replays the same byte sequence for the same seed
pub fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
