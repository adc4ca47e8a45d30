// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Mutex;

use rand_chacha::rand_core::{SeedableRng, TryRngCore};
use thiserror::Error;

/// Cryptographically-secure random number generator that uses the ChaCha algorithm.
///
/// Every nonce, ratchet seed and secret key of a session, post-quantum ones included, is drawn
/// from an instance of this generator which gets passed into the session operations.
#[derive(Debug)]
pub struct Rng {
    rng: Mutex<rand_chacha::ChaCha20Rng>,
}

impl Rng {
    /// Seeds a generator from the operating system's entropy source.
    pub fn from_os_rng() -> Result<Self, RngError> {
        let rng = rand_chacha::ChaCha20Rng::try_from_os_rng()
            .map_err(|_| RngError::OsRngUnavailable)?;
        Ok(Self {
            rng: Mutex::new(rng),
        })
    }
}

#[cfg(any(test, feature = "test_utils"))]
impl Rng {
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            rng: Mutex::new(rand_chacha::ChaCha20Rng::from_seed(seed)),
        }
    }
}

impl Rng {
    pub fn random_array<const N: usize>(&self) -> Result<[u8; N], RngError> {
        let mut rng = self.rng.lock().map_err(|_| RngError::LockPoisoned)?;
        let mut out = [0u8; N];
        rng.try_fill_bytes(&mut out)
            .map_err(|_| RngError::NotEnoughRandomness)?;
        Ok(out)
    }
}

#[cfg(test)]
impl Rng {
    /// Leaves the generator unusable, every following draw fails.
    pub(crate) fn poison(&self) {
        let _ = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let _guard = self.rng.lock();
                    panic!("poisoning rng");
                })
                .join()
        });
    }
}

#[derive(Debug, Error)]
pub enum RngError {
    #[error("rng lock is poisoned")]
    LockPoisoned,

    #[error("unable to collect enough randomness")]
    NotEnoughRandomness,

    #[error("operating system entropy source is unavailable")]
    OsRngUnavailable,
}
