//! Krypto-Provider
//!
//! Alle Zufallswerte (private Skalare, Sitzungsschluessel, IVs) werden ueber
//! einen injizierten [`CryptoProvider`] bezogen. Damit laesst sich das Modul
//! ohne Plattform-RNG deterministisch testen.

use parking_lot::Mutex;
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};

use crate::error::{CryptoError, CryptoResult};

/// Quelle fuer kryptografisch sichere Zufallsbytes
pub trait CryptoProvider: Send + Sync {
    /// Fuellt `dest` vollstaendig mit Zufallsbytes
    fn fill_random(&self, dest: &mut [u8]) -> CryptoResult<()>;
}

/// Betriebssystem-CSPRNG
#[derive(Debug, Clone, Copy, Default)]
pub struct OsProvider;

impl CryptoProvider for OsProvider {
    fn fill_random(&self, dest: &mut [u8]) -> CryptoResult<()> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| CryptoError::Plattform(e.to_string()))
    }
}

/// Deterministischer Provider aus einem Seed
///
/// Nur fuer Tests und reproduzierbare Fixtures. Jeder Aufruf setzt den
/// Strom fort, zwei IVs desselben Providers sind also nie gleich.
#[derive(Debug)]
pub struct SeededProvider {
    rng: Mutex<StdRng>,
}

impl SeededProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl CryptoProvider for SeededProvider {
    fn fill_random(&self, dest: &mut [u8]) -> CryptoResult<()> {
        self.rng.lock().fill_bytes(dest);
        Ok(())
    }
}
