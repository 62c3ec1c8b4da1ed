//! ECDH-Schluesselmaterial (P-256)
//!
//! Erzeugt Schluessel-Paare und (de)serialisiert sie im Textformat der
//! Web- und Mobile-Clients:
//! - oeffentlich: SPKI-DER, Base64
//! - privat: PKCS#8-DER, Base64
//!
//! Wo der private Schluessel abgelegt wird, entscheidet der Aufrufer.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};
use crate::provider::CryptoProvider;
use crate::types::{EcdhKeyPair, EcdhPrivateKey, EcdhPublicKey};

/// Skalare ausserhalb [1, n) werden neu gezogen. Bei einem intakten RNG
/// passiert das praktisch nie; viele Fehlversuche deuten auf einen
/// defekten Provider hin.
const MAX_SKALAR_VERSUCHE: usize = 8;

/// Erzeugt und (de)serialisiert ECDH-Schluessel
#[derive(Clone)]
pub struct KeyManager {
    provider: Arc<dyn CryptoProvider>,
}

impl KeyManager {
    pub fn new(provider: Arc<dyn CryptoProvider>) -> Self {
        Self { provider }
    }

    /// Erzeugt ein neues P-256-Schluessel-Paar fuer ECDH
    pub fn generate_key_pair(&self) -> CryptoResult<EcdhKeyPair> {
        let mut skalar = Zeroizing::new([0u8; 32]);
        for _ in 0..MAX_SKALAR_VERSUCHE {
            self.provider.fill_random(skalar.as_mut_slice())?;
            if let Ok(secret) = p256::SecretKey::from_slice(skalar.as_slice()) {
                let private_key = EcdhPrivateKey(secret);
                return Ok(EcdhKeyPair {
                    public_key: private_key.public_key(),
                    private_key,
                });
            }
        }
        Err(CryptoError::SchluesselGenerierung(format!(
            "kein gueltiger P-256-Skalar nach {MAX_SKALAR_VERSUCHE} Versuchen"
        )))
    }

    /// Exportiert einen oeffentlichen Schluessel als Base64-kodiertes SPKI
    ///
    /// Der Punkt wird unkomprimiert kodiert (91 Bytes DER), wie `exportKey("spki")`.
    pub fn export_public_key(&self, public_key: &EcdhPublicKey) -> CryptoResult<String> {
        let der = public_key
            .0
            .to_public_key_der()
            .map_err(|e| CryptoError::UngueltigerSchluessel(format!("SPKI: {e}")))?;
        Ok(BASE64.encode(der.as_bytes()))
    }

    /// Importiert einen oeffentlichen Schluessel aus Base64-kodiertem SPKI
    ///
    /// Akzeptiert nur P-256 (`id-ecPublicKey` + `prime256v1`).
    pub fn import_public_key(&self, spki_base64: &str) -> CryptoResult<EcdhPublicKey> {
        let der = BASE64.decode(spki_base64.trim())?;
        p256::PublicKey::from_public_key_der(&der)
            .map(EcdhPublicKey)
            .map_err(|e| CryptoError::UngueltigerSchluessel(format!("SPKI: {e}")))
    }

    /// Exportiert einen privaten Schluessel als Base64-kodiertes PKCS#8
    pub fn export_private_key(&self, private_key: &EcdhPrivateKey) -> CryptoResult<String> {
        let doc = private_key
            .0
            .to_pkcs8_der()
            .map_err(|e| CryptoError::UngueltigerSchluessel(format!("PKCS#8: {e}")))?;
        Ok(BASE64.encode(doc.as_bytes()))
    }

    /// Importiert einen privaten Schluessel aus Base64-kodiertem PKCS#8
    pub fn import_private_key(&self, pkcs8_base64: &str) -> CryptoResult<EcdhPrivateKey> {
        let der = Zeroizing::new(BASE64.decode(pkcs8_base64.trim())?);
        p256::SecretKey::from_pkcs8_der(&der)
            .map(EcdhPrivateKey)
            .map_err(|e| CryptoError::UngueltigerSchluessel(format!("PKCS#8: {e}")))
    }
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyManager {{ .. }}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
