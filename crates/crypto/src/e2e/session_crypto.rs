//! ECDH-Schluesselableitung und AES-256-GCM fuer Text-Inhalte
//!
//! ## Ableitung
//! Der Wrapping-Key ist die x-Koordinate des gemeinsamen ECDH-Punkts
//! (32 Bytes), direkt als AES-256-Schluessel. Das entspricht
//! `deriveKey({ name: "ECDH" }, ..., { name: "AES-GCM", length: 256 })`
//! der bestehenden Clients. A mit B_pub ergibt denselben Schluessel wie
//! B mit A_pub.
//!
//! ## Format
//! ```text
//! { ciphertext: base64(ct || tag(16)), iv: base64(iv(12)) }
//! ```

use std::sync::Arc;

use aes_gcm::aead::Aead;
use aes_gcm::Nonce;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::{CryptoError, CryptoResult};
use crate::provider::CryptoProvider;
use crate::types::{EcdhPrivateKey, EcdhPublicKey, EncryptedContent, Iv, SymmetricKey, IV_LAENGE};

/// Schluesselableitung und authentifizierte Verschluesselung
#[derive(Clone)]
pub struct SessionCrypto {
    provider: Arc<dyn CryptoProvider>,
}

impl SessionCrypto {
    pub fn new(provider: Arc<dyn CryptoProvider>) -> Self {
        Self { provider }
    }

    /// Leitet einen nicht extrahierbaren AES-256-GCM-Schluessel via ECDH ab
    pub fn derive_symmetric_key(
        &self,
        my_private_key: &EcdhPrivateKey,
        their_public_key: &EcdhPublicKey,
    ) -> CryptoResult<SymmetricKey> {
        let shared = p256::ecdh::diffie_hellman(
            my_private_key.0.to_nonzero_scalar(),
            their_public_key.0.as_affine(),
        );
        SymmetricKey::from_bytes(shared.raw_secret_bytes().to_vec(), false)
    }

    /// Verschluesselt UTF-8-Text mit frischer 12-Byte-IV
    ///
    /// Jeder Aufruf zieht eine neue IV vom Provider. Ein (Schluessel, IV)-Paar
    /// darf nie fuer zwei Klartexte verwendet werden.
    pub fn encrypt_content(
        &self,
        plaintext: &str,
        key: &SymmetricKey,
    ) -> CryptoResult<EncryptedContent> {
        let mut iv = Iv([0u8; IV_LAENGE]);
        self.provider.fill_random(&mut iv.0)?;

        let ciphertext = key
            .cipher()
            .encrypt(Nonce::from_slice(&iv.0), plaintext.as_bytes())
            .map_err(|e| CryptoError::Verschluesselung(e.to_string()))?;

        Ok(EncryptedContent {
            ciphertext: BASE64.encode(ciphertext),
            iv: iv.to_base64(),
        })
    }

    /// Entschluesselt Base64-Ciphertext mit der Base64-IV der Verschluesselung
    ///
    /// Schlaegt mit `Entschluesselung` fehl wenn Ciphertext, IV oder
    /// Schluessel nicht exakt passen; liefert nie veraenderten Klartext.
    pub fn decrypt_content(
        &self,
        ciphertext: &str,
        iv: &str,
        key: &SymmetricKey,
    ) -> CryptoResult<String> {
        let iv = Iv::from_base64(iv)?;
        let ciphertext = BASE64.decode(ciphertext)?;

        let plaintext = key
            .cipher()
            .decrypt(Nonce::from_slice(&iv.0), ciphertext.as_slice())
            .map_err(|_| CryptoError::Entschluesselung("Auth-Tag ungueltig".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|e| CryptoError::UngueltigeDaten(format!("Klartext ist kein UTF-8: {e}")))
    }
}

impl std::fmt::Debug for SessionCrypto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionCrypto {{ .. }}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
