//! Sitzungsschluessel pro Raum und Key Wrapping
//!
//! Jeder verschluesselte Raum hat einen symmetrischen Sitzungsschluessel
//! (AES-256-GCM). Er wird fuer jeden Teilnehmer einzeln eingepackt:
//! 1. Paarweiser Wrapping-Key via ECDH (Sender privat, Empfaenger oeffentlich)
//! 2. Roh-Export des Sitzungsschluessels, Base64
//! 3. AES-256-GCM mit frischer IV
//! 4. JSON-Umschlag `{"ciphertext": ..., "iv": ...}`
//!
//! Der Empfaenger leitet mit seinem privaten und dem oeffentlichen
//! Schluessel des Senders denselben Wrapping-Key ab.

use std::collections::HashMap;
use std::sync::Arc;

use uninest_core::UserId;
use zeroize::Zeroizing;

use crate::e2e::session_crypto::SessionCrypto;
use crate::error::{CryptoError, CryptoResult};
use crate::provider::CryptoProvider;
use crate::types::{EcdhPrivateKey, EcdhPublicKey, SymmetricKey, WrappedKeyEnvelope, SCHLUESSEL_LAENGE};

/// Erzeugt Sitzungsschluessel und packt sie pro Empfaenger ein/aus
#[derive(Clone)]
pub struct SessionKeyWrapper {
    crypto: SessionCrypto,
    provider: Arc<dyn CryptoProvider>,
}

impl SessionKeyWrapper {
    pub fn new(provider: Arc<dyn CryptoProvider>) -> Self {
        Self {
            crypto: SessionCrypto::new(Arc::clone(&provider)),
            provider,
        }
    }

    /// Die zugrundeliegende SessionCrypto (gleicher Provider)
    pub fn session_crypto(&self) -> &SessionCrypto {
        &self.crypto
    }

    /// Erzeugt einen neuen, extrahierbaren Sitzungsschluessel fuer einen Raum
    pub fn generate_session_key(&self) -> CryptoResult<SymmetricKey> {
        let mut bytes = vec![0u8; SCHLUESSEL_LAENGE];
        self.provider.fill_random(&mut bytes)?;
        SymmetricKey::from_bytes(bytes, true)
    }

    /// Packt einen Sitzungsschluessel fuer einen Empfaenger ein
    ///
    /// Gibt den JSON-Umschlag zurueck. Pro Empfaenger einmal aufrufen; der
    /// Sitzungsschluessel ist fuer alle gleich, nur die Verpackung nicht.
    pub fn wrap_session_key(
        &self,
        session_key: &SymmetricKey,
        recipient_public_key: &EcdhPublicKey,
        sender_private_key: &EcdhPrivateKey,
    ) -> CryptoResult<String> {
        let wrapping_key = self
            .crypto
            .derive_symmetric_key(sender_private_key, recipient_public_key)?;
        let raw = Zeroizing::new(session_key.export_raw()?);
        let content = self.crypto.encrypt_content(raw.as_str(), &wrapping_key)?;
        WrappedKeyEnvelope::from(content).to_json()
    }

    /// Packt einen Sitzungsschluessel aus
    ///
    /// Jeder Fehler wird als `SitzungsschluesselUnlesbar` gemeldet: der
    /// Verlauf des Raums ist fuer diesen Benutzer nicht lesbar. Ein erneuter
    /// Versuch mit demselben Material hilft nicht.
    pub fn unwrap_session_key(
        &self,
        envelope_json: &str,
        sender_public_key: &EcdhPublicKey,
        recipient_private_key: &EcdhPrivateKey,
    ) -> CryptoResult<SymmetricKey> {
        self.try_unwrap(envelope_json, sender_public_key, recipient_private_key)
            .map_err(|e| {
                tracing::warn!(fehler = %e, "Sitzungsschluessel konnte nicht entpackt werden");
                CryptoError::unlesbar(e)
            })
    }

    fn try_unwrap(
        &self,
        envelope_json: &str,
        sender_public_key: &EcdhPublicKey,
        recipient_private_key: &EcdhPrivateKey,
    ) -> CryptoResult<SymmetricKey> {
        let envelope = WrappedKeyEnvelope::from_json(envelope_json)?;
        let wrapping_key = self
            .crypto
            .derive_symmetric_key(recipient_private_key, sender_public_key)?;
        let raw = Zeroizing::new(self.crypto.decrypt_content(
            &envelope.ciphertext,
            &envelope.iv,
            &wrapping_key,
        )?);
        SymmetricKey::import_raw(raw.as_str())
    }

    /// Verteilt einen Sitzungsschluessel an eine Liste von Empfaengern
    ///
    /// Gibt eine Map user_id -> JSON-Umschlag zurueck. Jeder Umschlag hat
    /// eine eigene IV.
    pub fn wrap_for_participants(
        &self,
        session_key: &SymmetricKey,
        recipients: &HashMap<UserId, EcdhPublicKey>,
        sender_private_key: &EcdhPrivateKey,
    ) -> CryptoResult<HashMap<UserId, String>> {
        let mut result = HashMap::with_capacity(recipients.len());

        for (user_id, public_key) in recipients {
            let wrapped = self.wrap_session_key(session_key, public_key, sender_private_key)?;
            result.insert(*user_id, wrapped);
        }

        Ok(result)
    }
}

impl std::fmt::Debug for SessionKeyWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionKeyWrapper {{ .. }}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
