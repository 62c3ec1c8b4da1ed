//! Verschluesselte Chat-Nachrichten
//!
//! Der Nachrichtentext wird mit dem Sitzungsschluessel des Raums
//! verschluesselt und als `{content, iv}` neben den Klartext-Metadaten
//! (Absender, Raum, Zeitstempel) gespeichert.

use std::sync::Arc;

use chrono::Utc;
use uninest_core::{RoomId, UserId};

use crate::e2e::session_crypto::SessionCrypto;
use crate::error::CryptoResult;
use crate::provider::CryptoProvider;
use crate::types::{EncryptedMessage, SymmetricKey};

/// Versiegelt und oeffnet Chat-Nachrichten
#[derive(Debug, Clone)]
pub struct MessageCipher {
    crypto: SessionCrypto,
}

impl MessageCipher {
    pub fn new(provider: Arc<dyn CryptoProvider>) -> Self {
        Self {
            crypto: SessionCrypto::new(provider),
        }
    }

    /// Verschluesselt eine Nachricht und stempelt den aktuellen Zeitpunkt
    pub fn seal(
        &self,
        sender: UserId,
        room: RoomId,
        plaintext: &str,
        key: &SymmetricKey,
        key_generation: u32,
    ) -> CryptoResult<EncryptedMessage> {
        let content = self.crypto.encrypt_content(plaintext, key)?;
        Ok(EncryptedMessage {
            content: content.ciphertext,
            iv: content.iv,
            sender,
            room,
            timestamp: Utc::now(),
            key_generation,
        })
    }

    /// Entschluesselt den Inhalt einer Nachricht
    pub fn open(&self, message: &EncryptedMessage, key: &SymmetricKey) -> CryptoResult<String> {
        self.crypto.decrypt_content(&message.content, &message.iv, key)
    }
}
