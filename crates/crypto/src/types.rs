//! Gemeinsame Typen fuer das Kryptografie-Subsystem

use aes_gcm::{aead::KeyInit, Aes256Gcm, Key};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uninest_core::{RoomId, UserId};
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};

/// IV-Laenge fuer AES-GCM (96 Bit)
pub const IV_LAENGE: usize = 12;

/// Laenge eines AES-256-Schluessels
pub const SCHLUESSEL_LAENGE: usize = 32;

/// ECDH-Schluessel-Paar (P-256), nur fuer Key Agreement
#[derive(Debug, Clone)]
pub struct EcdhKeyPair {
    pub public_key: EcdhPublicKey,
    pub private_key: EcdhPrivateKey,
}

/// Oeffentlicher ECDH-Schluessel (P-256)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcdhPublicKey(pub(crate) p256::PublicKey);

/// Privater ECDH-Schluessel (P-256)
#[derive(Clone)]
pub struct EcdhPrivateKey(pub(crate) p256::SecretKey);

impl EcdhPrivateKey {
    /// Berechnet den zugehoerigen oeffentlichen Schluessel
    pub fn public_key(&self) -> EcdhPublicKey {
        EcdhPublicKey(self.0.public_key())
    }
}

impl std::fmt::Debug for EcdhPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EcdhPrivateKey([REDACTED])")
    }
}

/// Sicherer Schluessel-Container (wird beim Drop genullt)
#[derive(Clone)]
pub struct SecretBytes(Zeroizing<Vec<u8>>);

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBytes([REDACTED] {} bytes)", self.0.len())
    }
}

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Symmetrischer AES-256-GCM-Schluessel
///
/// Abgeleitete Wrapping-Keys sind nicht extrahierbar. Sitzungsschluessel
/// muessen extrahierbar sein, weil sie pro Teilnehmer eingepackt werden;
/// wer den Sitzungsschluessel exportieren kann, kann ihn auch abziehen.
#[derive(Debug, Clone)]
pub struct SymmetricKey {
    bytes: SecretBytes,
    extractable: bool,
}

impl SymmetricKey {
    pub(crate) fn from_bytes(bytes: Vec<u8>, extractable: bool) -> CryptoResult<Self> {
        let bytes = SecretBytes::new(bytes);
        if bytes.len() != SCHLUESSEL_LAENGE {
            return Err(CryptoError::UngueltigeSchluesselLaenge {
                erwartet: SCHLUESSEL_LAENGE,
                erhalten: bytes.len(),
            });
        }
        Ok(Self { bytes, extractable })
    }

    /// Importiert einen rohen Sitzungsschluessel (Base64, 32 Bytes)
    pub fn import_raw(raw_base64: &str) -> CryptoResult<Self> {
        let bytes = BASE64.decode(raw_base64)?;
        Self::from_bytes(bytes, true)
    }

    /// Exportiert die rohen Schluessel-Bytes als Base64
    pub fn export_raw(&self) -> CryptoResult<String> {
        if !self.extractable {
            return Err(CryptoError::NichtExtrahierbar);
        }
        Ok(BASE64.encode(self.bytes.as_bytes()))
    }

    pub fn is_extractable(&self) -> bool {
        self.extractable
    }

    pub(crate) fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.bytes.as_bytes()))
    }
}

/// Initialisierungsvektor fuer AES-GCM (12 Bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Iv(pub [u8; IV_LAENGE]);

impl Iv {
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    pub fn from_base64(iv: &str) -> CryptoResult<Self> {
        let bytes = BASE64.decode(iv)?;
        let arr: [u8; IV_LAENGE] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| CryptoError::UngueltigeNonce {
                    erwartet: IV_LAENGE,
                    erhalten: bytes.len(),
                })?;
        Ok(Self(arr))
    }
}

/// Ergebnis von `encrypt_content`: Ciphertext (inkl. 16 Bytes Auth-Tag) und IV, beide Base64
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedContent {
    pub ciphertext: String,
    pub iv: String,
}

/// Eingepackter Sitzungsschluessel, als JSON-Text gespeichert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKeyEnvelope {
    pub ciphertext: String,
    pub iv: String,
}

impl WrappedKeyEnvelope {
    pub fn to_json(&self) -> CryptoResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> CryptoResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl From<EncryptedContent> for WrappedKeyEnvelope {
    fn from(c: EncryptedContent) -> Self {
        Self {
            ciphertext: c.ciphertext,
            iv: c.iv,
        }
    }
}

/// Verschluesselte Chat-Nachricht
///
/// `content` und `iv` sind Base64; Absender, Raum und Zeitstempel bleiben
/// Klartext-Metadaten. Nach dem Versand unveraenderlich.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedMessage {
    pub content: String,
    pub iv: String,
    pub sender: UserId,
    pub room: RoomId,
    pub timestamp: DateTime<Utc>,
    /// Schluessel-Generation des Raums (0 fuer Raeume ohne Rotation)
    #[serde(default)]
    pub key_generation: u32,
}
