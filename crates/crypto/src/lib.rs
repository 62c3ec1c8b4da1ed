//! # uninest-crypto
//!
//! Ende-zu-Ende Verschluesselung fuer UniNest-Chatraeume.
//!
//! ## Module
//! - `e2e` - Schluessel-Paare, Sitzungsschluessel, Key Wrapping, Nachrichten
//! - `provider` - Zufallsquelle (OS oder deterministisch fuer Tests)
//! - `types` - Gemeinsame Typen (Schluessel, IV, Umschlaege, Nachrichten)
//! - `error` - Fehlertypen

pub mod e2e;
pub mod error;
pub mod provider;
pub mod types;

// Bequeme Re-Exports
pub use error::{CryptoError, CryptoResult, FehlerKategorie};
pub use provider::{CryptoProvider, OsProvider, SeededProvider};
pub use types::{
    EcdhKeyPair, EcdhPrivateKey, EcdhPublicKey, EncryptedContent, EncryptedMessage, Iv,
    SecretBytes, SymmetricKey, WrappedKeyEnvelope,
};

pub use e2e::{
    KeyManager, MessageCipher, RoomKeyRecord, RoomKeyRing, RoomKeyState, SessionCrypto,
    SessionKeyWrapper,
};
