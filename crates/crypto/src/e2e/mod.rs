//! E2E Verschluesselung (End-to-End) fuer Chatraeume
//!
//! Der Server speichert nur Ciphertext und verpackte Schluessel. Ohne
//! privaten Schluessel eines Mitglieds kann er keine Nachricht lesen.
//!
//! ## Ablauf
//! 1. Jeder Benutzer hat ein P-256-Schluessel-Paar (`KeyManager`)
//! 2. Bei Raum-Erstellung: zufaelliger Sitzungsschluessel (AES-256-GCM)
//! 3. Der Sitzungsschluessel wird pro Mitglied via ECDH eingepackt
//! 4. Nachrichten werden mit dem Sitzungsschluessel versiegelt
//! 5. Bei Austritt: neue Schluessel-Generation (`RoomKeyRing`)

pub mod key_manager;
pub mod message;
pub mod room_keys;
pub mod session_crypto;
pub mod session_key;

pub use key_manager::KeyManager;
pub use message::MessageCipher;
pub use room_keys::{RoomKeyRecord, RoomKeyRing, RoomKeyState};
pub use session_crypto::SessionCrypto;
pub use session_key::SessionKeyWrapper;
