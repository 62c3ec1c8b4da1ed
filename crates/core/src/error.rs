//! Fehlertypen fuer UniNest
//!
//! Zentraler Fehler-Enum fuer die Schichten oberhalb der Kryptografie.
//! Untermodule definieren eigene Fehler und konvertieren via `From`.

use thiserror::Error;

/// Globaler Result-Alias fuer UniNest
pub type Result<T> = std::result::Result<T, UniNestError>;

/// Alle moeglichen Fehler im UniNest-Chat-Kern
#[derive(Debug, Error)]
pub enum UniNestError {
    // --- Kryptografie ---
    /// Kryptografischer Fehler (falscher Schluessel, Manipulation, kaputter Datensatz)
    #[error("Kryptografiefehler: {0}")]
    Krypto(String),

    /// Krypto-Provider voruebergehend nicht verfuegbar
    #[error("Krypto-Provider nicht verfuegbar: {0}")]
    KryptoNichtVerfuegbar(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl UniNestError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler wiederholbar sein koennte
    pub fn ist_wiederholbar(&self) -> bool {
        matches!(self, Self::KryptoNichtVerfuegbar(_))
    }
}
