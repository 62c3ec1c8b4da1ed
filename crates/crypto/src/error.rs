//! Fehlertypen fuer das Kryptografie-Subsystem
//!
//! Jeder Fehler gehoert zu genau einer [`FehlerKategorie`]. Nur
//! Plattform-Fehler duerfen vom Aufrufer wiederholt werden; Eingabe- und
//! Verifikationsfehler aendern sich durch Wiederholen nicht.

use thiserror::Error;
use uninest_core::UniNestError;

/// Fehler im Kryptografie-Subsystem
#[derive(Debug, Error)]
pub enum CryptoError {
    // --- Eingabe ---
    #[error("Base64-Dekodierung fehlgeschlagen: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Ungueltiger Schluessel: {0}")]
    UngueltigerSchluessel(String),

    #[error("Ungueltige Daten: {0}")]
    UngueltigeDaten(String),

    #[error("Ungueltige IV-Laenge: erwartet {erwartet}, erhalten {erhalten}")]
    UngueltigeNonce { erwartet: usize, erhalten: usize },

    #[error("Ungueltige Schluessel-Laenge: erwartet {erwartet}, erhalten {erhalten}")]
    UngueltigeSchluesselLaenge { erwartet: usize, erhalten: usize },

    #[error("Ungueltiger Umschlag: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schluessel ist nicht extrahierbar")]
    NichtExtrahierbar,

    #[error("Kein Schluessel fuer Raum {room_id} (Generation {generation})")]
    KeinSchluessel { room_id: String, generation: u32 },

    /// Nur der Schluesselbund, der den Raum erstellt hat, verteilt und rotiert
    #[error("Raum {room_id} wird nicht von diesem Schluesselbund verteilt")]
    KeinVerteiler { room_id: String },

    #[error("Generation {generation} von Raum {room_id} ist lokal bereits vergeben")]
    SchluesselKonflikt { room_id: String, generation: u32 },

    // --- Verifikation ---
    /// AES-GCM Auth-Tag stimmt nicht (falscher Schluessel, falsche IV oder Manipulation)
    #[error("Entschluesselung fehlgeschlagen: {0}")]
    Entschluesselung(String),

    /// Sitzungsschluessel konnte nicht entpackt werden; der Verlauf des Raums
    /// ist fuer diesen Benutzer nicht lesbar
    #[error("Sitzungsschluessel nicht lesbar: {grund}")]
    SitzungsschluesselUnlesbar { grund: Box<CryptoError> },

    // --- Plattform ---
    #[error("Krypto-Provider nicht verfuegbar: {0}")]
    Plattform(String),

    #[error("Verschluesselung fehlgeschlagen: {0}")]
    Verschluesselung(String),

    #[error("Schluessel-Generierung fehlgeschlagen: {0}")]
    SchluesselGenerierung(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;

/// Grobe Einordnung eines [`CryptoError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FehlerKategorie {
    /// Kaputter oder inkompatibler Datensatz
    Eingabe,
    /// Auth-Tag-Fehler: Manipulation, falscher Schluessel oder falsche IV
    Verifikation,
    /// Zugrundeliegender Krypto-Provider hat versagt
    Plattform,
}

impl CryptoError {
    pub fn kategorie(&self) -> FehlerKategorie {
        match self {
            Self::Base64(_)
            | Self::UngueltigerSchluessel(_)
            | Self::UngueltigeDaten(_)
            | Self::UngueltigeNonce { .. }
            | Self::UngueltigeSchluesselLaenge { .. }
            | Self::Json(_)
            | Self::NichtExtrahierbar
            | Self::KeinSchluessel { .. }
            | Self::KeinVerteiler { .. }
            | Self::SchluesselKonflikt { .. } => FehlerKategorie::Eingabe,
            Self::Entschluesselung(_) => FehlerKategorie::Verifikation,
            Self::SitzungsschluesselUnlesbar { grund } => grund.kategorie(),
            Self::Plattform(_) | Self::Verschluesselung(_) | Self::SchluesselGenerierung(_) => {
                FehlerKategorie::Plattform
            }
        }
    }

    /// Gibt true zurueck wenn ein erneuter Versuch sinnvoll sein koennte
    pub fn ist_wiederholbar(&self) -> bool {
        self.kategorie() == FehlerKategorie::Plattform
    }

    /// Verpackt einen Fehler beim Entpacken eines Sitzungsschluessels
    pub(crate) fn unlesbar(grund: CryptoError) -> Self {
        match grund {
            already @ Self::SitzungsschluesselUnlesbar { .. } => already,
            grund => Self::SitzungsschluesselUnlesbar {
                grund: Box::new(grund),
            },
        }
    }
}

impl From<CryptoError> for UniNestError {
    fn from(e: CryptoError) -> Self {
        if e.ist_wiederholbar() {
            UniNestError::KryptoNichtVerfuegbar(e.to_string())
        } else {
            UniNestError::Krypto(e.to_string())
        }
    }
}
