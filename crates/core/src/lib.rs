//! uninest-core – Gemeinsame Typen, Raum-Ereignisse und Fehlertypen
//!
//! Dieses Crate stellt die Bausteine bereit, die sich die UniNest-Crates
//! teilen: ID-Newtypes, den Plattform-Fehler und die Mitgliedschafts-
//! Ereignisse eines Chat-Raums.

pub mod error;
pub mod event;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{Result, UniNestError};
pub use event::RaumEreignis;
pub use types::{RoomId, UserId};
