//! Mitgliedschafts-Ereignisse eines Chat-Raums
//!
//! Werden vom Messaging-Feature erzeugt (Einladung, Austritt, Loeschung) und
//! vom Raum-Schluesselbund konsumiert, um Schluessel zu verteilen oder zu
//! rotieren.

use crate::types::{RoomId, UserId};
use serde::{Deserialize, Serialize};

/// Alle Ereignisse die eine Aenderung der Raum-Schluessel ausloesen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "typ", rename_all = "snake_case")]
pub enum RaumEreignis {
    /// Ein Benutzer wurde in einen verschluesselten Raum aufgenommen
    MitgliedBeigetreten {
        room_id: RoomId,
        user_id: UserId,
        /// Oeffentlicher ECDH-Schluessel (SPKI, Base64)
        public_key: String,
    },
    /// Ein Benutzer wurde aus dem Raum entfernt
    MitgliedEntfernt { room_id: RoomId, user_id: UserId },
    /// Der Raum wurde geloescht
    RaumGeloescht { room_id: RoomId },
}

impl RaumEreignis {
    /// Der Raum, auf den sich das Ereignis bezieht
    pub fn room_id(&self) -> RoomId {
        match self {
            Self::MitgliedBeigetreten { room_id, .. }
            | Self::MitgliedEntfernt { room_id, .. }
            | Self::RaumGeloescht { room_id } => *room_id,
        }
    }
}
