//! Identifikationstypen fuer UniNest
//!
//! Benutzer und Chat-Raeume werden ueber UUID-Newtypes adressiert, damit eine
//! Raum-ID nie versehentlich als Benutzer-ID durchgereicht wird.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident, $praefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Neue zufaellige ID (UUID v4)
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn inner(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($praefix, ":{}"), self.0)
            }
        }
    };
}

uuid_id!(
    /// Benutzer-ID (entspricht `profiles.id`)
    UserId,
    "user"
);

uuid_id!(
    /// Chat-Raum-ID (entspricht `chat_rooms.id`)
    RoomId,
    "room"
);
