//! Raum-Schluesselbund mit Schluessel-Generationen
//!
//! Verwaltet die Sitzungsschluessel aller verschluesselten Raeume eines
//! Benutzers:
//! - Erstellen und Verteilen bei Raum-Erstellung (Generation 0)
//! - Verteilen an neue Mitglieder
//! - Rotation bei Austritt: neue Generation, erneut eingepackt fuer die
//!   verbleibenden Mitglieder, alte Generation widerrufen
//! - Empfangen und Entpacken eigener Datensaetze
//!
//! Verteilen und Rotieren darf nur der Schluesselbund, der den Raum erstellt
//! hat. Alle anderen empfangen ausschliesslich Datensaetze.
//!
//! Zustand pro Raum und Teilnehmer:
//! `KeinSchluessel -> Verpackt (Datensatz gespeichert) -> Entpackt (im Speicher)`
//!
//! Widerrufene Generationen bleiben fuer den Verlauf lesbar, werden aber nie
//! mehr zum Versiegeln neuer Nachrichten ausgegeben.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uninest_core::{RaumEreignis, RoomId, UserId};

use crate::e2e::key_manager::KeyManager;
use crate::e2e::session_key::SessionKeyWrapper;
use crate::error::{CryptoError, CryptoResult};
use crate::provider::CryptoProvider;
use crate::types::{EcdhPrivateKey, EcdhPublicKey, SymmetricKey};

/// Gespeicherter Schluessel-Datensatz pro Raum und Benutzer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomKeyRecord {
    pub room_id: RoomId,
    /// Empfaenger des Datensatzes
    pub user_id: UserId,
    /// Wer eingepackt hat (dessen oeffentlicher Schluessel wird zum Entpacken gebraucht)
    pub sender_id: UserId,
    #[serde(default)]
    pub generation: u32,
    /// JSON-Umschlag `{"ciphertext": ..., "iv": ...}`
    pub wrapped_key: String,
}

/// Schluessel-Zustand eines Raums aus Sicht des lokalen Benutzers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomKeyState {
    KeinSchluessel,
    /// Datensatz liegt vor, ist aber noch nicht entpackt
    Verpackt,
    /// Aktueller Schluessel liegt im Speicher
    Entpackt,
}

#[derive(Debug, Default)]
struct RaumSchluessel {
    /// Von `create_room` angelegt, nicht aus empfangenen Datensaetzen
    verteiler: bool,
    aktuelle_generation: u32,
    schluessel: BTreeMap<u32, SymmetricKey>,
    ausstehend: BTreeMap<u32, RoomKeyRecord>,
    mitglieder: HashMap<UserId, EcdhPublicKey>,
    widerrufen: BTreeSet<u32>,
}

/// Schluesselbund fuer alle verschluesselten Raeume eines Benutzers
pub struct RoomKeyRing {
    user_id: UserId,
    keys: KeyManager,
    wrapper: SessionKeyWrapper,
    raeume: DashMap<RoomId, RaumSchluessel>,
}

impl RoomKeyRing {
    pub fn new(user_id: UserId, provider: Arc<dyn CryptoProvider>) -> Self {
        Self {
            user_id,
            keys: KeyManager::new(Arc::clone(&provider)),
            wrapper: SessionKeyWrapper::new(provider),
            raeume: DashMap::new(),
        }
    }

    /// Der lokale Benutzer, dem dieser Schluesselbund gehoert
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    // --- Verteiler-Seite ---

    /// Erstellt den Sitzungsschluessel eines neuen Raums und packt ihn fuer
    /// alle Mitglieder ein
    pub fn create_room(
        &self,
        room_id: RoomId,
        members: &HashMap<UserId, EcdhPublicKey>,
        my_private_key: &EcdhPrivateKey,
    ) -> CryptoResult<Vec<RoomKeyRecord>> {
        let Entry::Vacant(slot) = self.raeume.entry(room_id) else {
            return Err(CryptoError::UngueltigeDaten(format!(
                "{room_id} hat bereits einen Schluessel"
            )));
        };

        let session = self.wrapper.generate_session_key()?;
        let records = self.alle_einpacken(room_id, 0, &session, members, my_private_key)?;

        let mut raum = RaumSchluessel {
            verteiler: true,
            ..Default::default()
        };
        raum.schluessel.insert(0, session);
        raum.mitglieder = members.clone();
        slot.insert(raum);

        tracing::debug!(room = %room_id, mitglieder = members.len(), "Raum-Schluessel erstellt");
        Ok(records)
    }

    /// Packt die aktuelle Generation fuer ein neues Mitglied ein
    pub fn add_member(
        &self,
        room_id: RoomId,
        user_id: UserId,
        public_key: EcdhPublicKey,
        my_private_key: &EcdhPrivateKey,
    ) -> CryptoResult<RoomKeyRecord> {
        let mut guard = self.verteiler_raum(room_id)?;
        let raum = &mut *guard;

        let generation = raum.aktuelle_generation;
        let session = raum
            .schluessel
            .get(&generation)
            .ok_or_else(|| kein_schluessel(room_id, generation))?;
        let wrapped_key = self
            .wrapper
            .wrap_session_key(session, &public_key, my_private_key)?;
        raum.mitglieder.insert(user_id, public_key);

        tracing::debug!(room = %room_id, user = %user_id, generation, "Mitglied aufgenommen");
        Ok(RoomKeyRecord {
            room_id,
            user_id,
            sender_id: self.user_id,
            generation,
            wrapped_key,
        })
    }

    /// Entfernt ein Mitglied und rotiert den Raum-Schluessel
    ///
    /// Das entfernte Mitglied behaelt bereits entpackte Generationen, bekommt
    /// aber keinen Datensatz fuer die neue. Ist der Benutzer kein Mitglied,
    /// passiert nichts.
    pub fn remove_member(
        &self,
        room_id: RoomId,
        user_id: UserId,
        my_private_key: &EcdhPrivateKey,
    ) -> CryptoResult<Vec<RoomKeyRecord>> {
        let mut guard = self.verteiler_raum(room_id)?;

        if !guard.mitglieder.contains_key(&user_id) {
            return Ok(Vec::new());
        }

        let verbleibend: HashMap<UserId, EcdhPublicKey> = guard
            .mitglieder
            .iter()
            .filter(|(id, _)| **id != user_id)
            .map(|(id, key)| (*id, key.clone()))
            .collect();

        let records = self.rotieren(room_id, &mut guard, verbleibend, my_private_key)?;
        tracing::info!(
            room = %room_id,
            entfernt = %user_id,
            generation = guard.aktuelle_generation,
            "Raum-Schluessel nach Austritt rotiert"
        );
        Ok(records)
    }

    /// Rotiert den Raum-Schluessel ohne Aenderung der Mitglieder
    /// (z.B. nach Kompromittierung eines privaten Schluessels)
    pub fn rotate_key(
        &self,
        room_id: RoomId,
        my_private_key: &EcdhPrivateKey,
    ) -> CryptoResult<Vec<RoomKeyRecord>> {
        let mut guard = self.verteiler_raum(room_id)?;
        let mitglieder = guard.mitglieder.clone();
        let records = self.rotieren(room_id, &mut guard, mitglieder, my_private_key)?;
        tracing::info!(room = %room_id, generation = guard.aktuelle_generation, "Raum-Schluessel rotiert");
        Ok(records)
    }

    /// Verarbeitet ein Mitgliedschafts-Ereignis
    ///
    /// Beitritt und Austritt betreffen nur den Verteiler eines Raums; bei
    /// allen anderen Schluesselbuenden bleiben sie ohne Wirkung.
    pub fn apply_event(
        &self,
        event: &RaumEreignis,
        my_private_key: &EcdhPrivateKey,
    ) -> CryptoResult<Vec<RoomKeyRecord>> {
        let room_id = event.room_id();
        let ist_verteiler = self
            .raeume
            .get(&room_id)
            .map(|raum| raum.verteiler)
            .unwrap_or(false);
        if !ist_verteiler && !matches!(event, RaumEreignis::RaumGeloescht { .. }) {
            tracing::debug!(room = %room_id, "Ereignis ignoriert, nicht Verteiler");
            return Ok(Vec::new());
        }

        match event {
            RaumEreignis::MitgliedBeigetreten {
                room_id,
                user_id,
                public_key,
            } => {
                let public_key = self.keys.import_public_key(public_key)?;
                let record = self.add_member(*room_id, *user_id, public_key, my_private_key)?;
                Ok(vec![record])
            }
            RaumEreignis::MitgliedEntfernt { room_id, user_id } => {
                self.remove_member(*room_id, *user_id, my_private_key)
            }
            RaumEreignis::RaumGeloescht { room_id } => {
                self.remove_room(*room_id);
                Ok(Vec::new())
            }
        }
    }

    // --- Empfaenger-Seite ---

    /// Legt einen empfangenen Datensatz als verpackt ab
    ///
    /// Ist die Generation bereits entpackt, ersetzt `unlock` den Schluessel.
    /// Der Verteiler nimmt keine Datensaetze fuer eigene Generationen an.
    pub fn store_wrapped(&self, record: RoomKeyRecord) -> CryptoResult<()> {
        if record.user_id != self.user_id {
            return Err(CryptoError::UngueltigeDaten(format!(
                "Datensatz ist fuer {} bestimmt, nicht fuer {}",
                record.user_id, self.user_id
            )));
        }

        let mut raum = self.raeume.entry(record.room_id).or_default();
        if raum.verteiler && raum.schluessel.contains_key(&record.generation) {
            return Err(CryptoError::SchluesselKonflikt {
                room_id: record.room_id.to_string(),
                generation: record.generation,
            });
        }
        raum.ausstehend.insert(record.generation, record);
        Ok(())
    }

    /// Entpackt alle ausstehenden Datensaetze eines Raums
    ///
    /// `sender_keys` liefert die oeffentlichen Schluessel der Absender.
    /// Datensaetze ohne bekannten Absender bleiben ausstehend. Erfolgreich
    /// entpackte Generationen werden uebernommen, auch wenn eine andere
    /// fehlschlaegt; dann wird der erste Fehler zurueckgegeben.
    pub fn unlock(
        &self,
        room_id: RoomId,
        sender_keys: &HashMap<UserId, EcdhPublicKey>,
        my_private_key: &EcdhPrivateKey,
    ) -> CryptoResult<usize> {
        let mut guard = self
            .raeume
            .get_mut(&room_id)
            .ok_or_else(|| kein_schluessel(room_id, 0))?;
        let raum = &mut *guard;

        let generationen: Vec<u32> = raum.ausstehend.keys().copied().collect();
        let mut entpackt = 0;
        let mut erster_fehler = None;

        for generation in generationen {
            let Some(record) = raum.ausstehend.get(&generation) else {
                continue;
            };
            let Some(sender_key) = sender_keys.get(&record.sender_id) else {
                continue;
            };

            let ergebnis =
                self.wrapper
                    .unwrap_session_key(&record.wrapped_key, sender_key, my_private_key);
            match ergebnis {
                Ok(key) => {
                    raum.ausstehend.remove(&generation);
                    raum.schluessel.insert(generation, key);
                    raum.aktuelle_generation = raum.aktuelle_generation.max(generation);
                    entpackt += 1;
                }
                Err(e) => {
                    erster_fehler.get_or_insert(e);
                }
            }
        }

        // Aeltere Generationen sind mit der neuesten widerrufen
        let aktuell = raum.aktuelle_generation;
        let aeltere: Vec<u32> = raum.schluessel.range(..aktuell).map(|(g, _)| *g).collect();
        raum.widerrufen.extend(aeltere);

        tracing::debug!(room = %room_id, entpackt, "Raum-Schluessel entpackt");
        match erster_fehler {
            Some(e) => Err(e),
            None => Ok(entpackt),
        }
    }

    // --- Abfragen ---

    pub fn key_state(&self, room_id: RoomId) -> RoomKeyState {
        let Some(raum) = self.raeume.get(&room_id) else {
            return RoomKeyState::KeinSchluessel;
        };
        let neueste_entpackt = raum.schluessel.keys().next_back().copied();
        let neueste_verpackt = raum.ausstehend.keys().next_back().copied();

        match (neueste_entpackt, neueste_verpackt) {
            (None, None) => RoomKeyState::KeinSchluessel,
            (e, Some(v)) if e.map_or(true, |e| v > e) => RoomKeyState::Verpackt,
            _ => RoomKeyState::Entpackt,
        }
    }

    /// Neueste entpackte Generation; `None` solange nichts entpackt ist
    pub fn current_generation(&self, room_id: RoomId) -> Option<u32> {
        let raum = self.raeume.get(&room_id)?;
        raum.schluessel
            .contains_key(&raum.aktuelle_generation)
            .then_some(raum.aktuelle_generation)
    }

    /// Schluessel zum Versiegeln neuer Nachrichten: (Generation, Schluessel)
    pub fn current_key(&self, room_id: RoomId) -> CryptoResult<(u32, SymmetricKey)> {
        let raum = self
            .raeume
            .get(&room_id)
            .ok_or_else(|| kein_schluessel(room_id, 0))?;
        let generation = raum.aktuelle_generation;
        if raum.widerrufen.contains(&generation) {
            return Err(kein_schluessel(room_id, generation));
        }
        raum.schluessel
            .get(&generation)
            .map(|key| (generation, key.clone()))
            .ok_or_else(|| kein_schluessel(room_id, generation))
    }

    /// Schluessel einer bestimmten Generation (auch widerrufene, fuer den Verlauf)
    pub fn key_for(&self, room_id: RoomId, generation: u32) -> CryptoResult<SymmetricKey> {
        self.raeume
            .get(&room_id)
            .and_then(|raum| raum.schluessel.get(&generation).cloned())
            .ok_or_else(|| kein_schluessel(room_id, generation))
    }

    pub fn is_revoked(&self, room_id: RoomId, generation: u32) -> bool {
        self.raeume
            .get(&room_id)
            .map(|raum| raum.widerrufen.contains(&generation))
            .unwrap_or(false)
    }

    /// Mitglieder eines Raums (sortiert)
    pub fn members(&self, room_id: RoomId) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self
            .raeume
            .get(&room_id)
            .map(|raum| raum.mitglieder.keys().copied().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Entfernt einen Raum vollstaendig (bei Raum-Loeschung)
    pub fn remove_room(&self, room_id: RoomId) {
        self.raeume.remove(&room_id);
    }

    // --- intern ---

    fn verteiler_raum(
        &self,
        room_id: RoomId,
    ) -> CryptoResult<dashmap::mapref::one::RefMut<'_, RoomId, RaumSchluessel>> {
        let raum = self
            .raeume
            .get_mut(&room_id)
            .ok_or_else(|| kein_schluessel(room_id, 0))?;
        if !raum.verteiler {
            return Err(CryptoError::KeinVerteiler {
                room_id: room_id.to_string(),
            });
        }
        Ok(raum)
    }

    /// Erzeugt die naechste Generation und packt sie fuer `mitglieder` ein.
    /// Der Zustand wird erst uebernommen, wenn alle Datensaetze erstellt sind.
    fn rotieren(
        &self,
        room_id: RoomId,
        raum: &mut RaumSchluessel,
        mitglieder: HashMap<UserId, EcdhPublicKey>,
        my_private_key: &EcdhPrivateKey,
    ) -> CryptoResult<Vec<RoomKeyRecord>> {
        let alte = raum.aktuelle_generation;
        let neue = alte.checked_add(1).ok_or_else(|| {
            CryptoError::UngueltigeDaten(format!("Generationszaehler von {room_id} erschoepft"))
        })?;

        let session = self.wrapper.generate_session_key()?;
        let records = self.alle_einpacken(room_id, neue, &session, &mitglieder, my_private_key)?;

        raum.widerrufen.insert(alte);
        raum.schluessel.insert(neue, session);
        raum.aktuelle_generation = neue;
        raum.mitglieder = mitglieder;
        Ok(records)
    }

    fn alle_einpacken(
        &self,
        room_id: RoomId,
        generation: u32,
        session: &SymmetricKey,
        mitglieder: &HashMap<UserId, EcdhPublicKey>,
        my_private_key: &EcdhPrivateKey,
    ) -> CryptoResult<Vec<RoomKeyRecord>> {
        let verteilt = self
            .wrapper
            .wrap_for_participants(session, mitglieder, my_private_key)?;

        let mut records: Vec<RoomKeyRecord> = verteilt
            .into_iter()
            .map(|(user_id, wrapped_key)| RoomKeyRecord {
                room_id,
                user_id,
                sender_id: self.user_id,
                generation,
                wrapped_key,
            })
            .collect();
        records.sort_by_key(|r| r.user_id);
        Ok(records)
    }
}

impl std::fmt::Debug for RoomKeyRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomKeyRing")
            .field("user_id", &self.user_id)
            .field("raeume", &self.raeume.len())
            .finish()
    }
}

fn kein_schluessel(room_id: RoomId, generation: u32) -> CryptoError {
    CryptoError::KeinSchluessel {
        room_id: room_id.to_string(),
        generation,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::OsProvider;
    use crate::types::EcdhKeyPair;

    struct Teilnehmer {
        id: UserId,
        paar: EcdhKeyPair,
        ring: RoomKeyRing,
    }

    fn provider() -> Arc<dyn CryptoProvider> {
        Arc::new(OsProvider)
    }

    fn teilnehmer() -> Teilnehmer {
        let id = UserId::new();
        Teilnehmer {
            id,
            paar: KeyManager::new(provider()).generate_key_pair().unwrap(),
            ring: RoomKeyRing::new(id, provider()),
        }
    }

    fn mitglieder(ts: &[&Teilnehmer]) -> HashMap<UserId, EcdhPublicKey> {
        ts.iter()
            .map(|t| (t.id, t.paar.public_key.clone()))
            .collect()
    }

    fn record_fuer(records: &[RoomKeyRecord], user: UserId) -> RoomKeyRecord {
        records
            .iter()
            .find(|r| r.user_id == user)
            .cloned()
            .expect("Datensatz fehlt")
    }

    #[test]
    fn raum_erstellen_verteilt_generation_null() {
        let admin = teilnehmer();
        let bob = teilnehmer();
        let room = RoomId::new();

        let records = admin
            .ring
            .create_room(room, &mitglieder(&[&admin, &bob]), &admin.paar.private_key)
            .unwrap();

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.generation == 0 && r.sender_id == admin.id));
        assert_eq!(admin.ring.key_state(room), RoomKeyState::Entpackt);
        assert_eq!(admin.ring.current_generation(room), Some(0));
    }

    #[test]
    fn raum_doppelt_erstellen_schlaegt_fehl() {
        let admin = teilnehmer();
        let room = RoomId::new();
        let m = mitglieder(&[&admin]);
        admin.ring.create_room(room, &m, &admin.paar.private_key).unwrap();
        let result = admin.ring.create_room(room, &m, &admin.paar.private_key);
        assert!(matches!(result, Err(CryptoError::UngueltigeDaten(_))));
    }

    #[test]
    fn empfaenger_zustandsmaschine() {
        let admin = teilnehmer();
        let bob = teilnehmer();
        let room = RoomId::new();

        assert_eq!(bob.ring.key_state(room), RoomKeyState::KeinSchluessel);

        let records = admin
            .ring
            .create_room(room, &mitglieder(&[&admin, &bob]), &admin.paar.private_key)
            .unwrap();
        bob.ring.store_wrapped(record_fuer(&records, bob.id)).unwrap();
        assert_eq!(bob.ring.key_state(room), RoomKeyState::Verpackt);

        let n = bob
            .ring
            .unlock(room, &mitglieder(&[&admin]), &bob.paar.private_key)
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(bob.ring.key_state(room), RoomKeyState::Entpackt);

        let (_, a) = admin.ring.current_key(room).unwrap();
        let (_, b) = bob.ring.current_key(room).unwrap();
        assert_eq!(a.export_raw().unwrap(), b.export_raw().unwrap());
    }

    #[test]
    fn fremder_datensatz_wird_abgelehnt() {
        let admin = teilnehmer();
        let bob = teilnehmer();
        let room = RoomId::new();
        let records = admin
            .ring
            .create_room(room, &mitglieder(&[&admin, &bob]), &admin.paar.private_key)
            .unwrap();
        let result = bob.ring.store_wrapped(record_fuer(&records, admin.id));
        assert!(matches!(result, Err(CryptoError::UngueltigeDaten(_))));
    }

    #[test]
    fn unbekannter_absender_bleibt_verpackt() {
        let admin = teilnehmer();
        let bob = teilnehmer();
        let room = RoomId::new();
        let records = admin
            .ring
            .create_room(room, &mitglieder(&[&admin, &bob]), &admin.paar.private_key)
            .unwrap();
        bob.ring.store_wrapped(record_fuer(&records, bob.id)).unwrap();

        let n = bob
            .ring
            .unlock(room, &HashMap::new(), &bob.paar.private_key)
            .unwrap();
        assert_eq!(n, 0);
        assert_eq!(bob.ring.key_state(room), RoomKeyState::Verpackt);
    }

    #[test]
    fn falscher_absender_key_ist_unlesbar() {
        let admin = teilnehmer();
        let bob = teilnehmer();
        let eve = teilnehmer();
        let room = RoomId::new();
        let records = admin
            .ring
            .create_room(room, &mitglieder(&[&admin, &bob]), &admin.paar.private_key)
            .unwrap();
        bob.ring.store_wrapped(record_fuer(&records, bob.id)).unwrap();

        let mut falsch = HashMap::new();
        falsch.insert(admin.id, eve.paar.public_key.clone());
        let err = bob
            .ring
            .unlock(room, &falsch, &bob.paar.private_key)
            .unwrap_err();
        assert!(matches!(err, CryptoError::SitzungsschluesselUnlesbar { .. }));
        assert!(!err.ist_wiederholbar());
        assert_eq!(bob.ring.key_state(room), RoomKeyState::Verpackt);
    }

    #[test]
    fn neues_mitglied_bekommt_aktuelle_generation() {
        let admin = teilnehmer();
        let carol = teilnehmer();
        let room = RoomId::new();
        admin
            .ring
            .create_room(room, &mitglieder(&[&admin]), &admin.paar.private_key)
            .unwrap();

        let record = admin
            .ring
            .add_member(room, carol.id, carol.paar.public_key.clone(), &admin.paar.private_key)
            .unwrap();
        assert_eq!(record.generation, 0);
        assert_eq!(admin.ring.members(room).len(), 2);

        carol.ring.store_wrapped(record).unwrap();
        carol
            .ring
            .unlock(room, &mitglieder(&[&admin]), &carol.paar.private_key)
            .unwrap();
        assert_eq!(carol.ring.key_state(room), RoomKeyState::Entpackt);
    }

    #[test]
    fn mitglied_in_unbekanntem_raum() {
        let admin = teilnehmer();
        let bob = teilnehmer();
        let result = admin.ring.add_member(
            RoomId::new(),
            bob.id,
            bob.paar.public_key.clone(),
            &admin.paar.private_key,
        );
        assert!(matches!(result, Err(CryptoError::KeinSchluessel { .. })));
    }

    #[test]
    fn austritt_rotiert_und_schliesst_aus() {
        let admin = teilnehmer();
        let bob = teilnehmer();
        let carol = teilnehmer();
        let room = RoomId::new();

        admin
            .ring
            .create_room(room, &mitglieder(&[&admin, &bob, &carol]), &admin.paar.private_key)
            .unwrap();

        let records = admin
            .ring
            .remove_member(room, carol.id, &admin.paar.private_key)
            .unwrap();

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.generation == 1));
        assert!(records.iter().all(|r| r.user_id != carol.id));
        assert_eq!(admin.ring.current_generation(room), Some(1));
        assert!(admin.ring.is_revoked(room, 0));
        assert!(!admin.ring.is_revoked(room, 1));

        // Alte Generation bleibt fuer den Verlauf lesbar
        let alt = admin.ring.key_for(room, 0).unwrap();
        let (gen, neu) = admin.ring.current_key(room).unwrap();
        assert_eq!(gen, 1);
        assert_ne!(alt.export_raw().unwrap(), neu.export_raw().unwrap());
    }

    #[test]
    fn austritt_eines_nicht_mitglieds_rotiert_nicht() {
        let admin = teilnehmer();
        let room = RoomId::new();
        admin
            .ring
            .create_room(room, &mitglieder(&[&admin]), &admin.paar.private_key)
            .unwrap();
        let records = admin
            .ring
            .remove_member(room, UserId::new(), &admin.paar.private_key)
            .unwrap();
        assert!(records.is_empty());
        assert_eq!(admin.ring.current_generation(room), Some(0));
    }

    #[test]
    fn manuelle_rotation_behaelt_mitglieder() {
        let admin = teilnehmer();
        let bob = teilnehmer();
        let room = RoomId::new();
        admin
            .ring
            .create_room(room, &mitglieder(&[&admin, &bob]), &admin.paar.private_key)
            .unwrap();
        let records = admin.ring.rotate_key(room, &admin.paar.private_key).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(admin.ring.current_generation(room), Some(1));
    }

    #[test]
    fn empfaenger_folgt_rotation() {
        let admin = teilnehmer();
        let bob = teilnehmer();
        let carol = teilnehmer();
        let room = RoomId::new();

        let gen0 = admin
            .ring
            .create_room(room, &mitglieder(&[&admin, &bob, &carol]), &admin.paar.private_key)
            .unwrap();
        bob.ring.store_wrapped(record_fuer(&gen0, bob.id)).unwrap();
        bob.ring
            .unlock(room, &mitglieder(&[&admin]), &bob.paar.private_key)
            .unwrap();

        let gen1 = admin
            .ring
            .remove_member(room, carol.id, &admin.paar.private_key)
            .unwrap();
        bob.ring.store_wrapped(record_fuer(&gen1, bob.id)).unwrap();
        assert_eq!(bob.ring.key_state(room), RoomKeyState::Verpackt);

        bob.ring
            .unlock(room, &mitglieder(&[&admin]), &bob.paar.private_key)
            .unwrap();
        assert_eq!(bob.ring.current_generation(room), Some(1));
        assert!(bob.ring.key_for(room, 0).is_ok());
        assert_eq!(bob.ring.key_state(room), RoomKeyState::Entpackt);
    }

    #[test]
    fn empfaenger_darf_nicht_rotieren() {
        let admin = teilnehmer();
        let bob = teilnehmer();
        let carol = teilnehmer();
        let room = RoomId::new();

        let gen0 = admin
            .ring
            .create_room(room, &mitglieder(&[&admin, &bob, &carol]), &admin.paar.private_key)
            .unwrap();
        bob.ring.store_wrapped(record_fuer(&gen0, bob.id)).unwrap();
        bob.ring
            .unlock(room, &mitglieder(&[&admin]), &bob.paar.private_key)
            .unwrap();

        let err = bob.ring.rotate_key(room, &bob.paar.private_key).unwrap_err();
        assert!(matches!(err, CryptoError::KeinVerteiler { .. }));
        assert_eq!(err.kategorie(), crate::error::FehlerKategorie::Eingabe);
        assert_eq!(bob.ring.current_generation(room), Some(0));
        assert!(!bob.ring.is_revoked(room, 0));

        let gen1 = admin
            .ring
            .remove_member(room, carol.id, &admin.paar.private_key)
            .unwrap();
        bob.ring.store_wrapped(record_fuer(&gen1, bob.id)).unwrap();
        bob.ring
            .unlock(room, &mitglieder(&[&admin]), &bob.paar.private_key)
            .unwrap();

        assert_eq!(
            bob.ring.key_for(room, 1).unwrap().export_raw().unwrap(),
            admin.ring.key_for(room, 1).unwrap().export_raw().unwrap()
        );
        assert!(bob.ring.is_revoked(room, 0));
        assert!(!bob.ring.is_revoked(room, 1));
    }

    #[test]
    fn empfaenger_verwaltet_keine_mitglieder() {
        let admin = teilnehmer();
        let bob = teilnehmer();
        let carol = teilnehmer();
        let room = RoomId::new();

        let records = admin
            .ring
            .create_room(room, &mitglieder(&[&admin, &bob]), &admin.paar.private_key)
            .unwrap();
        bob.ring.store_wrapped(record_fuer(&records, bob.id)).unwrap();

        let entfernt = bob.ring.remove_member(room, admin.id, &bob.paar.private_key);
        assert!(matches!(entfernt, Err(CryptoError::KeinVerteiler { .. })));

        let hinzu = bob.ring.add_member(
            room,
            carol.id,
            carol.paar.public_key.clone(),
            &bob.paar.private_key,
        );
        assert!(matches!(hinzu, Err(CryptoError::KeinVerteiler { .. })));
        assert!(bob.ring.members(room).is_empty());
        assert_eq!(bob.ring.key_state(room), RoomKeyState::Verpackt);

        // Ereignisse sind fuer Empfaenger ohne Wirkung
        let austritt = RaumEreignis::MitgliedEntfernt {
            room_id: room,
            user_id: admin.id,
        };
        let records = bob.ring.apply_event(&austritt, &bob.paar.private_key).unwrap();
        assert!(records.is_empty());
        assert_eq!(bob.ring.key_state(room), RoomKeyState::Verpackt);
    }

    #[test]
    fn generation_erst_nach_entpacken() {
        let admin = teilnehmer();
        let bob = teilnehmer();
        let dave = teilnehmer();
        let room = RoomId::new();

        admin
            .ring
            .create_room(room, &mitglieder(&[&admin, &bob]), &admin.paar.private_key)
            .unwrap();
        admin.ring.rotate_key(room, &admin.paar.private_key).unwrap();

        let record = admin
            .ring
            .add_member(room, dave.id, dave.paar.public_key.clone(), &admin.paar.private_key)
            .unwrap();
        assert_eq!(record.generation, 1);

        dave.ring.store_wrapped(record).unwrap();
        assert_eq!(dave.ring.current_generation(room), None);
        assert!(dave.ring.current_key(room).is_err());
        assert_eq!(dave.ring.key_state(room), RoomKeyState::Verpackt);

        dave.ring
            .unlock(room, &mitglieder(&[&admin]), &dave.paar.private_key)
            .unwrap();
        assert_eq!(dave.ring.current_generation(room), Some(1));
    }

    #[test]
    fn erneuter_datensatz_ersetzt_schluessel() {
        let admin = teilnehmer();
        let neuer_admin = teilnehmer();
        let bob = teilnehmer();
        let room = RoomId::new();

        let alt = admin
            .ring
            .create_room(room, &mitglieder(&[&admin, &bob]), &admin.paar.private_key)
            .unwrap();
        bob.ring.store_wrapped(record_fuer(&alt, bob.id)).unwrap();
        bob.ring
            .unlock(room, &mitglieder(&[&admin]), &bob.paar.private_key)
            .unwrap();

        // Gleiche Generation, anderer Schluessel
        let neu = neuer_admin
            .ring
            .create_room(room, &mitglieder(&[&neuer_admin, &bob]), &neuer_admin.paar.private_key)
            .unwrap();
        bob.ring.store_wrapped(record_fuer(&neu, bob.id)).unwrap();
        let n = bob
            .ring
            .unlock(room, &mitglieder(&[&neuer_admin]), &bob.paar.private_key)
            .unwrap();
        assert_eq!(n, 1);

        let (gen, key) = bob.ring.current_key(room).unwrap();
        let (_, erwartet) = neuer_admin.ring.current_key(room).unwrap();
        assert_eq!(gen, 0);
        assert_eq!(key.export_raw().unwrap(), erwartet.export_raw().unwrap());
    }

    #[test]
    fn verteiler_meldet_konflikt_bei_eigener_generation() {
        let admin = teilnehmer();
        let bob = teilnehmer();
        let room = RoomId::new();

        let records = admin
            .ring
            .create_room(room, &mitglieder(&[&admin, &bob]), &admin.paar.private_key)
            .unwrap();
        let (_, vorher) = admin.ring.current_key(room).unwrap();

        let err = admin
            .ring
            .store_wrapped(record_fuer(&records, admin.id))
            .unwrap_err();
        assert!(matches!(err, CryptoError::SchluesselKonflikt { generation: 0, .. }));

        let (_, nachher) = admin.ring.current_key(room).unwrap();
        assert_eq!(vorher.export_raw().unwrap(), nachher.export_raw().unwrap());
        assert_eq!(admin.ring.key_state(room), RoomKeyState::Entpackt);
    }

    #[test]
    fn ereignisse_steuern_den_schluesselbund() {
        let admin = teilnehmer();
        let bob = teilnehmer();
        let room = RoomId::new();
        let km = KeyManager::new(provider());

        admin
            .ring
            .create_room(room, &mitglieder(&[&admin]), &admin.paar.private_key)
            .unwrap();

        let beitritt = RaumEreignis::MitgliedBeigetreten {
            room_id: room,
            user_id: bob.id,
            public_key: km.export_public_key(&bob.paar.public_key).unwrap(),
        };
        let records = admin.ring.apply_event(&beitritt, &admin.paar.private_key).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_id, bob.id);

        let austritt = RaumEreignis::MitgliedEntfernt {
            room_id: room,
            user_id: bob.id,
        };
        let records = admin.ring.apply_event(&austritt, &admin.paar.private_key).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_id, admin.id);
        assert_eq!(records[0].generation, 1);

        let loeschen = RaumEreignis::RaumGeloescht { room_id: room };
        admin.ring.apply_event(&loeschen, &admin.paar.private_key).unwrap();
        assert_eq!(admin.ring.key_state(room), RoomKeyState::KeinSchluessel);
    }

    #[test]
    fn beitritt_mit_kaputtem_key_ist_eingabefehler() {
        let admin = teilnehmer();
        let room = RoomId::new();
        admin
            .ring
            .create_room(room, &mitglieder(&[&admin]), &admin.paar.private_key)
            .unwrap();
        let event = RaumEreignis::MitgliedBeigetreten {
            room_id: room,
            user_id: UserId::new(),
            public_key: "AAAA".into(),
        };
        let err = admin.ring.apply_event(&event, &admin.paar.private_key).unwrap_err();
        assert!(matches!(err, CryptoError::UngueltigerSchluessel(_)));
        assert_eq!(admin.ring.members(room).len(), 1);
    }

    #[test]
    fn record_ist_serde_kompatibel() {
        let admin = teilnehmer();
        let room = RoomId::new();
        let records = admin
            .ring
            .create_room(room, &mitglieder(&[&admin]), &admin.paar.private_key)
            .unwrap();
        let json = serde_json::to_string(&records[0]).unwrap();
        let zurueck: RoomKeyRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(zurueck, records[0]);
    }
}
