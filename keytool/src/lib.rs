//! uninest-keytool – Bibliotheks-Root
//!
//! Die Befehle des Werkzeugs als Funktionen, damit sie ohne Prozess-Start
//! getestet werden koennen. Schluessel liegen als Textdateien im
//! konfigurierten Verzeichnis:
//! - `<name>.key`: privater Schluessel, PKCS#8-Base64
//! - `<name>.pub`: oeffentlicher Schluessel, SPKI-Base64

pub mod config;
pub mod logging;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::KeytoolConfig;
use uninest_crypto::{
    EcdhPrivateKey, EcdhPublicKey, EncryptedContent, KeyManager, SessionKeyWrapper, SymmetricKey,
};

/// Haelt Konfiguration und Krypto-Bausteine zusammen
#[derive(Debug)]
pub struct Keytool {
    verzeichnis: PathBuf,
    keys: KeyManager,
    wrapper: SessionKeyWrapper,
}

impl Keytool {
    /// Erstellt das Werkzeug aus der gegebenen Konfiguration
    pub fn neu(config: &KeytoolConfig) -> Self {
        let provider = config.provider();
        Self {
            verzeichnis: config.schluessel.verzeichnis.clone(),
            keys: KeyManager::new(provider.clone()),
            wrapper: SessionKeyWrapper::new(provider),
        }
    }

    /// Erzeugt ein Schluessel-Paar und schreibt `<name>.key` und `<name>.pub`
    ///
    /// Gibt den oeffentlichen Schluessel zurueck. Ein vorhandenes Paar wird
    /// nicht ueberschrieben. `<name>.key` entsteht zuletzt und nur zusammen
    /// mit `<name>.pub`.
    pub fn keygen(&self, name: &str) -> Result<String> {
        let key_pfad = self.pfad(name, "key")?;
        let pub_pfad = self.pfad(name, "pub")?;
        if key_pfad.exists() {
            anyhow::bail!("Schluessel '{}' existiert bereits", key_pfad.display());
        }

        std::fs::create_dir_all(&self.verzeichnis).with_context(|| {
            format!("Verzeichnis '{}' nicht anlegbar", self.verzeichnis.display())
        })?;

        let pair = self.keys.generate_key_pair()?;
        let privat = self.keys.export_private_key(&pair.private_key)?;
        let oeffentlich = self.keys.export_public_key(&pair.public_key)?;

        std::fs::write(&pub_pfad, &oeffentlich)
            .with_context(|| format!("'{}' nicht schreibbar", pub_pfad.display()))?;
        if let Err(e) = privat_schreiben(&key_pfad, &privat) {
            let _ = std::fs::remove_file(&pub_pfad);
            return Err(e);
        }

        tracing::info!(schluessel = name, pfad = %key_pfad.display(), "Schluessel-Paar erzeugt");
        Ok(oeffentlich)
    }

    /// Liest den oeffentlichen Schluessel eines Paares
    pub fn public_key(&self, name: &str) -> Result<String> {
        let key = self.oeffentlich_laden(name)?;
        Ok(self.keys.export_public_key(&key)?)
    }

    /// Erzeugt einen Sitzungsschluessel, Roh-Export als Base64
    pub fn session_key(&self) -> Result<String> {
        let key = self.wrapper.generate_session_key()?;
        Ok(key.export_raw()?)
    }

    /// Packt einen Sitzungsschluessel von `from` fuer `to` ein
    pub fn wrap(&self, from: &str, to: &str, session_key: &str) -> Result<String> {
        let sender = self.privat_laden(from)?;
        let empfaenger = self.oeffentlich_laden(to)?;
        let session = SymmetricKey::import_raw(session_key).context("Sitzungsschluessel ungueltig")?;
        Ok(self.wrapper.wrap_session_key(&session, &empfaenger, &sender)?)
    }

    /// Packt einen von `from` fuer `to` eingepackten Sitzungsschluessel aus
    pub fn unwrap(&self, from: &str, to: &str, envelope: &str) -> Result<String> {
        let sender = self.oeffentlich_laden(from)?;
        let empfaenger = self.privat_laden(to)?;
        let session = self
            .wrapper
            .unwrap_session_key(envelope, &sender, &empfaenger)?;
        Ok(session.export_raw()?)
    }

    /// Verschluesselt Text mit einem Sitzungsschluessel
    pub fn encrypt(&self, session_key: &str, text: &str) -> Result<EncryptedContent> {
        let session = SymmetricKey::import_raw(session_key).context("Sitzungsschluessel ungueltig")?;
        Ok(self.wrapper.session_crypto().encrypt_content(text, &session)?)
    }

    /// Entschluesselt Text mit einem Sitzungsschluessel
    pub fn decrypt(&self, session_key: &str, ciphertext: &str, iv: &str) -> Result<String> {
        let session = SymmetricKey::import_raw(session_key).context("Sitzungsschluessel ungueltig")?;
        Ok(self
            .wrapper
            .session_crypto()
            .decrypt_content(ciphertext, iv, &session)?)
    }

    fn privat_laden(&self, name: &str) -> Result<EcdhPrivateKey> {
        let pfad = self.pfad(name, "key")?;
        let inhalt = std::fs::read_to_string(&pfad)
            .with_context(|| format!("'{}' nicht lesbar", pfad.display()))?;
        self.keys
            .import_private_key(&inhalt)
            .with_context(|| format!("'{}' enthaelt keinen privaten P-256-Schluessel", pfad.display()))
    }

    fn oeffentlich_laden(&self, name: &str) -> Result<EcdhPublicKey> {
        let pfad = self.pfad(name, "pub")?;
        let inhalt = std::fs::read_to_string(&pfad)
            .with_context(|| format!("'{}' nicht lesbar", pfad.display()))?;
        self.keys
            .import_public_key(&inhalt)
            .with_context(|| format!("'{}' enthaelt keinen oeffentlichen P-256-Schluessel", pfad.display()))
    }

    fn pfad(&self, name: &str, endung: &str) -> Result<PathBuf> {
        let gueltig = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !name.starts_with('.');
        if !gueltig {
            anyhow::bail!("Ungueltiger Schluesselname '{name}'");
        }
        Ok(self.verzeichnis.join(format!("{name}.{endung}")))
    }
}

#[cfg(unix)]
fn privat_schreiben(pfad: &Path, inhalt: &str) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut datei = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(pfad)
        .with_context(|| format!("'{}' nicht schreibbar", pfad.display()))?;
    datei.write_all(inhalt.as_bytes())?;
    Ok(())
}

#[cfg(not(unix))]
fn privat_schreiben(pfad: &Path, inhalt: &str) -> Result<()> {
    std::fs::write(pfad, inhalt).with_context(|| format!("'{}' nicht schreibbar", pfad.display()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
