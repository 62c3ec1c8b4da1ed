//! Keytool-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! Standardwerte, sodass das Werkzeug ohne Konfigurationsdatei laeuft.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uninest_crypto::{CryptoProvider, OsProvider, SeededProvider};

use crate::logging::{log_format_gueltig, log_level_gueltig};

/// Vollstaendige Keytool-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeytoolConfig {
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Ablage der Schluessel-Dateien
    pub schluessel: SchluesselEinstellungen,
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level (trace, debug, info, warn, error)
    pub level: String,
    /// Ausgabeformat (text, json)
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Schluessel-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchluesselEinstellungen {
    /// Verzeichnis fuer `<name>.key` und `<name>.pub`
    pub verzeichnis: PathBuf,
    /// Fester Seed fuer reproduzierbare Fixtures. Niemals fuer echte Schluessel.
    pub rng_seed: Option<u64>,
}

impl Default for SchluesselEinstellungen {
    fn default() -> Self {
        Self {
            verzeichnis: PathBuf::from("keys"),
            rng_seed: None,
        }
    }
}

/// Herkunft einer geladenen Konfiguration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigQuelle {
    Datei,
    /// Datei fehlt, Standardwerte aktiv
    Standard,
}

impl KeytoolConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    ///
    /// Loggt nicht selbst; `ConfigQuelle::Standard` meldet die fehlende Datei.
    pub fn laden(pfad: &str) -> anyhow::Result<(Self, ConfigQuelle)> {
        let (config, quelle) = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                (config, ConfigQuelle::Datei)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                (Self::default(), ConfigQuelle::Standard)
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };
        config.validieren()?;
        Ok((config, quelle))
    }

    /// Prueft Werte, die serde allein nicht abfangen kann
    pub fn validieren(&self) -> anyhow::Result<()> {
        if !log_level_gueltig(&self.logging.level) {
            anyhow::bail!("Ungueltiges Log-Level '{}'", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            anyhow::bail!("Ungueltiges Log-Format '{}'", self.logging.format);
        }
        Ok(())
    }

    /// Zufallsquelle gemaess Konfiguration
    pub fn provider(&self) -> Arc<dyn CryptoProvider> {
        match self.schluessel.rng_seed {
            Some(seed) => {
                tracing::warn!(seed, "Deterministischer RNG aktiv, nur fuer Fixtures verwenden");
                Arc::new(SeededProvider::new(seed))
            }
            None => Arc::new(OsProvider),
        }
    }
}
