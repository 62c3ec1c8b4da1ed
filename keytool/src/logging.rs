//! Logging-Setup fuer das Keytool
//!
//! - `UNINEST_LOG_LEVEL`: Filter-Direktive, hat Vorrang vor `[logging] level`
//! - `UNINEST_LOG_FORMAT`: `text` oder `json`, hat Vorrang vor `[logging] format`
//!
//! Logs gehen nach stderr, stdout bleibt fuer Schluessel und Ciphertext frei.

use std::str::FromStr;

use tracing_subscriber::{fmt, EnvFilter};

/// Ausgabeformat der Log-Zeilen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("Unbekanntes Log-Format '{other}'")),
        }
    }
}

/// Initialisiert tracing-subscriber. Ungueltige Werte fallen auf `info` / Text zurueck.
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = EnvFilter::try_from_env("UNINEST_LOG_LEVEL")
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = std::env::var("UNINEST_LOG_FORMAT")
        .ok()
        .and_then(|f| f.parse().ok())
        .or_else(|| format.parse().ok())
        .unwrap_or_default();

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Prueft ein Log-Level aus der Konfiguration (nur die fuenf Stufen, klein geschrieben)
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

pub fn log_format_gueltig(format: &str) -> bool {
    format.parse::<LogFormat>().is_ok()
}
