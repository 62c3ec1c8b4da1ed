//! UniNest Keytool – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und fuehrt einen
//! Befehl aus. Ergebnisse gehen nach stdout, Logs nach stderr.

use anyhow::Result;
use clap::{Parser, Subcommand};
use uninest_keytool::{
    config::{ConfigQuelle, KeytoolConfig},
    logging::logging_initialisieren,
    Keytool,
};

#[derive(Debug, Parser)]
#[command(name = "uninest-keytool", version, about = "UniNest E2EE Schluessel-Werkzeug")]
struct Cli {
    /// Pfad zur Konfigurationsdatei
    #[arg(long, env = "UNINEST_CONFIG", default_value = "uninest.toml")]
    config: String,

    #[command(subcommand)]
    befehl: Befehl,
}

#[derive(Debug, Subcommand)]
enum Befehl {
    /// Erzeugt ein P-256-Schluessel-Paar und gibt den oeffentlichen Schluessel aus
    Keygen {
        name: String,
    },
    /// Gibt den oeffentlichen Schluessel eines Paares aus (SPKI-Base64)
    PublicKey {
        name: String,
    },
    /// Erzeugt einen Sitzungsschluessel (Roh-Export, Base64)
    SessionKey,
    /// Packt einen Sitzungsschluessel ein
    Wrap {
        /// Absender (privater Schluessel)
        #[arg(long)]
        from: String,
        /// Empfaenger (oeffentlicher Schluessel)
        #[arg(long)]
        to: String,
        /// Sitzungsschluessel, Base64
        #[arg(long)]
        key: String,
    },
    /// Packt einen Sitzungsschluessel aus
    Unwrap {
        /// Absender (oeffentlicher Schluessel)
        #[arg(long)]
        from: String,
        /// Empfaenger (privater Schluessel)
        #[arg(long)]
        to: String,
        /// JSON-Umschlag {"ciphertext": ..., "iv": ...}
        #[arg(long)]
        envelope: String,
    },
    /// Verschluesselt Text, Ausgabe als JSON {"ciphertext": ..., "iv": ...}
    Encrypt {
        #[arg(long)]
        key: String,
        #[arg(long)]
        text: String,
    },
    /// Entschluesselt Text
    Decrypt {
        #[arg(long)]
        key: String,
        #[arg(long)]
        ciphertext: String,
        #[arg(long)]
        iv: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let (config, quelle) = KeytoolConfig::laden(&cli.config)?;

    logging_initialisieren(&config.logging.level, &config.logging.format);

    if quelle == ConfigQuelle::Standard {
        tracing::warn!(
            pfad = %cli.config,
            "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
        );
    }

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config,
        "UniNest Keytool gestartet"
    );

    let tool = Keytool::neu(&config);
    let ausgabe = match cli.befehl {
        Befehl::Keygen { name } => tool.keygen(&name)?,
        Befehl::PublicKey { name } => tool.public_key(&name)?,
        Befehl::SessionKey => tool.session_key()?,
        Befehl::Wrap { from, to, key } => tool.wrap(&from, &to, &key)?,
        Befehl::Unwrap { from, to, envelope } => tool.unwrap(&from, &to, &envelope)?,
        Befehl::Encrypt { key, text } => serde_json::to_string(&tool.encrypt(&key, &text)?)?,
        Befehl::Decrypt {
            key,
            ciphertext,
            iv,
        } => tool.decrypt(&key, &ciphertext, &iv)?,
    };

    println!("{ausgabe}");
    Ok(())
}
