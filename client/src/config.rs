//! Client-Konfiguration
//!
//! TOML-Datei aus `QUICCHAT_CLIENT_CONFIG` (Standard: `client.toml`).
//! `QUICCHAT_NICKNAME` ueberschreibt den Nickname aus der Datei.

use anyhow::{bail, Context};
use quicchat_crypto::ClientTlsConfig;
use quicchat_observability::logging::{log_format_gueltig, log_level_gueltig};
use serde::{Deserialize, Serialize};

/// Vollstaendige Client-Konfiguration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server als `host:port`
    pub server_adresse: String,
    /// Name fuer SNI und Zertifikatspruefung
    pub server_name: String,
    pub nickname: String,
    /// SHA-256 Fingerprint des Server-Zertifikats (`AA:BB:...`), pinnt den Server
    pub fingerprint: Option<String>,
    /// Akzeptiert jedes Zertifikat, falls kein Fingerprint gesetzt ist
    pub unsicher: bool,
    pub logging: ClientLogging,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_adresse: "127.0.0.1:4242".into(),
            server_name: "localhost".into(),
            nickname: "gast".into(),
            fingerprint: None,
            unsicher: true,
            logging: ClientLogging::default(),
        }
    }
}

/// Logging des Clients (immer nach stderr)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientLogging {
    pub level: String,
    pub format: String,
}

impl Default for ClientLogging {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "text".into(),
        }
    }
}

impl ClientConfig {
    /// Laedt die Konfiguration; eine fehlende Datei ergibt Standardwerte
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let mut config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str::<Self>(&inhalt)
                .with_context(|| format!("Konfigurationsfehler in '{pfad}'"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                return Err(e).with_context(|| format!("Konfigurationsdatei '{pfad}' nicht lesbar"))
            }
        };

        if let Ok(nickname) = std::env::var("QUICCHAT_NICKNAME") {
            config.nickname = nickname;
        }

        config.validieren()?;
        Ok(config)
    }

    pub fn validieren(&self) -> anyhow::Result<()> {
        if self.nickname.trim().is_empty() {
            bail!("nickname darf nicht leer sein");
        }
        if self.server_adresse.trim().is_empty() {
            bail!("server_adresse darf nicht leer sein");
        }
        if !log_level_gueltig(&self.logging.level) {
            bail!("logging.level muss trace, debug, info, warn oder error sein");
        }
        if !log_format_gueltig(&self.logging.format) {
            bail!("logging.format muss 'text' oder 'json' sein");
        }
        Ok(())
    }

    /// Pruefmodus fuer das Server-Zertifikat
    ///
    /// Ein gesetzter Fingerprint hat Vorrang vor `unsicher`.
    pub fn tls_config(&self) -> ClientTlsConfig {
        match (&self.fingerprint, self.unsicher) {
            (Some(fingerprint), _) => ClientTlsConfig::with_fingerprint(fingerprint.clone()),
            (None, true) => ClientTlsConfig::new_insecure(),
            (None, false) => ClientTlsConfig::new(),
        }
    }
}
