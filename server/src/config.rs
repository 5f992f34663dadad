//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use quicchat_hub::HubConfig;
use quicchat_observability::logging::{log_format_gueltig, log_level_gueltig};
use serde::{Deserialize, Serialize};

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen (QUIC, TLS)
    pub netzwerk: NetzwerkEinstellungen,
    /// Chat-Einstellungen (Queue, Nachrichtengroesse, Timeouts)
    pub chat: ChatEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers (nur fuer Logs)
    pub name: String,
    /// Maximale Anzahl gleichzeitiger Clients
    pub max_clients: usize,
    /// Absender bekommt seine eigene Nachricht zurueck
    pub echo_an_absender: bool,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "quicchat".into(),
            max_clients: 512,
            echo_an_absender: false,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer den QUIC-Endpunkt
    pub bind_adresse: String,
    /// UDP-Port fuer QUIC
    pub port: u16,
    /// TLS-Zertifikat-Pfad (leer = selbstsigniertes Zertifikat beim Start)
    pub tls_zertifikat: Option<String>,
    /// TLS-Schluessel-Pfad
    pub tls_schluessel: Option<String>,
    /// Keep-Alive-Intervall in Sekunden
    pub keepalive_sek: u64,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 4242,
            tls_zertifikat: None,
            tls_schluessel: None,
            keepalive_sek: 10,
        }
    }
}

/// Chat-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatEinstellungen {
    /// Kapazitaet der Eingangs-Queue
    pub eingangs_queue_groesse: usize,
    /// Maximale Groesse einer kodierten Nachricht
    pub max_nachricht_bytes: usize,
    /// Kapazitaet der Ausgangs-Queue pro Peer
    pub ausgangs_queue_groesse: usize,
    /// Zeitlimit pro Zustellung in Millisekunden
    pub sende_timeout_ms: u64,
    /// Zeitlimit, in dem ein eingehender Stream beendet sein muss
    pub lese_timeout_ms: u64,
}

impl Default for ChatEinstellungen {
    fn default() -> Self {
        Self {
            eingangs_queue_groesse: 64,
            max_nachricht_bytes: 64 * 1024,
            ausgangs_queue_groesse: 64,
            sende_timeout_ms: 5000,
            lese_timeout_ms: 10_000,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
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

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den Observability-Server
    pub aktiviert: bool,
    /// Port fuer Metriken und Health (Standard: 9300)
    pub port: u16,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            port: 9300,
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str::<Self>(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };

        config.validieren()?;
        Ok(config)
    }

    /// Prueft Werte, die zur Laufzeit nicht funktionieren wuerden
    pub fn validieren(&self) -> anyhow::Result<()> {
        if self.server.max_clients == 0 {
            bail!("server.max_clients muss groesser als 0 sein");
        }
        if self.chat.eingangs_queue_groesse == 0 {
            bail!("chat.eingangs_queue_groesse muss groesser als 0 sein");
        }
        if self.chat.max_nachricht_bytes == 0 {
            bail!("chat.max_nachricht_bytes muss groesser als 0 sein");
        }
        if self.chat.ausgangs_queue_groesse == 0 {
            bail!("chat.ausgangs_queue_groesse muss groesser als 0 sein");
        }
        if self.chat.sende_timeout_ms == 0 {
            bail!("chat.sende_timeout_ms muss groesser als 0 sein");
        }
        if self.chat.lese_timeout_ms == 0 {
            bail!("chat.lese_timeout_ms muss groesser als 0 sein");
        }
        if self.netzwerk.keepalive_sek == 0 {
            bail!("netzwerk.keepalive_sek muss groesser als 0 sein");
        }
        if self.netzwerk.tls_zertifikat.is_some() != self.netzwerk.tls_schluessel.is_some() {
            bail!("netzwerk.tls_zertifikat und netzwerk.tls_schluessel nur gemeinsam angeben");
        }
        if !log_level_gueltig(&self.logging.level) {
            bail!("logging.level muss trace, debug, info, warn oder error sein");
        }
        if !log_format_gueltig(&self.logging.format) {
            bail!("logging.format muss 'text' oder 'json' sein");
        }
        Ok(())
    }

    /// Gibt die Bind-Adresse fuer den QUIC-Endpunkt zurueck
    pub fn quic_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        let adresse = format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port);
        adresse
            .parse()
            .with_context(|| format!("Ungueltige Bind-Adresse '{adresse}'"))
    }

    /// Gibt die Bind-Adresse fuer den Observability-Server zurueck
    pub fn observability_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        let adresse = format!("{}:{}", self.netzwerk.bind_adresse, self.observability.port);
        adresse
            .parse()
            .with_context(|| format!("Ungueltige Observability-Adresse '{adresse}'"))
    }

    /// Konfigurierte PEM-Dateien (Zertifikat, Schluessel), falls vorhanden
    pub fn tls_dateien(&self) -> Option<(&Path, &Path)> {
        match (&self.netzwerk.tls_zertifikat, &self.netzwerk.tls_schluessel) {
            (Some(zertifikat), Some(schluessel)) => {
                Some((Path::new(zertifikat), Path::new(schluessel)))
            }
            _ => None,
        }
    }

    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.netzwerk.keepalive_sek)
    }

    /// Laufzeit-Konfiguration fuer den Hub
    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            max_clients: self.server.max_clients,
            eingangs_queue_groesse: self.chat.eingangs_queue_groesse,
            ausgangs_queue_groesse: self.chat.ausgangs_queue_groesse,
            max_nachricht_groesse: self.chat.max_nachricht_bytes,
            sende_timeout: Duration::from_millis(self.chat.sende_timeout_ms),
            lese_timeout: Duration::from_millis(self.chat.lese_timeout_ms),
            echo_an_absender: self.server.echo_an_absender,
        }
    }
}
