//! Laufzeit-Konfiguration des Hubs

use std::time::Duration;

use quicchat_protocol::DEFAULT_MAX_NACHRICHT_GROESSE;

/// Standard-Obergrenze gleichzeitig registrierter Peers
pub const DEFAULT_MAX_CLIENTS: usize = 512;

/// Standard-Kapazitaet der Eingangs-Queue
pub const DEFAULT_EINGANGS_QUEUE: usize = 64;

/// Standard-Kapazitaet der Ausgangs-Queue pro Peer
pub const DEFAULT_AUSGANGS_QUEUE: usize = 64;

/// Standard-Zeitlimit fuer eine einzelne Zustellung
pub const DEFAULT_SENDE_TIMEOUT: Duration = Duration::from_secs(5);

/// Standard-Zeitlimit, bis ein eingehender Stream vollstaendig gelesen sein muss
pub const DEFAULT_LESE_TIMEOUT: Duration = Duration::from_secs(10);

/// Konfiguration fuer Acceptor, Reader, Dispatcher und Writer
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximale Anzahl gleichzeitig registrierter Peers
    pub max_clients: usize,
    /// Kapazitaet der Eingangs-Queue zwischen Readern und Dispatcher
    pub eingangs_queue_groesse: usize,
    /// Kapazitaet der Ausgangs-Queue jedes Peers; bei voller Queue wird verworfen
    pub ausgangs_queue_groesse: usize,
    /// Maximale Groesse einer kodierten Nachricht in Bytes
    pub max_nachricht_groesse: usize,
    /// Zeitlimit fuer Stream-Oeffnen + Schreiben pro Peer
    pub sende_timeout: Duration,
    /// Zeitlimit fuer das Lesen eines eingehenden Streams bis EOF
    pub lese_timeout: Duration,
    /// Ob der Absender seine eigene Nachricht zurueckbekommt
    pub echo_an_absender: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_clients: DEFAULT_MAX_CLIENTS,
            eingangs_queue_groesse: DEFAULT_EINGANGS_QUEUE,
            ausgangs_queue_groesse: DEFAULT_AUSGANGS_QUEUE,
            max_nachricht_groesse: DEFAULT_MAX_NACHRICHT_GROESSE,
            sende_timeout: DEFAULT_SENDE_TIMEOUT,
            lese_timeout: DEFAULT_LESE_TIMEOUT,
            echo_an_absender: false,
        }
    }
}
