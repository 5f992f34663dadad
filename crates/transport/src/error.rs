//! Fehlertypen fuer den Transport

use thiserror::Error;

/// Fehler einer Session oder eines Listeners
#[derive(Debug, Error)]
pub enum TransportError {
    /// Session ist nicht mehr benutzbar (Gegenseite weg, Timeout, lokal geschlossen)
    #[error("Session beendet: {0}")]
    SessionBeendet(String),

    /// Listener nimmt keine Sessions mehr an
    #[error("Listener geschlossen")]
    ListenerGeschlossen,

    /// Handshake einer einzelnen eingehenden Verbindung fehlgeschlagen
    #[error("Handshake fehlgeschlagen: {0}")]
    Handshake(String),

    /// Ausgehender Verbindungsaufbau fehlgeschlagen
    #[error("Verbindungsaufbau fehlgeschlagen: {0}")]
    Verbindungsaufbau(String),

    /// Ungueltige TLS-/QUIC-Konfiguration
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    /// IO-Fehler (Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Gibt true zurueck wenn der Listener endgueltig geschlossen ist
    pub fn ist_listener_geschlossen(&self) -> bool {
        matches!(self, Self::ListenerGeschlossen)
    }
}

impl From<quinn::ConnectionError> for TransportError {
    fn from(e: quinn::ConnectionError) -> Self {
        Self::SessionBeendet(e.to_string())
    }
}

/// Result-Typ fuer den Transport
pub type TransportResult<T> = Result<T, TransportError>;
