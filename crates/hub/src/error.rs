//! Fehlertypen fuer den Hub

use std::time::Duration;

use quicchat_protocol::WireError;
use quicchat_transport::TransportError;
use thiserror::Error;

/// Fehlertyp fuer den Hub
#[derive(Debug, Error)]
pub enum HubError {
    /// Session nicht mehr benutzbar oder Stream konnte nicht geoeffnet werden
    #[error("Transportfehler: {0}")]
    Transport(#[from] TransportError),

    /// Kodieren, Dekodieren oder Schreiben einer Nachricht fehlgeschlagen
    #[error("Nachrichtenfehler: {0}")]
    Wire(#[from] WireError),

    /// Zustellung oder Lesen hat das Zeitlimit ueberschritten
    #[error("Timeout nach {0:?}")]
    Timeout(Duration),

    /// Ausgangs-Queue eines Peers ist voll, die Nachricht wird verworfen
    #[error("Ausgangs-Queue voll")]
    AusgangVoll,

    /// Writer des Peers laeuft nicht mehr
    #[error("Peer getrennt")]
    PeerGetrennt,

    /// Server ist voll
    #[error("Server ist voll")]
    ServerVoll,

    /// `ChatServer::starten` wurde mehr als einmal aufgerufen
    #[error("Server wurde bereits gestartet")]
    BereitsGestartet,
}

/// Result-Typ fuer den Hub
pub type HubResult<T> = Result<T, HubError>;
