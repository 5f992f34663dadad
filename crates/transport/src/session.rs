//! Session- und Listener-Traits
//!
//! Eine Session ist eine langlebige, gesicherte Verbindung zu genau einer
//! Gegenstelle, in der beliebig viele unabhaengige Streams laufen. Reader
//! (nimmt Streams an) und Dispatcher (oeffnet Streams) arbeiten gleichzeitig
//! auf derselben Session, daher `&self` ueberall.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::TransportResult;

/// Lesende Seite eines von der Gegenstelle geoeffneten Streams
pub type EingehenderStream = Box<dyn AsyncRead + Send + Unpin>;

/// Schreibende Seite eines lokal geoeffneten Streams
///
/// `shutdown()` schliesst den Stream; die Gegenstelle liest danach EOF.
pub type AusgehenderStream = Box<dyn AsyncWrite + Send + Unpin>;

/// Gesicherte, gemultiplexte Session
#[async_trait]
pub trait Session: Send + Sync + 'static {
    /// Wartet auf den naechsten von der Gegenstelle geoeffneten Stream
    ///
    /// Ein Fehler bedeutet, dass die Session nicht mehr benutzbar ist.
    async fn accept_stream(&self) -> TransportResult<EingehenderStream>;

    /// Oeffnet einen neuen Stream zur Gegenstelle
    async fn open_stream(&self) -> TransportResult<AusgehenderStream>;

    /// Lesbare Kennung der Gegenstelle (z.B. Socket-Adresse)
    fn remote_identity(&self) -> String;

    /// Schliesst die Session; wartende `accept_stream`-Aufrufe kehren mit Fehler zurueck
    fn close(&self, grund: &str);
}

/// Liefert angenommene, fertig ausgehandelte Sessions
#[async_trait]
pub trait SessionListener: Send + Sync + 'static {
    type Session: Session;

    /// Wartet auf die naechste Session
    ///
    /// `TransportError::ListenerGeschlossen` ist endgueltig; andere Fehler
    /// betreffen nur eine einzelne eingehende Verbindung.
    async fn accept(&self) -> TransportResult<Self::Session>;

    /// Nimmt keine weiteren Sessions mehr an
    fn close(&self);
}
