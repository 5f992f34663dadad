//! QUIC-Sessions auf Basis von quinn
//!
//! Eine QUIC-Verbindung ist eine Session, jeder unidirektionale Stream
//! traegt genau eine Nachricht. Handshakes laufen im Hintergrund parallel,
//! ein langsamer Client blockiert also keine anderen Verbindungsaufbauten.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quinn::crypto::rustls::{QuicClientConfig, QuicServerConfig};
use quinn::{Connection, Endpoint, TransportConfig, VarInt};
use tokio::sync::{mpsc, Mutex};

use crate::error::{TransportError, TransportResult};
use crate::session::{AusgehenderStream, EingehenderStream, Session, SessionListener};

/// Fehlercode beim regulaeren Schliessen einer Verbindung
const SCHLIESS_CODE: u32 = 0;

/// Wie viele fertig ausgehandelte Verbindungen auf `accept()` warten duerfen
const HANDSHAKE_QUEUE: usize = 64;

fn transport_config(keepalive: Duration) -> Arc<TransportConfig> {
    let mut transport = TransportConfig::default();
    transport.keep_alive_interval(Some(keepalive));
    Arc::new(transport)
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Eine QUIC-Verbindung als Session
pub struct QuicSession {
    connection: Connection,
    /// Client-seitig: eigener Endpunkt, muss so lange leben wie die Verbindung
    endpoint: Option<Endpoint>,
}

impl QuicSession {
    fn neu(connection: Connection, endpoint: Option<Endpoint>) -> Self {
        Self {
            connection,
            endpoint,
        }
    }

    /// Wartet bis ausstehende Close-Frames gesendet wurden
    ///
    /// Nur auf Client-Sessions sinnvoll; Server-Sessions kehren sofort zurueck.
    pub async fn warten_bis_leerlauf(&self) {
        if let Some(endpoint) = &self.endpoint {
            endpoint.wait_idle().await;
        }
    }
}

#[async_trait]
impl Session for QuicSession {
    async fn accept_stream(&self) -> TransportResult<EingehenderStream> {
        let stream = self.connection.accept_uni().await?;
        Ok(Box::new(stream))
    }

    async fn open_stream(&self) -> TransportResult<AusgehenderStream> {
        let stream = self.connection.open_uni().await?;
        Ok(Box::new(stream))
    }

    fn remote_identity(&self) -> String {
        self.connection.remote_address().to_string()
    }

    fn close(&self, grund: &str) {
        self.connection
            .close(VarInt::from_u32(SCHLIESS_CODE), grund.as_bytes());
    }
}

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

/// QUIC-Server-Endpunkt
pub struct QuicListener {
    endpoint: Endpoint,
    fertig: Mutex<mpsc::Receiver<TransportResult<QuicSession>>>,
}

impl QuicListener {
    /// Bindet einen QUIC-Endpunkt und startet die Handshake-Schleife
    ///
    /// Muss innerhalb einer Tokio-Runtime aufgerufen werden.
    pub fn binden(
        adresse: SocketAddr,
        tls: rustls::ServerConfig,
        keepalive: Duration,
    ) -> TransportResult<Self> {
        let crypto = QuicServerConfig::try_from(tls)
            .map_err(|e| TransportError::Konfiguration(e.to_string()))?;
        let mut server_config = quinn::ServerConfig::with_crypto(Arc::new(crypto));
        server_config.transport_config(transport_config(keepalive));

        let endpoint = Endpoint::server(server_config, adresse)?;
        let (tx, rx) = mpsc::channel(HANDSHAKE_QUEUE);
        tokio::spawn(handshake_schleife(endpoint.clone(), tx));

        Ok(Self {
            endpoint,
            fertig: Mutex::new(rx),
        })
    }

    /// Tatsaechlich gebundene Adresse (relevant bei Port 0)
    pub fn local_addr(&self) -> TransportResult<SocketAddr> {
        Ok(self.endpoint.local_addr()?)
    }
}

/// Nimmt eingehende Verbindungen an und handelt sie parallel aus
///
/// Endet, sobald der Endpunkt geschlossen wird; der Kanal schliesst sich,
/// wenn auch alle laufenden Handshakes fertig sind.
async fn handshake_schleife(endpoint: Endpoint, tx: mpsc::Sender<TransportResult<QuicSession>>) {
    while let Some(incoming) = endpoint.accept().await {
        let tx = tx.clone();
        tokio::spawn(async move {
            let peer = incoming.remote_address();
            let ergebnis = match incoming.await {
                Ok(connection) => Ok(QuicSession::neu(connection, None)),
                Err(e) => {
                    tracing::debug!(peer = %peer, fehler = %e, "QUIC-Handshake fehlgeschlagen");
                    Err(TransportError::Handshake(format!("{peer}: {e}")))
                }
            };
            let _ = tx.send(ergebnis).await;
        });
    }
    tracing::debug!("QUIC-Endpunkt nimmt keine Verbindungen mehr an");
}

#[async_trait]
impl SessionListener for QuicListener {
    type Session = QuicSession;

    async fn accept(&self) -> TransportResult<QuicSession> {
        self.fertig
            .lock()
            .await
            .recv()
            .await
            .unwrap_or(Err(TransportError::ListenerGeschlossen))
    }

    fn close(&self) {
        self.endpoint
            .close(VarInt::from_u32(SCHLIESS_CODE), b"server closed");
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Baut eine QUIC-Session zum Server auf
///
/// `server_name` wird fuer SNI und (im WebPki-Modus) die Zertifikatspruefung
/// verwendet.
pub async fn verbinden(
    server: SocketAddr,
    server_name: &str,
    tls: rustls::ClientConfig,
    keepalive: Duration,
) -> TransportResult<QuicSession> {
    let crypto = QuicClientConfig::try_from(tls)
        .map_err(|e| TransportError::Konfiguration(e.to_string()))?;
    let mut client_config = quinn::ClientConfig::new(Arc::new(crypto));
    client_config.transport_config(transport_config(keepalive));

    let lokal: SocketAddr = if server.is_ipv6() {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    };
    let mut endpoint = Endpoint::client(lokal)?;
    endpoint.set_default_client_config(client_config);

    let connection = endpoint
        .connect(server, server_name)
        .map_err(|e| TransportError::Verbindungsaufbau(e.to_string()))?
        .await
        .map_err(|e| TransportError::Verbindungsaufbau(e.to_string()))?;

    tracing::debug!(server = %server, "QUIC-Verbindung aufgebaut");
    Ok(QuicSession::neu(connection, Some(endpoint)))
}
