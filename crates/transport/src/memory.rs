//! In-Process-Sessions
//!
//! Zwei `MemorySession`s bilden ein Paar. Jeder geoeffnete Stream ist ein
//! `tokio::io::duplex`; die Leseseite wird der Gegenseite ueber einen Kanal
//! zugestellt. Beide Enden teilen sich ein Geschlossen-Flag, `close()` auf
//! einer Seite beendet also die ganze Session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::DuplexStream;
use tokio::sync::{mpsc, watch, Mutex};

use crate::error::{TransportError, TransportResult};
use crate::session::{AusgehenderStream, EingehenderStream, Session, SessionListener};

/// Puffergroesse eines einzelnen Streams
const STREAM_PUFFER: usize = 64 * 1024;

/// Ein Ende einer In-Process-Session
pub struct MemorySession {
    gegenseite: String,
    eingang: Mutex<mpsc::UnboundedReceiver<DuplexStream>>,
    ausgang: mpsc::UnboundedSender<DuplexStream>,
    geschlossen: Arc<watch::Sender<bool>>,
}

impl MemorySession {
    /// Gibt true zurueck wenn eine der beiden Seiten `close()` aufgerufen hat
    pub fn ist_geschlossen(&self) -> bool {
        *self.geschlossen.borrow()
    }
}

/// Erstellt ein verbundenes Session-Paar
///
/// `a.remote_identity()` liefert `name_b` und umgekehrt.
pub fn session_paar(name_a: impl Into<String>, name_b: impl Into<String>) -> (MemorySession, MemorySession) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();
    let (geschlossen, _) = watch::channel(false);
    let geschlossen = Arc::new(geschlossen);

    let a = MemorySession {
        gegenseite: name_b.into(),
        eingang: Mutex::new(a_rx),
        ausgang: b_tx,
        geschlossen: Arc::clone(&geschlossen),
    };
    let b = MemorySession {
        gegenseite: name_a.into(),
        eingang: Mutex::new(b_rx),
        ausgang: a_tx,
        geschlossen,
    };
    (a, b)
}

#[async_trait]
impl Session for MemorySession {
    async fn accept_stream(&self) -> TransportResult<EingehenderStream> {
        let mut geschlossen = self.geschlossen.subscribe();
        if *geschlossen.borrow_and_update() {
            return Err(TransportError::SessionBeendet("Session geschlossen".into()));
        }

        let mut eingang = self.eingang.lock().await;
        tokio::select! {
            stream = eingang.recv() => match stream {
                Some(stream) => Ok(Box::new(stream) as EingehenderStream),
                None => Err(TransportError::SessionBeendet("Gegenseite getrennt".into())),
            },
            _ = async {
                let _ = geschlossen.wait_for(|g| *g).await;
            } => Err(TransportError::SessionBeendet("Session geschlossen".into())),
        }
    }

    async fn open_stream(&self) -> TransportResult<AusgehenderStream> {
        if self.ist_geschlossen() {
            return Err(TransportError::SessionBeendet("Session geschlossen".into()));
        }

        let (lokal, entfernt) = tokio::io::duplex(STREAM_PUFFER);
        self.ausgang
            .send(entfernt)
            .map_err(|_| TransportError::SessionBeendet("Gegenseite getrennt".into()))?;
        Ok(Box::new(lokal))
    }

    fn remote_identity(&self) -> String {
        self.gegenseite.clone()
    }

    fn close(&self, grund: &str) {
        tracing::trace!(peer = %self.gegenseite, grund, "Memory-Session geschlossen");
        self.geschlossen.send_replace(true);
    }
}

// ---------------------------------------------------------------------------
// Listener / Connector
// ---------------------------------------------------------------------------

/// Nimmt Sessions an, die ueber den zugehoerigen `MemoryConnector` aufgebaut werden
pub struct MemoryListener {
    eingang: Mutex<mpsc::UnboundedReceiver<MemorySession>>,
    geschlossen: watch::Sender<bool>,
}

/// Baut Sessions zu einem `MemoryListener` auf
#[derive(Clone)]
pub struct MemoryConnector {
    ausgang: mpsc::UnboundedSender<MemorySession>,
    naechste: Arc<AtomicU64>,
}

/// Erstellt einen Listener und den passenden Connector
pub fn memory_listener() -> (MemoryListener, MemoryConnector) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (geschlossen, _) = watch::channel(false);
    (
        MemoryListener {
            eingang: Mutex::new(rx),
            geschlossen,
        },
        MemoryConnector {
            ausgang: tx,
            naechste: Arc::new(AtomicU64::new(1)),
        },
    )
}

impl MemoryConnector {
    /// Baut eine neue Session auf und gibt die Client-Seite zurueck
    ///
    /// Die Server-Seite meldet `memory:<n>` als Identitaet.
    pub fn verbinden(&self) -> TransportResult<MemorySession> {
        let n = self.naechste.fetch_add(1, Ordering::Relaxed);
        let (client, server) = session_paar(format!("memory:{n}"), "memory:server");
        self.ausgang
            .send(server)
            .map_err(|_| TransportError::Verbindungsaufbau("Listener existiert nicht mehr".into()))?;
        Ok(client)
    }
}

#[async_trait]
impl SessionListener for MemoryListener {
    type Session = MemorySession;

    async fn accept(&self) -> TransportResult<MemorySession> {
        let mut geschlossen = self.geschlossen.subscribe();
        if *geschlossen.borrow_and_update() {
            return Err(TransportError::ListenerGeschlossen);
        }

        let mut eingang = self.eingang.lock().await;
        tokio::select! {
            session = eingang.recv() => session.ok_or(TransportError::ListenerGeschlossen),
            _ = async {
                let _ = geschlossen.wait_for(|g| *g).await;
            } => Err(TransportError::ListenerGeschlossen),
        }
    }

    fn close(&self) {
        self.geschlossen.send_replace(true);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
