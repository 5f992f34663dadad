//! Peer-Writer – Stellt die Ausgangs-Queue eines Peers zu
//!
//! Jeder registrierte Peer hat eine begrenzte Ausgangs-Queue und genau einen
//! Writer-Task. Der Dispatcher reiht nur ein (`try_send`), der Writer
//! oeffnet pro Nachricht einen Stream, schreibt und schliesst ihn. Die
//! Reihenfolge pro Peer ist damit die Reihenfolge der Queue, ohne dass ein
//! langsamer Peer den Dispatcher oder andere Peers aufhaelt.
//!
//! Der Writer endet, wenn alle Sender der Queue weg sind, also sobald der
//! Reader den Peer entfernt hat und kein Snapshot ihn mehr haelt.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use quicchat_core::PeerId;
use quicchat_observability::ChatMetrics;
use quicchat_protocol::wire::bytes_schreiben;
use quicchat_transport::Session;
use tokio::sync::mpsc;

use crate::config::HubConfig;
use crate::error::{HubError, HubResult};
use crate::registry::PeerConnection;

/// Schreibt die Ausgangs-Queue eines Peers in dessen Session
pub struct PeerWriter {
    peer_id: PeerId,
    identitaet: String,
    session: Arc<dyn Session>,
    ausgang_rx: mpsc::Receiver<Bytes>,
    sende_timeout: Duration,
    metriken: Arc<ChatMetrics>,
}

impl PeerWriter {
    /// Legt Peer und Writer gemeinsam an
    ///
    /// Der Writer muss gestartet werden (`verarbeiten`), sonst laeuft die
    /// Queue des Peers voll.
    pub fn anlegen(
        peer_id: PeerId,
        session: Arc<dyn Session>,
        config: &HubConfig,
        metriken: Arc<ChatMetrics>,
    ) -> (PeerConnection, PeerWriter) {
        let (ausgang_tx, ausgang_rx) = mpsc::channel(config.ausgangs_queue_groesse);
        let peer = PeerConnection::neu(peer_id, Arc::clone(&session), ausgang_tx);
        let writer = PeerWriter {
            peer_id,
            identitaet: peer.identitaet.clone(),
            session,
            ausgang_rx,
            sende_timeout: config.sende_timeout,
            metriken,
        };
        (peer, writer)
    }

    /// Laeuft bis die Ausgangs-Queue geschlossen ist
    pub async fn verarbeiten(mut self) {
        while let Some(bytes) = self.ausgang_rx.recv().await {
            match zustellen(self.session.as_ref(), &bytes, self.sende_timeout).await {
                Ok(()) => self.metriken.deliveries_total.inc(),
                Err(e) => {
                    self.metriken.delivery_failures_total.inc();
                    tracing::warn!(
                        peer = %self.peer_id,
                        identitaet = %self.identitaet,
                        fehler = %e,
                        "Zustellung fehlgeschlagen"
                    );
                }
            }
        }
        tracing::debug!(peer = %self.peer_id, "Peer-Writer beendet");
    }
}

/// Oeffnet einen Stream, schreibt die Nachricht und schliesst den Stream
async fn zustellen(session: &dyn Session, bytes: &[u8], timeout: Duration) -> HubResult<()> {
    let senden = async {
        let mut stream = session.open_stream().await?;
        bytes_schreiben(&mut stream, bytes).await?;
        Ok::<_, HubError>(())
    };

    tokio::time::timeout(timeout, senden)
        .await
        .map_err(|_| HubError::Timeout(timeout))?
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
