//! Session-Reader – Liest eingehende Streams einer einzelnen Session
//!
//! Jeder Stream traegt genau eine Nachricht. Streams werden parallel
//! gelesen, damit ein langsamer Stream die Annahme des naechsten nicht
//! blockiert. In die Eingangs-Queue gelangen sie trotzdem in Annahme-
//! Reihenfolge: jeder Task wartet vor dem Einreihen auf seinen Vorgaenger.
//! Ein kaputter Stream verwirft nur seine Nachricht, ebenso einer, der nicht
//! innerhalb von `lese_timeout` beendet wird.
//!
//! Scheitert `accept_stream`, ist die Session tot: der Reader entfernt den
//! Peer aus der Registry und beendet sich. Das ist der einzige Weg, auf dem
//! Peers die Registry verlassen.

use std::sync::Arc;
use std::time::Duration;

use quicchat_core::PeerId;
use quicchat_observability::ChatMetrics;
use quicchat_protocol::wire::nachricht_lesen;
use quicchat_protocol::Message;
use quicchat_transport::EingehenderStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;

use crate::config::HubConfig;
use crate::dispatcher::Eingang;
use crate::error::{HubError, HubResult};
use crate::registry::{ConnectionRegistry, PeerConnection};

/// Reader-Loop fuer einen registrierten Peer
pub struct SessionReader {
    peer: PeerConnection,
    registry: ConnectionRegistry,
    eingang_tx: mpsc::Sender<Eingang>,
    max_nachricht_groesse: usize,
    lese_timeout: Duration,
    metriken: Arc<ChatMetrics>,
}

impl SessionReader {
    pub fn neu(
        peer: PeerConnection,
        registry: ConnectionRegistry,
        eingang_tx: mpsc::Sender<Eingang>,
        config: &HubConfig,
        metriken: Arc<ChatMetrics>,
    ) -> Self {
        Self {
            peer,
            registry,
            eingang_tx,
            max_nachricht_groesse: config.max_nachricht_groesse,
            lese_timeout: config.lese_timeout,
            metriken,
        }
    }

    /// Laeuft bis die Session nicht mehr benutzbar ist
    pub async fn verarbeiten(self) {
        let peer_id = self.peer.peer_id;
        let mut streams = JoinSet::new();
        let mut vorgaenger: Option<oneshot::Receiver<()>> = None;

        let fehler = loop {
            tokio::select! {
                ergebnis = self.peer.session.accept_stream() => match ergebnis {
                    Ok(stream) => {
                        let (fertig_tx, fertig_rx) = oneshot::channel();
                        let reihenfolge = Reihenfolge {
                            vorgaenger: vorgaenger.replace(fertig_rx),
                            fertig: fertig_tx,
                        };
                        streams.spawn(stream_verarbeiten(
                            stream,
                            peer_id,
                            reihenfolge,
                            self.eingang_tx.clone(),
                            self.max_nachricht_groesse,
                            self.lese_timeout,
                            Arc::clone(&self.metriken),
                        ));
                    }
                    Err(e) => break e,
                },

                // Fertige Dekodier-Tasks einsammeln
                Some(_) = streams.join_next(), if !streams.is_empty() => {}
            }
        };

        if self.registry.entfernen(peer_id).is_some() {
            self.metriken.connected_peers.dec();
        }
        tracing::info!(
            peer = %peer_id,
            identitaet = %self.peer.identitaet,
            grund = %fehler,
            verbleibend = self.registry.anzahl(),
            "Peer entfernt"
        );

        // Bereits angenommene Streams duerfen noch fertig gelesen werden
        streams.detach_all();
    }
}

/// Verkettung der Stream-Tasks einer Session
struct Reihenfolge {
    /// Wird fertig, sobald der vorherige Stream eingereiht oder verworfen ist
    vorgaenger: Option<oneshot::Receiver<()>>,
    /// Gibt den naechsten Stream frei (auch beim Drop)
    fertig: oneshot::Sender<()>,
}

/// Liest genau eine Nachricht, der Stream muss innerhalb von `timeout` enden
pub(crate) async fn nachricht_lesen_begrenzt(
    stream: &mut EingehenderStream,
    max_nachricht_groesse: usize,
    timeout: Duration,
) -> HubResult<Message> {
    tokio::time::timeout(timeout, nachricht_lesen(stream, max_nachricht_groesse))
        .await
        .map_err(|_| HubError::Timeout(timeout))?
        .map_err(HubError::from)
}

/// Liest einen Stream, dekodiert genau eine Nachricht und reiht sie ein
async fn stream_verarbeiten(
    mut stream: EingehenderStream,
    absender: PeerId,
    reihenfolge: Reihenfolge,
    eingang_tx: mpsc::Sender<Eingang>,
    max_nachricht_groesse: usize,
    lese_timeout: Duration,
    metriken: Arc<ChatMetrics>,
) {
    let Reihenfolge { vorgaenger, fertig } = reihenfolge;
    let ergebnis = nachricht_lesen_begrenzt(&mut stream, max_nachricht_groesse, lese_timeout).await;

    if let Some(vorgaenger) = vorgaenger {
        let _ = vorgaenger.await;
    }

    let nachricht = match ergebnis {
        Ok(nachricht) => nachricht,
        Err(e) => {
            metriken.decode_failures_total.inc();
            tracing::warn!(peer = %absender, fehler = %e, "Nachricht verworfen");
            let _ = fertig.send(());
            return;
        }
    };

    metriken.messages_received_total.inc();
    tracing::debug!(peer = %absender, nickname = %nachricht.nickname(), "Nachricht empfangen");

    if eingang_tx.send(Eingang { absender, nachricht }).await.is_err() {
        tracing::debug!(peer = %absender, "Eingangs-Queue geschlossen, Nachricht verworfen");
    }
    let _ = fertig.send(());
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
