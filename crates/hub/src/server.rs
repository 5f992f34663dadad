//! Acceptor – Nimmt Sessions an, registriert sie und startet Reader und Writer
//!
//! ## Zustaende
//! ```text
//! Bereit -> Lauscht -> Geschlossen
//! ```
//!
//! `Geschlossen` wird bei Shutdown-Signal oder geschlossenem Listener
//! erreicht. Danach werden alle registrierten Sessions geschlossen; ihre
//! Reader entfernen sie auf dem normalen Weg aus der Registry.

use std::sync::Arc;

use quicchat_core::PeerIdGenerator;
use quicchat_observability::ChatMetrics;
use quicchat_transport::{Session, SessionListener};
use tokio::sync::{mpsc, watch};

use crate::config::HubConfig;
use crate::dispatcher::{BroadcastDispatcher, Eingang};
use crate::error::{HubError, HubResult};
use crate::reader::SessionReader;
use crate::registry::ConnectionRegistry;
use crate::writer::PeerWriter;

/// Lebenszyklus des Acceptors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptorZustand {
    /// Erstellt, `starten` noch nicht aufgerufen
    Bereit,
    /// Nimmt Sessions an
    Lauscht,
    /// Endzustand
    Geschlossen,
}

/// Broadcast-Chat-Server ueber einem beliebigen `SessionListener`
pub struct ChatServer<L: SessionListener> {
    listener: L,
    registry: ConnectionRegistry,
    config: HubConfig,
    metriken: Arc<ChatMetrics>,
    peer_ids: PeerIdGenerator,
    zustand: watch::Sender<AcceptorZustand>,
}

impl<L: SessionListener> ChatServer<L> {
    pub fn neu(listener: L, config: HubConfig, metriken: Arc<ChatMetrics>) -> Self {
        let (zustand, _) = watch::channel(AcceptorZustand::Bereit);
        Self {
            listener,
            registry: ConnectionRegistry::neu(),
            config,
            metriken,
            peer_ids: PeerIdGenerator::neu(),
            zustand,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn metriken(&self) -> &Arc<ChatMetrics> {
        &self.metriken
    }

    pub fn zustand(&self) -> AcceptorZustand {
        *self.zustand.borrow()
    }

    /// Empfaenger fuer Zustandswechsel (z.B. fuer den Health-Check)
    pub fn zustand_beobachten(&self) -> watch::Receiver<AcceptorZustand> {
        self.zustand.subscribe()
    }

    /// Startet Dispatcher und Accept-Loop
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt oder der Listener
    /// geschlossen wird. Kehrt erst zurueck, wenn der Dispatcher beendet ist.
    pub async fn starten(&self, mut shutdown_rx: watch::Receiver<bool>) -> HubResult<()> {
        let mut gestartet = false;
        self.zustand.send_if_modified(|z| {
            gestartet = *z == AcceptorZustand::Bereit;
            if gestartet {
                *z = AcceptorZustand::Lauscht;
            }
            gestartet
        });
        if !gestartet {
            return Err(HubError::BereitsGestartet);
        }

        let (eingang_tx, eingang_rx) = mpsc::channel(self.config.eingangs_queue_groesse);
        let dispatcher = BroadcastDispatcher::neu(
            self.registry.clone(),
            &self.config,
            Arc::clone(&self.metriken),
        );
        let dispatcher_task = tokio::spawn(dispatcher.starten(eingang_rx, shutdown_rx.clone()));

        tracing::info!(max_clients = self.config.max_clients, "Chat-Server lauscht");

        loop {
            tokio::select! {
                ergebnis = self.listener.accept() => match ergebnis {
                    Ok(session) => self.session_annehmen(session, &eingang_tx),
                    Err(e) if e.ist_listener_geschlossen() => {
                        tracing::warn!("Listener geschlossen");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(fehler = %e, "Session-Annahme fehlgeschlagen");
                    }
                },

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Chat-Server: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        self.zustand.send_replace(AcceptorZustand::Geschlossen);
        self.listener.close();
        drop(eingang_tx);

        let offen = self.registry.snapshot();
        tracing::info!(peers = offen.len(), "Schliesse verbleibende Sessions");
        for peer in offen {
            peer.session.close("server shutdown");
        }

        if let Err(e) = dispatcher_task.await {
            tracing::error!(fehler = %e, "Dispatcher-Task abgebrochen");
        }

        tracing::info!("Chat-Server gestoppt");
        Ok(())
    }

    fn session_annehmen(&self, session: L::Session, eingang_tx: &mpsc::Sender<Eingang>) {
        let session: Arc<dyn Session> = Arc::new(session);
        let (peer, writer) = PeerWriter::anlegen(
            self.peer_ids.naechste(),
            Arc::clone(&session),
            &self.config,
            Arc::clone(&self.metriken),
        );

        if let Err(e) = self
            .registry
            .hinzufuegen_begrenzt(peer.clone(), self.config.max_clients)
        {
            self.metriken.rejected_sessions_total.inc();
            tracing::warn!(
                identitaet = %peer.identitaet,
                max = self.config.max_clients,
                fehler = %e,
                "Session abgelehnt"
            );
            session.close("server voll");
            return;
        }

        self.metriken.connected_peers.inc();
        tracing::info!(
            peer = %peer.peer_id,
            identitaet = %peer.identitaet,
            verbunden = self.registry.anzahl(),
            "Peer hinzugefuegt"
        );

        tokio::spawn(writer.verarbeiten());

        let reader = SessionReader::neu(
            peer,
            self.registry.clone(),
            eingang_tx.clone(),
            &self.config,
            Arc::clone(&self.metriken),
        );
        tokio::spawn(reader.verarbeiten());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
