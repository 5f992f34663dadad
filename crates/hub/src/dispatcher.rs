//! Broadcast-Dispatcher – Verteilt eingehende Nachrichten an alle Peers
//!
//! Einziger Konsument der Eingangs-Queue. Pro Nachricht:
//! 1. einmal kodieren
//! 2. Registry-Snapshot ziehen (ohne Absender, ausser `echo_an_absender`)
//! 3. in die Ausgangs-Queue jedes Empfaengers einreihen (`try_send`)
//!
//! Der Dispatcher wartet nie auf einen Peer. Zugestellt wird von den
//! `PeerWriter`n; eine volle oder geschlossene Ausgangs-Queue zaehlt als
//! Fehler fuer genau diesen Peer. Der Dispatcher entfernt nie Peers aus der
//! Registry.

use std::sync::Arc;

use quicchat_core::PeerId;
use quicchat_observability::ChatMetrics;
use quicchat_protocol::wire::encode_begrenzt;
use quicchat_protocol::Message;
use tokio::sync::{mpsc, watch};

use crate::config::HubConfig;
use crate::error::HubError;
use crate::registry::ConnectionRegistry;

/// Eintrag der Eingangs-Queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eingang {
    pub absender: PeerId,
    pub nachricht: Message,
}

/// Ergebnis einer Verteilung
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerteilBericht {
    /// Anzahl Peers im (gefilterten) Snapshot
    pub versuche: usize,
    pub eingereiht: usize,
    pub fehlgeschlagen: usize,
}

/// Verteilt Nachrichten aus der Eingangs-Queue
pub struct BroadcastDispatcher {
    registry: ConnectionRegistry,
    metriken: Arc<ChatMetrics>,
    max_nachricht_groesse: usize,
    echo_an_absender: bool,
}

impl BroadcastDispatcher {
    pub fn neu(registry: ConnectionRegistry, config: &HubConfig, metriken: Arc<ChatMetrics>) -> Self {
        Self {
            registry,
            metriken,
            max_nachricht_groesse: config.max_nachricht_groesse,
            echo_an_absender: config.echo_an_absender,
        }
    }

    /// Konsumiert die Eingangs-Queue
    ///
    /// Endet wenn die Queue geschlossen ist oder `shutdown_rx` `true` meldet.
    pub async fn starten(
        self,
        mut eingang_rx: mpsc::Receiver<Eingang>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        tracing::debug!("Broadcast-Dispatcher gestartet");

        loop {
            tokio::select! {
                eingang = eingang_rx.recv() => match eingang {
                    Some(eingang) => {
                        self.verteilen(&eingang);
                    }
                    None => {
                        tracing::debug!("Eingangs-Queue geschlossen");
                        break;
                    }
                },

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::debug!("Broadcast-Dispatcher: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::debug!("Broadcast-Dispatcher gestoppt");
    }

    /// Reiht eine Nachricht bei allen aktuell registrierten Empfaengern ein
    pub fn verteilen(&self, eingang: &Eingang) -> VerteilBericht {
        let bytes = match encode_begrenzt(&eingang.nachricht, self.max_nachricht_groesse) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(peer = %eingang.absender, fehler = %e, "Nachricht nicht kodierbar");
                return VerteilBericht::default();
            }
        };

        let mut bericht = VerteilBericht::default();
        let empfaenger = self
            .registry
            .snapshot()
            .into_iter()
            .filter(|p| self.echo_an_absender || p.peer_id != eingang.absender);

        for peer in empfaenger {
            bericht.versuche += 1;
            match peer.einreihen(bytes.clone()) {
                Ok(()) => bericht.eingereiht += 1,
                Err(e) => {
                    bericht.fehlgeschlagen += 1;
                    self.metriken.delivery_failures_total.inc();
                    match e {
                        HubError::PeerGetrennt => {
                            tracing::debug!(peer = %peer.peer_id, "Peer getrennt, Nachricht verworfen");
                        }
                        e => {
                            tracing::warn!(
                                peer = %peer.peer_id,
                                identitaet = %peer.identitaet,
                                fehler = %e,
                                "Nachricht fuer Peer verworfen"
                            );
                        }
                    }
                }
            }
        }

        tracing::debug!(
            absender = %eingang.absender,
            versuche = bericht.versuche,
            eingereiht = bericht.eingereiht,
            fehlgeschlagen = bericht.fehlgeschlagen,
            "Nachricht verteilt"
        );
        bericht
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
