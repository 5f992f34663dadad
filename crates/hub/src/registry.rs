//! Connection-Registry – Alle aktuell lebenden Peers
//!
//! Ein Eintrag existiert genau so lange, wie seine Session als lebendig gilt.
//! Der Acceptor fuegt hinzu, nur der Session-Reader entfernt.
//!
//! Alle Operationen laufen unter einem `RwLock` und machen kein IO. Ein
//! Snapshot ist eine Kopie; der Dispatcher iteriert ohne Lock und toleriert
//! Peers, die nach dem Snapshot verschwinden (deren Zustellung schlaegt
//! fehl und wird geloggt).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use quicchat_core::PeerId;
use quicchat_transport::Session;
use tokio::sync::mpsc;

use crate::error::{HubError, HubResult};

/// Ein registrierter Peer
#[derive(Clone)]
pub struct PeerConnection {
    pub peer_id: PeerId,
    /// Lesbare Kennung fuer Logs (z.B. Remote-Adresse)
    pub identitaet: String,
    /// Von Reader und Writer gemeinsam genutzt
    pub session: Arc<dyn Session>,
    /// Ausgangs-Queue, gelesen vom `PeerWriter` dieses Peers
    ausgang: mpsc::Sender<Bytes>,
}

impl PeerConnection {
    pub fn neu(peer_id: PeerId, session: Arc<dyn Session>, ausgang: mpsc::Sender<Bytes>) -> Self {
        Self {
            peer_id,
            identitaet: session.remote_identity(),
            session,
            ausgang,
        }
    }

    /// Reiht eine kodierte Nachricht nicht-blockierend ein
    ///
    /// Schlaegt fehl, wenn die Queue voll ist oder der Writer nicht mehr laeuft.
    pub fn einreihen(&self, bytes: Bytes) -> HubResult<()> {
        self.ausgang.try_send(bytes).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => HubError::AusgangVoll,
            mpsc::error::TrySendError::Closed(_) => HubError::PeerGetrennt,
        })
    }
}

impl fmt::Debug for PeerConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerConnection")
            .field("peer_id", &self.peer_id)
            .field("identitaet", &self.identitaet)
            .finish_non_exhaustive()
    }
}

/// Thread-sichere Zuordnung PeerId -> PeerConnection
///
/// Clone teilt den inneren Zustand.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<PeerId, PeerConnection>>>,
}

impl ConnectionRegistry {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Fuegt einen Peer hinzu oder ersetzt den Eintrag mit derselben PeerId
    ///
    /// Gibt den ersetzten Eintrag zurueck.
    pub fn hinzufuegen(&self, verbindung: PeerConnection) -> Option<PeerConnection> {
        self.inner.write().insert(verbindung.peer_id, verbindung)
    }

    /// Fuegt einen Peer nur hinzu, wenn weniger als `max` Peers registriert sind
    ///
    /// Pruefung und Einfuegen passieren unter demselben Lock.
    pub fn hinzufuegen_begrenzt(&self, verbindung: PeerConnection, max: usize) -> HubResult<()> {
        let mut peers = self.inner.write();
        if peers.len() >= max && !peers.contains_key(&verbindung.peer_id) {
            return Err(HubError::ServerVoll);
        }
        peers.insert(verbindung.peer_id, verbindung);
        Ok(())
    }

    /// Entfernt einen Peer; unbekannte PeerIds sind kein Fehler
    pub fn entfernen(&self, peer_id: PeerId) -> Option<PeerConnection> {
        self.inner.write().remove(&peer_id)
    }

    /// Kopie aller aktuellen Eintraege, sortiert nach PeerId
    pub fn snapshot(&self) -> Vec<PeerConnection> {
        let mut peers: Vec<PeerConnection> = self.inner.read().values().cloned().collect();
        peers.sort_by_key(|p| p.peer_id);
        peers
    }

    pub fn anzahl(&self) -> usize {
        self.inner.read().len()
    }

    pub fn ist_leer(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn enthaelt(&self, peer_id: PeerId) -> bool {
        self.inner.read().contains_key(&peer_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
