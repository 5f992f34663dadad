//! Identifikationstypen fuer quicchat
//!
//! Peers werden ueber eine fortlaufend vergebene ID identifiziert, nicht ueber
//! ihre Transport-Adresse. Zwei Sessions von derselben Adresse (NAT-Rebinding,
//! schneller Reconnect) bekommen dadurch nie denselben Registry-Schluessel.

use std::sync::atomic::{AtomicU64, Ordering};

/// Eindeutige ID einer Session, vom Acceptor vergeben
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub u64);

impl PeerId {
    /// Gibt den inneren Zaehlerwert zurueck
    pub fn inner(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "peer:{}", self.0)
    }
}

/// Vergibt PeerIds monoton steigend, beginnend bei 1
///
/// Thread-safe; mehrere Acceptor-Tasks duerfen denselben Generator teilen.
#[derive(Debug)]
pub struct PeerIdGenerator {
    naechste: AtomicU64,
}

impl PeerIdGenerator {
    /// Erstellt einen neuen Generator
    pub fn neu() -> Self {
        Self {
            naechste: AtomicU64::new(1),
        }
    }

    /// Liefert die naechste freie PeerId
    pub fn naechste(&self) -> PeerId {
        PeerId(self.naechste.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for PeerIdGenerator {
    fn default() -> Self {
        Self::neu()
    }
}
