//! quicchat-core – Gemeinsame Typen
//!
//! Dieses Crate stellt die Bausteine bereit, die von Transport, Hub und
//! Server gemeinsam genutzt werden.

pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use types::{PeerId, PeerIdGenerator};
