//! quicchat-transport – Sichere, gemultiplexte Sessions
//!
//! Der Chat-Kern kennt nur die Traits aus `session`: eine Session liefert
//! eingehende Streams, oeffnet ausgehende Streams und kann geschlossen
//! werden. Woher die Session kommt, ist Sache dieses Crates.
//!
//! ## Implementierungen
//!
//! ```text
//! quic    – quinn-Endpunkte, ein unidirektionaler Stream pro Nachricht
//! memory  – In-Process-Sessions auf tokio::io::duplex (Tests, Loopback)
//! ```

pub mod error;
pub mod memory;
pub mod quic;
pub mod session;

// Bequeme Re-Exporte
pub use error::{TransportError, TransportResult};
pub use memory::{memory_listener, session_paar, MemoryConnector, MemoryListener, MemorySession};
pub use quic::{QuicListener, QuicSession};
pub use session::{AusgehenderStream, EingehenderStream, Session, SessionListener};
