//! quicchat-hub – Broadcast-Chat-Kern
//!
//! ## Datenfluss
//!
//! ```text
//! ChatServer (Acceptor) --registriert--> ConnectionRegistry
//!        |
//!        +--startet--> SessionReader (pro Session)
//!        |                   |
//!        |                   v
//!        |            Eingangs-Queue (mpsc)
//!        |                   |
//!        |                   v
//!        |          BroadcastDispatcher --try_send--> Ausgangs-Queue (pro Peer)
//!        |                                                  |
//!        +--startet--> PeerWriter (pro Session) <-----------+
//!                            |
//!                            v
//!                  ein Stream pro Nachricht --> Session
//! ```
//!
//! Der Hub kennt nur die Session-Traits aus `quicchat-transport`; QUIC und
//! In-Memory-Sessions sind austauschbar.

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod reader;
pub mod registry;
pub mod server;
pub mod writer;

pub use client::{ChatClient, Empfang};
pub use config::HubConfig;
pub use dispatcher::{BroadcastDispatcher, Eingang, VerteilBericht};
pub use error::{HubError, HubResult};
pub use reader::SessionReader;
pub use registry::{ConnectionRegistry, PeerConnection};
pub use server::{AcceptorZustand, ChatServer};
pub use writer::PeerWriter;
