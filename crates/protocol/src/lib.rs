//! quicchat-protocol – Nachrichtenformat
//!
//! Definiert die `Message`, die zwischen Client und Server ausgetauscht wird,
//! sowie den Codec, der genau eine Nachricht pro Stream kodiert.

pub mod message;
pub mod wire;

pub use message::Message;
pub use wire::{WireError, WireResult, DEFAULT_MAX_NACHRICHT_GROESSE, PROTOKOLL_ALPN};
