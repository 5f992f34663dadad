//! # quicchat-crypto
//!
//! TLS-Material und rustls-Konfigurationen fuer den QUIC-Transport.
//!
//! ## Module
//! - `zertifikat` - Selbstsignierte Zertifikate, PEM-Dateien, Fingerprints
//! - `server` - rustls-ServerConfig mit ALPN
//! - `client` - rustls-ClientConfig (WebPKI, Fingerprint-Pinning, unsicher)
//! - `error` - Fehlertypen
//!
//! QUIC verlangt TLS 1.3; alle Konfigurationen verwenden explizit den
//! ring-Provider, es wird kein prozessweiter Default installiert.

pub mod client;
pub mod error;
pub mod server;
pub mod zertifikat;

// Bequeme Re-Exports
pub use client::{client_config_erstellen, ClientTlsConfig, ServerVerifikation};
pub use error::{CryptoError, CryptoResult};
pub use server::server_config_erstellen;
pub use zertifikat::{
    compute_certificate_fingerprint, generate_self_signed_cert, load_pem_files, ServerTlsConfig,
};

use std::sync::Arc;

/// Der fuer alle Konfigurationen verwendete Krypto-Provider
pub(crate) fn crypto_provider() -> Arc<rustls::crypto::CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}
