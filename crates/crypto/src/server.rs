//! rustls-Konfiguration fuer den Server-Endpunkt
//!
//! Baut aus dem Zertifikats-Material eine TLS-1.3-Konfiguration mit der
//! quicchat-ALPN-Kennung. Clients mit anderer ALPN werden bereits im
//! Handshake abgelehnt.

use rustls::ServerConfig;
use quicchat_protocol::PROTOKOLL_ALPN;

use crate::crypto_provider;
use crate::error::{CryptoError, CryptoResult};
use crate::zertifikat::{parse_certificates, parse_private_key, ServerTlsConfig};

/// Erstellt die rustls-ServerConfig fuer den QUIC-Listener
pub fn server_config_erstellen(config: &ServerTlsConfig) -> CryptoResult<ServerConfig> {
    let cert_chain = parse_certificates(&config.certificate_pem)?;
    if cert_chain.is_empty() {
        return Err(CryptoError::Tls("Leere Zertifikatskette".to_string()));
    }
    let private_key = parse_private_key(&config.private_key_pem)?;

    let mut tls_config = ServerConfig::builder_with_provider(crypto_provider())
        .with_protocol_versions(&[&rustls::version::TLS13])
        .map_err(|e| CryptoError::Tls(e.to_string()))?
        .with_no_client_auth()
        .with_single_cert(cert_chain, private_key)
        .map_err(|e| CryptoError::Tls(e.to_string()))?;

    tls_config.alpn_protocols = vec![PROTOKOLL_ALPN.to_vec()];

    tracing::debug!(
        fingerprint = %config.certificate_fingerprint,
        "TLS-Serverkonfiguration erstellt"
    );

    Ok(tls_config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
