//! rustls-Konfiguration fuer den Client-Endpunkt
//!
//! Drei Pruefmodi fuer das Server-Zertifikat:
//! - `WebPki`: regulaere Pruefung gegen die webpki-Roots
//! - `Fingerprint`: Pinning auf den SHA-256 Fingerprint (selbstsignierte Server)
//! - `Unsicher`: jedes Zertifikat wird akzeptiert (nur Entwicklung)
//!
//! Auch bei `Fingerprint` und `Unsicher` werden die Handshake-Signaturen
//! geprueft; nur die Zertifikatskette entfaellt.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::WebPkiSupportedAlgorithms;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use quicchat_protocol::PROTOKOLL_ALPN;

use crate::crypto_provider;
use crate::error::{CryptoError, CryptoResult};
use crate::zertifikat::{compute_certificate_fingerprint, fingerprint_normalisieren};

/// Wie der Client das Server-Zertifikat prueft
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerVerifikation {
    /// Kette gegen webpki-Roots pruefen
    WebPki,
    /// Nur Zertifikate mit diesem SHA-256 Fingerprint akzeptieren
    Fingerprint(String),
    /// Jedes Zertifikat akzeptieren
    Unsicher,
}

/// TLS-Konfiguration des Clients
#[derive(Debug, Clone)]
pub struct ClientTlsConfig {
    pub verifikation: ServerVerifikation,
}

impl ClientTlsConfig {
    pub fn new() -> Self {
        Self {
            verifikation: ServerVerifikation::WebPki,
        }
    }

    pub fn with_fingerprint(fingerprint: impl Into<String>) -> Self {
        Self {
            verifikation: ServerVerifikation::Fingerprint(fingerprint.into()),
        }
    }

    /// Akzeptiert jedes Zertifikat (nur fuer Entwicklung und Tests!)
    pub fn new_insecure() -> Self {
        Self {
            verifikation: ServerVerifikation::Unsicher,
        }
    }
}

impl Default for ClientTlsConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Erstellt die rustls-ClientConfig fuer den QUIC-Connector
pub fn client_config_erstellen(config: &ClientTlsConfig) -> CryptoResult<ClientConfig> {
    let provider = crypto_provider();
    let algorithmen = provider.signature_verification_algorithms;

    let builder = ClientConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&rustls::version::TLS13])
        .map_err(|e| CryptoError::Tls(e.to_string()))?;

    let mut tls_config = match &config.verifikation {
        ServerVerifikation::WebPki => builder
            .with_root_certificates(webpki_roots_laden())
            .with_no_client_auth(),
        ServerVerifikation::Fingerprint(fingerprint) => {
            let verifier = PinningVerifier {
                erwartet: Some(fingerprint_normalisieren(fingerprint)?),
                algorithmen,
            };
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(verifier))
                .with_no_client_auth()
        }
        ServerVerifikation::Unsicher => {
            tracing::warn!("Server-Zertifikat wird nicht geprueft (unsicherer Modus)");
            let verifier = PinningVerifier {
                erwartet: None,
                algorithmen,
            };
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(verifier))
                .with_no_client_auth()
        }
    };

    tls_config.alpn_protocols = vec![PROTOKOLL_ALPN.to_vec()];
    Ok(tls_config)
}

fn webpki_roots_laden() -> rustls::RootCertStore {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    roots
}

/// Zertifikat-Verifier mit optionalem Fingerprint-Pinning
///
/// `erwartet == None` akzeptiert jedes Zertifikat.
#[derive(Debug)]
struct PinningVerifier {
    erwartet: Option<String>,
    algorithmen: WebPkiSupportedAlgorithms,
}

impl ServerCertVerifier for PinningVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let Some(erwartet) = &self.erwartet else {
            return Ok(ServerCertVerified::assertion());
        };

        let tatsaechlich = compute_certificate_fingerprint(end_entity);
        if &tatsaechlich == erwartet {
            Ok(ServerCertVerified::assertion())
        } else {
            tracing::warn!(
                erwartet = %erwartet,
                erhalten = %tatsaechlich,
                "Server-Fingerprint stimmt nicht ueberein"
            );
            Err(rustls::Error::InvalidCertificate(
                rustls::CertificateError::ApplicationVerificationFailure,
            ))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, &self.algorithmen)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, &self.algorithmen)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithmen.supported_schemes()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zertifikat::{generate_self_signed_cert, parse_certificates};

    fn leaf_von(pem: &str) -> CertificateDer<'static> {
        parse_certificates(pem).unwrap().remove(0)
    }

    fn pruefen(verifier: &PinningVerifier, cert: &CertificateDer<'_>) -> bool {
        let name = ServerName::try_from("localhost").unwrap();
        verifier
            .verify_server_cert(cert, &[], &name, &[], UnixTime::now())
            .is_ok()
    }

    #[test]
    fn pinning_akzeptiert_passenden_fingerprint() {
        let material = generate_self_signed_cert(&["localhost"]).unwrap();
        let verifier = PinningVerifier {
            erwartet: Some(material.certificate_fingerprint.clone()),
            algorithmen: crypto_provider().signature_verification_algorithms,
        };
        assert!(pruefen(&verifier, &leaf_von(&material.certificate_pem)));
    }

    #[test]
    fn pinning_lehnt_fremdes_zertifikat_ab() {
        let gepinnt = generate_self_signed_cert(&["localhost"]).unwrap();
        let fremd = generate_self_signed_cert(&["localhost"]).unwrap();
        let verifier = PinningVerifier {
            erwartet: Some(gepinnt.certificate_fingerprint),
            algorithmen: crypto_provider().signature_verification_algorithms,
        };
        assert!(!pruefen(&verifier, &leaf_von(&fremd.certificate_pem)));
    }

    #[test]
    fn unsicher_akzeptiert_alles() {
        let material = generate_self_signed_cert(&["irgendwas"]).unwrap();
        let verifier = PinningVerifier {
            erwartet: None,
            algorithmen: crypto_provider().signature_verification_algorithms,
        };
        assert!(pruefen(&verifier, &leaf_von(&material.certificate_pem)));
    }

    #[test]
    fn client_config_setzt_alpn_in_allen_modi() {
        let material = generate_self_signed_cert(&["localhost"]).unwrap();
        let modi = [
            ClientTlsConfig::new(),
            ClientTlsConfig::with_fingerprint(material.certificate_fingerprint),
            ClientTlsConfig::new_insecure(),
        ];
        for modus in modi {
            let config = client_config_erstellen(&modus).unwrap();
            assert_eq!(config.alpn_protocols, vec![PROTOKOLL_ALPN.to_vec()]);
        }
    }

    #[test]
    fn ungueltiger_fingerprint_wird_beim_erstellen_abgelehnt() {
        let ergebnis = client_config_erstellen(&ClientTlsConfig::with_fingerprint("AA:BB"));
        assert!(matches!(ergebnis, Err(CryptoError::UngueltigerFingerprint(_))));
    }

    #[test]
    fn standard_ist_webpki() {
        assert_eq!(ClientTlsConfig::default().verifikation, ServerVerifikation::WebPki);
    }
}
