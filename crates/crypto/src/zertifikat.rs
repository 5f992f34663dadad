//! Zertifikats-Material fuer den Server
//!
//! Ohne konfigurierte PEM-Dateien erzeugt der Server beim Start ein
//! selbstsigniertes Zertifikat via rcgen. Der SHA-256 Fingerprint wird
//! geloggt, damit Clients ihn pinnen koennen.

use std::path::Path;

use rcgen::{CertificateParams, DistinguishedName, KeyPair as RcgenKeyPair};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls_pemfile::{certs, private_key};

use crate::error::{CryptoError, CryptoResult};

/// Zertifikat und Schluessel des Servers
#[derive(Clone)]
pub struct ServerTlsConfig {
    /// PEM-kodierte Zertifikatskette (Leaf zuerst)
    pub certificate_pem: String,
    /// PEM-kodierter privater Schluessel
    pub private_key_pem: String,
    /// SHA-256 Fingerprint des Leaf-Zertifikats
    pub certificate_fingerprint: String,
}

impl std::fmt::Debug for ServerTlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerTlsConfig")
            .field("fingerprint", &self.certificate_fingerprint)
            .finish_non_exhaustive()
    }
}

/// Generiert ein selbstsigniertes Zertifikat fuer die angegebenen Namen
///
/// Der erste Name wird zusaetzlich als Common Name eingetragen.
pub fn generate_self_signed_cert(namen: &[&str]) -> CryptoResult<ServerTlsConfig> {
    let san: Vec<String> = namen.iter().map(|n| n.to_string()).collect();
    let mut params = CertificateParams::new(san)
        .map_err(|e| CryptoError::ZertifikatGenerierung(e.to_string()))?;

    if let Some(common_name) = namen.first() {
        let mut distinguished_name = DistinguishedName::new();
        distinguished_name.push(rcgen::DnType::CommonName, *common_name);
        params.distinguished_name = distinguished_name;
    }

    let key_pair =
        RcgenKeyPair::generate().map_err(|e| CryptoError::ZertifikatGenerierung(e.to_string()))?;

    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| CryptoError::ZertifikatGenerierung(e.to_string()))?;

    Ok(ServerTlsConfig {
        certificate_pem: cert.pem(),
        private_key_pem: key_pair.serialize_pem(),
        certificate_fingerprint: compute_certificate_fingerprint(cert.der()),
    })
}

/// Laedt Zertifikat und Schluessel aus PEM-Dateien
pub fn load_pem_files(zertifikat: &Path, schluessel: &Path) -> CryptoResult<ServerTlsConfig> {
    let certificate_pem = std::fs::read_to_string(zertifikat)?;
    let private_key_pem = std::fs::read_to_string(schluessel)?;

    let kette = parse_certificates(&certificate_pem)?;
    let leaf = kette
        .first()
        .ok_or_else(|| CryptoError::Tls(format!("Kein Zertifikat in {}", zertifikat.display())))?;
    let certificate_fingerprint = compute_certificate_fingerprint(leaf);

    // Schluessel frueh pruefen, damit der Fehler beim Laden auftritt
    parse_private_key(&private_key_pem)?;

    Ok(ServerTlsConfig {
        certificate_pem,
        private_key_pem,
        certificate_fingerprint,
    })
}

/// Berechnet den SHA-256 Fingerprint eines DER-kodierten Zertifikats
///
/// Format: `AA:BB:...` (32 Bytes, Grossbuchstaben)
pub fn compute_certificate_fingerprint(der_bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let hash = Sha256::digest(der_bytes);
    hash.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Bringt einen vom Benutzer eingegebenen Fingerprint in Normalform
///
/// Akzeptiert Gross-/Kleinschreibung und Doppelpunkte oder Leerzeichen als
/// Trenner.
pub fn fingerprint_normalisieren(eingabe: &str) -> CryptoResult<String> {
    let hex: String = eingabe
        .chars()
        .filter(|c| !matches!(c, ':' | ' ' | '-'))
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CryptoError::UngueltigerFingerprint(eingabe.to_string()));
    }

    let paare: Vec<&str> = (0..32).map(|i| &hex[i * 2..i * 2 + 2]).collect();
    Ok(paare.join(":"))
}

pub(crate) fn parse_certificates(pem: &str) -> CryptoResult<Vec<CertificateDer<'static>>> {
    let mut cursor = std::io::Cursor::new(pem.as_bytes());
    certs(&mut cursor)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CryptoError::Tls(format!("Zertifikat-Parsing fehlgeschlagen: {}", e)))
}

pub(crate) fn parse_private_key(pem: &str) -> CryptoResult<PrivateKeyDer<'static>> {
    let mut cursor = std::io::Cursor::new(pem.as_bytes());
    private_key(&mut cursor)
        .map_err(|e| CryptoError::Tls(format!("Schluessel-Parsing fehlgeschlagen: {}", e)))?
        .ok_or_else(|| CryptoError::Tls("Kein privater Schluessel gefunden".to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
