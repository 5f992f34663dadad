//! Fehlertypen fuer das TLS-Subsystem

use thiserror::Error;

/// Fehler im TLS-Subsystem
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Zertifikat-Generierung fehlgeschlagen: {0}")]
    ZertifikatGenerierung(String),

    #[error("TLS-Fehler: {0}")]
    Tls(String),

    #[error("Ungueltiger Fingerprint: {0}")]
    UngueltigerFingerprint(String),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
