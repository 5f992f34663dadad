//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `QC_LOG_LEVEL`: Log-Level oder EnvFilter-Direktive, Standard: info
//! - `QC_LOG_FORMAT`: Format (text/json), Standard: text
//!
//! Der Server loggt nach stdout. Der Client loggt nach stderr, weil stdout
//! dort der Chat-Verlauf ist.

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, EnvFilter};

/// Wohin die Log-Ausgabe geschrieben wird
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogZiel {
    Stdout,
    Stderr,
}

/// Initialisiert das Logging-System nach stdout.
///
/// Liest `QC_LOG_LEVEL` und `QC_LOG_FORMAT` aus der Umgebung.
/// Faellt auf die uebergebenen Werte zurueck falls nicht gesetzt.
pub fn logging_initialisieren(level: &str, format: &str) {
    logging_initialisieren_nach(level, format, LogZiel::Stdout);
}

/// Wie `logging_initialisieren`, aber mit waehlbarem Ziel
pub fn logging_initialisieren_nach(level: &str, format: &str, ziel: LogZiel) {
    let filter = EnvFilter::try_from_env("QC_LOG_LEVEL")
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format_env = std::env::var("QC_LOG_FORMAT").unwrap_or_else(|_| format.to_string());
    let json = format_env == "json";

    match ziel {
        LogZiel::Stdout => subscriber_setzen(filter, json, std::io::stdout),
        LogZiel::Stderr => subscriber_setzen(filter, json, std::io::stderr),
    }
}

fn subscriber_setzen<W>(filter: EnvFilter, json: bool, writer: W)
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    // Ein zweiter Aufruf (z.B. mehrere Tests im selben Prozess) ist kein Fehler
    let ergebnis = if json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init()
    } else {
        fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_target(true)
            .try_init()
    };

    if ergebnis.is_err() {
        tracing::debug!("Logging war bereits initialisiert");
    }
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}
