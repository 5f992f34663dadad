//! quicchat Client – Einstiegspunkt
//!
//! Liest Zeilen von stdin und sendet sie als Chat-Nachricht. Eingehende
//! Nachrichten landen mit Zeitstempel auf stdout, Logs auf stderr.
//! `/quit` oder EOF beendet den Client.

mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use config::ClientConfig;
use quicchat_crypto::client_config_erstellen;
use quicchat_hub::{ChatClient, Empfang};
use quicchat_observability::{logging_initialisieren_nach, LogZiel};
use quicchat_protocol::Message;
use quicchat_transport::quic;
use tokio::io::{AsyncBufReadExt, BufReader};

const KEEPALIVE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    let config_pfad =
        std::env::var("QUICCHAT_CLIENT_CONFIG").unwrap_or_else(|_| "client.toml".into());
    let config = ClientConfig::laden(&config_pfad)?;

    logging_initialisieren_nach(&config.logging.level, &config.logging.format, LogZiel::Stderr);

    let adresse = tokio::net::lookup_host(&config.server_adresse)
        .await
        .with_context(|| format!("Adresse '{}' nicht aufloesbar", config.server_adresse))?
        .next()
        .with_context(|| format!("Keine Adresse fuer '{}'", config.server_adresse))?;

    let tls_config = config.tls_config();
    tracing::info!(
        server = %adresse,
        server_name = %config.server_name,
        verifikation = ?tls_config.verifikation,
        "Verbinde"
    );
    let tls = client_config_erstellen(&tls_config).context("TLS-Konfiguration ungueltig")?;
    let session = Arc::new(
        quic::verbinden(adresse, &config.server_name, tls, KEEPALIVE)
            .await
            .with_context(|| format!("Verbindung zu {adresse} fehlgeschlagen"))?,
    );

    let client = ChatClient::neu(session.clone(), config.nickname.clone());
    eprintln!("Verbunden mit {adresse} als {}", client.nickname());

    chat_schleife(&client, client.empfangen()).await;

    client.trennen();
    session.warten_bis_leerlauf().await;
    Ok(())
}

/// Verbindet stdin und stdout mit dem Chat, bis eine Seite endet
async fn chat_schleife(client: &ChatClient, empfang: Empfang) {
    let Empfang {
        mut nachrichten,
        beendet,
    } = empfang;
    let mut zeilen = BufReader::new(tokio::io::stdin()).lines();
    tokio::pin!(beendet);

    loop {
        tokio::select! {
            zeile = zeilen.next_line() => match zeile {
                Ok(Some(zeile)) => {
                    let text = zeile.trim();
                    if text == "/quit" {
                        break;
                    }
                    if text.is_empty() {
                        continue;
                    }
                    if let Err(e) = client.senden(text).await {
                        tracing::warn!(fehler = %e, "Nachricht nicht gesendet");
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(fehler = %e, "stdin nicht lesbar");
                    break;
                }
            },

            Some(nachricht) = nachrichten.recv() => anzeigen(&nachricht),

            grund = &mut beendet => {
                // Bereits gepufferte Nachrichten noch ausgeben
                while let Ok(nachricht) = nachrichten.try_recv() {
                    anzeigen(&nachricht);
                }
                match grund {
                    Ok(grund) => eprintln!("Verbindung beendet: {grund}"),
                    Err(_) => eprintln!("Verbindung beendet"),
                }
                break;
            }
        }
    }
}

fn anzeigen(nachricht: &Message) {
    println!("{}", zeile_formatieren(nachricht, chrono::Local::now()));
}

fn zeile_formatieren<Tz>(nachricht: &Message, zeit: chrono::DateTime<Tz>) -> String
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!(
        "[{}] <{}> {}",
        zeit.format("%H:%M:%S"),
        nachricht.nickname(),
        nachricht.text()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn zeile_mit_zeitstempel_und_nickname() {
        let zeit = chrono::Utc.with_ymd_and_hms(2024, 5, 1, 9, 3, 7).unwrap();
        let zeile = zeile_formatieren(&Message::neu("Alice", "hallo"), zeit);
        assert_eq!(zeile, "[09:03:07] <Alice> hallo");
    }
}
