//! Client-seitiger Kern
//!
//! `ChatClient` sendet eigene Nachrichten (ein Stream pro Nachricht) und
//! liefert eingehende Nachrichten ueber einen Kanal an die UI. Bricht die
//! Session weg, schliesst sich der Nachrichten-Kanal und `beendet` meldet
//! den Grund.

use std::sync::Arc;
use std::time::Duration;

use quicchat_protocol::wire::{bytes_schreiben, encode_begrenzt};
use quicchat_protocol::{Message, DEFAULT_MAX_NACHRICHT_GROESSE};
use quicchat_transport::{Session, TransportError};
use tokio::sync::{mpsc, oneshot};

use crate::config::DEFAULT_LESE_TIMEOUT;
use crate::error::HubResult;
use crate::reader::nachricht_lesen_begrenzt;

/// Kapazitaet des Kanals zur UI
const EMPFANGS_QUEUE: usize = 64;

/// Empfangsseite eines `ChatClient`
pub struct Empfang {
    /// Eingehende Nachrichten in Empfangsreihenfolge
    pub nachrichten: mpsc::Receiver<Message>,
    /// Feuert einmal, wenn die Session nicht mehr benutzbar ist
    pub beendet: oneshot::Receiver<TransportError>,
}

/// Chat-Client ueber einer bereits aufgebauten Session
#[derive(Clone)]
pub struct ChatClient {
    session: Arc<dyn Session>,
    nickname: String,
    max_nachricht_groesse: usize,
    lese_timeout: Duration,
}

impl ChatClient {
    pub fn neu(session: Arc<dyn Session>, nickname: impl Into<String>) -> Self {
        Self {
            session,
            nickname: nickname.into(),
            max_nachricht_groesse: DEFAULT_MAX_NACHRICHT_GROESSE,
            lese_timeout: DEFAULT_LESE_TIMEOUT,
        }
    }

    pub fn mit_max_nachricht_groesse(mut self, max: usize) -> Self {
        self.max_nachricht_groesse = max;
        self
    }

    /// Zeitlimit, in dem ein eingehender Stream beendet sein muss
    pub fn mit_lese_timeout(mut self, timeout: Duration) -> Self {
        self.lese_timeout = timeout;
        self
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Sendet `text` unter dem eigenen Nickname
    pub async fn senden(&self, text: impl Into<String>) -> HubResult<()> {
        let nachricht = Message::neu(self.nickname.clone(), text);
        let bytes = encode_begrenzt(&nachricht, self.max_nachricht_groesse)?;
        let mut stream = self.session.open_stream().await?;
        bytes_schreiben(&mut stream, &bytes).await?;
        Ok(())
    }

    /// Startet die Empfangsschleife
    ///
    /// Streams werden nacheinander gelesen, damit die UI Nachrichten in der
    /// Reihenfolge sieht, in der der Server sie verteilt hat. Ein Stream, der
    /// nicht innerhalb von `lese_timeout` endet, wird verworfen.
    pub fn empfangen(&self) -> Empfang {
        let (nachrichten_tx, nachrichten_rx) = mpsc::channel(EMPFANGS_QUEUE);
        let (beendet_tx, beendet_rx) = oneshot::channel();
        let session = Arc::clone(&self.session);
        let max = self.max_nachricht_groesse;
        let lese_timeout = self.lese_timeout;

        tokio::spawn(async move {
            let fehler = loop {
                let mut stream = match session.accept_stream().await {
                    Ok(stream) => stream,
                    Err(e) => break e,
                };

                match nachricht_lesen_begrenzt(&mut stream, max, lese_timeout).await {
                    Ok(nachricht) => {
                        if nachrichten_tx.send(nachricht).await.is_err() {
                            tracing::debug!("Empfaenger verworfen, Empfangsschleife endet");
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(fehler = %e, "Eingehende Nachricht verworfen");
                    }
                }
            };

            tracing::info!(grund = %fehler, "Verbindung zum Server beendet");
            drop(nachrichten_tx);
            let _ = beendet_tx.send(fehler);
        });

        Empfang {
            nachrichten: nachrichten_rx,
            beendet: beendet_rx,
        }
    }

    /// Schliesst die Session
    pub fn trennen(&self) {
        self.session.close("client disconnect");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use quicchat_protocol::wire::{nachricht_lesen, nachricht_schreiben};
    use quicchat_transport::session_paar;
    use std::time::Duration;

    #[tokio::test]
    async fn senden_schreibt_eine_nachricht_pro_stream() {
        let (client_seite, server_seite) = session_paar("client", "server");
        let client = ChatClient::neu(Arc::new(client_seite), "Alice");

        client.senden("hi").await.unwrap();
        client.senden("noch was").await.unwrap();

        for erwartet in ["hi", "noch was"] {
            let mut stream = server_seite.accept_stream().await.unwrap();
            let nachricht = nachricht_lesen(&mut stream, DEFAULT_MAX_NACHRICHT_GROESSE)
                .await
                .unwrap();
            assert_eq!(nachricht, Message::neu("Alice", erwartet));
        }
    }

    #[tokio::test]
    async fn empfangen_liefert_nachrichten_in_reihenfolge() {
        let (client_seite, server_seite) = session_paar("client", "server");
        let client = ChatClient::neu(Arc::new(client_seite), "Alice");
        let mut empfang = client.empfangen();

        let mut kaputt = server_seite.open_stream().await.unwrap();
        bytes_schreiben(&mut kaputt, b"kein json").await.unwrap();
        for text in ["eins", "zwei"] {
            let mut stream = server_seite.open_stream().await.unwrap();
            nachricht_schreiben(&mut stream, &Message::neu("Bob", text), DEFAULT_MAX_NACHRICHT_GROESSE)
                .await
                .unwrap();
        }

        assert_eq!(empfang.nachrichten.recv().await.unwrap().text(), "eins");
        assert_eq!(empfang.nachrichten.recv().await.unwrap().text(), "zwei");
    }

    #[tokio::test]
    async fn haengender_stream_friert_empfang_nicht_ein() {
        let (client_seite, server_seite) = session_paar("client", "server");
        let client = ChatClient::neu(Arc::new(client_seite), "Alice")
            .mit_lese_timeout(Duration::from_millis(100));
        let mut empfang = client.empfangen();

        // Wird geoeffnet, aber nie beendet
        let _haengend = server_seite.open_stream().await.unwrap();
        let mut stream = server_seite.open_stream().await.unwrap();
        nachricht_schreiben(&mut stream, &Message::neu("Bob", "danach"), DEFAULT_MAX_NACHRICHT_GROESSE)
            .await
            .unwrap();

        let nachricht = tokio::time::timeout(Duration::from_secs(2), empfang.nachrichten.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(nachricht.text(), "danach");
    }

    #[tokio::test]
    async fn session_ende_schliesst_kanal_und_meldet_grund() {
        let (client_seite, server_seite) = session_paar("client", "server");
        let client = ChatClient::neu(Arc::new(client_seite), "Alice");
        let mut empfang = client.empfangen();

        server_seite.close("server weg");

        let grund = tokio::time::timeout(Duration::from_secs(1), empfang.beendet)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(grund, TransportError::SessionBeendet(_)));
        assert!(empfang.nachrichten.recv().await.is_none());
    }

    #[tokio::test]
    async fn senden_nach_trennen_schlaegt_fehl() {
        let (client_seite, _server_seite) = session_paar("client", "server");
        let client = ChatClient::neu(Arc::new(client_seite), "Alice");
        client.trennen();
        assert!(client.senden("zu spaet").await.is_err());
    }

    #[tokio::test]
    async fn zu_lange_nachricht_wird_lokal_abgelehnt() {
        let (client_seite, _server_seite) = session_paar("client", "server");
        let client = ChatClient::neu(Arc::new(client_seite), "Alice").mit_max_nachricht_groesse(32);
        let ergebnis = client.senden("x".repeat(100)).await;
        assert!(matches!(ergebnis, Err(crate::HubError::Wire(_))));
    }
}
