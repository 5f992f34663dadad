//! Wire-Format fuer Chat-Streams
//!
//! Jede Nachricht belegt genau einen Stream. Der Sender schreibt ein
//! JSON-Objekt und schliesst danach seine Schreibseite; das Stream-Ende
//! begrenzt den Datensatz. Es gibt kein Laengen-Feld.
//!
//! ## Stream-Format
//!
//! ```text
//! +------------------------------------------+-----+
//! | {"nickname":"Alice","text":"hi"}          | EOF |
//! +------------------------------------------+-----+
//! ```
//!
//! Beim Lesen werden hoechstens `max + 1` Bytes angenommen, damit ein
//! Peer den Server nicht mit endlosen Streams fuellen kann.

use bytes::Bytes;
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::message::Message;

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// ALPN-Kennung, die Client und Server beim Handshake aushandeln
pub const PROTOKOLL_ALPN: &[u8] = b"quic-chat";

/// Standard-maximale Groesse einer kodierten Nachricht (64 KB)
pub const DEFAULT_MAX_NACHRICHT_GROESSE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Fehler
// ---------------------------------------------------------------------------

/// Fehler beim Kodieren, Dekodieren oder Uebertragen einer Nachricht
#[derive(Debug, Error)]
pub enum WireError {
    #[error("JSON-Serialisierung fehlgeschlagen: {0}")]
    Serialisierung(#[source] serde_json::Error),

    #[error("Nachricht nicht dekodierbar: {0}")]
    Dekodierung(#[source] serde_json::Error),

    #[error("Nachricht zu gross: {groesse} Bytes (Maximum: {maximum} Bytes)")]
    ZuGross { groesse: usize, maximum: usize },

    #[error("IO-Fehler: {0}")]
    Io(#[from] io::Error),
}

/// Result-Typ fuer den Wire-Codec
pub type WireResult<T> = Result<T, WireError>;

// ---------------------------------------------------------------------------
// Kodieren / Dekodieren
// ---------------------------------------------------------------------------

/// Kodiert eine Nachricht in ihre Stream-Darstellung
pub fn encode(nachricht: &Message) -> WireResult<Bytes> {
    let json = serde_json::to_vec(nachricht).map_err(WireError::Serialisierung)?;
    Ok(Bytes::from(json))
}

/// Kodiert eine Nachricht und prueft die Groessenbegrenzung
pub fn encode_begrenzt(nachricht: &Message, max: usize) -> WireResult<Bytes> {
    let bytes = encode(nachricht)?;
    if bytes.len() > max {
        return Err(WireError::ZuGross {
            groesse: bytes.len(),
            maximum: max,
        });
    }
    Ok(bytes)
}

/// Dekodiert den vollstaendigen Inhalt eines Streams
///
/// Schlaegt fehl bei abgeschnittenem oder ungueltigem JSON, fehlenden
/// Feldern und bei Daten hinter dem ersten Objekt.
pub fn decode(bytes: &[u8]) -> WireResult<Message> {
    serde_json::from_slice(bytes).map_err(WireError::Dekodierung)
}

// ---------------------------------------------------------------------------
// Async Lesen/Schreiben
// ---------------------------------------------------------------------------

/// Liest einen Stream bis EOF und dekodiert genau eine Nachricht
///
/// # Fehler
/// - `ZuGross` wenn der Stream mehr als `max` Bytes liefert
/// - `Dekodierung` bei ungueltigem Inhalt (auch bei leerem Stream)
/// - `Io` wenn der Stream abbricht
pub async fn nachricht_lesen<R>(reader: &mut R, max: usize) -> WireResult<Message>
where
    R: AsyncRead + Unpin,
{
    let mut puffer = Vec::new();
    let mut begrenzt = reader.take(max as u64 + 1);
    begrenzt.read_to_end(&mut puffer).await?;

    if puffer.len() > max {
        return Err(WireError::ZuGross {
            groesse: puffer.len(),
            maximum: max,
        });
    }

    decode(&puffer)
}

/// Schreibt eine bereits kodierte Nachricht und schliesst die Schreibseite
pub async fn bytes_schreiben<W>(writer: &mut W, bytes: &[u8]) -> WireResult<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(bytes).await?;
    writer.shutdown().await?;
    Ok(())
}

/// Kodiert eine Nachricht, schreibt sie und schliesst den Stream
pub async fn nachricht_schreiben<W>(writer: &mut W, nachricht: &Message, max: usize) -> WireResult<()>
where
    W: AsyncWrite + Unpin,
{
    let bytes = encode_begrenzt(nachricht, max)?;
    bytes_schreiben(writer, &bytes).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_verschiedene_nachrichten() {
        let faelle = [
            Message::neu("Alice", "hi"),
            Message::neu("", ""),
            Message::neu("Bob", ""),
            Message::neu("", "nur Text"),
            Message::neu("Jürgen", "Grüße 👋 \"zitiert\" \\ \n neue Zeile\t{}"),
            Message::neu("x".repeat(300), "y".repeat(4000)),
        ];

        for original in faelle {
            let bytes = encode(&original).unwrap();
            let dekodiert = decode(&bytes).unwrap();
            assert_eq!(dekodiert, original);
        }
    }

    #[test]
    fn abgeschnittene_eingabe_schlaegt_fehl() {
        let bytes = encode(&Message::neu("Alice", "hallo")).unwrap();
        for laenge in 0..bytes.len() {
            let ergebnis = decode(&bytes[..laenge]);
            assert!(
                matches!(ergebnis, Err(WireError::Dekodierung(_))),
                "Praefix der Laenge {laenge} darf nicht dekodierbar sein"
            );
        }
    }

    #[test]
    fn ungueltige_eingaben_werden_abgelehnt() {
        let faelle: [&[u8]; 7] = [
            b"",
            b"\xff\xfe\x00\x01",
            b"keine json",
            br#"{"nickname":"Alice"}"#,
            br#"{"nickname":1,"text":"hi"}"#,
            br#"["Alice","hi"]"#,
            br#"{"nickname":"a","text":"b"}{"nickname":"c","text":"d"}"#,
        ];

        for eingabe in faelle {
            assert!(decode(eingabe).is_err(), "muss abgelehnt werden: {eingabe:?}");
        }
    }

    #[test]
    fn leerzeichen_nach_objekt_erlaubt() {
        let m = decode(b"{\"nickname\":\"A\",\"text\":\"B\"}\n").unwrap();
        assert_eq!(m, Message::neu("A", "B"));
    }

    #[test]
    fn encode_begrenzt_lehnt_zu_grosse_nachricht_ab() {
        let gross = Message::neu("Alice", "x".repeat(100));
        let ergebnis = encode_begrenzt(&gross, 50);
        assert!(matches!(ergebnis, Err(WireError::ZuGross { maximum: 50, .. })));
    }

    #[tokio::test]
    async fn stream_round_trip() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        let original = Message::neu("Alice", "über den Stream");

        let schreiber = {
            let original = original.clone();
            tokio::spawn(async move {
                nachricht_schreiben(&mut a, &original, DEFAULT_MAX_NACHRICHT_GROESSE)
                    .await
                    .unwrap();
            })
        };

        let gelesen = nachricht_lesen(&mut b, DEFAULT_MAX_NACHRICHT_GROESSE)
            .await
            .unwrap();
        schreiber.await.unwrap();
        assert_eq!(gelesen, original);
    }

    #[tokio::test]
    async fn stream_lesen_lehnt_uebergroesse_ab() {
        let daten = vec![b'x'; 200];
        let mut cursor = io::Cursor::new(daten);
        let ergebnis = nachricht_lesen(&mut cursor, 100).await;
        assert!(matches!(
            ergebnis,
            Err(WireError::ZuGross {
                groesse: 101,
                maximum: 100
            })
        ));
    }

    #[tokio::test]
    async fn leerer_stream_ist_dekodierfehler() {
        let mut cursor = io::Cursor::new(Vec::<u8>::new());
        let ergebnis = nachricht_lesen(&mut cursor, DEFAULT_MAX_NACHRICHT_GROESSE).await;
        assert!(matches!(ergebnis, Err(WireError::Dekodierung(_))));
    }

    #[tokio::test]
    async fn bytes_schreiben_schliesst_stream() {
        let (mut a, mut b) = tokio::io::duplex(64);
        bytes_schreiben(&mut a, b"abc").await.unwrap();

        let mut inhalt = Vec::new();
        b.read_to_end(&mut inhalt).await.unwrap();
        assert_eq!(inhalt, b"abc");
    }
}
