//! Szenarien ueber echte QUIC-Verbindungen auf UDP-Loopback

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use quicchat_crypto::{
    client_config_erstellen, generate_self_signed_cert, server_config_erstellen, ClientTlsConfig,
};
use quicchat_hub::{ChatClient, ChatServer, Empfang, HubConfig};
use quicchat_observability::ChatMetrics;
use quicchat_protocol::wire::bytes_schreiben;
use quicchat_protocol::Message;
use quicchat_transport::{quic, QuicListener, Session};
use tokio::sync::watch;

const KEEPALIVE: Duration = Duration::from_secs(10);
const LANG: Duration = Duration::from_secs(5);

struct Aufbau {
    server: Arc<ChatServer<QuicListener>>,
    adresse: SocketAddr,
    fingerprint: String,
    shutdown_tx: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

fn server_starten() -> Aufbau {
    let material = generate_self_signed_cert(&["localhost"]).unwrap();
    let tls = server_config_erstellen(&material).unwrap();
    let listener = QuicListener::binden("127.0.0.1:0".parse().unwrap(), tls, KEEPALIVE).unwrap();
    let adresse = listener.local_addr().unwrap();

    let server = Arc::new(ChatServer::neu(
        listener,
        HubConfig::default(),
        Arc::new(ChatMetrics::neu().unwrap()),
    ));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.starten(shutdown_rx).await.unwrap() })
    };

    Aufbau {
        server,
        adresse,
        fingerprint: material.certificate_fingerprint,
        shutdown_tx,
        task,
    }
}

async fn warten_bis_peers(server: &ChatServer<QuicListener>, anzahl: usize) {
    tokio::time::timeout(LANG, async {
        while server.registry().anzahl() != anzahl {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

async fn session(aufbau: &Aufbau) -> Arc<quicchat_transport::QuicSession> {
    let tls = client_config_erstellen(&ClientTlsConfig::with_fingerprint(
        aufbau.fingerprint.clone(),
    ))
    .unwrap();
    let session = quic::verbinden(aufbau.adresse, "localhost", tls, KEEPALIVE)
        .await
        .unwrap();
    Arc::new(session)
}

async fn client(aufbau: &Aufbau, nickname: &str) -> (ChatClient, Empfang) {
    let vorher = aufbau.server.registry().anzahl();
    let client = ChatClient::neu(session(aufbau).await, nickname);
    let empfang = client.empfangen();
    warten_bis_peers(&aufbau.server, vorher + 1).await;
    (client, empfang)
}

async fn naechste(empfang: &mut Empfang) -> Message {
    tokio::time::timeout(LANG, empfang.nachrichten.recv())
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn szenario_zwei_clients_ueber_quic() {
    let aufbau = server_starten();
    let (alice, mut alice_empfang) = client(&aufbau, "Alice").await;
    let (_bob, mut bob_empfang) = client(&aufbau, "Bob").await;

    alice.senden("hi").await.unwrap();
    assert_eq!(naechste(&mut bob_empfang).await, Message::neu("Alice", "hi"));
    assert!(
        tokio::time::timeout(Duration::from_millis(300), alice_empfang.nachrichten.recv())
            .await
            .is_err()
    );

    aufbau.shutdown_tx.send(true).unwrap();
    aufbau.task.await.unwrap();
}

#[tokio::test]
async fn szenario_trennen_ueber_quic() {
    let aufbau = server_starten();
    let (alice, _alice_empfang) = client(&aufbau, "Alice").await;
    let (_bob, mut bob_empfang) = client(&aufbau, "Bob").await;
    let (carol, _carol_empfang) = client(&aufbau, "Carol").await;

    carol.trennen();
    warten_bis_peers(&aufbau.server, 2).await;

    alice.senden("noch da?").await.unwrap();
    assert_eq!(naechste(&mut bob_empfang).await.text(), "noch da?");

    aufbau.shutdown_tx.send(true).unwrap();
    aufbau.task.await.unwrap();
}

#[tokio::test]
async fn szenario_kaputte_bytes_ueber_quic() {
    let aufbau = server_starten();
    let (_bob, mut bob_empfang) = client(&aufbau, "Bob").await;

    let roh = session(&aufbau).await;
    warten_bis_peers(&aufbau.server, 2).await;

    let mut stream = roh.open_stream().await.unwrap();
    bytes_schreiben(&mut stream, b"{ abgeschnitten").await.unwrap();

    let mallory = ChatClient::neu(roh, "Mallory");
    mallory.senden("gueltig").await.unwrap();

    assert_eq!(
        naechste(&mut bob_empfang).await,
        Message::neu("Mallory", "gueltig")
    );
    assert_eq!(aufbau.server.registry().anzahl(), 2);
    assert_eq!(aufbau.server.metriken().decode_failures_total.get(), 1);

    aufbau.shutdown_tx.send(true).unwrap();
    aufbau.task.await.unwrap();
}

#[tokio::test]
async fn server_shutdown_beendet_quic_client() {
    let aufbau = server_starten();
    let (_alice, alice_empfang) = client(&aufbau, "Alice").await;

    aufbau.shutdown_tx.send(true).unwrap();
    aufbau.task.await.unwrap();

    let grund = tokio::time::timeout(LANG, alice_empfang.beendet)
        .await
        .unwrap();
    assert!(grund.is_ok());
}
