//! End-to-End-Szenarien ueber den In-Memory-Transport

use std::sync::Arc;
use std::time::Duration;

use quicchat_hub::{ChatClient, ChatServer, Empfang, HubConfig};
use quicchat_observability::ChatMetrics;
use quicchat_protocol::wire::bytes_schreiben;
use quicchat_protocol::Message;
use quicchat_transport::{memory_listener, MemoryConnector, MemoryListener, Session};
use tokio::sync::watch;
use tokio::task::JoinHandle;

const KURZ: Duration = Duration::from_millis(200);
const LANG: Duration = Duration::from_secs(2);

struct Hub {
    server: Arc<ChatServer<MemoryListener>>,
    connector: MemoryConnector,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Hub {
    fn starten(config: HubConfig) -> Self {
        // Logs nur bei fehlschlagenden Tests sichtbar
        let _ = tracing_subscriber::fmt()
            .with_env_filter("quicchat_hub=debug")
            .with_test_writer()
            .try_init();

        let (listener, connector) = memory_listener();
        let metriken = Arc::new(ChatMetrics::neu().unwrap());
        let server = Arc::new(ChatServer::neu(listener, config, metriken));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.starten(shutdown_rx).await.unwrap() })
        };
        Self {
            server,
            connector,
            shutdown_tx,
            task,
        }
    }

    async fn client(&self, nickname: &str) -> (ChatClient, Empfang) {
        let vorher = self.server.registry().anzahl();
        let session = self.connector.verbinden().unwrap();
        let client = ChatClient::neu(Arc::new(session), nickname);
        let empfang = client.empfangen();
        self.warten_bis_peers(vorher + 1).await;
        (client, empfang)
    }

    async fn warten_bis_peers(&self, anzahl: usize) {
        let registry = self.server.registry().clone();
        tokio::time::timeout(LANG, async move {
            while registry.anzahl() != anzahl {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    async fn stoppen(self) {
        self.shutdown_tx.send(true).unwrap();
        self.task.await.unwrap();
    }
}

async fn naechste(empfang: &mut Empfang) -> Message {
    tokio::time::timeout(LANG, empfang.nachrichten.recv())
        .await
        .unwrap()
        .unwrap()
}

async fn nichts_empfangen(empfang: &mut Empfang) {
    assert!(tokio::time::timeout(KURZ, empfang.nachrichten.recv())
        .await
        .is_err());
}

#[tokio::test]
async fn szenario_zwei_clients_kein_echo() {
    let hub = Hub::starten(HubConfig::default());
    let (alice, mut alice_empfang) = hub.client("Alice").await;
    let (_bob, mut bob_empfang) = hub.client("Bob").await;

    alice.senden("hi").await.unwrap();

    assert_eq!(naechste(&mut bob_empfang).await, Message::neu("Alice", "hi"));
    nichts_empfangen(&mut alice_empfang).await;

    hub.stoppen().await;
}

#[tokio::test]
async fn szenario_echo_an_absender() {
    let hub = Hub::starten(HubConfig {
        echo_an_absender: true,
        ..Default::default()
    });
    let (alice, mut alice_empfang) = hub.client("Alice").await;
    let (_bob, mut bob_empfang) = hub.client("Bob").await;

    alice.senden("hallo").await.unwrap();

    assert_eq!(naechste(&mut bob_empfang).await, Message::neu("Alice", "hallo"));
    assert_eq!(naechste(&mut alice_empfang).await, Message::neu("Alice", "hallo"));

    hub.stoppen().await;
}

#[tokio::test]
async fn szenario_client_trennt_sich() {
    let hub = Hub::starten(HubConfig::default());
    let (alice, _alice_empfang) = hub.client("Alice").await;
    let (_bob, mut bob_empfang) = hub.client("Bob").await;
    let (carol, _carol_empfang) = hub.client("Carol").await;

    carol.trennen();
    hub.warten_bis_peers(2).await;

    alice.senden("wer ist noch da?").await.unwrap();
    assert_eq!(naechste(&mut bob_empfang).await.text(), "wer ist noch da?");

    // Genau eine Zustellung (Bob); Carol steht in keinem Snapshot mehr
    let metriken = Arc::clone(hub.server.metriken());
    tokio::time::timeout(LANG, async {
        while metriken.deliveries_total.get() < 1 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(metriken.deliveries_total.get(), 1);
    assert_eq!(metriken.delivery_failures_total.get(), 0);

    hub.stoppen().await;
}

#[tokio::test]
async fn szenario_kaputte_nachricht_trennt_nicht() {
    let hub = Hub::starten(HubConfig::default());
    let (_bob, mut bob_empfang) = hub.client("Bob").await;

    // Roh-Session, damit kaputte Bytes gesendet werden koennen
    let roh = Arc::new(hub.connector.verbinden().unwrap());
    hub.warten_bis_peers(2).await;

    let mut stream = roh.open_stream().await.unwrap();
    bytes_schreiben(&mut stream, b"\x00\x01 kein json").await.unwrap();
    nichts_empfangen(&mut bob_empfang).await;
    assert_eq!(hub.server.registry().anzahl(), 2);
    assert_eq!(hub.server.metriken().decode_failures_total.get(), 1);

    let mallory = ChatClient::neu(roh, "Mallory");
    mallory.senden("jetzt richtig").await.unwrap();
    assert_eq!(
        naechste(&mut bob_empfang).await,
        Message::neu("Mallory", "jetzt richtig")
    );

    hub.stoppen().await;
}

#[tokio::test]
async fn viele_clients_bekommen_jede_nachricht_in_reihenfolge() {
    let hub = Hub::starten(HubConfig::default());
    let (sender, _sender_empfang) = hub.client("Sender").await;

    let mut empfaenger = Vec::new();
    for i in 0..10 {
        empfaenger.push(hub.client(&format!("client-{i}")).await);
    }

    for i in 0..20 {
        sender.senden(i.to_string()).await.unwrap();
    }

    for (_, empfang) in empfaenger.iter_mut() {
        for i in 0..20 {
            assert_eq!(naechste(empfang).await.text(), i.to_string());
        }
    }

    hub.stoppen().await;
}

#[tokio::test]
async fn shutdown_beendet_clients() {
    let hub = Hub::starten(HubConfig::default());
    let (_alice, alice_empfang) = hub.client("Alice").await;
    let registry = hub.server.registry().clone();

    hub.stoppen().await;

    let grund = tokio::time::timeout(LANG, alice_empfang.beendet)
        .await
        .unwrap();
    assert!(grund.is_ok());

    tokio::time::timeout(LANG, async {
        while !registry.ist_leer() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}
