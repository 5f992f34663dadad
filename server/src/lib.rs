//! quicchat-server – Bibliotheks-Root
//!
//! Verdrahtet Konfiguration, TLS-Material, QUIC-Listener, Chat-Hub und
//! Observability. `main.rs` ruft nur `Server::starten` auf; Tests benutzen
//! `Server::binden` + `GebundenerServer::laufen` mit eigenem Shutdown-Signal.

pub mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use config::ServerConfig;
use quicchat_crypto::{
    generate_self_signed_cert, load_pem_files, server_config_erstellen, ServerTlsConfig,
};
use quicchat_hub::{AcceptorZustand, ChatServer};
use quicchat_observability::{observability_server_starten, ChatMetrics, HealthState};
use quicchat_transport::QuicListener;
use tokio::sync::watch;

/// Haelt den Server-Zustand vor dem Binden zusammen
pub struct Server {
    pub config: ServerConfig,
}

/// Server mit gebundenem QUIC-Endpunkt, bereit zum Laufen
pub struct GebundenerServer {
    config: ServerConfig,
    chat: Arc<ChatServer<QuicListener>>,
    health: HealthState,
    adresse: SocketAddr,
    fingerprint: String,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Subsysteme und laeuft bis Ctrl-C
    pub async fn starten(self) -> Result<()> {
        let gebunden = self.binden()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Shutdown-Signal empfangen, Server wird beendet"),
                Err(e) => tracing::error!(fehler = %e, "Ctrl-C-Handler fehlgeschlagen"),
            }
            let _ = shutdown_tx.send(true);
        });

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        gebunden.laufen(shutdown_rx).await
    }

    /// Laedt TLS-Material und bindet den QUIC-Endpunkt
    ///
    /// Muss innerhalb einer Tokio-Runtime aufgerufen werden.
    pub fn binden(self) -> Result<GebundenerServer> {
        let bind_adresse = self.config.quic_bind_adresse()?;

        let material = tls_material_laden(&self.config)?;
        tracing::info!(
            fingerprint = %material.certificate_fingerprint,
            "TLS-Zertifikat bereit (Fingerprint fuer Client-Pinning)"
        );

        let tls = server_config_erstellen(&material).context("TLS-Konfiguration ungueltig")?;
        let listener = QuicListener::binden(bind_adresse, tls, self.config.keepalive())
            .with_context(|| format!("QUIC-Endpunkt auf {bind_adresse} nicht bindbar"))?;
        let adresse = listener.local_addr()?;

        let metriken = Arc::new(ChatMetrics::neu().context("Metriken-Initialisierung fehlgeschlagen")?);
        let health = HealthState::neu(Arc::clone(&metriken));
        let chat = Arc::new(ChatServer::neu(listener, self.config.hub_config(), metriken));

        tracing::info!(
            server_name = %self.config.server.name,
            adresse = %adresse,
            max_clients = self.config.server.max_clients,
            echo = self.config.server.echo_an_absender,
            "QUIC-Endpunkt gebunden"
        );

        Ok(GebundenerServer {
            config: self.config,
            chat,
            health,
            adresse,
            fingerprint: material.certificate_fingerprint,
        })
    }
}

impl GebundenerServer {
    /// Tatsaechlich gebundene QUIC-Adresse
    pub fn adresse(&self) -> SocketAddr {
        self.adresse
    }

    /// SHA-256 Fingerprint des Server-Zertifikats
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn chat(&self) -> &Arc<ChatServer<QuicListener>> {
        &self.chat
    }

    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt
    pub async fn laufen(self, shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        let (obs_stop_tx, obs_stop_rx) = watch::channel(false);

        let observability = if self.config.observability.aktiviert {
            let adresse = self.config.observability_bind_adresse()?;
            let health = self.health.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = observability_server_starten(adresse, health, obs_stop_rx).await {
                    tracing::error!(fehler = %e, "Observability-Server fehlgeschlagen");
                }
            }))
        } else {
            None
        };

        // Health-Check folgt dem Acceptor-Zustand
        let mut zustand_rx = self.chat.zustand_beobachten();
        let health = self.health.clone();
        tokio::spawn(async move {
            loop {
                let zustand = *zustand_rx.borrow_and_update();
                health.listener_status_setzen(zustand == AcceptorZustand::Lauscht);
                if zustand == AcceptorZustand::Geschlossen || zustand_rx.changed().await.is_err() {
                    break;
                }
            }
        });

        let ergebnis = self.chat.starten(shutdown_rx).await;
        self.health.listener_status_setzen(false);

        let _ = obs_stop_tx.send(true);
        if let Some(task) = observability {
            if let Err(e) = task.await {
                tracing::error!(fehler = %e, "Observability-Task abgebrochen");
            }
        }

        ergebnis.context("Chat-Server fehlgeschlagen")?;
        tracing::info!("Server beendet");
        Ok(())
    }
}

/// PEM-Dateien laden oder ein selbstsigniertes Zertifikat erzeugen
fn tls_material_laden(config: &ServerConfig) -> Result<ServerTlsConfig> {
    match config.tls_dateien() {
        Some((zertifikat, schluessel)) => load_pem_files(zertifikat, schluessel).with_context(|| {
            format!(
                "TLS-Dateien '{}' / '{}' nicht ladbar",
                zertifikat.display(),
                schluessel.display()
            )
        }),
        None => {
            tracing::info!("Kein Zertifikat konfiguriert, erzeuge selbstsigniertes Zertifikat");
            generate_self_signed_cert(&["localhost", "127.0.0.1"])
                .context("Selbstsigniertes Zertifikat konnte nicht erzeugt werden")
        }
    }
}
