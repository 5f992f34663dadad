//! Prometheus-kompatible Metriken fuer quicchat
//!
//! Registrierte Metriken:
//! - `quicchat_connected_peers` – Gauge: Aktuell registrierte Peers
//! - `quicchat_messages_received_total` – Counter: Dekodierte eingehende Nachrichten
//! - `quicchat_deliveries_total` – Counter: Erfolgreiche Zustellungen an einzelne Peers
//! - `quicchat_delivery_failures_total` – Counter: Fehlgeschlagene Zustellungen
//! - `quicchat_decode_failures_total` – Counter: Verworfene, nicht dekodierbare Streams
//! - `quicchat_rejected_sessions_total` – Counter: Wegen Kapazitaet abgelehnte Sessions

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Alle quicchat-Prometheus-Metriken
///
/// Jede Instanz hat ihre eigene Registry; mehrere Server im selben Prozess
/// (z.B. in Tests) stoeren sich nicht.
#[derive(Clone)]
pub struct ChatMetrics {
    pub registry: Arc<Registry>,

    pub connected_peers: IntGauge,
    pub messages_received_total: IntCounter,
    pub deliveries_total: IntCounter,
    pub delivery_failures_total: IntCounter,
    pub decode_failures_total: IntCounter,
    pub rejected_sessions_total: IntCounter,
}

impl ChatMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let connected_peers = IntGauge::with_opts(Opts::new(
            "quicchat_connected_peers",
            "Anzahl aktuell registrierter Peers",
        ))?;
        registry.register(Box::new(connected_peers.clone()))?;

        let messages_received_total = zaehler(
            &registry,
            "quicchat_messages_received_total",
            "Gesamtanzahl dekodierter eingehender Nachrichten",
        )?;
        let deliveries_total = zaehler(
            &registry,
            "quicchat_deliveries_total",
            "Gesamtanzahl erfolgreicher Zustellungen an einzelne Peers",
        )?;
        let delivery_failures_total = zaehler(
            &registry,
            "quicchat_delivery_failures_total",
            "Gesamtanzahl fehlgeschlagener Zustellungen",
        )?;
        let decode_failures_total = zaehler(
            &registry,
            "quicchat_decode_failures_total",
            "Gesamtanzahl verworfener, nicht dekodierbarer Streams",
        )?;
        let rejected_sessions_total = zaehler(
            &registry,
            "quicchat_rejected_sessions_total",
            "Gesamtanzahl wegen Kapazitaet abgelehnter Sessions",
        )?;

        Ok(Self {
            registry: Arc::new(registry),
            connected_peers,
            messages_received_total,
            deliveries_total,
            delivery_failures_total,
            decode_failures_total,
            rejected_sessions_total,
        })
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

fn zaehler(registry: &Registry, name: &str, hilfe: &str) -> Result<IntCounter> {
    let counter = IntCounter::with_opts(Opts::new(name, hilfe))?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: Arc<ChatMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<Arc<ChatMetrics>>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[test]
    fn metriken_erstellen_erfolgreich() {
        let metriken = ChatMetrics::neu().unwrap();
        assert!(!metriken.registry.gather().is_empty());
    }

    #[test]
    fn mehrere_instanzen_sind_unabhaengig() {
        let a = ChatMetrics::neu().unwrap();
        let b = ChatMetrics::neu().unwrap();
        a.deliveries_total.inc_by(3);
        assert_eq!(a.deliveries_total.get(), 3);
        assert_eq!(b.deliveries_total.get(), 0);
    }

    #[test]
    fn gauge_connected_peers() {
        let metriken = ChatMetrics::neu().unwrap();
        metriken.connected_peers.inc();
        metriken.connected_peers.inc();
        metriken.connected_peers.dec();
        assert_eq!(metriken.connected_peers.get(), 1);
    }

    #[test]
    fn alle_metriken_in_registry_registriert() {
        let metriken = ChatMetrics::neu().unwrap();
        let families = metriken.registry.gather();
        let namen: Vec<&str> = families.iter().map(|f| f.get_name()).collect();

        for erwartet in [
            "quicchat_connected_peers",
            "quicchat_messages_received_total",
            "quicchat_deliveries_total",
            "quicchat_delivery_failures_total",
            "quicchat_decode_failures_total",
            "quicchat_rejected_sessions_total",
        ] {
            assert!(namen.contains(&erwartet), "{erwartet} fehlt");
        }
    }

    #[tokio::test]
    async fn metrics_endpunkt_liefert_textformat() {
        let metriken = Arc::new(ChatMetrics::neu().unwrap());
        metriken.messages_received_total.inc();

        let antwort = metrics_router(Arc::clone(&metriken))
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::OK);

        let body = axum::body::to_bytes(antwort.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("# TYPE quicchat_messages_received_total counter"));
        assert!(text.contains("quicchat_messages_received_total 1"));
    }
}
