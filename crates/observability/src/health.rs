//! Health-Check-Endpunkt fuer quicchat
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime, verbundenen Peers und ob der
//! QUIC-Listener Sessions annimmt

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::ChatMetrics;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub connected_peers: i64,
    pub listener_active: bool,
}

/// Geteilter Zustand fuer den Health-Check-Handler
#[derive(Clone)]
pub struct HealthState {
    pub start_time: Arc<Instant>,
    pub listener_aktiv: Arc<AtomicBool>,
    pub metriken: Arc<ChatMetrics>,
}

impl HealthState {
    pub fn neu(metriken: Arc<ChatMetrics>) -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            listener_aktiv: Arc::new(AtomicBool::new(false)),
            metriken,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn listener_laeuft(&self) -> bool {
        self.listener_aktiv.load(Ordering::Relaxed)
    }

    pub fn listener_status_setzen(&self, aktiv: bool) {
        self.listener_aktiv.store(aktiv, Ordering::Relaxed);
    }

    fn antwort(&self) -> HealthResponse {
        let listener_active = self.listener_laeuft();
        HealthResponse {
            status: if listener_active {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.uptime_seconds(),
            connected_peers: self.metriken.connected_peers.get(),
            listener_active,
        }
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – gibt den Serverstatus zurueck
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let response = state.antwort();
    let http_status = match response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (http_status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn state() -> HealthState {
        HealthState::neu(Arc::new(ChatMetrics::neu().unwrap()))
    }

    #[test]
    fn listener_standard_inaktiv() {
        let state = state();
        assert!(!state.listener_laeuft());
        assert_eq!(state.antwort().status, HealthStatus::Unhealthy);
    }

    #[test]
    fn antwort_spiegelt_peers_und_listener() {
        let state = state();
        state.listener_status_setzen(true);
        state.metriken.connected_peers.set(3);

        let antwort = state.antwort();
        assert_eq!(antwort.status, HealthStatus::Healthy);
        assert_eq!(antwort.connected_peers, 3);
        assert!(antwort.listener_active);
    }

    #[test]
    fn health_response_serialisierung() {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            version: "0.1.0".to_string(),
            uptime_seconds: 3600,
            connected_peers: 2,
            listener_active: true,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"uptime_seconds\":3600"));
        assert!(json.contains("\"connected_peers\":2"));
        assert!(json.contains("\"listener_active\":true"));
    }

    #[tokio::test]
    async fn endpunkt_liefert_503_ohne_listener() {
        let antwort = health_router(state())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn endpunkt_liefert_200_mit_listener() {
        let state = state();
        state.listener_status_setzen(true);
        let antwort = health_router(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::OK);

        let body = axum::body::to_bytes(antwort.into_body(), usize::MAX)
            .await
            .unwrap();
        let response: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert!(response.listener_active);
    }
}
