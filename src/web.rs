use crate::config::PanelConfig;
use crate::device::DeviceLink;
use crate::panel::{Panel, PanelUpdate};
use crate::protocol::ClientMessage;
use crate::ui;
use anyhow::Result;
use axum::extract::ws::{Message, WebSocket};
use axum::{
    Json, Router,
    extract::{State, WebSocketUpgrade},
    response::{Html, IntoResponse},
    routing::get,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PanelConfig>,
    pub panel: Arc<Mutex<Panel>>,
    pub updates: broadcast::Sender<PanelUpdate>,
    pub link: DeviceLink,
}

pub async fn serve(state: AppState) -> Result<()> {
    let router = Router::new()
        .route("/", get(index))
        .route("/api/panel", get(panel_snapshot))
        .route("/ws", get(ws_panel))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let addr: SocketAddr = state.config.http_bind.parse()?;
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("panel listening on http://{addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(graceful_shutdown())
        .await?;

    Ok(())
}

async fn graceful_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutting down panel server");
}

async fn index(State(state): State<AppState>) -> impl IntoResponse {
    Html(ui::render_html(&state.config.device_host))
}

async fn panel_snapshot(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = crate::panel::lock_panel(&state.panel).snapshot();
    Json(snapshot)
}

async fn ws_panel(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Commands from the page. Everything is forwarded to the device; nothing
/// is acted on locally — button and LED state only changes when the device
/// echoes it back.
#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum UiCommand {
    Press { id: u8 },
    Release { id: u8 },
    Scpi { command: String },
}

async fn handle_ws(mut socket: WebSocket, state: AppState) {
    let mut rx = state.updates.subscribe();
    if send_snapshot(&mut socket, &state).await.is_err() {
        return;
    }
    loop {
        tokio::select! {
            update = rx.recv() => match update {
                Ok(update) => {
                    let payload = match serde_json::to_string(&update) {
                        Ok(payload) => payload,
                        Err(_) => continue,
                    };
                    if socket.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!("panel socket lagged by {n} updates, resyncing");
                    if send_snapshot(&mut socket, &state).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            frame = socket.recv() => match frame {
                Some(Ok(Message::Text(text))) => handle_ui_command(&text, &state),
                Some(Ok(_)) => {}
                Some(Err(_)) | None => break,
            },
        }
    }
}

async fn send_snapshot(socket: &mut WebSocket, state: &AppState) -> Result<(), ()> {
    let snapshot = crate::panel::lock_panel(&state.panel).snapshot();
    let payload = serde_json::to_string(&SnapshotFrame {
        kind: "snapshot",
        snapshot,
    })
    .map_err(|_| ())?;
    socket.send(Message::Text(payload)).await.map_err(|_| ())
}

#[derive(serde::Serialize)]
struct SnapshotFrame {
    kind: &'static str,
    #[serde(flatten)]
    snapshot: crate::panel::PanelSnapshot,
}

fn handle_ui_command(text: &str, state: &AppState) {
    let command = match serde_json::from_str::<UiCommand>(text) {
        Ok(command) => command,
        Err(err) => {
            tracing::warn!("dropping malformed ui command {text:?}: {err}");
            return;
        }
    };
    let msg = match command {
        UiCommand::Press { id } => ClientMessage::ButtonPressed(id),
        UiCommand::Release { id } => {
            // Latching buttons toggle on press; only the spring-return
            // controls have a release event on the wire.
            if !crate::panel::is_momentary(id) {
                return;
            }
            ClientMessage::ButtonReleased(id)
        }
        UiCommand::Scpi { command } => {
            if command.is_empty() {
                return;
            }
            ClientMessage::Scpi(command)
        }
    };
    if !state.link.send(&msg) {
        tracing::debug!("device offline, dropped {msg:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ui_commands_deserialize() {
        let press: UiCommand = serde_json::from_str(r#"{"kind":"press","id":2}"#).unwrap();
        assert!(matches!(press, UiCommand::Press { id: 2 }));
        let release: UiCommand = serde_json::from_str(r#"{"kind":"release","id":3}"#).unwrap();
        assert!(matches!(release, UiCommand::Release { id: 3 }));
        let scpi: UiCommand =
            serde_json::from_str(r#"{"kind":"scpi","command":"*IDN?"}"#).unwrap();
        assert!(matches!(scpi, UiCommand::Scpi { command } if command == "*IDN?"));
    }

    #[test]
    fn unknown_command_kinds_are_rejected() {
        assert!(serde_json::from_str::<UiCommand>(r#"{"kind":"reboot"}"#).is_err());
    }
}
