use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::audio::ToneHandle;
use crate::panel::{Panel, PanelUpdate};
use crate::protocol::{self, ClientMessage, ParseError};

/// Cloneable send handle for the device connection. The sender slot is
/// populated only while a session is up; sends in between are dropped,
/// never queued — callers must not assume delivery.
#[derive(Clone, Default)]
pub struct DeviceLink {
    outbound: Arc<Mutex<Option<mpsc::UnboundedSender<String>>>>,
}

impl DeviceLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the frame was dropped (no open connection).
    pub fn send(&self, msg: &ClientMessage) -> bool {
        let Ok(guard) = self.outbound.lock() else {
            return false;
        };
        match guard.as_ref() {
            Some(tx) => tx.send(msg.encode()).is_ok(),
            None => {
                tracing::debug!("device link closed, dropping {msg:?}");
                false
            }
        }
    }

    fn attach(&self, tx: mpsc::UnboundedSender<String>) {
        if let Ok(mut guard) = self.outbound.lock() {
            *guard = Some(tx);
        }
    }

    fn detach(&self) {
        if let Ok(mut guard) = self.outbound.lock() {
            *guard = None;
        }
    }
}

pub struct SupervisorConfig {
    pub url: String,
    pub reconnect_delay: Duration,
}

/// Runs the connection forever: connect, pump frames, and on any close or
/// error wait the fixed delay and dial again. No backoff, no retry cap —
/// the device is expected to always come back. The single loop owns the
/// one sleep, so repeated closes cannot stack pending reconnects.
pub fn spawn_supervisor(
    config: SupervisorConfig,
    link: DeviceLink,
    panel: Arc<Mutex<Panel>>,
    updates: broadcast::Sender<PanelUpdate>,
    tones: Option<ToneHandle>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match run_session(&config.url, &link, &panel, &updates, tones.as_ref()).await {
                Ok(()) => tracing::info!("device connection closed"),
                Err(err) => tracing::warn!("device connection failed: {err:#}"),
            }
            link.detach();
            tokio::time::sleep(config.reconnect_delay).await;
        }
    })
}

async fn run_session(
    url: &str,
    link: &DeviceLink,
    panel: &Arc<Mutex<Panel>>,
    updates: &broadcast::Sender<PanelUpdate>,
    tones: Option<&ToneHandle>,
) -> Result<()> {
    let (stream, _) = tokio_tungstenite::connect_async(url)
        .await
        .with_context(|| format!("unable to reach {url}"))?;
    tracing::info!("connected to device at {url}");

    let (mut write, mut read) = stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    link.attach(tx);

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if write.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    let result = loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => handle_frame(&text, panel, updates, tones),
            Some(Ok(Message::Close(_))) | None => break Ok(()),
            Some(Ok(_)) => {}
            Some(Err(err)) => break Err(err).context("device socket read failed"),
        }
    };

    link.detach();
    writer.abort();
    result
}

/// One inbound frame: parse, apply, fan out. Malformed input is dropped
/// after logging and never disturbs panel state.
fn handle_frame(
    text: &str,
    panel: &Arc<Mutex<Panel>>,
    updates: &broadcast::Sender<PanelUpdate>,
    tones: Option<&ToneHandle>,
) {
    let msg = match protocol::parse_message(text) {
        Ok(msg) => msg,
        Err(ParseError::NoSeparator) => {
            tracing::debug!("ignoring non-protocol frame {text:?}");
            return;
        }
        Err(err) => {
            tracing::warn!("dropping frame {text:?}: {err}");
            return;
        }
    };

    let produced = crate::panel::lock_panel(panel).apply(msg);
    for update in produced {
        if let PanelUpdate::Beep {
            frequency_hz,
            duration_ms,
        } = update
        {
            if let Some(tones) = tones {
                tones.beep(frequency_hz, duration_ms);
            }
        }
        // Fails only when no web client is subscribed; that is fine.
        let _ = updates.send(update);
    }
}
