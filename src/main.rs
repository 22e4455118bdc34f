mod audio;
mod config;
mod device;
mod gauge;
mod panel;
mod protocol;
mod ui;
mod web;

use crate::audio::ToneEngine;
use crate::config::PanelConfig;
use crate::device::{DeviceLink, SupervisorConfig};
use crate::panel::{Panel, PanelUpdate};
use crate::web::AppState;
use anyhow::Result;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = Arc::new(PanelConfig::from_env());

    tracing::info!(
        "Starting swrpanel on {} (device: {})",
        config.http_bind,
        config.device_host
    );

    // Beeps are feedback, not function: a machine without a sound card
    // still gets a working panel.
    let tone_engine = match ToneEngine::new(config.beep_volume) {
        Ok(engine) => Some(engine),
        Err(err) => {
            tracing::warn!("No audio output, beeps disabled: {err:#}");
            None
        }
    };
    let tones = tone_engine.as_ref().map(ToneEngine::handle);

    let panel = Arc::new(Mutex::new(Panel::new(
        config.button_count,
        config.led_count,
    )));
    let (updates_tx, _) = broadcast::channel::<PanelUpdate>(64);
    let link = DeviceLink::new();

    let supervisor = device::spawn_supervisor(
        SupervisorConfig {
            url: config.device_ws_url(),
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
        },
        link.clone(),
        Arc::clone(&panel),
        updates_tx.clone(),
        tones,
    );

    let state = AppState {
        config,
        panel,
        updates: updates_tx,
        link,
    };

    web::serve(state).await?;

    supervisor.abort();
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    let _ = fmt().with_env_filter(env_filter).try_init();
}
