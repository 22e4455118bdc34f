use std::env;

pub struct PanelConfig {
    pub device_host: String,
    pub http_bind: String,
    pub reconnect_delay_ms: u64,
    pub beep_volume: f32,
    pub button_count: u8,
    pub led_count: u8,
}

impl PanelConfig {
    pub fn from_env() -> Self {
        Self {
            device_host: env_var("DEVICE_HOST", "magloop.local"),
            http_bind: env_var("HTTP_BIND", "0.0.0.0:8080"),
            reconnect_delay_ms: env_var("RECONNECT_DELAY_MS", "5000").parse().unwrap_or(5000),
            beep_volume: env_var("BEEP_VOLUME", "0.35").parse().unwrap_or(0.35),
            button_count: env_var("BUTTON_COUNT", "4").parse().unwrap_or(4),
            led_count: env_var("LED_COUNT", "2").parse().unwrap_or(2),
        }
    }

    pub fn device_ws_url(&self) -> String {
        format!("ws://{}/ws", self.device_host)
    }
}

fn env_var(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
