use dioxus::core::NoOpMutations;
use dioxus::prelude::*;

#[derive(Props, Clone, PartialEq)]
pub struct AppProps {
    pub device_host: String,
}

pub fn render_html(device_host: &str) -> String {
    let mut app = VirtualDom::new_with_props(
        App,
        AppProps {
            device_host: device_host.to_string(),
        },
    );
    // Build the tree before rendering to avoid SSR panics.
    let mut noop = NoOpMutations {};
    let _ = app.rebuild(&mut noop);
    dioxus_ssr::render(&mut app)
}

#[component]
fn App(props: AppProps) -> Element {
    let styles = r#"
:root {
    color-scheme: light;
}
* { box-sizing: border-box; }
body, html {
    margin: 0;
    padding: 0;
    background: radial-gradient(circle at 20% 20%, #171a24, #0b0d13 40%), #0b0d13;
}
.page { min-height: 100vh; display: flex; justify-content: center; padding: 36px 18px; color: #e9ecf5; font-family: "Space Grotesk", "Inter", system-ui, -apple-system, sans-serif; }
.shell { width: min(760px, 100%); display: flex; flex-direction: column; gap: 12px; }
.header { display: flex; flex-direction: column; gap: 6px; }
.title { font-size: 26px; margin: 0; letter-spacing: 0.4px; }
.subtitle { margin: 0; color: #9aa4bc; font-size: 15px; }
.tag { display: inline-flex; align-items: center; gap: 8px; width: fit-content; padding: 8px 12px; border-radius: 999px; background: #10131c; border: 1px solid #1f2431; color: #c5cee3; font-size: 14px; }
.card { width: 100%; background: linear-gradient(145deg, #161a23, #0f1219); border: 1px solid #1f2230; border-radius: 16px; padding: 22px; box-shadow: 0 18px 44px rgba(0,0,0,0.35); }
.card-title { margin: 0 0 4px 0; font-size: 20px; }
.muted { color: #8f98ac; margin: 0 0 16px 0; font-size: 14px; }
.gauge-row { display: flex; align-items: center; gap: 16px; }
.gauge-track { position: relative; flex: 1; height: 34px; border-radius: 10px; overflow: hidden; border: 1px solid #262b38; background: linear-gradient(to right, #1f7a1f 0%, #1f7a1f 22.2%, #8a8a1f 22.2%, #8a8a1f 44.4%, #8a2424 44.4%, #8a2424 100%); opacity: 0.95; }
.gauge-bar { position: absolute; inset: 0 auto 0 0; width: 0%; background: green; opacity: 0.9; transition: width 120ms linear, background 120ms linear; }
.gauge-ticks { display: flex; justify-content: space-between; margin-top: 4px; color: #7c859c; font-size: 12px; }
.valuebox { min-width: 96px; text-align: center; padding: 10px 12px; border-radius: 10px; border: 1px solid #262b38; background: #0f1118; font-size: 20px; font-weight: 700; }
.controls { display: grid; grid-template-columns: repeat(auto-fit, minmax(140px, 1fr)); gap: 12px; }
.controlButton { padding: 16px 12px; border-radius: 12px; border: 2px solid #262b38; background-color: DimGray; color: #0b0d12; font-weight: 800; font-size: 15px; letter-spacing: 0.2px; cursor: pointer; transition: transform 80ms ease, filter 80ms ease; user-select: none; }
.controlButton.depressed { transform: translateY(2px); filter: brightness(1.15); border-color: #e9ecf5; box-shadow: inset 0 3px 8px rgba(0,0,0,0.45); }
.led-row { display: flex; gap: 18px; margin-top: 16px; flex-wrap: wrap; }
.led-item { display: flex; align-items: center; gap: 10px; color: #c5cee3; font-size: 14px; }
.led { width: 18px; height: 18px; border-radius: 50%; border: 2px solid #262b38; background-color: LimeGreen; box-shadow: 0 0 8px rgba(0,0,0,0.4); }
.scpi-row { display: flex; gap: 10px; flex-wrap: wrap; }
.scpi-input { flex: 1; min-width: 200px; padding: 12px; border-radius: 10px; border: 1px solid #262b38; background: #0f1118; color: #e9ecf5; font-family: ui-monospace, monospace; font-size: 14px; }
.pill-btn { padding: 10px 12px; border-radius: 10px; border: 1px solid #262b38; background: #0f1118; color: #dfe4f3; font-weight: 700; cursor: pointer; transition: all 120ms ease; }
.pill-btn:hover { border-color: #ff90a3; color: #ffb5c2; }
.scpi-response { width: 100%; margin-top: 12px; height: 180px; resize: vertical; padding: 12px; border-radius: 10px; border: 1px solid #262b38; background: #0f1118; color: #9fe8a9; font-family: ui-monospace, monospace; font-size: 13px; }
.status { margin-top: 10px; color: #8f98ac; font-size: 14px; min-height: 18px; }
@media (max-width: 520px) {
    .page { padding: 16px 12px; }
    .card { padding: 16px; }
    .title { font-size: 20px; }
    .gauge-row { flex-direction: column; align-items: stretch; }
}
"#;

    let script = r#"
(() => {
  const gaugeBar = document.getElementById('gaugeSWR');
  const valuebox = document.getElementById('valueboxSWR');
  const scpiInput = document.getElementById('scpiInput');
  const scpiResponse = document.getElementById('scpiResponse');
  const clearInput = document.getElementById('clearScpiInputButton');
  const clearResponse = document.getElementById('clearResponseButton');
  const linkStatus = document.getElementById('link-status');
  let ws;
  let momentary = [];
  let audioCtx = null;
  let toneStop = null;

  function connect() {
    ws = new WebSocket(`ws://${window.location.host}/ws`);
    ws.onopen = () => { if (linkStatus) linkStatus.textContent = ''; };
    ws.onmessage = (event) => {
      let update;
      try { update = JSON.parse(event.data); } catch (err) { return; }
      apply(update);
    };
    ws.onclose = () => {
      if (linkStatus) linkStatus.textContent = 'Panel host unreachable, retrying...';
      setTimeout(connect, 5000);
    };
  }

  function apply(update) {
    switch (update.kind) {
      case 'snapshot':
        (update.buttons || []).forEach((b) => setButton(b.id, b.depressed, b.color));
        (update.leds || []).forEach((l) => setLed(l.id, l.color));
        if (update.gauge) setGauge(update.gauge);
        if (scpiResponse) {
          scpiResponse.value = (update.scpi_log || []).map((line) => line + '\n').join('');
          scpiResponse.scrollTop = scpiResponse.scrollHeight;
        }
        momentary = update.momentary || [];
        break;
      case 'button':
        setButton(update.id, update.depressed, update.color);
        break;
      case 'led':
        setLed(update.id, update.color);
        break;
      case 'gauge':
        setGauge(update);
        break;
      case 'scpi-line':
        if (scpiResponse) {
          scpiResponse.value += update.line + '\n';
          scpiResponse.scrollTop = scpiResponse.scrollHeight;
        }
        break;
      case 'beep':
        beep(update.frequency_hz, update.duration_ms);
        break;
      default:
        console.log('Unknown update kind:', update.kind);
    }
  }

  function setButton(id, depressed, color) {
    const button = document.getElementById('btn' + id);
    if (!button) return;
    button.style.setProperty('background-color', color);
    button.classList.toggle('depressed', !!depressed);
  }

  function setLed(id, color) {
    const led = document.getElementById('led' + id);
    if (!led) return;
    led.style.backgroundColor = color;
  }

  function setGauge(gauge) {
    if (gaugeBar) {
      gaugeBar.style.width = (gauge.fraction * 100).toFixed(1) + '%';
      gaugeBar.style.background = gauge.band;
    }
    if (valuebox) valuebox.textContent = gauge.display;
  }

  // Single tone slot: a new beep silences whatever is sounding.
  function beep(frequency, duration) {
    if (audioCtx) {
      if (toneStop) clearTimeout(toneStop);
      audioCtx.close();
      audioCtx = null;
    }
    const Ctx = window.AudioContext || window.webkitAudioContext;
    if (!Ctx) return;
    audioCtx = new Ctx();
    const ctx = audioCtx;
    const oscillator = ctx.createOscillator();
    const gain = ctx.createGain();
    oscillator.connect(gain);
    gain.connect(ctx.destination);
    oscillator.frequency.value = frequency;
    oscillator.type = 'sine';
    oscillator.start();
    toneStop = setTimeout(() => {
      oscillator.stop();
      ctx.close();
      if (audioCtx === ctx) audioCtx = null;
    }, duration);
  }

  function send(command) {
    if (ws && ws.readyState === WebSocket.OPEN) {
      ws.send(JSON.stringify(command));
    }
  }

  document.querySelectorAll('.controlButton').forEach((button) => {
    const id = parseInt(button.id.replace('btn', ''), 10);
    button.addEventListener('mousedown', () => send({ kind: 'press', id }));
    button.addEventListener('mouseup', () => {
      if (momentary.includes(id)) send({ kind: 'release', id });
    });
    button.addEventListener('mouseleave', () => {
      if (momentary.includes(id) && button.classList.contains('depressed')) {
        send({ kind: 'release', id });
      }
    });
  });

  scpiInput?.addEventListener('keydown', (event) => {
    if (event.key !== 'Enter') return;
    const command = scpiInput.value;
    if (!command) return;
    send({ kind: 'scpi', command });
    scpiInput.value = '';
  });

  clearInput?.addEventListener('click', () => {
    if (scpiInput) scpiInput.value = '';
  });

  // Clears the view only; the panel host keeps the full log.
  clearResponse?.addEventListener('click', () => {
    if (scpiResponse) scpiResponse.value = '';
  });

  connect();
})();
"#;

    rsx! {
        div { class: "page",
            meta { name: "viewport", content: "width=device-width, initial-scale=1" }
            div { class: "shell",
                div { class: "header",
                    h1 { class: "title", "Magloop Controller" }
                    p { class: "subtitle", "SWR meter and antenna tuner panel" }
                    div { class: "tag", "Device: {props.device_host}" }
                    div { id: "link-status", class: "status" }
                }
                div { class: "card",
                    h2 { class: "card-title", "SWR" }
                    p { class: "muted", "Standing wave ratio. Green below 3:1, yellow to 5:1, red above." }
                    div { class: "gauge-row",
                        div { class: "gauge-track",
                            div { id: "gaugeSWR", class: "gauge-bar" }
                        }
                        div { id: "valueboxSWR", class: "valuebox", "2.00:1" }
                    }
                    div { class: "gauge-ticks",
                        span { "1" } span { "2" } span { "3" } span { "4" } span { "5" }
                        span { "6" } span { "7" } span { "8" } span { "9" } span { "10" }
                    }
                }
                div { class: "card",
                    h2 { class: "card-title", "Tuning" }
                    p { class: "muted", "Scan buttons latch until a limit is reached; jog buttons run only while held." }
                    div { class: "controls",
                        button { id: "btn0", class: "controlButton", "Scan Up" }
                        button { id: "btn1", class: "controlButton", "Scan Down" }
                        button { id: "btn2", class: "controlButton", "data-momentary": "true", "Jog Up" }
                        button { id: "btn3", class: "controlButton", "data-momentary": "true", "Jog Down" }
                    }
                    div { class: "led-row",
                        div { class: "led-item",
                            div { id: "led0", class: "led" }
                            span { "Upper limit" }
                        }
                        div { class: "led-item",
                            div { id: "led1", class: "led" }
                            span { "Lower limit" }
                        }
                    }
                }
                div { class: "card",
                    h2 { class: "card-title", "SCPI console" }
                    p { class: "muted", "Commands go straight to the device; responses append below." }
                    div { class: "scpi-row",
                        input {
                            id: "scpiInput",
                            class: "scpi-input",
                            r#type: "text",
                            placeholder: "*IDN?",
                            autocomplete: "off",
                        }
                        button { id: "clearScpiInputButton", class: "pill-btn", "Clear input" }
                        button { id: "clearResponseButton", class: "pill-btn", "Clear responses" }
                    }
                    textarea { id: "scpiResponse", class: "scpi-response", readonly: true }
                }
            }
        }
        style { "{styles}" }
        script { "{script}" }
    }
}
