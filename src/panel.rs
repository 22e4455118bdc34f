use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::gauge::{GaugeView, SwrGauge};
use crate::protocol::DeviceMessage;

/// Locks the shared panel, recovering the state if a previous holder
/// panicked mid-update. A stale color on one control beats taking the
/// whole panel down.
pub fn lock_panel(panel: &Mutex<Panel>) -> MutexGuard<'_, Panel> {
    panel.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Spring-return buttons: pressed while held, released on mouseup, and
/// intentionally silent on release.
pub const MOMENTARY_BUTTONS: [u8; 2] = [2, 3];

pub fn is_momentary(id: u8) -> bool {
    MOMENTARY_BUTTONS.contains(&id)
}

#[derive(Clone, Debug, Serialize)]
pub struct ButtonState {
    pub id: u8,
    pub depressed: bool,
    pub color: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct LedState {
    pub id: u8,
    pub color: String,
}

/// One unit of change, pushed to web clients as JSON and fed to the tone
/// generator. `apply` returns these in the order they must take effect;
/// a beep always follows the state change that caused it.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PanelUpdate {
    ScpiLine { line: String },
    Gauge(GaugeView),
    Led { id: u8, color: String },
    Button { id: u8, depressed: bool, color: String },
    Beep { frequency_hz: f32, duration_ms: u64 },
}

/// Full panel state for a newly connected web client.
#[derive(Clone, Debug, Serialize)]
pub struct PanelSnapshot {
    pub buttons: Vec<ButtonState>,
    pub leds: Vec<LedState>,
    pub gauge: GaugeView,
    pub scpi_log: Vec<String>,
    pub momentary: Vec<u8>,
}

/// All transient UI state: button and LED appearance, the gauge, and the
/// append-only SCPI log. Mutated only through `apply`.
pub struct Panel {
    buttons: Vec<ButtonState>,
    leds: Vec<LedState>,
    gauge: SwrGauge,
    scpi_log: Vec<String>,
}

impl Panel {
    pub fn new(button_count: u8, led_count: u8) -> Self {
        Self {
            buttons: (0..button_count)
                .map(|id| ButtonState {
                    id,
                    depressed: false,
                    color: "DimGray".to_string(),
                })
                .collect(),
            leds: (0..led_count)
                .map(|id| LedState {
                    id,
                    color: "LimeGreen".to_string(),
                })
                .collect(),
            gauge: SwrGauge::new(),
            scpi_log: Vec::new(),
        }
    }

    /// Maps one inbound message to state changes plus the updates to fan out.
    /// Ids the panel does not have are logged and skipped, matching the old
    /// null-element guard; nothing here ever panics on device input.
    pub fn apply(&mut self, msg: DeviceMessage) -> Vec<PanelUpdate> {
        match msg {
            DeviceMessage::Scpi(response) => {
                self.scpi_log.push(response.clone());
                vec![PanelUpdate::ScpiLine { line: response }]
            }
            DeviceMessage::Swr(value) => {
                self.gauge.set_value(value);
                vec![PanelUpdate::Gauge(self.gauge.view())]
            }
            DeviceMessage::Led { id, color } => {
                let Some(led) = self.leds.iter_mut().find(|led| led.id == id) else {
                    tracing::debug!("no led {id} on this panel, ignoring");
                    return Vec::new();
                };
                led.color = color.clone();
                let mut updates = vec![PanelUpdate::Led {
                    id,
                    color: color.clone(),
                }];
                // A limit indicator turning red gets a low warning tone. The
                // device reports CSS color names in mixed case.
                if color.eq_ignore_ascii_case("red") {
                    updates.push(PanelUpdate::Beep {
                        frequency_hz: 180.0,
                        duration_ms: 100,
                    });
                }
                updates
            }
            DeviceMessage::Button {
                id,
                depressed,
                color,
            } => {
                let Some(button) = self.buttons.iter_mut().find(|btn| btn.id == id) else {
                    tracing::debug!("no button {id} on this panel, ignoring");
                    return Vec::new();
                };
                button.depressed = depressed;
                button.color = color.clone();
                let mut updates = vec![PanelUpdate::Button {
                    id,
                    depressed,
                    color,
                }];
                if let Some((frequency_hz, duration_ms)) = button_beep(id, depressed) {
                    updates.push(PanelUpdate::Beep {
                        frequency_hz,
                        duration_ms,
                    });
                }
                updates
            }
            DeviceMessage::Beep {
                frequency_hz,
                duration_ms,
            } => vec![PanelUpdate::Beep {
                frequency_hz,
                duration_ms,
            }],
        }
    }

    pub fn snapshot(&self) -> PanelSnapshot {
        PanelSnapshot {
            buttons: self.buttons.clone(),
            leds: self.leds.clone(),
            gauge: self.gauge.view(),
            scpi_log: self.scpi_log.clone(),
            momentary: MOMENTARY_BUTTONS.to_vec(),
        }
    }
}

/// Fixed tonic/dominant pairs per control: a high pitch for ON, a lower one
/// for OFF on the latching scan buttons. The momentary jog buttons are
/// silent on release.
fn button_beep(id: u8, depressed: bool) -> Option<(f32, u64)> {
    match (id, depressed) {
        (0 | 2, true) => Some((880.0, 100)),
        (0, false) => Some((784.0, 100)),
        (1 | 3, true) => Some((440.0, 100)),
        (1, false) => Some((392.0, 100)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gauge::SwrBand;
    use crate::protocol::parse_message;

    fn beeps(updates: &[PanelUpdate]) -> Vec<(f32, u64)> {
        updates
            .iter()
            .filter_map(|u| match u {
                PanelUpdate::Beep {
                    frequency_hz,
                    duration_ms,
                } => Some((*frequency_hz, *duration_ms)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn button_beep_table_is_exhaustive() {
        let cases = [
            (0, true, Some((880.0, 100))),
            (0, false, Some((784.0, 100))),
            (1, true, Some((440.0, 100))),
            (1, false, Some((392.0, 100))),
            (2, true, Some((880.0, 100))),
            (2, false, None),
            (3, true, Some((440.0, 100))),
            (3, false, None),
        ];
        for (id, depressed, expected) in cases {
            assert_eq!(
                button_beep(id, depressed),
                expected,
                "button {id} depressed={depressed}"
            );
        }
    }

    #[test]
    fn button_update_emits_state_then_beep() {
        let mut panel = Panel::new(4, 2);
        let updates = panel.apply(DeviceMessage::Button {
            id: 0,
            depressed: true,
            color: "RoyalBlue".to_string(),
        });
        assert_eq!(
            updates[0],
            PanelUpdate::Button {
                id: 0,
                depressed: true,
                color: "RoyalBlue".to_string()
            }
        );
        assert_eq!(beeps(&updates), vec![(880.0, 100)]);
    }

    #[test]
    fn momentary_release_is_silent() {
        let mut panel = Panel::new(4, 2);
        for id in MOMENTARY_BUTTONS {
            let updates = panel.apply(DeviceMessage::Button {
                id,
                depressed: false,
                color: "DimGray".to_string(),
            });
            assert_eq!(updates.len(), 1, "button {id} release must not beep");
        }
    }

    #[test]
    fn red_led_beeps_exactly_once() {
        let mut panel = Panel::new(4, 2);
        let updates = panel.apply(DeviceMessage::Led {
            id: 1,
            color: "Red".to_string(),
        });
        assert_eq!(
            updates[0],
            PanelUpdate::Led {
                id: 1,
                color: "Red".to_string()
            }
        );
        assert_eq!(beeps(&updates), vec![(180.0, 100)]);
        assert_eq!(panel.snapshot().leds[1].color, "Red");
    }

    #[test]
    fn green_led_never_beeps() {
        let mut panel = Panel::new(4, 2);
        let updates = panel.apply(DeviceMessage::Led {
            id: 1,
            color: "LimeGreen".to_string(),
        });
        assert_eq!(updates.len(), 1);
        assert!(beeps(&updates).is_empty());
    }

    #[test]
    fn out_of_range_ids_leave_state_unchanged() {
        let mut panel = Panel::new(4, 2);
        let before = serde_json::to_string(&panel.snapshot()).unwrap();
        assert!(
            panel
                .apply(DeviceMessage::Led {
                    id: 9,
                    color: "Red".to_string()
                })
                .is_empty()
        );
        assert!(
            panel
                .apply(DeviceMessage::Button {
                    id: 200,
                    depressed: true,
                    color: "Lime".to_string()
                })
                .is_empty()
        );
        let after = serde_json::to_string(&panel.snapshot()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn scpi_log_appends_in_order() {
        let mut panel = Panel::new(4, 2);
        panel.apply(DeviceMessage::Scpi("first".to_string()));
        let updates = panel.apply(DeviceMessage::Scpi("BAR".to_string()));
        assert_eq!(
            updates,
            vec![PanelUpdate::ScpiLine {
                line: "BAR".to_string()
            }]
        );
        assert_eq!(panel.snapshot().scpi_log, vec!["first", "BAR"]);
    }

    #[test]
    fn swr_update_moves_gauge() {
        let mut panel = Panel::new(4, 2);
        let updates = panel.apply(DeviceMessage::Swr(5.2));
        match &updates[0] {
            PanelUpdate::Gauge(view) => {
                assert_eq!(view.band, SwrBand::Red);
                assert_eq!(view.display, "5.2:1");
            }
            other => panic!("expected gauge update, got {other:?}"),
        }
        assert_eq!(panel.snapshot().gauge.value, 5.2);
    }

    #[test]
    fn malformed_frames_never_reach_apply() {
        // Parse rejects them; the panel state stays untouched.
        let mut panel = Panel::new(4, 2);
        let before = serde_json::to_string(&panel.snapshot()).unwrap();
        for raw in ["swr", "unknowntag~x", "led~1", "btn~0~true"] {
            assert!(parse_message(raw).is_err(), "{raw:?} should not parse");
        }
        let after = serde_json::to_string(&panel.snapshot()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn poisoned_panel_lock_recovers() {
        use std::sync::Arc;

        let panel = Arc::new(Mutex::new(Panel::new(4, 2)));
        let poisoner = Arc::clone(&panel);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("holder dies mid-update");
        })
        .join();
        assert!(panel.lock().is_err(), "mutex should be poisoned");

        let updates = lock_panel(&panel).apply(DeviceMessage::Swr(2.0));
        assert_eq!(updates.len(), 1);
    }

    #[test]
    fn snapshot_marks_momentary_buttons() {
        let panel = Panel::new(4, 2);
        let snapshot = panel.snapshot();
        assert_eq!(snapshot.momentary, vec![2, 3]);
        assert_eq!(snapshot.buttons.len(), 4);
        assert_eq!(snapshot.leds.len(), 2);
        assert!(is_momentary(2) && is_momentary(3));
        assert!(!is_momentary(0) && !is_momentary(1));
    }
}
