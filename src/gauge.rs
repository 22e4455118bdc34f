use serde::Serialize;

/// Display scale of the bar. Readings outside are banded normally but the
/// bar pins at the ends.
pub const SCALE_MIN: f64 = 1.0;
pub const SCALE_MAX: f64 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwrBand {
    Green,
    Yellow,
    Red,
}

impl SwrBand {
    pub fn of(value: f64) -> Self {
        if value < 3.0 {
            SwrBand::Green
        } else if value < 5.0 {
            SwrBand::Yellow
        } else {
            SwrBand::Red
        }
    }

}

/// Two decimals inside the good band, one outside it.
pub fn format_ratio(value: f64) -> String {
    if value < 3.0 {
        format!("{value:.2}:1")
    } else {
        format!("{value:.1}:1")
    }
}

/// Snapshot of the gauge as rendered: raw value, band, readout text, and the
/// bar fill as a fraction of the 1..10 scale.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GaugeView {
    pub value: f64,
    pub band: SwrBand,
    pub display: String,
    pub fraction: f64,
}

/// Single gauge instance owned by the panel for the life of the process.
#[derive(Clone, Debug)]
pub struct SwrGauge {
    value: f64,
}

impl SwrGauge {
    pub fn new() -> Self {
        // The device reports real readings immediately after connect; until
        // then show a nominal mid-green value like the original panel did.
        Self { value: 2.0 }
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    pub fn band(&self) -> SwrBand {
        SwrBand::of(self.value)
    }

    pub fn view(&self) -> GaugeView {
        let clamped = self.value.clamp(SCALE_MIN, SCALE_MAX);
        GaugeView {
            value: self.value,
            band: self.band(),
            display: format_ratio(self.value),
            fraction: (clamped - SCALE_MIN) / (SCALE_MAX - SCALE_MIN),
        }
    }
}

impl Default for SwrGauge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_split_at_three_and_five() {
        assert_eq!(SwrBand::of(1.0), SwrBand::Green);
        assert_eq!(SwrBand::of(2.99), SwrBand::Green);
        assert_eq!(SwrBand::of(3.0), SwrBand::Yellow);
        assert_eq!(SwrBand::of(4.99), SwrBand::Yellow);
        assert_eq!(SwrBand::of(5.0), SwrBand::Red);
        assert_eq!(SwrBand::of(50.0), SwrBand::Red);
    }

    #[test]
    fn readout_drops_precision_outside_good_band() {
        assert_eq!(format_ratio(1.234), "1.23:1");
        assert_eq!(format_ratio(2.999), "3.00:1");
        assert_eq!(format_ratio(3.0), "3.0:1");
        assert_eq!(format_ratio(7.25), "7.2:1");
    }

    #[test]
    fn bar_pins_at_scale_ends() {
        let mut gauge = SwrGauge::new();
        gauge.set_value(0.5);
        assert_eq!(gauge.view().fraction, 0.0);
        gauge.set_value(25.0);
        assert_eq!(gauge.view().fraction, 1.0);
        // The raw value is preserved even when the bar pins.
        assert_eq!(gauge.view().value, 25.0);
    }

    #[test]
    fn view_carries_band_and_display() {
        let mut gauge = SwrGauge::new();
        gauge.set_value(4.0);
        let view = gauge.view();
        assert_eq!(view.band, SwrBand::Yellow);
        assert_eq!(view.display, "4.0:1");
        assert!((view.fraction - 3.0 / 9.0).abs() < 1e-9);
    }
}
