use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use std::f32::consts::PI;
use std::sync::{Arc, Mutex};

/// Synthesis state for one tone. Pure sample math, no audio plumbing, so
/// preemption and expiry are testable without a sound device.
#[derive(Clone, Debug)]
pub struct ToneState {
    frequency_hz: f32,
    phase: f32,
    step: f32,
    position: usize,
    total: usize,
    volume: f32,
}

/// Longest tone that will be synthesized. The device legitimately asks for
/// tenths of a second; anything beyond this is clipped so a bogus duration
/// cannot overflow the sample count or pin the slot for hours.
const MAX_TONE_MS: u64 = 10_000;

impl ToneState {
    pub fn new(frequency_hz: f32, duration_ms: u64, sample_rate: u32, volume: f32) -> Self {
        let duration_ms = duration_ms.clamp(1, MAX_TONE_MS);
        let total = ((sample_rate as u64).saturating_mul(duration_ms) / 1000).max(8) as usize;
        Self {
            frequency_hz,
            phase: 0.0,
            step: 2.0 * PI * frequency_hz / sample_rate as f32,
            position: 0,
            total,
            volume,
        }
    }

    #[cfg(test)]
    fn frequency_hz(&self) -> f32 {
        self.frequency_hz
    }

    #[cfg(test)]
    fn remaining(&self) -> usize {
        self.total - self.position
    }

    /// Next sample, or None once the duration is exhausted. A short linear
    /// attack/release keeps the edges click-free.
    pub fn next_sample(&mut self) -> Option<f32> {
        if self.position >= self.total {
            return None;
        }
        let edge = (self.total / 10).max(1);
        let env = if self.position < edge {
            self.position as f32 / edge as f32
        } else if self.position + edge > self.total {
            (self.total - self.position) as f32 / edge as f32
        } else {
            1.0
        };
        let sample = self.phase.sin() * self.volume * env;
        self.phase += self.step;
        self.position += 1;
        Some(sample)
    }
}

/// Send side of the tone generator. Beeps preempt: writing the slot releases
/// whatever tone was sounding, mid-note, no fade. Never more than one tone.
#[derive(Clone)]
pub struct ToneHandle {
    slot: Arc<Mutex<Option<ToneState>>>,
    sample_rate: u32,
    volume: f32,
}

impl ToneHandle {
    pub fn new(sample_rate: u32, volume: f32) -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            sample_rate,
            volume,
        }
    }

    pub fn beep(&self, frequency_hz: f32, duration_ms: u64) {
        let tone = ToneState::new(frequency_hz, duration_ms, self.sample_rate, self.volume);
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(tone);
        }
    }

    fn next_output_sample(&self) -> f32 {
        let Ok(mut slot) = self.slot.lock() else {
            return 0.0;
        };
        match slot.as_mut().and_then(ToneState::next_sample) {
            Some(sample) => sample.clamp(-1.0, 1.0),
            None => {
                // Expired or already empty: release the slot so the tone's
                // resources do not outlive its duration.
                *slot = None;
                0.0
            }
        }
    }

    #[cfg(test)]
    fn current(&self) -> Option<ToneState> {
        self.slot.lock().unwrap().clone()
    }
}

pub struct ToneEngine {
    handle: ToneHandle,
    _stream: Stream,
}

impl ToneEngine {
    pub fn new(volume: f32) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("No default output device available")?;
        let config = device
            .default_output_config()
            .context("No default output config available")?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        let handle = ToneHandle::new(sample_rate, volume);

        let stream_config: StreamConfig = config.clone().into();
        let err_fn = |err| tracing::error!("Audio stream error: {err}");

        let stream = match config.sample_format() {
            SampleFormat::F32 => {
                let handle = handle.clone();
                device.build_output_stream(
                    &stream_config,
                    move |data: &mut [f32], _| write_samples_f32(data, channels, &handle),
                    err_fn,
                    None,
                )?
            }
            SampleFormat::I16 => {
                let handle = handle.clone();
                device.build_output_stream(
                    &stream_config,
                    move |data: &mut [i16], _| write_samples_i16(data, channels, &handle),
                    err_fn,
                    None,
                )?
            }
            SampleFormat::U16 => {
                let handle = handle.clone();
                device.build_output_stream(
                    &stream_config,
                    move |data: &mut [u16], _| write_samples_u16(data, channels, &handle),
                    err_fn,
                    None,
                )?
            }
            other => return Err(anyhow::anyhow!("Unsupported sample format: {:?}", other)),
        };

        stream.play()?;

        Ok(Self {
            handle,
            _stream: stream,
        })
    }

    pub fn handle(&self) -> ToneHandle {
        self.handle.clone()
    }
}

fn write_samples_f32(data: &mut [f32], channels: usize, handle: &ToneHandle) {
    for frame in data.chunks_mut(channels.max(1)) {
        let v = handle.next_output_sample();
        for sample in frame.iter_mut() {
            *sample = v;
        }
    }
}

fn write_samples_i16(data: &mut [i16], channels: usize, handle: &ToneHandle) {
    for frame in data.chunks_mut(channels.max(1)) {
        let v = handle.next_output_sample();
        for sample in frame.iter_mut() {
            *sample = (v * i16::MAX as f32) as i16;
        }
    }
}

fn write_samples_u16(data: &mut [u16], channels: usize, handle: &ToneHandle) {
    for frame in data.chunks_mut(channels.max(1)) {
        let v = handle.next_output_sample();
        for sample in frame.iter_mut() {
            *sample = ((v + 1.0) * 0.5 * u16::MAX as f32) as u16;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 48_000;

    #[test]
    fn tone_runs_for_exactly_its_duration() {
        let mut tone = ToneState::new(440.0, 100, RATE, 0.35);
        let expected = (RATE as usize * 100) / 1000;
        let mut count = 0;
        while tone.next_sample().is_some() {
            count += 1;
        }
        assert_eq!(count, expected);
        // Exhausted tones stay exhausted.
        assert!(tone.next_sample().is_none());
    }

    #[test]
    fn second_beep_preempts_the_first() {
        let handle = ToneHandle::new(RATE, 0.35);
        handle.beep(880.0, 100);
        // Drain a little of the first tone, as the stream callback would.
        for _ in 0..100 {
            handle.next_output_sample();
        }
        handle.beep(440.0, 100);
        let tone = handle.current().expect("slot should hold the new tone");
        assert_eq!(tone.frequency_hz(), 440.0);
        // The replacement starts from the top, not where the old tone was.
        assert_eq!(tone.remaining(), (RATE as usize * 100) / 1000);
    }

    #[test]
    fn slot_is_released_after_expiry() {
        let handle = ToneHandle::new(RATE, 0.35);
        handle.beep(880.0, 10);
        let samples = (RATE as usize * 10) / 1000;
        for _ in 0..samples {
            handle.next_output_sample();
        }
        // One more pull notices the expiry and clears the slot.
        assert_eq!(handle.next_output_sample(), 0.0);
        assert!(handle.current().is_none());
    }

    #[test]
    fn idle_slot_outputs_silence() {
        let handle = ToneHandle::new(RATE, 0.35);
        for _ in 0..64 {
            assert_eq!(handle.next_output_sample(), 0.0);
        }
    }

    #[test]
    fn absurd_durations_are_clipped_not_overflowed() {
        // A frame like bep~440~400000000000000000 parses; it must clip to
        // the tone ceiling rather than overflow the sample arithmetic.
        let tone = ToneState::new(440.0, 400_000_000_000_000_000, RATE, 0.35);
        assert_eq!(tone.remaining(), (RATE as usize * MAX_TONE_MS as usize) / 1000);

        let handle = ToneHandle::new(RATE, 0.35);
        handle.beep(440.0, u64::MAX);
        let clipped = handle.current().expect("slot should hold the tone");
        assert_eq!(
            clipped.remaining(),
            (RATE as usize * MAX_TONE_MS as usize) / 1000
        );
    }

    #[test]
    fn envelope_tapers_both_edges() {
        let mut tone = ToneState::new(1000.0, 50, RATE, 1.0);
        let first = tone.next_sample().unwrap();
        assert_eq!(first, 0.0, "attack starts from silence");
        let mut last = first;
        while let Some(sample) = tone.next_sample() {
            last = sample;
        }
        assert!(last.abs() < 0.05, "release ends near silence, got {last}");
    }
}
