use rodio::Source;
use std::f32::consts::PI;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Sawtooth,
}

const SAMPLE_RATE: u32 = 44_100;
const PEAK_GAIN: f32 = 0.5;
const FLOOR_GAIN: f32 = 0.01;
const ATTACK_SECS: f32 = 0.01;

/// One finite tone burst. A short linear attack and an exponential decay keep
/// the cue from clicking at either end.
pub struct Tone {
    freq: f32,
    waveform: Waveform,
    sample_rate: u32,
    num_sample: usize,
    total_samples: usize,
}

impl Tone {
    pub fn new(freq: f32, waveform: Waveform, duration: Duration) -> Self {
        let total_samples = (duration.as_secs_f32() * SAMPLE_RATE as f32) as usize;
        Self {
            freq,
            waveform,
            sample_rate: SAMPLE_RATE,
            num_sample: 0,
            total_samples,
        }
    }

    fn envelope(&self, t: f32) -> f32 {
        let total = self.total_samples as f32 / self.sample_rate as f32;
        if t < ATTACK_SECS {
            PEAK_GAIN * (t / ATTACK_SECS)
        } else {
            let progress = (t - ATTACK_SECS) / (total - ATTACK_SECS).max(f32::EPSILON);
            PEAK_GAIN * (FLOOR_GAIN / PEAK_GAIN).powf(progress)
        }
    }
}

impl Iterator for Tone {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples {
            return None;
        }

        let t = self.num_sample as f32 / self.sample_rate as f32;
        self.num_sample += 1;

        let phase = self.freq * t;
        let raw = match self.waveform {
            Waveform::Sine => (2.0 * PI * phase).sin(),
            Waveform::Sawtooth => 2.0 * (phase - (0.5 + phase).floor()),
        };

        Some(raw * self.envelope(t))
    }
}

impl Source for Tone {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples - self.num_sample)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f32(
            self.total_samples as f32 / self.sample_rate as f32,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_terminates_after_its_duration() {
        let tone = Tone::new(1200.0, Waveform::Sine, Duration::from_millis(100));
        let samples: Vec<f32> = tone.collect();
        assert_eq!(samples.len(), 4410);
    }

    #[test]
    fn samples_stay_within_the_envelope_gain() {
        for waveform in [Waveform::Sine, Waveform::Sawtooth] {
            let tone = Tone::new(150.0, waveform, Duration::from_millis(150));
            assert!(tone.into_iter().all(|s| s.abs() <= PEAK_GAIN + f32::EPSILON));
        }
    }
}
