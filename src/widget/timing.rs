//! Beat-synchronized animation timing for the equalizer bars.

use rand::rngs::StdRng;
use rand::Rng;

use super::palette::{ColorPalette, Rgb};

/// Used when the tempo is unknown or unusable (120 BPM).
pub const DEFAULT_BEAT_DURATION_MS: u32 = 500;
/// Used when the energy is unknown or unusable.
pub const DEFAULT_ENERGY: f64 = 0.5;

/// Milliseconds per beat. Never divides by zero.
pub fn beat_duration_ms(tempo: f64) -> u32 {
    if !tempo.is_finite() || tempo <= 0.0 {
        return DEFAULT_BEAT_DURATION_MS;
    }
    // `as` saturates for absurdly slow tempos.
    (60_000.0 / tempo).round().max(1.0) as u32
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingConfig {
    /// Per-bar random scale applied to the beat, inclusive range.
    pub variance_min: f64,
    pub variance_max: f64,
    /// Fraction of a beat the pulse delays are spread over.
    pub pulse_delay_fraction: f64,
    pub min_pulse_ms: u32,
    pub max_pulse_ms: u32,
    /// Length of one full color sweep across the bar row.
    pub wave_duration_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            variance_min: 0.9,
            variance_max: 1.1,
            pulse_delay_fraction: 0.5,
            min_pulse_ms: 200,
            max_pulse_ms: 1500,
            wave_duration_ms: 45_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarTiming {
    pub pulse_duration_ms: u32,
    pub pulse_delay_ms: u32,
    pub wave_delay_ms: u32,
}

/// A cyclic color animation: the stops end with the first color again so
/// the loop has no seam.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorCycle {
    pub stops: Vec<Rgb>,
    pub duration_ms: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSchedule {
    pub beat_duration_ms: u32,
    pub energy: f64,
    pub bars: Vec<BarTiming>,
    pub color_cycle: ColorCycle,
}

fn sanitize_energy(energy: f64) -> f64 {
    if energy.is_finite() {
        energy.clamp(0.0, 1.0)
    } else {
        DEFAULT_ENERGY
    }
}

/// Pulse length for one bar, before the random draw is known.
pub fn pulse_duration_ms(beat_ms: u32, variance: f64, energy: f64, config: &TimingConfig) -> u32 {
    let energy_factor = 0.5 + 0.5 * sanitize_energy(energy);
    let raw = (beat_ms as f64 * variance * (2.0 - energy_factor)).trunc();
    let raw = if raw.is_finite() { raw.max(0.0) } else { 0.0 };
    (raw as u32).clamp(config.min_pulse_ms, config.max_pulse_ms)
}

/// Builds the per-bar schedule. `rng` supplies the per-bar variance draws,
/// so a seeded generator reproduces the exact schedule.
pub fn synthesize(
    bar_count: usize,
    tempo: f64,
    energy: f64,
    palette: &ColorPalette,
    config: &TimingConfig,
    rng: &mut StdRng,
) -> AnimationSchedule {
    let beat_ms = beat_duration_ms(tempo);
    let energy = sanitize_energy(energy);
    let (low, high) = if config.variance_min <= config.variance_max {
        (config.variance_min, config.variance_max)
    } else {
        (config.variance_max, config.variance_min)
    };

    let bars = (1..=bar_count)
        .map(|i| {
            let position = i as f64 / bar_count as f64;
            let variance = rng.random_range(low..=high);
            BarTiming {
                pulse_duration_ms: pulse_duration_ms(beat_ms, variance, energy, config),
                pulse_delay_ms: (position * beat_ms as f64 * config.pulse_delay_fraction) as u32,
                wave_delay_ms: ((i - 1) as f64 / bar_count as f64 * config.wave_duration_ms as f64)
                    as u32,
            }
        })
        .collect();

    let mut stops = palette.colors().to_vec();
    stops.push(palette.first());

    AnimationSchedule {
        beat_duration_ms: beat_ms,
        energy,
        bars,
        color_cycle: ColorCycle {
            stops,
            duration_ms: config.wave_duration_ms,
        },
    }
}
