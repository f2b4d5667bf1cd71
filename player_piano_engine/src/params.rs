// The per-tick parameter bundle.
//
// A `ParameterBundle` is recomputed from scratch on every tick (style base,
// then weather, then moods, then the style envelope) and never stored
// between ticks. Synthesizers read it to pick octaves, velocities and
// durations; the tick driver reads `density` and `silence`; the pedal
// controller reads `sustain_probability` and `pedals`.
//
// Every range is a `Span`, which normalizes on construction: inverted bounds
// are swapped and a collapsed range simply has `min == max`. Sampling a
// `Span` is therefore always well-defined.

use player_piano_protocol::{MAX_OCTAVE, PedalKind};
use rand::Rng;
use rand::distr::uniform::SampleUniform;
use serde::{Deserialize, Serialize};

/// Inclusive range with `min <= max` guaranteed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "RawSpan<T>",
    bound(deserialize = "T: Deserialize<'de> + PartialOrd + Copy")
)]
pub struct Span<T> {
    min: T,
    max: T,
}

#[derive(Deserialize)]
struct RawSpan<T> {
    min: T,
    max: T,
}

impl<T: PartialOrd + Copy> From<RawSpan<T>> for Span<T> {
    fn from(raw: RawSpan<T>) -> Self {
        Span::new(raw.min, raw.max)
    }
}

impl<T: PartialOrd + Copy> Span<T> {
    /// Build a span from two bounds in either order.
    pub fn new(a: T, b: T) -> Self {
        if b < a {
            Span { min: b, max: a }
        } else {
            Span { min: a, max: b }
        }
    }

    /// A single-value span.
    pub fn point(v: T) -> Self {
        Span { min: v, max: v }
    }

    pub fn min(&self) -> T {
        self.min
    }

    pub fn max(&self) -> T {
        self.max
    }

    pub fn contains(&self, v: T) -> bool {
        self.min <= v && v <= self.max
    }

    /// Clamp a single value into the span.
    pub fn clamp(&self, v: T) -> T {
        if v < self.min {
            self.min
        } else if v > self.max {
            self.max
        } else {
            v
        }
    }

    /// Restrict this span to `envelope`. Both bounds are clamped
    /// independently, so a span lying wholly outside the envelope collapses
    /// onto the nearest envelope bound.
    pub fn within(&self, envelope: &Span<T>) -> Span<T> {
        Span::new(envelope.clamp(self.min), envelope.clamp(self.max))
    }
}

impl<T: SampleUniform + PartialOrd + Copy> Span<T> {
    /// Uniform draw from `[min, max]`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
        rng.random_range(self.min..=self.max)
    }
}

/// Which pedals a style lets the pedal controller touch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PedalPalette {
    pub sustain: bool,
    pub sostenuto: bool,
    pub soft: bool,
}

impl PedalPalette {
    pub const ALL: PedalPalette = PedalPalette {
        sustain: true,
        sostenuto: true,
        soft: true,
    };

    pub const NONE: PedalPalette = PedalPalette {
        sustain: false,
        sostenuto: false,
        soft: false,
    };

    pub const SUSTAIN_AND_SOFT: PedalPalette = PedalPalette {
        sustain: true,
        sostenuto: false,
        soft: true,
    };

    pub fn allows(&self, kind: PedalKind) -> bool {
        match kind {
            PedalKind::Sustain => self.sustain,
            PedalKind::Sostenuto => self.sostenuto,
            PedalKind::Soft => self.soft,
        }
    }
}

/// Everything a tick needs to know about how to sound.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterBundle {
    /// Events per minute; informational for clients and MIDI export.
    pub tempo: u32,
    /// Probability in [0, 1] that a tick sounds rather than rests.
    pub density: f64,
    pub octaves: Span<u8>,
    pub velocity: Span<u8>,
    /// Note duration in milliseconds.
    pub duration: Span<u32>,
    /// Width of each pedal band; see `pedal.rs`.
    pub sustain_probability: f64,
    /// Duration band for `silence` events, in milliseconds.
    pub silence: Span<u32>,
    pub pedals: PedalPalette,
}

impl Default for ParameterBundle {
    /// The bundle used when no weather is known: tempo 100, density 0.7,
    /// octaves 1–7, velocity 60–100, durations 500–2500 ms, sustain 0.05,
    /// silences 100–600 ms.
    fn default() -> Self {
        Self {
            tempo: 100,
            density: 0.7,
            octaves: Span::new(1, 7),
            velocity: Span::new(60, 100),
            duration: Span::new(500, 2500),
            sustain_probability: 0.05,
            silence: Span::new(100, 600),
            pedals: PedalPalette::ALL,
        }
    }
}

impl ParameterBundle {
    /// Pull every field back into its legal range: probabilities into
    /// [0, 1] (NaN becomes 0), octaves capped at 8, velocities at 127,
    /// durations floored at 1 ms.
    pub fn sanitized(mut self) -> Self {
        self.density = unit(self.density);
        self.sustain_probability = unit(self.sustain_probability);
        self.octaves = self.octaves.within(&Span::new(0, MAX_OCTAVE));
        self.velocity = self.velocity.within(&Span::new(0, 127));
        self.duration = self.duration.within(&Span::new(1, u32::MAX));
        self.silence = self.silence.within(&Span::new(1, u32::MAX));
        self.tempo = self.tempo.max(1);
        self
    }
}

/// Clamp a probability into [0, 1]; NaN maps to 0.
pub fn unit(p: f64) -> f64 {
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}

/// A Bernoulli trial that tolerates any `p` (out-of-range values clamp).
pub fn chance<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    rng.random::<f64>() < unit(p)
}

/// Hard limits a style imposes on the final bundle.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    pub tempo: Span<u32>,
    pub density: Span<f64>,
    pub octaves: Span<u8>,
    pub velocity: Span<u8>,
    pub duration: Span<u32>,
    pub silence: Span<u32>,
}

impl Envelope {
    /// No restriction beyond the legal ranges.
    pub fn open() -> Self {
        Self {
            tempo: Span::new(1, u32::MAX),
            density: Span::new(0.0, 1.0),
            octaves: Span::new(0, MAX_OCTAVE),
            velocity: Span::new(0, 127),
            duration: Span::new(1, u32::MAX),
            silence: Span::new(1, u32::MAX),
        }
    }

    pub fn apply(&self, bundle: ParameterBundle) -> ParameterBundle {
        let bundle = bundle.sanitized();
        ParameterBundle {
            tempo: self.tempo.clamp(bundle.tempo),
            density: self.density.clamp(bundle.density),
            octaves: bundle.octaves.within(&self.octaves),
            velocity: bundle.velocity.within(&self.velocity),
            duration: bundle.duration.within(&self.duration),
            silence: bundle.silence.within(&self.silence),
            ..bundle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn span_normalizes_inverted_bounds() {
        let s = Span::new(7u8, 2);
        assert_eq!((s.min(), s.max()), (2, 7));
        let p = Span::point(4u32);
        assert_eq!((p.min(), p.max()), (4, 4));
    }

    #[test]
    fn span_deserializes_normalized() {
        let s: Span<u64> = serde_json::from_str(r#"{"min":30000,"max":15000}"#).unwrap();
        assert_eq!((s.min(), s.max()), (15_000, 30_000));
    }

    #[test]
    fn within_envelope() {
        let env = Span::new(3u8, 6);
        assert_eq!(Span::new(1u8, 5).within(&env), Span::new(3, 5));
        assert_eq!(Span::new(1u8, 2).within(&env), Span::point(3));
        assert_eq!(Span::new(7u8, 8).within(&env), Span::point(6));
    }

    #[test]
    fn sampling_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(9);
        let s = Span::new(50u32, 150);
        for _ in 0..500 {
            assert!(s.contains(s.sample(&mut rng)));
        }
        assert_eq!(Span::point(12u8).sample(&mut rng), 12);
    }

    #[test]
    fn sanitize_repairs_garbage() {
        let b = ParameterBundle {
            density: f64::NAN,
            sustain_probability: 4.0,
            octaves: Span::new(2, 12),
            duration: Span::new(0, 0),
            ..ParameterBundle::default()
        }
        .sanitized();
        assert_eq!(b.density, 0.0);
        assert_eq!(b.sustain_probability, 1.0);
        assert_eq!(b.octaves, Span::new(2, 8));
        assert_eq!(b.duration, Span::point(1));
    }

    #[test]
    fn chance_tolerates_out_of_range() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(!chance(&mut rng, -1.0));
        assert!(chance(&mut rng, 2.0));
        assert!(!chance(&mut rng, f64::NAN));
    }
}
