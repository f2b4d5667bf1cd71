// Weather-to-parameter mapping.
//
// Turns an optional `WeatherReading` into a `ParameterBundle`. Temperature is
// applied first and sets the register, tempo and articulation; the WMO
// condition code is applied second and wins for density and sustain.
//
// Each temperature band also carries a chance of suggesting a scale change
// (major -> minor when cold, minor -> major or lydian when warm). The mapper
// never mutates engine state: it returns the suggestion as
// `WeatherMapping::scale_nudge` and the mode machine decides whether the
// active style allows it.
//
// Malformed input never fails. Unknown condition codes skip the condition
// step and non-finite temperatures skip the temperature step.

use player_piano_protocol::{Scale, WeatherReading};
use rand::Rng;

use crate::params::{ParameterBundle, Span, chance};

/// Result of applying weather to a bundle.
#[derive(Clone, Debug, PartialEq)]
pub struct WeatherMapping {
    pub bundle: ParameterBundle,
    /// A scale the weather would like to move to, if any.
    pub scale_nudge: Option<Scale>,
}

/// Temperature bands, mutually exclusive. 10–25 °C is neutral.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemperatureBand {
    /// Below 0 °C.
    Freezing,
    /// 0 °C up to (not including) 10 °C.
    Cool,
    /// Above 25 °C up to 30 °C.
    Warm,
    /// Above 30 °C.
    Hot,
}

impl TemperatureBand {
    pub fn from_celsius(t: f64) -> Option<Self> {
        if !t.is_finite() {
            None
        } else if t < 0.0 {
            Some(TemperatureBand::Freezing)
        } else if t < 10.0 {
            Some(TemperatureBand::Cool)
        } else if t > 30.0 {
            Some(TemperatureBand::Hot)
        } else if t > 25.0 {
            Some(TemperatureBand::Warm)
        } else {
            None
        }
    }
}

/// WMO weather-condition families the mapper reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    Clear,
    Cloudy,
    Fog,
    Rain,
    Snow,
    Thunderstorm,
}

impl Condition {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 | 1 => Some(Condition::Clear),
            2 | 3 => Some(Condition::Cloudy),
            45 | 48 => Some(Condition::Fog),
            51 | 53 | 55 | 56 | 57 | 61 | 63 | 65 | 66 | 67 | 80 | 81 | 82 => Some(Condition::Rain),
            71 | 73 | 75 | 77 | 85 | 86 => Some(Condition::Snow),
            95 | 96 | 99 => Some(Condition::Thunderstorm),
            _ => None,
        }
    }
}

/// Map weather onto the default bundle.
pub fn map<R: Rng + ?Sized>(
    weather: Option<&WeatherReading>,
    current: Scale,
    rng: &mut R,
) -> WeatherMapping {
    apply(ParameterBundle::default(), weather, current, rng)
}

/// Apply weather on top of `base`. With no weather, `base` is returned
/// untouched.
pub fn apply<R: Rng + ?Sized>(
    base: ParameterBundle,
    weather: Option<&WeatherReading>,
    current: Scale,
    rng: &mut R,
) -> WeatherMapping {
    let Some(weather) = weather else {
        return WeatherMapping {
            bundle: base,
            scale_nudge: None,
        };
    };

    let mut bundle = base;
    let mut scale_nudge = None;

    if let Some(band) = TemperatureBand::from_celsius(weather.temperature) {
        let (from, to, p) = match band {
            TemperatureBand::Freezing => {
                bundle.tempo = 70;
                bundle.octaves = Span::new(1, 5);
                bundle.duration = Span::new(800, 3500);
                bundle.velocity = Span::new(40, 80);
                (Scale::Major, Scale::Minor, 0.6)
            }
            TemperatureBand::Cool => {
                bundle.tempo = 85;
                bundle.octaves = Span::new(2, 6);
                bundle.duration = Span::new(600, 3000);
                (Scale::Major, Scale::Minor, 0.4)
            }
            TemperatureBand::Warm => {
                bundle.tempo = 115;
                bundle.octaves = Span::new(3, 7);
                bundle.duration = Span::new(400, 2200);
                (Scale::Minor, Scale::Lydian, 0.4)
            }
            TemperatureBand::Hot => {
                bundle.tempo = 130;
                bundle.octaves = Span::new(3, 7);
                bundle.duration = Span::new(300, 1800);
                bundle.velocity = Span::new(70, 110);
                (Scale::Minor, Scale::Major, 0.6)
            }
        };
        // The trial is drawn even when `current` does not match.
        if chance(rng, p) && current == from {
            scale_nudge = Some(to);
        }
    }

    match Condition::from_code(weather.weather_code) {
        Some(Condition::Clear) => {
            bundle.density = 0.6;
            bundle.sustain_probability = 0.03;
        }
        Some(Condition::Cloudy) => {
            bundle.density = 0.7;
        }
        Some(Condition::Fog) => {
            bundle.density = 0.5;
            bundle.sustain_probability = 0.1;
            bundle.velocity = Span::new(40, 70);
        }
        Some(Condition::Rain) => {
            bundle.sustain_probability = 0.15;
            bundle.duration = Span::new(200, 1500);
            bundle.density = 0.8;
        }
        Some(Condition::Snow) => {
            bundle.tempo = bundle.tempo.saturating_sub(20).max(70);
            bundle.velocity = Span::new(30, 70);
            bundle.duration = Span::new(800, 3000);
        }
        Some(Condition::Thunderstorm) => {
            bundle.velocity = Span::new(40, 127);
            bundle.density = 0.9;
        }
        None => {}
    }

    WeatherMapping {
        bundle,
        scale_nudge,
    }
}
