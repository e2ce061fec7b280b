use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DAYTIME_CUTOFF: f64 = 0.85;
const NIGHTTIME_CUTOFF: f64 = 0.95;

/// Usage regime a synthetic sample is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowBand {
    DaytimeNormal,
    NighttimeLow,
    LeakCondition,
}

impl FlowBand {
    pub fn select(draw: f64) -> Self {
        if draw < DAYTIME_CUTOFF {
            Self::DaytimeNormal
        } else if draw < NIGHTTIME_CUTOFF {
            Self::NighttimeLow
        } else {
            Self::LeakCondition
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DaytimeNormal => "daytime_normal",
            Self::NighttimeLow => "nighttime_low",
            Self::LeakCondition => "leak_condition",
        }
    }

    /// Half-open litres/minute range `[low, high)` of the band.
    pub fn range(self) -> (f64, f64) {
        match self {
            Self::DaytimeNormal => (0.0, 15.0),
            Self::NighttimeLow => (0.0, 3.0),
            Self::LeakCondition => (25.0, 40.0),
        }
    }

    pub fn value_at(self, draw: f64) -> f64 {
        let (low, high) = self.range();
        let value = low + draw.clamp(0.0, 1.0) * (high - low);
        // draw == 1.0 can only come from a clamp; keep the range half-open.
        if value >= high {
            f64::from_bits(high.to_bits() - 1)
        } else {
            value
        }
    }
}

/// Source of uniform draws in `[0, 1)`.
pub trait Draws: Send {
    fn next_draw(&mut self) -> f64;
}

pub struct RandomDraws {
    rng: StdRng,
}

impl RandomDraws {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Draws for RandomDraws {
    fn next_draw(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a fixed sequence of draws, cycling when it runs out. An empty script yields 0.0.
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct ScriptedDraws {
    script: Vec<f64>,
    cursor: usize,
}

#[cfg(test)]
impl ScriptedDraws {
    pub(crate) fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        Self {
            script: draws.into_iter().collect(),
            cursor: 0,
        }
    }
}

#[cfg(test)]
impl Draws for ScriptedDraws {
    fn next_draw(&mut self) -> f64 {
        if self.script.is_empty() {
            return 0.0;
        }
        let draw = self.script[self.cursor % self.script.len()];
        self.cursor += 1;
        draw
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowSample {
    pub band: FlowBand,
    pub litres_per_minute: f64,
}

pub struct FlowSimulator {
    draws: Box<dyn Draws>,
}

impl FlowSimulator {
    pub fn new(draws: Box<dyn Draws>) -> Self {
        Self { draws }
    }

    /// Consumes two draws: the band draw, then the value draw.
    pub fn next_sample(&mut self) -> FlowSample {
        let band = FlowBand::select(self.draws.next_draw());
        let litres_per_minute = band.value_at(self.draws.next_draw());
        FlowSample {
            band,
            litres_per_minute,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_range(band: FlowBand, value: f64) -> bool {
        let (low, high) = band.range();
        value >= low && value < high
    }

    #[test]
    fn band_selection_follows_cutoffs() {
        assert_eq!(FlowBand::select(0.0), FlowBand::DaytimeNormal);
        assert_eq!(FlowBand::select(0.849_999), FlowBand::DaytimeNormal);
        assert_eq!(FlowBand::select(0.85), FlowBand::NighttimeLow);
        assert_eq!(FlowBand::select(0.949_999), FlowBand::NighttimeLow);
        assert_eq!(FlowBand::select(0.95), FlowBand::LeakCondition);
        assert_eq!(FlowBand::select(0.999_999), FlowBand::LeakCondition);
    }

    #[test]
    fn band_values_stay_inside_their_ranges() {
        let draws = [0.0, 0.1, 0.25, 0.5, 0.75, 0.999_999_9, 1.0];
        for band in [
            FlowBand::DaytimeNormal,
            FlowBand::NighttimeLow,
            FlowBand::LeakCondition,
        ] {
            for draw in draws {
                let value = band.value_at(draw);
                assert!(in_range(band, value), "{band:?} draw={draw} value={value}");
            }
        }
    }

    #[test]
    fn random_samples_match_their_band() {
        let mut sim = FlowSimulator::new(Box::new(RandomDraws::seeded(7)));
        for _ in 0..10_000 {
            let sample = sim.next_sample();
            assert!(in_range(sample.band, sample.litres_per_minute));
        }
    }

    #[test]
    fn scripted_draws_feed_band_then_value() {
        let mut sim = FlowSimulator::new(Box::new(ScriptedDraws::new([0.99, 0.5, 0.1, 0.2])));
        let first = sim.next_sample();
        assert_eq!(first.band, FlowBand::LeakCondition);
        assert!((first.litres_per_minute - 32.5).abs() < 1e-9);

        let second = sim.next_sample();
        assert_eq!(second.band, FlowBand::DaytimeNormal);
        assert!((second.litres_per_minute - 3.0).abs() < 1e-9);
    }
}
