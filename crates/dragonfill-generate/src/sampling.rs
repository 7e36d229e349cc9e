//! Seeded random streams and the distributions the generators draw from.

use std::f64::consts::PI;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use dragonfill_core::BoundedNormal;

use crate::errors::GenerationError;

/// Derive a stage seed from the run seed.
pub fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Independent random stream for one generation stage.
pub fn stage_rng(seed: u64, stage: &str) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(hash_seed(seed, stage))
}

/// Continuous distributions on top of any [`Rng`].
pub trait Distributions: Rng {
    /// Uniform in `(0, 1]`, safe to take the logarithm of.
    fn open_unit(&mut self) -> f64 {
        1.0 - self.random::<f64>()
    }

    /// Box-Muller normal draw.
    fn normal(&mut self, mean: f64, std: f64) -> f64 {
        let u1 = self.open_unit();
        let u2 = self.random::<f64>();
        mean + std * (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    fn exponential(&mut self, scale: f64) -> f64 {
        -self.open_unit().ln() * scale
    }

    /// Marsaglia-Tsang gamma draw.
    fn gamma(&mut self, shape: f64, scale: f64) -> f64 {
        if shape < 1.0 {
            let boost = self.open_unit().powf(1.0 / shape);
            return self.gamma(shape + 1.0, scale) * boost;
        }

        let d = shape - 1.0 / 3.0;
        let c = 1.0 / (9.0 * d).sqrt();
        loop {
            let x = self.normal(0.0, 1.0);
            let v = (1.0 + c * x).powi(3);
            if v <= 0.0 {
                continue;
            }
            let u = self.open_unit();
            if u.ln() < 0.5 * x * x + d - d * v + d * v.ln() {
                return d * v * scale;
            }
        }
    }

    /// Normal draw floored at the configured minimum.
    fn bounded_normal(&mut self, params: &BoundedNormal) -> f64 {
        self.normal(params.mean, params.std).max(params.min)
    }

    /// A random minute and second within the given hour.
    fn time_in_hour(&mut self, hour: u32) -> NaiveTime {
        let minute = self.random_range(0..60);
        let second = self.random_range(0..60);
        NaiveTime::from_hms_opt(hour, minute, second).unwrap_or(NaiveTime::MIN)
    }

    /// A random time of day between `open` (inclusive) and `close` (exclusive).
    fn time_between(&mut self, open: u32, close: u32) -> NaiveTime {
        let hour = self.random_range(open..close.max(open + 1));
        self.time_in_hour(hour)
    }

    fn moment_on(&mut self, date: NaiveDate, open: u32, close: u32) -> NaiveDateTime {
        date.and_time(self.time_between(open, close))
    }

    /// Uniform date in `[from, to]`.
    fn date_between(&mut self, from: NaiveDate, to: NaiveDate) -> NaiveDate {
        let span = (to - from).num_days().max(0);
        from + Duration::days(self.random_range(0..=span))
    }
}

impl<R: Rng + ?Sized> Distributions for R {}

/// Weighted choice over a fixed set of items.
#[derive(Debug, Clone)]
pub struct WeightedChoice<T> {
    items: Vec<T>,
    index: WeightedIndex<f64>,
}

impl<T> WeightedChoice<T> {
    pub fn new(items: Vec<T>, weights: &[f64], label: &str) -> Result<Self, GenerationError> {
        if items.len() != weights.len() {
            return Err(GenerationError::Invariant(format!(
                "{label}: {} items but {} weights",
                items.len(),
                weights.len()
            )));
        }
        let index = WeightedIndex::new(weights.iter().copied()).map_err(|err| {
            GenerationError::Invariant(format!("{label}: invalid weights ({err})"))
        })?;
        Ok(Self { items, index })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &T {
        &self.items[self.index.sample(rng)]
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }
}

/// Normalize non-negative weights to a probability vector.
pub fn normalize(weights: &[f64]) -> Option<Vec<f64>> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }
    Some(weights.iter().map(|weight| weight / total).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_streams_are_independent_and_reproducible() {
        let a1: u64 = stage_rng(7, "sales").random();
        let a2: u64 = stage_rng(7, "sales").random();
        let b: u64 = stage_rng(7, "rentals").random();
        assert_eq!(a1, a2);
        assert_ne!(a1, b);
    }

    #[test]
    fn sample_means_track_parameters() {
        let mut rng = stage_rng(11, "moments");
        let n = 20_000;
        let normal: f64 = (0..n).map(|_| rng.normal(5.0, 2.0)).sum::<f64>() / n as f64;
        let exp: f64 = (0..n).map(|_| rng.exponential(3.0)).sum::<f64>() / n as f64;
        let gamma: f64 = (0..n).map(|_| rng.gamma(2.0, 1.5)).sum::<f64>() / n as f64;
        let small_gamma: f64 = (0..n).map(|_| rng.gamma(0.5, 2.0)).sum::<f64>() / n as f64;

        assert!((normal - 5.0).abs() < 0.1, "normal mean {normal}");
        assert!((exp - 3.0).abs() < 0.15, "exp mean {exp}");
        assert!((gamma - 3.0).abs() < 0.15, "gamma mean {gamma}");
        assert!((small_gamma - 1.0).abs() < 0.1, "gamma mean {small_gamma}");
    }

    #[test]
    fn bounded_normal_respects_floor() {
        let mut rng = stage_rng(3, "bounded");
        let params = BoundedNormal {
            mean: 10.0,
            std: 50.0,
            min: 5.0,
        };
        assert!((0..1000).all(|_| rng.bounded_normal(&params) >= 5.0));
    }

    #[test]
    fn times_stay_inside_the_window() {
        let mut rng = stage_rng(5, "times");
        for _ in 0..500 {
            let time = rng.time_between(9, 17);
            assert!((9..17).contains(&chrono::Timelike::hour(&time)));
        }
    }

    #[test]
    fn weighted_choice_rejects_mismatched_lengths() {
        assert!(WeightedChoice::new(vec!["a", "b"], &[1.0], "test").is_err());
        assert!(WeightedChoice::new(vec!["a"], &[0.0], "test").is_err());
    }
}
