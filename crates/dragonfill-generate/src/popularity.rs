use rand::Rng;

use dragonfill_core::GameEntry;

use crate::errors::GenerationError;
use crate::sampling::{WeightedChoice, normalize};

/// Popularity weights over a set of games.
///
/// Games are ranked by `popularity_rank` (ties keep catalog order) and weighted
/// by `exp(-x)` for `x` evenly spaced over `[0, 2]`.
#[derive(Debug, Clone)]
pub struct Popularity {
    choice: WeightedChoice<String>,
    weights: Vec<f64>,
}

impl Popularity {
    pub fn new<'a, I>(games: I) -> Result<Self, GenerationError>
    where
        I: IntoIterator<Item = &'a GameEntry>,
    {
        let mut ranked: Vec<&GameEntry> = games.into_iter().collect();
        if ranked.is_empty() {
            return Err(GenerationError::invariant("no games to rank by popularity"));
        }
        ranked.sort_by_key(|game| game.popularity_rank);

        let raw = decay_weights(ranked.len());
        let weights = normalize(&raw)
            .ok_or_else(|| GenerationError::invariant("popularity weights sum to zero"))?;
        let names = ranked.iter().map(|game| game.name.clone()).collect();
        Ok(Self {
            choice: WeightedChoice::new(names, &weights, "game popularity")?,
            weights,
        })
    }

    pub fn games(&self) -> &[String] {
        self.choice.items()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        self.choice.sample(rng)
    }

    /// Split `total` units across games proportionally to popularity.
    pub fn distribute(&self, total: f64) -> Vec<(String, u32)> {
        self.games()
            .iter()
            .zip(&self.weights)
            .map(|(game, weight)| (game.clone(), (weight * total).round().max(0.0) as u32))
            .collect()
    }
}

fn decay_weights(n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![1.0];
    }
    let step = 2.0 / (n - 1) as f64;
    (0..n).map(|i| (-(i as f64) * step).exp()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(name: &str, rank: u32) -> GameEntry {
        GameEntry {
            name: name.to_string(),
            description: None,
            category: "family".to_string(),
            game_type: "board".to_string(),
            tournament: false,
            price: 100.0,
            participants_number: 2,
            popularity_rank: rank,
        }
    }

    #[test]
    fn lower_rank_is_more_popular() {
        let games = [game("b", 2), game("a", 1), game("c", 3)];
        let popularity = Popularity::new(&games).expect("popularity");
        assert_eq!(popularity.games(), ["a", "b", "c"]);
        assert!(popularity.weights()[0] > popularity.weights()[2]);
        let total: f64 = popularity.weights().iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        let ratio = popularity.weights()[0] / popularity.weights()[2];
        assert!((ratio - 2f64.exp()).abs() < 1e-9);
    }

    #[test]
    fn distribute_rounds_each_share() {
        let games = [game("a", 1)];
        let popularity = Popularity::new(&games).expect("popularity");
        assert_eq!(popularity.distribute(7.4), vec![("a".to_string(), 7)]);
    }

    #[test]
    fn empty_set_is_rejected() {
        let games: [GameEntry; 0] = [];
        assert!(Popularity::new(&games).is_err());
    }
}
