//! Tournament schedule and bracket sizing.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use rand::Rng;
use rand::seq::SliceRandom;

use dragonfill_core::{BusinessConfig, Money, ReferenceCatalogs, TournamentPairing};

use crate::calendar::Calendar;
use crate::errors::GenerationError;
use crate::generators::staff::ShiftGrid;
use crate::sampling::Distributions;

#[derive(Debug, Clone, PartialEq)]
pub struct Tournament {
    pub tournament_id: usize,
    pub name: String,
    pub game: String,
    pub start_time: NaiveDateTime,
    pub depth: u32,
    pub matches: u32,
    /// Seats taken by one participant group.
    pub seats: u32,
    pub fee: Money,
    pub sign_up_deadline: NaiveDateTime,
    pub staff_id: usize,
    pub expenses: Money,
    pub updated_at: NaiveDateTime,
}

impl Tournament {
    pub fn participants(&self) -> u32 {
        participants(self.seats, self.depth)
    }

    pub fn invoice_code(&self) -> String {
        format!("T{}", self.tournament_id)
    }
}

/// Games played in a single-elimination bracket of the given depth.
pub fn matches(depth: u32) -> u32 {
    (1u32 << (depth + 1)) - 1
}

pub fn participants(seats: u32, depth: u32) -> u32 {
    seats << depth
}

/// Hands out (game, tournament) pairs without replacement, reshuffling once
/// every pair has been used.
struct PairingDeck {
    all: Vec<TournamentPairing>,
    remaining: Vec<TournamentPairing>,
}

impl PairingDeck {
    fn new(all: Vec<TournamentPairing>) -> Result<Self, GenerationError> {
        if all.is_empty() {
            return Err(GenerationError::invariant(
                "no tournament-eligible game matches a tournament type",
            ));
        }
        Ok(Self {
            all,
            remaining: Vec::new(),
        })
    }

    fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> TournamentPairing {
        if self.remaining.is_empty() {
            self.remaining = self.all.clone();
            self.remaining.shuffle(rng);
        }
        // Refilled above from a non-empty deck.
        self.remaining.pop().unwrap_or_else(|| self.all[0].clone())
    }
}

pub fn generate_tournaments<R: Rng + ?Sized>(
    config: &BusinessConfig,
    catalogs: &ReferenceCatalogs,
    calendar: &Calendar,
    grid: &ShiftGrid,
    rng: &mut R,
) -> Result<Vec<Tournament>, GenerationError> {
    let params = &config.tournaments;
    let mut deck = PairingDeck::new(catalogs.tournament_pairings())?;
    let start_hour = NaiveTime::from_hms_opt(params.hour, 0, 0).unwrap_or(NaiveTime::MIN);

    let event_days = calendar
        .days()
        .iter()
        .filter(|day| day.weekday == params.weekday)
        .skip(params.start_offset_weeks as usize)
        .step_by(params.period_weeks.max(1) as usize);

    let mut tournaments = Vec::new();
    for day in event_days {
        let pairing = deck.draw(rng);
        let depth = rng.random_range(params.min_depth..=params.max_depth);
        let start_time = day.date.and_time(start_hour);
        let staff_id = grid.available_from(rng, day.date, params.hour)?;
        let expenses =
            params.expenses.mean + rng.gamma(params.expenses.shape, params.expenses.scale);
        let sign_up_deadline =
            (day.date - Duration::days(params.deadline_offset_days)).and_time(NaiveTime::MIN);

        tournaments.push(Tournament {
            tournament_id: tournaments.len() + 1,
            name: pairing.tournament,
            game: pairing.game,
            start_time,
            depth,
            matches: matches(depth),
            seats: pairing.participants_number,
            fee: Money::from_f64(params.fee),
            sign_up_deadline,
            staff_id,
            expenses: Money::from_f64(expenses),
            updated_at: start_time,
        });
    }

    Ok(tournaments)
}

/// Deepest bracket ever run for each game.
pub fn max_depth_per_game(tournaments: &[Tournament]) -> BTreeMap<String, u32> {
    let mut depths = BTreeMap::new();
    for tournament in tournaments {
        let depth = depths.entry(tournament.game.clone()).or_insert(0);
        *depth = (*depth).max(tournament.depth);
    }
    depths
}
