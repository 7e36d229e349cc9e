//! Rental visits, returns and late penalties.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rand::Rng;
use tracing::debug;

use dragonfill_core::{BusinessConfig, Destination, Money, UnmatchedRentalPolicy};

use crate::calendar::Calendar;
use crate::errors::GenerationError;
use crate::generators::inventory::Inventory;
use crate::generators::staff::ShiftGrid;
use crate::popularity::Popularity;
use crate::sampling::Distributions;

#[derive(Debug, Clone, PartialEq)]
pub struct Rental {
    pub rental_id: usize,
    pub unit: usize,
    /// Id in the mock customer pool, resolved once customers exist.
    pub pool_customer: u32,
    pub rental_date: NaiveDateTime,
    /// None while the game is still out.
    pub return_date: Option<NaiveDateTime>,
    pub staff_id: usize,
    pub price: Money,
    pub penalty: Option<Money>,
    pub rate: u8,
    pub day: usize,
    pub visit: usize,
    pub updated_at: NaiveDateTime,
}

impl Rental {
    pub fn invoice_code(&self) -> String {
        format!("R{}_{}", self.day, self.visit)
    }

    pub fn penalty_code(&self) -> String {
        format!("RP{}_{}", self.day, self.visit)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RentalOutcome {
    pub rentals: Vec<Rental>,
    /// Visits that found no free copy of the requested game.
    pub unmatched: u64,
    pub open: u64,
}

/// Fold a return moment into business hours and never before the rental.
///
/// The date and hour come from `candidate`; minute and second are kept.
pub fn clamp_return(
    rental: NaiveDateTime,
    candidate: NaiveDateTime,
    open: u32,
    close: u32,
) -> NaiveDateTime {
    let mut hour = candidate.hour();
    if candidate.date() == rental.date() && hour < rental.hour() {
        hour = open;
    }
    if hour < open {
        hour = open;
    }
    if hour >= close {
        hour = close.saturating_sub(1).max(open);
    }
    let time = NaiveTime::from_hms_opt(hour, candidate.minute(), candidate.second())
        .unwrap_or(NaiveTime::MIN);
    candidate.date().and_time(time).max(rental)
}

/// Penalty for a return `days` after the rental, if past the grace window.
pub fn penalty(price: Money, ratio: f64, allowed_days: i64, days: i64) -> Option<Money> {
    (days > allowed_days).then(|| price.scale(ratio * days as f64))
}

fn scheduled_return<R: Rng + ?Sized>(
    rng: &mut R,
    day: NaiveDate,
    holding_days: f64,
) -> NaiveDateTime {
    let whole = holding_days.floor();
    let seconds = ((holding_days - whole) * 86_400.0).round() as i64;
    let base = day.and_time(NaiveTime::MIN)
        + Duration::days(whole as i64)
        + Duration::seconds(seconds);
    base.date().and_time(rng.time_in_hour(base.hour()))
}

pub fn generate_rentals<R: Rng + ?Sized>(
    config: &BusinessConfig,
    calendar: &Calendar,
    grid: &ShiftGrid,
    popularity: &Popularity,
    inventory: &mut Inventory,
    rng: &mut R,
) -> Result<RentalOutcome, GenerationError> {
    let rental = &config.rental;
    let now = calendar.now();

    let mut by_game: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for idx in inventory.positions(Destination::Rent) {
        by_game
            .entry(inventory.unit(idx).game.as_str())
            .or_default()
            .push(idx);
    }
    let by_game: BTreeMap<String, Vec<usize>> = by_game
        .into_iter()
        .map(|(game, units)| (game.to_string(), units))
        .collect();
    let mut out_until: BTreeMap<usize, NaiveDateTime> = BTreeMap::new();

    let mut outcome = RentalOutcome::default();
    for (day_idx, day) in calendar.days().iter().enumerate() {
        for visit_idx in 0..day.volume_rental as usize {
            let (day_no, visit_no) = (day_idx + 1, visit_idx + 1);
            let at = calendar.visit_time(rng, day.date);
            let game = popularity.sample(rng).to_string();
            let staff_id = grid.on_duty(rng, at)?;
            let holding = rng.gamma(rental.holding_time.shape, rental.holding_time.scale);
            let candidate = scheduled_return(rng, day.date, holding);
            let returned = clamp_return(at, candidate, calendar.open(), calendar.close());

            let found = by_game.get(&game).and_then(|units| {
                units.iter().copied().find(|idx| {
                    let unit = inventory.unit(*idx);
                    unit.active
                        && unit.delivery < at
                        && out_until.get(idx).is_none_or(|until| *until <= at)
                })
            });
            let Some(unit) = found else {
                match rental.unmatched {
                    UnmatchedRentalPolicy::Drop => {
                        debug!(
                            day = day_no,
                            visit = visit_no,
                            game = %game,
                            "rental visit unmatched"
                        );
                        outcome.unmatched += 1;
                        continue;
                    }
                    UnmatchedRentalPolicy::Fail => {
                        return Err(GenerationError::invariant(format!(
                            "no free rental copy of '{game}' at {at}"
                        )));
                    }
                }
            };

            let price = inventory.unit(unit).price.ok_or_else(|| {
                GenerationError::invariant(format!("rental unit {} has no price", unit + 1))
            })?;
            let pool_customer = rng.random_range(1..=config.customers.customers_number);
            let rate = rng.random_range(1..=10u8);

            let record = if returned > now {
                inventory.deactivate(unit);
                outcome.open += 1;
                Rental {
                    rental_id: 0,
                    unit,
                    pool_customer,
                    rental_date: at,
                    return_date: None,
                    staff_id,
                    price,
                    penalty: None,
                    rate,
                    day: day_no,
                    visit: visit_no,
                    updated_at: at,
                }
            } else {
                out_until.insert(unit, returned);
                let days = (returned - at).num_days();
                Rental {
                    rental_id: 0,
                    unit,
                    pool_customer,
                    rental_date: at,
                    return_date: Some(returned),
                    staff_id,
                    price,
                    penalty: penalty(price, rental.penalty_ratio, rental.allowed_days, days),
                    rate,
                    day: day_no,
                    visit: visit_no,
                    updated_at: returned,
                }
            };
            outcome.rentals.push(record);
        }
    }

    outcome.rentals.sort_by_key(|rental| rental.updated_at);
    for (idx, rental) in outcome.rentals.iter_mut().enumerate() {
        rental.rental_id = idx + 1;
    }
    Ok(outcome)
}
