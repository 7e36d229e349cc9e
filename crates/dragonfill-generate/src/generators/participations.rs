use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use rand::seq::{IndexedRandom, index};

use dragonfill_core::{BusinessConfig, Money};

use crate::calendar::Calendar;
use crate::errors::GenerationError;
use crate::generators::tournaments::Tournament;

/// One bracket seat taken by a customer.
#[derive(Debug, Clone, PartialEq)]
pub struct Participation {
    pub particip_id: usize,
    pub tournament_id: usize,
    pub pool_customer: u32,
    pub place: u32,
    pub sign_up_date: NaiveDateTime,
    pub fee: Money,
}

impl Participation {
    pub fn invoice_code(&self) -> String {
        format!("P{}", self.particip_id)
    }
}

pub fn generate_participations<R: Rng + ?Sized>(
    config: &BusinessConfig,
    calendar: &Calendar,
    tournaments: &[Tournament],
    rng: &mut R,
) -> Result<Vec<Participation>, GenerationError> {
    let pool = config.customers.customers_number as usize;
    let window = Duration::days(config.tournaments.sign_up_window_days);
    let mut participations = Vec::new();

    for tournament in tournaments {
        let seats = tournament.participants() as usize;
        if seats > pool {
            return Err(GenerationError::invariant(format!(
                "tournament {} needs {seats} participants but the customer pool has {pool}",
                tournament.tournament_id
            )));
        }

        let deadline = tournament.sign_up_deadline.date();
        let sign_up_days = calendar.days_between(deadline - window, deadline);
        if sign_up_days.is_empty() {
            return Err(GenerationError::invariant(format!(
                "no business day to sign up for tournament {} before {deadline}",
                tournament.tournament_id
            )));
        }

        let customers = index::sample(rng, pool, seats);
        for (place, customer) in customers.into_iter().enumerate() {
            let day = sign_up_days
                .choose(rng)
                .map_or(deadline, |day| day.date);
            participations.push(Participation {
                particip_id: 0,
                tournament_id: tournament.tournament_id,
                pool_customer: customer as u32 + 1,
                place: place as u32 + 1,
                sign_up_date: calendar.office_time(rng, day),
                fee: tournament.fee,
            });
        }
    }

    participations.sort_by_key(|participation| participation.sign_up_date);
    for (idx, participation) in participations.iter_mut().enumerate() {
        participation.particip_id = idx + 1;
    }
    Ok(participations)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::NaiveDate;
    use dragonfill_core::HolidayCalendar;

    use super::*;
    use crate::sampling::stage_rng;

    fn tournament(depth: u32, seats: u32, day: NaiveDate) -> Tournament {
        let start = day.and_hms_opt(16, 0, 0).expect("time");
        Tournament {
            tournament_id: 1,
            name: "Abstract Masters".into(),
            game: "Go".into(),
            start_time: start,
            depth,
            matches: crate::generators::tournaments::matches(depth),
            seats,
            fee: Money::from_f64(20.0),
            sign_up_deadline: (day - Duration::days(2)).and_hms_opt(0, 0, 0).expect("time"),
            staff_id: 1,
            expenses: Money::from_f64(150.0),
            updated_at: start,
        }
    }

    fn setup() -> (BusinessConfig, Calendar) {
        let mut config = BusinessConfig::default();
        config.shop.lifetime_days = Some(60);
        config.shop.holidays = HolidayCalendar::None;
        let calendar = Calendar::build(&config, &mut stage_rng(1, "calendar")).expect("calendar");
        (config, calendar)
    }

    #[test]
    fn bracket_is_filled_by_distinct_customers() {
        let (config, calendar) = setup();
        let event = calendar.last_day() - Duration::days(3);
        let tournaments = [tournament(2, 4, event)];

        let rows = generate_participations(&config, &calendar, &tournaments, &mut stage_rng(1, "p"))
            .expect("participations");

        assert_eq!(rows.len(), 16);
        let customers: BTreeSet<u32> = rows.iter().map(|row| row.pool_customer).collect();
        assert_eq!(customers.len(), 16);
        let places: BTreeSet<u32> = rows.iter().map(|row| row.place).collect();
        assert_eq!(places, (1..=16).collect());
        let deadline = tournaments[0].sign_up_deadline;
        for row in &rows {
            assert!(row.sign_up_date.date() < deadline.date());
            assert!(row.sign_up_date.date() > deadline.date() - Duration::days(14));
        }
    }

    #[test]
    fn bracket_larger_than_pool_is_rejected() {
        let (mut config, calendar) = setup();
        config.customers.customers_number = 10;
        let tournaments = [tournament(2, 4, calendar.last_day())];
        let err = generate_participations(&config, &calendar, &tournaments, &mut stage_rng(1, "p"))
            .expect_err("pool too small");
        assert!(err.to_string().contains("customer pool"));
    }
}
