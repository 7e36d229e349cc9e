//! Business calendar and visitor demand curves.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rand::Rng;

use dragonfill_core::BusinessConfig;

use crate::errors::GenerationError;
use crate::holidays::Holidays;
use crate::sampling::{Distributions, WeightedChoice, normalize};

/// One day the shop is open, with its projected traffic.
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessDay {
    pub date: NaiveDate,
    /// 0 = Monday.
    pub weekday: u32,
    pub volume_base: f64,
    pub volume_sales: u32,
    pub volume_rental: u32,
}

/// Probability of a visit starting in each opening hour.
#[derive(Debug, Clone)]
pub struct HourlyCurve {
    probabilities: Vec<f64>,
    choice: WeightedChoice<u32>,
}

impl HourlyCurve {
    /// Rising exponential steps until the peak, falling ones after it.
    pub fn build<R: Rng + ?Sized>(
        rng: &mut R,
        open: u32,
        close: u32,
        peak: u32,
        decrease_magnitude: f64,
    ) -> Result<Self, GenerationError> {
        let hours: Vec<u32> = (open..close).collect();
        let mut rising = 0.0;
        let mut falling = 0.0;
        let mut traffic = Vec::with_capacity(hours.len());
        for hour in &hours {
            rising += rng.exponential(1.0);
            if *hour > peak {
                falling += rng.exponential(decrease_magnitude);
            }
            traffic.push((rising - falling).max(0.0));
        }

        let probabilities = normalize(&traffic).ok_or_else(|| {
            GenerationError::invariant("intraday traffic curve collapsed to zero")
        })?;
        let choice = WeightedChoice::new(hours, &probabilities, "hourly traffic")?;
        Ok(Self {
            probabilities,
            choice,
        })
    }

    pub fn hours(&self) -> &[u32] {
        self.choice.items()
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn sample_hour<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        *self.choice.sample(rng)
    }
}

/// Active business days of the whole run.
#[derive(Debug, Clone)]
pub struct Calendar {
    days: Vec<BusinessDay>,
    hourly: HourlyCurve,
    open: u32,
    close: u32,
    now: NaiveDateTime,
}

impl Calendar {
    pub fn build<R: Rng + ?Sized>(
        config: &BusinessConfig,
        rng: &mut R,
    ) -> Result<Self, GenerationError> {
        let end = config.shop.end_date;
        let span = i64::from(config.lifetime_days());
        let holidays = Holidays::new(config.shop.holidays, &config.shop.extra_holidays);
        let traffic = &config.traffic;

        let mut days = Vec::new();
        for offset in (0..span).rev() {
            let date = end - Duration::days(offset);
            let weekday = date.weekday().num_days_from_monday();
            if weekday == config.shop.rest_weekday || holidays.contains(date) {
                continue;
            }

            let trend = (traffic.daily_increment * (days.len() + 1) as f64).round();
            let extra =
                traffic.weekday_extras[weekday as usize] * traffic.weekday_extras_multiplier;
            let volume_base = traffic.initial_customers + trend + extra;
            let sales = volume_base + rng.normal(0.0, traffic.noise_std);
            let rental = volume_base * traffic.rental_to_sales_ratio
                + rng.normal(0.0, traffic.noise_std);

            days.push(BusinessDay {
                date,
                weekday,
                volume_base,
                volume_sales: sales.round().max(0.0) as u32,
                volume_rental: rental.round().max(0.0) as u32,
            });
        }

        if days.is_empty() {
            return Err(GenerationError::invariant(format!(
                "no business days in the {span} days ending {end}"
            )));
        }

        let hours = &config.hours;
        let hourly = HourlyCurve::build(
            rng,
            hours.open,
            hours.close,
            hours.peak,
            traffic.decrease_magnitude,
        )?;

        let now = (end + Duration::days(1)).and_time(NaiveTime::MIN);

        Ok(Self {
            days,
            hourly,
            open: hours.open,
            close: hours.close,
            now,
        })
    }

    pub fn days(&self) -> &[BusinessDay] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.days[0].date
    }

    pub fn last_day(&self) -> NaiveDate {
        self.days[self.days.len() - 1].date
    }

    /// Reference moment separating finished from still-open rentals.
    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn open(&self) -> u32 {
        self.open
    }

    pub fn close(&self) -> u32 {
        self.close
    }

    pub fn hourly(&self) -> &HourlyCurve {
        &self.hourly
    }

    pub fn opening_time(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(NaiveTime::from_hms_opt(self.open, 0, 0).unwrap_or(NaiveTime::MIN))
    }

    /// Business days strictly between two dates.
    pub fn days_between(&self, after: NaiveDate, before: NaiveDate) -> &[BusinessDay] {
        let start = self.days.partition_point(|day| day.date <= after);
        let end = self.days.partition_point(|day| day.date < before);
        if start >= end {
            &[]
        } else {
            &self.days[start..end]
        }
    }

    /// Business days falling in one month.
    pub fn days_in_month(&self, year: i32, month: u32) -> &[BusinessDay] {
        let start = self
            .days
            .partition_point(|day| (day.date.year(), day.date.month()) < (year, month));
        let end = self
            .days
            .partition_point(|day| (day.date.year(), day.date.month()) <= (year, month));
        &self.days[start..end]
    }

    /// A visit moment on `date`: weighted hour, uniform minute and second.
    pub fn visit_time<R: Rng + ?Sized>(&self, rng: &mut R, date: NaiveDate) -> NaiveDateTime {
        let hour = self.hourly.sample_hour(rng);
        date.and_time(rng.time_in_hour(hour))
    }

    /// A uniform moment within opening hours of `date`.
    pub fn office_time<R: Rng + ?Sized>(&self, rng: &mut R, date: NaiveDate) -> NaiveDateTime {
        rng.moment_on(date, self.open, self.close)
    }

    pub fn total_sales_volume(&self) -> u64 {
        self.days.iter().map(|day| u64::from(day.volume_sales)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::stage_rng;
    use dragonfill_core::HolidayCalendar;

    fn week_config() -> BusinessConfig {
        let mut config = BusinessConfig::default();
        config.shop.lifetime_days = Some(7);
        config.shop.holidays = HolidayCalendar::None;
        config.shop.end_date = NaiveDate::from_ymd_opt(2023, 3, 12).expect("date");
        config
    }

    #[test]
    fn holiday_free_week_has_six_business_days() {
        let calendar =
            Calendar::build(&week_config(), &mut stage_rng(1, "calendar")).expect("calendar");
        assert_eq!(calendar.len(), 6);
        assert!(calendar.days().iter().all(|day| day.weekday != 6));
        assert_eq!(calendar.first_day(), NaiveDate::from_ymd_opt(2023, 3, 6).expect("date"));
    }

    #[test]
    fn range_covered_by_holidays_is_an_invariant_error() {
        let mut config = week_config();
        config.shop.lifetime_days = Some(1);
        config.shop.end_date = NaiveDate::from_ymd_opt(2023, 1, 6).expect("date");
        config.shop.holidays = HolidayCalendar::Poland;

        let err = Calendar::build(&config, &mut stage_rng(1, "calendar")).expect_err("no days");
        assert!(matches!(err, GenerationError::Invariant(_)));
    }

    #[test]
    fn hourly_curve_is_a_probability_vector() {
        let mut rng = stage_rng(9, "hours");
        let curve = HourlyCurve::build(&mut rng, 10, 22, 17, 1.2).expect("curve");
        let total: f64 = curve.probabilities().iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(curve.hours().len(), 12);
        assert!(curve.probabilities().iter().all(|p| *p >= 0.0));
    }

    #[test]
    fn volumes_are_never_negative() {
        let mut config = week_config();
        config.traffic.initial_customers = 0.0;
        config.traffic.noise_std = 10.0;
        config.shop.lifetime_days = Some(120);

        let calendar = Calendar::build(&config, &mut stage_rng(4, "calendar")).expect("calendar");
        assert!(calendar.days().iter().any(|day| day.volume_sales == 0));
    }

    #[test]
    fn days_between_is_exclusive() {
        let calendar =
            Calendar::build(&week_config(), &mut stage_rng(1, "calendar")).expect("calendar");
        let after = NaiveDate::from_ymd_opt(2023, 3, 6).expect("date");
        let before = NaiveDate::from_ymd_opt(2023, 3, 9).expect("date");
        let dates: Vec<_> = calendar
            .days_between(after, before)
            .iter()
            .map(|day| day.date)
            .collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2023, 3, 7).expect("date"),
                NaiveDate::from_ymd_opt(2023, 3, 8).expect("date"),
            ]
        );
    }
}
