//! Staff roster and the weekday x hour duty grid.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use rand::Rng;
use rand::seq::IndexedRandom;

use dragonfill_core::{BusinessConfig, Gender, Money, StaffConfig};

use crate::calendar::Calendar;
use crate::errors::GenerationError;
use crate::people::PersonFactory;
use crate::sampling::Distributions;

/// Calendar margin kept free of the scripted termination.
const FIRE_MARGIN_DAYS: usize = 90;
/// Days between the termination and the replacement hire.
const REHIRE_DELAY_DAYS: i64 = 30;

/// One employee, ids assigned in `updated_at` order.
#[derive(Debug, Clone, PartialEq)]
pub struct StaffMember {
    pub staff_id: usize,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub city: String,
    /// Null once the employee is gone.
    pub current_salary: Option<Money>,
    /// Salary paid while employed, kept for payroll after termination.
    pub last_salary: Money,
    pub is_manager: bool,
    pub gender: Gender,
    pub from_date: NaiveDate,
    pub to_date: Option<NaiveDate>,
    pub updated_at: NaiveDateTime,
}

impl StaffMember {
    pub fn employed_on(&self, date: NaiveDate) -> bool {
        self.from_date <= date && self.to_date.is_none_or(|to| date < to)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Build the roster: one scripted termination and one replacement hire when
/// the roster has at least three people.
pub fn generate_staff<R: Rng + ?Sized>(
    config: &BusinessConfig,
    calendar: &Calendar,
    people: &mut PersonFactory,
    rng: &mut R,
) -> Result<Vec<StaffMember>, GenerationError> {
    let n = config.staff.staff_number as usize;
    let first_day = calendar.first_day();
    let mut roster = Vec::with_capacity(n);

    for _ in 0..n {
        let gender = people.gender(rng);
        let first_name = people.first_name(rng, gender);
        let last_name = people.last_name(rng, gender);
        let phone = people.phone(rng)?;
        let email = people.email(rng, &first_name, &last_name)?;
        let salary = draw_salary(rng, &config.staff);

        roster.push(StaffMember {
            staff_id: 0,
            first_name,
            last_name,
            phone,
            email,
            city: config.shop.staff_city.clone(),
            current_salary: Some(salary),
            last_salary: salary,
            is_manager: false,
            gender,
            from_date: first_day,
            to_date: None,
            updated_at: first_day.and_time(chrono::NaiveTime::MIN),
        });
    }

    if n >= 3 {
        let fired_on = termination_day(calendar, rng);
        let fired = &mut roster[n - 2];
        fired.to_date = Some(fired_on);
        fired.current_salary = None;
        roster[n - 1].from_date = fired_on + Duration::days(REHIRE_DELAY_DAYS);
    }

    if let Some(manager) = pick_manager(&roster) {
        roster[manager].is_manager = true;
    }

    for member in &mut roster {
        let touched = member.to_date.map_or(member.from_date, |to| to.max(member.from_date));
        member.updated_at = calendar.office_time(rng, touched);
    }

    roster.sort_by_key(|member| member.updated_at);
    for (idx, member) in roster.iter_mut().enumerate() {
        member.staff_id = idx + 1;
    }

    Ok(roster)
}

fn draw_salary<R: Rng + ?Sized>(rng: &mut R, staff: &StaffConfig) -> Money {
    Money::from_f64(staff.salary_min + rng.exponential(staff.salary_scale))
}

fn termination_day<R: Rng + ?Sized>(calendar: &Calendar, rng: &mut R) -> NaiveDate {
    let days = calendar.days();
    let window = if days.len() > 2 * FIRE_MARGIN_DAYS {
        &days[FIRE_MARGIN_DAYS..days.len() - FIRE_MARGIN_DAYS]
    } else {
        days
    };
    window
        .choose(rng)
        .map_or(calendar.first_day(), |day| day.date)
}

/// Index of the first salaried member with the highest salary.
pub fn pick_manager(roster: &[StaffMember]) -> Option<usize> {
    let mut best: Option<(usize, Money)> = None;
    for (idx, member) in roster.iter().enumerate() {
        let Some(salary) = member.current_salary else {
            continue;
        };
        if best.is_none_or(|(_, top)| salary > top) {
            best = Some((idx, salary));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Which staff ids work each (weekday, hour) cell.
#[derive(Debug, Clone)]
pub struct ShiftGrid {
    cells: BTreeMap<(u32, u32), Vec<usize>>,
    employment: BTreeMap<usize, (NaiveDate, Option<NaiveDate>)>,
}

impl ShiftGrid {
    pub fn build(config: &BusinessConfig, staff: &[StaffMember]) -> Self {
        let hours = &config.hours;
        let mut cells = BTreeMap::new();
        for weekday in 0..7u32 {
            if weekday == config.shop.rest_weekday {
                continue;
            }
            for hour in hours.open..hours.close {
                let mut ids: Vec<usize> = Vec::new();
                if hour < hours.morning_until(weekday) {
                    ids.extend(config.staff.morning_shift.iter().map(|id| *id as usize));
                }
                if hour >= hours.afternoon_from(weekday) {
                    ids.extend(config.staff.afternoon_shift.iter().map(|id| *id as usize));
                }
                ids.sort_unstable();
                ids.dedup();
                cells.insert((weekday, hour), ids);
            }
        }

        let employment = staff
            .iter()
            .map(|member| (member.staff_id, (member.from_date, member.to_date)))
            .collect();

        Self { cells, employment }
    }

    /// Staff scheduled in a cell, whether or not employed.
    pub fn scheduled(&self, weekday: u32, hour: u32) -> &[usize] {
        self.cells
            .get(&(weekday, hour))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn employed(&self, staff_id: usize, date: NaiveDate) -> bool {
        self.employment
            .get(&staff_id)
            .is_some_and(|(from, to)| *from <= date && to.is_none_or(|to| date < to))
    }

    /// A uniformly chosen employee on duty at `at`.
    pub fn on_duty<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        at: NaiveDateTime,
    ) -> Result<usize, GenerationError> {
        let weekday = at.weekday().num_days_from_monday();
        let date = at.date();
        let pool: Vec<usize> = self
            .scheduled(weekday, at.hour())
            .iter()
            .copied()
            .filter(|id| self.employed(*id, date))
            .collect();
        pool.choose(rng).copied().ok_or_else(|| {
            GenerationError::invariant(format!("no staff on duty at {at} (weekday {weekday})"))
        })
    }

    /// A uniformly chosen employee working `date` at or after `hour`.
    pub fn available_from<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        date: NaiveDate,
        hour: u32,
    ) -> Result<usize, GenerationError> {
        let weekday = date.weekday().num_days_from_monday();
        let mut pool: Vec<usize> = self
            .cells
            .range((weekday, hour)..(weekday, u32::MAX))
            .flat_map(|(_, ids)| ids.iter().copied())
            .filter(|id| self.employed(*id, date))
            .collect();
        pool.sort_unstable();
        pool.dedup();
        pool.choose(rng).copied().ok_or_else(|| {
            GenerationError::invariant(format!("no staff available on {date} from {hour}:00"))
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;
    use dragonfill_core::{HolidayCalendar, ReferenceCatalogs};

    use super::*;
    use crate::sampling::stage_rng;

    fn config(days: u32) -> BusinessConfig {
        let mut config = BusinessConfig::default();
        config.shop.lifetime_days = Some(days);
        config.shop.holidays = HolidayCalendar::None;
        config
    }

    fn roster(config: &BusinessConfig) -> (Calendar, Vec<StaffMember>) {
        let catalogs = ReferenceCatalogs::bundled().expect("catalogs");
        let calendar = Calendar::build(config, &mut stage_rng(1, "calendar")).expect("calendar");
        let mut people =
            PersonFactory::new(&catalogs, &config.shop.phone_prefixes, 1000).expect("people");
        let staff = generate_staff(config, &calendar, &mut people, &mut stage_rng(1, "staff"))
            .expect("staff");
        (calendar, staff)
    }

    fn member(salary: Option<i64>) -> StaffMember {
        let date = NaiveDate::from_ymd_opt(2023, 1, 2).expect("date");
        StaffMember {
            staff_id: 0,
            first_name: "Anna".into(),
            last_name: "Nowak".into(),
            phone: String::new(),
            email: String::new(),
            city: "Wrocław".into(),
            current_salary: salary.map(Money::from_cents),
            last_salary: Money::from_cents(salary.unwrap_or(100)),
            is_manager: false,
            gender: Gender::Female,
            from_date: date,
            to_date: None,
            updated_at: date.and_time(NaiveTime::MIN),
        }
    }

    #[test]
    fn manager_tie_goes_to_first_in_generation_order() {
        let roster = vec![member(Some(500)), member(None), member(Some(700)), member(Some(700))];
        assert_eq!(pick_manager(&roster), Some(2));
    }

    #[test]
    fn roster_scripts_one_termination_and_one_late_hire() {
        let config = config(730);
        let (calendar, staff) = roster(&config);

        assert_eq!(staff.len(), 6);
        assert_eq!(staff.iter().filter(|m| m.is_manager).count(), 1);
        let fired: Vec<_> = staff.iter().filter(|m| m.to_date.is_some()).collect();
        assert_eq!(fired.len(), 1);
        assert!(fired[0].current_salary.is_none());
        let to = fired[0].to_date.expect("fired");
        assert!(staff.iter().any(|m| m.from_date == to + Duration::days(30)));
        assert!(to > calendar.first_day());

        let ids: Vec<usize> = staff.iter().map(|m| m.staff_id).collect();
        assert_eq!(ids, (1..=6).collect::<Vec<_>>());
        assert!(staff.windows(2).all(|w| w[0].updated_at <= w[1].updated_at));
    }

    #[test]
    fn duty_lookup_respects_shift_cells() {
        let config = config(60);
        let (calendar, staff) = roster(&config);
        let grid = ShiftGrid::build(&config, &staff);
        let mut rng = stage_rng(5, "duty");

        let monday = calendar
            .days()
            .iter()
            .find(|day| day.weekday == 0)
            .expect("monday");
        let morning = monday.date.and_hms_opt(10, 30, 0).expect("time");
        for _ in 0..20 {
            let id = grid.on_duty(&mut rng, morning).expect("on duty");
            assert!(config.staff.morning_shift.contains(&(id as u32)));
        }
        let evening = monday.date.and_hms_opt(21, 0, 0).expect("time");
        let id = grid.on_duty(&mut rng, evening).expect("on duty");
        assert!(config.staff.afternoon_shift.contains(&(id as u32)));
    }

    #[test]
    fn empty_cell_fails_loudly() {
        let config = config(60);
        let (calendar, staff) = roster(&config);
        let grid = ShiftGrid::build(&config, &staff);
        let first = calendar.first_day();
        let sunday = first - Duration::days(i64::from(first.weekday().num_days_from_sunday()));
        let at = sunday.and_hms_opt(12, 0, 0).expect("time");
        let err = grid.on_duty(&mut stage_rng(1, "duty"), at).expect_err("rest day");
        assert!(matches!(err, GenerationError::Invariant(_)));
    }
}
