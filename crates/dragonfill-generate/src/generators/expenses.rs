//! Monthly maintenance expenses: rent, utilities and payroll.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rand::Rng;

use dragonfill_core::{BusinessConfig, Money};

use crate::calendar::Calendar;
use crate::generators::staff::StaffMember;
use crate::sampling::Distributions;

pub const RENT_TYPE: &str = "RENT";
pub const UTILITIES_TYPE: &str = "UTILITIES";
pub const SALARY_TYPE: &str = "SALARY";

const MONTH_NAMES: [&str; 12] = [
    "JANUARY",
    "FEBRUARY",
    "MARCH",
    "APRIL",
    "MAY",
    "JUNE",
    "JULY",
    "AUGUST",
    "SEPTEMBER",
    "OCTOBER",
    "NOVEMBER",
    "DECEMBER",
];

/// One paid expense line. `amount` is the positive cost.
#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceExpense {
    pub spend_id: usize,
    pub title: String,
    pub expense_type: &'static str,
    pub amount: Money,
    pub date: NaiveDate,
    pub updated_at: NaiveDateTime,
}

impl MaintenanceExpense {
    pub fn invoice_code(&self) -> String {
        format!("ME{}", self.spend_id)
    }
}

pub fn generate_expenses<R: Rng + ?Sized>(
    config: &BusinessConfig,
    calendar: &Calendar,
    staff: &[StaffMember],
    rng: &mut R,
) -> Vec<MaintenanceExpense> {
    let maintenance = &config.maintenance;
    let mut expenses = Vec::new();

    for (year, month) in months(calendar.first_day(), calendar.last_day()) {
        let Some(date) = payment_date(calendar, year, month, maintenance.payment_day) else {
            continue;
        };
        let month_name = MONTH_NAMES[month as usize - 1];

        let mut lines = vec![
            (
                format!("RENT {month_name}"),
                RENT_TYPE,
                Money::from_f64(maintenance.rent),
            ),
            (
                format!("ENERGY {month_name}"),
                UTILITIES_TYPE,
                Money::from_f64(rng.bounded_normal(&maintenance.energy)),
            ),
            (
                format!("WATER {month_name}"),
                UTILITIES_TYPE,
                Money::from_f64(rng.bounded_normal(&maintenance.water)),
            ),
        ];
        if !maintenance.warm_months.contains(&month) {
            lines.push((
                format!("HEATING {month_name}"),
                UTILITIES_TYPE,
                Money::from_f64(rng.bounded_normal(&maintenance.heat)),
            ));
        }
        for member in staff.iter().filter(|member| member.employed_on(date)) {
            lines.push((
                format!("SALARY {month_name} {}", member.full_name()),
                SALARY_TYPE,
                member.last_salary,
            ));
        }

        for (title, expense_type, amount) in lines {
            expenses.push(MaintenanceExpense {
                spend_id: 0,
                title,
                expense_type,
                amount,
                date,
                updated_at: calendar.office_time(rng, date),
            });
        }
    }

    expenses.sort_by_key(|expense| expense.updated_at);
    for (idx, expense) in expenses.iter_mut().enumerate() {
        expense.spend_id = idx + 1;
    }
    expenses
}

/// First business day on or after `payment_day`; the month's last business
/// day when the calendar runs past the month but has none after that day.
pub fn payment_date(
    calendar: &Calendar,
    year: i32,
    month: u32,
    payment_day: u32,
) -> Option<NaiveDate> {
    let days = calendar.days_in_month(year, month);
    if let Some(day) = days.iter().find(|day| day.date.day() >= payment_day) {
        return Some(day.date);
    }
    let month_closed = calendar.last_day() > last_of_month(year, month)?;
    if month_closed {
        days.last().map(|day| day.date)
    } else {
        None
    }
}

fn last_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

fn months(from: NaiveDate, to: NaiveDate) -> Vec<(i32, u32)> {
    let mut out = Vec::new();
    let (mut year, mut month) = (from.year(), from.month());
    while (year, month) <= (to.year(), to.month()) {
        out.push((year, month));
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use dragonfill_core::HolidayCalendar;

    use super::*;
    use crate::sampling::stage_rng;

    fn calendar(days: u32, end: NaiveDate) -> (BusinessConfig, Calendar) {
        let mut config = BusinessConfig::default();
        config.shop.lifetime_days = Some(days);
        config.shop.end_date = end;
        config.shop.holidays = HolidayCalendar::None;
        let calendar = Calendar::build(&config, &mut stage_rng(1, "calendar")).expect("calendar");
        (config, calendar)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    #[test]
    fn payment_lands_on_first_business_day_from_payment_day() {
        let (_, calendar) = calendar(120, date(2023, 12, 31));
        // 2023-09-10 is a Sunday.
        assert_eq!(payment_date(&calendar, 2023, 9, 10), Some(date(2023, 9, 11)));
        assert_eq!(payment_date(&calendar, 2023, 10, 10), Some(date(2023, 10, 10)));
    }

    #[test]
    fn month_cut_short_by_calendar_end_is_skipped() {
        let (_, calendar) = calendar(40, date(2023, 12, 5));
        assert_eq!(payment_date(&calendar, 2023, 12, 10), None);
        assert!(payment_date(&calendar, 2023, 11, 10).is_some());
    }

    #[test]
    fn heating_is_skipped_in_warm_months() {
        let (config, calendar) = calendar(365, date(2023, 12, 31));
        let expenses = generate_expenses(&config, &calendar, &[], &mut stage_rng(1, "expenses"));
        assert!(expenses.iter().any(|e| e.title == "HEATING JANUARY"));
        assert!(!expenses.iter().any(|e| e.title == "HEATING JULY"));
        assert_eq!(expenses.iter().filter(|e| e.expense_type == RENT_TYPE).count(), 12);
        assert!(expenses.windows(2).all(|w| w[0].updated_at <= w[1].updated_at));
        assert_eq!(expenses.last().map(|e| e.spend_id), Some(expenses.len()));
    }
}
