use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate};

use dragonfill_core::HolidayCalendar;

/// Public holidays that close the shop.
#[derive(Debug, Clone)]
pub struct Holidays {
    calendar: HolidayCalendar,
    extra: BTreeSet<NaiveDate>,
}

impl Holidays {
    pub fn new(calendar: HolidayCalendar, extra: &[NaiveDate]) -> Self {
        Self {
            calendar,
            extra: extra.iter().copied().collect(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        if self.extra.contains(&date) {
            return true;
        }
        match self.calendar {
            HolidayCalendar::Poland => is_polish_holiday(date),
            HolidayCalendar::None => false,
        }
    }
}

fn is_polish_holiday(date: NaiveDate) -> bool {
    let year = date.year();
    let fixed = matches!(
        (date.month(), date.day()),
        (1, 1) | (5, 1) | (5, 3) | (8, 15) | (11, 1) | (11, 11) | (12, 25) | (12, 26)
    );
    if fixed {
        return true;
    }
    if (date.month(), date.day()) == (1, 6) && year >= 2011 {
        return true;
    }
    if (date.month(), date.day()) == (12, 24) && year >= 2025 {
        return true;
    }

    let Some(easter) = easter_sunday(year) else {
        return false;
    };
    [0, 1, 49, 60]
        .iter()
        .any(|offset| easter + Duration::days(*offset) == date)
}

/// Gregorian Easter Sunday (anonymous algorithm).
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}
