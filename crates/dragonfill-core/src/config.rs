//! Business parameters of a generation run.
//!
//! Every option has a default so partial TOML files are accepted; unknown keys
//! are rejected. Weekdays are numbered `0 = Monday .. 6 = Sunday`, hours are
//! whole hours of the day.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct BusinessConfig {
    pub shop: ShopConfig,
    pub hours: ShopHours,
    pub staff: StaffConfig,
    pub traffic: TrafficConfig,
    pub customers: CustomerConfig,
    pub inventory: InventoryConfig,
    pub rental: RentalConfig,
    pub tournaments: TournamentConfig,
    pub maintenance: MaintenanceConfig,
    pub relationships: RelationshipConfig,
}

impl BusinessConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load a TOML file and validate it eagerly.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        config.ensure_valid()?;
        Ok(config)
    }

    pub fn ensure_valid(&self) -> Result<()> {
        let report = crate::validation::validate_config(self);
        if report.is_ok() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(report))
        }
    }

    /// Number of calendar days covered by the run, rest days included.
    pub fn lifetime_days(&self) -> u32 {
        self.shop
            .lifetime_days
            .unwrap_or(365 * self.shop.lifetime_years)
    }
}

/// Public holiday calendar excluded from business days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HolidayCalendar {
    Poland,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct ShopConfig {
    pub lifetime_years: u32,
    /// Overrides `lifetime_years` with an exact day count.
    pub lifetime_days: Option<u32>,
    /// Last calendar day of the run; "now" is the midnight after it.
    pub end_date: NaiveDate,
    pub rest_weekday: u32,
    pub holidays: HolidayCalendar,
    pub extra_holidays: Vec<NaiveDate>,
    pub staff_city: String,
    pub phone_prefixes: Vec<String>,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            lifetime_years: 3,
            lifetime_days: None,
            end_date: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap_or_default(),
            rest_weekday: 6,
            holidays: HolidayCalendar::Poland,
            extra_holidays: Vec::new(),
            staff_city: "Wrocław".to_string(),
            phone_prefixes: vec!["50".into(), "51".into(), "60".into(), "69".into(), "78".into()],
        }
    }
}

/// Opening hours and shift boundaries.
///
/// Weekdays up to and including a rotation weekday use the `*_early` boundary,
/// later weekdays the `*_late` one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct ShopHours {
    pub open: u32,
    pub close: u32,
    pub peak: u32,
    pub morning_rotation_weekday: u32,
    pub morning_until_early: u32,
    pub morning_until_late: u32,
    pub afternoon_rotation_weekday: u32,
    pub afternoon_from_early: u32,
    pub afternoon_from_late: u32,
}

impl Default for ShopHours {
    fn default() -> Self {
        Self {
            open: 10,
            close: 22,
            peak: 17,
            morning_rotation_weekday: 2,
            morning_until_early: 16,
            morning_until_late: 15,
            afternoon_rotation_weekday: 2,
            afternoon_from_early: 15,
            afternoon_from_late: 14,
        }
    }
}

impl ShopHours {
    pub fn morning_until(&self, weekday: u32) -> u32 {
        if weekday <= self.morning_rotation_weekday {
            self.morning_until_early
        } else {
            self.morning_until_late
        }
    }

    pub fn afternoon_from(&self, weekday: u32) -> u32 {
        if weekday <= self.afternoon_rotation_weekday {
            self.afternoon_from_early
        } else {
            self.afternoon_from_late
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct StaffConfig {
    pub staff_number: u32,
    /// Staff ids (final, 1-based) working the morning shift.
    pub morning_shift: Vec<u32>,
    pub afternoon_shift: Vec<u32>,
    pub salary_min: f64,
    /// Scale of the exponential salary bonus over `salary_min`.
    pub salary_scale: f64,
}

impl Default for StaffConfig {
    fn default() -> Self {
        Self {
            staff_number: 6,
            morning_shift: vec![1, 2, 5],
            afternoon_shift: vec![3, 4, 6],
            salary_min: 3600.0,
            salary_scale: 900.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct TrafficConfig {
    pub initial_customers: f64,
    pub daily_increment: f64,
    /// Extra visitors per weekday, Monday first.
    pub weekday_extras: [f64; 7],
    pub weekday_extras_multiplier: f64,
    pub noise_std: f64,
    pub rental_to_sales_ratio: f64,
    /// Scale of the exponential steps that decrease traffic after the peak.
    pub decrease_magnitude: f64,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            initial_customers: 12.0,
            daily_increment: 0.01,
            weekday_extras: [0.0, 0.0, 1.0, 2.0, 5.0, 8.0, 0.0],
            weekday_extras_multiplier: 1.0,
            noise_std: 2.0,
            rental_to_sales_ratio: 0.4,
            decrease_magnitude: 1.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PiecesProbability {
    pub pieces: u32,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct CustomerConfig {
    /// Size of the pool rentals and tournaments draw customers from.
    pub customers_number: u32,
    /// Distribution of units bought in one visit.
    pub pieces_per_visit: Vec<PiecesProbability>,
}

impl Default for CustomerConfig {
    fn default() -> Self {
        Self {
            customers_number: 1500,
            pieces_per_visit: vec![
                PiecesProbability {
                    pieces: 1,
                    probability: 0.8,
                },
                PiecesProbability {
                    pieces: 2,
                    probability: 0.15,
                },
                PiecesProbability {
                    pieces: 3,
                    probability: 0.05,
                },
            ],
        }
    }
}

impl CustomerConfig {
    pub fn expected_pieces(&self) -> f64 {
        self.pieces_per_visit
            .iter()
            .map(|entry| entry.pieces as f64 * entry.probability)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct InventoryConfig {
    /// Sale stock per projected sales visit, before jitter.
    pub multiplier: f64,
    /// Share of the catalog price paid when buying stock.
    pub bulk_ratio: f64,
    pub avg_supply_yearly_rate: u32,
    pub rental_games_n: u32,
    pub inactive_rental_games: u32,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            multiplier: 1.5,
            bulk_ratio: 0.6,
            avg_supply_yearly_rate: 12,
            rental_games_n: 80,
            inactive_rental_games: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GammaParams {
    pub shape: f64,
    pub scale: f64,
}

/// What happens to a rental visit when no unit of the drawn game is free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedRentalPolicy {
    /// Skip the visit and count it in the generation report.
    Drop,
    /// Abort the run.
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct RentalConfig {
    pub price_ratio: f64,
    pub allowed_days: i64,
    pub penalty_ratio: f64,
    pub holding_time: GammaParams,
    pub unmatched: UnmatchedRentalPolicy,
}

impl Default for RentalConfig {
    fn default() -> Self {
        Self {
            price_ratio: 0.1,
            allowed_days: 7,
            penalty_ratio: 0.02,
            holding_time: GammaParams {
                shape: 2.0,
                scale: 2.5,
            },
            unmatched: UnmatchedRentalPolicy::Drop,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ExpenseParams {
    pub mean: f64,
    pub shape: f64,
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct TournamentConfig {
    pub weekday: u32,
    pub hour: u32,
    pub period_weeks: u32,
    pub start_offset_weeks: u32,
    pub deadline_offset_days: i64,
    pub sign_up_window_days: i64,
    pub fee: f64,
    pub expenses: ExpenseParams,
    pub min_depth: u32,
    pub max_depth: u32,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            weekday: 5,
            hour: 16,
            period_weeks: 2,
            start_offset_weeks: 1,
            deadline_offset_days: 2,
            sign_up_window_days: 14,
            fee: 20.0,
            expenses: ExpenseParams {
                mean: 120.0,
                shape: 2.0,
                scale: 25.0,
            },
            min_depth: 2,
            max_depth: 4,
        }
    }
}

/// Normal distribution floored at `min`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct BoundedNormal {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct MaintenanceConfig {
    pub payment_day: u32,
    pub rent: f64,
    pub energy: BoundedNormal,
    pub water: BoundedNormal,
    pub heat: BoundedNormal,
    /// Months (1-12) without heating bills.
    pub warm_months: Vec<u32>,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            payment_day: 10,
            rent: 5200.0,
            energy: BoundedNormal {
                mean: 750.0,
                std: 120.0,
                min: 300.0,
            },
            water: BoundedNormal {
                mean: 110.0,
                std: 25.0,
                min: 40.0,
            },
            heat: BoundedNormal {
                mean: 620.0,
                std: 180.0,
                min: 150.0,
            },
            warm_months: vec![5, 6, 7, 8, 9],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct RelationshipConfig {
    /// Relationships per staff member.
    pub ratio: f64,
    pub avg_dates: f64,
    pub std_dates: f64,
    pub heterosexual_ratio: f64,
}

impl Default for RelationshipConfig {
    fn default() -> Self {
        Self {
            ratio: 1.5,
            avg_dates: 6.0,
            std_dates: 4.0,
            heterosexual_ratio: 0.9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = BusinessConfig::from_toml_str(
            r#"
            [shop]
            lifetime_years = 1
            end_date = "2022-06-30"

            [rental]
            unmatched = "fail"
            "#,
        )
        .expect("parse");

        assert_eq!(config.shop.lifetime_years, 1);
        assert_eq!(config.lifetime_days(), 365);
        assert_eq!(config.rental.unmatched, UnmatchedRentalPolicy::Fail);
        assert_eq!(config.staff, StaffConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = BusinessConfig::from_toml_str("[shop]\nlifetime = 2\n").expect_err("reject");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn shift_boundaries_switch_after_rotation_weekday() {
        let hours = ShopHours::default();
        assert_eq!(hours.morning_until(2), hours.morning_until_early);
        assert_eq!(hours.morning_until(3), hours.morning_until_late);
        assert_eq!(hours.afternoon_from(0), hours.afternoon_from_early);
        assert_eq!(hours.afternoon_from(5), hours.afternoon_from_late);
    }

    #[test]
    fn default_config_is_valid() {
        BusinessConfig::default()
            .ensure_valid()
            .expect("defaults validate");
    }
}
