use std::collections::BTreeSet;
use std::fmt;

use crate::catalog::ReferenceCatalogs;
use crate::config::BusinessConfig;

/// Tolerance for probability vectors read from config and catalogs.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// Structured validation issue with location and hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub code: String,
    pub path: String,
    pub message: String,
    pub hint: Option<String>,
}

impl ValidationIssue {
    /// Create a new validation issue.
    pub fn new(
        severity: IssueSeverity,
        code: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
        hint: Option<String>,
    ) -> Self {
        Self {
            severity,
            code: code.into(),
            path: path.into(),
            message: message.into(),
            hint,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.path, self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, " (hint: {hint})")?;
        }
        Ok(())
    }
}

/// Aggregated validation report with errors and warnings.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Returns true when there are no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error issue.
    pub fn push_error(&mut self, issue: ValidationIssue) {
        self.errors.push(issue);
    }

    /// Add a warning issue.
    pub fn push_warning(&mut self, issue: ValidationIssue) {
        self.warnings.push(issue);
    }

    /// Merge another report into this one.
    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.errors.iter().any(|issue| issue.code == code)
    }

    fn error(&mut self, code: &str, path: &str, message: impl Into<String>) {
        self.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            code,
            path,
            message,
            None,
        ));
    }

    fn error_with_hint(&mut self, code: &str, path: &str, message: impl Into<String>, hint: &str) {
        self.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            code,
            path,
            message,
            Some(hint.to_string()),
        ));
    }

    fn warning(&mut self, code: &str, path: &str, message: impl Into<String>) {
        self.push_warning(ValidationIssue::new(
            IssueSeverity::Warning,
            code,
            path,
            message,
            None,
        ));
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        f.write_str(&messages.join("; "))
    }
}

/// Validate the internal consistency of a business configuration.
pub fn validate_config(config: &BusinessConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    validate_shop(config, &mut report);
    validate_hours(config, &mut report);
    validate_staff(config, &mut report);
    validate_traffic(config, &mut report);
    validate_stock(config, &mut report);
    validate_tournaments(config, &mut report);
    validate_maintenance(config, &mut report);

    report
}

fn validate_shop(config: &BusinessConfig, report: &mut ValidationReport) {
    let shop = &config.shop;
    if config.lifetime_days() == 0 {
        report.error_with_hint(
            "empty_lifetime",
            "shop.lifetime_years",
            "the shop must be open for at least one day",
            "set lifetime_years >= 1 or lifetime_days >= 1",
        );
    }
    if shop.rest_weekday > 6 {
        report.error(
            "invalid_weekday",
            "shop.rest_weekday",
            format!("weekday {} is outside 0..=6", shop.rest_weekday),
        );
    }
    if shop.phone_prefixes.is_empty() {
        report.error("empty_list", "shop.phone_prefixes", "no phone prefixes");
    }
    for prefix in &shop.phone_prefixes {
        if prefix.is_empty() || !prefix.chars().all(|ch| ch.is_ascii_digit()) {
            report.error(
                "invalid_phone_prefix",
                "shop.phone_prefixes",
                format!("prefix '{prefix}' must be a non-empty digit string"),
            );
        }
    }
    if shop.staff_city.trim().is_empty() {
        report.error("empty_value", "shop.staff_city", "staff city is empty");
    }
}

fn validate_hours(config: &BusinessConfig, report: &mut ValidationReport) {
    let hours = &config.hours;
    if hours.open >= hours.close || hours.close > 24 {
        report.error(
            "invalid_open_hours",
            "hours",
            format!("open {} must be before close {} <= 24", hours.open, hours.close),
        );
        return;
    }
    if hours.peak < hours.open || hours.peak >= hours.close {
        report.error(
            "hour_out_of_window",
            "hours.peak",
            format!("peak {} outside opening hours", hours.peak),
        );
    }

    for (path, value) in [
        ("hours.morning_until_early", hours.morning_until_early),
        ("hours.morning_until_late", hours.morning_until_late),
        ("hours.afternoon_from_early", hours.afternoon_from_early),
        ("hours.afternoon_from_late", hours.afternoon_from_late),
    ] {
        if value < hours.open || value > hours.close {
            report.error_with_hint(
                "hour_out_of_window",
                path,
                format!(
                    "shift boundary {value} outside opening hours {}..{}",
                    hours.open, hours.close
                ),
                "shift boundaries must lie within the open window",
            );
        }
    }

    for (path, value) in [
        ("hours.morning_rotation_weekday", hours.morning_rotation_weekday),
        ("hours.afternoon_rotation_weekday", hours.afternoon_rotation_weekday),
    ] {
        if value > 6 {
            report.error(
                "invalid_weekday",
                path,
                format!("weekday {value} is outside 0..=6"),
            );
        }
    }

    for weekday in 0..7 {
        if weekday == config.shop.rest_weekday {
            continue;
        }
        let until = hours.morning_until(weekday);
        let from = hours.afternoon_from(weekday);
        if from > until {
            report.error_with_hint(
                "shift_gap",
                "hours",
                format!("weekday {weekday}: nobody is on duty between {until}:00 and {from}:00"),
                "the afternoon shift must start before the morning shift ends",
            );
        }
    }
}

fn validate_staff(config: &BusinessConfig, report: &mut ValidationReport) {
    let staff = &config.staff;
    if staff.staff_number == 0 {
        report.error("empty_roster", "staff.staff_number", "at least one employee is required");
    }
    for (path, shift) in [
        ("staff.morning_shift", &staff.morning_shift),
        ("staff.afternoon_shift", &staff.afternoon_shift),
    ] {
        if shift.is_empty() {
            report.error("empty_shift", path, "shift has no staff assigned");
        }
        for id in shift {
            if *id == 0 || *id > staff.staff_number {
                report.error(
                    "unknown_staff_id",
                    path,
                    format!("staff id {id} outside 1..={}", staff.staff_number),
                );
            }
        }
    }
    let scheduled: BTreeSet<u32> = staff
        .morning_shift
        .iter()
        .chain(&staff.afternoon_shift)
        .copied()
        .collect();
    for id in 1..=staff.staff_number {
        if !scheduled.contains(&id) {
            report.warning(
                "unscheduled_staff",
                "staff",
                format!("staff id {id} is not on any shift"),
            );
        }
    }
    if staff.salary_min < 0.0 {
        report.error("negative_value", "staff.salary_min", "salary floor is negative");
    }
    if staff.salary_scale <= 0.0 {
        report.error("non_positive", "staff.salary_scale", "salary scale must be positive");
    }

    let relationships = &config.relationships;
    if relationships.ratio < 0.0 {
        report.error("negative_value", "relationships.ratio", "ratio is negative");
    }
    if relationships.std_dates < 0.0 {
        report.error("negative_value", "relationships.std_dates", "std is negative");
    }
    check_unit_interval(
        report,
        "relationships.heterosexual_ratio",
        relationships.heterosexual_ratio,
    );
}

fn validate_traffic(config: &BusinessConfig, report: &mut ValidationReport) {
    let traffic = &config.traffic;
    if traffic.noise_std < 0.0 {
        report.error("negative_value", "traffic.noise_std", "noise std is negative");
    }
    if traffic.rental_to_sales_ratio < 0.0 {
        report.error(
            "negative_value",
            "traffic.rental_to_sales_ratio",
            "ratio is negative",
        );
    }
    if traffic.decrease_magnitude <= 0.0 {
        report.error(
            "non_positive",
            "traffic.decrease_magnitude",
            "decrease magnitude must be positive",
        );
    }

    let pieces = &config.customers.pieces_per_visit;
    if pieces.is_empty() {
        report.error("empty_list", "customers.pieces_per_visit", "no distribution given");
    }
    if pieces.iter().any(|entry| entry.pieces == 0 || entry.probability < 0.0) {
        report.error(
            "invalid_probability",
            "customers.pieces_per_visit",
            "pieces must be >= 1 and probabilities >= 0",
        );
    }
    let total: f64 = pieces.iter().map(|entry| entry.probability).sum();
    check_probability_sum(report, "customers.pieces_per_visit", total);

    if config.customers.customers_number == 0 {
        report.error(
            "empty_pool",
            "customers.customers_number",
            "customer pool is empty",
        );
    }
}

fn validate_stock(config: &BusinessConfig, report: &mut ValidationReport) {
    let inventory = &config.inventory;
    let expected = config.customers.expected_pieces();
    if inventory.multiplier < expected {
        report.error_with_hint(
            "stock_below_demand",
            "inventory.multiplier",
            format!(
                "multiplier {} is below the expected pieces per visit {expected:.3}",
                inventory.multiplier
            ),
            "sale stock would run out before the end of the calendar",
        );
    }
    if inventory.bulk_ratio <= 0.0 {
        report.error("non_positive", "inventory.bulk_ratio", "bulk ratio must be positive");
    }
    if inventory.avg_supply_yearly_rate == 0 {
        report.error(
            "non_positive",
            "inventory.avg_supply_yearly_rate",
            "at least one delivery per year is required",
        );
    }
    if inventory.inactive_rental_games > inventory.rental_games_n {
        report.error(
            "inactive_above_total",
            "inventory.inactive_rental_games",
            format!(
                "{} inactive units but only {} rental units",
                inventory.inactive_rental_games, inventory.rental_games_n
            ),
        );
    }

    let rental = &config.rental;
    if rental.price_ratio <= 0.0 {
        report.error("non_positive", "rental.price_ratio", "price ratio must be positive");
    }
    if rental.penalty_ratio < 0.0 {
        report.error("negative_value", "rental.penalty_ratio", "penalty ratio is negative");
    }
    if rental.allowed_days < 0 {
        report.error("negative_value", "rental.allowed_days", "grace window is negative");
    }
    if rental.holding_time.shape <= 0.0 || rental.holding_time.scale <= 0.0 {
        report.error(
            "non_positive",
            "rental.holding_time",
            "gamma shape and scale must be positive",
        );
    }
}

fn validate_tournaments(config: &BusinessConfig, report: &mut ValidationReport) {
    let tournaments = &config.tournaments;
    if tournaments.weekday > 6 {
        report.error(
            "invalid_weekday",
            "tournaments.weekday",
            format!("weekday {} is outside 0..=6", tournaments.weekday),
        );
    } else if tournaments.weekday == config.shop.rest_weekday {
        report.error(
            "event_on_rest_day",
            "tournaments.weekday",
            "tournaments cannot be held on the rest weekday",
        );
    }
    if tournaments.hour < config.hours.open || tournaments.hour >= config.hours.close {
        report.error(
            "hour_out_of_window",
            "tournaments.hour",
            format!("event hour {} outside opening hours", tournaments.hour),
        );
    }
    if tournaments.period_weeks == 0 {
        report.error("non_positive", "tournaments.period_weeks", "cadence must be >= 1 week");
    }
    if tournaments.deadline_offset_days < 0 {
        report.error(
            "negative_value",
            "tournaments.deadline_offset_days",
            "deadline offset is negative",
        );
    }
    if tournaments.sign_up_window_days < 2 {
        report.error_with_hint(
            "sign_up_window_too_short",
            "tournaments.sign_up_window_days",
            "the window must contain at least one day strictly before the deadline",
            "use a window of 2 days or more",
        );
    }
    if tournaments.fee < 0.0 {
        report.error("negative_value", "tournaments.fee", "fee is negative");
    }
    if tournaments.expenses.shape <= 0.0 || tournaments.expenses.scale <= 0.0 {
        report.error(
            "non_positive",
            "tournaments.expenses",
            "gamma shape and scale must be positive",
        );
    }
    if tournaments.min_depth > tournaments.max_depth {
        report.error(
            "invalid_range",
            "tournaments.min_depth",
            format!(
                "min depth {} above max depth {}",
                tournaments.min_depth, tournaments.max_depth
            ),
        );
    }
    if tournaments.max_depth > 10 {
        report.error(
            "depth_too_large",
            "tournaments.max_depth",
            "brackets deeper than 10 rounds are not supported",
        );
    }
}

fn validate_maintenance(config: &BusinessConfig, report: &mut ValidationReport) {
    let maintenance = &config.maintenance;
    if !(1..=28).contains(&maintenance.payment_day) {
        report.error(
            "invalid_payment_day",
            "maintenance.payment_day",
            format!("payment day {} outside 1..=28", maintenance.payment_day),
        );
    }
    if maintenance.rent < 0.0 {
        report.error("negative_value", "maintenance.rent", "rent is negative");
    }
    for (path, params) in [
        ("maintenance.energy", &maintenance.energy),
        ("maintenance.water", &maintenance.water),
        ("maintenance.heat", &maintenance.heat),
    ] {
        if params.std < 0.0 || params.min < 0.0 {
            report.error("negative_value", path, "std and min must be >= 0");
        }
    }
    for month in &maintenance.warm_months {
        if !(1..=12).contains(month) {
            report.error(
                "invalid_month",
                "maintenance.warm_months",
                format!("month {month} outside 1..=12"),
            );
        }
    }
}

/// Validate catalogs on their own and against the configuration.
pub fn validate_catalogs(
    catalogs: &ReferenceCatalogs,
    config: &BusinessConfig,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    if catalogs.games.is_empty() {
        report.error("empty_catalog", "games.csv", "game catalog is empty");
    }
    let mut titles = BTreeSet::new();
    for game in &catalogs.games {
        if !titles.insert(game.name.as_str()) {
            report.error(
                "duplicate_entry",
                "games.csv",
                format!("game '{}' is listed twice", game.name),
            );
        }
        if game.price <= 0.0 {
            report.error(
                "non_positive",
                "games.csv",
                format!("game '{}' has a non-positive price", game.name),
            );
        }
        if game.tournament && game.participants_number == 0 {
            report.error(
                "non_positive",
                "games.csv",
                format!("tournament game '{}' has no seats", game.name),
            );
        }
    }

    for (path, entries) in [
        ("names_males.csv", &catalogs.first_names_male),
        ("names_females.csv", &catalogs.first_names_female),
        ("lastnames_males.csv", &catalogs.last_names_male),
        ("lastnames_females.csv", &catalogs.last_names_female),
    ] {
        if entries.is_empty() {
            report.error("empty_catalog", path, "name table is empty");
            continue;
        }
        let total: f64 = entries.iter().map(|entry| entry.probability).sum();
        check_probability_sum(&mut report, path, total);
    }

    if catalogs.cities.is_empty() {
        report.error("empty_catalog", "cities.csv", "city list is empty");
    } else {
        let total: f64 = catalogs.cities.iter().map(|entry| entry.probability).sum();
        check_probability_sum(&mut report, "cities.csv", total);
    }

    if catalogs.domains.is_empty() {
        report.error("empty_catalog", "domains.csv", "no email domains");
    }

    let pairings = catalogs.tournament_pairings();
    if pairings.is_empty() {
        report.error_with_hint(
            "no_tournament_games",
            "tournaments.csv",
            "no tournament-eligible game matches a tournament type",
            "tournaments.csv rows are matched on (type, category)",
        );
    }

    let max_seats = pairings
        .iter()
        .map(|pairing| pairing.participants_number)
        .max()
        .unwrap_or(0);
    let widest = u64::from(max_seats) << config.tournaments.max_depth.min(10);
    if widest > u64::from(config.customers.customers_number) {
        report.error_with_hint(
            "bracket_above_pool",
            "customers.customers_number",
            format!(
                "a bracket can need {widest} participants but the pool has {}",
                config.customers.customers_number
            ),
            "raise customers_number or lower tournaments.max_depth",
        );
    }

    if (config.inventory.rental_games_n as usize) < catalogs.games.len() {
        report.warning(
            "rental_stock_sparse",
            "inventory.rental_games_n",
            "fewer rental units than games; unpopular games will never be rentable",
        );
    }

    report
}

fn check_probability_sum(report: &mut ValidationReport, path: &str, total: f64) {
    if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
        report.error_with_hint(
            "probability_sum",
            path,
            format!("probabilities sum to {total:.6}"),
            "probabilities must sum to 1",
        );
    }
}

fn check_unit_interval(report: &mut ValidationReport, path: &str, value: f64) {
    if !(0.0..=1.0).contains(&value) {
        report.error("invalid_ratio", path, format!("{value} outside 0..=1"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PiecesProbability;

    #[test]
    fn shift_boundary_outside_window_is_rejected() {
        let mut config = BusinessConfig::default();
        config.hours.morning_until_late = config.hours.close + 1;

        let report = validate_config(&config);
        assert!(!report.is_ok());
        assert!(report.has_code("hour_out_of_window"));
    }

    #[test]
    fn coverage_gap_is_rejected() {
        let mut config = BusinessConfig::default();
        config.hours.morning_until_early = 13;
        config.hours.afternoon_from_early = 15;

        let report = validate_config(&config);
        assert!(report.has_code("shift_gap"));
    }

    #[test]
    fn gap_on_rest_day_is_ignored() {
        let mut config = BusinessConfig::default();
        config.shop.rest_weekday = 0;
        config.hours.morning_rotation_weekday = 0;
        config.hours.afternoon_rotation_weekday = 0;
        config.hours.morning_until_early = 12;
        config.hours.afternoon_from_early = 18;

        assert!(!validate_config(&config).has_code("shift_gap"));
    }

    #[test]
    fn pieces_distribution_must_sum_to_one() {
        let mut config = BusinessConfig::default();
        config.customers.pieces_per_visit = vec![PiecesProbability {
            pieces: 1,
            probability: 0.7,
        }];

        assert!(validate_config(&config).has_code("probability_sum"));
    }

    #[test]
    fn multiplier_below_expected_pieces_is_rejected() {
        let mut config = BusinessConfig::default();
        config.inventory.multiplier = 1.0;

        assert!(validate_config(&config).has_code("stock_below_demand"));
    }

    #[test]
    fn unknown_shift_staff_id_is_rejected() {
        let mut config = BusinessConfig::default();
        config.staff.morning_shift.push(42);

        assert!(validate_config(&config).has_code("unknown_staff_id"));
    }

    #[test]
    fn report_display_joins_errors() {
        let mut config = BusinessConfig::default();
        config.tournaments.min_depth = 5;
        config.tournaments.max_depth = 3;
        config.maintenance.payment_day = 31;

        let report = validate_config(&config);
        let rendered = report.to_string();
        assert!(rendered.contains("invalid_range"));
        assert!(rendered.contains("invalid_payment_day"));
    }
}
