//! Structural checks over a finished dataset.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::NaiveDateTime;

use dragonfill_core::{Dataset, Money, RentalConfig, Table, TableName, Value};

use crate::errors::GenerationError;
use crate::generators::rentals::penalty;

/// One violated dataset property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetIssue {
    pub code: &'static str,
    pub table: TableName,
    pub column: String,
    pub message: String,
}

impl fmt::Display for DatasetIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}.{}: {}",
            self.code, self.table, self.column, self.message
        )
    }
}

impl From<DatasetIssue> for GenerationError {
    fn from(issue: DatasetIssue) -> Self {
        GenerationError::ReferentialIntegrity {
            table: issue.table,
            column: issue.column,
            message: format!("[{}] {}", issue.code, issue.message),
        }
    }
}

fn issue(
    code: &'static str,
    table: TableName,
    column: &str,
    message: impl Into<String>,
) -> DatasetIssue {
    DatasetIssue {
        code,
        table,
        column: column.to_string(),
        message: message.into(),
    }
}

/// Run every check and collect all violations. Penalties are checked
/// against `rental`.
pub fn check_dataset(dataset: &Dataset, rental: &RentalConfig) -> Vec<DatasetIssue> {
    let mut issues = Vec::new();

    for name in TableName::ALL {
        let Some(table) = dataset.get(name) else {
            issues.push(issue("missing_table", name, "*", "table was not generated"));
            continue;
        };
        check_shape(table, &mut issues);
        check_ids(table, &mut issues);
        check_updated_at(table, &mut issues);
        check_foreign_keys(dataset, table, &mut issues);
    }

    check_consumption(dataset, TableName::Sales, "date", &mut issues);
    check_consumption(dataset, TableName::Rental, "rental_date", &mut issues);
    check_returns(dataset, &mut issues);
    check_penalties(dataset, rental, &mut issues);

    issues
}

fn check_shape(table: &Table, issues: &mut Vec<DatasetIssue>) {
    let schema = table.schema();
    for (row_idx, row) in table.rows.iter().enumerate() {
        if row.len() != schema.columns.len() {
            issues.push(issue(
                "row_width",
                table.name,
                "*",
                format!(
                    "row {} has {} values, expected {}",
                    row_idx + 1,
                    row.len(),
                    schema.columns.len()
                ),
            ));
            continue;
        }
        for (column, value) in schema.columns.iter().zip(row) {
            if !column.nullable && value.is_null() {
                issues.push(issue(
                    "unexpected_null",
                    table.name,
                    column.name,
                    format!("row {} is null", row_idx + 1),
                ));
            }
        }
    }
}

fn check_ids(table: &Table, issues: &mut Vec<DatasetIssue>) {
    let key = table.schema().primary_key();
    for (expected, value) in (1..).zip(table.column(key)) {
        if value.as_int() != Some(expected) {
            issues.push(issue(
                "non_contiguous_ids",
                table.name,
                key,
                format!("expected id {expected}, found {value}"),
            ));
            return;
        }
    }
}

fn check_updated_at(table: &Table, issues: &mut Vec<DatasetIssue>) {
    let mut previous: Option<NaiveDateTime> = None;
    for (row_idx, value) in table.column("updated_at").enumerate() {
        let Some(current) = value.as_timestamp() else {
            continue;
        };
        if previous.is_some_and(|previous| current < previous) {
            issues.push(issue(
                "unordered_updated_at",
                table.name,
                "updated_at",
                format!("row {} goes back in time to {current}", row_idx + 1),
            ));
            return;
        }
        previous = Some(current);
    }
}

fn check_foreign_keys(dataset: &Dataset, table: &Table, issues: &mut Vec<DatasetIssue>) {
    for fk in table.schema().foreign_keys {
        let Some(parent) = dataset.get(fk.references) else {
            continue;
        };
        let parent_ids: HashSet<i64> = parent
            .column(fk.references.schema().primary_key())
            .filter_map(Value::as_int)
            .collect();
        let dangling = table
            .column(fk.column)
            .filter(|value| !value.is_null())
            .filter(|value| value.as_int().is_none_or(|id| !parent_ids.contains(&id)))
            .count();
        if dangling > 0 {
            issues.push(issue(
                "dangling_foreign_key",
                table.name,
                fk.column,
                format!("{dangling} values missing from {}", fk.references),
            ));
        }
    }
}

fn delivery_dates(dataset: &Dataset) -> Vec<Option<NaiveDateTime>> {
    dataset
        .get(TableName::Inventory)
        .map(|inventory| {
            inventory
                .column("delivery_date")
                .map(Value::as_timestamp)
                .collect()
        })
        .unwrap_or_default()
}

fn check_consumption(
    dataset: &Dataset,
    name: TableName,
    date_column: &str,
    issues: &mut Vec<DatasetIssue>,
) {
    let Some(table) = dataset.get(name) else {
        return;
    };
    let deliveries = delivery_dates(dataset);
    let early = table
        .column("inventory_id")
        .zip(table.column(date_column))
        .filter(|(unit, date)| {
            let delivered = unit
                .as_int()
                .and_then(|id| usize::try_from(id - 1).ok())
                .and_then(|idx| deliveries.get(idx).copied().flatten());
            match (delivered, date.as_timestamp()) {
                (Some(delivered), Some(date)) => date < delivered,
                _ => false,
            }
        })
        .count();
    if early > 0 {
        issues.push(issue(
            "consumed_before_delivery",
            name,
            date_column,
            format!("{early} rows precede their unit's delivery"),
        ));
    }
}

fn check_returns(dataset: &Dataset, issues: &mut Vec<DatasetIssue>) {
    let Some(table) = dataset.get(TableName::Rental) else {
        return;
    };
    let backwards = table
        .column("rental_date")
        .zip(table.column("return_date"))
        .filter(|(rented, returned)| match (rented.as_timestamp(), returned.as_timestamp()) {
            (Some(rented), Some(returned)) => returned < rented,
            _ => false,
        })
        .count();
    if backwards > 0 {
        issues.push(issue(
            "return_before_rental",
            TableName::Rental,
            "return_date",
            format!("{backwards} rentals are returned before they start"),
        ));
    }
}

/// A penalty payment exists exactly for returns later than `allowed_days`
/// and carries `price * penalty_ratio * days`.
fn check_penalties(dataset: &Dataset, rules: &RentalConfig, issues: &mut Vec<DatasetIssue>) {
    let (Some(rentals), Some(payments)) = (
        dataset.get(TableName::Rental),
        dataset.get(TableName::Payments),
    ) else {
        return;
    };
    let amounts: HashMap<i64, Money> = payments
        .column("payment_id")
        .zip(payments.column("amount"))
        .filter_map(|(id, amount)| Some((id.as_int()?, amount.as_money()?)))
        .collect();
    let amount_of = |value: &Value| value.as_int().and_then(|id| amounts.get(&id).copied());

    let mut wrong = 0usize;
    for row in 0..rentals.len() {
        let cell = |column: &str| rentals.value(row, column);
        let (Some(rented), Some(returned), Some(paid), Some(penalty_paid)) = (
            cell("rental_date"),
            cell("return_date"),
            cell("payment_id"),
            cell("penalty_payment_id"),
        ) else {
            continue;
        };
        let expected = match (rented.as_timestamp(), returned.as_timestamp()) {
            (Some(rented), Some(returned)) => amount_of(paid).and_then(|price| {
                penalty(
                    price,
                    rules.penalty_ratio,
                    rules.allowed_days,
                    (returned - rented).num_days(),
                )
            }),
            _ => None,
        };
        if expected != amount_of(penalty_paid) || expected.is_none() != penalty_paid.is_null() {
            wrong += 1;
        }
    }
    if wrong > 0 {
        issues.push(issue(
            "penalty_mismatch",
            TableName::Rental,
            "penalty_payment_id",
            format!("{wrong} rentals disagree with the late return rule"),
        ));
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(day: u32) -> Value {
        Value::Timestamp(
            NaiveDate::from_ymd_opt(2023, 1, day)
                .and_then(|date| date.and_hms_opt(10, 0, 0))
                .expect("timestamp"),
        )
    }

    fn city_table(ids: &[usize]) -> Table {
        let mut table = Table::new(TableName::City);
        for (day, id) in ids.iter().enumerate() {
            table.push(vec![Value::id(*id), Value::text("Wrocław"), at(day as u32 + 1)]);
        }
        table
    }

    #[test]
    fn gaps_in_ids_are_reported() {
        let mut issues = Vec::new();
        check_ids(&city_table(&[1, 2, 4]), &mut issues);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, "non_contiguous_ids");
    }

    #[test]
    fn dangling_city_reference_is_reported() {
        let mut dataset = Dataset::new();
        dataset.insert(city_table(&[1]));
        let mut customers = Table::new(TableName::Customers);
        customers.push(vec![
            Value::id(1),
            Value::text("Anna"),
            Value::text("Nowak"),
            Value::text("500000000"),
            Value::text("anna.nowak@example.pl"),
            Value::id(2),
            at(1),
        ]);
        dataset.insert(customers.clone());

        let mut issues = Vec::new();
        check_foreign_keys(&dataset, &customers, &mut issues);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].column, "city_id");

        let err = GenerationError::from(issues.remove(0));
        assert_eq!(err.code(), "referential_integrity_error");
    }

    #[test]
    fn missing_tables_and_nulls_are_reported() {
        let mut dataset = Dataset::new();
        let mut cities = city_table(&[1]);
        cities.rows[0][1] = Value::Null;
        dataset.insert(cities);

        let issues = check_dataset(&dataset, &RentalConfig::default());
        assert!(issues.iter().any(|i| i.code == "unexpected_null"));
        assert_eq!(
            issues.iter().filter(|i| i.code == "missing_table").count(),
            TableName::ALL.len() - 1
        );
    }

    fn late_rental(penalty_cents: i64) -> Dataset {
        let mut payments = Table::new(TableName::Payments);
        for (id, cents, day) in [(1, 1_000, 1), (2, penalty_cents, 11)] {
            payments.push(vec![
                Value::id(id),
                Value::Money(Money::from_cents(cents)),
                Value::id(id),
                at(day),
            ]);
        }
        let mut rentals = Table::new(TableName::Rental);
        rentals.push(vec![
            Value::id(1),
            Value::id(1),
            Value::id(1),
            at(1),
            at(11),
            Value::id(1),
            Value::id(1),
            Value::id(2),
            Value::Int(8),
            at(11),
        ]);
        let mut dataset = Dataset::new();
        dataset.insert(payments);
        dataset.insert(rentals);
        dataset
    }

    #[test]
    fn penalty_must_match_days_late() {
        let rules = RentalConfig::default();

        let mut issues = Vec::new();
        check_penalties(&late_rental(200), &rules, &mut issues);
        assert!(issues.is_empty(), "{issues:?}");

        check_penalties(&late_rental(150), &rules, &mut issues);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, "penalty_mismatch");
    }

    #[test]
    fn penalty_within_grace_window_is_reported() {
        let mut rules = RentalConfig::default();
        rules.allowed_days = 10;

        let mut issues = Vec::new();
        check_penalties(&late_rental(200), &rules, &mut issues);
        assert_eq!(issues.len(), 1);
    }
}
