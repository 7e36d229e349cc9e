//! Cleaning pass: natural keys to surrogate ids, producing the final tables.
//!
//! Runs strictly after the ledger; generator records are read-only here.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;

use dragonfill_core::{Dataset, Money, ReferenceCatalogs, Table, TableName, Value};

use crate::errors::GenerationError;
use crate::generators::GeneratedRecords;
use crate::ledger::{Ledger, LedgerOrigin};

/// A derived lookup table: label to surrogate id, ids by `updated_at`.
#[derive(Debug, Clone, Default)]
struct Lookup {
    rows: Vec<(String, NaiveDateTime)>,
    ids: HashMap<String, usize>,
}

impl Lookup {
    /// Keep the first occurrence of each label.
    fn keep_first<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, NaiveDateTime)>,
    {
        let mut rows: Vec<(String, NaiveDateTime)> = Vec::new();
        let mut seen = HashMap::new();
        for (label, at) in entries {
            if !seen.contains_key(&label) {
                seen.insert(label.clone(), rows.len());
                rows.push((label, at));
            }
        }
        Self::finish(rows)
    }

    /// Keep the last occurrence of each label.
    fn keep_last<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, NaiveDateTime)>,
    {
        let mut latest: BTreeMap<String, (usize, NaiveDateTime)> = BTreeMap::new();
        for (idx, (label, at)) in entries.into_iter().enumerate() {
            latest.insert(label, (idx, at));
        }
        let mut rows: Vec<(usize, String, NaiveDateTime)> = latest
            .into_iter()
            .map(|(label, (idx, at))| (idx, label, at))
            .collect();
        rows.sort_by_key(|(idx, _, _)| *idx);
        Self::finish(rows.into_iter().map(|(_, label, at)| (label, at)).collect())
    }

    fn finish(mut rows: Vec<(String, NaiveDateTime)>) -> Self {
        rows.sort_by_key(|(_, at)| *at);
        let ids = rows
            .iter()
            .enumerate()
            .map(|(idx, (label, _))| (label.clone(), idx + 1))
            .collect();
        Self { rows, ids }
    }

    fn id(&self, table: TableName, column: &str, label: &str) -> Result<usize, GenerationError> {
        self.ids.get(label).copied().ok_or_else(|| {
            GenerationError::integrity(table, column, format!("no row for '{label}'"))
        })
    }

    fn table(&self, name: TableName) -> Table {
        let mut table = Table::new(name);
        for (idx, (label, at)) in self.rows.iter().enumerate() {
            table.push(vec![
                Value::id(idx + 1),
                Value::text(label.clone()),
                Value::Timestamp(*at),
            ]);
        }
        table
    }
}

fn payment(
    ledger: &Ledger,
    table: TableName,
    column: &str,
    origin: LedgerOrigin,
) -> Result<usize, GenerationError> {
    ledger.payment_id(origin).ok_or_else(|| {
        GenerationError::integrity(table, column, format!("no payment for {origin:?}"))
    })
}

fn price_key(price: Money) -> String {
    price.to_string()
}

/// Build every output table from phase-one records and the ledger.
pub fn resolve(
    records: &GeneratedRecords,
    ledger: &Ledger,
    catalogs: &ReferenceCatalogs,
) -> Result<Dataset, GenerationError> {
    let mut dataset = Dataset::new();

    // Cities: customers and staff, first appearance wins.
    let mut people: Vec<(String, NaiveDateTime)> = records
        .customers
        .iter()
        .map(|customer| (customer.city.clone(), customer.updated_at))
        .chain(
            records
                .staff
                .iter()
                .map(|member| (member.city.clone(), member.updated_at)),
        )
        .collect();
    people.sort_by_key(|(_, at)| *at);
    let cities = Lookup::keep_first(people);
    dataset.insert(cities.table(TableName::City));

    // Games present in inventory, by first delivery.
    let units = records.inventory.units();
    let games = Lookup::keep_first(units.iter().map(|unit| (unit.game.clone(), unit.delivery)));
    let mut categories = Vec::new();
    let mut types = Vec::new();
    let mut game_entries = Vec::new();
    for (title, at) in &games.rows {
        let entry = catalogs.game(title).ok_or_else(|| {
            GenerationError::integrity(
                TableName::Games,
                "title",
                format!("'{title}' not in catalog"),
            )
        })?;
        categories.push((entry.category.clone(), *at));
        types.push((entry.game_type.clone(), *at));
        game_entries.push((entry, *at));
    }
    let categories = Lookup::keep_first(categories);
    let types = Lookup::keep_first(types);
    dataset.insert(categories.table(TableName::GameCategories));
    dataset.insert(types.table(TableName::GameTypes));

    let mut games_table = Table::new(TableName::Games);
    for (idx, (entry, at)) in game_entries.iter().enumerate() {
        games_table.push(vec![
            Value::id(idx + 1),
            Value::text(entry.name.clone()),
            entry.description.clone().map_or(Value::Null, Value::Text),
            Value::id(categories.id(TableName::Games, "category_id", &entry.category)?),
            Value::id(types.id(TableName::Games, "type_id", &entry.game_type)?),
            Value::Bool(entry.tournament),
            Value::Timestamp(*at),
        ]);
    }
    dataset.insert(games_table);

    // Distinct prices, the latest delivery carrying each price.
    let prices = Lookup::keep_last(
        units
            .iter()
            .filter_map(|unit| unit.price.map(|price| (price_key(price), unit.delivery))),
    );
    let price_values: HashMap<String, Money> = units
        .iter()
        .filter_map(|unit| unit.price)
        .map(|price| (price_key(price), price))
        .collect();
    let mut prices_table = Table::new(TableName::GamePrices);
    for (idx, (label, at)) in prices.rows.iter().enumerate() {
        let value = price_values.get(label).copied().unwrap_or(Money::ZERO);
        prices_table.push(vec![Value::id(idx + 1), Value::Money(value), Value::Timestamp(*at)]);
    }
    dataset.insert(prices_table);

    // Invoices and payments.
    let mut invoices = Table::new(TableName::Invoices);
    for invoice in ledger.invoices() {
        invoices.push(vec![
            Value::id(invoice.invoice_id),
            Value::Timestamp(invoice.date),
            Value::Timestamp(invoice.date),
        ]);
    }
    dataset.insert(invoices);

    let mut payments = Table::new(TableName::Payments);
    for entry in ledger.payments() {
        payments.push(vec![
            Value::id(entry.payment_id),
            Value::Money(entry.amount),
            Value::id(entry.invoice_id),
            Value::Timestamp(entry.date),
        ]);
    }
    dataset.insert(payments);

    // Inventory.
    let mut inventory = Table::new(TableName::Inventory);
    for (idx, unit) in units.iter().enumerate() {
        let price_id = match unit.price {
            Some(price) => Value::id(prices.id(
                TableName::Inventory,
                "price_id",
                &price_key(price),
            )?),
            None => Value::Null,
        };
        inventory.push(vec![
            Value::id(unit.inventory_id),
            Value::id(games.id(TableName::Inventory, "game_id", &unit.game)?),
            Value::text(unit.destination.code()),
            price_id,
            Value::Bool(unit.active),
            Value::id(payment(
                ledger,
                TableName::Inventory,
                "purchase_payment_id",
                LedgerOrigin::InventoryPurchase(idx),
            )?),
            Value::Timestamp(unit.delivery),
            Value::Timestamp(unit.delivery),
        ]);
    }
    dataset.insert(inventory);

    // Staff.
    let mut staff = Table::new(TableName::Staff);
    for member in &records.staff {
        staff.push(vec![
            Value::id(member.staff_id),
            Value::text(member.first_name.clone()),
            Value::text(member.last_name.clone()),
            Value::text(member.phone.clone()),
            Value::text(member.email.clone()),
            Value::id(cities.id(TableName::Staff, "city_id", &member.city)?),
            Value::opt_money(member.current_salary),
            Value::Bool(member.is_manager),
            Value::text(member.gender.code()),
            Value::Date(member.from_date),
            member.to_date.map_or(Value::Null, Value::Date),
            Value::Timestamp(member.updated_at),
        ]);
    }
    dataset.insert(staff);

    // Customers.
    let mut customer_ids = HashMap::with_capacity(records.customers.len());
    let mut customers = Table::new(TableName::Customers);
    for customer in &records.customers {
        customer_ids.insert(customer.pool_id, customer.customer_id);
        customers.push(vec![
            Value::id(customer.customer_id),
            Value::text(customer.first_name.clone()),
            Value::text(customer.last_name.clone()),
            Value::text(customer.phone.clone()),
            Value::text(customer.email.clone()),
            Value::id(cities.id(TableName::Customers, "city_id", &customer.city)?),
            Value::Timestamp(customer.updated_at),
        ]);
    }
    dataset.insert(customers);
    let customer_id = |table: TableName, pool_id: u32| {
        customer_ids.get(&pool_id).copied().ok_or_else(|| {
            GenerationError::integrity(table, "customer_id", format!("mock customer {pool_id}"))
        })
    };

    // Sales.
    let mut sales = Table::new(TableName::Sales);
    for sale in &records.sales {
        sales.push(vec![
            Value::id(sale.sale_id),
            Value::id(records.inventory.unit(sale.unit).inventory_id),
            Value::id(sale.staff_id),
            Value::id(payment(
                ledger,
                TableName::Sales,
                "payment_id",
                LedgerOrigin::Sale(sale.sale_id),
            )?),
            Value::Timestamp(sale.date),
            Value::Bool(false),
            Value::Timestamp(sale.date),
        ]);
    }
    dataset.insert(sales);

    // Rentals.
    let mut rentals = Table::new(TableName::Rental);
    for rental in &records.rentals {
        let penalty_payment = if rental.penalty.is_some() {
            Value::id(payment(
                ledger,
                TableName::Rental,
                "penalty_payment_id",
                LedgerOrigin::RentalPenalty(rental.rental_id),
            )?)
        } else {
            Value::Null
        };
        rentals.push(vec![
            Value::id(rental.rental_id),
            Value::id(records.inventory.unit(rental.unit).inventory_id),
            Value::id(customer_id(TableName::Rental, rental.pool_customer)?),
            Value::Timestamp(rental.rental_date),
            Value::opt_timestamp(rental.return_date),
            Value::id(rental.staff_id),
            Value::id(payment(
                ledger,
                TableName::Rental,
                "payment_id",
                LedgerOrigin::Rental(rental.rental_id),
            )?),
            penalty_payment,
            Value::Int(i64::from(rental.rate)),
            Value::Timestamp(rental.updated_at),
        ]);
    }
    dataset.insert(rentals);

    // Tournaments and participations.
    let mut tournaments = Table::new(TableName::Tournaments);
    for tournament in &records.tournaments {
        tournaments.push(vec![
            Value::id(tournament.tournament_id),
            Value::text(tournament.name.clone()),
            Value::id(games.id(TableName::Tournaments, "game_id", &tournament.game)?),
            Value::Timestamp(tournament.start_time),
            Value::Int(i64::from(tournament.matches)),
            Value::Money(tournament.fee),
            Value::Timestamp(tournament.sign_up_deadline),
            Value::id(tournament.staff_id),
            Value::id(payment(
                ledger,
                TableName::Tournaments,
                "expenses_payment_id",
                LedgerOrigin::TournamentExpense(tournament.tournament_id),
            )?),
            Value::Timestamp(tournament.updated_at),
        ]);
    }
    dataset.insert(tournaments);

    let mut participations = Table::new(TableName::Participations);
    for participation in &records.participations {
        participations.push(vec![
            Value::id(participation.particip_id),
            Value::id(participation.tournament_id),
            Value::id(customer_id(TableName::Participations, participation.pool_customer)?),
            Value::Int(i64::from(participation.place)),
            Value::Timestamp(participation.sign_up_date),
            Value::id(payment(
                ledger,
                TableName::Participations,
                "fee_payment_id",
                LedgerOrigin::ParticipationFee(participation.particip_id),
            )?),
            Value::Timestamp(participation.sign_up_date),
        ]);
    }
    dataset.insert(participations);

    // Maintenance expenses with their derived types and titles.
    let expense_types = Lookup::keep_last(
        records
            .expenses
            .iter()
            .map(|expense| (expense.expense_type.to_string(), expense.updated_at)),
    );
    let expense_titles = Lookup::keep_last(
        records
            .expenses
            .iter()
            .map(|expense| (expense.title.clone(), expense.updated_at)),
    );
    let title_types: HashMap<&str, &str> = records
        .expenses
        .iter()
        .map(|expense| (expense.title.as_str(), expense.expense_type))
        .collect();
    dataset.insert(expense_types.table(TableName::ExpenseTypes));

    let mut titles = Table::new(TableName::ExpenseTitles);
    for (idx, (title, at)) in expense_titles.rows.iter().enumerate() {
        let expense_type = title_types.get(title.as_str()).copied().unwrap_or_default();
        titles.push(vec![
            Value::id(idx + 1),
            Value::text(title.clone()),
            Value::id(expense_types.id(
                TableName::ExpenseTitles,
                "expenses_type_id",
                expense_type,
            )?),
            Value::Timestamp(*at),
        ]);
    }
    dataset.insert(titles);

    let mut expenses = Table::new(TableName::MaintenanceExpenses);
    for expense in &records.expenses {
        expenses.push(vec![
            Value::id(expense.spend_id),
            Value::id(expense_titles.id(
                TableName::MaintenanceExpenses,
                "title_id",
                &expense.title,
            )?),
            Value::id(payment(
                ledger,
                TableName::MaintenanceExpenses,
                "payment_id",
                LedgerOrigin::Maintenance(expense.spend_id),
            )?),
            Value::Date(expense.date),
            Value::Timestamp(expense.updated_at),
        ]);
    }
    dataset.insert(expenses);

    // Relationships and partners share ids.
    let mut partners = Table::new(TableName::Partners);
    let mut relationships = Table::new(TableName::Relationships);
    for relationship in &records.relationships {
        partners.push(vec![
            Value::id(relationship.relationship_id),
            Value::text(relationship.partner_name.clone()),
            Value::text(relationship.partner_gender.code()),
            Value::Timestamp(relationship.updated_at),
        ]);
        relationships.push(vec![
            Value::id(relationship.relationship_id),
            Value::id(relationship.staff_id),
            Value::id(relationship.relationship_id),
            Value::Int(i64::from(relationship.dates_number)),
            Value::Timestamp(relationship.updated_at),
        ]);
    }
    dataset.insert(partners);
    dataset.insert(relationships);

    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 4, day)
            .and_then(|date| date.and_hms_opt(10, 0, 0))
            .expect("timestamp")
    }

    #[test]
    fn keep_first_and_keep_last_order_by_time() {
        let entries = vec![
            ("b".to_string(), at(1)),
            ("a".to_string(), at(2)),
            ("b".to_string(), at(5)),
        ];
        let first = Lookup::keep_first(entries.clone());
        assert_eq!(first.rows, vec![("b".to_string(), at(1)), ("a".to_string(), at(2))]);

        let last = Lookup::keep_last(entries);
        assert_eq!(last.rows, vec![("a".to_string(), at(2)), ("b".to_string(), at(5))]);
        assert_eq!(last.ids.get("b"), Some(&2));
    }

    #[test]
    fn unknown_label_is_an_integrity_error() {
        let lookup = Lookup::keep_first(vec![("Wrocław".to_string(), at(1))]);
        let err = lookup
            .id(TableName::Customers, "city_id", "Opole")
            .expect_err("missing city");
        assert!(matches!(err, GenerationError::ReferentialIntegrity { .. }));
    }
}
