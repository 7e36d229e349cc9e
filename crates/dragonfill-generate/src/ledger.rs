//! Unified signed ledger, invoices and payments.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;

use dragonfill_core::Money;

use crate::generators::GeneratedRecords;

/// The record a ledger row was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LedgerOrigin {
    /// Inventory position of the purchased unit.
    InventoryPurchase(usize),
    Sale(usize),
    Rental(usize),
    RentalPenalty(usize),
    Maintenance(usize),
    TournamentExpense(usize),
    ParticipationFee(usize),
}

/// One monetary event. Costs are negative.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub amount: Money,
    pub invoice_code: String,
    pub date: NaiveDateTime,
    pub origin: LedgerOrigin,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    pub invoice_id: usize,
    pub code: String,
    pub date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub payment_id: usize,
    pub amount: Money,
    pub invoice_id: usize,
    pub date: NaiveDateTime,
    pub origin: LedgerOrigin,
}

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    invoices: Vec<Invoice>,
    payments: Vec<Payment>,
    by_origin: HashMap<LedgerOrigin, usize>,
}

impl Ledger {
    /// Project every monetary event and assign invoice and payment ids.
    pub fn build(records: &GeneratedRecords) -> Self {
        let entries = collect_entries(records);

        let mut seen = HashSet::new();
        let mut invoices: Vec<Invoice> = Vec::new();
        for entry in &entries {
            if seen.insert((entry.invoice_code.as_str(), entry.date)) {
                invoices.push(Invoice {
                    invoice_id: 0,
                    code: entry.invoice_code.clone(),
                    date: entry.date,
                });
            }
        }
        invoices.sort_by_key(|invoice| invoice.date);
        let mut invoice_ids = HashMap::with_capacity(invoices.len());
        for (idx, invoice) in invoices.iter_mut().enumerate() {
            invoice.invoice_id = idx + 1;
            invoice_ids.insert((invoice.code.clone(), invoice.date), invoice.invoice_id);
        }

        let mut ordered: Vec<&LedgerEntry> = entries.iter().collect();
        ordered.sort_by_key(|entry| entry.date);
        let mut payments = Vec::with_capacity(ordered.len());
        let mut by_origin = HashMap::with_capacity(ordered.len());
        for (idx, entry) in ordered.into_iter().enumerate() {
            let payment_id = idx + 1;
            let invoice_id = invoice_ids
                .get(&(entry.invoice_code.clone(), entry.date))
                .copied()
                .unwrap_or_default();
            by_origin.insert(entry.origin, payment_id);
            payments.push(Payment {
                payment_id,
                amount: entry.amount,
                invoice_id,
                date: entry.date,
                origin: entry.origin,
            });
        }

        Self {
            invoices,
            payments,
            by_origin,
        }
    }

    pub fn invoices(&self) -> &[Invoice] {
        &self.invoices
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn payment_id(&self, origin: LedgerOrigin) -> Option<usize> {
        self.by_origin.get(&origin).copied()
    }

    /// Net cash flow over the whole run.
    pub fn balance(&self) -> Money {
        self.payments
            .iter()
            .fold(Money::ZERO, |total, payment| total + payment.amount)
    }
}

fn collect_entries(records: &GeneratedRecords) -> Vec<LedgerEntry> {
    let mut entries = Vec::new();

    let mut delivery_batch = 0usize;
    let mut last_delivery = None;
    for (idx, unit) in records.inventory.units().iter().enumerate() {
        if last_delivery != Some(unit.delivery) {
            delivery_batch += 1;
            last_delivery = Some(unit.delivery);
        }
        entries.push(LedgerEntry {
            amount: -unit.purchase_cost,
            invoice_code: format!("I{delivery_batch}"),
            date: unit.delivery,
            origin: LedgerOrigin::InventoryPurchase(idx),
        });
    }

    for sale in &records.sales {
        entries.push(LedgerEntry {
            amount: sale.price,
            invoice_code: sale.invoice_code(),
            date: sale.date,
            origin: LedgerOrigin::Sale(sale.sale_id),
        });
    }

    for rental in &records.rentals {
        entries.push(LedgerEntry {
            amount: rental.price,
            invoice_code: rental.invoice_code(),
            date: rental.rental_date,
            origin: LedgerOrigin::Rental(rental.rental_id),
        });
    }
    for rental in &records.rentals {
        if let (Some(penalty), Some(returned)) = (rental.penalty, rental.return_date) {
            entries.push(LedgerEntry {
                amount: penalty,
                invoice_code: rental.penalty_code(),
                date: returned,
                origin: LedgerOrigin::RentalPenalty(rental.rental_id),
            });
        }
    }

    for expense in &records.expenses {
        entries.push(LedgerEntry {
            amount: -expense.amount,
            invoice_code: expense.invoice_code(),
            date: expense.updated_at,
            origin: LedgerOrigin::Maintenance(expense.spend_id),
        });
    }

    for tournament in &records.tournaments {
        entries.push(LedgerEntry {
            amount: -tournament.expenses,
            invoice_code: tournament.invoice_code(),
            date: tournament.start_time,
            origin: LedgerOrigin::TournamentExpense(tournament.tournament_id),
        });
    }

    for participation in &records.participations {
        entries.push(LedgerEntry {
            amount: participation.fee,
            invoice_code: participation.invoice_code(),
            date: participation.sign_up_date,
            origin: LedgerOrigin::ParticipationFee(participation.particip_id),
        });
    }

    entries
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::generators::{Inventory, Sale};

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 2, 1)
            .and_then(|date| date.and_hms_opt(hour, 0, 0))
            .expect("timestamp")
    }

    fn sale(sale_id: usize, visit: usize, hour: u32, cents: i64) -> Sale {
        Sale {
            sale_id,
            unit: 0,
            staff_id: 1,
            date: at(hour),
            price: Money::from_cents(cents),
            visit,
        }
    }

    fn records(sales: Vec<Sale>) -> GeneratedRecords {
        GeneratedRecords {
            staff: Vec::new(),
            relationships: Vec::new(),
            expenses: Vec::new(),
            tournaments: Vec::new(),
            inventory: Inventory::default(),
            sales,
            rentals: Vec::new(),
            participations: Vec::new(),
            customers: Vec::new(),
        }
    }

    #[test]
    fn one_visit_shares_one_invoice() {
        let ledger = Ledger::build(&records(vec![
            sale(1, 1, 11, 1000),
            sale(2, 1, 11, 2500),
            sale(3, 2, 12, 700),
        ]));

        assert_eq!(ledger.invoices().len(), 2);
        assert_eq!(ledger.payments().len(), 3);
        let first = ledger.payment_id(LedgerOrigin::Sale(1)).expect("payment");
        let second = ledger.payment_id(LedgerOrigin::Sale(2)).expect("payment");
        assert_eq!(
            ledger.payments()[first - 1].invoice_id,
            ledger.payments()[second - 1].invoice_id
        );
        assert_eq!(ledger.balance(), Money::from_cents(4200));
    }

    #[test]
    fn ids_follow_dates() {
        let ledger = Ledger::build(&records(vec![sale(1, 1, 15, 100), sale(2, 2, 9, 100)]));
        assert_eq!(ledger.payment_id(LedgerOrigin::Sale(2)), Some(1));
        assert_eq!(ledger.invoices()[0].code, "S2");
    }
}
