use chrono::NaiveDateTime;
use rand::Rng;

use dragonfill_core::{BusinessConfig, Destination, Money};

use crate::calendar::Calendar;
use crate::errors::GenerationError;
use crate::generators::inventory::Inventory;
use crate::generators::staff::ShiftGrid;
use crate::sampling::WeightedChoice;

/// One unit sold; several sales of one visit share an invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct Sale {
    pub sale_id: usize,
    /// Position of the unit in the inventory.
    pub unit: usize,
    pub staff_id: usize,
    pub date: NaiveDateTime,
    pub price: Money,
    pub visit: usize,
}

impl Sale {
    pub fn invoice_code(&self) -> String {
        format!("S{}", self.visit)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalesOutcome {
    pub sales: Vec<Sale>,
    /// Units wanted before any sale stock had been delivered.
    pub dropped: u64,
}

/// Sell units in delivery order, visit by visit.
pub fn generate_sales<R: Rng + ?Sized>(
    config: &BusinessConfig,
    calendar: &Calendar,
    grid: &ShiftGrid,
    inventory: &mut Inventory,
    rng: &mut R,
) -> Result<SalesOutcome, GenerationError> {
    let pieces: Vec<u32> = config
        .customers
        .pieces_per_visit
        .iter()
        .map(|entry| entry.pieces)
        .collect();
    let weights: Vec<f64> = config
        .customers
        .pieces_per_visit
        .iter()
        .map(|entry| entry.probability)
        .collect();
    let pieces = WeightedChoice::new(pieces, &weights, "pieces per visit")?;

    let stock = inventory.positions(Destination::Sale);
    let mut cursor = 0usize;
    let mut outcome = SalesOutcome::default();
    let mut visit = 0usize;

    for day in calendar.days() {
        let mut visits: Vec<NaiveDateTime> = (0..day.volume_sales)
            .map(|_| calendar.visit_time(rng, day.date))
            .collect();
        visits.sort();

        for at in visits {
            visit += 1;
            let staff_id = grid.on_duty(rng, at)?;
            let count = *pieces.sample(rng);
            for _ in 0..count {
                let Some(&unit) = stock.get(cursor) else {
                    return Err(GenerationError::invariant(format!(
                        "sale stock exhausted after {} units at {at}",
                        stock.len()
                    )));
                };
                let candidate = inventory.unit(unit);
                if candidate.delivery > at {
                    outcome.dropped += 1;
                    continue;
                }
                let price = candidate.price.ok_or_else(|| {
                    GenerationError::invariant(format!(
                        "sale unit {} has no price",
                        candidate.inventory_id
                    ))
                })?;
                inventory.deactivate(unit);
                cursor += 1;

                outcome.sales.push(Sale {
                    sale_id: outcome.sales.len() + 1,
                    unit,
                    staff_id,
                    date: at,
                    price,
                    visit,
                });
            }
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use dragonfill_core::{HolidayCalendar, ReferenceCatalogs};

    use super::*;
    use crate::generators::inventory::generate_inventory;
    use crate::generators::staff::generate_staff;
    use crate::people::PersonFactory;
    use crate::sampling::stage_rng;

    #[test]
    fn sales_consume_delivered_units_once() {
        let mut config = BusinessConfig::default();
        config.shop.lifetime_days = Some(120);
        config.shop.holidays = HolidayCalendar::None;
        let catalogs = ReferenceCatalogs::bundled().expect("catalogs");
        let calendar = Calendar::build(&config, &mut stage_rng(1, "calendar")).expect("calendar");
        let mut people =
            PersonFactory::new(&catalogs, &config.shop.phone_prefixes, 1000).expect("people");
        let staff = generate_staff(&config, &calendar, &mut people, &mut stage_rng(1, "staff"))
            .expect("staff");
        let grid = ShiftGrid::build(&config, &staff);
        let mut inventory = generate_inventory(
            &config,
            &catalogs,
            &calendar,
            &BTreeMap::new(),
            &mut stage_rng(1, "inventory"),
        )
        .expect("inventory");

        let outcome = generate_sales(
            &config,
            &calendar,
            &grid,
            &mut inventory,
            &mut stage_rng(1, "sales"),
        )
        .expect("sales");

        assert!(!outcome.sales.is_empty());
        let mut units: Vec<usize> = outcome.sales.iter().map(|sale| sale.unit).collect();
        units.sort_unstable();
        units.dedup();
        assert_eq!(units.len(), outcome.sales.len());

        for sale in &outcome.sales {
            let unit = inventory.unit(sale.unit);
            assert_eq!(unit.destination, Destination::Sale);
            assert!(unit.delivery <= sale.date);
            assert!(!unit.active);
            assert_eq!(Some(sale.price), unit.price);
        }
        assert!(outcome.sales.windows(2).all(|w| w[0].date <= w[1].date));
    }
}
