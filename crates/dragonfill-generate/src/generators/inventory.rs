//! Sale, rental and tournament stock.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rand::Rng;
use rand::seq::{SliceRandom, index};

use dragonfill_core::{BusinessConfig, Destination, Money, ReferenceCatalogs};

use crate::calendar::Calendar;
use crate::errors::GenerationError;
use crate::popularity::Popularity;
use crate::sampling::Distributions;

/// One physical copy of a game.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryUnit {
    pub inventory_id: usize,
    pub game: String,
    pub destination: Destination,
    /// Shelf price for sales, rental fee for rentals, none for tournament copies.
    pub price: Option<Money>,
    pub purchase_cost: Money,
    pub active: bool,
    pub delivery: NaiveDateTime,
}

/// All units, sorted by delivery, ids `1..=N` in that order.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    units: Vec<InventoryUnit>,
}

impl Inventory {
    pub fn units(&self) -> &[InventoryUnit] {
        &self.units
    }

    pub fn unit(&self, idx: usize) -> &InventoryUnit {
        &self.units[idx]
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn deactivate(&mut self, idx: usize) {
        self.units[idx].active = false;
    }

    /// Positions of units with the given destination, in delivery order.
    pub fn positions(&self, destination: Destination) -> Vec<usize> {
        self.units
            .iter()
            .enumerate()
            .filter(|(_, unit)| unit.destination == destination)
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn count(&self, destination: Destination) -> usize {
        self.units
            .iter()
            .filter(|unit| unit.destination == destination)
            .count()
    }
}

struct StockBuilder<'a> {
    catalogs: &'a ReferenceCatalogs,
    bulk_ratio: f64,
    units: Vec<InventoryUnit>,
}

impl StockBuilder<'_> {
    fn push(
        &mut self,
        game: &str,
        destination: Destination,
        price_ratio: Option<f64>,
        active: bool,
        delivery: NaiveDateTime,
    ) -> Result<(), GenerationError> {
        let entry = self.catalogs.game(game).ok_or_else(|| {
            GenerationError::invariant(format!("game '{game}' is missing from the catalog"))
        })?;
        self.units.push(InventoryUnit {
            inventory_id: 0,
            game: game.to_string(),
            destination,
            price: price_ratio.map(|ratio| Money::from_f64(entry.price * ratio)),
            purchase_cost: Money::from_f64(entry.price * self.bulk_ratio),
            active,
            delivery,
        });
        Ok(())
    }
}

/// Build every stock pool and merge them by delivery time.
pub fn generate_inventory<R: Rng + ?Sized>(
    config: &BusinessConfig,
    catalogs: &ReferenceCatalogs,
    calendar: &Calendar,
    tournament_depths: &BTreeMap<String, u32>,
    rng: &mut R,
) -> Result<Inventory, GenerationError> {
    let popularity = Popularity::new(&catalogs.games)?;
    let mut builder = StockBuilder {
        catalogs,
        bulk_ratio: config.inventory.bulk_ratio,
        units: Vec::new(),
    };

    sale_stock(config, calendar, &popularity, &mut builder, rng)?;
    rental_stock(config, calendar, &popularity, &mut builder, rng)?;
    tournament_stock(calendar, tournament_depths, &mut builder, rng)?;

    let mut units = builder.units;
    units.sort_by_key(|unit| unit.delivery);
    for (idx, unit) in units.iter_mut().enumerate() {
        unit.inventory_id = idx + 1;
    }
    Ok(Inventory { units })
}

fn sale_stock<R: Rng + ?Sized>(
    config: &BusinessConfig,
    calendar: &Calendar,
    popularity: &Popularity,
    builder: &mut StockBuilder<'_>,
    rng: &mut R,
) -> Result<(), GenerationError> {
    let inventory = &config.inventory;
    let jitter = rng.exponential(1.0);
    let total = calendar.total_sales_volume() as f64 * (inventory.multiplier + jitter);

    let mut titles: Vec<String> = popularity
        .distribute(total)
        .into_iter()
        .flat_map(|(game, n)| std::iter::repeat_n(game, n as usize))
        .collect();
    titles.shuffle(rng);

    let deliveries = delivery_schedule(
        calendar,
        inventory.avg_supply_yearly_rate,
        config.lifetime_days(),
    );
    let batch = titles.len().div_ceil(deliveries.len()).max(1);
    for (k, game) in titles.iter().enumerate() {
        let delivery = deliveries[(k / batch).min(deliveries.len() - 1)];
        builder.push(game, Destination::Sale, Some(1.0), true, delivery)?;
    }
    Ok(())
}

/// Delivery times spread evenly over the business calendar, first one on
/// opening day.
pub fn delivery_schedule(
    calendar: &Calendar,
    yearly_rate: u32,
    lifetime_days: u32,
) -> Vec<NaiveDateTime> {
    let years = f64::from(lifetime_days) / 365.0;
    let wanted = ((f64::from(yearly_rate) * years).round() as usize).max(1);
    let count = wanted.min(calendar.len());
    let step = (calendar.len() / count).max(1);
    calendar
        .days()
        .iter()
        .step_by(step)
        .take(count)
        .map(|day| calendar.opening_time(day.date))
        .collect()
}

fn rental_stock<R: Rng + ?Sized>(
    config: &BusinessConfig,
    calendar: &Calendar,
    popularity: &Popularity,
    builder: &mut StockBuilder<'_>,
    rng: &mut R,
) -> Result<(), GenerationError> {
    let inventory = &config.inventory;
    let titles: Vec<String> = popularity
        .distribute(f64::from(inventory.rental_games_n))
        .into_iter()
        .flat_map(|(game, n)| std::iter::repeat_n(game, n as usize))
        .collect();

    let inactive_count = (inventory.inactive_rental_games as usize).min(titles.len());
    let mut inactive = vec![false; titles.len()];
    for idx in index::sample(rng, titles.len(), inactive_count) {
        inactive[idx] = true;
    }

    let opening = calendar.opening_time(calendar.first_day());
    for (game, inactive) in titles.iter().zip(inactive) {
        builder.push(
            game,
            Destination::Rent,
            Some(config.rental.price_ratio),
            !inactive,
            opening,
        )?;
    }
    Ok(())
}

fn tournament_stock<R: Rng + ?Sized>(
    calendar: &Calendar,
    depths: &BTreeMap<String, u32>,
    builder: &mut StockBuilder<'_>,
    rng: &mut R,
) -> Result<(), GenerationError> {
    let mut titles: Vec<&String> = depths
        .iter()
        .flat_map(|(game, depth)| std::iter::repeat_n(game, 1usize << depth))
        .collect();
    titles.shuffle(rng);

    let opening = calendar.opening_time(calendar.first_day());
    for game in titles {
        builder.push(game, Destination::Tournament, None, true, opening)?;
    }
    Ok(())
}
