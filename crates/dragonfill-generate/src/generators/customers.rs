use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rand::Rng;

use crate::errors::GenerationError;
use crate::generators::participations::Participation;
use crate::generators::rentals::Rental;
use crate::people::PersonFactory;

/// A pool customer who actually rented a game or joined a tournament.
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub customer_id: usize,
    pub pool_id: u32,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub city: String,
    /// First transaction of the customer.
    pub updated_at: NaiveDateTime,
}

/// Materialize customers in order of their first transaction.
pub fn materialize_customers<R: Rng + ?Sized>(
    rentals: &[Rental],
    participations: &[Participation],
    people: &mut PersonFactory,
    rng: &mut R,
) -> Result<Vec<Customer>, GenerationError> {
    let mut first_seen: BTreeMap<u32, NaiveDateTime> = BTreeMap::new();
    let seen = rentals
        .iter()
        .map(|rental| (rental.pool_customer, rental.rental_date))
        .chain(
            participations
                .iter()
                .map(|participation| (participation.pool_customer, participation.sign_up_date)),
        );
    for (pool_id, at) in seen {
        first_seen
            .entry(pool_id)
            .and_modify(|first| *first = (*first).min(at))
            .or_insert(at);
    }

    let mut order: Vec<(NaiveDateTime, u32)> =
        first_seen.into_iter().map(|(pool_id, at)| (at, pool_id)).collect();
    order.sort();

    let mut customers = Vec::with_capacity(order.len());
    for (idx, (updated_at, pool_id)) in order.into_iter().enumerate() {
        let gender = people.gender(rng);
        let phone = people.phone(rng)?;
        let city = people.city(rng);
        let first_name = people.first_name(rng, gender);
        let last_name = people.last_name(rng, gender);
        let email = people.email(rng, &first_name, &last_name)?;
        customers.push(Customer {
            customer_id: idx + 1,
            pool_id,
            first_name,
            last_name,
            phone,
            email,
            city,
            updated_at,
        });
    }
    Ok(customers)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use dragonfill_core::{Money, ReferenceCatalogs};

    use super::*;
    use crate::sampling::stage_rng;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 5, day)
            .and_then(|date| date.and_hms_opt(12, 0, 0))
            .expect("timestamp")
    }

    fn rental(pool_customer: u32, day: u32) -> Rental {
        Rental {
            rental_id: 1,
            unit: 0,
            pool_customer,
            rental_date: at(day),
            return_date: None,
            staff_id: 1,
            price: Money::from_f64(10.0),
            penalty: None,
            rate: 5,
            day: 1,
            visit: 1,
            updated_at: at(day),
        }
    }

    #[test]
    fn customers_are_ordered_by_first_transaction() {
        let catalogs = ReferenceCatalogs::bundled().expect("catalogs");
        let mut people = PersonFactory::new(&catalogs, &["60".into()], 1000).expect("people");
        let participations = [Participation {
            particip_id: 1,
            tournament_id: 1,
            pool_customer: 7,
            place: 1,
            sign_up_date: at(1),
            fee: Money::from_f64(20.0),
        }];
        let rentals = [rental(3, 4), rental(7, 9), rental(3, 2)];

        let customers =
            materialize_customers(&rentals, &participations, &mut people, &mut stage_rng(1, "c"))
                .expect("customers");

        let order: Vec<(usize, u32)> = customers
            .iter()
            .map(|c| (c.customer_id, c.pool_id))
            .collect();
        assert_eq!(order, vec![(1, 7), (2, 3)]);
        assert_eq!(customers[1].updated_at, at(2));
    }
}
