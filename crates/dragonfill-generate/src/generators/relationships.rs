use chrono::NaiveDateTime;
use rand::Rng;

use dragonfill_core::{BusinessConfig, Gender};

use crate::calendar::Calendar;
use crate::errors::GenerationError;
use crate::generators::staff::StaffMember;
use crate::people::PersonFactory;
use crate::sampling::{Distributions, WeightedChoice};

/// A staff member's relationship with a partner; ids shared by both tables.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub relationship_id: usize,
    pub staff_id: usize,
    pub partner_name: String,
    pub partner_gender: Gender,
    pub dates_number: u32,
    pub updated_at: NaiveDateTime,
}

pub fn generate_relationships<R: Rng + ?Sized>(
    config: &BusinessConfig,
    calendar: &Calendar,
    staff: &[StaffMember],
    people: &PersonFactory,
    rng: &mut R,
) -> Result<Vec<Relationship>, GenerationError> {
    let params = &config.relationships;
    let last_day = calendar.last_day();
    let eligible: Vec<&StaffMember> = staff
        .iter()
        .filter(|member| member.current_salary.is_some() && member.from_date <= last_day)
        .collect();
    if eligible.is_empty() {
        return Ok(Vec::new());
    }

    let weights: Vec<f64> = eligible
        .iter()
        .map(|member| member.last_salary.as_f64())
        .collect();
    let choice = WeightedChoice::new(eligible, &weights, "relationship staff")?;
    let count = (staff.len() as f64 * params.ratio).ceil() as usize;

    let mut relationships = Vec::with_capacity(count);
    for _ in 0..count {
        let member = *choice.sample(rng);
        let day = rng.date_between(member.from_date, last_day);
        let updated_at = calendar.office_time(rng, day);
        let dates_number = rng.normal(params.avg_dates, params.std_dates).round().max(0.0) as u32;
        let partner_gender = if rng.random_bool(params.heterosexual_ratio) {
            member.gender.opposite()
        } else {
            member.gender
        };
        let partner_name = people.first_name(rng, partner_gender);

        relationships.push(Relationship {
            relationship_id: 0,
            staff_id: member.staff_id,
            partner_name,
            partner_gender,
            dates_number,
            updated_at,
        });
    }

    relationships.sort_by_key(|relationship| relationship.updated_at);
    for (idx, relationship) in relationships.iter_mut().enumerate() {
        relationship.relationship_id = idx + 1;
    }
    Ok(relationships)
}

#[cfg(test)]
mod tests {
    use dragonfill_core::{HolidayCalendar, ReferenceCatalogs};

    use super::*;
    use crate::generators::staff::generate_staff;
    use crate::sampling::stage_rng;

    #[test]
    fn relationships_follow_salaried_staff() {
        let mut config = BusinessConfig::default();
        config.shop.lifetime_days = Some(400);
        config.shop.holidays = HolidayCalendar::None;
        let catalogs = ReferenceCatalogs::bundled().expect("catalogs");
        let calendar = Calendar::build(&config, &mut stage_rng(1, "calendar")).expect("calendar");
        let mut people =
            PersonFactory::new(&catalogs, &config.shop.phone_prefixes, 1000).expect("people");
        let staff = generate_staff(&config, &calendar, &mut people, &mut stage_rng(1, "staff"))
            .expect("staff");

        let relationships = generate_relationships(
            &config,
            &calendar,
            &staff,
            &people,
            &mut stage_rng(1, "relationships"),
        )
        .expect("relationships");

        assert_eq!(relationships.len(), 9);
        for relationship in &relationships {
            let member = &staff[relationship.staff_id - 1];
            assert!(member.current_salary.is_some());
            assert!(relationship.updated_at.date() >= member.from_date);
        }
        assert!(
            relationships
                .windows(2)
                .all(|w| w[0].updated_at <= w[1].updated_at)
        );
    }
}
