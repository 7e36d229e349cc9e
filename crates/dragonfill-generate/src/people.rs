//! Demographic attributes shared by staff, customers and partners.

use rand::Rng;
use rand::seq::IndexedRandom;

use dragonfill_core::{Gender, NameEntry, ReferenceCatalogs};

use crate::errors::GenerationError;
use crate::sampling::WeightedChoice;
use crate::unique::UniqueSampler;

#[derive(Debug, Clone)]
struct GenderedNames {
    male: WeightedChoice<String>,
    female: WeightedChoice<String>,
}

impl GenderedNames {
    fn new(male: &[NameEntry], female: &[NameEntry], label: &str) -> Result<Self, GenerationError> {
        Ok(Self {
            male: name_choice(male, label)?,
            female: name_choice(female, label)?,
        })
    }

    fn get(&self, gender: Gender) -> &WeightedChoice<String> {
        match gender {
            Gender::Male => &self.male,
            Gender::Female => &self.female,
        }
    }
}

fn name_choice(
    entries: &[NameEntry],
    label: &str,
) -> Result<WeightedChoice<String>, GenerationError> {
    let names = entries.iter().map(|entry| entry.name.clone()).collect();
    let weights: Vec<f64> = entries.iter().map(|entry| entry.probability).collect();
    WeightedChoice::new(names, &weights, label)
}

/// Draws names, cities and contact details.
///
/// Phones and e-mails are unique across everybody drawn from one factory, so
/// staff and customers of a run share a single factory.
#[derive(Debug, Clone)]
pub struct PersonFactory {
    first_names: GenderedNames,
    last_names: GenderedNames,
    cities: WeightedChoice<String>,
    domains: Vec<String>,
    phone_prefixes: Vec<String>,
    phones: UniqueSampler,
    emails: UniqueSampler,
}

impl PersonFactory {
    pub fn new(
        catalogs: &ReferenceCatalogs,
        phone_prefixes: &[String],
        max_attempts: u32,
    ) -> Result<Self, GenerationError> {
        let cities = catalogs.cities.iter().map(|entry| entry.city.clone()).collect();
        let city_weights: Vec<f64> = catalogs
            .cities
            .iter()
            .map(|entry| entry.probability)
            .collect();
        let domains: Vec<String> = catalogs
            .domains
            .iter()
            .map(|entry| entry.domain.clone())
            .collect();
        if domains.is_empty() {
            return Err(GenerationError::invariant("e-mail domain catalog is empty"));
        }
        if phone_prefixes.is_empty() {
            return Err(GenerationError::invariant("no phone prefixes configured"));
        }

        Ok(Self {
            first_names: GenderedNames::new(
                &catalogs.first_names_male,
                &catalogs.first_names_female,
                "first names",
            )?,
            last_names: GenderedNames::new(
                &catalogs.last_names_male,
                &catalogs.last_names_female,
                "last names",
            )?,
            cities: WeightedChoice::new(cities, &city_weights, "cities")?,
            domains,
            phone_prefixes: phone_prefixes.to_vec(),
            phones: UniqueSampler::new("phone number", max_attempts),
            emails: UniqueSampler::new("e-mail address", max_attempts),
        })
    }

    pub fn gender<R: Rng + ?Sized>(&self, rng: &mut R) -> Gender {
        if rng.random_bool(0.5) {
            Gender::Male
        } else {
            Gender::Female
        }
    }

    pub fn first_name<R: Rng + ?Sized>(&self, rng: &mut R, gender: Gender) -> String {
        self.first_names.get(gender).sample(rng).clone()
    }

    pub fn last_name<R: Rng + ?Sized>(&self, rng: &mut R, gender: Gender) -> String {
        self.last_names.get(gender).sample(rng).clone()
    }

    pub fn city<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        self.cities.sample(rng).clone()
    }

    /// Mobile number: a configured prefix followed by seven digits.
    pub fn phone<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<String, GenerationError> {
        let prefixes = &self.phone_prefixes;
        self.phones.draw(|_| {
            let prefix = prefixes.choose(rng).map(String::as_str).unwrap_or_default();
            format!("{prefix}{:07}", rng.random_range(0..10_000_000u32))
        })
    }

    /// `first.last@domain`, with a numeric suffix once the plain form is taken.
    pub fn email<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        first_name: &str,
        last_name: &str,
    ) -> Result<String, GenerationError> {
        let local = format!("{}.{}", ascii_slug(first_name), ascii_slug(last_name));
        let domains = &self.domains;
        self.emails.draw(|attempt| {
            let domain = domains.choose(rng).map(String::as_str).unwrap_or_default();
            if attempt == 0 {
                format!("{local}@{domain}")
            } else {
                let digits = 1 + attempt / 10;
                let bound = 10u64.saturating_pow(digits.min(18));
                format!("{local}{}@{domain}", rng.random_range(0..bound))
            }
        })
    }
}

/// Lowercase ASCII form of a name, folding Polish diacritics.
pub fn ascii_slug(value: &str) -> String {
    value
        .chars()
        .map(|ch| match ch {
            'ą' | 'Ą' => 'a',
            'ć' | 'Ć' => 'c',
            'ę' | 'Ę' => 'e',
            'ł' | 'Ł' => 'l',
            'ń' | 'Ń' => 'n',
            'ó' | 'Ó' => 'o',
            'ś' | 'Ś' => 's',
            'ź' | 'Ź' | 'ż' | 'Ż' => 'z',
            other => other,
        })
        .filter(|ch| ch.is_ascii_alphanumeric())
        .flat_map(|ch| ch.to_lowercase())
        .collect()
}
