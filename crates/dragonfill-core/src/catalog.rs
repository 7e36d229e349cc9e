use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::types::Gender;

/// A purchasable game from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEntry {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    #[serde(rename = "type")]
    pub game_type: String,
    /// Eligible for tournaments.
    pub tournament: bool,
    /// Catalog purchase price.
    pub price: f64,
    /// Bracket seats filled by one team or player group.
    pub participants_number: u32,
    /// 1 is the most popular title.
    pub popularity_rank: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameEntry {
    pub name: String,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityEntry {
    pub city: String,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEntry {
    pub domain: String,
}

/// Tournament format available for a (type, category) pair of games.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentTypeEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub game_type: String,
    pub category: String,
}

/// A game that can host a named tournament.
#[derive(Debug, Clone, PartialEq)]
pub struct TournamentPairing {
    pub game: String,
    pub tournament: String,
    pub participants_number: u32,
}

/// Static reference tables consumed by the generators.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceCatalogs {
    pub games: Vec<GameEntry>,
    pub first_names_male: Vec<NameEntry>,
    pub first_names_female: Vec<NameEntry>,
    pub last_names_male: Vec<NameEntry>,
    pub last_names_female: Vec<NameEntry>,
    pub cities: Vec<CityEntry>,
    pub domains: Vec<DomainEntry>,
    pub tournament_types: Vec<TournamentTypeEntry>,
}

impl ReferenceCatalogs {
    /// Load every catalog CSV from a directory.
    pub fn load(dir: &Path) -> Result<Self> {
        Ok(Self {
            games: read_csv(&dir.join("games.csv"))?,
            first_names_male: read_csv(&dir.join("names_males.csv"))?,
            first_names_female: read_csv(&dir.join("names_females.csv"))?,
            last_names_male: read_csv(&dir.join("lastnames_males.csv"))?,
            last_names_female: read_csv(&dir.join("lastnames_females.csv"))?,
            cities: read_csv(&dir.join("cities.csv"))?,
            domains: read_csv(&dir.join("domains.csv"))?,
            tournament_types: read_csv(&dir.join("tournaments.csv"))?,
        })
    }

    /// Catalogs shipped with the crate.
    pub fn bundled() -> Result<Self> {
        Self::load(&bundled_catalog_dir())
    }

    pub fn first_names(&self, gender: Gender) -> &[NameEntry] {
        match gender {
            Gender::Male => &self.first_names_male,
            Gender::Female => &self.first_names_female,
        }
    }

    pub fn last_names(&self, gender: Gender) -> &[NameEntry] {
        match gender {
            Gender::Male => &self.last_names_male,
            Gender::Female => &self.last_names_female,
        }
    }

    pub fn game(&self, name: &str) -> Option<&GameEntry> {
        self.games.iter().find(|game| game.name == name)
    }

    /// Tournament-eligible games joined with tournament types on (type, category),
    /// in catalog order.
    pub fn tournament_pairings(&self) -> Vec<TournamentPairing> {
        self.games
            .iter()
            .filter(|game| game.tournament)
            .flat_map(|game| {
                self.tournament_types
                    .iter()
                    .filter(move |kind| {
                        kind.game_type == game.game_type && kind.category == game.category
                    })
                    .map(move |kind| TournamentPairing {
                        game: game.name.clone(),
                        tournament: kind.name.clone(),
                        participants_number: game.participants_number,
                    })
            })
            .collect()
    }
}

/// Directory holding the bundled catalog CSV files.
pub fn bundled_catalog_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("assets")
        .join("catalogs")
}

fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|err| catalog_error(path, err))?;

    reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, csv::Error>>()
        .map_err(|err| catalog_error(path, err))
}

fn catalog_error(path: &Path, err: csv::Error) -> ConfigError {
    ConfigError::Catalog {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
