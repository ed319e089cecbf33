//! Town buildings, plots, and the catalog of unlockable structures.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::constants::BUILDINGS_PER_TOWN_LEVEL;

/// Stable identifier of a building type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingId(pub String);

impl BuildingId {
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self(value.trim().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BuildingId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Index of a plot on the town map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlotId(pub u8);

impl fmt::Display for PlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plot{}", self.0)
    }
}

/// A building the player can unlock and place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingDef {
    pub id: BuildingId,
    pub name: String,
    /// Wealth charged once on unlock
    pub cost: u32,
    /// Wealth credited every time the building is placed
    pub placement_bonus: u32,
    /// Wallet credited at the start of each round per placed copy
    #[serde(default)]
    pub passive_income: u32,
}

/// All buildings known to the game, ordered by unlock cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingCatalog {
    buildings: Vec<BuildingDef>,
}

impl BuildingCatalog {
    /// Build a catalog, sorting entries by ascending cost.
    #[must_use]
    pub fn new(mut buildings: Vec<BuildingDef>) -> Self {
        buildings.sort_by(|a, b| a.cost.cmp(&b.cost).then_with(|| a.id.cmp(&b.id)));
        Self { buildings }
    }

    /// Load catalog entries from a JSON array.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let buildings: Vec<BuildingDef> = serde_json::from_str(json)?;
        Ok(Self::new(buildings))
    }

    #[must_use]
    pub fn default_catalog() -> Self {
        let def = |id: &str, name: &str, cost, placement_bonus, passive_income| BuildingDef {
            id: BuildingId::new(id),
            name: name.to_string(),
            cost,
            placement_bonus,
            passive_income,
        };
        Self::new(vec![
            def("cottage", "Cottage", 100, 20, 5),
            def("bakery", "Bakery", 250, 40, 10),
            def("bank", "Bank", 400, 60, 15),
            def("library", "Library", 600, 80, 15),
            def("market", "Market", 800, 100, 25),
            def("park", "Park", 1_000, 120, 20),
            def("school", "School", 1_300, 150, 30),
            def("hospital", "Hospital", 1_800, 200, 40),
            def("tower", "Clock Tower", 2_500, 300, 50),
        ])
    }

    #[must_use]
    pub fn get(&self, id: &BuildingId) -> Option<&BuildingDef> {
        self.buildings.iter().find(|def| &def.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuildingDef> {
        self.buildings.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    /// Buildings not yet unlocked, cheapest first, limited to `count`.
    pub fn next_locked<'a, F>(&'a self, is_unlocked: F, count: usize) -> Vec<&'a BuildingDef>
    where
        F: Fn(&BuildingId) -> bool,
    {
        self.buildings
            .iter()
            .filter(|def| !is_unlocked(&def.id))
            .take(count)
            .collect()
    }

    /// Sum of passive income across placed buildings.
    #[must_use]
    pub fn passive_income(&self, placed: &BTreeMap<PlotId, BuildingId>) -> u32 {
        placed
            .values()
            .filter_map(|id| self.get(id))
            .fold(0u32, |acc, def| acc.saturating_add(def.passive_income))
    }
}

impl Default for BuildingCatalog {
    fn default() -> Self {
        Self::default_catalog()
    }
}

/// Town level derived from how many plots are built on.
#[must_use]
pub fn town_level(placed_count: usize) -> u32 {
    u32::try_from(1 + placed_count / BUILDINGS_PER_TOWN_LEVEL).unwrap_or(u32::MAX)
}
