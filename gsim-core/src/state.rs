use crate::adjacency::AdjacencyGraph;
use crate::diplomacy::{PeaceTreaty, TreatyId};
use crate::error::ActionError;
use crate::fixed::Fixed;
use crate::units::{TemplateCatalog, Unit, UnitId};
use im::OrdMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A calendar date on the simulation's 30-day-month calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Date {
    pub year: i32,
    pub month: u8, // 1-12
    pub day: u8,   // 1-30
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

impl Date {
    /// First day of the scenario.
    pub const EPOCH: Date = Date {
        year: 1936,
        month: 1,
        day: 1,
    };

    pub fn new(year: i32, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    /// Adds days on a calendar of twelve 30-day months.
    pub fn add_days(&self, days: u32) -> Self {
        let mut d = self.day as u32 + days;
        let mut m = self.month as u32;
        let mut y = self.year;

        while d > 30 {
            d -= 30;
            m += 1;
            if m > 12 {
                m -= 12;
                y += 1;
            }
        }

        Self {
            year: y,
            month: m as u8,
            day: d as u8,
        }
    }

    /// "January 1, 1936"
    pub fn long_form(&self) -> String {
        let name = MONTH_NAMES
            .get(self.month.saturating_sub(1) as usize)
            .copied()
            .unwrap_or("?");
        format!("{} {}, {}", name, self.day, self.year)
    }
}

impl Default for Date {
    fn default() -> Self {
        Self::EPOCH
    }
}

impl std::fmt::Display for Date {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.year, self.month, self.day)
    }
}

pub type Tag = String;
pub type ProvinceId = u32;

/// RGB key of a province on the rendering collaborator's id map. Opaque to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    #[default]
    Plains,
    Hills,
    Mountains,
    Forest,
    Urban,
    Marsh,
    Desert,
}

impl Terrain {
    /// Multiplier applied to the defending side's combat value.
    pub fn defense_modifier(self) -> Fixed {
        match self {
            Terrain::Plains => Fixed::ONE,
            Terrain::Hills => Fixed::from_ratio(12, 10),
            Terrain::Mountains => Fixed::from_ratio(15, 10),
            Terrain::Forest => Fixed::from_ratio(13, 10),
            Terrain::Urban => Fixed::from_ratio(14, 10),
            Terrain::Marsh => Fixed::from_ratio(11, 10),
            Terrain::Desert => Fixed::ONE,
        }
    }

    /// Multiplier applied to a province's development income.
    pub fn income_modifier(self) -> Fixed {
        match self {
            Terrain::Plains => Fixed::ONE,
            Terrain::Hills => Fixed::from_ratio(9, 10),
            Terrain::Mountains => Fixed::from_ratio(7, 10),
            Terrain::Forest => Fixed::from_ratio(9, 10),
            Terrain::Urban => Fixed::from_ratio(15, 10),
            Terrain::Marsh => Fixed::from_ratio(8, 10),
            Terrain::Desert => Fixed::from_ratio(6, 10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProvinceState {
    pub id: ProvinceId,
    pub name: String,
    pub terrain: Terrain,
    pub development: u32,
    pub population: u32,
    /// Local recruitment reservoir, drawn down by recruitment
    pub manpower_pool: u32,
    pub coastal: bool,
    /// De jure holder; changes only through diplomacy
    pub owner: Option<Tag>,
    /// Current holder; changes through occupation
    pub controller: Option<Tag>,
    pub color: Rgb,
}

impl ProvinceState {
    /// Share of the population that can be held in the manpower pool (10%).
    pub fn recruitable_manpower(&self) -> u32 {
        self.population / 10
    }

    /// True when the controller differs from the owner.
    pub fn is_occupied(&self) -> bool {
        self.owner.is_some() && self.controller != self.owner
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DiplomaticStatus {
    #[default]
    Peace,
    War,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CountryState {
    pub tag: Tag,
    pub name: String,
    /// Treasury; clamped at zero
    pub money: Fixed,
    /// National manpower bank
    pub manpower: u64,
    pub military_factories: u32,
    pub civilian_factories: u32,
    pub capital: Option<ProvinceId>,
    /// Owned provinces; mirrors `ProvinceState::owner`
    pub provinces: BTreeSet<ProvinceId>,
    /// Missing entries mean peace
    pub relations: BTreeMap<Tag, DiplomaticStatus>,
    /// One entry per ongoing war, in [-100, 100]
    pub war_scores: BTreeMap<Tag, Fixed>,
}

impl CountryState {
    pub fn new(tag: impl Into<Tag>, name: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            name: name.into(),
            money: Fixed::ZERO,
            manpower: 0,
            military_factories: 0,
            civilian_factories: 0,
            capital: None,
            provinces: BTreeSet::new(),
            relations: BTreeMap::new(),
            war_scores: BTreeMap::new(),
        }
    }

    pub fn add_money(&mut self, amount: Fixed) {
        self.money = (self.money + amount).non_negative();
    }

    /// Deducts money if the treasury covers it.
    pub fn spend_money(&mut self, amount: Fixed) -> bool {
        if self.money < amount {
            return false;
        }
        self.money -= amount;
        true
    }

    pub fn add_manpower(&mut self, amount: u64) {
        self.manpower = self.manpower.saturating_add(amount);
    }

    pub fn is_at_war_with(&self, other: &str) -> bool {
        matches!(self.relations.get(other), Some(DiplomaticStatus::War))
    }

    /// Countries this one is at war with, in tag order.
    pub fn enemies(&self) -> impl Iterator<Item = &Tag> {
        self.relations
            .iter()
            .filter(|(_, status)| **status == DiplomaticStatus::War)
            .map(|(tag, _)| tag)
    }

    pub fn at_war(&self) -> bool {
        self.enemies().next().is_some()
    }

    pub fn war_score(&self, other: &str) -> Fixed {
        self.war_scores.get(other).copied().unwrap_or(Fixed::ZERO)
    }
}

/// The whole simulation world.
///
/// Owned by the scheduler and lent to each subsystem for its slice of the
/// tick. All maps are ordered, so iteration never depends on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    pub provinces: OrdMap<ProvinceId, ProvinceState>,
    pub countries: OrdMap<Tag, CountryState>,
    pub templates: TemplateCatalog,
    pub units: OrdMap<UnitId, Unit>,
    pub next_unit_id: UnitId,
    pub adjacency: AdjacencyGraph,
    /// Country driven by the human player; skipped by the AI
    pub player: Option<Tag>,
    /// UI selection, stored for the presentation layer and never read by the core
    pub selected_province: Option<ProvinceId>,
    pub treaties: BTreeMap<TreatyId, PeaceTreaty>,
    pub next_treaty_id: TreatyId,
}

impl WorldState {
    pub fn province(&self, id: ProvinceId) -> Option<&ProvinceState> {
        self.provinces.get(&id)
    }

    pub fn country(&self, tag: &str) -> Option<&CountryState> {
        self.countries.get(tag)
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub(crate) fn country_mut(&mut self, tag: &str) -> Option<&mut CountryState> {
        self.countries.get_mut(tag)
    }

    pub(crate) fn province_mut(&mut self, id: ProvinceId) -> Option<&mut ProvinceState> {
        self.provinces.get_mut(&id)
    }

    /// Provinces owned by `tag`, in id order.
    pub fn provinces_owned_by<'a>(
        &'a self,
        tag: &str,
    ) -> impl Iterator<Item = &'a ProvinceState> + 'a {
        self.country(tag)
            .into_iter()
            .flat_map(|c| c.provinces.iter())
            .filter_map(|id| self.provinces.get(id))
    }

    pub fn are_at_war(&self, a: &str, b: &str) -> bool {
        self.country(a).is_some_and(|c| c.is_at_war_with(b))
    }

    pub fn is_player(&self, tag: &str) -> bool {
        self.player.as_deref() == Some(tag)
    }

    /// Sets a province's controller. The controller must be an existing country.
    pub fn set_controller(
        &mut self,
        province: ProvinceId,
        controller: Option<Tag>,
    ) -> Result<(), ActionError> {
        if let Some(tag) = &controller {
            if !self.countries.contains_key(tag) {
                return Err(ActionError::InvalidCountryReference(tag.clone()));
            }
        }
        let p = self
            .province_mut(province)
            .ok_or(ActionError::InvalidProvinceReference(province))?;
        p.controller = controller;
        Ok(())
    }

    /// Moves ownership of a province, keeping the owned-province sets and the
    /// capital invariant consistent. The new owner also takes control.
    ///
    /// Returns the previous owner.
    pub(crate) fn set_owner(
        &mut self,
        province: ProvinceId,
        new_owner: &str,
    ) -> Result<Option<Tag>, ActionError> {
        if !self.countries.contains_key(new_owner) {
            return Err(ActionError::InvalidCountryReference(new_owner.to_string()));
        }
        let p = self
            .province_mut(province)
            .ok_or(ActionError::InvalidProvinceReference(province))?;
        let previous = p.owner.replace(new_owner.to_string());
        p.controller = Some(new_owner.to_string());

        if let Some(old) = previous.as_deref().filter(|old| *old != new_owner) {
            if let Some(loser) = self.country_mut(old) {
                loser.provinces.remove(&province);
                if loser.capital == Some(province) {
                    // Capital falls back to the lowest remaining province
                    loser.capital = loser.provinces.iter().next().copied();
                }
            }
        }
        if let Some(winner) = self.country_mut(new_owner) {
            winner.provinces.insert(province);
        }
        Ok(previous)
    }

    /// Deterministic checksum of the complete world state.
    ///
    /// Identical states produce identical checksums; used by determinism
    /// tests and by hosts that want to detect divergence between replays.
    pub fn checksum(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();

        // Ordered maps: iteration order is already canonical
        for (id, p) in &self.provinces {
            id.hash(&mut hasher);
            p.hash(&mut hasher);
        }
        for (tag, c) in &self.countries {
            tag.hash(&mut hasher);
            c.hash(&mut hasher);
        }
        for (id, u) in &self.units {
            id.hash(&mut hasher);
            u.hash(&mut hasher);
        }
        self.next_unit_id.hash(&mut hasher);
        for t in self.templates.iter() {
            t.hash(&mut hasher);
        }
        self.adjacency.hash(&mut hasher);
        self.player.hash(&mut hasher);
        for (id, treaty) in &self.treaties {
            id.hash(&mut hasher);
            treaty.hash(&mut hasher);
        }
        self.next_treaty_id.hash(&mut hasher);

        hasher.finish()
    }
}
