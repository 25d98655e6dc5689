//! Fixture builder for tests.
//!
//! Unlike [`WorldState::from_bootstrap`](crate::state::WorldState), the builder
//! does not validate anything, so tests can set up states the bootstrap would
//! reject.

use crate::fixed::Fixed;
use crate::state::{CountryState, DiplomaticStatus, ProvinceId, ProvinceState, Rgb, Terrain, WorldState};
use crate::units::{TemplateCatalog, Unit, UnitId, UnitTemplate};

pub struct WorldStateBuilder {
    state: WorldState,
}

impl WorldStateBuilder {
    pub fn new() -> Self {
        Self {
            state: WorldState {
                templates: TemplateCatalog::standard(),
                next_unit_id: 1,
                next_treaty_id: 1,
                ..Default::default()
            },
        }
    }

    /// Adds a country with 1000 money and 10000 manpower.
    pub fn with_country(mut self, tag: &str) -> Self {
        let mut country = CountryState::new(tag, tag);
        country.money = Fixed::from_int(1000);
        country.manpower = 10_000;
        self.state.countries.insert(tag.to_string(), country);
        self
    }

    pub fn with_country_state(mut self, country: CountryState) -> Self {
        self.state.countries.insert(country.tag.clone(), country);
        self
    }

    pub fn with_money(mut self, tag: &str, money: i64) -> Self {
        if let Some(c) = self.state.countries.get_mut(tag) {
            c.money = Fixed::from_int(money);
        }
        self
    }

    pub fn with_manpower(mut self, tag: &str, manpower: u64) -> Self {
        if let Some(c) = self.state.countries.get_mut(tag) {
            c.manpower = manpower;
        }
        self
    }

    pub fn with_capital(mut self, tag: &str, province: ProvinceId) -> Self {
        if let Some(c) = self.state.countries.get_mut(tag) {
            c.capital = Some(province);
        }
        self
    }

    /// Adds a plains province (development 1, population 1000) controlled by its owner.
    pub fn with_province(self, id: ProvinceId, owner: Option<&str>) -> Self {
        self.with_province_state(ProvinceState {
            id,
            name: format!("Province {}", id),
            terrain: Terrain::Plains,
            development: 1,
            population: 1000,
            manpower_pool: 100,
            coastal: false,
            owner: owner.map(str::to_string),
            controller: owner.map(str::to_string),
            color: Rgb::default(),
        })
    }

    pub fn with_province_state(mut self, province: ProvinceState) -> Self {
        self.state.provinces.insert(province.id, province);
        self
    }

    pub fn with_adjacency(mut self, a: ProvinceId, b: ProvinceId) -> Self {
        self.state.adjacency.add_adjacency(a, b);
        self
    }

    /// Puts two countries at war with zeroed war scores.
    pub fn with_war(mut self, a: &str, b: &str) -> Self {
        for (me, them) in [(a, b), (b, a)] {
            if let Some(c) = self.state.countries.get_mut(me) {
                c.relations.insert(them.to_string(), DiplomaticStatus::War);
                c.war_scores.insert(them.to_string(), Fixed::ZERO);
            }
        }
        self
    }

    pub fn with_template(mut self, template: UnitTemplate) -> Self {
        self.state.templates.insert(template);
        self
    }

    /// Places a fresh unit directly, bypassing recruitment costs.
    pub fn with_unit(mut self, template: &str, owner: &str, location: ProvinceId) -> Self {
        let hp = self
            .state
            .templates
            .get(template)
            .map(|t| t.max_hp_fixed())
            .unwrap_or(Fixed::ZERO);
        let id: UnitId = self.state.next_unit_id;
        self.state.next_unit_id += 1;
        self.state.units.insert(
            id,
            Unit {
                id,
                template: template.to_string(),
                owner: owner.to_string(),
                location,
                hp,
                organization: Fixed::HUNDRED,
                experience: Fixed::ZERO,
            },
        );
        self
    }

    pub fn with_player(mut self, tag: &str) -> Self {
        self.state.player = Some(tag.to_string());
        self
    }

    /// Finishes the state, filling each country's owned-province set from province owners.
    pub fn build(mut self) -> WorldState {
        let owned: Vec<(String, ProvinceId)> = self
            .state
            .provinces
            .values()
            .filter_map(|p| p.owner.clone().map(|o| (o, p.id)))
            .collect();
        for (owner, id) in owned {
            if let Some(c) = self.state.countries.get_mut(&owner) {
                c.provinces.insert(id);
            }
        }
        self.state
    }
}

impl Default for WorldStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
