//! Construction of the initial [`WorldState`].
//!
//! A host loads its scenario in whatever format it likes and hands over a
//! [`WorldBootstrap`]. Everything is validated before the world exists, so a
//! running simulation never sees a dangling reference.

use crate::fixed::Fixed;
use crate::state::{CountryState, ProvinceId, ProvinceState, Rgb, Tag, Terrain, WorldState};
use crate::units::{standard_templates, TemplateCatalog, TemplateId, UnitTemplate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvinceDef {
    pub id: ProvinceId,
    pub name: String,
    #[serde(default)]
    pub terrain: Terrain,
    pub development: u32,
    pub population: u32,
    #[serde(default)]
    pub coastal: bool,
    #[serde(default)]
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryDef {
    pub tag: Tag,
    pub name: String,
    #[serde(default)]
    pub money: Fixed,
    #[serde(default)]
    pub manpower: u64,
    #[serde(default)]
    pub military_factories: u32,
    #[serde(default)]
    pub civilian_factories: u32,
    #[serde(default)]
    pub capital: Option<ProvinceId>,
    /// Provinces owned (and controlled) at the start
    #[serde(default)]
    pub provinces: Vec<ProvinceId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldBootstrap {
    pub provinces: Vec<ProvinceDef>,
    pub countries: Vec<CountryDef>,
    /// Falls back to the standard roster when omitted
    #[serde(default = "standard_templates")]
    pub templates: Vec<UnitTemplate>,
    #[serde(default)]
    pub adjacencies: Vec<(ProvinceId, ProvinceId)>,
    #[serde(default)]
    pub player: Option<Tag>,
}

impl WorldBootstrap {
    pub fn from_json_str(json: &str) -> Result<Self, BootstrapError> {
        serde_json::from_str(json).map_err(|e| BootstrapError::Parse(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BootstrapError {
    #[error("Province {0} defined twice")]
    DuplicateProvince(ProvinceId),

    #[error("Country {0} defined twice")]
    DuplicateCountry(Tag),

    #[error("Unit template {0} defined twice")]
    DuplicateTemplate(TemplateId),

    #[error("Unit template {0} has zero max hp")]
    ZeroHpTemplate(TemplateId),

    #[error("{country} owns unknown province {province}")]
    UnknownOwnedProvince { country: Tag, province: ProvinceId },

    #[error("Province {province} claimed by both {first} and {second}")]
    ProvinceClaimedTwice {
        province: ProvinceId,
        first: Tag,
        second: Tag,
    },

    #[error("{country} has unknown capital {province}")]
    UnknownCapital { country: Tag, province: ProvinceId },

    #[error("{country} does not own its capital {province}")]
    CapitalNotOwned { country: Tag, province: ProvinceId },

    #[error("Adjacency {0} - {1} references an unknown province")]
    UnknownAdjacency(ProvinceId, ProvinceId),

    #[error("Player country {0} does not exist")]
    UnknownPlayer(Tag),

    #[error("Failed to parse bootstrap: {0}")]
    Parse(String),
}

impl WorldState {
    /// Builds the initial world, rejecting the first inconsistency found.
    pub fn from_bootstrap(bootstrap: WorldBootstrap) -> Result<Self, BootstrapError> {
        build(bootstrap).inspect_err(|e| log::error!("Rejected world bootstrap: {}", e))
    }
}

fn build(bootstrap: WorldBootstrap) -> Result<WorldState, BootstrapError> {
    let mut world = WorldState {
        next_unit_id: 1,
        next_treaty_id: 1,
        ..Default::default()
    };

    // 1. Templates
    let mut templates = TemplateCatalog::new();
    for template in bootstrap.templates {
        if template.max_hp == 0 {
            return Err(BootstrapError::ZeroHpTemplate(template.id));
        }
        let id = template.id.clone();
        if !templates.insert(template) {
            return Err(BootstrapError::DuplicateTemplate(id));
        }
    }
    world.templates = templates;

    // 2. Provinces, unowned until step 3
    for def in bootstrap.provinces {
        if world.provinces.contains_key(&def.id) {
            return Err(BootstrapError::DuplicateProvince(def.id));
        }
        let province = ProvinceState {
            id: def.id,
            name: def.name,
            terrain: def.terrain,
            development: def.development,
            population: def.population,
            manpower_pool: 0,
            coastal: def.coastal,
            owner: None,
            controller: None,
            color: def.color,
        };
        world.provinces.insert(def.id, ProvinceState {
            manpower_pool: province.recruitable_manpower(),
            ..province
        });
    }
    log::info!("Loaded {} provinces", world.provinces.len());

    // 3. Countries and ownership
    let mut claims: BTreeMap<ProvinceId, Tag> = BTreeMap::new();
    for def in bootstrap.countries {
        if world.countries.contains_key(&def.tag) {
            return Err(BootstrapError::DuplicateCountry(def.tag));
        }

        let mut owned = BTreeSet::new();
        for &id in &def.provinces {
            if !world.provinces.contains_key(&id) {
                return Err(BootstrapError::UnknownOwnedProvince {
                    country: def.tag,
                    province: id,
                });
            }
            if let Some(first) = claims.get(&id) {
                if *first != def.tag {
                    return Err(BootstrapError::ProvinceClaimedTwice {
                        province: id,
                        first: first.clone(),
                        second: def.tag,
                    });
                }
            }
            claims.insert(id, def.tag.clone());
            owned.insert(id);
        }

        if let Some(capital) = def.capital {
            if !world.provinces.contains_key(&capital) {
                return Err(BootstrapError::UnknownCapital {
                    country: def.tag,
                    province: capital,
                });
            }
            if !owned.contains(&capital) {
                return Err(BootstrapError::CapitalNotOwned {
                    country: def.tag,
                    province: capital,
                });
            }
        }

        let mut country = CountryState::new(def.tag.clone(), def.name);
        country.money = def.money.non_negative();
        country.manpower = def.manpower;
        country.military_factories = def.military_factories;
        country.civilian_factories = def.civilian_factories;
        country.capital = def.capital;
        country.provinces = owned;
        world.countries.insert(def.tag, country);
    }

    for (id, tag) in claims {
        if let Some(province) = world.provinces.get_mut(&id) {
            province.owner = Some(tag.clone());
            province.controller = Some(tag);
        }
    }
    log::info!("Loaded {} countries", world.countries.len());

    // 4. Adjacency
    for (a, b) in bootstrap.adjacencies {
        if !world.provinces.contains_key(&a) || !world.provinces.contains_key(&b) {
            return Err(BootstrapError::UnknownAdjacency(a, b));
        }
        world.adjacency.add_adjacency(a, b);
    }
    log::info!("Loaded {} adjacencies", world.adjacency.edge_count());

    if let Some(player) = &bootstrap.player {
        if !world.countries.contains_key(player) {
            return Err(BootstrapError::UnknownPlayer(player.clone()));
        }
    }
    world.player = bootstrap.player;

    Ok(world)
}
