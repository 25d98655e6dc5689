//! Unit lifecycle: recruitment, movement, recovery and removal.
//!
//! Every path that creates, relocates or deletes a unit goes through this
//! module.

use crate::config::MilitaryConfig;
use crate::error::ActionError;
use crate::fixed::Fixed;
use crate::observer::GameEvent;
use crate::state::{ProvinceId, Tag, WorldState};
use crate::systems::Accumulator;
use crate::units::{Unit, UnitCategory, UnitId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::instrument;

#[derive(Debug, Clone, Default)]
pub struct MilitarySystem {
    accumulator: Accumulator,
}

impl MilitarySystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one organization recovery pass per interval crossed.
    #[instrument(skip_all, name = "military")]
    pub fn update(&mut self, delta: Fixed, world: &mut WorldState, config: &MilitaryConfig) -> u32 {
        let passes = self.accumulator.advance(delta, config.interval_hours);
        for _ in 0..passes {
            recover_organization(world, config.org_recovery_per_pass);
        }
        passes
    }

    pub fn pending(&self) -> Fixed {
        self.accumulator.pending()
    }
}

/// Recruits a unit, paying its money and manpower cost.
///
/// The location's manpower pool is drawn down by up to the manpower cost.
/// Nothing is mutated on error.
pub fn create_unit(
    world: &mut WorldState,
    template_id: &str,
    owner: &str,
    location: ProvinceId,
) -> Result<Unit, ActionError> {
    let template = world
        .templates
        .get(template_id)
        .cloned()
        .ok_or_else(|| ActionError::InvalidTemplate(template_id.to_string()))?;
    let country = world
        .country(owner)
        .ok_or_else(|| ActionError::InvalidCountryReference(owner.to_string()))?;
    if world.province(location).is_none() {
        return Err(ActionError::InvalidProvinceReference(location));
    }
    if country.money < template.cost || country.manpower < template.manpower_cost {
        return Err(ActionError::InsufficientResources {
            country: owner.to_string(),
            money_required: template.cost,
            money_available: country.money,
            manpower_required: template.manpower_cost,
            manpower_available: country.manpower,
        });
    }

    if let Some(country) = world.country_mut(owner) {
        country.money -= template.cost;
        country.manpower -= template.manpower_cost;
    }
    if let Some(province) = world.province_mut(location) {
        let drawn = (province.manpower_pool as u64).min(template.manpower_cost) as u32;
        province.manpower_pool -= drawn;
    }

    let id = world.next_unit_id;
    world.next_unit_id += 1;
    let unit = Unit {
        id,
        template: template.id.clone(),
        owner: owner.to_string(),
        location,
        hp: template.max_hp_fixed(),
        organization: Fixed::HUNDRED,
        experience: Fixed::ZERO,
    };
    world.units.insert(id, unit.clone());

    log::debug!(
        "{} recruited {} #{} in province {}",
        owner,
        template.id,
        id,
        location
    );
    Ok(unit)
}

/// Units in a province, in id order.
pub fn units_in_province(world: &WorldState, province: ProvinceId) -> Vec<&Unit> {
    world
        .units
        .values()
        .filter(|u| u.location == province)
        .collect()
}

/// Units owned by `tag`, in id order.
pub fn units_of<'a>(world: &'a WorldState, tag: &str) -> Vec<&'a Unit> {
    world.units.values().filter(|u| u.owner == tag).collect()
}

/// Live units of `tag` whose template is in `category`.
pub fn count_units_by_category(world: &WorldState, tag: &str, category: UnitCategory) -> usize {
    world
        .units
        .values()
        .filter(|u| u.owner == tag && !u.is_destroyed())
        .filter(|u| {
            world
                .templates
                .get(&u.template)
                .is_some_and(|t| t.category == category)
        })
        .count()
}

/// Relocates a unit immediately. Returns where it came from.
pub fn move_unit(
    world: &mut WorldState,
    unit_id: UnitId,
    destination: ProvinceId,
) -> Result<ProvinceId, ActionError> {
    if world.province(destination).is_none() {
        return Err(ActionError::InvalidDestination(destination));
    }
    let unit = world
        .units
        .get_mut(&unit_id)
        .ok_or(ActionError::InvalidUnitReference(unit_id))?;
    let from = unit.location;
    unit.location = destination;
    log::debug!("Unit #{} moved {} -> {}", unit_id, from, destination);
    Ok(from)
}

/// Provinces holding living units of at least two owners at war with each other.
pub fn contested_provinces(world: &WorldState) -> BTreeSet<ProvinceId> {
    let mut owners: BTreeMap<ProvinceId, BTreeSet<&Tag>> = BTreeMap::new();
    for unit in world.units.values().filter(|u| !u.is_destroyed()) {
        owners.entry(unit.location).or_default().insert(&unit.owner);
    }

    owners
        .into_iter()
        .filter(|(_, tags)| {
            tags.iter()
                .any(|a| tags.iter().any(|b| a < b && world.are_at_war(a, b)))
        })
        .map(|(province, _)| province)
        .collect()
}

fn recover_organization(world: &mut WorldState, amount: Fixed) {
    let contested = contested_provinces(world);
    let recovering: Vec<UnitId> = world
        .units
        .values()
        .filter(|u| !u.is_destroyed() && !contested.contains(&u.location))
        .filter(|u| u.organization < Fixed::HUNDRED)
        .map(|u| u.id)
        .collect();

    for id in recovering {
        if let Some(unit) = world.units.get_mut(&id) {
            unit.recover_organization(amount);
        }
    }
}

/// Removes every unit with no hit points left.
///
/// Only called once combat has finished for the tick, so nothing ever
/// iterates the unit map while units are being deleted from it.
#[instrument(skip_all, name = "reap")]
pub fn reap_destroyed(world: &mut WorldState, events: &mut Vec<GameEvent>) -> Vec<Unit> {
    let dead: Vec<UnitId> = world
        .units
        .values()
        .filter(|u| u.is_destroyed())
        .map(|u| u.id)
        .collect();

    let mut removed = Vec::with_capacity(dead.len());
    for id in dead {
        if let Some(unit) = world.units.remove(&id) {
            log::debug!("Unit #{} ({}) destroyed in province {}", unit.id, unit.owner, unit.location);
            events.push(GameEvent::UnitDestroyed {
                unit: unit.id,
                owner: unit.owner.clone(),
                province: unit.location,
            });
            removed.push(unit);
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::WorldStateBuilder;

    fn world() -> WorldState {
        WorldStateBuilder::new()
            .with_country("A")
            .with_country("B")
            .with_province(1, Some("A"))
            .with_province(2, Some("B"))
            .build()
    }

    #[test]
    fn test_create_unit_deducts_costs() {
        let mut world = world();
        let unit = create_unit(&mut world, "infantry", "A", 1).unwrap();

        assert_eq!(unit.id, 1);
        assert_eq!(unit.hp, Fixed::from_int(100));
        assert_eq!(unit.organization, Fixed::HUNDRED);
        assert_eq!(unit.experience, Fixed::ZERO);
        let a = world.country("A").unwrap();
        assert_eq!(a.money, Fixed::from_int(900));
        assert_eq!(a.manpower, 9000);
        // Pool of 100 drawn to zero
        assert_eq!(world.province(1).unwrap().manpower_pool, 0);

        let second = create_unit(&mut world, "infantry", "A", 1).unwrap();
        assert_eq!(second.id, 2);
    }

    #[test]
    fn test_create_unit_insufficient_resources() {
        let mut world = WorldStateBuilder::new()
            .with_country("A")
            .with_money("A", 50)
            .with_manpower("A", 10_000)
            .with_province(1, Some("A"))
            .build();
        let before = world.clone();

        let err = create_unit(&mut world, "infantry", "A", 1).unwrap_err();
        assert_eq!(
            err,
            ActionError::InsufficientResources {
                country: "A".into(),
                money_required: Fixed::from_int(100),
                money_available: Fixed::from_int(50),
                manpower_required: 1000,
                manpower_available: 10_000,
            }
        );
        assert!(world.units.is_empty());
        assert_eq!(world, before);
    }

    #[test]
    fn test_create_unit_validation() {
        let mut world = world();
        assert_eq!(
            create_unit(&mut world, "zeppelin", "A", 1),
            Err(ActionError::InvalidTemplate("zeppelin".into()))
        );
        assert_eq!(
            create_unit(&mut world, "infantry", "X", 1),
            Err(ActionError::InvalidCountryReference("X".into()))
        );
        assert_eq!(
            create_unit(&mut world, "infantry", "A", 99),
            Err(ActionError::InvalidProvinceReference(99))
        );
    }

    #[test]
    fn test_move_unit() {
        let mut world = WorldStateBuilder::new()
            .with_country("A")
            .with_province(1, Some("A"))
            .with_province(2, Some("A"))
            .with_unit("infantry", "A", 1)
            .build();

        assert_eq!(move_unit(&mut world, 1, 2), Ok(1));
        assert_eq!(world.unit(1).unwrap().location, 2);
        assert_eq!(move_unit(&mut world, 1, 77), Err(ActionError::InvalidDestination(77)));
        assert_eq!(move_unit(&mut world, 9, 1), Err(ActionError::InvalidUnitReference(9)));
        assert_eq!(world.unit(1).unwrap().location, 2);
    }

    #[test]
    fn test_queries_are_ordered() {
        let world = WorldStateBuilder::new()
            .with_country("A")
            .with_country("B")
            .with_province(1, Some("A"))
            .with_unit("infantry", "B", 1)
            .with_unit("destroyer", "A", 1)
            .with_unit("armor", "A", 1)
            .build();

        let ids: Vec<_> = units_in_province(&world, 1).iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(units_of(&world, "A").len(), 2);
        assert_eq!(count_units_by_category(&world, "A", UnitCategory::Land), 1);
        assert_eq!(count_units_by_category(&world, "A", UnitCategory::Sea), 1);
    }

    #[test]
    fn test_category_count_skips_dead_units() {
        let mut world = WorldStateBuilder::new()
            .with_country("A")
            .with_province(1, Some("A"))
            .with_unit("infantry", "A", 1)
            .with_unit("infantry", "A", 1)
            .build();
        world.units.get_mut(&1).unwrap().hp = Fixed::ZERO;

        // Dead but not yet reaped
        assert_eq!(count_units_by_category(&world, "A", UnitCategory::Land), 1);
    }

    #[test]
    fn test_org_recovery_skips_contested() {
        let mut world = WorldStateBuilder::new()
            .with_country("A")
            .with_country("B")
            .with_province(1, Some("A"))
            .with_province(2, Some("B"))
            .with_war("A", "B")
            .with_unit("infantry", "A", 1)
            .with_unit("infantry", "B", 1)
            .with_unit("infantry", "B", 2)
            .build();
        for id in 1..=3 {
            world.units.get_mut(&id).unwrap().organization = Fixed::from_int(50);
        }

        let mut military = MilitarySystem::new();
        let passes = military.update(Fixed::from_int(3), &mut world, &MilitaryConfig::default());
        assert_eq!(passes, 3);
        assert_eq!(world.unit(1).unwrap().organization, Fixed::from_int(50));
        assert_eq!(world.unit(2).unwrap().organization, Fixed::from_int(50));
        assert_eq!(world.unit(3).unwrap().organization, Fixed::from_int(56));
    }

    #[test]
    fn test_units_at_peace_do_not_contest() {
        let world = WorldStateBuilder::new()
            .with_country("A")
            .with_country("B")
            .with_province(1, Some("A"))
            .with_unit("infantry", "A", 1)
            .with_unit("infantry", "B", 1)
            .build();
        assert!(contested_provinces(&world).is_empty());
    }

    #[test]
    fn test_reap_destroyed() {
        let mut world = WorldStateBuilder::new()
            .with_country("A")
            .with_province(1, Some("A"))
            .with_unit("infantry", "A", 1)
            .with_unit("infantry", "A", 1)
            .build();
        world.units.get_mut(&1).unwrap().hp = Fixed::ZERO;

        let mut events = Vec::new();
        let removed = reap_destroyed(&mut world, &mut events);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, 1);
        assert!(world.unit(1).is_none());
        assert!(world.unit(2).is_some());
        assert!(matches!(events[0], GameEvent::UnitDestroyed { unit: 1, .. }));
    }
}
