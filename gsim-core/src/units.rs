//! Unit templates and live units.

use crate::fixed::Fixed;
use crate::state::{ProvinceId, Tag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub type TemplateId = String;
pub type UnitId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitCategory {
    Land,
    Sea,
    Air,
}

/// Immutable definition of a unit type.
///
/// Shared between every unit built from it; never mutated after bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitTemplate {
    pub id: TemplateId,
    pub name: String,
    pub category: UnitCategory,
    pub attack: u32,
    pub defense: u32,
    pub max_hp: u32,
    /// Money deducted on recruitment
    pub cost: Fixed,
    /// Manpower deducted on recruitment
    pub manpower_cost: u64,
    /// Nominal build time in game hours (reference data, recruitment is instant)
    pub production_hours: u32,
    #[serde(default)]
    pub speed: u32,
    #[serde(default)]
    pub combat_width: u32,
}

impl UnitTemplate {
    pub fn max_hp_fixed(&self) -> Fixed {
        Fixed::from_int(self.max_hp as i64)
    }
}

/// Read-only catalog of unit templates, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateCatalog {
    templates: BTreeMap<TemplateId, Arc<UnitTemplate>>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a template. Returns `false` (and keeps the existing entry) on a duplicate id.
    pub fn insert(&mut self, template: UnitTemplate) -> bool {
        if self.templates.contains_key(&template.id) {
            return false;
        }
        self.templates
            .insert(template.id.clone(), Arc::new(template));
        true
    }

    pub fn get(&self, id: &str) -> Option<&Arc<UnitTemplate>> {
        self.templates.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<UnitTemplate>> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// The stock 1936 roster: three land divisions, two ship classes, two air wings.
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        for template in standard_templates() {
            catalog.insert(template);
        }
        catalog
    }
}

fn template(
    id: &str,
    name: &str,
    category: UnitCategory,
    (attack, defense, max_hp): (u32, u32, u32),
    (cost, manpower_cost): (i64, u64),
    (speed, combat_width): (u32, u32),
) -> UnitTemplate {
    UnitTemplate {
        id: id.to_string(),
        name: name.to_string(),
        category,
        attack,
        defense,
        max_hp,
        cost: Fixed::from_int(cost),
        manpower_cost,
        production_hours: 24 * 30,
        speed,
        combat_width,
    }
}

pub fn standard_templates() -> Vec<UnitTemplate> {
    use UnitCategory::*;
    vec![
        template("infantry", "Infantry Division", Land, (30, 50, 100), (100, 1000), (4, 2)),
        template("armor", "Armored Division", Land, (70, 40, 150), (500, 500), (8, 3)),
        template("artillery", "Artillery Division", Land, (60, 20, 80), (300, 800), (3, 2)),
        template("destroyer", "Destroyer", Sea, (20, 30, 100), (800, 200), (30, 1)),
        template("battleship", "Battleship", Sea, (100, 80, 300), (3000, 500), (20, 3)),
        template("fighter", "Fighter Squadron", Air, (40, 30, 100), (400, 100), (500, 1)),
        template("bomber", "Bomber Squadron", Air, (80, 15, 80), (600, 150), (400, 2)),
    ]
}

/// A live military unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub template: TemplateId,
    pub owner: Tag,
    pub location: ProvinceId,
    /// Current hit points, 0..=template max
    pub hp: Fixed,
    /// Cohesion, 0..=100
    pub organization: Fixed,
    pub experience: Fixed,
}

impl Unit {
    pub fn is_destroyed(&self) -> bool {
        self.hp <= Fixed::ZERO
    }

    /// Organization as a 0..=1 factor.
    pub fn organization_factor(&self) -> Fixed {
        self.organization.clamp(Fixed::ZERO, Fixed::HUNDRED) / Fixed::HUNDRED
    }

    /// Remaining hit points as a 0..=1 factor of the template maximum.
    pub fn strength_factor(&self, template: &UnitTemplate) -> Fixed {
        let max = template.max_hp_fixed();
        if max == Fixed::ZERO {
            return Fixed::ZERO;
        }
        (self.hp.clamp(Fixed::ZERO, max)) / max
    }

    /// Removes hit points, clamped so hp never goes below zero.
    ///
    /// Returns the amount actually removed.
    pub fn lose_hp(&mut self, amount: Fixed) -> Fixed {
        let removed = amount.non_negative().min(self.hp.non_negative());
        self.hp -= removed;
        removed
    }

    pub fn lose_organization(&mut self, amount: Fixed) {
        self.organization = (self.organization - amount.non_negative()).non_negative();
    }

    pub fn recover_organization(&mut self, amount: Fixed) {
        self.organization = (self.organization + amount).min(Fixed::HUNDRED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infantry_unit() -> (UnitTemplate, Unit) {
        let template = standard_templates().remove(0);
        let unit = Unit {
            id: 1,
            template: template.id.clone(),
            owner: "GER".into(),
            location: 1,
            hp: template.max_hp_fixed(),
            organization: Fixed::HUNDRED,
            experience: Fixed::ZERO,
        };
        (template, unit)
    }

    #[test]
    fn test_standard_catalog() {
        let catalog = TemplateCatalog::standard();
        assert_eq!(catalog.len(), 7);
        let infantry = catalog.get("infantry").unwrap();
        assert_eq!(infantry.attack, 30);
        assert_eq!(infantry.cost, Fixed::from_int(100));
        assert_eq!(
            catalog.get("battleship").unwrap().category,
            UnitCategory::Sea
        );
    }

    #[test]
    fn test_duplicate_template_rejected() {
        let mut catalog = TemplateCatalog::standard();
        let mut dup = standard_templates().remove(0);
        dup.attack = 999;
        assert!(!catalog.insert(dup));
        assert_eq!(catalog.get("infantry").unwrap().attack, 30);
    }

    #[test]
    fn test_lose_hp_clamps_at_zero() {
        let (_, mut unit) = infantry_unit();
        let removed = unit.lose_hp(Fixed::from_int(250));
        assert_eq!(removed, Fixed::from_int(100));
        assert_eq!(unit.hp, Fixed::ZERO);
        assert!(unit.is_destroyed());
    }

    #[test]
    fn test_factors() {
        let (template, mut unit) = infantry_unit();
        assert_eq!(unit.organization_factor(), Fixed::ONE);
        assert_eq!(unit.strength_factor(&template), Fixed::ONE);

        unit.lose_hp(Fixed::from_int(25));
        unit.lose_organization(Fixed::from_int(50));
        assert_eq!(unit.strength_factor(&template), Fixed::from_ratio(3, 4));
        assert_eq!(unit.organization_factor(), Fixed::HALF);

        unit.recover_organization(Fixed::from_int(80));
        assert_eq!(unit.organization, Fixed::HUNDRED);
    }
}
