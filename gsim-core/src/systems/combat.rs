//! Land combat.
//!
//! Every combat interval, each province is checked for living units of two
//! owners at war with each other. Each hostile pair fights one round:
//!
//! ```text
//! attack  = Σ attack  × org × hp share                 (attacker side)
//! defense = Σ defense × org × hp share × terrain mod   (defender side)
//! roll    = value × r,  r drawn from CombatRoll
//! ```
//!
//! The higher roll wins and deals its margin times a coefficient, split
//! evenly over the losing units as hit point and organization damage.
//!
//! With more than two hostile owners in one province, pairs fight one after
//! another in lexical order, and the lexically smaller tag of each pair
//! attacks. Units killed by an earlier pair sit out later pairs.

use crate::config::{CombatConfig, DiplomacyConfig};
use crate::diplomacy;
use crate::fixed::Fixed;
use crate::observer::GameEvent;
use crate::state::{ProvinceId, Tag, WorldState};
use crate::systems::Accumulator;
use crate::units::UnitId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::instrument;

/// Source of the per-side random multiplier.
pub trait CombatRoll {
    /// A value in `[low, high]`.
    fn roll(&mut self, low: Fixed, high: Fixed) -> Fixed;
}

/// Seeded uniform rolls; the same seed gives the same battles.
#[derive(Debug, Clone)]
pub struct SeededRoll {
    rng: StdRng,
}

impl SeededRoll {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl CombatRoll for SeededRoll {
    fn roll(&mut self, low: Fixed, high: Fixed) -> Fixed {
        if low >= high {
            return low;
        }
        Fixed::from_raw(self.rng.gen_range(low.raw()..=high.raw()))
    }
}

/// Always the same multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedRoll(pub Fixed);

impl Default for FixedRoll {
    fn default() -> Self {
        Self(Fixed::ONE)
    }
}

impl CombatRoll for FixedRoll {
    fn roll(&mut self, _low: Fixed, _high: Fixed) -> Fixed {
        self.0
    }
}

/// Outcome of one round between two owners in one province.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleReport {
    pub province: ProvinceId,
    pub attacker: Tag,
    pub defender: Tag,
    pub attacker_units: Vec<UnitId>,
    pub defender_units: Vec<UnitId>,
    pub attack_value: Fixed,
    pub defense_value: Fixed,
    pub attack_roll: Fixed,
    pub defense_roll: Fixed,
    /// None on a tie
    pub winner: Option<Tag>,
    /// Total damage dealt to the losing side
    pub damage: Fixed,
    /// Hit points actually removed from the losing side
    pub hp_lost: Fixed,
}

#[derive(Debug, Clone, Default)]
pub struct CombatSystem {
    accumulator: Accumulator,
    rounds: u64,
}

impl CombatSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one round per interval crossed and returns every battle fought.
    #[instrument(skip_all, name = "combat")]
    pub fn update<R: CombatRoll>(
        &mut self,
        delta: Fixed,
        world: &mut WorldState,
        config: &CombatConfig,
        roll: &mut R,
        events: &mut Vec<GameEvent>,
    ) -> Vec<BattleReport> {
        let rounds = self.accumulator.advance(delta, config.interval_hours);
        self.rounds += rounds as u64;
        let mut reports = Vec::new();
        for _ in 0..rounds {
            for report in resolve_round(world, config, roll) {
                events.push(GameEvent::BattleFought(report.clone()));
                reports.push(report);
            }
        }
        reports
    }

    pub fn pending(&self) -> Fixed {
        self.accumulator.pending()
    }

    /// Rounds run since creation.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }
}

/// Fights one round in every contested province, in province id order.
pub fn resolve_round<R: CombatRoll>(
    world: &mut WorldState,
    config: &CombatConfig,
    roll: &mut R,
) -> Vec<BattleReport> {
    let mut by_province: FxHashMap<ProvinceId, Vec<UnitId>> = FxHashMap::default();
    for unit in world.units.values().filter(|u| !u.is_destroyed()) {
        by_province.entry(unit.location).or_default().push(unit.id);
    }

    let candidates: Vec<ProvinceId> = world
        .provinces
        .keys()
        .copied()
        .filter(|id| by_province.get(id).is_some_and(|units| units.len() >= 2))
        .collect();

    let mut reports = Vec::new();
    for province in candidates {
        let Some(unit_ids) = by_province.get(&province) else {
            continue;
        };
        let owners: BTreeSet<Tag> = unit_ids
            .iter()
            .filter_map(|id| world.unit(*id))
            .map(|u| u.owner.clone())
            .collect();
        if owners.len() < 2 {
            continue;
        }

        let owners: Vec<Tag> = owners.into_iter().collect();
        for (i, attacker) in owners.iter().enumerate() {
            for defender in &owners[i + 1..] {
                if !world.are_at_war(attacker, defender) {
                    continue;
                }
                if let Some(report) =
                    resolve_battle(world, config, roll, province, unit_ids, attacker, defender)
                {
                    log::trace!(
                        "Battle in {}: {} {} vs {} {} -> {:?}",
                        province,
                        report.attacker,
                        report.attack_roll,
                        report.defender,
                        report.defense_roll,
                        report.winner
                    );
                    reports.push(report);
                }
            }
        }
    }
    reports
}

fn living(world: &WorldState, unit_ids: &[UnitId], owner: &str) -> Vec<UnitId> {
    unit_ids
        .iter()
        .copied()
        .filter(|id| {
            world
                .unit(*id)
                .is_some_and(|u| u.owner == owner && !u.is_destroyed())
        })
        .collect()
}

/// Sum of a side's effective combat value. Units with a missing template add nothing.
fn side_value(world: &WorldState, units: &[UnitId], attacking: bool) -> Fixed {
    units
        .iter()
        .filter_map(|id| world.unit(*id))
        .filter_map(|u| world.templates.get(&u.template).map(|t| (u, t)))
        .map(|(u, t)| {
            let stat = if attacking { t.attack } else { t.defense };
            Fixed::from_int(stat as i64)
                .mul(u.organization_factor())
                .mul(u.strength_factor(t))
        })
        .sum()
}

fn resolve_battle<R: CombatRoll>(
    world: &mut WorldState,
    config: &CombatConfig,
    roll: &mut R,
    province: ProvinceId,
    unit_ids: &[UnitId],
    attacker: &str,
    defender: &str,
) -> Option<BattleReport> {
    let attacker_units = living(world, unit_ids, attacker);
    let defender_units = living(world, unit_ids, defender);
    if attacker_units.is_empty() || defender_units.is_empty() {
        return None;
    }

    let terrain = world.province(province)?.terrain;
    let attack_value = side_value(world, &attacker_units, true);
    let defense_value =
        side_value(world, &defender_units, false).mul(terrain.defense_modifier());

    let attack_roll = attack_value.mul(roll.roll(config.roll_low, config.roll_high));
    let defense_roll = defense_value.mul(roll.roll(config.roll_low, config.roll_high));

    let (winner, losers, damage) = if attack_roll > defense_roll {
        (
            Some(attacker.to_string()),
            defender_units.as_slice(),
            (attack_roll - defense_roll).mul(config.attacker_win_coefficient),
        )
    } else if defense_roll > attack_roll {
        (
            Some(defender.to_string()),
            attacker_units.as_slice(),
            (defense_roll - attack_roll).mul(config.defender_win_coefficient),
        )
    } else {
        (None, &[][..], Fixed::ZERO)
    };

    let mut hp_lost = Fixed::ZERO;
    if !losers.is_empty() && damage.is_positive() {
        let per_unit = damage.div_int(losers.len() as i64);
        let hp_damage = per_unit.mul(config.hp_damage_share);
        let org_damage = per_unit - hp_damage;
        for id in losers {
            if let Some(unit) = world.units.get_mut(id) {
                hp_lost += unit.lose_hp(hp_damage);
                unit.lose_organization(org_damage);
            }
        }
    }

    for id in attacker_units.iter().chain(defender_units.iter()) {
        if let Some(unit) = world.units.get_mut(id) {
            unit.experience += config.experience_per_round;
        }
    }

    Some(BattleReport {
        province,
        attacker: attacker.to_string(),
        defender: defender.to_string(),
        attacker_units,
        defender_units,
        attack_value,
        defense_value,
        attack_roll,
        defense_roll,
        winner,
        damage,
        hp_lost,
    })
}

/// Hands control of fought-over provinces to the side left standing.
///
/// Runs after dead units have been reaped. A province changes controller
/// only when exactly one of the owners that fought there still has units in
/// it and every enemy it fought has none. The survivor earns capture score
/// for a province it did not control, or defense score for one it did.
/// Ownership never changes here.
#[instrument(skip_all, name = "occupation")]
pub fn settle_occupations(
    world: &mut WorldState,
    reports: &[BattleReport],
    combat: &CombatConfig,
    diplomacy_config: &DiplomacyConfig,
    events: &mut Vec<GameEvent>,
) {
    let mut fought: BTreeMap<ProvinceId, BTreeSet<Tag>> = BTreeMap::new();
    for report in reports {
        let sides = fought.entry(report.province).or_default();
        sides.insert(report.attacker.clone());
        sides.insert(report.defender.clone());
    }

    for (province, sides) in fought {
        let present: BTreeSet<Tag> = world
            .units
            .values()
            .filter(|u| u.location == province && !u.is_destroyed())
            .map(|u| u.owner.clone())
            .filter(|owner| sides.contains(owner))
            .collect();
        if present.len() != 1 {
            continue;
        }
        let Some(survivor) = present.into_iter().next() else {
            continue;
        };
        let losers: Vec<Tag> = sides
            .into_iter()
            .filter(|tag| *tag != survivor && world.are_at_war(&survivor, tag))
            .collect();
        if losers.is_empty() {
            continue;
        }

        let Some(previous) = world.province(province).map(|p| p.controller.clone()) else {
            continue;
        };
        let points = if previous.as_deref() == Some(survivor.as_str()) {
            combat.defense_war_score
        } else {
            let takeable = previous
                .as_deref()
                .map_or(true, |controller| world.are_at_war(&survivor, controller));
            if !takeable {
                continue;
            }
            if world.set_controller(province, Some(survivor.clone())).is_err() {
                continue;
            }
            log::info!(
                "Province {} now controlled by {}",
                province,
                survivor
            );
            events.push(GameEvent::ProvinceOccupied {
                province,
                previous,
                controller: survivor.clone(),
            });
            combat.capture_war_score
        };

        for loser in &losers {
            diplomacy::award_war_score(world, &survivor, loser, points, diplomacy_config.max_war_score);
        }
    }
}
