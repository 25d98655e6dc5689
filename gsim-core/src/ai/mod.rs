//! AI decision loop for non-player countries.
//!
//! Once per AI interval, every country other than the player's gets a turn:
//!
//! ```text
//! visible_state(world, tag)      what the country knows
//! available_commands(world, tag) the legal moves it could make
//!        │
//!        ▼
//! AiPlayer::decide ──► Vec<Command> ──► input::execute_command
//! ```
//!
//! Decisions go through the same command path as the player's, so the AI
//! can only do what a player could. A rejected command is logged and
//! skipped; it never stops the pass.
//!
//! Implementations must be deterministic: the same world gives the same
//! commands.

pub mod greedy;

pub use greedy::GreedyAi;

use crate::config::AiConfig;
use crate::diplomacy::{self, PeaceDemand, TreatyId};
use crate::fixed::Fixed;
use crate::input::{execute_command, Command};
use crate::observer::GameEvent;
use crate::state::{CountryState, Date, ProvinceId, Tag, WorldState};
use crate::systems::Accumulator;
use crate::units::{Unit, UnitCategory, UnitId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::instrument;

/// What one country sees when it takes its turn.
#[derive(Debug, Clone, Serialize)]
pub struct VisibleWorldState {
    pub date: Date,
    pub observer: Tag,
    pub own_country: CountryState,
    pub at_war: bool,
    pub land_units: usize,
    /// Own units and where they stand, in id order
    pub own_units: Vec<(UnitId, ProvinceId)>,
    /// Military strength of this country and every country it borders
    pub known_country_strength: BTreeMap<Tag, Fixed>,
    /// Threat against each owned province
    pub province_threat: BTreeMap<ProvinceId, Fixed>,
    /// Provinces owned by enemies, with the enemy strength standing in each
    pub enemy_provinces: BTreeMap<ProvinceId, Fixed>,
    /// Enemy provinces bordering own territory
    pub frontier: BTreeSet<ProvinceId>,
    /// Pending offers addressed to this country that it is willing to take
    pub acceptable_offers: BTreeSet<TreatyId>,
}

pub type AvailableCommands = Vec<Command>;

pub trait AiPlayer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Chooses this turn's commands from the legal ones. May return nothing.
    fn decide(
        &mut self,
        visible_state: &VisibleWorldState,
        available_commands: &AvailableCommands,
    ) -> Vec<Command>;
}

/// Fighting power of one unit: `(attack + defense) × hp / max_hp`.
pub fn unit_power(world: &WorldState, unit: &Unit) -> Fixed {
    match world.templates.get(&unit.template) {
        Some(t) => Fixed::from_int(t.attack as i64 + t.defense as i64).mul(unit.strength_factor(t)),
        None => Fixed::ZERO,
    }
}

/// Total power of a country's living units.
pub fn military_strength(world: &WorldState, tag: &str) -> Fixed {
    world
        .units
        .values()
        .filter(|u| u.owner == tag && !u.is_destroyed())
        .map(|u| unit_power(world, u))
        .sum()
}

/// Threat against each province `tag` owns.
///
/// A province's threat is the power of every enemy unit standing in it or
/// in a province next to it. A unit near several owned provinces counts
/// toward each of them.
pub fn assess_threats(world: &WorldState, tag: &str) -> BTreeMap<ProvinceId, Fixed> {
    let Some(country) = world.country(tag) else {
        return BTreeMap::new();
    };

    let mut enemy_power: BTreeMap<ProvinceId, Fixed> = BTreeMap::new();
    for unit in world.units.values() {
        if !unit.is_destroyed() && country.is_at_war_with(&unit.owner) {
            *enemy_power.entry(unit.location).or_insert(Fixed::ZERO) += unit_power(world, unit);
        }
    }

    country
        .provinces
        .iter()
        .map(|&p| {
            let threat = std::iter::once(p)
                .chain(world.adjacency.neighbors(p))
                .filter_map(|q| enemy_power.get(&q).copied())
                .sum::<Fixed>();
            (p, threat)
        })
        .collect()
}

/// Sum of all per-province threats.
pub fn total_threat(world: &WorldState, tag: &str) -> Fixed {
    assess_threats(world, tag).values().copied().sum()
}

/// Countries owning a province next to one of `tag`'s provinces.
pub fn neighbors_of(world: &WorldState, tag: &str) -> BTreeSet<Tag> {
    let Some(country) = world.country(tag) else {
        return BTreeSet::new();
    };
    world
        .adjacency
        .closed_neighborhood(&country.provinces)
        .into_iter()
        .filter_map(|p| world.province(p).and_then(|p| p.owner.clone()))
        .filter(|owner| owner != tag)
        .collect()
}

pub fn visible_state(world: &WorldState, tag: &str, date: Date) -> Option<VisibleWorldState> {
    let country = world.country(tag)?;

    let own_units: Vec<(UnitId, ProvinceId)> = world
        .units
        .values()
        .filter(|u| u.owner == tag && !u.is_destroyed())
        .map(|u| (u.id, u.location))
        .collect();
    let land_units = crate::systems::military::count_units_by_category(world, tag, UnitCategory::Land);

    let mut known_country_strength = BTreeMap::new();
    known_country_strength.insert(tag.to_string(), military_strength(world, tag));
    for neighbor in neighbors_of(world, tag) {
        let strength = military_strength(world, &neighbor);
        known_country_strength.insert(neighbor, strength);
    }

    let enemy_provinces: BTreeMap<ProvinceId, Fixed> = world
        .provinces
        .values()
        .filter(|p| p.owner.as_deref().is_some_and(|o| country.is_at_war_with(o)))
        .map(|p| {
            let defenders = world
                .units
                .values()
                .filter(|u| u.location == p.id && !u.is_destroyed())
                .filter(|u| country.is_at_war_with(&u.owner))
                .map(|u| unit_power(world, u))
                .sum::<Fixed>();
            (p.id, defenders)
        })
        .collect();

    let frontier = world
        .adjacency
        .closed_neighborhood(&country.provinces)
        .into_iter()
        .filter(|p| enemy_provinces.contains_key(p))
        .collect();

    let acceptable_offers = world
        .treaties
        .values()
        .filter(|t| diplomacy::should_accept_peace(world, tag, t))
        .map(|t| t.id)
        .collect();

    Some(VisibleWorldState {
        date,
        observer: tag.to_string(),
        own_country: country.clone(),
        at_war: country.at_war(),
        land_units,
        own_units,
        known_country_strength,
        province_threat: assess_threats(world, tag),
        enemy_provinces,
        frontier,
        acceptable_offers,
    })
}

/// Every command `tag` could legally issue right now.
pub fn available_commands(world: &WorldState, tag: &str, config: &AiConfig) -> AvailableCommands {
    let Some(country) = world.country(tag) else {
        return Vec::new();
    };
    let mut commands = Vec::new();

    // Recruit at the capital
    if let (Some(capital), Some(template)) =
        (country.capital, world.templates.get(&config.recruit_template))
    {
        if country.provinces.contains(&capital)
            && country.money >= template.cost
            && country.manpower >= template.manpower_cost
        {
            commands.push(Command::Recruit {
                template: template.id.clone(),
                province: capital,
            });
        }
    }

    // Moves toward threatened own provinces and into enemy territory
    if country.at_war() {
        let threatened = assess_threats(world, tag)
            .into_iter()
            .filter(|(_, threat)| threat.is_positive())
            .map(|(p, _)| p);
        let enemy_owned = world
            .provinces
            .values()
            .filter(|p| p.owner.as_deref().is_some_and(|o| country.is_at_war_with(o)))
            .map(|p| p.id);
        let destinations: BTreeSet<ProvinceId> = threatened.chain(enemy_owned).collect();

        for unit in world.units.values().filter(|u| u.owner == tag && !u.is_destroyed()) {
            for &destination in &destinations {
                if destination != unit.location {
                    commands.push(Command::Move {
                        unit: unit.id,
                        destination,
                    });
                }
            }
        }
    }

    // Wars against neighbors
    for neighbor in neighbors_of(world, tag) {
        if country.is_at_war_with(&neighbor) {
            continue;
        }
        if world.is_player(&neighbor) && !config.may_target_player {
            continue;
        }
        commands.push(Command::DeclareWar { target: neighbor });
    }

    // Peace offers where the war score pays for them, one pending offer per enemy
    for (enemy, score) in &country.war_scores {
        if *score < config.peace_demand_war_score {
            continue;
        }
        if world.treaties.values().any(|t| t.from == tag && t.to == *enemy) {
            continue;
        }
        let max_by_score = (score.to_int() / 20).max(0) as usize;
        let demands: Vec<PeaceDemand> = world
            .provinces_owned_by(enemy)
            .take(config.max_annexations_per_treaty.min(max_by_score))
            .map(|p| PeaceDemand::AnnexProvince(p.id))
            .collect();
        commands.push(Command::OfferPeace {
            target: enemy.clone(),
            demands,
        });
    }

    for treaty in world.treaties.values().filter(|t| t.to == tag) {
        commands.push(Command::AcceptPeace { treaty: treaty.id });
    }

    commands
}

/// Weekly decision loop.
pub struct AiSystem<A: AiPlayer = GreedyAi> {
    accumulator: Accumulator,
    player: A,
}

impl AiSystem<GreedyAi> {
    pub fn greedy(config: &AiConfig) -> Self {
        Self::new(GreedyAi::new(config.clone()))
    }
}

impl<A: AiPlayer> AiSystem<A> {
    pub fn new(player: A) -> Self {
        Self {
            accumulator: Accumulator::new(),
            player,
        }
    }

    /// Returns the number of decision passes run.
    #[instrument(skip_all, name = "ai")]
    pub fn update(
        &mut self,
        delta: Fixed,
        world: &mut WorldState,
        config: &AiConfig,
        date: Date,
        events: &mut Vec<GameEvent>,
    ) -> u32 {
        let passes = self.accumulator.advance(delta, config.interval_hours);
        for _ in 0..passes {
            self.run_pass(world, config, date, events);
        }
        passes
    }

    pub fn pending(&self) -> Fixed {
        self.accumulator.pending()
    }

    pub fn player(&self) -> &A {
        &self.player
    }

    fn run_pass(&mut self, world: &mut WorldState, config: &AiConfig, date: Date, events: &mut Vec<GameEvent>) {
        let tags: Vec<Tag> = world
            .countries
            .keys()
            .filter(|tag| !world.is_player(tag))
            .cloned()
            .collect();

        for tag in tags {
            let Some(visible) = visible_state(world, &tag, date) else {
                continue;
            };
            let available = available_commands(world, &tag, config);
            let commands = self.player.decide(&visible, &available);

            for cmd in commands {
                match execute_command(world, &tag, &cmd, events) {
                    Ok(()) => {
                        if let Command::OfferPeace { target, .. } = &cmd {
                            press_for_answer(world, config, &tag, target, events);
                        }
                    }
                    Err(e) => log::debug!("[AI] {} ({}) skipped {:?}: {}", tag, self.player.name(), cmd, e),
                }
            }
        }
    }
}

/// When the proposer's score is overwhelming and the target is AI-run, the
/// target answers on the spot instead of waiting for its own turn.
fn press_for_answer(
    world: &mut WorldState,
    config: &AiConfig,
    from: &str,
    to: &str,
    events: &mut Vec<GameEvent>,
) {
    if world.is_player(to) {
        return;
    }
    let score = world.country(from).map(|c| c.war_score(to)).unwrap_or(Fixed::ZERO);
    if score < config.peace_force_war_score {
        return;
    }
    let Some(treaty) = world
        .treaties
        .values()
        .filter(|t| t.from == from && t.to == to)
        .last()
        .cloned()
    else {
        return;
    };
    if !diplomacy::should_accept_peace(world, to, &treaty) {
        log::debug!("[AI] {} refuses treaty {} from {}", to, treaty.id, from);
        return;
    }
    match diplomacy::accept_peace(world, to, treaty.id) {
        Ok(outcome) => events.push(GameEvent::from(outcome)),
        Err(e) => log::debug!("[AI] {} could not accept treaty {}: {}", to, treaty.id, e),
    }
}
