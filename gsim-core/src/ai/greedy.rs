use crate::ai::{AiPlayer, AvailableCommands, VisibleWorldState};
use crate::config::AiConfig;
use crate::fixed::Fixed;
use crate::input::Command;
use crate::state::{ProvinceId, Tag};

/// A deterministic, priority-based AI.
///
/// Each turn it works down a fixed list: recruit, defend, attack, expand,
/// settle. Every choice is made from the legal commands it was handed, and
/// every tie breaks toward the lowest id or tag.
#[derive(Debug, Clone, Default)]
pub struct GreedyAi {
    config: AiConfig,
}

impl GreedyAi {
    pub fn new(config: AiConfig) -> Self {
        Self { config }
    }

    fn wants_recruit(&self, state: &VisibleWorldState) -> bool {
        let country = &state.own_country;
        country.money > self.config.recruit_money_threshold
            && country.manpower > self.config.recruit_manpower_threshold
            && state.land_units < self.config.max_land_units
    }

    /// Province every unit should head for this turn, if any.
    fn rally_point(&self, state: &VisibleWorldState) -> Option<ProvinceId> {
        if !state.at_war {
            return None;
        }

        // Defend: highest threat, lowest id on ties
        let defend = state
            .province_threat
            .iter()
            .filter(|(_, threat)| threat.is_positive())
            .fold(None::<(ProvinceId, Fixed)>, |best, (&p, &threat)| match best {
                Some((_, t)) if t >= threat => best,
                _ => Some((p, threat)),
            });
        if let Some((p, _)) = defend {
            return Some(p);
        }

        // Attack: weakest bordering enemy province, else the first one anywhere
        let weakest_frontier = state
            .frontier
            .iter()
            .filter_map(|p| state.enemy_provinces.get(p).map(|s| (*p, *s)))
            .min_by_key(|&(p, strength)| (strength, p))
            .map(|(p, _)| p);
        weakest_frontier.or_else(|| state.enemy_provinces.keys().next().copied())
    }

    /// Whether declaring on `target` is worth it.
    ///
    /// Strength is compared as `own > ratio × target`.
    fn wants_war(&self, target: &Tag, state: &VisibleWorldState) -> bool {
        let strength = |tag: &Tag| {
            state
                .known_country_strength
                .get(tag)
                .copied()
                .unwrap_or(Fixed::ZERO)
        };
        let own = strength(&state.observer);
        let theirs = strength(target);
        own > theirs.mul(self.config.war_strength_ratio)
    }
}

impl AiPlayer for GreedyAi {
    fn name(&self) -> &'static str {
        "GreedyAi"
    }

    fn decide(&mut self, state: &VisibleWorldState, available: &AvailableCommands) -> Vec<Command> {
        let mut orders = Vec::new();

        // Tier 1: Recruit
        if self.wants_recruit(state) {
            if let Some(cmd) = available
                .iter()
                .find(|c| matches!(c, Command::Recruit { template, .. } if *template == self.config.recruit_template))
            {
                orders.push(cmd.clone());
            }
        }

        // Tier 2: Defend or attack
        if let Some(target) = self.rally_point(state) {
            orders.extend(
                available
                    .iter()
                    .filter(|c| matches!(c, Command::Move { destination, .. } if *destination == target))
                    .cloned(),
            );
        }

        // Tier 3: Expand, one war at a time, against the weakest neighbor
        if !state.at_war {
            let weakest = available
                .iter()
                .filter_map(|c| match c {
                    Command::DeclareWar { target } => Some(target),
                    _ => None,
                })
                .min_by_key(|target| {
                    let strength = state
                        .known_country_strength
                        .get(*target)
                        .copied()
                        .unwrap_or(Fixed::ZERO);
                    (strength, (*target).clone())
                });
            if let Some(target) = weakest {
                if self.wants_war(target, state) {
                    orders.push(Command::DeclareWar { target: target.clone() });
                }
            }
        }

        // Tier 4: Settle wars
        for cmd in available {
            match cmd {
                Command::OfferPeace { demands, .. } if !demands.is_empty() => orders.push(cmd.clone()),
                Command::AcceptPeace { treaty } if state.acceptable_offers.contains(treaty) => {
                    orders.push(cmd.clone())
                }
                _ => {}
            }
        }

        orders
    }
}
