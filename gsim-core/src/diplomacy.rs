//! War, peace and war score.
//!
//! This module is the only place that changes province ownership
//! ([`transfer_province`]). Combat changes control; peace treaties change
//! ownership.

use crate::error::ActionError;
use crate::fixed::Fixed;
use crate::state::{DiplomaticStatus, ProvinceId, Tag, WorldState};
use serde::{Deserialize, Serialize};

pub type TreatyId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeaceDemand {
    AnnexProvince(ProvinceId),
    WarReparations(Fixed),
}

/// A peace offer waiting for the other side's answer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeaceTreaty {
    pub id: TreatyId,
    /// The side making demands
    pub from: Tag,
    /// The side that must accept
    pub to: Tag,
    pub demands: Vec<PeaceDemand>,
    /// Total war score the demands are worth
    pub cost: Fixed,
}

/// What a concluded peace actually changed hands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeaceOutcome {
    pub winner: Tag,
    pub loser: Tag,
    pub annexed: Vec<ProvinceId>,
    pub reparations: Fixed,
}

fn require_country(world: &WorldState, tag: &str) -> Result<(), ActionError> {
    if world.country(tag).is_none() {
        return Err(ActionError::InvalidCountryReference(tag.to_string()));
    }
    Ok(())
}

pub fn declare_war(world: &mut WorldState, attacker: &str, defender: &str) -> Result<(), ActionError> {
    require_country(world, attacker)?;
    require_country(world, defender)?;
    if attacker == defender {
        return Err(ActionError::InvalidCountryReference(defender.to_string()));
    }
    if world.are_at_war(attacker, defender) {
        return Err(ActionError::AlreadyAtWar(
            attacker.to_string(),
            defender.to_string(),
        ));
    }

    for (me, them) in [(attacker, defender), (defender, attacker)] {
        if let Some(c) = world.country_mut(me) {
            c.relations.insert(them.to_string(), DiplomaticStatus::War);
            c.war_scores.insert(them.to_string(), Fixed::ZERO);
        }
    }
    log::info!("{} declares war on {}", attacker, defender);
    Ok(())
}

/// Ends a war: clears war scores, drops pending offers between the two and
/// hands occupied provinces back to their owners.
pub fn make_peace(world: &mut WorldState, a: &str, b: &str) -> Result<(), ActionError> {
    if !world.are_at_war(a, b) {
        return Err(ActionError::NotAtWar(a.to_string(), b.to_string()));
    }

    for (me, them) in [(a, b), (b, a)] {
        if let Some(c) = world.country_mut(me) {
            c.relations.insert(them.to_string(), DiplomaticStatus::Peace);
            c.war_scores.remove(them);
        }
    }

    world.treaties.retain(|_, t| {
        !((t.from == a && t.to == b) || (t.from == b && t.to == a))
    });

    let occupied: Vec<ProvinceId> = world
        .provinces
        .values()
        .filter(|p| match (p.owner.as_deref(), p.controller.as_deref()) {
            (Some(owner), Some(controller)) => {
                (owner == a && controller == b) || (owner == b && controller == a)
            }
            _ => false,
        })
        .map(|p| p.id)
        .collect();
    for id in occupied {
        if let Some(p) = world.province_mut(id) {
            p.controller = p.owner.clone();
        }
    }

    log::info!("{} and {} make peace", a, b);
    Ok(())
}

/// Moves war score from `loser` to `winner`, clamped to `[-cap, cap]`.
///
/// Does nothing unless the two are at war.
pub fn award_war_score(world: &mut WorldState, winner: &str, loser: &str, points: Fixed, cap: Fixed) {
    if !world.are_at_war(winner, loser) {
        return;
    }
    for (me, them, delta) in [(winner, loser, points), (loser, winner, -points)] {
        if let Some(c) = world.country_mut(me) {
            let score = c.war_scores.entry(them.to_string()).or_insert(Fixed::ZERO);
            *score = (*score + delta).clamp(-cap, cap);
        }
    }
}

/// Hands a province to a new owner, who also takes control.
///
/// Returns the previous owner.
pub fn transfer_province(
    world: &mut WorldState,
    province: ProvinceId,
    new_owner: &str,
) -> Result<Option<Tag>, ActionError> {
    let previous = world.set_owner(province, new_owner)?;
    log::info!(
        "Province {} transferred from {} to {}",
        province,
        previous.as_deref().unwrap_or("nobody"),
        new_owner
    );
    Ok(previous)
}

/// War score a demand is worth.
pub fn demand_cost(world: &WorldState, demand: &PeaceDemand) -> Fixed {
    match demand {
        PeaceDemand::AnnexProvince(id) => match world.province(*id) {
            Some(p) => Fixed::from_int(5 + 2 * p.development as i64),
            None => Fixed::from_int(10),
        },
        PeaceDemand::WarReparations(amount) => {
            amount.div_int(500).max(Fixed::from_int(5))
        }
    }
}

/// Files a peace offer from `from` to `to`.
///
/// Annexation demands must name provinces `to` owns, and `from` must hold at
/// least as much war score as the demands cost.
pub fn propose_peace(
    world: &mut WorldState,
    from: &str,
    to: &str,
    demands: Vec<PeaceDemand>,
) -> Result<TreatyId, ActionError> {
    if !world.are_at_war(from, to) {
        return Err(ActionError::NotAtWar(from.to_string(), to.to_string()));
    }
    for demand in &demands {
        match demand {
            PeaceDemand::AnnexProvince(id) => {
                let owner = world
                    .province(*id)
                    .ok_or(ActionError::InvalidProvinceReference(*id))?
                    .owner
                    .as_deref();
                if owner != Some(to) {
                    return Err(ActionError::InvalidTreaty(format!(
                        "province {} is not owned by {}",
                        id, to
                    )));
                }
            }
            PeaceDemand::WarReparations(amount) => {
                if *amount < Fixed::ZERO {
                    return Err(ActionError::InvalidTreaty(format!(
                        "negative reparations {}",
                        amount
                    )));
                }
            }
        }
    }

    let cost = demands
        .iter()
        .map(|d| demand_cost(world, d))
        .sum::<Fixed>();
    let score = world.country(from).map(|c| c.war_score(to)).unwrap_or(Fixed::ZERO);
    if score < cost {
        return Err(ActionError::InvalidTreaty(format!(
            "demands cost {} war score, {} has {}",
            cost, from, score
        )));
    }

    let id = world.next_treaty_id;
    world.next_treaty_id += 1;
    world.treaties.insert(
        id,
        PeaceTreaty {
            id,
            from: from.to_string(),
            to: to.to_string(),
            demands,
            cost,
        },
    );
    log::info!("{} offers peace to {} (treaty {}, cost {})", from, to, id, cost);
    Ok(id)
}

/// Accepts a pending offer on behalf of `accepting`, executing its demands
/// and ending the war.
pub fn accept_peace(
    world: &mut WorldState,
    accepting: &str,
    treaty_id: TreatyId,
) -> Result<PeaceOutcome, ActionError> {
    let treaty = world
        .treaties
        .get(&treaty_id)
        .ok_or_else(|| ActionError::InvalidTreaty(format!("no pending treaty {}", treaty_id)))?;
    if treaty.to != accepting {
        return Err(ActionError::InvalidTreaty(format!(
            "treaty {} is addressed to {}, not {}",
            treaty_id, treaty.to, accepting
        )));
    }
    let treaty = treaty.clone();
    world.treaties.remove(&treaty_id);

    let outcome = execute_demands(world, &treaty.from, &treaty.to, &treaty.demands)?;
    make_peace(world, &treaty.from, &treaty.to)?;
    Ok(outcome)
}

fn execute_demands(
    world: &mut WorldState,
    winner: &str,
    loser: &str,
    demands: &[PeaceDemand],
) -> Result<PeaceOutcome, ActionError> {
    let mut outcome = PeaceOutcome {
        winner: winner.to_string(),
        loser: loser.to_string(),
        annexed: Vec::new(),
        reparations: Fixed::ZERO,
    };

    for demand in demands {
        match demand {
            PeaceDemand::AnnexProvince(id) => {
                // Skip provinces that changed hands since the offer was made
                let still_owned = world
                    .province(*id)
                    .is_some_and(|p| p.owner.as_deref() == Some(loser));
                if still_owned {
                    transfer_province(world, *id, winner)?;
                    outcome.annexed.push(*id);
                }
            }
            PeaceDemand::WarReparations(amount) => {
                let available = world.country(loser).map(|c| c.money).unwrap_or(Fixed::ZERO);
                let paid = (*amount).min(available);
                if let Some(c) = world.country_mut(loser) {
                    c.add_money(-paid);
                }
                if let Some(c) = world.country_mut(winner) {
                    c.add_money(paid);
                }
                outcome.reparations += paid;
            }
        }
    }
    Ok(outcome)
}

/// Whether an AI country should take the offer.
pub fn should_accept_peace(world: &WorldState, country: &str, treaty: &PeaceTreaty) -> bool {
    if treaty.to != country {
        return false;
    }
    let Some(me) = world.country(country) else {
        return false;
    };

    // Losing badly: take anything
    if me.war_score(&treaty.from) < Fixed::from_int(-50) {
        return true;
    }

    let lost = treaty
        .demands
        .iter()
        .filter(|d| matches!(d, PeaceDemand::AnnexProvince(_)))
        .count();
    let total = me.provinces.len();
    if total > 0 && lost * 2 > total {
        return false;
    }

    let reparations = treaty
        .demands
        .iter()
        .map(|d| match d {
            PeaceDemand::WarReparations(amount) => *amount,
            PeaceDemand::AnnexProvince(_) => Fixed::ZERO,
        })
        .sum::<Fixed>();
    if reparations > me.money.mul(Fixed::from_ratio(8, 10)) {
        return false;
    }

    world
        .country(&treaty.from)
        .is_some_and(|c| c.war_score(country) > Fixed::from_int(75))
}

/// Ends every war where one side's score has reached `threshold`, with the
/// winner annexing all of the loser's provinces.
///
/// Countries are visited in tag order and enemies in tag order, so when two
/// wars cross the threshold in the same tick the lexically first winner
/// settles first.
pub fn run_auto_peace(world: &mut WorldState, threshold: Fixed) -> Vec<PeaceOutcome> {
    let decisive: Vec<(Tag, Tag)> = world
        .countries
        .values()
        .flat_map(|c| {
            c.war_scores
                .iter()
                .filter(|(_, score)| **score >= threshold)
                .map(|(enemy, _)| (c.tag.clone(), enemy.clone()))
                .collect::<Vec<_>>()
        })
        .collect();

    let mut outcomes = Vec::new();
    for (winner, loser) in decisive {
        if !world.are_at_war(&winner, &loser) {
            continue;
        }
        let demands: Vec<PeaceDemand> = world
            .provinces_owned_by(&loser)
            .map(|p| PeaceDemand::AnnexProvince(p.id))
            .collect();

        let result = execute_demands(world, &winner, &loser, &demands)
            .and_then(|outcome| make_peace(world, &winner, &loser).map(|_| outcome));
        match result {
            Ok(outcome) => {
                log::info!(
                    "{} forces peace on {}, annexing {} provinces",
                    winner,
                    loser,
                    outcome.annexed.len()
                );
                outcomes.push(outcome);
            }
            Err(e) => log::warn!("Automatic peace {} vs {} failed: {}", winner, loser, e),
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::WorldStateBuilder;

    fn two_countries_at_war() -> WorldState {
        WorldStateBuilder::new()
            .with_country("GER")
            .with_country("FRA")
            .with_province(1, Some("GER"))
            .with_province(2, Some("FRA"))
            .with_province(3, Some("FRA"))
            .with_province(4, Some("FRA"))
            .with_capital("FRA", 2)
            .with_war("GER", "FRA")
            .build()
    }

    #[test]
    fn test_declare_war_is_symmetric() {
        let mut world = WorldStateBuilder::new()
            .with_country("GER")
            .with_country("FRA")
            .build();

        declare_war(&mut world, "GER", "FRA").unwrap();
        assert!(world.are_at_war("FRA", "GER"));
        assert_eq!(world.country("FRA").unwrap().war_score("GER"), Fixed::ZERO);

        assert_eq!(
            declare_war(&mut world, "FRA", "GER"),
            Err(ActionError::AlreadyAtWar("FRA".into(), "GER".into()))
        );
        assert!(matches!(
            declare_war(&mut world, "GER", "XXX"),
            Err(ActionError::InvalidCountryReference(_))
        ));
    }

    #[test]
    fn test_war_score_is_zero_sum_and_clamped() {
        let mut world = two_countries_at_war();
        for _ in 0..30 {
            award_war_score(&mut world, "GER", "FRA", Fixed::from_int(5), Fixed::HUNDRED);
        }
        assert_eq!(world.country("GER").unwrap().war_score("FRA"), Fixed::HUNDRED);
        assert_eq!(world.country("FRA").unwrap().war_score("GER"), -Fixed::HUNDRED);
    }

    #[test]
    fn test_war_score_ignored_at_peace() {
        let mut world = WorldStateBuilder::new()
            .with_country("GER")
            .with_country("FRA")
            .build();
        award_war_score(&mut world, "GER", "FRA", Fixed::from_int(5), Fixed::HUNDRED);
        assert!(world.country("GER").unwrap().war_scores.is_empty());
    }

    #[test]
    fn test_make_peace_restores_control() {
        let mut world = two_countries_at_war();
        world.set_controller(3, Some("GER".into())).unwrap();

        make_peace(&mut world, "GER", "FRA").unwrap();
        assert!(!world.are_at_war("GER", "FRA"));
        assert_eq!(world.province(3).unwrap().controller.as_deref(), Some("FRA"));
        assert_eq!(
            make_peace(&mut world, "GER", "FRA"),
            Err(ActionError::NotAtWar("GER".into(), "FRA".into()))
        );
    }

    #[test]
    fn test_demand_cost() {
        let world = two_countries_at_war();
        assert_eq!(
            demand_cost(&world, &PeaceDemand::AnnexProvince(2)),
            Fixed::from_int(7)
        );
        assert_eq!(
            demand_cost(&world, &PeaceDemand::WarReparations(Fixed::from_int(1000))),
            Fixed::from_int(5)
        );
        assert_eq!(
            demand_cost(&world, &PeaceDemand::WarReparations(Fixed::from_int(5000))),
            Fixed::from_int(10)
        );
    }

    #[test]
    fn test_propose_requires_war_score() {
        let mut world = two_countries_at_war();
        let result = propose_peace(&mut world, "GER", "FRA", vec![PeaceDemand::AnnexProvince(2)]);
        assert!(matches!(result, Err(ActionError::InvalidTreaty(_))));

        award_war_score(&mut world, "GER", "FRA", Fixed::from_int(10), Fixed::HUNDRED);
        let id = propose_peace(&mut world, "GER", "FRA", vec![PeaceDemand::AnnexProvince(2)]).unwrap();
        assert_eq!(world.treaties[&id].cost, Fixed::from_int(7));
    }

    #[test]
    fn test_propose_rejects_foreign_province() {
        let mut world = two_countries_at_war();
        award_war_score(&mut world, "GER", "FRA", Fixed::from_int(50), Fixed::HUNDRED);
        let result = propose_peace(&mut world, "GER", "FRA", vec![PeaceDemand::AnnexProvince(1)]);
        assert!(matches!(result, Err(ActionError::InvalidTreaty(_))));
    }

    #[test]
    fn test_accept_peace_transfers_and_ends_war() {
        let mut world = two_countries_at_war();
        world.country_mut("FRA").unwrap().money = Fixed::from_int(300);
        award_war_score(&mut world, "GER", "FRA", Fixed::from_int(30), Fixed::HUNDRED);
        let id = propose_peace(
            &mut world,
            "GER",
            "FRA",
            vec![
                PeaceDemand::AnnexProvince(2),
                PeaceDemand::WarReparations(Fixed::from_int(500)),
            ],
        )
        .unwrap();

        assert!(matches!(
            accept_peace(&mut world, "GER", id),
            Err(ActionError::InvalidTreaty(_))
        ));

        let outcome = accept_peace(&mut world, "FRA", id).unwrap();
        assert_eq!(outcome.annexed, vec![2]);
        assert_eq!(outcome.reparations, Fixed::from_int(300));
        assert!(!world.are_at_war("GER", "FRA"));
        assert_eq!(world.province(2).unwrap().owner.as_deref(), Some("GER"));
        assert_eq!(world.country("FRA").unwrap().money, Fixed::ZERO);
        assert_eq!(world.country("GER").unwrap().money, Fixed::from_int(1300));
        // Capital moved to the lowest remaining province
        assert_eq!(world.country("FRA").unwrap().capital, Some(3));
        assert!(world.treaties.is_empty());
    }

    #[test]
    fn test_should_accept_peace() {
        let mut world = two_countries_at_war();
        let small = PeaceTreaty {
            id: 1,
            from: "GER".into(),
            to: "FRA".into(),
            demands: vec![PeaceDemand::AnnexProvince(4)],
            cost: Fixed::from_int(7),
        };
        // Even war: no reason to give anything up
        assert!(!should_accept_peace(&world, "FRA", &small));
        assert!(!should_accept_peace(&world, "GER", &small));

        award_war_score(&mut world, "GER", "FRA", Fixed::from_int(80), Fixed::HUNDRED);
        assert!(should_accept_peace(&world, "FRA", &small));

        // Losing two of three provinces is too much unless the war is lost outright
        let greedy = PeaceTreaty {
            demands: vec![PeaceDemand::AnnexProvince(3), PeaceDemand::AnnexProvince(4)],
            ..small.clone()
        };
        world.country_mut("FRA").unwrap().war_scores.insert("GER".into(), Fixed::from_int(-40));
        assert!(!should_accept_peace(&world, "FRA", &greedy));
    }

    #[test]
    fn test_auto_peace_annexes_everything() {
        let mut world = two_countries_at_war();
        award_war_score(&mut world, "GER", "FRA", Fixed::HUNDRED, Fixed::HUNDRED);

        let outcomes = run_auto_peace(&mut world, Fixed::HUNDRED);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].annexed, vec![2, 3, 4]);
        assert!(world.country("FRA").unwrap().provinces.is_empty());
        assert_eq!(world.country("FRA").unwrap().capital, None);
        assert_eq!(world.country("GER").unwrap().provinces.len(), 4);
        assert!(!world.are_at_war("GER", "FRA"));
    }

    #[test]
    fn test_auto_peace_below_threshold() {
        let mut world = two_countries_at_war();
        award_war_score(&mut world, "GER", "FRA", Fixed::from_int(99), Fixed::HUNDRED);
        assert!(run_auto_peace(&mut world, Fixed::HUNDRED).is_empty());
        assert!(world.are_at_war("GER", "FRA"));
    }
}
