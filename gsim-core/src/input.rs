use crate::diplomacy::{self, PeaceDemand, TreatyId};
use crate::error::ActionError;
use crate::observer::GameEvent;
use crate::state::{ProvinceId, Tag, WorldState};
use crate::systems::military;
use crate::units::{TemplateId, UnitId};
use serde::{Deserialize, Serialize};

/// An action a country takes, whether issued by the player or the AI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Command {
    // Military
    Recruit {
        template: TemplateId,
        province: ProvinceId,
    },
    Move {
        unit: UnitId,
        destination: ProvinceId,
    },

    // Diplomatic
    DeclareWar {
        target: Tag,
    },
    OfferPeace {
        target: Tag,
        demands: Vec<PeaceDemand>,
    },
    AcceptPeace {
        treaty: TreatyId,
    },
    /// White peace
    MakePeace {
        target: Tag,
    },
}

/// Executes one command for `country`, appending what happened to `events`.
///
/// Nothing is mutated when an error is returned.
pub fn execute_command(
    world: &mut WorldState,
    country: &str,
    cmd: &Command,
    events: &mut Vec<GameEvent>,
) -> Result<(), ActionError> {
    if world.country(country).is_none() {
        return Err(ActionError::InvalidCountryReference(country.to_string()));
    }

    match cmd {
        Command::Recruit { template, province } => {
            let unit = military::create_unit(world, template, country, *province)?;
            events.push(GameEvent::UnitRecruited {
                unit: unit.id,
                owner: unit.owner,
                template: unit.template,
                province: unit.location,
            });
        }
        Command::Move { unit, destination } => {
            let owned = world
                .unit(*unit)
                .ok_or(ActionError::InvalidUnitReference(*unit))?
                .owner
                == country;
            if !owned {
                return Err(ActionError::InvalidUnitReference(*unit));
            }
            let from = military::move_unit(world, *unit, *destination)?;
            if from != *destination {
                events.push(GameEvent::UnitMoved {
                    unit: *unit,
                    from,
                    to: *destination,
                });
            }
        }
        Command::DeclareWar { target } => {
            diplomacy::declare_war(world, country, target)?;
            events.push(GameEvent::WarDeclared {
                attacker: country.to_string(),
                defender: target.clone(),
            });
        }
        Command::OfferPeace { target, demands } => {
            let treaty = diplomacy::propose_peace(world, country, target, demands.clone())?;
            events.push(GameEvent::PeaceOffered {
                treaty,
                from: country.to_string(),
                to: target.clone(),
            });
        }
        Command::AcceptPeace { treaty } => {
            let outcome = diplomacy::accept_peace(world, country, *treaty)?;
            events.push(GameEvent::from(outcome));
        }
        Command::MakePeace { target } => {
            diplomacy::make_peace(world, country, target)?;
            events.push(GameEvent::PeaceSigned {
                winner: country.to_string(),
                loser: target.clone(),
                annexed: Vec::new(),
                reparations: crate::fixed::Fixed::ZERO,
            });
        }
    }
    Ok(())
}
