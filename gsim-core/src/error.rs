use crate::fixed::Fixed;
use crate::state::{ProvinceId, Tag};
use crate::units::UnitId;
use thiserror::Error;

/// Recoverable failures of a command or subsystem call.
///
/// None of these stop the tick loop. The AI drops a failed action and carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("Unknown unit template: {0}")]
    InvalidTemplate(String),

    #[error(
        "Insufficient resources for {country}: need {money_required} money / {manpower_required} manpower, \
         have {money_available} / {manpower_available}"
    )]
    InsufficientResources {
        country: Tag,
        money_required: Fixed,
        money_available: Fixed,
        manpower_required: u64,
        manpower_available: u64,
    },

    #[error("Invalid destination province: {0}")]
    InvalidDestination(ProvinceId),

    #[error("Unknown province: {0}")]
    InvalidProvinceReference(ProvinceId),

    #[error("Unknown country: {0}")]
    InvalidCountryReference(Tag),

    #[error("Unknown unit: {0}")]
    InvalidUnitReference(UnitId),

    #[error("Unsupported game speed multiplier: {0}x")]
    InvalidSpeed(u32),

    #[error("{0} and {1} are already at war")]
    AlreadyAtWar(Tag, Tag),

    #[error("{0} and {1} are not at war")]
    NotAtWar(Tag, Tag),

    #[error("Invalid peace treaty: {0}")]
    InvalidTreaty(String),
}
