//! Tick subsystems.
//!
//! Each subsystem receives the scaled game-time delta from the scheduler,
//! adds it to its own [`Accumulator`] and runs one pass of logical work per
//! interval crossed. A delta smaller than the interval does nothing but
//! accumulate; a delta several intervals long runs several passes.

pub mod combat;
pub mod economy;
pub mod military;

pub use combat::{BattleReport, CombatRoll, CombatSystem, FixedRoll, SeededRoll};
pub use economy::{province_income, run_income_tick, run_manpower_tick, EconomySystem};
pub use military::MilitarySystem;

use crate::fixed::Fixed;
use serde::{Deserialize, Serialize};

/// Game time carried toward a subsystem's next pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accumulator {
    pending: Fixed,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `delta` and returns how many whole intervals were crossed.
    ///
    /// Each crossing subtracts exactly one interval, so the remainder carries
    /// into the next call. Non-positive deltas are ignored.
    pub fn advance(&mut self, delta: Fixed, interval: Fixed) -> u32 {
        if !delta.is_positive() || !interval.is_positive() {
            return 0;
        }
        self.pending += delta;
        let mut passes = 0;
        while self.pending >= interval {
            self.pending -= interval;
            passes += 1;
        }
        passes
    }

    pub fn pending(&self) -> Fixed {
        self.pending
    }
}
