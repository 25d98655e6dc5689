//! Game clock and tick dispatch.
//!
//! ```text
//! tick(real_delta)
//!   │  paused? ──► nothing happens
//!   ▼
//! scaled = real_delta × hours_per_real_second × speed
//!   │
//!   ├─► Economy ─► Military ─► Combat ─► AI      (same scaled delta)
//!   │
//!   ├─► reap dead units ─► occupation ─► automatic peace
//!   │
//!   └─► observers(Snapshot, events)
//! ```
//!
//! The [`Simulation`] owns the only clock. Subsystems see the delta and the
//! world, never the clock itself.

use crate::ai::{AiSystem, GreedyAi};
use crate::config::{ConfigError, SimConfig};
use crate::diplomacy;
use crate::error::ActionError;
use crate::fixed::Fixed;
use crate::input::{execute_command, Command};
use crate::metrics::SimMetrics;
use crate::observer::{GameEvent, ObserverRegistry, SimObserver, Snapshot};
use crate::state::{CountryState, Date, ProvinceId, ProvinceState, Tag, WorldState};
use crate::systems::combat::{self, BattleReport, CombatRoll, CombatSystem, SeededRoll};
use crate::systems::economy::EconomySystem;
use crate::systems::military::{self, MilitarySystem};
use crate::units::{Unit, UnitId};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const HOURS_PER_DAY: i64 = 24;

/// Game speed setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum GameSpeed {
    #[default]
    Normal,
    Fast,
    VeryFast,
}

impl GameSpeed {
    pub const ALL: [GameSpeed; 3] = [GameSpeed::Normal, GameSpeed::Fast, GameSpeed::VeryFast];

    pub fn multiplier(self) -> u32 {
        match self {
            GameSpeed::Normal => 1,
            GameSpeed::Fast => 2,
            GameSpeed::VeryFast => 5,
        }
    }

    /// Cycles to the next speed (wraps from VeryFast to Normal).
    pub fn next(self) -> Self {
        match self {
            GameSpeed::Normal => GameSpeed::Fast,
            GameSpeed::Fast => GameSpeed::VeryFast,
            GameSpeed::VeryFast => GameSpeed::Normal,
        }
    }

    pub fn from_multiplier(multiplier: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.multiplier() == multiplier)
    }

    /// Returns the speed from a number key (1-3).
    pub fn from_key(key: u8) -> Option<Self> {
        match key {
            1 => Some(GameSpeed::Normal),
            2 => Some(GameSpeed::Fast),
            3 => Some(GameSpeed::VeryFast),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GameSpeed::Normal => "1x",
            GameSpeed::Fast => "2x",
            GameSpeed::VeryFast => "5x",
        }
    }
}

/// Elapsed game time, pause flag and speed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameClock {
    elapsed_hours: Fixed,
    paused: bool,
    speed: GameSpeed,
    /// Ticks that advanced game time
    ticks: u64,
}

impl GameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Epoch plus whole elapsed days.
    pub fn date(&self) -> Date {
        let days = self.elapsed_hours.to_int() / HOURS_PER_DAY;
        Date::EPOCH.add_days(u32::try_from(days.max(0)).unwrap_or(u32::MAX))
    }

    pub fn elapsed_hours(&self) -> Fixed {
        self.elapsed_hours
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn speed(&self) -> GameSpeed {
        self.speed
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Converts a real delta into game hours, or `None` if no time passes.
    fn advance(&mut self, real_delta: Fixed, hours_per_real_second: Fixed) -> Option<Fixed> {
        if self.paused || !real_delta.is_positive() {
            return None;
        }
        let scaled = real_delta
            .mul(hours_per_real_second)
            .mul_int(self.speed.multiplier() as i64);
        if !scaled.is_positive() {
            return None;
        }
        self.elapsed_hours += scaled;
        self.ticks += 1;
        Some(scaled)
    }
}

/// What one call to [`Simulation::tick`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Game hours forwarded to the subsystems
    pub delta_hours: Fixed,
    pub economy_passes: u32,
    pub military_passes: u32,
    pub combat_rounds: u32,
    pub ai_passes: u32,
    pub battles: Vec<BattleReport>,
    pub events: Vec<GameEvent>,
}

impl TickReport {
    /// True when no game time passed.
    pub fn is_empty(&self) -> bool {
        self.delta_hours == Fixed::ZERO
    }
}

/// The simulation: world, clock, subsystems and observers.
pub struct Simulation<R: CombatRoll = SeededRoll> {
    world: WorldState,
    clock: GameClock,
    config: SimConfig,
    economy: EconomySystem,
    military: MilitarySystem,
    combat: CombatSystem,
    ai: AiSystem<GreedyAi>,
    roll: R,
    observers: ObserverRegistry,
    metrics: SimMetrics,
    /// Events from commands applied between ticks
    queued_events: Vec<GameEvent>,
}

impl Simulation<SeededRoll> {
    /// Simulation with seeded combat rolls.
    pub fn new(world: WorldState, config: SimConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::with_roll(world, config, SeededRoll::new(seed))
    }
}

impl<R: CombatRoll> Simulation<R> {
    pub fn with_roll(world: WorldState, config: SimConfig, roll: R) -> Result<Self, ConfigError> {
        config.validate()?;
        log::info!(
            "Simulation created: {} provinces, {} countries, player {:?}",
            world.provinces.len(),
            world.countries.len(),
            world.player
        );
        Ok(Self {
            world,
            clock: GameClock::new(),
            ai: AiSystem::greedy(&config.ai),
            config,
            economy: EconomySystem::new(),
            military: MilitarySystem::new(),
            combat: CombatSystem::new(),
            roll,
            observers: ObserverRegistry::new(),
            metrics: SimMetrics::default(),
            queued_events: Vec::new(),
        })
    }

    /// Advances the simulation by a real-time delta in seconds.
    #[tracing::instrument(skip_all, name = "tick")]
    pub fn tick(&mut self, real_delta: Fixed) -> TickReport {
        let Some(delta) = self.clock.advance(real_delta, self.config.hours_per_real_second) else {
            return TickReport::default();
        };
        let tick_start = Instant::now();
        let date = self.clock.date();

        let mut report = TickReport {
            delta_hours: delta,
            events: std::mem::take(&mut self.queued_events),
            ..Default::default()
        };

        // 1. Economy
        let start = Instant::now();
        report.economy_passes =
            self.economy
                .update(delta, &mut self.world, &self.config.economy, &mut report.events);
        self.metrics.economy_time += start.elapsed();

        // 2. Military
        let start = Instant::now();
        report.military_passes = self.military.update(delta, &mut self.world, &self.config.military);
        self.metrics.military_time += start.elapsed();

        // 3. Combat
        let start = Instant::now();
        let rounds_before = self.combat.rounds();
        report.battles = self.combat.update(
            delta,
            &mut self.world,
            &self.config.combat,
            &mut self.roll,
            &mut report.events,
        );
        report.combat_rounds = u32::try_from(self.combat.rounds() - rounds_before).unwrap_or(u32::MAX);
        self.metrics.combat_time += start.elapsed();

        // 4. AI
        let start = Instant::now();
        report.ai_passes = self
            .ai
            .update(delta, &mut self.world, &self.config.ai, date, &mut report.events);
        self.metrics.ai_time += start.elapsed();

        // 5. End of tick
        let start = Instant::now();
        military::reap_destroyed(&mut self.world, &mut report.events);
        combat::settle_occupations(
            &mut self.world,
            &report.battles,
            &self.config.combat,
            &self.config.diplomacy,
            &mut report.events,
        );
        if let Some(threshold) = self.config.diplomacy.auto_peace_war_score {
            for outcome in diplomacy::run_auto_peace(&mut self.world, threshold) {
                report.events.push(GameEvent::from(outcome));
            }
        }
        self.metrics.end_of_tick_time += start.elapsed();

        // 6. Observers
        if !self.observers.is_empty() {
            let start = Instant::now();
            let snapshot = self.snapshot();
            self.observers.notify(&snapshot, &report.events);
            self.metrics.observer_time += start.elapsed();
        }

        self.metrics.total_ticks += 1;
        self.metrics.total_time += tick_start.elapsed();
        self.metrics.economy_passes += report.economy_passes as u64;
        self.metrics.military_passes += report.military_passes as u64;
        self.metrics.combat_rounds += report.combat_rounds as u64;
        self.metrics.ai_passes += report.ai_passes as u64;
        self.metrics.battles_fought += report.battles.len() as u64;

        log::trace!(
            "Tick {} ({}): +{}h, {} events",
            self.clock.ticks(),
            date,
            delta,
            report.events.len()
        );
        report
    }

    /// Advances by a frame duration.
    pub fn tick_duration(&mut self, frame: Duration) -> TickReport {
        self.tick(Fixed::from_f64(frame.as_secs_f64()))
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.clock.paused = !self.clock.paused;
        log::info!("Simulation {}", if self.clock.paused { "paused" } else { "resumed" });
        self.clock.paused
    }

    pub fn set_speed(&mut self, speed: GameSpeed) {
        self.clock.speed = speed;
    }

    pub fn set_speed_multiplier(&mut self, multiplier: u32) -> Result<(), ActionError> {
        let speed = GameSpeed::from_multiplier(multiplier).ok_or(ActionError::InvalidSpeed(multiplier))?;
        self.set_speed(speed);
        Ok(())
    }

    /// Stored for the host; the core never reads it.
    pub fn select_province(&mut self, province: Option<ProvinceId>) {
        self.world.selected_province = province;
    }

    pub fn set_player_country(&mut self, tag: &str) -> Result<(), ActionError> {
        if self.world.country(tag).is_none() {
            return Err(ActionError::InvalidCountryReference(tag.to_string()));
        }
        self.world.player = Some(tag.to_string());
        Ok(())
    }

    /// Executes a command immediately. Its events reach observers on the next tick.
    pub fn apply_command(&mut self, country: &str, command: Command) -> Result<(), ActionError> {
        execute_command(&mut self.world, country, &command, &mut self.queued_events)
    }

    pub fn register_observer(&mut self, observer: Box<dyn SimObserver>) {
        self.observers.register(observer);
    }

    pub fn date(&self) -> Date {
        self.clock.date()
    }

    pub fn elapsed_hours(&self) -> Fixed {
        self.clock.elapsed_hours()
    }

    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    pub fn speed(&self) -> GameSpeed {
        self.clock.speed()
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn snapshot(&self) -> Snapshot {
        let frequency = self.config.checksum_frequency as u64;
        let checksum = if frequency > 0 && self.clock.ticks() % frequency == 0 {
            self.world.checksum()
        } else {
            0
        };
        Snapshot::new(
            self.world.clone(),
            self.clock.ticks(),
            self.clock.date(),
            self.clock.elapsed_hours(),
            checksum,
        )
    }

    pub fn province(&self, id: ProvinceId) -> Option<&ProvinceState> {
        self.world.province(id)
    }

    pub fn country(&self, tag: &str) -> Option<&CountryState> {
        self.world.country(tag)
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.world.unit(id)
    }

    pub fn units_in_province(&self, province: ProvinceId) -> Vec<&Unit> {
        military::units_in_province(&self.world, province)
    }

    pub fn selected_province(&self) -> Option<ProvinceId> {
        self.world.selected_province
    }

    pub fn player_country(&self) -> Option<&Tag> {
        self.world.player.as_ref()
    }

    pub fn metrics(&self) -> &SimMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod scheduler_tests;
