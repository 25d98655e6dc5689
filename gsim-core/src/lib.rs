//! # Grand Strategy Simulation Core
//!
//! Deterministic tick engine for a province-based grand-strategy game.
//!
//! The host feeds real elapsed time into [`Simulation::tick`]. The scheduler
//! scales it by game speed and hands the same game-time delta to each
//! subsystem in a fixed order. Each subsystem runs its logical work on its
//! own interval, independent of frame rate.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐  real delta  ┌──────────────────────────────────────────┐
//! │    Host     │─────────────▶│ Simulation (clock, pause, speed)         │
//! │ (frames,    │   Commands   │                                          │
//! │  input)     │─────────────▶│ Economy ▶ Military ▶ Combat ▶ AI         │
//! └─────────────┘              │        │                                 │
//!                              │        ▼                                 │
//!                              │ reap ▶ occupation ▶ automatic peace      │
//!                              └──────────────┬───────────────────────────┘
//!                                             │ Snapshot + GameEvents
//!                                      ┌──────▼──────┐
//!                                      │  Observers  │
//!                                      └─────────────┘
//! ```
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`WorldState`] | Provinces, countries, units, treaties |
//! | [`Simulation`] | Owns the world and the clock; dispatches ticks |
//! | [`Command`] | Actions shared by the player and the AI |
//! | [`AiPlayer`] | Trait for AI decision making |
//! | [`SimObserver`] | Trait for observing ticks and events |
//! | [`Fixed`] | Deterministic fixed-point arithmetic |
//!
//! Nothing here reads files, opens windows or installs a log subscriber.
//! Scenarios arrive as a [`WorldBootstrap`].

pub mod adjacency;
pub mod ai;
pub mod bootstrap;
pub mod config;
pub mod diplomacy;
pub mod error;
pub mod fixed;
pub mod input;
pub mod metrics;
pub mod observer;
pub mod scheduler;
pub mod state;
pub mod systems;
pub mod testing;
pub mod units;

pub use adjacency::AdjacencyGraph;
pub use ai::{AiPlayer, AiSystem, AvailableCommands, GreedyAi, VisibleWorldState};
pub use bootstrap::{BootstrapError, CountryDef, ProvinceDef, WorldBootstrap};
pub use config::{ConfigError, SimConfig};
pub use diplomacy::{PeaceDemand, PeaceOutcome, PeaceTreaty, TreatyId};
pub use error::ActionError;
pub use fixed::Fixed;
pub use input::Command;
pub use metrics::SimMetrics;
pub use observer::{EventLogObserver, GameEvent, ObserverRegistry, SimObserver, Snapshot};
pub use scheduler::{GameClock, GameSpeed, Simulation, TickReport};
pub use state::{CountryState, Date, ProvinceId, ProvinceState, Tag, Terrain, WorldState};
pub use systems::{BattleReport, CombatRoll, FixedRoll, SeededRoll};
pub use units::{TemplateCatalog, Unit, UnitCategory, UnitId, UnitTemplate};
