//! Read-only observation of the running simulation.
//!
//! Observers receive an immutable snapshot plus the events of the tick that
//! produced it. They cannot reach back into the simulation.
//!
//! ```text
//! Simulation::tick
//!        │
//!        ▼
//! ObserverRegistry::notify(&Snapshot, &[GameEvent])
//!        │
//!        ├── EventLogObserver (JSONL + in-memory record)
//!        └── any host-side SimObserver (renderer bridge, UI, ...)
//! ```
//!
//! `Snapshot` wraps the world in an `Arc`, and `im::OrdMap` makes taking
//! one a cheap structural clone.

pub mod event_log;

pub use event_log::{EventLogObserver, GameEvent, LoggedEvent};

use crate::fixed::Fixed;
use crate::state::{Date, WorldState};
use std::sync::Arc;
use thiserror::Error;

/// Immutable snapshot of simulation state.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub state: Arc<WorldState>,
    /// Number of ticks that advanced game time
    pub tick: u64,
    pub date: Date,
    pub elapsed_hours: Fixed,
    /// State checksum (0 if disabled)
    pub checksum: u64,
}

impl Snapshot {
    pub fn new(state: WorldState, tick: u64, date: Date, elapsed_hours: Fixed, checksum: u64) -> Self {
        Self {
            state: Arc::new(state),
            tick,
            date,
            elapsed_hours,
            checksum,
        }
    }
}

#[derive(Error, Debug)]
pub enum ObserverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    /// A lock inside the observer was poisoned
    #[error("Observer state poisoned: {0}")]
    Poisoned(String),
}

#[derive(Clone, Debug)]
pub struct ObserverConfig {
    /// Notify every N ticks (1 = every tick)
    pub frequency: u32,
    /// Always notify on ticks that produced events, regardless of frequency
    pub notify_on_events: bool,
}

impl ObserverConfig {
    /// Whether an observer with this config hears about `tick`.
    pub fn is_due(&self, tick: u64, has_events: bool) -> bool {
        let on_schedule = self.frequency <= 1 || tick % self.frequency as u64 == 0;
        on_schedule || (self.notify_on_events && has_events)
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            frequency: 1,
            notify_on_events: true,
        }
    }
}

/// Trait for simulation observers.
///
/// Errors returned from `on_tick` are logged and never stop the simulation.
pub trait SimObserver: Send + Sync {
    fn on_tick(&self, snapshot: &Snapshot, events: &[GameEvent]) -> Result<(), ObserverError>;

    fn name(&self) -> &str;

    fn config(&self) -> ObserverConfig {
        ObserverConfig::default()
    }

    /// Called when the registry is dropped.
    fn on_shutdown(&self) {}
}

/// Observers in registration order.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Vec<Box<dyn SimObserver>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: Box<dyn SimObserver>) {
        log::info!("Observer attached: {}", observer.name());
        self.observers.push(observer);
    }

    /// Hands the tick to every observer that is due. Returns how many were.
    ///
    /// A failing observer is logged and skipped; the rest still run.
    pub fn notify(&self, snapshot: &Snapshot, events: &[GameEvent]) -> usize {
        let due = self
            .observers
            .iter()
            .filter(|o| o.config().is_due(snapshot.tick, !events.is_empty()));

        let mut notified = 0;
        for observer in due {
            notified += 1;
            if let Err(e) = observer.on_tick(snapshot, events) {
                log::warn!("Observer '{}' failed on tick {}: {}", observer.name(), snapshot.tick, e);
            }
        }
        notified
    }

    pub fn shutdown(&self) {
        self.observers.iter().for_each(|o| o.on_shutdown());
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl Drop for ObserverRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
