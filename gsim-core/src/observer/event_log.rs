//! Event stream and the observer that records it.
//!
//! Subsystems append a [`GameEvent`] for every notable change during a tick;
//! the scheduler hands the tick's events to observers together with the
//! snapshot. [`EventLogObserver`] keeps them in memory and optionally writes
//! them as JSON lines:
//!
//! ```json
//! {"tick":12,"date":"1936.1.1","type":"war_declared","attacker":"GER","defender":"POL"}
//! ```

use super::{ObserverConfig, ObserverError, SimObserver, Snapshot};
use crate::diplomacy::{PeaceOutcome, TreatyId};
use crate::fixed::Fixed;
use crate::state::{ProvinceId, Tag};
use crate::systems::combat::BattleReport;
use crate::units::{TemplateId, UnitId};
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Write};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// A daily income pass ran (one event per pass)
    IncomeCollected { total: Fixed },

    UnitRecruited {
        unit: UnitId,
        owner: Tag,
        template: TemplateId,
        province: ProvinceId,
    },

    UnitMoved {
        unit: UnitId,
        from: ProvinceId,
        to: ProvinceId,
    },

    /// Removed at the end of the tick after dropping to zero hit points
    UnitDestroyed {
        unit: UnitId,
        owner: Tag,
        province: ProvinceId,
    },

    BattleFought(BattleReport),

    ProvinceOccupied {
        province: ProvinceId,
        #[serde(skip_serializing_if = "Option::is_none")]
        previous: Option<Tag>,
        controller: Tag,
    },

    WarDeclared { attacker: Tag, defender: Tag },

    PeaceOffered { treaty: TreatyId, from: Tag, to: Tag },

    /// A war ended. White peace has no annexations and no reparations.
    PeaceSigned {
        winner: Tag,
        loser: Tag,
        annexed: Vec<ProvinceId>,
        reparations: Fixed,
    },
}

impl From<PeaceOutcome> for GameEvent {
    fn from(outcome: PeaceOutcome) -> Self {
        GameEvent::PeaceSigned {
            winner: outcome.winner,
            loser: outcome.loser,
            annexed: outcome.annexed,
            reparations: outcome.reparations,
        }
    }
}

/// An event stamped with the tick and date it happened on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub tick: u64,
    pub date: String,
    #[serde(flatten)]
    pub event: GameEvent,
}

/// Records every event it is shown.
///
/// # Example
///
/// ```ignore
/// let observer = EventLogObserver::stdout();   // JSONL to stdout
/// let observer = EventLogObserver::in_memory(); // query with `events()`
/// ```
pub struct EventLogObserver {
    writer: Mutex<Box<dyn Write + Send>>,
    records: Mutex<Vec<LoggedEvent>>,
    config: ObserverConfig,
}

impl EventLogObserver {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
            records: Mutex::new(Vec::new()),
            config: ObserverConfig {
                frequency: u32::MAX,
                notify_on_events: true,
            },
        }
    }

    /// Buffered JSONL on stdout, for piping into `jq`.
    pub fn stdout() -> Self {
        Self::new(Box::new(BufWriter::new(std::io::stdout())))
    }

    /// Keeps events in memory only.
    pub fn in_memory() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Everything recorded so far, oldest first.
    pub fn events(&self) -> Vec<LoggedEvent> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    fn write_event(&self, writer: &mut dyn Write, event: &LoggedEvent) -> Result<(), ObserverError> {
        serde_json::to_writer(&mut *writer, event)?;
        writeln!(writer)?;
        Ok(())
    }
}

impl SimObserver for EventLogObserver {
    fn on_tick(&self, snapshot: &Snapshot, events: &[GameEvent]) -> Result<(), ObserverError> {
        if events.is_empty() {
            return Ok(());
        }
        let date = snapshot.date.to_string();
        let logged: Vec<LoggedEvent> = events
            .iter()
            .map(|event| LoggedEvent {
                tick: snapshot.tick,
                date: date.clone(),
                event: event.clone(),
            })
            .collect();

        {
            let mut writer = self
                .writer
                .lock()
                .map_err(|_| ObserverError::Poisoned("EventLogObserver writer".into()))?;
            for event in &logged {
                self.write_event(&mut **writer, event)?;
            }
            writer.flush()?;
        }

        self.records
            .lock()
            .map_err(|_| ObserverError::Poisoned("EventLogObserver records".into()))?
            .extend(logged);
        Ok(())
    }

    fn name(&self) -> &str {
        "EventLogObserver"
    }

    fn config(&self) -> ObserverConfig {
        self.config.clone()
    }

    fn on_shutdown(&self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}
