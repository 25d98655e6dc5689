use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Accumulated timing and throughput counters for the tick loop.
#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct SimMetrics {
    /// Ticks that advanced game time (paused ticks are not counted)
    pub total_ticks: u64,
    pub total_time: Duration,
    pub economy_time: Duration,
    pub military_time: Duration,
    pub combat_time: Duration,
    pub ai_time: Duration,
    /// Reaping, occupation and automatic peace
    pub end_of_tick_time: Duration,
    pub observer_time: Duration,
    pub economy_passes: u64,
    pub military_passes: u64,
    pub combat_rounds: u64,
    pub ai_passes: u64,
    pub battles_fought: u64,
}

impl SimMetrics {
    pub fn tick_avg_ms(&self) -> f64 {
        if self.total_ticks == 0 {
            0.0
        } else {
            self.total_time.as_secs_f64() * 1000.0 / self.total_ticks as f64
        }
    }

    /// Simulated game days per second of wall time spent ticking.
    pub fn days_per_second(&self, days_simulated: f64) -> f64 {
        if self.total_time.as_secs_f64() == 0.0 {
            0.0
        } else {
            days_simulated / self.total_time.as_secs_f64()
        }
    }
}
