use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Workflow scheduler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    /// Evaluation tick interval in seconds. Schedules have minute
    /// resolution, so anything at or below 60 works.
    #[serde(default = "d_tick_sec")]
    pub tick_sec: u64,
    /// IANA timezone schedules are evaluated in.
    #[serde(default = "d_timezone")]
    pub timezone: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: d_true(),
            tick_sec: d_tick_sec(),
            timezone: d_timezone(),
        }
    }
}

fn d_true() -> bool {
    true
}
fn d_tick_sec() -> u64 {
    60
}
fn d_timezone() -> String {
    "UTC".into()
}
