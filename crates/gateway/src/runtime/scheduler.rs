//! Workflow scheduler — a minute-resolution tick loop over DB-stored
//! schedules.
//!
//! Each tick loads the schedules of every active workflow and fires
//! [`run_workflow`] for those due in the configured timezone. An
//! in-memory last-fired map keeps a schedule from double-firing when
//! several ticks land inside the same minute.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Timelike, Utc};
use uuid::Uuid;

use valet_storage::WorkflowScheduleRow;

use crate::runtime::workflow::run_workflow;
use crate::state::AppState;

/// Parse a timezone string into a `chrono_tz::Tz`, falling back to UTC.
pub fn parse_tz(tz: &str) -> chrono_tz::Tz {
    tz.parse::<chrono_tz::Tz>().unwrap_or(chrono_tz::UTC)
}

/// Convert a 12-hour clock value with optional meridiem to 24-hour.
fn to_24h(hour: i32, meridiem: Option<&str>) -> i32 {
    match meridiem.map(|m| m.to_ascii_uppercase()) {
        Some(m) if m == "AM" => {
            if hour == 12 {
                0
            } else {
                hour
            }
        }
        Some(m) if m == "PM" => {
            if hour == 12 {
                12
            } else {
                hour + 12
            }
        }
        _ => hour,
    }
}

/// Whether a schedule is due at the given local wall-clock minute.
///
/// - `hour`: fires at the configured minute of every hour.
/// - `day`: fires at the configured hour+minute every day.
/// - `week`: additionally matches the ISO weekday (1 = Monday).
pub fn is_due(schedule: &WorkflowScheduleRow, local: &chrono::NaiveDateTime) -> bool {
    let minute = schedule.minute.unwrap_or(0);
    match schedule.repeat_every.as_str() {
        "hour" => local.minute() as i32 == minute,
        "day" => {
            let hour = to_24h(schedule.hour.unwrap_or(0), schedule.meridiem.as_deref());
            local.hour() as i32 == hour && local.minute() as i32 == minute
        }
        "week" => {
            let hour = to_24h(schedule.hour.unwrap_or(0), schedule.meridiem.as_deref());
            let weekday = local.weekday().number_from_monday() as i32;
            schedule.week_day == Some(weekday)
                && local.hour() as i32 == hour
                && local.minute() as i32 == minute
        }
        other => {
            tracing::warn!(repeat_every = %other, schedule_id = %schedule.id, "unknown cadence");
            false
        }
    }
}

/// Minute bucket used by the double-fire guard.
fn minute_key(at: &DateTime<Utc>) -> i64 {
    at.timestamp() / 60
}

/// The scheduler loop. Runs until the process exits.
pub async fn run(state: AppState) {
    let tz = parse_tz(&state.config.scheduler.timezone);
    let mut interval =
        tokio::time::interval(std::time::Duration::from_secs(state.config.scheduler.tick_sec));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut last_fired: HashMap<Uuid, i64> = HashMap::new();

    loop {
        interval.tick().await;
        let now = Utc::now();

        let schedules = match state.db.workflows().active_schedules().await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "loading schedules failed — skipping tick");
                continue;
            }
        };

        let local = now.with_timezone(&tz).naive_local();
        let key = minute_key(&now);

        for schedule in schedules {
            if !is_due(&schedule, &local) {
                continue;
            }
            if last_fired.get(&schedule.workflow_id) == Some(&key) {
                continue;
            }
            last_fired.insert(schedule.workflow_id, key);

            let workflow = match state.db.workflows().get_active(schedule.workflow_id).await {
                Ok(Some(w)) if w.is_active => w,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, workflow_id = %schedule.workflow_id, "loading workflow failed");
                    continue;
                }
            };

            tracing::info!(workflow_id = %workflow.id, name = %workflow.name, "schedule due — firing");
            let state = state.clone();
            tokio::spawn(async move {
                let _ = run_workflow(&state, &workflow).await;
            });
        }

        // Keep the guard map from growing without bound.
        last_fired.retain(|_, fired| *fired >= key - 2);
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn schedule(
        repeat_every: &str,
        week_day: Option<i32>,
        hour: Option<i32>,
        minute: Option<i32>,
        meridiem: Option<&str>,
    ) -> WorkflowScheduleRow {
        WorkflowScheduleRow {
            id: Uuid::new_v4(),
            workflow_id: Uuid::new_v4(),
            repeat_every: repeat_every.into(),
            week_day,
            hour,
            minute,
            meridiem: meridiem.map(str::to_owned),
            created_date: Utc::now(),
            updated_date: Utc::now(),
        }
    }

    fn at(y: i32, m: u32, d: u32, hour: u32, minute: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn hourly_fires_on_its_minute() {
        let s = schedule("hour", None, None, Some(15), None);
        assert!(is_due(&s, &at(2025, 6, 2, 9, 15)));
        assert!(is_due(&s, &at(2025, 6, 2, 23, 15)));
        assert!(!is_due(&s, &at(2025, 6, 2, 9, 16)));
    }

    #[test]
    fn daily_uses_meridiem() {
        let s = schedule("day", None, Some(8), Some(30), Some("PM"));
        assert!(is_due(&s, &at(2025, 6, 2, 20, 30)));
        assert!(!is_due(&s, &at(2025, 6, 2, 8, 30)));
    }

    #[test]
    fn twelve_am_is_midnight_and_twelve_pm_is_noon() {
        let midnight = schedule("day", None, Some(12), Some(0), Some("AM"));
        assert!(is_due(&midnight, &at(2025, 6, 2, 0, 0)));
        assert!(!is_due(&midnight, &at(2025, 6, 2, 12, 0)));

        let noon = schedule("day", None, Some(12), Some(0), Some("PM"));
        assert!(is_due(&noon, &at(2025, 6, 2, 12, 0)));
        assert!(!is_due(&noon, &at(2025, 6, 2, 0, 0)));
    }

    #[test]
    fn weekly_matches_iso_weekday() {
        // 2025-06-02 is a Monday.
        let s = schedule("week", Some(1), Some(9), Some(0), Some("AM"));
        assert!(is_due(&s, &at(2025, 6, 2, 9, 0)));
        assert!(!is_due(&s, &at(2025, 6, 3, 9, 0)));
    }

    #[test]
    fn unknown_cadence_never_fires() {
        let s = schedule("fortnight", None, None, None, None);
        assert!(!is_due(&s, &at(2025, 6, 2, 0, 0)));
    }

    #[test]
    fn hour_without_meridiem_is_already_24h() {
        let s = schedule("day", None, Some(20), Some(5), None);
        assert!(is_due(&s, &at(2025, 6, 2, 20, 5)));
    }
}
