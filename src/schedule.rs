use std::str::FromStr;

use chrono::{DateTime, Local, NaiveTime, TimeZone, Timelike};
use cron::Schedule;
use thiserror::Error;

use crate::scan::Radar;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Invalid cron expression '{expression}': {message}")]
    InvalidExpression { expression: String, message: String },
}

/// Daily cron schedule (`sec min hour * * *`) firing at `time`.
pub fn daily_schedule(time: &NaiveTime) -> Result<Schedule, ScheduleError> {
    let expression = format!("0 {} {} * * *", time.minute(), time.hour());
    Schedule::from_str(&expression).map_err(|e| ScheduleError::InvalidExpression {
        expression: expression.clone(),
        message: e.to_string(),
    })
}

/// The earliest firing strictly after `now`, in `now`'s time zone.
pub fn next_trigger<Tz: TimeZone>(
    now: &DateTime<Tz>,
    schedules: &[Schedule],
) -> Option<DateTime<Tz>> {
    schedules.iter().filter_map(|s| s.after(now).next()).min()
}

async fn scan_once(radar: &Radar) {
    match radar.run_scan().await {
        Ok(report) => tracing::debug!("Scan report: {:?}", report),
        Err(e) => tracing::error!("Scan aborted: {}", e),
    }
}

/// Scan once now, then at each daily trigger time in local time, forever.
///
/// Scans run inline on this task, so a trigger that passes while a scan is
/// still running is skipped rather than queued.
pub async fn run(radar: &Radar, times: &[NaiveTime]) -> Result<(), ScheduleError> {
    let schedules = times
        .iter()
        .map(daily_schedule)
        .collect::<Result<Vec<_>, _>>()?;

    scan_once(radar).await;

    loop {
        let now = Local::now();
        let Some(next) = next_trigger(&now, &schedules) else {
            tracing::info!("No schedule_times configured; exiting after startup scan");
            return Ok(());
        };
        let wait = next.signed_duration_since(now).to_std().unwrap_or_default();
        tracing::info!("Next scan at {}", next.format("%Y-%m-%d %H:%M %Z"));
        tokio::time::sleep(wait).await;
        scan_once(radar).await;
    }
}
