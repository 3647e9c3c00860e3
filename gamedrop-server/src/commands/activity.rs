//! Activity command - view the durable activity log

use std::path::Path;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use colored::Colorize;

use gamedrop_core::services::ActivityLog;

use crate::output;

fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

fn open_log(data_dir: &Path) -> Result<ActivityLog> {
    std::fs::create_dir_all(data_dir)?;
    Ok(ActivityLog::new(data_dir)?)
}

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Unix milliseconds `days` before now
fn cutoff_ms(days: u64) -> i64 {
    let days = i64::try_from(days).unwrap_or(i64::MAX);
    Utc::now().timestamp_millis().saturating_sub(days.saturating_mul(DAY_MS))
}

/// Delete entries older than `days`
pub fn prune(data_dir: &Path, days: u64, json: bool) -> Result<()> {
    let log = open_log(data_dir)?;
    let deleted = log.delete_before(cutoff_ms(days))?;

    if json {
        println!("{}", serde_json::json!({ "deleted": deleted }));
    } else {
        output::success(&format!(
            "Deleted {} activity entries from {}",
            deleted,
            log.db_path().display()
        ));
    }
    Ok(())
}

/// Reads `activity.duckdb` directly; no catalog access needed
pub fn run(data_dir: &Path, limit: usize, errors: bool, json: bool) -> Result<()> {
    let log = open_log(data_dir)?;
    let entries = if errors {
        log.get_errors(limit)?
    } else {
        log.get_recent(limit)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        output::info("No activity recorded.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Time", "Event", "Account", "Game", "Error"]);
    for entry in entries {
        table.add_row(vec![
            format_timestamp(entry.timestamp),
            entry.event,
            entry.account_id.map(|id| id.to_string()).unwrap_or_default(),
            entry.artifact_id.unwrap_or_default(),
            entry
                .error_message
                .map(|m| m.red().to_string())
                .unwrap_or_default(),
        ]);
    }
    println!("{}", table);
    Ok(())
}
