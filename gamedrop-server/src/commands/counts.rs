//! Counts command - per-game download totals

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use super::get_context;
use crate::output;

pub fn run(data_dir: &Path, json: bool) -> Result<()> {
    let ctx = get_context(data_dir)?;
    let counters = ctx.ledger.counters()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&counters)?);
        return Ok(());
    }

    if counters.is_empty() {
        output::info("No downloads recorded yet.");
        return Ok(());
    }

    let total: u64 = counters.values().sum();
    let mut table = output::create_table();
    table.set_header(vec!["Game", "Downloads"]);
    for (artifact_id, count) in &counters {
        table.add_row(vec![artifact_id.clone(), count.to_string()]);
    }
    println!("{}", table);
    println!("{} {}", "Total:".bold(), total);
    Ok(())
}
