//! Account commands - the local approval workflow

use std::path::Path;

use anyhow::Result;
use gamedrop_core::domain::Transition;
use gamedrop_core::{PendingRequest, Tier};

use super::get_context;
use crate::output;

pub fn pending(data_dir: &Path, json: bool) -> Result<()> {
    let ctx = get_context(data_dir)?;
    let pending: Vec<PendingRequest> = ctx
        .repository
        .list_accounts_by_tier(Tier::Pending)?
        .iter()
        .map(PendingRequest::from)
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&pending)?);
        return Ok(());
    }

    if pending.is_empty() {
        output::info("No pending accounts.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["ID", "Identity", "Display name", "Email"]);
    for request in pending {
        table.add_row(vec![
            request.id.to_string(),
            request.identity,
            request.display_name,
            request.contact_email,
        ]);
    }
    println!("{}", table);
    Ok(())
}

pub fn approve(data_dir: &Path, id: i64) -> Result<()> {
    let ctx = get_context(data_dir)?;
    ctx.accounts.apply_transition(id, Transition::Approve)?;
    output::success(&format!("Approved account {}", id));
    Ok(())
}

pub fn decline(data_dir: &Path, id: i64) -> Result<()> {
    let ctx = get_context(data_dir)?;
    ctx.accounts.apply_transition(id, Transition::Decline)?;
    output::success(&format!("Declined and removed account {}", id));
    Ok(())
}
