// inspect.rs — `mbt inspect`: print a decoded trace without replaying it.

use std::path::Path;

use mbt_authz::{Action, Trace};

use super::truncate;

const STEP_WIDTH: usize = 6;
const ACTION_WIDTH: usize = 14;
const GRANT_WIDTH: usize = 36;

pub fn execute(file: &Path) -> anyhow::Result<()> {
    let trace = Trace::load(file)?;

    println!("Trace: {}", file.display());
    if !trace.vars.is_empty() {
        println!("Vars:  {}", trace.vars.join(", "));
    }
    println!();
    let header = row("STEP", "ACTION", "GRANT", "EXPECTED");
    println!("{}", header);
    println!("{}", "-".repeat(header.len().max(92)));

    for step in &trace.steps {
        let action = match &step.action {
            Action::Init => "init",
            other => other.tag(),
        };
        let grant = step
            .action
            .grant()
            .map(|g| g.to_string())
            .unwrap_or_default();
        println!(
            "{}",
            row(
                &step.index.to_string(),
                action,
                &grant,
                step.outcome.map(|o| o.as_str()).unwrap_or("-"),
            )
        );
    }
    println!("\n{} step(s).", trace.steps.len());

    Ok(())
}

/// One table line; every column but the last is cut to its width.
fn row(step: &str, action: &str, grant: &str, expected: &str) -> String {
    format!(
        "{:<sw$} {:<aw$} {:<gw$} {}",
        truncate(step, STEP_WIDTH),
        truncate(action, ACTION_WIDTH),
        truncate(grant, GRANT_WIDTH),
        expected,
        sw = STEP_WIDTH,
        aw = ACTION_WIDTH,
        gw = GRANT_WIDTH,
    )
}
