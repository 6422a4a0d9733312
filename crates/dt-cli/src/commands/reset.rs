//! Reset command for clearing all accumulated time.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use dt_core::TotalsStore;
use dt_db::Database;

/// Runs the reset command.
///
/// Asks for confirmation on `input` unless `assume_yes` is set. Returns whether
/// the totals were cleared.
pub fn run<R: BufRead, W: Write>(
    db: &mut Database,
    input: &mut R,
    output: &mut W,
    assume_yes: bool,
) -> Result<bool> {
    if !assume_yes {
        write!(output, "Clear all tracked times? [y/N] ")?;
        output.flush()?;

        let mut answer = String::new();
        input
            .read_line(&mut answer)
            .context("failed to read confirmation")?;
        if !matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
            writeln!(output, "Aborted.")?;
            return Ok(false);
        }
    }

    db.reset().context("failed to reset domain totals")?;
    tracing::info!("domain totals reset");
    writeln!(output, "All tracked times cleared.")?;
    Ok(true)
}
