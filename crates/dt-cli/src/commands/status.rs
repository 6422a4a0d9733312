//! Status command for showing where totals live and how much is tracked.

use std::io::Write;

use anyhow::Result;
use chrono::SecondsFormat;
use dt_core::TOTALS_KEY;
use dt_db::Database;

use crate::Config;
use crate::commands::report::format_hms;

pub fn run<W: Write>(writer: &mut W, db: &Database, config: &Config) -> Result<()> {
    let totals = db.domain_totals()?;
    let updated = db.updated_at(TOTALS_KEY)?;

    writeln!(writer, "Domain time tracker status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    writeln!(writer, "Domains:  {}", totals.len())?;
    writeln!(writer, "Tracked:  {}", format_hms(totals.total_seconds()))?;
    match updated {
        Some(at) => writeln!(
            writer,
            "Updated:  {}",
            at.to_rfc3339_opts(SecondsFormat::Secs, true)
        )?,
        None => writeln!(writer, "Updated:  never")?,
    }

    Ok(())
}
