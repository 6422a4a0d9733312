//! Report command for showing accumulated time per domain.
//!
//! Domains are ranked by time spent, most first, in human-readable
//! (`hh:mm:ss`) or JSON form.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use dt_core::DomainTotals;
use dt_db::Database;
use serde::Serialize;

/// One ranked row of the JSON report.
#[derive(Debug, Serialize)]
struct DomainEntry<'a> {
    domain: &'a str,
    seconds: u64,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    domains: Vec<DomainEntry<'a>>,
    total_seconds: u64,
}

/// Formats seconds as zero-padded `hh:mm:ss`. Hours grow past two digits.
pub fn format_hms(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Renders the ranked totals as aligned text.
pub fn format_report(totals: &DomainTotals) -> String {
    let mut output = String::new();

    if totals.is_empty() {
        writeln!(output, "No data yet.").unwrap();
        return output;
    }

    let ranked = totals.ranked();
    let width = ranked
        .iter()
        .map(|(domain, _)| domain.as_str().chars().count())
        .max()
        .unwrap_or(0)
        .max("Total".len());

    for (domain, seconds) in &ranked {
        writeln!(
            output,
            "{:<width$}  {}",
            domain.as_str(),
            format_hms(*seconds)
        )
        .unwrap();
    }
    writeln!(output).unwrap();
    writeln!(
        output,
        "{:<width$}  {}",
        "Total",
        format_hms(totals.total_seconds())
    )
    .unwrap();

    output
}

/// Renders the ranked totals as pretty-printed JSON.
pub fn format_json(totals: &DomainTotals) -> Result<String> {
    let report = JsonReport {
        domains: totals
            .ranked()
            .into_iter()
            .map(|(domain, seconds)| DomainEntry {
                domain: domain.as_str(),
                seconds,
            })
            .collect(),
        total_seconds: totals.total_seconds(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Runs the report command.
pub fn run<W: Write>(writer: &mut W, db: &Database, json: bool) -> Result<()> {
    let totals = db.domain_totals()?;
    tracing::debug!(domains = totals.len(), "loaded domain totals");

    if json {
        writeln!(writer, "{}", format_json(&totals)?)?;
    } else {
        write!(writer, "{}", format_report(&totals))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use dt_core::DomainId;
    use insta::assert_snapshot;

    fn sample() -> DomainTotals {
        [
            (DomainId::new("github.com").unwrap(), 75),
            (DomainId::new("docs.rs").unwrap(), 420),
            (DomainId::new("a.io").unwrap(), 75),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn format_hms_pads_each_unit() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(59), "00:00:59");
        assert_eq!(format_hms(3_661), "01:01:01");
        assert_eq!(format_hms(360_000), "100:00:00");
    }

    #[test]
    fn empty_report_has_placeholder() {
        assert_eq!(format_report(&DomainTotals::new()), "No data yet.\n");
    }

    #[test]
    fn report_ranks_domains_by_time() {
        assert_snapshot!(format_report(&sample()), @r"
        docs.rs     00:07:00
        a.io        00:01:15
        github.com  00:01:15

        Total       00:09:30
        ");
    }

    #[test]
    fn json_report_is_ranked() {
        let json: serde_json::Value = serde_json::from_str(&format_json(&sample()).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "domains": [
                    {"domain": "docs.rs", "seconds": 420},
                    {"domain": "a.io", "seconds": 75},
                    {"domain": "github.com", "seconds": 75},
                ],
                "total_seconds": 570,
            })
        );
    }

    #[test]
    fn run_reads_totals_from_database() {
        let db = Database::open_in_memory().unwrap();
        db.set_domain_totals(&sample()).unwrap();

        let mut output = Vec::new();
        run(&mut output, &db, false).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert!(output.starts_with("docs.rs     00:07:00\n"));
    }
}
