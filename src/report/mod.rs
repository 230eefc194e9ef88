use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};

use crate::db::ScanRecord;

/// Renders the count report for one date and writes it into `out_dir`,
/// creating the directory if needed. Returns the path of the written file.
pub fn write_report(records: &[ScanRecord], date: NaiveDate, out_dir: &Path) -> Result<PathBuf> {
    let document = render_report(records, date, Utc::now());
    let path = out_dir.join(format!("package-report-{date}.txt"));

    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create report directory {}", out_dir.display()))?;
    fs::write(&path, document)
        .with_context(|| format!("failed to write report to {}", path.display()))?;

    Ok(path)
}

fn render_report(records: &[ScanRecord], date: NaiveDate, generated_at: DateTime<Utc>) -> String {
    let mut doc = String::new();

    let _ = writeln!(doc, "Package count report - {}", date.format("%d/%m/%Y"));
    let _ = writeln!(doc, "Total packages: {}", records.len());
    let _ = writeln!(doc, "Generated at: {}", generated_at.format("%d/%m/%Y %H:%M"));
    doc.push('\n');

    let _ = writeln!(doc, "{:<8}  {}", "Time", "NFe key");
    let _ = writeln!(doc, "{:<8}  {}", "-".repeat(8), "-".repeat(44));
    for record in records {
        let _ = writeln!(
            doc,
            "{:<8}  {}",
            record.created_at.format("%H:%M:%S"),
            record.nfe_key
        );
    }

    doc
}
