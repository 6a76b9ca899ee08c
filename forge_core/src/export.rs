//! CSV export of the volume dashboard.

use crate::{Result, VolumeSummary};
use std::io::Write;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    muscle_group: &'a str,
    current_volume: f64,
    mev: f64,
    mav: f64,
    mrv: f64,
    status: String,
    recommendation: &'a str,
}

impl<'a> From<&'a VolumeSummary> for CsvRow<'a> {
    fn from(row: &'a VolumeSummary) -> Self {
        CsvRow {
            muscle_group: row.muscle_group.as_str(),
            current_volume: row.current_volume,
            mev: row.mev,
            mav: row.mav,
            mrv: row.mrv,
            status: row.status.to_string(),
            recommendation: &row.recommendation,
        }
    }
}

/// Write the summary with headers, replacing `path` atomically.
///
/// The rows go to a temp file in the same directory, which is synced and
/// then renamed over the target, so readers never see a half-written file.
pub fn write_volume_summary_csv(path: &Path, rows: &[VolumeSummary]) -> Result<usize> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let temp = tempfile::NamedTempFile::new_in(dir)?;
    let mut writer = csv::Writer::from_writer(temp);
    for row in rows {
        writer.serialize(CsvRow::from(row))?;
    }
    writer.flush()?;

    let mut temp = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    temp.flush()?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    tracing::info!("Wrote {} volume rows to {:?}", rows.len(), path);
    Ok(rows.len())
}
