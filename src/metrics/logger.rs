use super::MetricsSnapshot;
use anyhow::Result;
use csv::Writer;
use std::path::Path;

/// Dump a whole run's snapshots as one CSV, header row included.
pub fn write_snapshots(path: impl AsRef<Path>, snapshots: &[MetricsSnapshot]) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    for snapshot in snapshots {
        writer.serialize(snapshot)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a snapshot CSV back, e.g. to re-analyze an old run.
pub fn read_snapshots(path: impl AsRef<Path>) -> Result<Vec<MetricsSnapshot>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut snapshots = Vec::new();
    for record in reader.deserialize() {
        snapshots.push(record?);
    }
    Ok(snapshots)
}
