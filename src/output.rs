//! Writers (and a reader) for the files the driver produces.

use anyhow::{Context, Result};
use flock_common::{AgentRecord, Snapshot};
use log::{error, info};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Serialization format for recorded snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Bincode,
    MessagePack,
}

impl OutputFormat {
    /// Maps a config/CLI name to a format. Unknown names fall back to JSON.
    pub fn from_name(name: &str) -> Self {
        match name {
            "json" => OutputFormat::Json,
            "bincode" => OutputFormat::Bincode,
            "messagepack" => OutputFormat::MessagePack,
            other => {
                error!("Unknown output format: {}. Using JSON instead.", other);
                OutputFormat::Json
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Bincode => "bincode",
            OutputFormat::MessagePack => "messagepack",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Bincode => "bin",
            OutputFormat::MessagePack => "msgpack",
        }
    }
}

/// Writes every recorded snapshot to `{base_filename}_snapshots.{ext}`.
pub fn save_snapshots(snapshots: &[Snapshot], base_filename: &str, format: OutputFormat) -> Result<PathBuf> {
    let path = PathBuf::from(format!("{}_snapshots.{}", base_filename, format.extension()));
    let file = File::create(&path).with_context(|| format!("Failed to create snapshot file '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        OutputFormat::Bincode => bincode::serialize_into(&mut writer, snapshots)
            .with_context(|| format!("Failed to serialize snapshots to bincode in '{}'", path.display()))?,
        OutputFormat::MessagePack => rmp_serde::encode::write(&mut writer, snapshots)
            .with_context(|| format!("Failed to serialize snapshots to MessagePack in '{}'", path.display()))?,
        OutputFormat::Json => serde_json::to_writer(&mut writer, snapshots)
            .with_context(|| format!("Failed to serialize snapshots to JSON in '{}'", path.display()))?,
    }
    writer.flush()?;

    info!("{} snapshots saved to {} ({} format)", snapshots.len(), path.display(), format.name());
    Ok(path)
}

/// Reads back a snapshot file written by [`save_snapshots`].
pub fn load_snapshots(path: &Path, format: OutputFormat) -> Result<Vec<Snapshot>> {
    let file = File::open(path).with_context(|| format!("Failed to open snapshot file '{}'", path.display()))?;
    let reader = BufReader::new(file);
    let snapshots = match format {
        OutputFormat::Bincode => bincode::deserialize_from(reader)
            .with_context(|| format!("Failed to decode bincode snapshots from '{}'", path.display()))?,
        OutputFormat::MessagePack => rmp_serde::from_read(reader)
            .with_context(|| format!("Failed to decode MessagePack snapshots from '{}'", path.display()))?,
        OutputFormat::Json => serde_json::from_reader(reader)
            .with_context(|| format!("Failed to decode JSON snapshots from '{}'", path.display()))?,
    };
    Ok(snapshots)
}

/// Writes final agent states to `{base_filename}_final_agents.csv`.
pub fn save_final_agents(records: &[AgentRecord], base_filename: &str) -> Result<PathBuf> {
    let path = PathBuf::from(format!("{}_final_agents.csv", base_filename));
    let mut writer =
        csv::Writer::from_path(&path).with_context(|| format!("Failed to create CSV file '{}'", path.display()))?;
    writer.write_record(["x", "y", "vx", "vy"])?;
    for record in records {
        writer.write_record(&[
            format!("{:.4}", record.location.x),
            format!("{:.4}", record.location.y),
            format!("{:.4}", record.velocity.x),
            format!("{:.4}", record.velocity.y),
        ])?;
    }
    writer.flush()?;
    info!("Final agent states saved to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlockSimulation;
    use flock_common::FlockConfig;

    fn temp_base(tag: &str) -> String {
        std::env::temp_dir()
            .join(format!("flock_output_{}_{}", std::process::id(), tag))
            .to_string_lossy()
            .into_owned()
    }

    /// Two snapshots without agents (the default) and one carrying them.
    fn recorded_snapshots() -> Vec<Snapshot> {
        let mut config = FlockConfig::default();
        config.flock.boid_count = 5;
        config.initial_conditions.seed = Some(17);
        let mut sim = FlockSimulation::new(config.clone()).unwrap();
        sim.record_snapshot();
        sim.advance();
        sim.record_snapshot();
        let mut snapshots = sim.recorded_snapshots().to_vec();

        config.output.save_agents_in_snapshot = true;
        let mut with_agents = FlockSimulation::new(config).unwrap();
        snapshots.push(with_agents.record_snapshot().clone());
        snapshots
    }

    fn assert_round_trip(format: OutputFormat) {
        let snapshots = recorded_snapshots();
        assert!(snapshots[0].agents.is_none());
        assert_eq!(snapshots[2].agents.as_ref().map(Vec::len), Some(5));

        let path = save_snapshots(&snapshots, &temp_base(format.name()), format).unwrap();
        let loaded = load_snapshots(&path, format);
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.unwrap(), snapshots);
    }

    #[test]
    fn json_snapshots_read_back() {
        assert_round_trip(OutputFormat::Json);
    }

    #[test]
    fn bincode_snapshots_read_back() {
        assert_round_trip(OutputFormat::Bincode);
    }

    #[test]
    fn messagepack_snapshots_read_back() {
        assert_round_trip(OutputFormat::MessagePack);
    }

    #[test]
    fn format_names_map_with_json_fallback() {
        assert_eq!(OutputFormat::from_name("bincode"), OutputFormat::Bincode);
        assert_eq!(OutputFormat::from_name("messagepack"), OutputFormat::MessagePack);
        assert_eq!(OutputFormat::from_name("yaml"), OutputFormat::Json);
        assert_eq!(OutputFormat::MessagePack.extension(), "msgpack");
    }

    #[test]
    fn final_agents_csv_has_one_row_per_agent() {
        let records = vec![
            AgentRecord { location: flock_common::Vec2::new(1.0, 2.0), velocity: flock_common::Vec2::new(0.5, -0.5) },
            AgentRecord { location: flock_common::Vec2::new(3.0, 4.0), velocity: flock_common::Vec2::zero() },
        ];
        let path = save_final_agents(&records, &temp_base("csv")).unwrap();
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>().unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(headers, vec!["x", "y", "vx", "vy"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "1.0000");
        assert_eq!(&rows[0][3], "-0.5000");
    }
}
