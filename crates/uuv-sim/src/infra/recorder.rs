//! JSONL telemetry recording.
//!
//! One line per entry: run boundaries, every sensor sample and periodic
//! motor snapshots, stamped with simulation time.

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use uuv_core::{SensorSample, SimulationTime, Vehicle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryEventType {
    RunStart,
    SensorSample,
    MotorCommand,
    RunComplete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEntry {
    /// Simulation time in microseconds
    pub timestamp_us: u64,
    pub event_type: TelemetryEventType,
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct MotorSnapshot<'a> {
    pub name: &'a str,
    pub rpm: f64,
    pub desired_rpm: f64,
    pub thrust: f64,
}

pub struct TelemetryRecorder {
    writer: BufWriter<File>,
    entries: u64,
}

impl TelemetryRecorder {
    /// Truncates an existing file; parent directories are created.
    pub fn new(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: BufWriter::with_capacity(64 * 1024, file),
            entries: 0,
        })
    }

    pub fn log(&mut self, entry: &TelemetryEntry) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, entry)?;
        self.writer.write_all(b"\n")?;
        self.entries += 1;
        Ok(())
    }

    pub fn log_event(
        &mut self,
        time: SimulationTime,
        event_type: TelemetryEventType,
        details: serde_json::Value,
    ) -> std::io::Result<()> {
        self.log(&TelemetryEntry {
            timestamp_us: time.as_micros(),
            event_type,
            details,
        })
    }

    pub fn log_samples(&mut self, samples: &[SensorSample]) -> std::io::Result<()> {
        for sample in samples {
            let details = serde_json::to_value(sample)?;
            self.log_event(sample.timestamp(), TelemetryEventType::SensorSample, details)?;
        }
        Ok(())
    }

    pub fn log_motors(&mut self, time: SimulationTime, vehicle: &Vehicle) -> std::io::Result<()> {
        let motors: Vec<MotorSnapshot<'_>> = vehicle
            .motors()
            .iter()
            .map(|m| MotorSnapshot {
                name: m.name(),
                rpm: m.rpm(),
                desired_rpm: m.desired_rpm(),
                thrust: m.thrust(),
            })
            .collect();
        let details = serde_json::json!({ "motors": motors });
        self.log_event(time, TelemetryEventType::MotorCommand, details)
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use tempfile::tempdir;
    use uuv_core::sensors::VectorSample;
    use uuv_core::Vec3;

    fn read_entries(path: &Path) -> Vec<TelemetryEntry> {
        let file = File::open(path).unwrap();
        BufReader::new(file)
            .lines()
            .map(|l| serde_json::from_str(&l.unwrap()).unwrap())
            .collect()
    }

    #[test]
    fn writes_one_line_per_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("run.jsonl");

        let mut recorder = TelemetryRecorder::new(&path).unwrap();
        recorder
            .log_event(
                SimulationTime::ZERO,
                TelemetryEventType::RunStart,
                serde_json::json!({"target": [0.0, 0.0, 2.0]}),
            )
            .unwrap();
        let sample = SensorSample::Gyroscope(VectorSample {
            timestamp: SimulationTime::from_micros(4_000),
            value: Vec3::new(0.0, 0.0, 0.25),
        });
        recorder.log_samples(&[sample]).unwrap();
        recorder.flush().unwrap();
        assert_eq!(recorder.entries(), 2);

        let entries = read_entries(&path);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event_type, TelemetryEventType::RunStart);
        assert_eq!(entries[1].event_type, TelemetryEventType::SensorSample);
        assert_eq!(entries[1].timestamp_us, 4_000);
        assert_eq!(entries[1].details["sensor"], "gyroscope");
    }

    #[test]
    fn reopening_truncates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        for _ in 0..2 {
            let mut recorder = TelemetryRecorder::new(&path).unwrap();
            recorder
                .log_event(
                    SimulationTime::ZERO,
                    TelemetryEventType::RunComplete,
                    serde_json::Value::Null,
                )
                .unwrap();
            recorder.flush().unwrap();
        }
        assert_eq!(read_entries(&path).len(), 1);
    }
}
