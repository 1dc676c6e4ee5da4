//! Telemetry flight recorder.
//!
//! Every control tick appends one record to a preallocated in-memory
//! buffer; the buffer is written out as CSV on `stop` and on shutdown.
//! Recording is strictly best-effort: a full buffer drops records
//! silently and a failed allocation just disables logging. Control never
//! waits on telemetry.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use rover_core::error::{RoverError, RoverResult};

use crate::nav::NavState;

/// Operator-visible mode, logged with every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    Idle,
    Joystick,
    Voice,
}

impl OperatingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            OperatingMode::Idle => "IDLE",
            OperatingMode::Joystick => "JOYSTICK",
            OperatingMode::Voice => "VOICE",
        }
    }
}

/// One control-tick snapshot.
#[derive(Debug, Clone, Copy)]
pub struct LogRecord {
    pub time_sec: f64,
    pub mode: OperatingMode,
    pub pwm_left_ns: i64,
    pub raw_left: i16,
    pub pwm_right_ns: i64,
    pub raw_right: i16,
    pub target_left: i32,
    pub actual_left: i32,
    pub target_right: i32,
    pub actual_right: i32,
    pub gyro_z_dps: f64,
    pub x_ft: f64,
    pub y_ft: f64,
    pub heading_deg: f64,
    pub nav_state: NavState,
}

const CSV_HEADER: &str = "time,mode,pwm_l,i2c_l,pwm_r,i2c_r,target_l,actual_l,\
target_r,actual_r,gyro_z,odom_x,odom_y,odom_heading,nav_state";

/// Fixed-capacity telemetry buffer.
pub struct FlightRecorder {
    records: Vec<LogRecord>,
    capacity: usize,
    enabled: bool,
    log_dir: PathBuf,
}

impl FlightRecorder {
    /// Preallocate the buffer. If the allocation fails the recorder is
    /// created disabled and the controller runs without telemetry.
    pub fn new<P: Into<PathBuf>>(capacity: usize, log_dir: P) -> Self {
        let mut records = Vec::new();
        let enabled = match records.try_reserve_exact(capacity) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    "Telemetry buffer allocation failed ({} records): {}; logging disabled",
                    capacity,
                    e
                );
                false
            }
        };
        Self {
            records,
            capacity,
            enabled,
            log_dir: log_dir.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append one record. Silently drops once the buffer is full.
    pub fn append(&mut self, record: LogRecord) {
        if self.enabled && self.records.len() < self.capacity {
            self.records.push(record);
        }
    }

    /// Clear the buffer for a fresh recording window.
    pub fn reset(&mut self) {
        self.records.clear();
    }

    /// Pick a dump path that does not already exist.
    fn dump_path(&self, mode: OperatingMode) -> PathBuf {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let base = format!("motor_log_{}_{}", mode.as_str(), stamp);
        let mut path = self.log_dir.join(format!("{}.csv", base));
        let mut n = 1u32;
        while path.exists() {
            path = self.log_dir.join(format!("{}_{}.csv", base, n));
            n += 1;
        }
        path
    }

    /// Write the buffer out as CSV and return the path.
    pub fn dump(&self, mode: OperatingMode) -> RoverResult<PathBuf> {
        std::fs::create_dir_all(&self.log_dir).map_err(|e| {
            RoverError::telemetry(format!(
                "Failed to create log directory {}: {}",
                self.log_dir.display(),
                e
            ))
        })?;

        let path = self.dump_path(mode);
        let file = File::create(&path)
            .map_err(|e| RoverError::telemetry(format!("Failed to create log file: {}", e)))?;
        let mut out = BufWriter::new(file);

        writeln!(out, "{}", CSV_HEADER)
            .map_err(|e| RoverError::telemetry(format!("Log write failed: {}", e)))?;
        for r in &self.records {
            writeln!(
                out,
                "{:.4},{},{},{},{},{},{},{},{},{},{:.4},{:.4},{:.4},{:.2},{}",
                r.time_sec,
                r.mode.as_str(),
                r.pwm_left_ns,
                r.raw_left,
                r.pwm_right_ns,
                r.raw_right,
                r.target_left,
                r.actual_left,
                r.target_right,
                r.actual_right,
                r.gyro_z_dps,
                r.x_ft,
                r.y_ft,
                r.heading_deg,
                r.nav_state.as_str(),
            )
            .map_err(|e| RoverError::telemetry(format!("Log write failed: {}", e)))?;
        }
        out.flush()
            .map_err(|e| RoverError::telemetry(format!("Log flush failed: {}", e)))?;

        tracing::info!("Dumped {} telemetry records to {}", self.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(time_sec: f64) -> LogRecord {
        LogRecord {
            time_sec,
            mode: OperatingMode::Voice,
            pwm_left_ns: 1_725_000,
            raw_left: 123,
            pwm_right_ns: 1_275_000,
            raw_right: 4000,
            target_left: 3092,
            actual_left: 100,
            target_right: -3092,
            actual_right: -90,
            gyro_z_dps: 12.5,
            x_ft: 1.0,
            y_ft: 2.0,
            heading_deg: 45.0,
            nav_state: NavState::Turning,
        }
    }

    #[test]
    fn test_append_and_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = FlightRecorder::new(3, dir.path());
        for i in 0..5 {
            rec.append(record(i as f64 * 0.005));
        }
        // Overflow drops silently
        assert_eq!(rec.len(), 3);
        rec.reset();
        assert!(rec.is_empty());
    }

    #[test]
    fn test_dump_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = FlightRecorder::new(10, dir.path());
        rec.append(record(0.005));
        let path = rec.dump(OperatingMode::Voice).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "time,mode,pwm_l,i2c_l,pwm_r,i2c_r,target_l,actual_l,\
             target_r,actual_r,gyro_z,odom_x,odom_y,odom_heading,nav_state"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("0.0050,VOICE,1725000,123,1275000,4000,"));
        assert!(row.ends_with("TURNING"));
        assert!(path
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("motor_log_VOICE_"));
    }

    #[test]
    fn test_dump_avoids_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = FlightRecorder::new(10, dir.path());
        rec.append(record(0.0));
        let first = rec.dump(OperatingMode::Idle).unwrap();
        let second = rec.dump(OperatingMode::Idle).unwrap();
        assert_ne!(first, second);
        assert!(second.to_str().unwrap().contains("_1.csv") || first != second);
    }
}
