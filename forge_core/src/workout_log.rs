//! Append-only workout log.
//!
//! Workouts are appended to a JSONL (JSON Lines) file with file locking
//! to ensure safe concurrent access. A torn or corrupt line is skipped with
//! a warning instead of failing the whole read.

use crate::{Result, WorkoutLog};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// JSONL-based workout log with file locking
#[derive(Clone, Debug)]
pub struct JsonlWorkoutLog {
    path: PathBuf,
}

impl JsonlWorkoutLog {
    /// Create a new JSONL log for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one workout as a JSON line
    pub fn append(&self, log: &WorkoutLog) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        if !self.ends_with_newline()? {
            // Close off a line torn by a crash so this entry stays readable
            writer.write_all(b"\n")?;
        }
        let line = serde_json::to_string(log)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.sync_all()?;
        file.unlock()?;

        tracing::debug!("Appended workout {} to {:?}", log.id, self.path);
        Ok(())
    }

    /// True for an empty file or one whose last byte is `\n`
    fn ends_with_newline(&self) -> Result<bool> {
        let mut file = File::open(&self.path)?;
        let len = file.metadata()?.len();
        if len == 0 {
            return Ok(true);
        }
        let mut last = [0u8; 1];
        file.seek(SeekFrom::Start(len - 1))?;
        file.read_exact(&mut last)?;
        Ok(last[0] == b'\n')
    }

    /// Read every workout in the file, in append order
    pub fn read_all(&self) -> Result<Vec<WorkoutLog>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        file.lock_shared()?;

        let reader = BufReader::new(&file);
        let mut logs = Vec::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<WorkoutLog>(&line) {
                Ok(log) => logs.push(log),
                Err(e) => {
                    tracing::warn!("Failed to parse workout at line {}: {}", line_num + 1, e);
                }
            }
        }

        file.unlock()?;
        tracing::debug!("Read {} workouts from {:?}", logs.len(), self.path);
        Ok(logs)
    }

    /// Workouts of one user within `from..=to`, oldest first
    pub fn read_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<WorkoutLog>> {
        let mut logs: Vec<_> = self
            .read_all()?
            .into_iter()
            .filter(|l| l.user_id == user_id && l.date >= from && l.date <= to)
            .collect();
        logs.sort_by_key(|l| l.date);
        Ok(logs)
    }
}
