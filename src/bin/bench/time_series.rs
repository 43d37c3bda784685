// Per-Tick JSONL Time Series Recorder
// Outputs one JSON line per tick for independent analysis

use epp_engine::{HeadlineLevel, TickSnapshot};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
pub struct TickRecord {
    pub tick: u64,
    pub main_queue: usize,
    pub alt_queue_total: usize,
    pub active_alternatives: usize,
    pub ready_alternatives: usize,
    pub moved: usize,
    pub circuit_breaker_tripped: bool,
    pub headline: String,
    pub level: HeadlineLevel,
}

impl TickRecord {
    pub fn from_snapshot(snapshot: &TickSnapshot) -> Self {
        Self {
            tick: snapshot.tick,
            main_queue: snapshot.main_queue,
            alt_queue_total: snapshot.pathways.iter().map(|p| p.queue_length).sum(),
            active_alternatives: snapshot.pathways.iter().filter(|p| p.is_active).count(),
            ready_alternatives: snapshot.pathways.iter().filter(|p| p.is_ready).count(),
            moved: snapshot.moved_transactions.iter().map(|t| t.count).sum(),
            circuit_breaker_tripped: snapshot.circuit_breaker_tripped,
            headline: snapshot.headline.title.clone(),
            level: snapshot.headline.level,
        }
    }
}

/// Time series recorder that accumulates records and writes JSONL
pub struct TimeSeriesRecorder {
    records: Vec<TickRecord>,
}

impl TimeSeriesRecorder {
    pub fn new() -> Self {
        Self { records: Vec::new() }
    }

    pub fn record(&mut self, snapshot: &TickSnapshot) {
        self.records.push(TickRecord::from_snapshot(snapshot));
    }

    /// Write all records to a JSONL file
    pub fn write_jsonl(&self, path: &std::path::Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(path)?;
        for record in &self.records {
            let line = serde_json::to_string(record)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }
}
