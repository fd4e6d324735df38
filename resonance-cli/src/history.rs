//! Append-only progress log.
//!
//! One JSON object per line: a timestamp, the prompt that was practiced and the
//! full score record. Lines are only ever appended.

use anyhow::{Context, Result};
use resonance_core::ScoreRecord;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(flatten)]
    pub scores: ScoreRecord,
}

impl HistoryEntry {
    pub fn now(prompt: Option<String>, scores: ScoreRecord) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            timestamp,
            prompt,
            scores,
        }
    }
}

/// Appends one entry, creating the log if needed.
pub fn append(path: &Path, entry: &HistoryEntry) -> Result<()> {
    let mut line = serde_json::to_string(entry)?;
    line.push('\n');
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening progress log {}", path.display()))?;
    file.write_all(line.as_bytes())
        .with_context(|| format!("appending to progress log {}", path.display()))?;
    Ok(())
}

/// Reads every entry. A missing log is an empty history; unreadable lines are skipped.
pub fn load(path: &Path) -> Result<Vec<HistoryEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading progress log {}", path.display()))?;

    let mut entries = Vec::new();
    for (number, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(entry) => entries.push(entry),
            Err(err) => tracing::warn!(line = number + 1, %err, "skipping malformed progress entry"),
        }
    }
    Ok(entries)
}

/// Aggregates shown by the `stats` command.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean_alpha: f32,
    pub peak_alpha: u8,
    pub mean_sub100: f32,
    pub mean_chest: f32,
    pub mean_gravel: f32,
    pub mean_belly: f32,
}

pub fn summary(entries: &[HistoryEntry]) -> Option<Summary> {
    if entries.is_empty() {
        return None;
    }
    let count = entries.len();
    let mean = |f: fn(&ScoreRecord) -> u8| {
        entries.iter().map(|e| f(&e.scores) as f32).sum::<f32>() / count as f32
    };
    Some(Summary {
        count,
        mean_alpha: mean(|s| s.alpha),
        peak_alpha: entries.iter().map(|e| e.scores.alpha).max().unwrap_or(0),
        mean_sub100: mean(|s| s.sub100),
        mean_chest: mean(|s| s.chest),
        mean_gravel: mean(|s| s.gravel),
        mean_belly: mean(|s| s.belly),
    })
}
