//! Line-delimited journal format for the content store file.
//!
//! Each line is one JSON object: either a full content record (insert or
//! update) or a deletion marker. Replaying the lines in order yields the
//! live record set.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::Content;

/// One line of the store file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JournalEntry {
    /// Deletion marker, `{"$deleted":true,"id":"..."}`
    Deleted {
        #[serde(rename = "$deleted")]
        deleted: bool,
        id: String,
    },
    /// Full record state after an insert or update
    Record(Content),
}

impl JournalEntry {
    pub fn deleted(id: &str) -> Self {
        JournalEntry::Deleted {
            deleted: true,
            id: id.to_string(),
        }
    }

    /// Serialize as a single newline-terminated line.
    pub fn encode(&self) -> Result<String, AppError> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Result of replaying a store file.
#[derive(Debug, Default)]
pub struct Replay {
    /// Live records in first-insertion order
    pub records: Vec<Content>,
    /// Non-blank lines read
    pub total_lines: usize,
    /// Lines that failed to parse
    pub corrupt_lines: usize,
}

impl Replay {
    /// Share of non-blank lines that could not be parsed.
    pub fn corrupt_ratio(&self) -> f64 {
        if self.total_lines == 0 {
            0.0
        } else {
            self.corrupt_lines as f64 / self.total_lines as f64
        }
    }

    /// Whether compaction would shrink the file.
    pub fn has_garbage(&self) -> bool {
        self.total_lines != self.records.len()
    }
}

/// Fold journal lines into the live record set.
pub fn replay(text: &str) -> Replay {
    let mut replay = Replay::default();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        replay.total_lines += 1;

        match serde_json::from_str::<JournalEntry>(line) {
            Ok(JournalEntry::Record(record)) => {
                match replay.records.iter_mut().find(|r| r.id == record.id) {
                    Some(existing) => *existing = record,
                    None => replay.records.push(record),
                }
            }
            Ok(JournalEntry::Deleted { deleted, id }) => {
                if deleted {
                    replay.records.retain(|r| r.id != id);
                }
            }
            Err(e) => {
                tracing::warn!("Skipping corrupt store line {}: {}", line_no + 1, e);
                replay.corrupt_lines += 1;
            }
        }
    }

    replay
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentDraft;
    use chrono::Utc;

    fn record(id: &str, slug: &str, title: &str) -> Content {
        Content::create(
            id.to_string(),
            ContentDraft::new(title, slug, "General", "<p>body</p>"),
            Utc::now(),
        )
    }

    fn journal(entries: &[JournalEntry]) -> String {
        entries.iter().map(|e| e.encode().unwrap()).collect()
    }

    #[test]
    fn test_tombstone_encoding() {
        let line = JournalEntry::deleted("abc").encode().unwrap();
        assert_eq!(line, "{\"$deleted\":true,\"id\":\"abc\"}\n");
    }

    #[test]
    fn test_replay_last_write_wins_in_place() {
        let text = journal(&[
            JournalEntry::Record(record("1", "first", "First")),
            JournalEntry::Record(record("2", "second", "Second")),
            JournalEntry::Record(record("1", "first", "First (edited)")),
        ]);

        let replay = replay(&text);
        assert_eq!(replay.records.len(), 2);
        assert_eq!(replay.records[0].id, "1");
        assert_eq!(replay.records[0].title, "First (edited)");
        assert_eq!(replay.records[1].id, "2");
        assert!(replay.has_garbage());
    }

    #[test]
    fn test_replay_applies_tombstones() {
        let text = journal(&[
            JournalEntry::Record(record("1", "gone", "Gone")),
            JournalEntry::Record(record("2", "kept", "Kept")),
            JournalEntry::deleted("1"),
        ]);

        let replay = replay(&text);
        assert_eq!(replay.records.len(), 1);
        assert_eq!(replay.records[0].slug, "kept");
    }

    #[test]
    fn test_replay_counts_corrupt_lines() {
        let mut text = journal(&[JournalEntry::Record(record("1", "ok", "Ok"))]);
        text.push_str("{not json\n\n");
        text.push_str("{\"title\":\"missing everything else\"}\n");

        let replay = replay(&text);
        assert_eq!(replay.records.len(), 1);
        assert_eq!(replay.total_lines, 3);
        assert_eq!(replay.corrupt_lines, 2);
        assert!(replay.corrupt_ratio() > 0.6);
    }

    #[test]
    fn test_replay_empty_file() {
        let replay = replay("");
        assert!(replay.records.is_empty());
        assert_eq!(replay.corrupt_ratio(), 0.0);
        assert!(!replay.has_garbage());
    }
}
