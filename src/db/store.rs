//! Content store: in-memory record set backed by an append-only journal file.
//!
//! All writes go through a single writer lock, so the slug uniqueness check,
//! the journal append and the in-memory update happen as one step.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use super::journal::{self, JournalEntry};
use crate::errors::AppError;
use crate::models::{Content, ContentDraft};

/// Options applied when opening a store file.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Share of unparseable lines tolerated before refusing to load
    pub corrupt_threshold: f64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            corrupt_threshold: super::DEFAULT_CORRUPT_THRESHOLD,
        }
    }
}

/// File-backed content collection.
pub struct ContentStore {
    path: PathBuf,
    state: RwLock<StoreState>,
}

struct StoreState {
    records: Vec<Content>,
    /// Append handle; `None` once the store has been closed
    journal: Option<Journal>,
}

/// Append handle plus the length of the file up to its last complete line.
struct Journal {
    file: File,
    len: u64,
}

impl ContentStore {
    /// Load the store file, compact it and open it for appending.
    ///
    /// The file is created if it does not exist yet.
    pub async fn open(path: &Path, options: StoreOptions) -> Result<Self, AppError> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let replay = journal::replay(&text);
        if replay.corrupt_ratio() > options.corrupt_threshold {
            return Err(AppError::Storage(format!(
                "{} of {} lines in {} are corrupt, above the {:.0}% threshold",
                replay.corrupt_lines,
                replay.total_lines,
                path.display(),
                options.corrupt_threshold * 100.0
            )));
        }
        if replay.corrupt_lines > 0 {
            tracing::warn!(
                "Dropped {} corrupt line(s) while loading {}",
                replay.corrupt_lines,
                path.display()
            );
        }
        warn_duplicate_slugs(&replay.records);

        let needs_compaction = replay.has_garbage();
        let store = Self {
            path: path.to_path_buf(),
            state: RwLock::new(StoreState {
                records: replay.records,
                journal: None,
            }),
        };

        {
            let mut state = store.state.write().await;
            if needs_compaction {
                store.rewrite(&state.records).await?;
            }
            state.journal = Some(Journal::open(&store.path).await?);
        }

        Ok(store)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records, in insertion order.
    pub async fn list(&self) -> Vec<Content> {
        self.state.read().await.records.clone()
    }

    /// Number of live records.
    pub async fn count(&self) -> usize {
        self.state.read().await.records.len()
    }

    /// Look up a record by slug. With duplicate slugs the first inserted wins.
    pub async fn find_by_slug(&self, slug: &str) -> Option<Content> {
        let state = self.state.read().await;
        state.records.iter().find(|c| c.slug == slug).cloned()
    }

    /// Insert a new record with a fresh id and timestamps.
    pub async fn insert(&self, draft: ContentDraft) -> Result<Content, AppError> {
        let mut state = self.state.write().await;
        state.ensure_slug_free(&draft.slug, None)?;

        let record = Content::create(uuid::Uuid::new_v4().to_string(), draft, Utc::now());
        state.append(&JournalEntry::Record(record.clone())).await?;
        state.records.push(record.clone());
        Ok(record)
    }

    /// Overwrite the editable fields of the record with this id.
    pub async fn update_by_id(&self, id: &str, draft: ContentDraft) -> Result<Content, AppError> {
        let mut state = self.state.write().await;
        let index = state
            .records
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| AppError::NotFound("Content not found for update".to_string()))?;
        state.replace(index, draft).await
    }

    /// Overwrite the editable fields of the record currently holding this slug.
    pub async fn update_by_slug(
        &self,
        slug: &str,
        draft: ContentDraft,
    ) -> Result<Content, AppError> {
        let mut state = self.state.write().await;
        let index = state
            .records
            .iter()
            .position(|c| c.slug == slug)
            .ok_or_else(|| AppError::NotFound("Content not found for update".to_string()))?;
        state.replace(index, draft).await
    }

    /// Remove the record with this id.
    pub async fn delete_by_id(&self, id: &str) -> Result<Content, AppError> {
        let mut state = self.state.write().await;
        let index = state
            .records
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| AppError::NotFound("Content not found for deletion".to_string()))?;

        state.append(&JournalEntry::deleted(id)).await?;
        Ok(state.records.remove(index))
    }

    /// Rewrite the file so it holds exactly one line per live record.
    pub async fn compact(&self) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        let closed = state.journal.is_none();
        // Drop the old handle before the rename replaces the file under it.
        state.journal = None;
        let rewritten = self.rewrite(&state.records).await;
        if !closed {
            // On failure the old file is still in place; keep appending to it.
            state.journal = Some(Journal::open(&self.path).await?);
        }
        rewritten
    }

    /// Compact, sync and release the file. Later writes fail with a storage error.
    pub async fn close(&self) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        if let Some(mut journal) = state.journal.take() {
            journal.file.flush().await?;
            journal.file.sync_all().await?;
        }
        self.rewrite(&state.records).await?;
        tracing::info!(
            "Closed content store {} with {} record(s)",
            self.path.display(),
            state.records.len()
        );
        Ok(())
    }

    async fn rewrite(&self, records: &[Content]) -> Result<(), AppError> {
        let mut buffer = String::new();
        for record in records {
            buffer.push_str(&JournalEntry::Record(record.clone()).encode()?);
        }

        let temp_path = temp_path_for(&self.path);
        let written = write_temp(&temp_path, buffer.as_bytes()).await;
        if written.is_err() {
            let _ = tokio::fs::remove_file(&temp_path).await;
        }
        written?;
        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

impl StoreState {
    fn ensure_slug_free(&self, slug: &str, except_id: Option<&str>) -> Result<(), AppError> {
        let taken = self
            .records
            .iter()
            .any(|c| c.slug == slug && Some(c.id.as_str()) != except_id);
        if taken {
            return Err(AppError::Conflict(format!(
                "Slug '{}' is already used by another content item",
                slug
            )));
        }
        Ok(())
    }

    async fn replace(&mut self, index: usize, draft: ContentDraft) -> Result<Content, AppError> {
        let id = self.records[index].id.clone();
        self.ensure_slug_free(&draft.slug, Some(id.as_str()))?;

        let mut updated = self.records[index].clone();
        updated.apply(draft, Utc::now());
        self.append(&JournalEntry::Record(updated.clone())).await?;
        self.records[index] = updated.clone();
        Ok(updated)
    }

    async fn append(&mut self, entry: &JournalEntry) -> Result<(), AppError> {
        let line = entry.encode()?;
        let journal = self
            .journal
            .as_mut()
            .ok_or_else(|| AppError::Storage("Content store is closed".to_string()))?;
        journal.append(line.as_bytes()).await
    }
}

impl Journal {
    async fn open(path: &Path) -> Result<Self, AppError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        let len = file.metadata().await?.len();
        Ok(Self { file, len })
    }

    /// Append one encoded line. A failed write is truncated away so the next
    /// line never lands on a fragment.
    async fn append(&mut self, line: &[u8]) -> Result<(), AppError> {
        // A fragment left by an earlier failed write, or by an earlier failed truncate.
        if self.file.metadata().await?.len() > self.len {
            self.file.set_len(self.len).await?;
        }

        if let Err(e) = write_line(&mut self.file, line).await {
            if let Err(trunc) = self.file.set_len(self.len).await {
                tracing::warn!("Failed to truncate partial journal line: {}", trunc);
            }
            return Err(e.into());
        }
        self.len += line.len() as u64;
        Ok(())
    }
}

async fn write_line(file: &mut File, line: &[u8]) -> std::io::Result<()> {
    file.write_all(line).await?;
    file.flush().await
}

async fn write_temp(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push("~");
    PathBuf::from(name)
}

fn warn_duplicate_slugs(records: &[Content]) {
    for (i, record) in records.iter().enumerate() {
        if records[..i].iter().any(|earlier| earlier.slug == record.slug) {
            tracing::warn!(
                "Duplicate slug '{}' (id {}); lookups return the earlier record",
                record.slug,
                record.id
            );
        }
    }
}
