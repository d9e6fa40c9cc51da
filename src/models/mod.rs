//! Core data model: document identity, per-document reading progress,
//! the ephemeral reading session, and lifetime aggregate statistics.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Estimated words per document page, used when deriving a reading speed
/// from pages-read and time-spent counters.
pub const WORDS_PER_PAGE: u64 = 250;

/// Stable key for one document, derived from its path or URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn from_path(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }

    /// Derives a key from a URI, stripping a `file://` scheme so the same
    /// document addressed both ways resolves to one record.
    pub fn from_uri(uri: &str) -> Self {
        Self(uri.strip_prefix("file://").unwrap_or(uri).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable per-document cursor plus bookmarks and notes.
///
/// `total_pages` stays 0 until the rendering collaborator reports load
/// completion; until then `current_page` may hold a previously persisted
/// value loaded speculatively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingProgress {
    pub document: DocumentId,
    pub current_page: u32,
    pub total_pages: u32,
    pub last_read_at: DateTime<Utc>,
    pub bookmarks: BTreeSet<u32>,
    pub notes: BTreeMap<u32, String>,
}

impl ReadingProgress {
    pub fn new(document: DocumentId, now: DateTime<Utc>) -> Self {
        Self {
            document,
            current_page: 1,
            total_pages: 0,
            last_read_at: now,
            bookmarks: BTreeSet::new(),
            notes: BTreeMap::new(),
        }
    }
}

/// Lifetime aggregate statistics, a single durable record.
///
/// All counters are monotonically non-decreasing; `average_wpm` is derived
/// from the counters, never accumulated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingStats {
    pub total_pages_read: u64,
    pub total_time_spent_secs: u64,
    pub average_wpm: f64,
    pub last_session_date: Option<NaiveDate>,
    pub sessions_count: u64,
}

impl Default for ReadingStats {
    fn default() -> Self {
        Self {
            total_pages_read: 0,
            total_time_spent_secs: 0,
            average_wpm: 0.0,
            last_session_date: None,
            sessions_count: 0,
        }
    }
}

impl ReadingStats {
    /// Rederives the reading speed from the page and time counters.
    pub fn recompute_average_wpm(&mut self) {
        let minutes = self.total_time_spent_secs as f64 / 60.0;
        self.average_wpm = if minutes > 0.0 {
            (self.total_pages_read * WORDS_PER_PAGE) as f64 / minutes
        } else {
            0.0
        };
    }
}

/// One in-flight reading session. Never persisted on its own; folded into
/// [`ReadingStats`] when it ends.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingSession {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub pages_read: u32,
    /// Monotonic anchor for the session duration, immune to wall-clock
    /// adjustments while reading.
    #[serde(skip)]
    anchor: Instant,
}

impl ReadingSession {
    pub fn begin(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: now,
            pages_read: 0,
            anchor: Instant::now(),
        }
    }

    /// Whole seconds elapsed since the session started, floored.
    pub fn elapsed_secs(&self) -> u64 {
        self.anchor.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_strips_file_scheme() {
        let a = DocumentId::from_uri("file:///books/novel.pdf");
        let b = DocumentId::new("/books/novel.pdf");
        assert_eq!(a, b);
    }

    #[test]
    fn new_progress_starts_at_page_one_with_unknown_total() {
        let progress = ReadingProgress::new(DocumentId::new("doc"), Utc::now());
        assert_eq!(progress.current_page, 1);
        assert_eq!(progress.total_pages, 0);
        assert!(progress.bookmarks.is_empty());
        assert!(progress.notes.is_empty());
    }

    #[test]
    fn average_wpm_is_zero_without_time() {
        let mut stats = ReadingStats {
            total_pages_read: 10,
            ..Default::default()
        };
        stats.recompute_average_wpm();
        assert_eq!(stats.average_wpm, 0.0);
    }

    #[test]
    fn average_wpm_derives_from_counters() {
        let mut stats = ReadingStats {
            total_pages_read: 4,
            total_time_spent_secs: 600,
            ..Default::default()
        };
        stats.recompute_average_wpm();
        // 4 pages * 250 words over 10 minutes.
        assert_eq!(stats.average_wpm, 100.0);
    }

    #[test]
    fn fresh_session_has_no_pages_read() {
        let session = ReadingSession::begin(Utc::now());
        assert_eq!(session.pages_read, 0);
        assert_eq!(session.elapsed_secs(), 0);
    }
}
