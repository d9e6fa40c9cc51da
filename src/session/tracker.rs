//! Reading session lifecycle and per-document progress.
//!
//! At most one session is active per tracker; ending a session folds its
//! pages and floored whole-second duration into the durable lifetime
//! statistics and discards it. The tracker also owns the cached
//! [`ReadingProgress`] for its document and keeps it in step with the
//! database.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};
use tokio::sync::Mutex;

use crate::db::Database;
use crate::models::{DocumentId, ReadingProgress, ReadingSession, ReadingStats};
use crate::position::PositionStore;
use crate::report::ErrorReporter;

#[derive(Clone)]
pub struct SessionTracker {
    document: DocumentId,
    session: Arc<Mutex<Option<ReadingSession>>>,
    progress: Arc<Mutex<ReadingProgress>>,
    db: Database,
    position: PositionStore,
    reporter: Arc<dyn ErrorReporter>,
}

impl SessionTracker {
    /// Loads the persisted progress for `document`, creating a default
    /// record in memory on first open. A failed load degrades to the
    /// default and is reported.
    pub async fn open(
        document: DocumentId,
        db: Database,
        position: PositionStore,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        let progress = match db.get_progress(&document).await {
            Ok(Some(progress)) => progress,
            Ok(None) => ReadingProgress::new(document.clone(), Utc::now()),
            Err(err) => {
                let message = format!("failed to load progress for {document}: {err:#}");
                warn!("{message}");
                reporter.report("session", &message);
                ReadingProgress::new(document.clone(), Utc::now())
            }
        };

        Self {
            document,
            session: Arc::new(Mutex::new(None)),
            progress: Arc::new(Mutex::new(progress)),
            db,
            position,
            reporter,
        }
    }

    /// Begins a new session. An already-active session is ended (and
    /// folded into the stats) first, so two sessions never overlap.
    pub async fn start(&self) {
        self.end().await;

        let session = ReadingSession::begin(Utc::now());
        info!(
            "reading session {} started for {}",
            session.id, self.document
        );
        *self.session.lock().await = Some(session);
    }

    /// Credits one page to the active session; no-op without one.
    pub async fn record_page_advance(&self) {
        if let Some(session) = self.session.lock().await.as_mut() {
            session.pages_read += 1;
        }
    }

    /// Ends the active session, folding it into the lifetime statistics.
    /// Returns the updated statistics, or `None` when there was no active
    /// session or the fold could not be persisted. A no-op `end` never
    /// mutates the statistics.
    pub async fn end(&self) -> Option<ReadingStats> {
        let session = self.session.lock().await.take()?;
        let time_spent_secs = session.elapsed_secs();

        match self
            .db
            .fold_session(session.pages_read, time_spent_secs, Utc::now().date_naive())
            .await
        {
            Ok(stats) => {
                info!(
                    "reading session {} ended: {} pages in {}s",
                    session.id, session.pages_read, time_spent_secs
                );
                Some(stats)
            }
            Err(err) => {
                let message = format!(
                    "failed to fold session {} into stats: {err:#}",
                    session.id
                );
                warn!("{message}");
                self.reporter.report("session", &message);
                None
            }
        }
    }

    pub async fn is_active(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Handles a page-changed notification. Redundant notifications for
    /// the page already current are ignored; a real change updates the
    /// cursor, persists it, and credits the active session. Page 0 is
    /// malformed input and is rejected.
    pub async fn update_page_progress(&self, page: u32) {
        if page == 0 {
            warn!("ignoring page change to invalid page 0 for {}", self.document);
            return;
        }

        {
            let mut progress = self.progress.lock().await;
            if page == progress.current_page {
                return;
            }
            progress.current_page = page;
            progress.last_read_at = Utc::now();
        }

        self.position.save(&self.document, page).await;
        self.record_page_advance().await;
    }

    /// Records the page count reported on load completion. A cursor
    /// restored speculatively before the count was known is clamped into
    /// `[1, total]`. Returns the (possibly clamped) current page.
    pub async fn set_total_pages(&self, total: u32) -> u32 {
        let clamped = match self.db.set_total_pages(&self.document, total, Utc::now()).await {
            Ok(clamped) => clamped,
            Err(err) => {
                let message =
                    format!("failed to persist total pages for {}: {err:#}", self.document);
                warn!("{message}");
                self.reporter.report("session", &message);
                let current = self.progress.lock().await.current_page;
                if total > 0 {
                    current.clamp(1, total)
                } else {
                    current
                }
            }
        };

        let mut progress = self.progress.lock().await;
        progress.total_pages = total;
        progress.current_page = clamped;
        clamped
    }

    /// Adds or removes the bookmark for `page` and returns the resulting
    /// set, ascending. On a persistence failure the cached set is
    /// returned unchanged.
    pub async fn toggle_bookmark(&self, page: u32) -> BTreeSet<u32> {
        match self.db.toggle_bookmark(&self.document, page, Utc::now()).await {
            Ok(bookmarks) => {
                self.progress.lock().await.bookmarks = bookmarks.clone();
                bookmarks
            }
            Err(err) => {
                let message =
                    format!("failed to toggle bookmark {page} for {}: {err:#}", self.document);
                warn!("{message}");
                self.reporter.report("session", &message);
                self.progress.lock().await.bookmarks.clone()
            }
        }
    }

    /// Stores the note for `page`. An empty note removes the entry.
    pub async fn add_note(&self, page: u32, text: &str) {
        if text.is_empty() {
            self.remove_note(page).await;
            return;
        }

        match self
            .db
            .set_note(&self.document, page, text.to_string(), Utc::now())
            .await
        {
            Ok(()) => {
                self.progress
                    .lock()
                    .await
                    .notes
                    .insert(page, text.to_string());
            }
            Err(err) => {
                let message =
                    format!("failed to store note on page {page} for {}: {err:#}", self.document);
                warn!("{message}");
                self.reporter.report("session", &message);
            }
        }
    }

    pub async fn remove_note(&self, page: u32) {
        match self.db.remove_note(&self.document, page).await {
            Ok(()) => {
                self.progress.lock().await.notes.remove(&page);
            }
            Err(err) => {
                let message = format!(
                    "failed to remove note on page {page} for {}: {err:#}",
                    self.document
                );
                warn!("{message}");
                self.reporter.report("session", &message);
            }
        }
    }

    /// Snapshot of the cached progress record.
    pub async fn progress(&self) -> ReadingProgress {
        self.progress.lock().await.clone()
    }

    pub async fn current_page(&self) -> u32 {
        self.progress.lock().await.current_page
    }

    /// Current lifetime statistics, or `None` when the read fails (the
    /// failure is logged and reported).
    pub async fn stats(&self) -> Option<ReadingStats> {
        match self.db.get_stats().await {
            Ok(stats) => Some(stats),
            Err(err) => {
                let message = format!("failed to read stats: {err:#}");
                warn!("{message}");
                self.reporter.report("session", &message);
                None
            }
        }
    }
}
