//! Durable per-document cursor with swallow-and-report write semantics.
//!
//! Losing a page save must never interrupt reading, so failures are
//! logged and forwarded to the [`ErrorReporter`] instead of surfacing to
//! the caller.

use std::sync::Arc;

use chrono::Utc;
use log::warn;

use crate::db::Database;
use crate::models::DocumentId;
use crate::report::ErrorReporter;

#[derive(Clone)]
pub struct PositionStore {
    db: Database,
    reporter: Arc<dyn ErrorReporter>,
}

impl PositionStore {
    pub fn new(db: Database, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self { db, reporter }
    }

    /// Persists the cursor for `document`. Idempotent; failures are
    /// swallowed but reported.
    pub async fn save(&self, document: &DocumentId, page: u32) {
        if let Err(err) = self.db.save_cursor(document, page, Utc::now()).await {
            let message = format!("failed to save page {page} for {document}: {err:#}");
            warn!("{message}");
            self.reporter.report("position", &message);
        }
    }

    /// Returns the last saved page, or `None` when nothing was saved or
    /// the read failed (a failed read is reported, then treated as
    /// absent).
    pub async fn load(&self, document: &DocumentId) -> Option<u32> {
        match self.db.load_cursor(document).await {
            Ok(page) => page,
            Err(err) => {
                let message = format!("failed to load cursor for {document}: {err:#}");
                warn!("{message}");
                self.reporter.report("position", &message);
                None
            }
        }
    }
}
