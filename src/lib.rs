//! Reading session and adaptive text engine for a reading companion.
//!
//! The crate is the stateful core behind an externally rendered document
//! view: it tracks where the reader is and for how long, transforms text
//! into a bionic-emphasis representation, drives line-by-line focus
//! navigation, and sequences text-to-speech playback with page
//! auto-advance. Rendering, speech synthesis, document storage, and
//! accessibility detection are external collaborators reached through
//! traits and channels.
//!
//! [`ReaderContext`] owns the process-wide state (settings store and
//! database); [`ReaderContext::open_document`] builds the per-document
//! stack on top of it.

pub mod accessibility;
pub mod bionic;
pub mod db;
pub mod error;
pub mod focus;
pub mod models;
pub mod paths;
pub mod position;
pub mod reader;
pub mod report;
pub mod session;
pub mod settings;
pub mod text;
pub mod tts;

use std::sync::Arc;

use log::{info, warn};
use tokio::sync::{mpsc, Mutex};

use accessibility::AccessibilityAdapter;
use db::Database;
use error::PersistenceError;
use models::DocumentId;
use paths::ReaderPaths;
use position::PositionStore;
use reader::ReaderController;
use report::{ErrorReporter, LogReporter};
use session::SessionTracker;
use settings::SettingsStore;
use tts::{PageRequest, SynthesisEngine, SynthesisEvent, TtsOrchestrator};

/// Process-wide context: one settings record, one database, one error
/// reporter, and at most one active document view. Created once at
/// startup; dropping it joins the database worker.
pub struct ReaderContext {
    paths: ReaderPaths,
    settings: Arc<SettingsStore>,
    db: Database,
    reporter: Arc<dyn ErrorReporter>,
    active: Mutex<Option<ActiveDocument>>,
}

/// Handles the context keeps on the currently open view so it can retire
/// them when the next document opens.
struct ActiveDocument {
    document: DocumentId,
    tracker: SessionTracker,
    tts: Arc<TtsOrchestrator>,
}

/// Everything wired for one open document view.
///
/// The embedder forwards renderer notifications into `controller`,
/// delivers engine notifications on `events`, and services page requests
/// from `page_requests` (both the controller's navigation and the TTS
/// auto-advance arrive there).
pub struct DocumentView {
    pub controller: ReaderController,
    pub tts: Arc<TtsOrchestrator>,
    pub events: mpsc::Sender<SynthesisEvent>,
    pub page_requests: mpsc::Receiver<PageRequest>,
}

impl ReaderContext {
    /// Opens the context at `paths`, creating the data directory, loading
    /// settings, and running database migrations.
    pub fn open(paths: ReaderPaths) -> Result<Self, PersistenceError> {
        Self::open_with_reporter(paths, Arc::new(LogReporter))
    }

    /// Like [`open`](Self::open) with an explicit observability
    /// collaborator for swallowed persistence failures.
    pub fn open_with_reporter(
        paths: ReaderPaths,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Result<Self, PersistenceError> {
        std::fs::create_dir_all(&paths.data_dir).map_err(|err| PersistenceError::Write {
            path: paths.data_dir.display().to_string(),
            message: err.to_string(),
        })?;

        let settings = Arc::new(SettingsStore::open(paths.settings_file.clone()));
        let db = Database::new(paths.db_file.clone())
            .map_err(|err| PersistenceError::Backend(format!("{err:#}")))?;

        info!("reader context initialized at {}", paths.data_dir.display());

        Ok(Self {
            paths,
            settings,
            db,
            reporter,
            active: Mutex::new(None),
        })
    }

    pub fn paths(&self) -> &ReaderPaths {
        &self.paths
    }

    pub fn settings(&self) -> Arc<SettingsStore> {
        self.settings.clone()
    }

    pub fn database(&self) -> Database {
        self.db.clone()
    }

    pub fn accessibility(&self) -> AccessibilityAdapter {
        AccessibilityAdapter::new(self.settings.clone())
    }

    /// Builds the per-document stack: tracker, TTS orchestrator, and
    /// controller, all sharing one page-request channel whose receiver
    /// goes to the embedder.
    ///
    /// At most one view is live per context. Opening a second document
    /// retires the previous one first: its session is ended (folding into
    /// the stats) and its playback is stopped and shut down, so the
    /// process never carries two active sessions or playback streams.
    pub async fn open_document(
        &self,
        document: DocumentId,
        engine: Arc<dyn SynthesisEngine>,
    ) -> DocumentView {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            info!(
                "retiring open document {} before opening {}",
                previous.document, document
            );
            previous.tracker.end().await;
            if let Err(err) = previous.tts.stop().await {
                warn!("failed to stop playback for {}: {err}", previous.document);
            }
            previous.tts.shutdown().await;
        }

        let (page_tx, page_requests) = mpsc::channel(16);

        let position = PositionStore::new(self.db.clone(), self.reporter.clone());
        let tracker = SessionTracker::open(
            document.clone(),
            self.db.clone(),
            position,
            self.reporter.clone(),
        )
        .await;

        let (tts, events) = TtsOrchestrator::new(engine, page_tx.clone());
        let tts = Arc::new(tts);

        *active = Some(ActiveDocument {
            document: document.clone(),
            tracker: tracker.clone(),
            tts: tts.clone(),
        });

        let controller = ReaderController::new(
            document,
            tracker,
            tts.clone(),
            page_tx,
            self.settings.clone(),
            self.reporter.clone(),
        );

        DocumentView {
            controller,
            tts,
            events,
            page_requests,
        }
    }
}
