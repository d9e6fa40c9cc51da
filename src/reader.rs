//! Per-document intake for the rendering collaborator.
//!
//! The controller receives the renderer's notifications (page changed,
//! load complete, render error), feeds them to the session tracker and
//! the TTS orchestrator, and issues outbound page requests clamped into
//! `[1, total_pages]` before they reach the page channel.

use std::sync::Arc;

use log::{error, warn};
use tokio::sync::mpsc;

use crate::bionic::{self, BionicOptions};
use crate::models::DocumentId;
use crate::report::ErrorReporter;
use crate::session::SessionTracker;
use crate::settings::SettingsStore;
use crate::text::{normalize_page_text, reading_time_minutes, DEFAULT_WORDS_PER_MINUTE};
use crate::tts::{PageRequest, TtsCommandError, TtsOrchestrator};

pub struct ReaderController {
    document: DocumentId,
    tracker: SessionTracker,
    tts: Arc<TtsOrchestrator>,
    page_tx: mpsc::Sender<PageRequest>,
    settings: Arc<SettingsStore>,
    reporter: Arc<dyn ErrorReporter>,
}

impl ReaderController {
    pub fn new(
        document: DocumentId,
        tracker: SessionTracker,
        tts: Arc<TtsOrchestrator>,
        page_tx: mpsc::Sender<PageRequest>,
        settings: Arc<SettingsStore>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            document,
            tracker,
            tts,
            page_tx,
            settings,
            reporter,
        }
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    pub fn tts(&self) -> &Arc<TtsOrchestrator> {
        &self.tts
    }

    /// Renderer reported the visible page changed.
    pub async fn page_changed(&self, page: u32) {
        self.tracker.update_page_progress(page).await;
        let progress = self.tracker.progress().await;
        self.tts
            .set_page_context(progress.current_page, progress.total_pages)
            .await;
    }

    /// Renderer finished loading and reported the page count. Clamps any
    /// speculatively restored cursor and returns the page the view should
    /// restore to.
    pub async fn load_complete(&self, total_pages: u32) -> u32 {
        let current = self.tracker.set_total_pages(total_pages).await;
        self.tts.set_page_context(current, total_pages).await;
        current
    }

    /// Renderer reported a load/render failure.
    pub fn render_error(&self, message: &str) {
        error!("render error for {}: {message}", self.document);
        self.reporter.report("render", message);
    }

    /// Requests the renderer show `page`, clamped into `[1, total]`
    /// before it leaves the engine. With the page count still unknown
    /// only the lower bound applies.
    pub async fn request_page(&self, page: u32) {
        let total = self.tracker.progress().await.total_pages;
        let clamped = if total > 0 {
            page.clamp(1, total)
        } else {
            page.max(1)
        };
        self.send_request(clamped).await;
    }

    /// Requests the next page; no-op on the last page.
    pub async fn request_next_page(&self) {
        let progress = self.tracker.progress().await;
        if progress.total_pages > 0 && progress.current_page < progress.total_pages {
            self.send_request(progress.current_page + 1).await;
        }
    }

    /// Requests the previous page; no-op on page 1.
    pub async fn request_previous_page(&self) {
        let current = self.tracker.current_page().await;
        if current > 1 {
            self.send_request(current - 1).await;
        }
    }

    /// Normalizes extracted page text and hands it to the orchestrator.
    pub async fn speak_page(&self, text: &str) -> Result<(), TtsCommandError> {
        let normalized = normalize_page_text(text);
        self.tts.speak(&normalized).await
    }

    /// Page text the way the current settings want it shown: the bionic
    /// transform is applied paragraph by paragraph when enabled, otherwise
    /// the text passes through untouched.
    pub async fn display_page_text(&self, text: &str) -> String {
        if self.settings.current().await.bionic_reading {
            bionic::transform_paragraphs(text, &BionicOptions::default())
        } else {
            text.to_string()
        }
    }

    /// Estimated whole minutes to read `text`, using the reader's own
    /// session-derived speed once the stats have one and a stock speed
    /// before that.
    pub async fn estimated_reading_minutes(&self, text: &str) -> u32 {
        let wpm = match self.tracker.stats().await {
            Some(stats) if stats.average_wpm >= 1.0 => stats.average_wpm as u32,
            _ => DEFAULT_WORDS_PER_MINUTE,
        };
        reading_time_minutes(text, wpm)
    }

    async fn send_request(&self, page: u32) {
        if self.page_tx.send(PageRequest { page }).await.is_err() {
            warn!("page request channel closed for {}", self.document);
        }
    }
}
