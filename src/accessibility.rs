//! Reacts to platform accessibility signals.
//!
//! Signal *detection* lives outside the engine; this adapter only
//! consumes boolean change notifications and adjusts settings. The
//! screen-reader adjustment records itself as the font-size source, so
//! turning the screen reader off restores the default size only when the
//! adjustment set it; a size the user chose by hand is never clobbered.

use std::sync::Arc;

use log::{debug, warn};

use crate::settings::{
    font_sizes, line_spacing, FontSizeSource, SettingsPatch, SettingsStore,
};

pub struct AccessibilityAdapter {
    settings: Arc<SettingsStore>,
}

impl AccessibilityAdapter {
    pub fn new(settings: Arc<SettingsStore>) -> Self {
        Self { settings }
    }

    /// Bold-text enabled implies the reader benefits from bionic
    /// emphasis; turning bold text off never auto-disables it.
    pub async fn bold_text_changed(&self, enabled: bool) {
        if !enabled {
            return;
        }
        self.apply(SettingsPatch {
            bionic_reading: Some(true),
            ..Default::default()
        })
        .await;
    }

    pub async fn screen_reader_changed(&self, enabled: bool) {
        if enabled {
            self.apply(SettingsPatch {
                font_size: Some(font_sizes::LARGE),
                line_spacing: Some(line_spacing::LOOSE),
                font_size_source: Some(FontSizeSource::Accessibility),
                ..Default::default()
            })
            .await;
        } else {
            // Restore only what the adjustment itself set.
            if self.settings.current().await.font_size_source != FontSizeSource::Accessibility {
                return;
            }
            self.apply(SettingsPatch {
                font_size: Some(font_sizes::MEDIUM),
                line_spacing: Some(line_spacing::NORMAL),
                font_size_source: Some(FontSizeSource::Manual),
                ..Default::default()
            })
            .await;
        }
    }

    /// Presentation-layer concern; accepted and ignored here.
    pub async fn reduce_motion_changed(&self, enabled: bool) {
        debug!("reduce-motion signal received (enabled: {enabled})");
    }

    /// Presentation-layer concern; accepted and ignored here.
    pub async fn invert_colors_changed(&self, enabled: bool) {
        debug!("invert-colors signal received (enabled: {enabled})");
    }

    async fn apply(&self, patch: SettingsPatch) {
        if let Err(err) = self.settings.update(patch).await {
            warn!("failed to apply accessibility adjustment: {err}");
        }
    }
}
