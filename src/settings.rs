//! Durable process-wide reading settings.
//!
//! A single record, merged patch-by-patch and persisted atomically
//! (write-temp-then-rename) before the in-memory copy is replaced.
//! Read failures degrade to defaults; only write failures surface.

use std::path::{Path, PathBuf};
use std::{fs, io};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::PersistenceError;

/// Font size bounds enforced by the policy helpers. Raw patches are
/// stored as-is; only the helpers clamp.
pub const MIN_FONT_SIZE: u32 = 12;
pub const MAX_FONT_SIZE: u32 = 24;

const FONT_SIZE_STEP: u32 = 2;

/// Named font sizes offered by the reading UI.
pub mod font_sizes {
    pub const SMALL: u32 = 14;
    pub const MEDIUM: u32 = 16;
    pub const LARGE: u32 = 18;
    pub const EXTRA_LARGE: u32 = 20;
    pub const HUGE: u32 = 24;
}

/// Named line-spacing multipliers.
pub mod line_spacing {
    pub const TIGHT: f32 = 1.2;
    pub const NORMAL: f32 = 1.5;
    pub const RELAXED: f32 = 1.75;
    pub const LOOSE: f32 = 2.0;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FontFamily {
    System,
    OpenDyslexic,
    Lexend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Theme {
    Light,
    Dark,
}

/// Who last set `font_size`: the user, or the screen-reader adjustment.
/// Lets the accessibility adapter restore the default size without ever
/// clobbering a size the user chose by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FontSizeSource {
    Manual,
    Accessibility,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub bionic_reading: bool,
    pub focus_mode: bool,
    pub font_size: u32,
    pub line_spacing: f32,
    pub font_family: FontFamily,
    pub theme: Theme,
    #[serde(default = "default_font_size_source")]
    pub font_size_source: FontSizeSource,
}

fn default_font_size_source() -> FontSizeSource {
    FontSizeSource::Manual
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bionic_reading: false,
            focus_mode: false,
            font_size: font_sizes::MEDIUM,
            line_spacing: line_spacing::NORMAL,
            font_family: FontFamily::System,
            theme: Theme::Light,
            font_size_source: FontSizeSource::Manual,
        }
    }
}

/// Partial update merged into the current record. `None` fields are left
/// untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bionic_reading: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_spacing: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<FontFamily>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size_source: Option<FontSizeSource>,
}

impl Settings {
    fn apply(&mut self, patch: SettingsPatch) {
        if let Some(value) = patch.bionic_reading {
            self.bionic_reading = value;
        }
        if let Some(value) = patch.focus_mode {
            self.focus_mode = value;
        }
        if let Some(value) = patch.font_size {
            self.font_size = value;
        }
        if let Some(value) = patch.line_spacing {
            self.line_spacing = value;
        }
        if let Some(value) = patch.font_family {
            self.font_family = value;
        }
        if let Some(value) = patch.theme {
            self.theme = value;
        }
        if let Some(value) = patch.font_size_source {
            self.font_size_source = value;
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: Mutex<Settings>,
}

impl SettingsStore {
    /// Opens the store at `path`, loading the persisted record or falling
    /// back to defaults. Never fails the caller: a missing file is the
    /// defaults, and a corrupt or unreadable one is logged and replaced on
    /// the next update.
    pub fn open(path: PathBuf) -> Self {
        let data = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(err) => {
                    warn!(
                        "settings at {} are unreadable, using defaults: {err}",
                        path.display()
                    );
                    Settings::default()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => Settings::default(),
            Err(err) => {
                warn!(
                    "failed to read settings from {}, using defaults: {err}",
                    path.display()
                );
                Settings::default()
            }
        };

        info!("settings store opened at {}", path.display());

        Self {
            path,
            data: Mutex::new(data),
        }
    }

    /// Snapshot of the current record.
    pub async fn current(&self) -> Settings {
        self.data.lock().await.clone()
    }

    /// Merges `patch` into the current record, persists the merged record,
    /// and only then replaces the in-memory copy. On a write failure the
    /// in-memory record is left unchanged and the error surfaces.
    ///
    /// The merge-and-persist runs under one lock, so back-to-back updates
    /// serialize and both land. The file I/O itself runs on the blocking
    /// pool so a slow disk never stalls the async workers.
    pub async fn update(&self, patch: SettingsPatch) -> Result<Settings, PersistenceError> {
        let mut guard = self.data.lock().await;
        let mut merged = guard.clone();
        merged.apply(patch);

        let path = self.path.clone();
        let record = merged.clone();
        tokio::task::spawn_blocking(move || persist(&path, &record))
            .await
            .map_err(|err| PersistenceError::Write {
                path: self.path.display().to_string(),
                message: err.to_string(),
            })??;
        *guard = merged.clone();

        Ok(merged)
    }
}

fn persist(path: &Path, data: &Settings) -> Result<(), PersistenceError> {
    let serialized =
        serde_json::to_string_pretty(data).map_err(|err| PersistenceError::Write {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serialized).map_err(|err| PersistenceError::Write {
        path: tmp.display().to_string(),
        message: err.to_string(),
    })?;
    fs::rename(&tmp, path).map_err(|err| PersistenceError::Write {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

/// Policy helpers over [`SettingsStore::update`]. These are the layer
/// that enforces the `[MIN_FONT_SIZE, MAX_FONT_SIZE]` bounds; raw patches
/// pass through unclamped.
impl SettingsStore {
    pub async fn set_theme(&self, theme: Theme) -> Result<Settings, PersistenceError> {
        self.update(SettingsPatch {
            theme: Some(theme),
            ..Default::default()
        })
        .await
    }

    pub async fn toggle_theme(&self) -> Result<Settings, PersistenceError> {
        let next = match self.current().await.theme {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        };
        self.set_theme(next).await
    }

    pub async fn set_font_family(
        &self,
        family: FontFamily,
    ) -> Result<Settings, PersistenceError> {
        self.update(SettingsPatch {
            font_family: Some(family),
            ..Default::default()
        })
        .await
    }

    /// Sets a user-chosen font size, clamped to the policy bounds and
    /// marked [`FontSizeSource::Manual`].
    pub async fn set_font_size(&self, size: u32) -> Result<Settings, PersistenceError> {
        self.update(SettingsPatch {
            font_size: Some(size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)),
            font_size_source: Some(FontSizeSource::Manual),
            ..Default::default()
        })
        .await
    }

    pub async fn increase_font_size(&self) -> Result<Settings, PersistenceError> {
        let current = self.current().await.font_size;
        self.set_font_size(current.saturating_add(FONT_SIZE_STEP))
            .await
    }

    pub async fn decrease_font_size(&self) -> Result<Settings, PersistenceError> {
        let current = self.current().await.font_size;
        self.set_font_size(current.saturating_sub(FONT_SIZE_STEP))
            .await
    }

    pub async fn set_line_spacing(&self, value: f32) -> Result<Settings, PersistenceError> {
        self.update(SettingsPatch {
            line_spacing: Some(value),
            ..Default::default()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(dir: &std::path::Path) -> SettingsStore {
        SettingsStore::open(dir.join("settings.json"))
    }

    #[tokio::test]
    async fn missing_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        assert_eq!(store.current().await, Settings::default());
    }

    #[tokio::test]
    async fn corrupt_file_degrades_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();

        let store = SettingsStore::open(path);
        assert_eq!(store.current().await, Settings::default());
    }

    #[tokio::test]
    async fn update_merges_and_persists() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let updated = store
            .update(SettingsPatch {
                bionic_reading: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(updated.bionic_reading);
        // Untouched fields keep their values.
        assert_eq!(updated.font_size, font_sizes::MEDIUM);

        // A fresh store sees the persisted record.
        let reopened = store_in(dir.path());
        assert!(reopened.current().await.bionic_reading);
    }

    #[tokio::test]
    async fn back_to_back_updates_both_land() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        store
            .update(SettingsPatch {
                font_size: Some(18),
                ..Default::default()
            })
            .await
            .unwrap();
        store
            .update(SettingsPatch {
                theme: Some(Theme::Dark),
                ..Default::default()
            })
            .await
            .unwrap();

        let settings = store_in(dir.path()).current().await;
        assert_eq!(settings.font_size, 18);
        assert_eq!(settings.theme, Theme::Dark);
    }

    #[tokio::test]
    async fn failed_write_leaves_memory_unchanged() {
        let dir = tempdir().unwrap();
        // A settings path whose parent is a plain file makes every write fail.
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let store = SettingsStore::open(blocker.join("settings.json"));

        let result = store
            .update(SettingsPatch {
                theme: Some(Theme::Dark),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(PersistenceError::Write { .. })));
        assert_eq!(store.current().await.theme, Theme::Light);
    }

    #[tokio::test]
    async fn font_size_helpers_clamp_but_raw_patches_do_not() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let settings = store.set_font_size(99).await.unwrap();
        assert_eq!(settings.font_size, MAX_FONT_SIZE);
        assert_eq!(settings.font_size_source, FontSizeSource::Manual);

        let settings = store.set_font_size(1).await.unwrap();
        assert_eq!(settings.font_size, MIN_FONT_SIZE);

        // Raw patches are stored as-is.
        let settings = store
            .update(SettingsPatch {
                font_size: Some(99),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(settings.font_size, 99);
    }

    #[tokio::test]
    async fn font_size_steps_by_two_within_bounds() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let settings = store.increase_font_size().await.unwrap();
        assert_eq!(settings.font_size, font_sizes::MEDIUM + 2);

        for _ in 0..10 {
            store.increase_font_size().await.unwrap();
        }
        assert_eq!(store.current().await.font_size, MAX_FONT_SIZE);

        for _ in 0..10 {
            store.decrease_font_size().await.unwrap();
        }
        assert_eq!(store.current().await.font_size, MIN_FONT_SIZE);
    }

    #[tokio::test]
    async fn toggle_theme_flips_both_ways() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        assert_eq!(store.toggle_theme().await.unwrap().theme, Theme::Dark);
        assert_eq!(store.toggle_theme().await.unwrap().theme, Theme::Light);
    }
}
