//! Persisted preset store.
//!
//! A durable, capped collection of reusable timer templates. The whole
//! document is rewritten synchronously after every in-memory mutation
//! (single writer, last-writer-wins), and a malformed file on disk is
//! downgraded to empty defaults instead of a crash. First launch seeds a
//! fixed sample list exactly once, guarded by an `initialized` flag inside
//! the document itself.

mod error;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use error::PresetStoreError;

use crate::types::{sample_presets, sanitize_label, TimerEntity, TimerPreset};

/// Persisted document: the preset list plus the one-time seed flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PresetDocument {
    initialized: bool,
    presets: Vec<TimerPreset>,
}

/// Partial update applied to an existing preset.
#[derive(Debug, Clone, Default)]
pub struct PresetUpdate {
    /// New raw label (sanitized on apply)
    pub label: Option<String>,
    /// New hour component
    pub hours: Option<u32>,
    /// New minute component
    pub minutes: Option<u32>,
    /// New second component
    pub seconds: Option<u32>,
    /// New sound flag
    pub is_sound_on: Option<bool>,
    /// New vibration flag
    pub is_vibration_on: Option<bool>,
}

/// Durable collection of timer presets with a visible-count cap.
pub struct PresetStore {
    document: PresetDocument,
    /// Visible (non-hidden) preset cap
    max_visible: usize,
    /// Backing file; `None` keeps the store memory-only (tests, demos)
    path: Option<PathBuf>,
}

impl PresetStore {
    /// Opens the store at `path`, seeding samples on first run.
    ///
    /// A missing file means first run. A file that fails to decode is
    /// logged and treated as empty; no partial decode is attempted.
    pub fn open(
        path: impl AsRef<Path>,
        max_visible: usize,
        now: DateTime<Utc>,
    ) -> Result<Self, PresetStoreError> {
        let path = path.as_ref().to_path_buf();
        let document = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<PresetDocument>(&contents) {
                Ok(document) => document,
                Err(e) => {
                    tracing::warn!("preset store decode failed, starting empty: {e}");
                    PresetDocument::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PresetDocument::default(),
            Err(e) => return Err(e.into()),
        };

        let mut store = Self {
            document,
            max_visible,
            path: Some(path),
        };
        store.seed_if_needed(now)?;
        Ok(store)
    }

    /// Creates a store with no backing file. Mutations are not persisted.
    #[must_use]
    pub fn in_memory(max_visible: usize, now: DateTime<Utc>) -> Self {
        let mut store = Self {
            document: PresetDocument::default(),
            max_visible,
            path: None,
        };
        // Memory-only stores cannot fail to save.
        let _ = store.seed_if_needed(now);
        store
    }

    /// Default store location under the platform data directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("labeldown").join("presets.json"))
    }

    fn seed_if_needed(&mut self, now: DateTime<Utc>) -> Result<(), PresetStoreError> {
        if self.document.initialized {
            return Ok(());
        }
        tracing::info!("first run: seeding sample presets");
        self.document.presets = sample_presets(now);
        self.document.initialized = true;
        self.save()
    }

    fn save(&self) -> Result<(), PresetStoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.document)?;
        fs::write(path, contents)?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// All presets, hidden included.
    #[must_use]
    pub fn get_all(&self) -> Vec<TimerPreset> {
        self.document.presets.clone()
    }

    /// Looks up a preset by id.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&TimerPreset> {
        self.document.presets.iter().find(|p| p.id == id)
    }

    /// Visible presets, most recently used first.
    #[must_use]
    pub fn visible(&self) -> Vec<TimerPreset> {
        let mut visible: Vec<_> = self
            .document
            .presets
            .iter()
            .filter(|p| !p.is_hidden_in_list)
            .cloned()
            .collect();
        visible.sort_by(|a, b| b.last_used_at.cmp(&a.last_used_at));
        visible
    }

    /// Number of visible presets.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.document
            .presets
            .iter()
            .filter(|p| !p.is_hidden_in_list)
            .count()
    }

    // ------------------------------------------------------------------------
    // Mutations (each persists synchronously)
    // ------------------------------------------------------------------------

    /// Adds a preset. Returns `false` without adding when the preset is
    /// visible and the visible cap is already reached.
    pub fn add(&mut self, preset: TimerPreset) -> Result<bool, PresetStoreError> {
        if !preset.is_hidden_in_list && self.visible_count() >= self.max_visible {
            return Ok(false);
        }
        self.document.presets.push(preset);
        self.save()?;
        Ok(true)
    }

    /// Snapshots a timer into a new visible preset ("save as preset").
    pub fn add_from_timer(
        &mut self,
        timer: &TimerEntity,
        now: DateTime<Utc>,
    ) -> Result<bool, PresetStoreError> {
        self.add(TimerPreset::from_timer(timer, now))
    }

    /// Hides a preset. Missing id is a no-op returning `false`.
    pub fn hide(&mut self, id: Uuid) -> Result<bool, PresetStoreError> {
        let Some(preset) = self.document.presets.iter_mut().find(|p| p.id == id) else {
            return Ok(false);
        };
        preset.is_hidden_in_list = true;
        self.save()?;
        Ok(true)
    }

    /// Unhides a preset and refreshes its `last_used_at`.
    ///
    /// Refuses (returns `false`) when unhiding would exceed the visible cap.
    pub fn show(&mut self, id: Uuid, now: DateTime<Utc>) -> Result<bool, PresetStoreError> {
        let visible_count = self.visible_count();
        let Some(preset) = self.document.presets.iter_mut().find(|p| p.id == id) else {
            return Ok(false);
        };
        if preset.is_hidden_in_list && visible_count >= self.max_visible {
            return Ok(false);
        }
        preset.is_hidden_in_list = false;
        preset.last_used_at = now;
        self.save()?;
        Ok(true)
    }

    /// Refreshes `last_used_at` (a timer was started from this preset).
    pub fn touch(&mut self, id: Uuid, now: DateTime<Utc>) -> Result<bool, PresetStoreError> {
        let Some(preset) = self.document.presets.iter_mut().find(|p| p.id == id) else {
            return Ok(false);
        };
        preset.last_used_at = now;
        self.save()?;
        Ok(true)
    }

    /// Applies a partial update. Missing id is a no-op returning `false`.
    pub fn update(&mut self, id: Uuid, fields: PresetUpdate) -> Result<bool, PresetStoreError> {
        let Some(preset) = self.document.presets.iter_mut().find(|p| p.id == id) else {
            return Ok(false);
        };
        if let Some(label) = fields.label {
            preset.label = sanitize_label(&label);
        }
        if let Some(hours) = fields.hours {
            preset.hours = hours;
        }
        if let Some(minutes) = fields.minutes {
            preset.minutes = minutes;
        }
        if let Some(seconds) = fields.seconds {
            preset.seconds = seconds;
        }
        if let Some(sound) = fields.is_sound_on {
            preset.is_sound_on = sound;
        }
        if let Some(vibration) = fields.is_vibration_on {
            preset.is_vibration_on = vibration;
        }
        self.save()?;
        Ok(true)
    }

    /// Hard-deletes a preset. Missing id is a no-op returning `false`.
    pub fn delete(&mut self, id: Uuid) -> Result<bool, PresetStoreError> {
        let before = self.document.presets.len();
        self.document.presets.retain(|p| p.id != id);
        if self.document.presets.len() == before {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }
}
