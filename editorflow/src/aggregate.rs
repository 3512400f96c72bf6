//! Per-file and per-project aggregates for one window.
//!
//! A [`FileAggregate`] accumulates classified edits for one file; a
//! [`ProjectAggregate`] maps file names to their aggregates for the window
//! that is currently open. Both serialize to the camelCase JSON shape that is
//! published in `kpm` events.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classifier::DeltaClassification;
use crate::types::{ChangeCategory, StaticMeta};

/// Path recorded when a file does not belong to any known project root.
pub const UNNAMED_PROJECT_PATH: &str = "Unnamed";

/// Accumulated edit activity for one file within the current window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAggregate {
    pub file_name: String,
    pub file_path: String,

    /// Milliseconds since the Unix epoch.
    pub start: Option<i64>,

    /// Milliseconds since the Unix epoch; unset until the file stops being
    /// edited or the window is flushed.
    pub end: Option<i64>,

    pub lines_added: u64,
    pub lines_deleted: u64,
    pub characters_added: u64,
    pub characters_deleted: u64,
    pub keystrokes: u64,

    pub single_adds: u64,
    pub multi_adds: u64,
    pub single_deletes: u64,
    pub multi_deletes: u64,
    pub auto_indents: u64,
    pub replacements: u64,

    /// Most recently applied category.
    pub change_type: ChangeCategory,

    pub syntax: Option<String>,
    pub character_count: Option<u64>,
}

impl FileAggregate {
    /// Creates an empty aggregate that started at `start`.
    #[must_use]
    pub fn new(file_name: impl Into<String>, file_path: impl Into<String>, start: i64) -> Self {
        Self {
            file_name: file_name.into(),
            file_path: file_path.into(),
            start: Some(start),
            ..Self::default()
        }
    }

    /// Adds one classified delta to the counters.
    ///
    /// Negative magnitudes from malformed deltas contribute nothing.
    pub fn apply(&mut self, change: &DeltaClassification) {
        self.lines_added += non_negative(change.lines_added);
        self.lines_deleted += non_negative(change.lines_deleted);
        self.characters_added += non_negative(change.characters_added);
        self.characters_deleted += non_negative(change.characters_deleted);
        self.change_type = change.category;

        if !change.category.is_keystroke() {
            return;
        }
        self.keystrokes += 1;
        match change.category {
            ChangeCategory::SingleAdd => self.single_adds += 1,
            ChangeCategory::MultiAdd => self.multi_adds += 1,
            ChangeCategory::SingleDelete => self.single_deletes += 1,
            ChangeCategory::MultiDelete => self.multi_deletes += 1,
            ChangeCategory::AutoIndent => self.auto_indents += 1,
            ChangeCategory::Replacement => self.replacements += 1,
            ChangeCategory::None => {}
        }
    }

    /// Records static metadata, keeping any value already set.
    pub fn set_static_meta(&mut self, meta: &StaticMeta) {
        if self.syntax.is_none() {
            self.syntax.clone_from(&meta.syntax);
        }
        if self.character_count.is_none() {
            self.character_count = meta.character_count;
        }
    }

    /// Sum of the six category counters.
    #[must_use]
    pub fn category_total(&self) -> u64 {
        self.single_adds
            + self.multi_adds
            + self.single_deletes
            + self.multi_deletes
            + self.auto_indents
            + self.replacements
    }

    /// Returns `true` when no keystroke was recorded.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.keystrokes == 0
    }
}

fn non_negative(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// All files touched during one aggregation window, keyed by file name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAggregate {
    pub docs_changed: BTreeMap<String, FileAggregate>,
}

impl ProjectAggregate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the aggregate for `file_name`, creating it with `start = now`
    /// if it does not exist yet.
    pub fn file_entry(&mut self, file_name: &str, file_path: &str, now: i64) -> &mut FileAggregate {
        self.docs_changed
            .entry(file_name.to_string())
            .or_insert_with(|| FileAggregate::new(file_name, file_path, now))
    }

    #[must_use]
    pub fn get(&self, file_name: &str) -> Option<&FileAggregate> {
        self.docs_changed.get(file_name)
    }

    pub fn get_mut(&mut self, file_name: &str) -> Option<&mut FileAggregate> {
        self.docs_changed.get_mut(file_name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs_changed.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs_changed.len()
    }

    /// Total keystrokes across every file.
    #[must_use]
    pub fn total_keystrokes(&self) -> u64 {
        self.docs_changed.values().map(|f| f.keystrokes).sum()
    }
}
