//! Shared types for editorflow.
//!
//! This module defines the raw edit delta consumed by the classifier, the
//! change categories it produces, and the typed events carried on the
//! [`EventBus`](crate::bus::EventBus). All types serialize to camelCase JSON.

use serde::{Deserialize, Serialize};

use crate::aggregate::ProjectAggregate;

/// One contiguous text replacement reported by the editor host.
///
/// Lengths are measured in UTF-16 code units, the unit editor hosts use for
/// `rangeLength`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEditDelta {
    /// First line of the replaced range.
    pub range_start_line: u32,

    /// Last line of the replaced range.
    pub range_end_line: u32,

    /// Length of the replaced range, line breaks included.
    pub range_length: u32,

    /// Text inserted in place of the range.
    #[serde(default)]
    pub inserted_text: String,
}

impl RawEditDelta {
    /// Creates a delta from its four components.
    #[must_use]
    pub fn new(
        range_start_line: u32,
        range_end_line: u32,
        range_length: u32,
        inserted_text: impl Into<String>,
    ) -> Self {
        Self {
            range_start_line,
            range_end_line,
            range_length,
            inserted_text: inserted_text.into(),
        }
    }

    /// Creates a pure insertion at a single line.
    #[must_use]
    pub fn insert(line: u32, text: impl Into<String>) -> Self {
        Self::new(line, line, 0, text)
    }
}

/// Semantic category of a classified edit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeCategory {
    SingleAdd,
    MultiAdd,
    SingleDelete,
    MultiDelete,
    AutoIndent,
    Replacement,
    #[default]
    None,
}

impl ChangeCategory {
    /// Returns `true` for every category that counts as a keystroke.
    #[must_use]
    pub fn is_keystroke(self) -> bool {
        self != Self::None
    }

    /// Returns the wire name of the category.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SingleAdd => "singleAdd",
            Self::MultiAdd => "multiAdd",
            Self::SingleDelete => "singleDelete",
            Self::MultiDelete => "multiDelete",
            Self::AutoIndent => "autoIndent",
            Self::Replacement => "replacement",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static file metadata supplied by the host adapter.
///
/// Both fields are best effort; the aggregate records each of them at most
/// once per window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticMeta {
    /// Language identifier, or the file extension when the host has none.
    pub syntax: Option<String>,

    /// Length of the document text.
    pub character_count: Option<u64>,
}

impl StaticMeta {
    /// Creates metadata with both fields set.
    #[must_use]
    pub fn new(syntax: impl Into<String>, character_count: u64) -> Self {
        Self {
            syntax: Some(syntax.into()),
            character_count: Some(character_count),
        }
    }
}

/// Color theme classification reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ThemeKind {
    Light,
    Dark,
    HighContrast,
    HighContrastLight,
}

/// Why a window was flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushReason {
    /// The window duration elapsed.
    Timer,
    /// The editor window lost focus while still active.
    Unfocus,
    /// The service is shutting down.
    Shutdown,
    /// An explicit flush requested by the caller.
    Manual,
}

/// Closed set of event kinds carried on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowEventType {
    Open,
    Close,
    Change,
    Save,
    Focus,
    Unfocus,
    Theme,
    Kpm,
}

/// File identity attached to document lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    /// Host-relative file identifier.
    pub file_name: String,

    /// Resolved project root, or the unnamed sentinel.
    pub file_path: String,
}

impl FileRef {
    #[must_use]
    pub fn new(file_name: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            file_path: file_path.into(),
        }
    }
}

/// Events published on the bus.
///
/// Lifecycle variants carry a snapshot of the currently open aggregate, which
/// may have zero keystrokes or be absent entirely. [`FlowEvent::Kpm`] is only
/// published by a flush and always carries a finalized, non-empty aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowEvent {
    /// A document was opened.
    Open {
        file: FileRef,
        project: Option<ProjectAggregate>,
    },
    /// A document was closed.
    Close {
        file: FileRef,
        project: Option<ProjectAggregate>,
    },
    /// A document changed.
    Change {
        file: FileRef,
        #[serde(rename = "deltaCount")]
        delta_count: usize,
        project: Option<ProjectAggregate>,
    },
    /// A document was saved.
    Save {
        file: FileRef,
        project: Option<ProjectAggregate>,
    },
    /// The editor window gained focus.
    Focus {
        primary: bool,
        project: Option<ProjectAggregate>,
    },
    /// The editor window lost focus while remaining active.
    Unfocus {
        primary: bool,
        project: Option<ProjectAggregate>,
    },
    /// The color theme changed.
    Theme {
        kind: ThemeKind,
        project: Option<ProjectAggregate>,
    },
    /// A finalized aggregation window.
    Kpm {
        reason: FlushReason,
        project: ProjectAggregate,
    },
}

impl FlowEvent {
    /// Returns the kind of this event.
    #[must_use]
    pub fn event_type(&self) -> FlowEventType {
        match self {
            Self::Open { .. } => FlowEventType::Open,
            Self::Close { .. } => FlowEventType::Close,
            Self::Change { .. } => FlowEventType::Change,
            Self::Save { .. } => FlowEventType::Save,
            Self::Focus { .. } => FlowEventType::Focus,
            Self::Unfocus { .. } => FlowEventType::Unfocus,
            Self::Theme { .. } => FlowEventType::Theme,
            Self::Kpm { .. } => FlowEventType::Kpm,
        }
    }

    /// Returns the file this event refers to, if any.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::Open { file, .. }
            | Self::Close { file, .. }
            | Self::Change { file, .. }
            | Self::Save { file, .. } => Some(file.file_name.as_str()),
            Self::Focus { .. } | Self::Unfocus { .. } | Self::Theme { .. } | Self::Kpm { .. } => {
                None
            }
        }
    }
}
