//! Host editor event records.
//!
//! A [`HostRecord`] is one JSON object describing something the editor
//! reported: a document notification, a window state change, a theme change,
//! or a `tick` that only moves simulated time forward. The replay command
//! reads them as JSON Lines and the flow service accepts them over its
//! channel. [`HostEvent::dispatch`] applies the host-side filtering the
//! tracker expects and forwards the event.
//!
//! ```json
//! {"ts": 0, "event": "open", "fileName": "/ws/main.go", "scheme": "file", "languageId": "go"}
//! {"ts": 800, "event": "change", "fileName": "/ws/main.go", "deltas": [{"rangeStartLine": 0, "rangeEndLine": 0, "rangeLength": 0, "insertedText": "a"}]}
//! {"ts": 2000, "event": "windowState", "focused": false, "active": true}
//! ```

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::aggregate::UNNAMED_PROJECT_PATH;
use crate::tracker::FlowTracker;
use crate::types::{RawEditDelta, StaticMeta, ThemeKind};

/// Temporary workspace files created by Live Share sessions.
static LIVE_SHARE_TMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r".*\.code-workspace.*vsliveshare.*tmp-.*").expect("live share pattern is valid")
});

const DEFAULT_SCHEME: &str = "file";

fn default_scheme() -> String {
    DEFAULT_SCHEME.to_string()
}

/// A document as the host describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Absolute path or untitled name of the document.
    pub file_name: String,

    /// URI scheme of the document (`file`, `untitled`, `git`, ...).
    #[serde(default = "default_scheme")]
    pub scheme: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_id: Option<String>,

    /// Full document text, used only to measure its length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Document {
    #[must_use]
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            scheme: default_scheme(),
            language_id: None,
            text: None,
        }
    }

    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    #[must_use]
    pub fn with_language_id(mut self, language_id: impl Into<String>) -> Self {
        self.language_id = Some(language_id.into());
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// A document change notification with its edit deltas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChange {
    #[serde(flatten)]
    pub document: Document,

    #[serde(default)]
    pub deltas: Vec<RawEditDelta>,
}

/// One notification from the host editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum HostEvent {
    Open(Document),
    Close(Document),
    Change(DocumentChange),
    Save(Document),
    WindowState {
        focused: bool,
        active: bool,
        /// Updates the primary-window flag before the focus change is handled.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        primary: Option<bool>,
    },
    Theme {
        kind: ThemeKind,
    },
    /// Advances simulated time without reporting anything.
    Tick,
}

/// A host event stamped with an optional wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRecord {
    /// Milliseconds since the Unix epoch (or since replay start).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<i64>,

    #[serde(flatten)]
    pub event: HostEvent,
}

impl HostEvent {
    /// Applies the event to `tracker`.
    ///
    /// Open, close and change notifications for pseudo-documents are dropped
    /// here (see [`is_document_event`]). Returns `true` if the tracker was
    /// called.
    pub fn dispatch(&self, tracker: &mut FlowTracker, workspace_folders: &[String]) -> bool {
        match self {
            HostEvent::Open(doc) => {
                if !is_document_event(&doc.scheme, &doc.file_name) {
                    trace!(
                        file_name = %doc.file_name,
                        scheme = %doc.scheme,
                        "Skipping non-document open"
                    );
                    return false;
                }
                let root = resolve_project_root(&doc.file_name, workspace_folders);
                tracker.on_open(&doc.file_name, &root, &static_meta_for(doc));
            }
            HostEvent::Close(doc) => {
                if !is_document_event(&doc.scheme, &doc.file_name) {
                    trace!(
                        file_name = %doc.file_name,
                        scheme = %doc.scheme,
                        "Skipping non-document close"
                    );
                    return false;
                }
                let root = resolve_project_root(&doc.file_name, workspace_folders);
                tracker.on_close(&doc.file_name, &root);
            }
            HostEvent::Change(change) => {
                let doc = &change.document;
                if !is_document_event(&doc.scheme, &doc.file_name) {
                    trace!(
                        file_name = %doc.file_name,
                        scheme = %doc.scheme,
                        "Skipping non-document change"
                    );
                    return false;
                }
                let root = resolve_project_root(&doc.file_name, workspace_folders);
                tracker.on_change(&doc.file_name, &root, &change.deltas, &static_meta_for(doc));
            }
            HostEvent::Save(doc) => {
                // saves are not scheme-filtered
                if doc.file_name.is_empty() {
                    return false;
                }
                let root = resolve_project_root(&doc.file_name, workspace_folders);
                tracker.on_save(&doc.file_name, &root);
            }
            HostEvent::WindowState {
                focused,
                active,
                primary,
            } => {
                if let Some(primary) = primary {
                    tracker.set_primary_window(*primary);
                }
                tracker.on_focus_changed(*focused, *active);
            }
            HostEvent::Theme { kind } => tracker.on_theme_changed(*kind),
            HostEvent::Tick => return false,
        }
        true
    }
}

/// Returns `true` if a notification for this document should be tracked.
///
/// Only `file` and `untitled` documents and the editor's own `vscode-*`
/// schemes count; `git`, `output` and similar views do not. Live Share
/// temporary workspace files are always rejected, as are nameless documents.
#[must_use]
pub fn is_document_event(scheme: &str, file_name: &str) -> bool {
    if file_name.is_empty() {
        return false;
    }
    let doc_scheme = scheme == "file" || scheme == "untitled" || scheme.contains("vscode-");
    doc_scheme && !LIVE_SHARE_TMP.is_match(file_name)
}

/// Maps a file to the first workspace folder that contains it.
///
/// Falls back to [`UNNAMED_PROJECT_PATH`] when no folder matches.
#[must_use]
pub fn resolve_project_root(file_name: &str, workspace_folders: &[String]) -> String {
    let path = Path::new(file_name);
    workspace_folders
        .iter()
        .find(|folder| !folder.is_empty() && path.starts_with(folder.as_str()))
        .cloned()
        .unwrap_or_else(|| UNNAMED_PROJECT_PATH.to_string())
}

/// Static metadata for a document: its language id (or file extension) and
/// its text length in UTF-16 code units.
#[must_use]
pub fn static_meta_for(doc: &Document) -> StaticMeta {
    let syntax = doc
        .language_id
        .clone()
        .filter(|id| !id.is_empty())
        .or_else(|| {
            Path::new(&doc.file_name)
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
        });
    let character_count = doc
        .text
        .as_ref()
        .map(|text| text.encode_utf16().count() as u64);

    StaticMeta {
        syntax,
        character_count,
    }
}
