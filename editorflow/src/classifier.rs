//! Edit delta classification.
//!
//! Turns one [`RawEditDelta`] into line/character magnitudes and a
//! [`ChangeCategory`]. Classification is a pure function: no state, no I/O.
//!
//! # Categorization
//!
//! Deletions take priority over insertions:
//!
//! 1. Something was deleted: `replacement` if characters were also added,
//!    otherwise `multiDelete` or `singleDelete` by magnitude.
//! 2. More than one character or line was added: `autoIndent` when the text
//!    is a single line break followed only by whitespace, otherwise
//!    `multiAdd`.
//! 3. Exactly one character or line was added: `singleAdd`.
//! 4. Anything else is `none`.
//!
//! Magnitudes are signed. An inconsistent range (for example a range length
//! shorter than its line span) is not rejected; it simply falls into
//! whichever branch the arithmetic selects.
//!
//! # Example
//!
//! ```
//! use editorflow::classifier::classify;
//! use editorflow::types::{ChangeCategory, RawEditDelta};
//!
//! let result = classify(&RawEditDelta::insert(0, "a"));
//! assert_eq!(result.category, ChangeCategory::SingleAdd);
//! assert_eq!(result.characters_added, 1);
//!
//! let result = classify(&RawEditDelta::insert(4, "\n    "));
//! assert_eq!(result.category, ChangeCategory::AutoIndent);
//! assert_eq!(result.characters_added, 0);
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::trace;

use crate::types::{ChangeCategory, RawEditDelta};

/// A single line break followed only by whitespace.
static AUTO_INDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\n\r]\s*$").expect("auto-indent pattern is valid"));

/// Magnitudes and category derived from one delta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaClassification {
    pub lines_added: i64,
    pub lines_deleted: i64,
    pub characters_added: i64,
    pub characters_deleted: i64,
    pub category: ChangeCategory,
}

/// Classifies one edit delta.
#[must_use]
pub fn classify(delta: &RawEditDelta) -> DeltaClassification {
    let text = delta.inserted_text.as_str();

    let lines_deleted = i64::from(delta.range_end_line) - i64::from(delta.range_start_line);
    let lines_added = count_line_breaks(text);
    let characters_deleted = i64::from(delta.range_length) - lines_deleted;
    let characters_added = utf16_len(text) - lines_added;

    let mut result = DeltaClassification {
        lines_added,
        lines_deleted,
        characters_added,
        characters_deleted,
        category: ChangeCategory::None,
    };

    if characters_deleted > 0 || lines_deleted > 0 {
        result.category = if characters_added > 0 {
            ChangeCategory::Replacement
        } else if characters_deleted > 1 || lines_deleted > 1 {
            ChangeCategory::MultiDelete
        } else if characters_deleted == 1 || lines_deleted == 1 {
            ChangeCategory::SingleDelete
        } else {
            ChangeCategory::None
        };
    } else if characters_added > 1 || lines_added > 1 {
        if AUTO_INDENT.is_match(text) {
            // indentation inserted by the editor is not typed text
            result.characters_added = 0;
            result.category = ChangeCategory::AutoIndent;
        } else {
            result.category = ChangeCategory::MultiAdd;
        }
    } else if characters_added == 1 || lines_added == 1 {
        result.category = ChangeCategory::SingleAdd;
    }

    trace!(
        category = %result.category,
        lines_added = result.lines_added,
        lines_deleted = result.lines_deleted,
        characters_added = result.characters_added,
        characters_deleted = result.characters_deleted,
        "Classified delta"
    );

    result
}

/// Counts `\n` and `\r` characters; a CRLF pair counts twice.
fn count_line_breaks(text: &str) -> i64 {
    text.chars().filter(|c| matches!(c, '\n' | '\r')).count() as i64
}

fn utf16_len(text: &str) -> i64 {
    text.encode_utf16().count() as i64
}
