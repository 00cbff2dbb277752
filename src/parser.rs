// 🏗️ Parser Framework
// Calendar text → RecordSet (line unfolding + field extraction)

use crate::cleaner::clean_link;
use crate::record::{Record, RecordSet};

// ============================================================================
// MARKERS
// ============================================================================

/// Opens every record block
pub const EVENT_BEGIN: &str = "BEGIN:VEVENT";

/// Closes a record block
pub const EVENT_END: &str = "END:VEVENT";

/// Closes the whole document
pub const CALENDAR_END: &str = "END:VCALENDAR";

/// Field holding the record's link; its value is cleaned before storage
pub const LINK_FIELD: &str = "URL";

// ============================================================================
// CORE TRAIT
// ============================================================================

/// DocumentParser - turns a raw document into records
///
/// Parsing never fails: malformed lines are dropped, and a document
/// without any record block yields an empty set.
pub trait DocumentParser: Send + Sync {
    /// Parse the raw text into records, in document order
    fn parse(&self, text: &str) -> RecordSet;

    /// Field name treated as the record link
    fn link_field(&self) -> &str {
        LINK_FIELD
    }

    /// Get parser version (for log lines)
    fn version(&self) -> &str {
        "1.0.0"
    }
}

// ============================================================================
// LINE UNFOLDER
// ============================================================================

/// Rebuild logical lines from a folded block
///
/// A physical line starting with a space continues the previous logical
/// line: its trailing whitespace is dropped and it is appended as-is, so the
/// fold space survives as the separator (`"A:Hello\n World"` → `"A:Hello World"`).
/// Any other line flushes the accumulator. Empty accumulators are never emitted.
pub fn unfold_lines(block: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for physical in block.split('\n') {
        let physical = physical.trim_end_matches('\r');

        if physical.starts_with(' ') {
            current.push_str(physical.trim_end());
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        current.push_str(physical);
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

// ============================================================================
// ICS PARSER
// ============================================================================

/// IcsParser - the line-oriented calendar format
pub struct IcsParser {
    link_field: String,
}

impl IcsParser {
    pub fn new() -> Self {
        IcsParser {
            link_field: LINK_FIELD.to_string(),
        }
    }

    /// Use a different link field name
    pub fn with_link_field(mut self, field: impl Into<String>) -> Self {
        self.link_field = field.into();
        self
    }

    /// Parse one record block (text after its begin marker)
    pub fn parse_block(&self, block: &str) -> Record {
        let mut record = Record::new();

        for line in unfold_lines(block) {
            if let Some((key, value)) = split_field(&line) {
                if key == self.link_field {
                    record.insert(key, clean_link(value));
                } else {
                    record.insert(key, value);
                }
            }
        }

        record
    }
}

impl Default for IcsParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for IcsParser {
    fn parse(&self, text: &str) -> RecordSet {
        // Everything before the first marker is calendar preamble
        text.split(EVENT_BEGIN)
            .skip(1)
            .map(|block| self.parse_block(block))
            .collect()
    }

    fn link_field(&self) -> &str {
        &self.link_field
    }
}

/// Is this logical line a record/document terminator?
fn is_terminal(line: &str) -> bool {
    line.starts_with(EVENT_END) || line.starts_with(CALENDAR_END)
}

/// Split a logical line into (key, value)
///
/// Key is the text before the first `:`, with `;`-parameters removed.
/// Value is everything after that `:` (later colons kept verbatim).
/// Returns None for terminators and for empty keys or values.
pub fn split_field(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || is_terminal(line) {
        return None;
    }

    let colon = line.find(':')?;
    let head = &line[..colon];
    let value = &line[colon + 1..];

    let key = head.split(';').next().unwrap_or("").trim();
    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse a document with the default parser
pub fn parse_document(text: &str) -> RecordSet {
    IcsParser::new().parse(text)
}
